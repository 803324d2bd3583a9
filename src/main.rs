#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use frostpane::config::APP_DIR_NAME;
use frostpane::{log_info, log_warn, ConfigStore, OverlayConfig};

fn main() {
    let code = run_app();
    let _ = frostpane::logger::finalize_logs();
    std::process::exit(code);
}

fn run_app() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    let stream_logs = args.contains(&"--stream-logs".to_string());

    let store = ConfigStore::new();
    let log_dir = match &store {
        Ok(store) => store.log_dir(),
        Err(_) => std::env::temp_dir().join(APP_DIR_NAME).join("logs"),
    };
    let loaded = store.as_ref().map_err(|e| anyhow::anyhow!("{}", e)).and_then(|s| s.load());
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => OverlayConfig::default(),
    };

    if let Err(e) = frostpane::logger::init_logger(log_dir, "frostpane", config.log_retention_count, stream_logs) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    log_info!("=== Frostpane Starting ===");
    if let Some(log_path) = frostpane::logger::get_log_path() {
        log_info!("Log file: {}", log_path.display());
    }
    if stream_logs {
        log_info!("Streaming mode enabled via --stream-logs");
    }
    if let Err(e) = loaded {
        log_warn!("Using default configuration: {:#}", e);
    } else if let Ok(store) = &store {
        // First run: write the defaults out so they can be edited.
        if !store.config_path().exists() {
            match store.save(&config) {
                Ok(()) => log_info!("Wrote default config to {}", store.config_path().display()),
                Err(e) => log_warn!("Failed to write default config: {:#}", e),
            }
        }
    }
    log_info!(
        "Config: {}x{}, blur radius {}, vsync {}, fps cap {:?}",
        config.width,
        config.height,
        config.blur_radius,
        config.vsync,
        config.target_fps
    );

    frostpane::run(&config)
}
