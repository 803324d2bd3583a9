pub mod logger;
pub mod error;
pub mod config;
pub mod stats;
pub mod targets;
pub mod binding;
pub mod frame;
pub mod shader;
pub mod mask;
pub mod presenter;
pub mod blur;
pub mod capture;

#[cfg(windows)]
pub mod device;
#[cfg(windows)]
pub mod renderer;
#[cfg(windows)]
pub mod window;
#[cfg(windows)]
pub mod app;

pub use config::{ConfigStore, OverlayConfig};
pub use logger::*;

/// Runs the overlay and returns the process exit code.
#[cfg(windows)]
pub fn run(config: &OverlayConfig) -> i32 {
    app::run(config)
}

#[cfg(not(windows))]
pub fn run(_config: &OverlayConfig) -> i32 {
    log_error!("Frostpane is only supported on Windows");
    -1
}
