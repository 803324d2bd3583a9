use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::blur::DEFAULT_RADIUS;

pub const APP_DIR_NAME: &str = "Frostpane";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub width: u32,
    pub height: u32,
    pub blur_radius: f32,
    pub vsync: bool,
    pub target_fps: Option<f32>,
    pub skip_pointer_only_updates: bool,
    pub clear_targets_each_frame: bool,
    pub show_captured_desktop: bool,
    pub log_retention_count: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            blur_radius: DEFAULT_RADIUS,
            vsync: true,
            target_fps: None,
            skip_pointer_only_updates: false,
            clear_targets_each_frame: false,
            show_captured_desktop: false,
            log_retention_count: 10,
        }
    }
}

impl OverlayConfig {
    pub fn sync_interval(&self) -> u32 {
        if self.vsync { 1 } else { 0 }
    }

    /// Frame cap only applies when presentation is not already paced by vsync.
    pub fn frame_cap(&self) -> Option<std::time::Duration> {
        if self.vsync {
            return None;
        }
        self.target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| std::time::Duration::from_secs_f32(1.0 / fps))
    }
}

pub struct ConfigStore {
    app_data_dir: PathBuf,
}

impl ConfigStore {
    pub fn new() -> Result<Self> {
        let app_data = std::env::var("APPDATA")
            .context("Failed to get APPDATA environment variable")?;
        Ok(Self::at(PathBuf::from(app_data).join(APP_DIR_NAME)))
    }

    pub fn at(app_data_dir: PathBuf) -> Self {
        Self { app_data_dir }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.app_data_dir.join("logs")
    }

    pub fn config_path(&self) -> PathBuf {
        self.app_data_dir.join(CONFIG_FILE_NAME)
    }

    pub fn load(&self) -> Result<OverlayConfig> {
        Self::load_from(&self.config_path())
    }

    /// Missing file yields defaults. Missing keys fall back per field.
    pub fn load_from(path: &Path) -> Result<OverlayConfig> {
        if !path.exists() {
            return Ok(OverlayConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, config: &OverlayConfig) -> Result<()> {
        std::fs::create_dir_all(&self.app_data_dir)
            .context("Failed to create app data directory")?;
        let text = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_path(), text).context("Failed to write config")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behavior() {
        let config = OverlayConfig::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.blur_radius, 13.0);
        assert_eq!(config.sync_interval(), 1);
        assert!(config.frame_cap().is_none());
        assert!(!config.skip_pointer_only_updates);
        assert!(!config.clear_targets_each_frame);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config: OverlayConfig = serde_json::from_str(r#"{ "blur_radius": 4.5, "vsync": false }"#).unwrap();
        assert_eq!(config.blur_radius, 4.5);
        assert_eq!(config.sync_interval(), 0);
        assert_eq!(config.width, 800);
        assert_eq!(config.log_retention_count, 10);
    }

    #[test]
    fn frame_cap_requires_vsync_off_and_positive_fps() {
        let mut config = OverlayConfig { target_fps: Some(50.0), ..Default::default() };
        assert!(config.frame_cap().is_none());
        config.vsync = false;
        let cap = config.frame_cap().unwrap();
        assert!((cap.as_secs_f32() - 0.02).abs() < 1e-6);
        config.target_fps = Some(0.0);
        assert!(config.frame_cap().is_none());
    }

    #[test]
    fn store_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("frostpane-config-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let store = ConfigStore::at(dir.clone());
        assert_eq!(store.load().unwrap(), OverlayConfig::default());

        let custom = OverlayConfig { width: 1024, height: 768, show_captured_desktop: true, ..Default::default() };
        store.save(&custom).unwrap();
        assert_eq!(store.load().unwrap(), custom);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
