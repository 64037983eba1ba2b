use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use studio_core::history::{SnapshotStore, StoreError};
use studio_core::{HistoryConfig, HistoryManager};
use studio_renderer::{DeviceCapabilities, RenderScheduler, SchedulerConfig};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Editor settings stored beside a studio project as `settings.json`.
///
/// Every field has a default, so a file only needs the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioSettings {
    pub history: HistoryConfig,
    pub scheduler: SchedulerConfig,
}

impl StudioSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Fresh history over `store`, clearing what a previous session left there.
    pub fn open_history(&self, store: Box<dyn SnapshotStore>) -> Result<HistoryManager, StoreError> {
        HistoryManager::open(self.history.clone(), store)
    }

    pub fn scheduler(&self, capabilities: DeviceCapabilities) -> RenderScheduler {
        RenderScheduler::new(self.scheduler.clone(), capabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonFileStore;
    use studio_renderer::DeviceTier;

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings = StudioSettings::from_json(
            r#"{ "history": { "capacity": 20 }, "scheduler": { "device_override": "critical" } }"#,
        )
        .unwrap();
        assert_eq!(settings.history.capacity, 20);
        assert_eq!(settings.history.capture_debounce_ms, 50);
        assert_eq!(settings.scheduler.device_override, Some(DeviceTier::Critical));
        assert_eq!(settings.scheduler.fps_window, 30);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(StudioSettings::load(&path).unwrap(), StudioSettings::default());

        let mut settings = StudioSettings::default();
        settings.history.position_epsilon = 2.5;
        settings.scheduler.culling_enabled = false;
        settings.save(&path).unwrap();
        assert_eq!(StudioSettings::load(&path).unwrap(), settings);

        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(StudioSettings::load(&path), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_builds_configured_engines() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = StudioSettings::default();
        settings.history.capacity = 5;
        settings.scheduler.device_override = Some(DeviceTier::Low);

        let store = JsonFileStore::open(dir.path().join("history.json")).unwrap();
        let history = settings.open_history(Box::new(store)).unwrap();
        assert_eq!(history.config().capacity, 5);
        assert!(history.is_empty());

        let scheduler = settings.scheduler(DeviceCapabilities::new(16, 32.0, false));
        assert_eq!(scheduler.tier(), DeviceTier::Low);
    }
}
