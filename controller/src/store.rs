use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use climate_common::{ConfigError, ControlSettings, SettingsStore, StoreError};

/// Settings kept as pretty-printed JSON on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<ControlSettings, ConfigError> {
        match std::fs::read(&self.path) {
            Ok(raw) => ControlSettings::from_json(&raw),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(ConfigError::NotFound(self.path.display().to_string()))
            }
            Err(err) => Err(ConfigError::Unreadable(format!(
                "{}: {err}",
                self.path.display()
            ))),
        }
    }

    fn save(&mut self, settings: &ControlSettings) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_vec_pretty(settings)?;

        // Replace via rename so a crash mid-write never leaves a truncated file.
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, payload)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }
}
