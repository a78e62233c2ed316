use std::path::PathBuf;

use serde::Deserialize;

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory holding one SQLite file per project.
    pub data_dir: PathBuf,
    pub busy_timeout_ms: u64,
    pub journal_mode: String,
    pub foreign_keys: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            busy_timeout_ms: 5000,
            journal_mode: "WAL".into(),
            foreign_keys: true,
        }
    }
}

impl StoreConfig {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| StorageError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        const MODES: [&str; 6] = ["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];
        if !MODES.contains(&self.journal_mode.to_ascii_uppercase().as_str()) {
            return Err(StorageError::Config(format!(
                "unknown journal mode: {}",
                self.journal_mode
            )));
        }
        Ok(())
    }
}
