use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from reading a replay configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Replay configuration exposed to the host.
///
/// ```yaml
/// log_path: flights/sortie.csv
/// time_offset: 120.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Log file name, resolved through the host's file locations.
    pub log_path: String,
    /// Host time at which replay time zero occurs.
    pub time_offset: f64,
}

/// A write to one configuration field.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigChange {
    LogPath(String),
    TimeOffset(f64),
}

impl ReplayConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Replay time corresponding to a host time.
    pub fn replay_time(&self, host_time: f64) -> f64 {
        host_time - self.time_offset
    }

    pub fn apply(&mut self, change: &ConfigChange) {
        match change {
            ConfigChange::LogPath(path) => self.log_path.clone_from(path),
            ConfigChange::TimeOffset(offset) => self.time_offset = *offset,
        }
    }

    /// The writes that turn a default configuration into this one. The offset
    /// comes first so the reload triggered by the path re-seeks with it.
    pub fn into_changes(self) -> [ConfigChange; 2] {
        [
            ConfigChange::TimeOffset(self.time_offset),
            ConfigChange::LogPath(self.log_path),
        ]
    }
}
