//! Store configuration (`config.toml` in the state directory)

use crate::layout::CONFIG_FILE;
use crate::storage::atomic_write;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default minimum completeness score for automatic resume
pub const DEFAULT_RECOVERY_THRESHOLD: u8 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Composite score (0-100) at or above which a session may resume unattended
    #[serde(default = "default_recovery_threshold")]
    pub recovery_threshold: u8,

    /// Keep at most this many snapshots; `None` keeps all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_retention: Option<usize>,
}

fn default_recovery_threshold() -> u8 {
    DEFAULT_RECOVERY_THRESHOLD
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            recovery_threshold: DEFAULT_RECOVERY_THRESHOLD,
            snapshot_retention: None,
        }
    }
}

impl StoreConfig {
    /// Load `config.toml` from `state_dir`, falling back to defaults when absent
    pub fn load(state_dir: &Path) -> Result<Self> {
        let config_path = state_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: StoreConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        Ok(config.clamped())
    }

    /// Save to `config.toml` in `state_dir`
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        let config_path = state_dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        atomic_write(&config_path, content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        Ok(())
    }

    fn clamped(mut self) -> Self {
        self.recovery_threshold = self.recovery_threshold.min(100);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.recovery_threshold, 50);
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE), "snapshot_retention = 3\n").unwrap();
        let config = StoreConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.recovery_threshold, 50);
        assert_eq!(config.snapshot_retention, Some(3));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            recovery_threshold: 80,
            snapshot_retention: Some(5),
        };
        config.save(temp_dir.path()).unwrap();
        assert_eq!(StoreConfig::load(temp_dir.path()).unwrap(), config);
    }

    #[test]
    fn test_threshold_clamped() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE), "recovery_threshold = 250\n").unwrap();
        assert_eq!(StoreConfig::load(temp_dir.path()).unwrap().recovery_threshold, 100);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE), "recovery_threshold = \"high\"\n").unwrap();
        assert!(StoreConfig::load(temp_dir.path()).is_err());
    }
}
