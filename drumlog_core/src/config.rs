//! Configuration file support for Drumlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/drumlog/config.toml`.
//! Every field has a default, so partial files are fine.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub metronome: MetronomeConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Metronome behaviour during practice
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetronomeConfig {
    #[serde(default = "default_beats_per_bar")]
    pub beats_per_bar: u32,

    /// BPM change applied by a single `+` / `-` during practice
    #[serde(default = "default_tempo_step")]
    pub tempo_step: u32,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            beats_per_bar: default_beats_per_bar(),
            tempo_step: default_tempo_step(),
        }
    }
}

/// History and progress display
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Entries shown in an exercise's recent-sessions view
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    /// Exercise names listed per session before "+N more"
    #[serde(default = "default_preview_count")]
    pub preview_count: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
            preview_count: default_preview_count(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("drumlog")
}

fn default_beats_per_bar() -> u32 {
    crate::timing::DEFAULT_BEATS_PER_BAR
}

fn default_tempo_step() -> u32 {
    5
}

fn default_recent_limit() -> usize {
    crate::stats::DEFAULT_RECENT_LIMIT
}

fn default_preview_count() -> usize {
    3
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("drumlog").join("config.toml")
    }

    /// Reject values the practice flow cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.metronome.beats_per_bar == 0 {
            return Err(Error::Config("metronome.beats_per_bar must be at least 1".into()));
        }
        if !(1..=50).contains(&self.metronome.tempo_step) {
            return Err(Error::Config(format!(
                "metronome.tempo_step must be between 1 and 50, got {}",
                self.metronome.tempo_step
            )));
        }
        if self.history.recent_limit == 0 {
            return Err(Error::Config("history.recent_limit must be at least 1".into()));
        }
        Ok(())
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.metronome.beats_per_bar, 4);
        assert_eq!(config.metronome.tempo_step, 5);
        assert_eq!(config.history.recent_limit, 5);
        assert_eq!(config.history.preview_count, 3);
        assert!(config.data.data_dir.ends_with("drumlog"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[metronome]
beats_per_bar = 3
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.metronome.beats_per_bar, 3);
        assert_eq!(config.metronome.tempo_step, 5); // default
        assert_eq!(config.history.recent_limit, 5); // default
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.history.recent_limit = 8;
        config.data.data_dir = temp_dir.path().join("data");
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.history.recent_limit, 8);
        assert_eq!(loaded.data.data_dir, temp_dir.path().join("data"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[metronome]\ntempo_step = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[metronome\nbeats_per_bar = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Toml(_))));
    }
}
