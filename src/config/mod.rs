//! Configuration management.
//!
//! Configuration is loaded from `~/.windlass/config.json` with `WINDLASS_*`
//! environment variable overrides. The engine takes its config by value --
//! there is no process-global configuration state, so multiple engines with
//! different configurations can coexist in one process.

mod types;

pub use types::EngineConfig;

use crate::error::{Result, WindlassError};
use std::path::{Path, PathBuf};

impl EngineConfig {
    /// The Windlass configuration directory (`~/.windlass`).
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".windlass")
    }

    /// Path to the config file (`~/.windlass/config.json`).
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// A missing config file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            EngineConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `WINDLASS_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WINDLASS_MODEL") {
            self.model = val;
        }
        if let Ok(val) = std::env::var("WINDLASS_WORKSPACE") {
            self.workspace = val;
        }
        if let Ok(val) = std::env::var("WINDLASS_MAX_TOKENS") {
            if let Ok(v) = val.parse() {
                self.max_tokens = v;
            }
        }
        if let Ok(val) = std::env::var("WINDLASS_COMPRESSION_THRESHOLD") {
            if let Ok(v) = val.parse() {
                self.compression_threshold = v;
            }
        }
        if let Ok(val) = std::env::var("WINDLASS_RECENT_MESSAGES_KEPT") {
            if let Ok(v) = val.parse() {
                self.recent_messages_kept = v;
            }
        }
        if let Ok(val) = std::env::var("WINDLASS_MAX_LOOP_ITERATIONS") {
            if let Ok(v) = val.parse() {
                self.max_loop_iterations = v;
            }
        }
        if let Ok(val) = std::env::var("WINDLASS_DANGEROUS_TOOLS") {
            self.dangerous_tools = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    /// Validate invariants the engine depends on.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(WindlassError::Config("max_tokens must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.compression_threshold) || self.compression_threshold == 0.0 {
            return Err(WindlassError::Config(
                "compression_threshold must be in (0, 1]".into(),
            ));
        }
        if self.max_loop_iterations == 0 {
            return Err(WindlassError::Config(
                "max_loop_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::load_from_path(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.max_tokens, 128_000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"model": "local-model", "max_loop_iterations": 3}"#).unwrap();

        let config = EngineConfig::load_from_path(&path).unwrap();
        assert_eq!(config.model, "local-model");
        assert_eq!(config.max_loop_iterations, 3);
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let config = EngineConfig {
            compression_threshold: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_threshold_above_one() {
        let config = EngineConfig {
            compression_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let config = EngineConfig {
            max_loop_iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_dir_under_home() {
        let dir = EngineConfig::dir();
        assert!(dir.ends_with(".windlass"));
    }
}
