//! Engine configuration.
//!
//! Only deployment-varying knobs live here: the id-generator worker and the
//! default prestige window. Formula constants (the score smoothing terms,
//! the prestige threshold tables, the reward divisors) are design constants
//! in code, deliberately not configurable.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::ids::IdGenerator;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker id baked into generated snowflakes (0-1023). Give every
    /// process writing to the same datastore a distinct value.
    #[serde(default)]
    pub worker_id: u16,

    #[serde(default)]
    pub prestige: PrestigeDefaults,
}

/// Default prestige window, overridable per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrestigeDefaults {
    /// Content published within this many days of "now" is too fresh to
    /// count toward prestige.
    #[serde(default = "default_time_offset_days")]
    pub time_offset_days: i64,

    /// Maximum number of content items averaged.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Most-recent items skipped inside the window.
    #[serde(default = "default_offset")]
    pub offset: usize,
}

fn default_time_offset_days() -> i64 {
    2
}

fn default_limit() -> usize {
    20
}

fn default_offset() -> usize {
    3
}

impl Default for PrestigeDefaults {
    fn default() -> Self {
        Self {
            time_offset_days: default_time_offset_days(),
            limit: default_limit(),
            offset: default_offset(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_id: 0,
            prestige: PrestigeDefaults::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_id > IdGenerator::MAX_WORKER_ID {
            return Err(ConfigError::Invalid(format!(
                "worker_id {} exceeds maximum {}",
                self.worker_id,
                IdGenerator::MAX_WORKER_ID
            )));
        }
        if self.prestige.time_offset_days < 0 {
            return Err(ConfigError::Invalid(
                "prestige.time_offset_days cannot be negative".to_string(),
            ));
        }
        if self.prestige.limit == 0 {
            return Err(ConfigError::Invalid(
                "prestige.limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
