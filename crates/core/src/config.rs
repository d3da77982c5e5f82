//! Tracker configuration
//!
//! Durations are expressed in milliseconds on disk:
//!
//! ```toml
//! [read]
//! debounce_ms = 1000
//! max_debounce_ms = 5000
//!
//! [write]
//! debounce_ms = 1000
//! max_debounce_ms = 5000
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default quiet period before a run is emitted
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// Default ceiling on a run's lifetime
pub const DEFAULT_MAX_DEBOUNCE: Duration = Duration::from_secs(5);

/// Debounce settings for one tracker
///
/// Can only be built through [`TrackerConfig::new`] (or deserialization,
/// which goes through it), so `max_debounce >= debounce` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTrackerConfig", into = "RawTrackerConfig")]
pub struct TrackerConfig {
    debounce: Duration,
    max_debounce: Duration,
}

impl TrackerConfig {
    /// Create a validated config
    pub fn new(debounce: Duration, max_debounce: Duration) -> Result<Self> {
        if max_debounce < debounce {
            return Err(Error::InvalidConfig {
                debounce,
                max_debounce,
            });
        }

        Ok(Self {
            debounce,
            max_debounce,
        })
    }

    /// Quiet period after the most recent occurrence
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Hard ceiling on a run's lifetime from its first occurrence
    pub fn max_debounce(&self) -> Duration {
        self.max_debounce
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            max_debounce: DEFAULT_MAX_DEBOUNCE,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawTrackerConfig {
    #[serde(default = "default_debounce_ms")]
    debounce_ms: u64,
    #[serde(default = "default_max_debounce_ms")]
    max_debounce_ms: u64,
}

impl TryFrom<RawTrackerConfig> for TrackerConfig {
    type Error = Error;

    fn try_from(raw: RawTrackerConfig) -> Result<Self> {
        Self::new(
            Duration::from_millis(raw.debounce_ms),
            Duration::from_millis(raw.max_debounce_ms),
        )
    }
}

impl From<TrackerConfig> for RawTrackerConfig {
    fn from(config: TrackerConfig) -> Self {
        Self {
            debounce_ms: config.debounce.as_millis() as u64,
            max_debounce_ms: config.max_debounce.as_millis() as u64,
        }
    }
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

fn default_max_debounce_ms() -> u64 {
    DEFAULT_MAX_DEBOUNCE.as_millis() as u64
}

/// Per-operation-kind configuration for a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Shared directory reads
    #[serde(default)]
    pub read: TrackerConfig,

    /// Shared directory writes
    #[serde(default)]
    pub write: TrackerConfig,
}

impl AuditConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Render configuration as TOML
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
