//! Error types for audit-core

use std::path::PathBuf;
use std::time::Duration;

/// Result type for audit-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or loading configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// max-debounce shorter than debounce
    #[error("invalid tracker config: max_debounce ({max_debounce:?}) must be >= debounce ({debounce:?})")]
    InvalidConfig {
        debounce: Duration,
        max_debounce: Duration,
    },

    /// Config file could not be parsed
    #[error("failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Config file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
