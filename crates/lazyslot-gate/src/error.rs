//! Error types for the visibility gate

use lazyslot_core::RegistryError;
use std::path::PathBuf;

/// Gate and controller errors
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Threshold outside `0.0..=1.0`
    #[error("visibility threshold must be within 0.0..=1.0, got {0}")]
    InvalidThreshold(f64),

    /// Debounce delay above the accepted maximum
    #[error("{field} must be at most {max} ms, got {ms}", max = crate::config::MAX_DELAY_MS)]
    InvalidDelay {
        /// Offending field
        field: &'static str,
        /// Configured value
        ms: u64,
    },

    /// Malformed TOML configuration
    #[error("invalid gate configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// IO error while reading configuration
    #[error("io error reading {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Widget construction failed
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl GateError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
