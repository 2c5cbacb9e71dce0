//! Error types for the widget registry
//!
//! Only construction failures surface to callers. Teardown failures are
//! contained inside the registry and reported through `tracing`.

use crate::key::SlotKey;

/// Boxed error produced by initializers and teardowns
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Slot key was empty or whitespace
    #[error("slot key must not be empty")]
    EmptyKey,

    /// Initializer returned an error; nothing is registered for the key
    #[error("initializer for slot '{key}' failed: {source}")]
    InitFailed {
        /// Slot whose construction failed
        key: SlotKey,
        /// Error raised by the initializer
        #[source]
        source: BoxError,
    },
}

impl RegistryError {
    /// Create an init failure for `key`
    #[inline]
    pub fn init_failed(key: SlotKey, source: impl Into<BoxError>) -> Self {
        Self::InitFailed {
            key,
            source: source.into(),
        }
    }

    /// Slot the error refers to, if any
    #[must_use]
    pub fn key(&self) -> Option<&SlotKey> {
        match self {
            Self::EmptyKey => None,
            Self::InitFailed { key, .. } => Some(key),
        }
    }
}
