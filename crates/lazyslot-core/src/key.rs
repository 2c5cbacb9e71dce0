//! Slot identifiers
//!
//! A [`SlotKey`] names one mount point that can host at most one live
//! widget instance.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Identifier of a widget mount point
///
/// Keys are opaque, but never empty. Whitespace around the key is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotKey(String);

impl SlotKey {
    /// Create a new key
    ///
    /// # Errors
    /// - `RegistryError::EmptyKey` if `id` is empty after trimming
    pub fn new(id: impl Into<String>) -> Result<Self, RegistryError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(RegistryError::EmptyKey);
        }
        if trimmed.len() == id.len() {
            Ok(Self(id))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Key as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SlotKey {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SlotKey {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for SlotKey {
    type Error = RegistryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SlotKey> for String {
    fn from(key: SlotKey) -> Self {
        key.0
    }
}

impl AsRef<str> for SlotKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SlotKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Conversion into a validated [`SlotKey`]
///
/// Lets registry operations accept `&str`, `String` and existing keys alike.
pub trait IntoSlotKey {
    /// Validate and convert
    ///
    /// # Errors
    /// - `RegistryError::EmptyKey` for empty input
    fn into_slot_key(self) -> Result<SlotKey, RegistryError>;
}

impl IntoSlotKey for SlotKey {
    #[inline]
    fn into_slot_key(self) -> Result<SlotKey, RegistryError> {
        Ok(self)
    }
}

impl IntoSlotKey for &SlotKey {
    #[inline]
    fn into_slot_key(self) -> Result<SlotKey, RegistryError> {
        Ok(self.clone())
    }
}

impl IntoSlotKey for &str {
    #[inline]
    fn into_slot_key(self) -> Result<SlotKey, RegistryError> {
        SlotKey::new(self)
    }
}

impl IntoSlotKey for String {
    #[inline]
    fn into_slot_key(self) -> Result<SlotKey, RegistryError> {
        SlotKey::new(self)
    }
}
