//! Widget lifecycle registry
//!
//! Provides [`WidgetRegistry`], which keeps at most one live instance per
//! slot and pairs every construction with exactly one teardown.
//!
//! # Ordering
//! - `register` on an occupied slot tears the old instance down *before*
//!   the new initializer runs.
//! - Entries are kept in registration order; a replaced slot moves to the end.

use crate::error::{BoxError, RegistryError};
use crate::instance::{Instance, IntoInstance, Release};
use crate::key::{IntoSlotKey, SlotKey};
use indexmap::IndexMap;
use serde::Serialize;
use std::convert::Infallible;

/// Why an instance is being released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Slot is being re-registered
    Replace,
    /// Explicit unregister
    Unregister,
    /// Registry-wide clear
    Clear,
    /// Concurrent registration displaced a live instance
    Displaced,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Unregister => "unregister",
            Self::Clear => "clear",
            Self::Displaced => "displaced",
        }
    }
}

/// Lifecycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Successful registrations
    pub registrations: u64,
    /// Registrations that replaced a live instance
    pub replacements: u64,
    /// Teardowns invoked (bare instances excluded)
    pub teardowns: u64,
    /// Teardowns that returned an error or panicked
    pub teardown_failures: u64,
    /// Initializers that returned an error
    pub init_failures: u64,
}

impl RegistryStats {
    pub(crate) fn record_release(&mut self, release: &Release) {
        match release {
            Release::Nothing => {}
            Release::Clean => self.teardowns += 1,
            Release::Failed(_) => {
                self.teardowns += 1;
                self.teardown_failures += 1;
            }
        }
    }
}

/// Registry of live heavy widgets, one per slot
///
/// The registry is a plain owned value: create one per host (or per test)
/// and mutate it through [`register`](Self::register) and
/// [`unregister`](Self::unregister). Dropping it does not run outstanding
/// teardowns; call [`clear`](Self::clear) for that.
#[derive(Debug, Default)]
pub struct WidgetRegistry {
    entries: IndexMap<SlotKey, Instance>,
    stats: RegistryStats,
}

impl WidgetRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a widget for `key`, replacing any live instance
    ///
    /// The previous instance (if any) is removed and torn down first. A
    /// failing teardown is logged and does not stop registration.
    ///
    /// # Errors
    /// - `RegistryError::EmptyKey` if `key` is empty
    /// - `RegistryError::InitFailed` if `init` returns an error; the slot is
    ///   left empty
    pub fn register<K, F, R, E>(&mut self, key: K, init: F) -> Result<(), RegistryError>
    where
        K: IntoSlotKey,
        F: FnOnce() -> Result<R, E>,
        R: IntoInstance,
        E: Into<BoxError>,
    {
        let key = key.into_slot_key()?;

        if let Some(previous) = self.entries.shift_remove(&key) {
            self.stats.replacements += 1;
            let release = release_instance(key.as_str(), previous, Phase::Replace);
            self.stats.record_release(&release);
        }

        match init() {
            Ok(value) => {
                let instance = value.into_instance();
                tracing::debug!(slot = %key, kind = ?instance.kind(), "widget registered");
                self.entries.insert(key, instance);
                self.stats.registrations += 1;
                Ok(())
            }
            Err(e) => {
                self.stats.init_failures += 1;
                let err = RegistryError::init_failed(key, e);
                tracing::debug!(error = %err, "widget construction failed");
                Err(err)
            }
        }
    }

    /// [`register`](Self::register) for initializers that cannot fail
    ///
    /// # Errors
    /// - `RegistryError::EmptyKey` if `key` is empty
    pub fn register_with<K, F, R>(&mut self, key: K, init: F) -> Result<(), RegistryError>
    where
        K: IntoSlotKey,
        F: FnOnce() -> R,
        R: IntoInstance,
    {
        self.register(key, || Ok::<R, Infallible>(init()))
    }

    /// Tear down and remove the instance for `key`
    ///
    /// Idempotent: unknown keys are ignored. Teardown errors and panics are
    /// logged, never propagated. Returns `true` if an entry was removed.
    pub fn unregister(&mut self, key: &str) -> bool {
        match self.entries.shift_remove(key) {
            Some(instance) => {
                let release = release_instance(key, instance, Phase::Unregister);
                self.stats.record_release(&release);
                true
            }
            None => false,
        }
    }

    /// Pause the live widget for `key`
    ///
    /// Returns `false` if the slot is empty or its instance cannot pause.
    pub fn pause(&mut self, key: &str) -> bool {
        self.entries.get_mut(key).is_some_and(Instance::pause)
    }

    /// Resume the live widget for `key`
    pub fn resume(&mut self, key: &str) -> bool {
        self.entries.get_mut(key).is_some_and(Instance::resume)
    }

    /// Tear down every live instance in registration order
    ///
    /// Returns the number of entries removed.
    pub fn clear(&mut self) -> usize {
        let entries = std::mem::take(&mut self.entries);
        let count = entries.len();
        for (key, instance) in entries {
            let release = release_instance(key.as_str(), instance, Phase::Clear);
            self.stats.record_release(&release);
        }
        count
    }

    /// Keys with a live instance, in registration order
    #[must_use]
    pub fn active_keys(&self) -> Vec<&str> {
        self.entries.keys().map(SlotKey::as_str).collect()
    }

    /// Earliest-registered live key
    #[inline]
    #[must_use]
    pub fn active_id(&self) -> Option<&str> {
        self.entries.keys().next().map(SlotKey::as_str)
    }

    /// Check if `key` has a live instance
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of live instances
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no instance is live
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lifecycle counters
    #[inline]
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        self.stats
    }

    pub(crate) fn slot_keys(&self) -> impl Iterator<Item = &SlotKey> {
        self.entries.keys()
    }

    pub(crate) fn detach(&mut self, key: &str) -> Option<Instance> {
        self.entries.shift_remove(key)
    }

    /// Store `instance`, returning whatever was live for `key` meanwhile
    pub(crate) fn attach(&mut self, key: SlotKey, instance: Instance) -> Option<Instance> {
        let displaced = self.entries.shift_remove(&key);
        self.entries.insert(key, instance);
        self.stats.registrations += 1;
        displaced
    }

    pub(crate) fn stats_mut(&mut self) -> &mut RegistryStats {
        &mut self.stats
    }

    pub(crate) fn drain(&mut self) -> IndexMap<SlotKey, Instance> {
        std::mem::take(&mut self.entries)
    }
}

/// Release `instance`, logging a warning on failure
pub(crate) fn release_instance(key: &str, instance: Instance, phase: Phase) -> Release {
    let release = instance.release();
    match &release {
        Release::Failed(reason) => {
            tracing::warn!(slot = key, phase = phase.as_str(), %reason, "widget teardown failed");
        }
        Release::Clean => {
            tracing::debug!(slot = key, phase = phase.as_str(), "widget torn down");
        }
        Release::Nothing => {}
    }
    release
}
