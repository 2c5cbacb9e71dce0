//! Shared, lockable registry handle
//!
//! [`SharedRegistry`] lets several call sites reach one registry. The lock is
//! never held while an initializer or teardown runs, so a callback that
//! touches the registry does not deadlock.

use crate::error::{BoxError, RegistryError};
use crate::instance::IntoInstance;
use crate::key::{IntoSlotKey, SlotKey};
use crate::registry::{release_instance, Phase, RegistryStats, WidgetRegistry};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::convert::Infallible;
use std::sync::Arc;

static GLOBAL: Lazy<SharedRegistry> = Lazy::new(SharedRegistry::new);

/// Cloneable handle to a registry behind a mutex
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<WidgetRegistry>>,
}

impl SharedRegistry {
    /// Create new empty shared registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry, created empty on first use
    #[must_use]
    pub fn global() -> &'static SharedRegistry {
        &GLOBAL
    }

    /// See [`WidgetRegistry::register`]
    ///
    /// If another caller stores an instance for the same key while `init`
    /// runs, that instance is torn down when this one is stored.
    ///
    /// # Errors
    /// - `RegistryError::EmptyKey` if `key` is empty
    /// - `RegistryError::InitFailed` if `init` returns an error
    pub fn register<K, F, R, E>(&self, key: K, init: F) -> Result<(), RegistryError>
    where
        K: IntoSlotKey,
        F: FnOnce() -> Result<R, E>,
        R: IntoInstance,
        E: Into<BoxError>,
    {
        let key = key.into_slot_key()?;

        let previous = self.inner.lock().detach(key.as_str());
        if let Some(previous) = previous {
            let release = release_instance(key.as_str(), previous, Phase::Replace);
            let mut guard = self.inner.lock();
            let stats = guard.stats_mut();
            stats.replacements += 1;
            stats.record_release(&release);
        }

        match init() {
            Ok(value) => {
                let instance = value.into_instance();
                tracing::debug!(slot = %key, kind = ?instance.kind(), "widget registered");
                let displaced = self.inner.lock().attach(key.clone(), instance);
                if let Some(displaced) = displaced {
                    let release = release_instance(key.as_str(), displaced, Phase::Displaced);
                    self.inner.lock().stats_mut().record_release(&release);
                }
                Ok(())
            }
            Err(e) => {
                self.inner.lock().stats_mut().init_failures += 1;
                let err = RegistryError::init_failed(key, e);
                tracing::debug!(error = %err, "widget construction failed");
                Err(err)
            }
        }
    }

    /// See [`WidgetRegistry::register_with`]
    ///
    /// # Errors
    /// - `RegistryError::EmptyKey` if `key` is empty
    pub fn register_with<K, F, R>(&self, key: K, init: F) -> Result<(), RegistryError>
    where
        K: IntoSlotKey,
        F: FnOnce() -> R,
        R: IntoInstance,
    {
        self.register(key, || Ok::<R, Infallible>(init()))
    }

    /// See [`WidgetRegistry::unregister`]
    pub fn unregister(&self, key: &str) -> bool {
        let detached = self.inner.lock().detach(key);
        match detached {
            Some(instance) => {
                let release = release_instance(key, instance, Phase::Unregister);
                self.inner.lock().stats_mut().record_release(&release);
                true
            }
            None => false,
        }
    }

    /// See [`WidgetRegistry::pause`]
    ///
    /// Runs the widget's `pause` while the lock is held.
    pub fn pause(&self, key: &str) -> bool {
        self.inner.lock().pause(key)
    }

    /// See [`WidgetRegistry::resume`]
    ///
    /// Runs the widget's `resume` while the lock is held.
    pub fn resume(&self, key: &str) -> bool {
        self.inner.lock().resume(key)
    }

    /// See [`WidgetRegistry::clear`]
    pub fn clear(&self) -> usize {
        let entries = self.inner.lock().drain();
        let count = entries.len();
        for (key, instance) in entries {
            let release = release_instance(key.as_str(), instance, Phase::Clear);
            self.inner.lock().stats_mut().record_release(&release);
        }
        count
    }

    /// Snapshot of live keys, in registration order
    #[must_use]
    pub fn active_keys(&self) -> Vec<SlotKey> {
        self.inner.lock().slot_keys().cloned().collect()
    }

    /// Earliest-registered live key
    #[must_use]
    pub fn active_id(&self) -> Option<SlotKey> {
        self.inner.lock().slot_keys().next().cloned()
    }

    /// Check if `key` has a live instance
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains(key)
    }

    /// Number of live instances
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if no instance is live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Lifecycle counters
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        self.inner.lock().stats()
    }
}

impl From<WidgetRegistry> for SharedRegistry {
    fn from(registry: WidgetRegistry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }
}
