//! Host-facing lifecycle seam
//!
//! [`SlotLifecycle`] is what visibility glue talks to. Both the owned
//! [`WidgetRegistry`] and the [`SharedRegistry`] handle implement it.

use crate::error::{BoxError, RegistryError};
use crate::instance::Instance;
use crate::key::SlotKey;
use crate::registry::WidgetRegistry;
use crate::shared::SharedRegistry;

/// Boxed widget initializer
pub type Initializer<'a> = Box<dyn FnOnce() -> Result<Instance, BoxError> + 'a>;

/// Operations a visibility controller needs from a registry
pub trait SlotLifecycle {
    /// Register the instance produced by `init` under `key`
    ///
    /// # Errors
    /// - `RegistryError::InitFailed` if `init` fails
    fn register_slot(&mut self, key: &SlotKey, init: Initializer<'_>) -> Result<(), RegistryError>;

    /// Tear down `key`; `false` if nothing was live
    fn unregister_slot(&mut self, key: &str) -> bool;

    /// Pause the live widget for `key`
    fn pause_slot(&mut self, key: &str) -> bool;

    /// Resume the live widget for `key`
    fn resume_slot(&mut self, key: &str) -> bool;

    /// Check if `key` has a live instance
    fn is_live(&self, key: &str) -> bool;
}

impl SlotLifecycle for WidgetRegistry {
    fn register_slot(&mut self, key: &SlotKey, init: Initializer<'_>) -> Result<(), RegistryError> {
        self.register(key, init)
    }

    fn unregister_slot(&mut self, key: &str) -> bool {
        self.unregister(key)
    }

    fn pause_slot(&mut self, key: &str) -> bool {
        self.pause(key)
    }

    fn resume_slot(&mut self, key: &str) -> bool {
        self.resume(key)
    }

    fn is_live(&self, key: &str) -> bool {
        self.contains(key)
    }
}

impl SlotLifecycle for SharedRegistry {
    fn register_slot(&mut self, key: &SlotKey, init: Initializer<'_>) -> Result<(), RegistryError> {
        self.register(key, init)
    }

    fn unregister_slot(&mut self, key: &str) -> bool {
        self.unregister(key)
    }

    fn pause_slot(&mut self, key: &str) -> bool {
        self.pause(key)
    }

    fn resume_slot(&mut self, key: &str) -> bool {
        self.resume(key)
    }

    fn is_live(&self, key: &str) -> bool {
        self.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle<L: SlotLifecycle>(host: &mut L) {
        let key = SlotKey::new("framer3").unwrap();
        host.register_slot(&key, Box::new(|| Ok::<_, BoxError>(Instance::teardown(|| {}))))
            .unwrap();
        assert!(host.is_live("framer3"));
        assert!(!host.pause_slot("framer3"));
        assert!(host.unregister_slot("framer3"));
        assert!(!host.unregister_slot("framer3"));
    }

    #[test]
    fn owned_registry_implements_lifecycle() {
        cycle(&mut WidgetRegistry::new());
    }

    #[test]
    fn shared_registry_implements_lifecycle() {
        cycle(&mut SharedRegistry::new());
    }

    #[test]
    fn failing_boxed_initializer_propagates() {
        let mut registry = WidgetRegistry::new();
        let key = SlotKey::new("grid").unwrap();
        let result = registry.register_slot(
            &key,
            Box::new(|| Err::<Instance, BoxError>("shader compile".into())),
        );
        assert!(matches!(result, Err(RegistryError::InitFailed { .. })));
        assert!(!registry.is_live("grid"));
    }
}
