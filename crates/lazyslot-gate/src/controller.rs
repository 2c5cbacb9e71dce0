//! Section controller
//!
//! Binds one [`VisibilityGate`] to one registry slot and applies the gate's
//! actions through [`SlotLifecycle`].

use crate::config::GateConfig;
use crate::error::GateError;
use crate::gate::{Extent, GateAction, VisibilityGate};
use lazyslot_core::{BoxError, Instance, SlotKey, SlotLifecycle};
use std::fmt;
use std::time::Instant;

/// Widget constructor invoked on every `Init`
pub type WidgetFactory = Box<dyn FnMut() -> Result<Instance, BoxError> + Send>;

/// Visibility-driven owner of one slot
pub struct SectionController {
    key: SlotKey,
    gate: VisibilityGate,
    factory: WidgetFactory,
}

impl SectionController {
    /// Create controller for `key`
    pub fn new<F>(key: SlotKey, config: GateConfig, factory: F) -> Self
    where
        F: FnMut() -> Result<Instance, BoxError> + Send + 'static,
    {
        Self {
            key,
            gate: VisibilityGate::new(config),
            factory: Box::new(factory),
        }
    }

    /// Slot owned by this controller
    #[inline]
    #[must_use]
    pub fn key(&self) -> &SlotKey {
        &self.key
    }

    /// Underlying gate
    #[inline]
    #[must_use]
    pub fn gate(&self) -> &VisibilityGate {
        &self.gate
    }

    /// Feed a visibility observation and apply any immediate action
    ///
    /// # Errors
    /// Propagates construction failures from [`tick`](Self::tick).
    pub fn observe<L>(
        &mut self,
        host: &mut L,
        visible: bool,
        now: Instant,
    ) -> Result<Option<GateAction>, GateError>
    where
        L: SlotLifecycle + ?Sized,
    {
        match self.gate.observe(visible, now) {
            Some(action) => self.apply(host, action).map(Some),
            None => Ok(None),
        }
    }

    /// Feed section/viewport geometry and apply any immediate action
    ///
    /// # Errors
    /// Propagates construction failures.
    pub fn observe_geometry<L>(
        &mut self,
        host: &mut L,
        section: Extent,
        viewport: Extent,
        now: Instant,
    ) -> Result<Option<GateAction>, GateError>
    where
        L: SlotLifecycle + ?Sized,
    {
        match self.gate.observe_geometry(section, viewport, now) {
            Some(action) => self.apply(host, action).map(Some),
            None => Ok(None),
        }
    }

    /// Fire due timers and apply the resulting action
    ///
    /// # Errors
    /// - `GateError::Registry` if the widget factory fails. The slot is left
    ///   empty and the gate is reset, so the next visibility retries.
    pub fn tick<L>(&mut self, host: &mut L, now: Instant) -> Result<Option<GateAction>, GateError>
    where
        L: SlotLifecycle + ?Sized,
    {
        match self.gate.poll(now) {
            Some(action) => self.apply(host, action).map(Some),
            None => Ok(None),
        }
    }

    /// Reset the gate and tear down the slot
    ///
    /// Returns `true` if a live instance was removed.
    pub fn unmount<L>(&mut self, host: &mut L) -> bool
    where
        L: SlotLifecycle + ?Sized,
    {
        self.gate.reset();
        host.unregister_slot(self.key.as_str())
    }

    fn apply<L>(&mut self, host: &mut L, action: GateAction) -> Result<GateAction, GateError>
    where
        L: SlotLifecycle + ?Sized,
    {
        match action {
            GateAction::Init => {
                let factory = &mut self.factory;
                if let Err(e) = host.register_slot(&self.key, Box::new(|| factory())) {
                    tracing::warn!(slot = %self.key, error = %e, "section init failed");
                    self.gate.reset();
                    return Err(e.into());
                }
                tracing::debug!(slot = %self.key, "section initialized");
            }
            GateAction::Pause => {
                if !host.pause_slot(self.key.as_str()) {
                    tracing::debug!(slot = %self.key, "widget does not support pause");
                }
            }
            GateAction::Resume => {
                if !host.resume_slot(self.key.as_str()) {
                    tracing::debug!(slot = %self.key, "widget does not support resume");
                }
            }
        }
        Ok(action)
    }
}

impl fmt::Debug for SectionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionController")
            .field("key", &self.key)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
