//! lazyslot gate
//!
//! Visibility glue for the lazyslot registry: decides *when* a heavy widget
//! is constructed, paused and resumed, based on viewport intersection and
//! debounce timers.
//!
//! # Core Concepts
//!
//! - [`GateConfig`]: Threshold, root margin and debounce delays (TOML-loadable)
//! - [`VisibilityGate`]: Clock-injected state machine producing [`GateAction`]s
//! - [`SectionController`]: Applies gate actions to a [`lazyslot_core::SlotLifecycle`]
//!
//! # Example
//!
//! ```rust
//! use lazyslot_core::{Instance, SlotKey, WidgetRegistry};
//! use lazyslot_gate::{GateAction, GateConfig, SectionController};
//! use std::time::{Duration, Instant};
//!
//! let mut registry = WidgetRegistry::new();
//! let mut section = SectionController::new(
//!     SlotKey::new("framer3").unwrap(),
//!     GateConfig::default(),
//!     || Ok(Instance::teardown(|| {})),
//! );
//!
//! let t0 = Instant::now();
//! section.observe(&mut registry, true, t0).unwrap();
//! let action = section.tick(&mut registry, t0 + Duration::from_millis(50)).unwrap();
//! assert_eq!(action, Some(GateAction::Init));
//! assert!(registry.contains("framer3"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod controller;
mod error;
mod gate;

pub use config::{GateConfig, MAX_DELAY_MS};
pub use controller::{SectionController, WidgetFactory};
pub use error::GateError;
pub use gate::{intersection_ratio, Extent, GateAction, GateState, VisibilityGate};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
