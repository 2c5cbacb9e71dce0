//! lazyslot core
//!
//! Lifecycle registry for expensive, visibility-gated widgets (GPU canvases,
//! scroll-driven effects). At most one instance is live per slot; every
//! construction is paired with exactly one teardown.
//!
//! # Core Concepts
//!
//! - [`SlotKey`]: Non-empty identifier of a mount point
//! - [`Instance`]: Normalized initializer output (nothing, a [`Teardown`], or a [`Widget`])
//! - [`WidgetRegistry`]: Owned registry, no locking
//! - [`SharedRegistry`]: Cloneable handle behind a mutex, plus a process-wide instance
//! - [`SlotLifecycle`]: Seam used by visibility controllers
//!
//! # Example
//!
//! ```rust
//! use lazyslot_core::{Teardown, WidgetRegistry};
//!
//! let mut registry = WidgetRegistry::new();
//! registry
//!     .register_with("hero", || Teardown::from_fn(|| println!("hero released")))
//!     .unwrap();
//!
//! assert_eq!(registry.active_keys(), vec!["hero"]);
//! registry.unregister("hero");
//! registry.unregister("hero"); // no-op
//! assert!(registry.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod instance;
mod key;
mod lifecycle;
mod registry;
mod shared;

pub use error::{BoxError, RegistryError};
pub use instance::{Instance, InstanceKind, IntoInstance, Teardown, Widget};
pub use key::{IntoSlotKey, SlotKey};
pub use lifecycle::{Initializer, SlotLifecycle};
pub use registry::{RegistryStats, WidgetRegistry};
pub use shared::SharedRegistry;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
