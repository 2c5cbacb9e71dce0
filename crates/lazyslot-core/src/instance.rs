//! Live widget instances
//!
//! Initializers may hand back nothing, a teardown callback, or a widget
//! object with its own `destroy`. [`IntoInstance`] normalizes all of these
//! into one [`Instance`] at the registry boundary.

use crate::error::BoxError;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Heavy widget owning resources that must be released explicitly
pub trait Widget: Send {
    /// Release all resources held by the widget
    ///
    /// # Errors
    /// Any error is logged by the registry and otherwise ignored.
    fn destroy(self: Box<Self>) -> Result<(), BoxError>;

    /// Suspend rendering while keeping resources alive
    ///
    /// Returns `false` if the widget does not support pausing.
    fn pause(&mut self) -> bool {
        false
    }

    /// Resume after [`Widget::pause`]
    fn resume(&mut self) -> bool {
        false
    }
}

/// One-shot cleanup callback
pub struct Teardown(Box<dyn FnOnce() -> Result<(), BoxError> + Send>);

impl Teardown {
    /// Wrap a fallible cleanup closure
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        Self(Box::new(f))
    }

    /// Wrap a cleanup closure that cannot fail
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(move || {
            f();
            Ok(())
        }))
    }

    /// Consume and run the callback
    ///
    /// # Errors
    /// Whatever the wrapped closure returns.
    #[inline]
    pub fn run(self) -> Result<(), BoxError> {
        (self.0)()
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Teardown(..)")
    }
}

/// Normalized result of a widget initializer
pub enum Instance {
    /// Nothing to release
    Bare,
    /// Cleanup callback
    Teardown(Teardown),
    /// Widget object with destroy/pause/resume
    Widget(Box<dyn Widget>),
}

/// Discriminant of [`Instance`], for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceKind {
    /// [`Instance::Bare`]
    Bare,
    /// [`Instance::Teardown`]
    Teardown,
    /// [`Instance::Widget`]
    Widget,
}

impl Instance {
    /// Wrap a concrete widget
    pub fn widget(widget: impl Widget + 'static) -> Self {
        Self::Widget(Box::new(widget))
    }

    /// Wrap an infallible cleanup closure
    pub fn teardown(f: impl FnOnce() + Send + 'static) -> Self {
        Self::Teardown(Teardown::from_fn(f))
    }

    /// Variant of this instance
    #[inline]
    #[must_use]
    pub fn kind(&self) -> InstanceKind {
        match self {
            Self::Bare => InstanceKind::Bare,
            Self::Teardown(_) => InstanceKind::Teardown,
            Self::Widget(_) => InstanceKind::Widget,
        }
    }

    pub(crate) fn pause(&mut self) -> bool {
        match self {
            Self::Widget(widget) => widget.pause(),
            _ => false,
        }
    }

    pub(crate) fn resume(&mut self) -> bool {
        match self {
            Self::Widget(widget) => widget.resume(),
            _ => false,
        }
    }

    /// Run the release path, containing both errors and panics
    pub(crate) fn release(self) -> Release {
        let outcome = match self {
            Self::Bare => return Release::Nothing,
            Self::Teardown(teardown) => panic::catch_unwind(AssertUnwindSafe(|| teardown.run())),
            Self::Widget(widget) => panic::catch_unwind(AssertUnwindSafe(|| widget.destroy())),
        };
        match outcome {
            Ok(Ok(())) => Release::Clean,
            Ok(Err(e)) => Release::Failed(e.to_string()),
            Err(payload) => Release::Failed(format!("panicked: {}", panic_message(&*payload))),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instance").field(&self.kind()).finish()
    }
}

/// Outcome of releasing an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Release {
    /// Instance had no teardown
    Nothing,
    /// Teardown ran to completion
    Clean,
    /// Teardown returned an error or panicked
    Failed(String),
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Conversion of initializer output into an [`Instance`]
pub trait IntoInstance {
    /// Normalize
    fn into_instance(self) -> Instance;
}

impl IntoInstance for Instance {
    #[inline]
    fn into_instance(self) -> Instance {
        self
    }
}

impl IntoInstance for () {
    #[inline]
    fn into_instance(self) -> Instance {
        Instance::Bare
    }
}

impl IntoInstance for Teardown {
    #[inline]
    fn into_instance(self) -> Instance {
        Instance::Teardown(self)
    }
}

impl IntoInstance for Box<dyn Widget> {
    #[inline]
    fn into_instance(self) -> Instance {
        Instance::Widget(self)
    }
}

impl<T: IntoInstance> IntoInstance for Option<T> {
    #[inline]
    fn into_instance(self) -> Instance {
        self.map_or(Instance::Bare, IntoInstance::into_instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Canvas {
        destroyed: Arc<AtomicUsize>,
    }

    impl Widget for Canvas {
        fn destroy(self: Box<Self>) -> Result<(), BoxError> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn pause(&mut self) -> bool {
            true
        }
    }

    #[test]
    fn unit_normalizes_to_bare() {
        assert_eq!(().into_instance().kind(), InstanceKind::Bare);
        assert_eq!(None::<Teardown>.into_instance().kind(), InstanceKind::Bare);
    }

    #[test]
    fn teardown_normalizes() {
        let instance = Some(Teardown::from_fn(|| {})).into_instance();
        assert_eq!(instance.kind(), InstanceKind::Teardown);
        assert_eq!(instance.release(), Release::Clean);
    }

    #[test]
    fn widget_release_calls_destroy() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let boxed: Box<dyn Widget> = Box::new(Canvas {
            destroyed: Arc::clone(&destroyed),
        });
        let mut instance = boxed.into_instance();
        assert!(instance.pause());
        assert!(!instance.resume());
        assert_eq!(instance.release(), Release::Clean);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bare_release_is_nothing() {
        assert_eq!(Instance::Bare.release(), Release::Nothing);
    }

    #[test]
    fn failing_teardown_is_contained() {
        let instance = Instance::Teardown(Teardown::new(|| Err("gl context lost".into())));
        assert_eq!(
            instance.release(),
            Release::Failed("gl context lost".to_string())
        );
    }

    #[test]
    fn panicking_teardown_is_contained() {
        let instance = Instance::teardown(|| panic!("boom"));
        match instance.release() {
            Release::Failed(msg) => assert!(msg.contains("boom")),
            other => panic!("unexpected release outcome: {other:?}"),
        }
    }
}
