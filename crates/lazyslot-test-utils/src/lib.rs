//! Testing utilities for lazyslot workspace
//!
//! Shared call log, recording teardowns and probe widgets.

#![allow(missing_docs)]

use lazyslot_core::{BoxError, Instance, SlotKey, Teardown, Widget};
use parking_lot::Mutex;
use std::sync::Arc;

/// Ordered record of lifecycle calls, shared between closures
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        self.lines.lock().push(line.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn count(&self, line: &str) -> usize {
        self.lines.lock().iter().filter(|l| *l == line).count()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Teardown that appends `line` when run
    pub fn teardown(&self, line: &str) -> Teardown {
        let log = self.clone();
        let line = line.to_string();
        Teardown::from_fn(move || log.push(line))
    }

    /// Teardown that appends `line`, then fails
    pub fn failing_teardown(&self, line: &str) -> Teardown {
        let log = self.clone();
        let line = line.to_string();
        Teardown::new(move || {
            log.push(line);
            Err("teardown failed".into())
        })
    }

    /// Teardown that appends `line`, then panics
    pub fn panicking_teardown(&self, line: &str) -> Teardown {
        let log = self.clone();
        let line = line.to_string();
        Teardown::from_fn(move || {
            log.push(line);
            panic!("teardown panicked");
        })
    }

    /// Widget logging `<name>-pause`, `<name>-resume` and `<name>-down`
    pub fn widget(&self, name: &str) -> Instance {
        Instance::widget(ProbeWidget {
            name: name.to_string(),
            log: self.clone(),
            fail_destroy: false,
        })
    }

    /// Like [`CallLog::widget`], but `destroy` returns an error
    pub fn failing_widget(&self, name: &str) -> Instance {
        Instance::widget(ProbeWidget {
            name: name.to_string(),
            log: self.clone(),
            fail_destroy: true,
        })
    }
}

/// Widget recording its lifecycle into a [`CallLog`]
#[derive(Debug)]
pub struct ProbeWidget {
    name: String,
    log: CallLog,
    fail_destroy: bool,
}

impl Widget for ProbeWidget {
    fn destroy(self: Box<Self>) -> Result<(), BoxError> {
        self.log.push(format!("{}-down", self.name));
        if self.fail_destroy {
            return Err(format!("{} destroy failed", self.name).into());
        }
        Ok(())
    }

    fn pause(&mut self) -> bool {
        self.log.push(format!("{}-pause", self.name));
        true
    }

    fn resume(&mut self) -> bool {
        self.log.push(format!("{}-resume", self.name));
        true
    }
}

pub fn key(id: &str) -> SlotKey {
    SlotKey::new(id).unwrap()
}
