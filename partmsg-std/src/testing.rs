//! Testing utilities for partmsg.
//!
//! - [`CallLog`]: a shared, ordered log of string entries
//! - [`Recorder`]: a listener owner that writes each delivery to a [`CallLog`]

use crate::bindings::Bindings;
use partmsg_core::{Message, current_event};
use std::{cell::RefCell, rc::Rc};

// ============================================================================
// Call Log
// ============================================================================

/// An ordered log shared between listeners and assertions.
///
/// # Example
///
/// ```rust,ignore
/// let log = CallLog::new();
/// let sink = log.clone();
/// bus.register(&owner, Bindings::new().on::<Touch>(move |_, ()| sink.record("touch")));
///
/// bus.send::<Touch>(&source, ())?;
/// assert_eq!(log.entries(), ["touch"]);
/// ```
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    /// A copy of the entries so far.
    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Remove and return the entries so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Forget every entry.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl std::fmt::Debug for CallLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.borrow().iter()).finish()
    }
}

// ============================================================================
// Recorder
// ============================================================================

/// A listener owner that logs `"<recorder>:<message>"` for every delivery.
///
/// `<message>` is the name of the message being dispatched, which for a
/// recorder listening to an ancestor is the descendant that was sent.
pub struct Recorder {
    name: String,
    log: CallLog,
}

impl Recorder {
    /// Create a recorder writing to `log`.
    pub fn new(name: impl Into<String>, log: &CallLog) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            log: log.clone(),
        })
    }

    /// The recorder's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a binding that logs every delivery of `M`.
    pub fn hears<M: Message>(bindings: Bindings<Recorder>) -> Bindings<Recorder> {
        bindings.listen::<M, (), ()>(|recorder, ()| recorder.hit())
    }

    fn hit(&self) {
        let message = current_event()
            .map(|info| info.message().name().to_owned())
            .unwrap_or_else(|_| "?".to_owned());
        self.log.record(format!("{}:{}", self.name, message));
    }
}
