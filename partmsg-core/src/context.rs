//! The per-thread "current event" stack.
//!
//! Every dispatch pushes an [`EventInfo`] frame for its dynamic extent, so a
//! listener can ask which message, source and arguments it is being called
//! for without receiving them as parameters. Nested sends push further
//! frames; each frame is popped by its [`ContextGuard`] on every exit path.

use crate::{error::ContextError, info::EventInfo};
use std::{cell::RefCell, marker::PhantomData, rc::Rc};

thread_local! {
    static STACK: RefCell<Vec<Rc<EventInfo>>> = const { RefCell::new(Vec::new()) };
}

/// Pops its frame when dropped.
///
/// The guard is `!Send`: a frame must be popped on the thread that pushed it.
#[must_use = "the frame is popped as soon as the guard is dropped"]
pub struct ContextGuard {
    frame: Rc<EventInfo>,
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    /// The frame this guard owns.
    pub fn info(&self) -> &Rc<EventInfo> {
        &self.frame
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        // `try_with` tolerates guards dropped during thread-local teardown.
        let _ = STACK.try_with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert!(
                popped.is_some_and(|top| Rc::ptr_eq(&top, &self.frame)),
                "current-event frames popped out of order"
            );
        });
    }
}

/// Push `info` as the innermost frame.
pub fn push(info: Rc<EventInfo>) -> ContextGuard {
    STACK.with(|stack| stack.borrow_mut().push(Rc::clone(&info)));
    ContextGuard {
        frame: info,
        _not_send: PhantomData,
    }
}

/// The innermost in-flight dispatch on this thread.
pub fn current_event() -> Result<Rc<EventInfo>, ContextError> {
    STACK
        .with(|stack| stack.borrow().last().cloned())
        .ok_or(ContextError::NoActiveDispatch)
}

/// Number of dispatches in flight on this thread.
pub fn depth() -> usize {
    STACK.with(|stack| stack.borrow().len())
}
