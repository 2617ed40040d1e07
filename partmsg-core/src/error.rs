//! Error types for partmsg.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`PartMsgError`] - Top-level error type for all bus operations
//! - [`CatalogError`] - Broken message declarations
//! - [`RegistrationError`] - A listener binding that could not be installed
//! - [`DispatchError`] - Errors surfacing from a `send`
//! - [`ListenerError`] - What a listener body reports back to the engine
//! - [`ContextError`] / [`ScopeError`] - Protocol misuse by the caller
//! - [`SceneOutOfRange`] - A scene index that does not fit a scene mask

use thiserror::Error;

/// A boxed error type for listener bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all partmsg operations.
#[derive(Error, Debug)]
pub enum PartMsgError {
    /// A message declaration is invalid.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A listener binding was rejected.
    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// A dispatch failed.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// The current-event context was queried outside a dispatch.
    #[error("context error: {0}")]
    Context(#[from] ContextError),

    /// A filter scope was misused.
    #[error("scope error: {0}")]
    Scope(#[from] ScopeError),
}

/// Configuration errors found while resolving message declarations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The parent chain of a message loops back onto itself.
    #[error("message `{message}` has a cyclic parent chain")]
    Cycle {
        /// Message whose chain revisited an earlier link.
        message: String,
    },

    /// A parent declares parameters that are not a prefix of the child's.
    #[error("message `{message}` is incompatible with its parent `{parent}`: expected parameters ({expected}) to start with ({found})")]
    IncompatibleParent {
        /// The child message.
        message: String,
        /// The declared parent.
        parent: String,
        /// The child's parameter list.
        expected: String,
        /// The parent's parameter list.
        found: String,
    },

    /// Two distinct message identities declare the same name.
    #[error("message name `{0}` is declared by more than one type")]
    DuplicateName(String),

    /// No declaration is known under this name.
    #[error("no message declared under the name `{0}`")]
    Undeclared(String),
}

/// Reasons a single listener binding is refused during `register`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The bound message could not be resolved.
    #[error("binding `{binding}`: {source}")]
    Catalog {
        /// Type name of the rejected binding.
        binding: &'static str,
        /// Underlying catalog failure.
        #[source]
        source: CatalogError,
    },

    /// The listener parameters are not a prefix of the message parameters.
    #[error("binding `{binding}` does not fit message `{message}`: expected a prefix of ({expected}), found ({found})")]
    SignatureMismatch {
        /// Type name of the rejected binding.
        binding: &'static str,
        /// Message the binding was declared for.
        message: String,
        /// The message's parameter list.
        expected: String,
        /// The listener's parameter list.
        found: String,
    },
}

/// Positional arguments that do not fit a declared parameter list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgMismatch {
    /// Fewer arguments were supplied than parameters declared.
    #[error("expected at least {expected} arguments, found {found}")]
    Missing {
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        found: usize,
    },

    /// An argument has a different type than its parameter.
    #[error("argument {index} has type `{found}`, expected `{expected}`")]
    Type {
        /// Zero-based position.
        index: usize,
        /// Declared parameter type.
        expected: &'static str,
        /// Supplied argument type.
        found: &'static str,
    },
}

/// Failure reported by a listener body.
#[derive(Error, Debug)]
pub enum ListenerError {
    /// The binding's target is gone (a proxied object vanished, the owner
    /// changed type). The engine logs this and keeps delivering.
    #[error("listener target is gone: {0}")]
    TargetGone(String),

    /// The listener's own logic failed. The engine aborts delivery and
    /// returns this to the caller of `send`.
    #[error(transparent)]
    Failed(BoxError),
}

/// Errors that can surface from a `send`.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The message could not be resolved.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The arguments do not fit the message's parameters.
    #[error("arguments for `{message}` do not fit: {source}")]
    Arguments {
        /// Message being sent.
        message: String,
        /// Mismatch detail.
        #[source]
        source: ArgMismatch,
    },

    /// A listener failed; delivery stopped at that listener.
    #[error("listener `{binding}` for `{message}` failed")]
    Listener {
        /// Message being delivered (the ancestor bucket the listener sits in).
        message: String,
        /// Type name of the failing binding.
        binding: &'static str,
        /// The listener's error.
        #[source]
        source: BoxError,
    },

    /// Reentrant sends nested deeper than the configured limit.
    #[error("dispatch depth limit exceeded (depth={depth}, max={max_depth})")]
    DepthExceeded {
        /// Depth the rejected send would have reached.
        depth: usize,
        /// Configured maximum.
        max_depth: usize,
    },
}

/// The current-event context was used outside a dispatch.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// No `send` is running on this thread.
    #[error("no message is being dispatched on this thread")]
    NoActiveDispatch,
}

/// Misuse of a filter scope handle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    /// The entry was already removed from the filter chain.
    #[error("filter scope {0} is not installed")]
    NotInstalled(u64),

    /// The bus owning the scope has been dropped.
    #[error("the bus owning this scope has been dropped")]
    BusDropped,
}

/// A scene index above [`Scene::MAX`](crate::Scene::MAX).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("scene index {0} is out of range (0..=31)")]
pub struct SceneOutOfRange(pub u8);

impl From<BoxError> for ListenerError {
    fn from(err: BoxError) -> Self {
        ListenerError::Failed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_cycle() {
        let err = CatalogError::Cycle {
            message: "a::Touch".into(),
        };
        assert_eq!(err.to_string(), "message `a::Touch` has a cyclic parent chain");
    }

    #[test]
    fn display_arg_mismatch() {
        let err = ArgMismatch::Type {
            index: 1,
            expected: "f64",
            found: "i32",
        };
        assert_eq!(err.to_string(), "argument 1 has type `i32`, expected `f64`");
    }

    #[test]
    fn display_depth_exceeded() {
        let err = DispatchError::DepthExceeded {
            depth: 9,
            max_depth: 8,
        };
        assert_eq!(
            err.to_string(),
            "dispatch depth limit exceeded (depth=9, max=8)"
        );
    }

    #[test]
    fn listener_error_from_box() {
        let boxed: BoxError = "boom".into();
        let err = ListenerError::from(boxed);
        assert!(matches!(err, ListenerError::Failed(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn umbrella_wraps_scope_error() {
        let err: PartMsgError = ScopeError::NotInstalled(3).into();
        assert_eq!(err.to_string(), "scope error: filter scope 3 is not installed");
    }
}
