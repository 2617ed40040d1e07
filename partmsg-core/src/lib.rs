//! # partmsg-core
//!
//! Core types for the partmsg message bus.
//!
//! This crate has minimal dependencies and holds everything a message or
//! listener declaration needs, without the dispatch engine in `partmsg-std`.
//!
//! # Model
//!
//! ## Messages ([`Message`])
//!
//! A message is a zero-sized Rust type that declares a unique name, an
//! optional parent message and a positional parameter list. Parents form a
//! single-inheritance hierarchy: a listener bound to a parent also hears every
//! descendant, receiving the leading arguments it declares.
//!
//! ## Arguments ([`ArgList`], [`Arg`])
//!
//! Sends carry type-erased positional arguments. Typed code speaks tuples and
//! converts through [`ArgList`]; a listener's tuple must be a prefix of its
//! message's tuple.
//!
//! ## Applicability ([`Applicability`])
//!
//! Listeners can be limited to host scenes and to relations between the
//! sending entity and their own entity.
//!
//! ## Context ([`current_event`])
//!
//! A per-thread stack describes the dispatch currently running, so listeners
//! can inspect the full message without taking it as a parameter.
//!
//! # Error Types
//!
//! - [`PartMsgError`] - Top-level error type
//! - [`DispatchError`] - Errors returned by a send
//! - [`ListenerError`] - Errors returned by listener bodies

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod arguments;
pub mod context;
mod error;
mod info;
mod message;
mod outcome;
mod scope;

// Re-exports
pub use arguments::{Arg, ArgList, ArgValue, ParamSpec, ParamType, arg};
pub use context::{ContextGuard, current_event};
pub use error::{
    ArgMismatch, BoxError, CatalogError, ContextError, DispatchError, ListenerError, PartMsgError,
    RegistrationError, SceneOutOfRange, ScopeError,
};
pub use info::{EntityId, EventInfo, Source, SourceId};
pub use message::{Ancestors, Message, MessageDecl, MessageDescriptor, MessageKey};
pub use outcome::IntoOutcome;
pub use scope::{Applicability, FlatRelations, Relation, RelationResolver, Scene, SceneMask};
