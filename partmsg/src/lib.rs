//! # partmsg - Typed In-Process Message Bus
//!
//! `partmsg` delivers hierarchically typed messages to weakly held
//! listeners, synchronously, on the sending thread.
//!
//! - **Messages** form a single-inheritance tree. A listener of a parent
//!   message also hears its descendants, receiving the leading arguments it
//!   declares.
//! - **Listeners** are registered per owner object and never keep the owner
//!   alive; records of dropped owners are pruned during delivery.
//! - **Scopes** (filter, ignore, consolidate) intercept dispatches before
//!   delivery for as long as their handle lives.
//! - **Context**: while a dispatch runs, [`current_event`] describes it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use partmsg::prelude::*;
//! use std::{cell::Cell, rc::Rc};
//!
//! #[derive(Message)]
//! #[message(name = "physics", abstract)]
//! struct PhysicsChanged;
//!
//! #[derive(Message)]
//! #[message(args = (f64,), parent = PhysicsChanged, name = "mass")]
//! struct MassChanged;
//!
//! #[derive(Default)]
//! struct Tank {
//!     mass: Cell<f64>,
//!     dirty: Cell<bool>,
//! }
//!
//! let bus = Bus::new();
//! let tank = Rc::new(Tank::default());
//! bus.register(
//!     &tank,
//!     Bindings::<Tank>::new()
//!         .on::<MassChanged>(|tank, (mass,)| tank.mass.set(mass))
//!         .listen::<PhysicsChanged, (), _>(|tank, ()| tank.dirty.set(true)),
//! );
//!
//! bus.send::<MassChanged>(&Source::new(&tank), (12.5,))?;
//! ```
//!
//! ## Scopes
//!
//! ```rust,ignore
//! // Suppress touches from one widget while dragging it.
//! let _quiet = bus.ignore(Match::any().source(&Source::new(&widget)).message::<Touch>());
//!
//! // Collapse a burst of identical updates into one.
//! let batch = bus.consolidate(Match::any().message::<MassChanged>());
//! for part in parts { bus.send::<MassChanged>(&tank_source, (total,))?; }
//! batch.dispose()?;
//! ```
//!
//! ## Features
//!
//! - `macros` (default): `#[derive(Message)]`
//! - `inventory`: `#[message(collect)]` and [`Bus::preload_collected`]
//! - `serde`: (de)serialization of [`BusConfig`] and the scene and entity ids

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use partmsg_core::{
    // Arguments
    Arg,
    ArgList,
    ArgMismatch,
    ArgValue,
    // Errors
    BoxError,
    CatalogError,
    ContextError,
    ContextGuard,
    DispatchError,
    // Dispatch context
    EntityId,
    EventInfo,
    IntoOutcome,
    ListenerError,
    // Messages
    Ancestors,
    Message,
    MessageDecl,
    MessageDescriptor,
    MessageKey,
    ParamSpec,
    ParamType,
    PartMsgError,
    RegistrationError,
    SceneOutOfRange,
    ScopeError,
    Source,
    SourceId,
    // Applicability
    Applicability,
    FlatRelations,
    Relation,
    RelationResolver,
    Scene,
    SceneMask,
    arg,
    args,
    context,
    current_event,
};

pub use partmsg_std::{
    Bindings, Bus, BusBuilder, BusConfig, ConsolidationScope, DEFAULT_MAX_DEPTH, EventSlot,
    FilterScope, Match, MessageCatalog, Registration, WeakBus, forwarder, testing,
};

#[cfg(feature = "inventory")]
pub use partmsg_std::CollectedMessage;
#[cfg(feature = "inventory")]
pub use partmsg_std::inventory;

#[cfg(feature = "macros")]
pub use partmsg_macros::Message;

/// The commonly used types.
pub mod prelude {
    pub use crate::{
        Applicability, Bindings, Bus, BusConfig, DispatchError, EntityId, EventInfo, EventSlot,
        ListenerError, Match, Message, MessageDecl, Relation, Scene, SceneMask, Source, args,
        current_event,
    };
}
