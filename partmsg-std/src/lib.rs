//! # partmsg-std
//!
//! The dispatch engine of the partmsg message bus.
//!
//! This crate provides:
//! - **Catalog**: [`MessageCatalog`], resolving message declarations
//! - **Registry**: a generational arena of weakly held listeners
//! - **Registration**: [`Bindings`], the explicit per-owner registration list
//! - **Scopes**: [`Match`], [`FilterScope`], [`ConsolidationScope`]
//! - **Dispatch**: [`Bus`], configured through [`BusConfig`]
//! - **Native events**: [`EventSlot`] and [`forwarder`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use partmsg_core;

mod adapter;
mod bindings;
mod bus;
mod catalog;
mod config;
mod filter;
mod registry;
pub mod testing;

pub use adapter::{EventSlot, forwarder};
pub use bindings::Bindings;
pub use bus::{Bus, BusBuilder, Registration, WeakBus};
#[cfg(feature = "inventory")]
pub use catalog::CollectedMessage;
pub use catalog::MessageCatalog;
pub use config::{BusConfig, DEFAULT_MAX_DEPTH};
pub use filter::{ConsolidationScope, FilterScope, Match};

#[cfg(feature = "inventory")]
pub use inventory;
