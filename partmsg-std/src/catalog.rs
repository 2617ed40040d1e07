//! Message catalog: resolves message keys into shared descriptors.

use partmsg_core::{CatalogError, MessageDecl, MessageDescriptor, MessageKey};
use std::{collections::HashMap, rc::Rc};

/// An entry submitted through `#[message(collect)]`.
///
/// Collected messages can be resolved up front with
/// [`MessageCatalog::preload_collected`], which makes them reachable by name
/// before anything has sent or listened to them.
#[cfg(feature = "inventory")]
pub struct CollectedMessage {
    key: fn() -> MessageKey,
}

#[cfg(feature = "inventory")]
impl CollectedMessage {
    /// Wrap a key constructor, e.g. `MessageKey::of::<Ping>`.
    pub const fn new(key: fn() -> MessageKey) -> Self {
        Self { key }
    }

    /// The key of the collected message.
    pub fn key(&self) -> MessageKey {
        (self.key)()
    }
}

#[cfg(feature = "inventory")]
inventory::collect!(CollectedMessage);

/// Memoizing resolver of message declarations.
///
/// Descriptors are built once per message identity and kept for the
/// catalog's lifetime. Failed resolutions are not cached, so a broken
/// declaration reports its error on every attempt.
#[derive(Default)]
pub struct MessageCatalog {
    by_key: HashMap<MessageKey, Rc<MessageDescriptor>>,
    by_name: HashMap<Rc<str>, Rc<MessageDescriptor>>,
}

impl MessageCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `key`, resolving its parent chain first.
    pub fn resolve(&mut self, key: MessageKey) -> Result<Rc<MessageDescriptor>, CatalogError> {
        if let Some(found) = self.by_key.get(&key) {
            return Ok(Rc::clone(found));
        }

        // Walk up until a resolved ancestor or the root, collecting the
        // unresolved links leaf first.
        let mut pending: Vec<(MessageKey, MessageDecl)> = Vec::new();
        let mut cursor = key;
        let mut base = loop {
            if let Some(found) = self.by_key.get(&cursor) {
                break Some(Rc::clone(found));
            }
            if pending.iter().any(|(seen, _)| *seen == cursor) {
                return Err(CatalogError::Cycle {
                    message: cursor.declaration().name().to_owned(),
                });
            }
            let decl = cursor.declaration();
            let parent = decl.parent();
            pending.push((cursor, decl));
            match parent {
                Some(parent) => cursor = parent,
                None => break None,
            }
        };

        while let Some((key, decl)) = pending.pop() {
            if let Some(parent) = &base {
                if !parent.params().is_prefix_of(decl.params()) {
                    return Err(CatalogError::IncompatibleParent {
                        message: decl.name().to_owned(),
                        parent: parent.name().to_owned(),
                        expected: decl.params().to_string(),
                        found: parent.params().to_string(),
                    });
                }
            }
            if let Some(clash) = self.by_name.get(decl.name()) {
                if clash.key() != key {
                    return Err(CatalogError::DuplicateName(decl.name().to_owned()));
                }
            }

            let descriptor = Rc::new(MessageDescriptor::new(key, decl, base.take()));
            tracing::trace!(msg = descriptor.name(), "message resolved");
            self.by_key.insert(key, Rc::clone(&descriptor));
            self.by_name
                .insert(descriptor.shared_name(), Rc::clone(&descriptor));
            base = Some(descriptor);
        }

        // `pending` always holds at least `key` here, so `base` is its descriptor.
        base.ok_or_else(|| CatalogError::Undeclared(key.type_name().to_owned()))
    }

    /// The ancestor chain of `key`, leaf to root.
    pub fn ancestors(&mut self, key: MessageKey) -> Result<Vec<Rc<MessageDescriptor>>, CatalogError> {
        let leaf = self.resolve(key)?;
        let mut chain = vec![Rc::clone(&leaf)];
        let mut cursor = leaf.parent().cloned();
        while let Some(descriptor) = cursor {
            cursor = descriptor.parent().cloned();
            chain.push(descriptor);
        }
        Ok(chain)
    }

    /// Look up an already resolved (or preloaded) message by name.
    pub fn resolve_name(&self, name: &str) -> Result<Rc<MessageDescriptor>, CatalogError> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::Undeclared(name.to_owned()))
    }

    /// Resolve every message submitted with `#[message(collect)]`.
    ///
    /// Returns the number of collected messages.
    #[cfg(feature = "inventory")]
    pub fn preload_collected(&mut self) -> Result<usize, CatalogError> {
        let mut count = 0;
        for entry in inventory::iter::<CollectedMessage> {
            self.resolve(entry.key())?;
            count += 1;
        }
        tracing::debug!(count, "collected messages preloaded");
        Ok(count)
    }

    /// Number of resolved messages.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
