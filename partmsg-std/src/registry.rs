//! Listener storage.
//!
//! Records live in a generational arena. Buckets keyed by message name hold
//! handles into the arena in registration order. A record never keeps its
//! owner alive; records whose owner is gone are pruned while a bucket is
//! being snapshotted for delivery.

use partmsg_core::{Applicability, Arg, EntityId, ListenerError, MessageKey};
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

/// Type-erased listener body: owner, then the already truncated arguments.
pub(crate) type Invoke = dyn Fn(&dyn Any, &[Arg]) -> Result<(), ListenerError>;

/// Identity of one binding: which owner, which callable, which message.
///
/// `occurrence` tells apart bindings of the same closure to the same message
/// within one [`Bindings`](crate::Bindings) list (closures built in a loop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BindingKey {
    owner: usize,
    callable: TypeId,
    occurrence: u32,
    message: MessageKey,
}

impl BindingKey {
    pub(crate) fn new(
        owner: usize,
        callable: TypeId,
        occurrence: u32,
        message: MessageKey,
    ) -> Self {
        Self {
            owner,
            callable,
            occurrence,
            message,
        }
    }
}

/// Address of the allocation behind an owner, used as its identity.
pub(crate) fn owner_address<T: ?Sized>(owner: &Rc<T>) -> usize {
    Rc::as_ptr(owner) as *const () as usize
}

/// Handle of a record in the [`ListenerRegistry`].
///
/// Handles are invalidated when their record is removed; a stale handle
/// never resolves to a record inserted later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ListenerHandle {
    index: u32,
    generation: u32,
}

#[cfg(test)]
impl ListenerHandle {
    /// The slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The slot generation this handle was issued for.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// One installed listener.
pub(crate) struct ListenerRecord {
    pub(crate) owner: Weak<dyn Any>,
    pub(crate) invoke: Box<Invoke>,
    pub(crate) applicability: Applicability,
    pub(crate) entity: Option<EntityId>,
    pub(crate) arity: usize,
    pub(crate) binding: BindingKey,
    pub(crate) name: &'static str,
}

impl ListenerRecord {
    pub(crate) fn is_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }
}

impl fmt::Debug for ListenerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRecord")
            .field("name", &self.name)
            .field("alive", &self.is_alive())
            .field("entity", &self.entity)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Outcome of [`ListenerRegistry::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Inserted {
    New(ListenerHandle),
    Duplicate(ListenerHandle),
}

struct Slot {
    generation: u32,
    record: Option<Rc<ListenerRecord>>,
}

/// Generational arena of listener records, bucketed by message name.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    slots: Vec<Slot>,
    free_indices: Vec<u32>,
    buckets: HashMap<Rc<str>, Vec<ListenerHandle>>,
    bindings: HashMap<BindingKey, ListenerHandle>,
    live: usize,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the bucket of `message`.
    ///
    /// A binding that is already installed with a live owner is not added
    /// again. A binding whose previous owner died is replaced.
    pub(crate) fn insert(&mut self, message: Rc<str>, record: ListenerRecord) -> Inserted {
        if let Some(&existing) = self.bindings.get(&record.binding) {
            match self.get(existing).map(|current| current.is_alive()) {
                Some(true) => return Inserted::Duplicate(existing),
                Some(false) => self.remove(existing),
                None => {}
            }
        }

        let index = if let Some(index) = self.free_indices.pop() {
            index
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                record: None,
            });
            index
        };
        let slot = &mut self.slots[index as usize];
        let handle = ListenerHandle {
            index,
            generation: slot.generation,
        };

        self.bindings.insert(record.binding, handle);
        slot.record = Some(Rc::new(record));
        self.buckets.entry(message).or_default().push(handle);
        self.live += 1;
        Inserted::New(handle)
    }

    pub(crate) fn get(&self, handle: ListenerHandle) -> Option<&Rc<ListenerRecord>> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.record.as_ref()
    }

    #[cfg(test)]
    /// Whether `handle` still refers to an installed listener.
    pub fn contains(&self, handle: ListenerHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Remove the record behind `handle`. Stale handles are ignored.
    pub fn remove(&mut self, handle: ListenerHandle) {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return;
        };
        if slot.generation != handle.generation {
            return;
        }
        if let Some(record) = slot.record.take() {
            if self.bindings.get(&record.binding) == Some(&handle) {
                self.bindings.remove(&record.binding);
            }
            self.live -= 1;
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free_indices.push(handle.index);
    }

    /// The live records of `message` in registration order.
    ///
    /// Dead records and stale handles are removed from the bucket on the way.
    pub(crate) fn snapshot(&mut self, message: &str) -> Vec<Rc<ListenerRecord>> {
        let Some(handles) = self.buckets.get(message) else {
            return Vec::new();
        };

        let mut live = Vec::with_capacity(handles.len());
        let mut dead = Vec::new();
        for &handle in handles {
            match self.get(handle) {
                Some(record) if record.is_alive() => live.push(Rc::clone(record)),
                Some(record) => {
                    tracing::debug!(
                        msg = message,
                        listener = record.name,
                        "pruning listener of dropped owner"
                    );
                    dead.push(handle);
                }
                None => dead.push(handle),
            }
        }

        if !dead.is_empty() {
            for &handle in &dead {
                self.remove(handle);
            }
            if let Some(handles) = self.buckets.get_mut(message) {
                handles.retain(|handle| !dead.contains(handle));
                if handles.is_empty() {
                    self.buckets.remove(message);
                }
            }
        }
        live
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.record.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_indices.push(index as u32);
            }
        }
        self.buckets.clear();
        self.bindings.clear();
        self.live = 0;
    }

    /// Number of installed records, including ones whose owner died but
    /// which have not been pruned yet.
    pub fn len(&self) -> usize {
        self.live
    }

    #[cfg(test)]
    /// Whether no record is installed.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[cfg(test)]
    /// Number of records in the bucket of `message`.
    pub fn bucket_len(&self, message: &str) -> usize {
        self.buckets.get(message).map_or(0, Vec::len)
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("live", &self.live)
            .field("buckets", &self.buckets.len())
            .field("slots", &self.slots.len())
            .finish()
    }
}
