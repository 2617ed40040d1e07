//! Interception scopes consulted before listener delivery.
//!
//! Entries are consulted most recently installed first, and the first entry
//! that swallows a dispatch ends the consultation. Three kinds exist:
//!
//! - **filter**: a predicate over the [`EventInfo`]; `true` swallows
//! - **ignore**: swallows everything it matches
//! - **consolidate**: swallows everything it matches, buffering one copy of
//!   each distinct dispatch, and replays the buffer when disposed

use crate::bus::{Bus, WeakBus};
use partmsg_core::{
    Arg, DispatchError, EntityId, EventInfo, Message, MessageDescriptor, MessageKey, PartMsgError,
    ScopeError, Source, SourceId,
};
use std::{
    borrow::Cow,
    cell::RefCell,
    collections::HashSet,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

/// Which dispatches a scope applies to.
///
/// Every restriction that is set must match. A message restriction matches
/// when the dispatched message, or any of its ancestors, is listed.
///
/// ```rust,ignore
/// let scope = bus.ignore(Match::any().source(&Source::new(&widget)).message::<Touch>());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Match {
    source: Option<Source>,
    entity: Option<EntityId>,
    keys: Vec<MessageKey>,
    names: Vec<Cow<'static, str>>,
}

impl Match {
    /// Match every dispatch.
    pub fn any() -> Self {
        Self::default()
    }

    /// Only dispatches sent from `source`.
    pub fn source(mut self, source: &Source) -> Self {
        self.source = Some(source.clone());
        self
    }

    /// Only dispatches concerning `entity`.
    pub fn entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Add `M` to the message set.
    pub fn message<M: Message>(mut self) -> Self {
        self.keys.push(MessageKey::of::<M>());
        self
    }

    /// Add a message to the set by name.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.names.push(name.into());
        self
    }

    /// Whether `info` falls under this match.
    pub fn matches(&self, info: &EventInfo) -> bool {
        if let Some(source) = &self.source {
            if !source.is(info.source()) {
                return false;
            }
        }
        if self.entity.is_some() && self.entity != info.entity() {
            return false;
        }
        if self.keys.is_empty() && self.names.is_empty() {
            return true;
        }
        info.message().ancestors().any(|message| {
            self.keys.contains(&message.key()) || self.names.iter().any(|name| name == message.name())
        })
    }
}

/// One dispatch held back by a consolidator.
#[derive(Clone)]
pub(crate) struct Captured {
    pub(crate) message: Rc<MessageDescriptor>,
    pub(crate) source: Source,
    pub(crate) entity: Option<EntityId>,
    pub(crate) args: Vec<Arg>,
}

impl Captured {
    fn of(info: &EventInfo) -> Self {
        Self {
            message: Rc::clone(info.message()),
            source: info.source().clone(),
            entity: info.entity(),
            args: info.args().to_vec(),
        }
    }
}

/// Dedup key: same source object, same message, element-wise equal arguments.
struct CaptureKey {
    source: SourceId,
    message: Rc<str>,
    args: Vec<Arg>,
}

impl PartialEq for CaptureKey {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.message == other.message
            && self.args.len() == other.args.len()
            && self.args.iter().zip(&other.args).all(|(a, b)| a.arg_eq(&**b))
    }
}

impl Eq for CaptureKey {}

impl Hash for CaptureKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.message.hash(state);
        self.args.len().hash(state);
    }
}

#[derive(Default)]
pub(crate) struct Consolidation {
    seen: HashSet<CaptureKey>,
    buffer: Vec<Captured>,
}

impl Consolidation {
    /// Buffer `info` unless an equal dispatch was already captured.
    fn capture(&mut self, info: &EventInfo) -> bool {
        let key = CaptureKey {
            source: info.source().id(),
            message: info.message().shared_name(),
            args: info.args().to_vec(),
        };
        if !self.seen.insert(key) {
            return false;
        }
        self.buffer.push(Captured::of(info));
        true
    }

    pub(crate) fn take(&mut self) -> Vec<Captured> {
        self.seen.clear();
        std::mem::take(&mut self.buffer)
    }

    pub(crate) fn len(&self) -> usize {
        self.buffer.len()
    }
}

pub(crate) type Predicate = dyn Fn(&EventInfo) -> bool;

pub(crate) enum FilterKind {
    Predicate(Box<Predicate>),
    Ignore,
    Consolidate(Rc<RefCell<Consolidation>>),
}

/// An installed interception scope.
pub(crate) struct FilterEntry {
    id: u64,
    matcher: Match,
    kind: FilterKind,
}

impl FilterEntry {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Whether this entry swallows `info`.
    pub(crate) fn swallows(&self, info: &EventInfo) -> bool {
        if !self.matcher.matches(info) {
            return false;
        }
        match &self.kind {
            FilterKind::Predicate(predicate) => predicate(info),
            FilterKind::Ignore => true,
            FilterKind::Consolidate(consolidation) => {
                if consolidation.borrow_mut().capture(info) {
                    tracing::debug!(msg = info.message().name(), scope = self.id, "dispatch captured");
                } else {
                    tracing::debug!(msg = info.message().name(), scope = self.id, "duplicate dispatch dropped");
                }
                true
            }
        }
    }
}

impl fmt::Debug for FilterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FilterKind::Predicate(_) => "filter",
            FilterKind::Ignore => "ignore",
            FilterKind::Consolidate(_) => "consolidate",
        };
        f.debug_struct("FilterEntry")
            .field("id", &self.id)
            .field("kind", &kind)
            .field("matcher", &self.matcher)
            .finish()
    }
}

/// The installed scopes, in installation order.
///
/// The chain only exists while at least one scope is installed.
#[derive(Debug, Default)]
pub(crate) struct FilterChain {
    entries: Option<Vec<Rc<FilterEntry>>>,
    next_id: u64,
}

impl FilterChain {
    pub(crate) fn install(&mut self, matcher: Match, kind: FilterKind) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.entries
            .get_or_insert_with(Vec::new)
            .push(Rc::new(FilterEntry { id, matcher, kind }));
        id
    }

    /// Remove the entry `id`; tears the chain down when it becomes empty.
    pub(crate) fn remove(&mut self, id: u64) -> Result<(), ScopeError> {
        let entries = self.entries.as_mut().ok_or(ScopeError::NotInstalled(id))?;
        let position = entries
            .iter()
            .position(|entry| entry.id() == id)
            .ok_or(ScopeError::NotInstalled(id))?;
        entries.remove(position);
        if entries.is_empty() {
            self.entries = None;
        }
        Ok(())
    }

    /// The installed entries, most recent first.
    pub(crate) fn snapshot(&self) -> Vec<Rc<FilterEntry>> {
        self.entries
            .iter()
            .flatten()
            .rev()
            .cloned()
            .collect()
    }

    /// Number of installed scopes.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, Vec::len)
    }

    #[cfg(test)]
    /// Whether no scope is installed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_none()
    }
}

/// Handle of an installed filter or ignore scope.
///
/// The scope is removed when the handle is dropped or disposed.
#[must_use = "the scope is removed as soon as the handle is dropped"]
pub struct FilterScope {
    bus: WeakBus,
    id: u64,
    disposed: bool,
}

impl FilterScope {
    pub(crate) fn new(bus: WeakBus, id: u64) -> Self {
        Self {
            bus,
            id,
            disposed: false,
        }
    }

    /// Identifier of the installed entry.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the scope.
    pub fn dispose(mut self) -> Result<(), ScopeError> {
        self.disposed = true;
        let bus = self.bus.upgrade().ok_or(ScopeError::BusDropped)?;
        bus.remove_filter(self.id)
    }
}

impl Drop for FilterScope {
    fn drop(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            if let Err(err) = bus.remove_filter(self.id) {
                tracing::warn!(scope = self.id, error = %err, "filter scope already removed");
            }
        }
    }
}

impl fmt::Debug for FilterScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterScope").field("id", &self.id).finish()
    }
}

/// Handle of an installed consolidation scope.
///
/// Call [`dispose`](Self::dispose) to remove the scope and replay what it
/// captured. Dropping the handle without disposing does the same, but replay
/// errors can then only be logged.
#[must_use = "dispose the scope to replay the captured dispatches"]
pub struct ConsolidationScope {
    bus: WeakBus,
    id: u64,
    captured: Rc<RefCell<Consolidation>>,
    disposed: bool,
}

impl ConsolidationScope {
    pub(crate) fn new(bus: WeakBus, id: u64, captured: Rc<RefCell<Consolidation>>) -> Self {
        Self {
            bus,
            id,
            captured,
            disposed: false,
        }
    }

    /// Identifier of the installed entry.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of distinct dispatches captured so far.
    pub fn pending(&self) -> usize {
        self.captured.borrow().len()
    }

    /// Remove the scope, then replay the captured dispatches in capture
    /// order. Replay stops at the first failing dispatch.
    pub fn dispose(mut self) -> Result<(), PartMsgError> {
        self.disposed = true;
        let bus = self.bus.upgrade().ok_or(ScopeError::BusDropped)?;
        bus.remove_filter(self.id)?;
        replay(&bus, &self.captured)?;
        Ok(())
    }
}

fn replay(bus: &Bus, captured: &RefCell<Consolidation>) -> Result<(), DispatchError> {
    let buffer = captured.borrow_mut().take();
    tracing::debug!(count = buffer.len(), "replaying consolidated dispatches");
    for dispatch in buffer {
        bus.dispatch(dispatch.message, &dispatch.source, dispatch.entity, dispatch.args)?;
    }
    Ok(())
}

impl Drop for ConsolidationScope {
    fn drop(&mut self) {
        if self.disposed {
            return;
        }
        tracing::warn!(scope = self.id, "consolidation scope dropped without dispose");
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        if let Err(err) = bus.remove_filter(self.id) {
            tracing::warn!(scope = self.id, error = %err, "consolidation scope already removed");
            return;
        }
        if std::thread::panicking() {
            tracing::warn!(
                scope = self.id,
                dropped = self.pending(),
                "skipping consolidated replay while unwinding"
            );
            return;
        }
        if let Err(err) = replay(&bus, &self.captured) {
            tracing::error!(scope = self.id, error = %err, "consolidated replay failed");
        }
    }
}

impl fmt::Debug for ConsolidationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsolidationScope")
            .field("id", &self.id)
            .field("pending", &self.pending())
            .finish()
    }
}
