//! Dispatch participants: the sending object, its domain entity, and the
//! description of one in-flight dispatch.

use crate::{
    arguments::{Arg, ArgValue},
    message::MessageDescriptor,
    scope::{Relation, RelationResolver},
};
use std::{any::Any, fmt, rc::Rc};

/// Opaque handle of a host domain entity (a "part").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Identity of a [`Source`], stable while the object is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(usize);

/// The object a message is sent from.
///
/// Cloning is O(1). Two sources are the same when they wrap the same
/// allocation, regardless of the entity attached.
#[derive(Clone)]
pub struct Source {
    object: Rc<dyn Any>,
    entity: Option<EntityId>,
}

impl Source {
    /// Wrap a shared object.
    pub fn new<T: 'static>(object: &Rc<T>) -> Self {
        Self {
            object: Rc::clone(object) as Rc<dyn Any>,
            entity: None,
        }
    }

    /// Attach the entity this object belongs to.
    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    /// The entity this object belongs to.
    pub fn entity(&self) -> Option<EntityId> {
        self.entity
    }

    /// Identity of the wrapped object.
    pub fn id(&self) -> SourceId {
        SourceId(Rc::as_ptr(&self.object) as *const () as usize)
    }

    /// Whether both handles wrap the same object.
    pub fn is(&self, other: &Source) -> bool {
        self.id() == other.id()
    }

    /// Downcast the wrapped object.
    pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.object).downcast::<T>().ok()
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("id", &self.id())
            .field("entity", &self.entity)
            .finish()
    }
}

/// Context of a single in-flight dispatch.
///
/// Listeners read it through [`current_event`](crate::current_event).
pub struct EventInfo {
    message: Rc<MessageDescriptor>,
    source: Source,
    entity: Option<EntityId>,
    args: Vec<Arg>,
}

impl EventInfo {
    /// Describe a dispatch.
    pub fn new(
        message: Rc<MessageDescriptor>,
        source: Source,
        entity: Option<EntityId>,
        args: Vec<Arg>,
    ) -> Self {
        Self {
            message,
            source,
            entity,
            args,
        }
    }

    /// The message being dispatched (the leaf, not the ancestor being walked).
    pub fn message(&self) -> &Rc<MessageDescriptor> {
        &self.message
    }

    /// The sending object.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The domain entity associated with this dispatch.
    pub fn entity(&self) -> Option<EntityId> {
        self.entity
    }

    /// All positional arguments as sent.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Borrow the argument at `index` as `T`.
    pub fn arg<T: ArgValue>(&self, index: usize) -> Option<&T> {
        self.args.get(index)?.as_any().downcast_ref::<T>()
    }

    /// How the entity of this dispatch relates to `target`.
    ///
    /// `None` when the dispatch concerns no entity.
    pub fn relation_to(
        &self,
        target: EntityId,
        resolver: &dyn RelationResolver,
    ) -> Option<Relation> {
        self.entity.map(|entity| resolver.relation(entity, target))
    }
}

impl fmt::Debug for EventInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventInfo")
            .field("message", &self.message.name())
            .field("source", &self.source)
            .field("entity", &self.entity)
            .field("args", &self.args)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_identity() {
        let a = Rc::new(1_u8);
        let b = Rc::new(1_u8);
        let first = Source::new(&a);
        let again = Source::new(&a).with_entity(EntityId(4));

        assert!(first.is(&again));
        assert!(!first.is(&Source::new(&b)));
        assert_eq!(again.entity(), Some(EntityId(4)));
    }

    #[test]
    fn test_relation_to_target() {
        use crate::{
            message::{Message, MessageDecl, MessageKey},
            scope::FlatRelations,
        };

        struct Docked;
        impl Message for Docked {
            type Args = ();
            fn declaration() -> MessageDecl {
                MessageDecl::of::<Self>().named("docked")
            }
        }

        let descriptor = Rc::new(MessageDescriptor::new(
            MessageKey::of::<Docked>(),
            Docked::declaration(),
            None,
        ));
        let source = Source::new(&Rc::new(()));
        let about = |entity| EventInfo::new(Rc::clone(&descriptor), source.clone(), entity, vec![]);

        let own = about(Some(EntityId(3)));
        assert_eq!(own.relation_to(EntityId(3), &FlatRelations), Some(Relation::SELF));
        assert_eq!(own.relation_to(EntityId(4), &FlatRelations), Some(Relation::UNRELATED));
        assert_eq!(about(None).relation_to(EntityId(3), &FlatRelations), None);
    }

    #[test]
    fn test_source_downcast() {
        let owner = Rc::new(String::from("engine"));
        let source = Source::new(&owner);
        assert_eq!(source.downcast::<String>().as_deref().map(String::as_str), Some("engine"));
        assert!(source.downcast::<u32>().is_none());
    }
}
