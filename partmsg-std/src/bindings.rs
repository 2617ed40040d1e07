//! Explicit registration lists.
//!
//! An object describes what it listens to and which of its native events
//! should be forwarded to the bus by building a [`Bindings`] list, then hands
//! it to [`Bus::register`](crate::Bus::register) together with a shared
//! reference to itself.
//!
//! ```rust,ignore
//! impl Engine {
//!     fn attach(self: &Rc<Self>, bus: &Bus) {
//!         bus.register(self, Bindings::<Engine>::new()
//!             .on::<ThrustChanged>(|engine, (thrust,)| engine.set_thrust(thrust))
//!             .listen::<PhysicsChanged, (), _>(|engine, ()| engine.invalidate())
//!             .emit::<Ignited>(|engine| &engine.ignited));
//!     }
//! }
//! ```

use crate::{
    adapter::{EventSlot, forwarder},
    bus::WeakBus,
};
use partmsg_core::{
    Applicability, Arg, ArgList, EntityId, IntoOutcome, ListenerError, Message, MessageKey,
    ParamSpec,
};
use std::{
    any::{Any, TypeId},
    rc::Rc,
};

pub(crate) type TypedInvoke<T> = dyn Fn(&T, &[Arg]) -> Result<(), ListenerError>;
pub(crate) type Wire<T> = dyn Fn(&Rc<T>, WeakBus, Option<EntityId>);

/// A listener binding before registration.
pub(crate) struct ListenerBinding<T> {
    pub(crate) message: MessageKey,
    pub(crate) params: ParamSpec,
    pub(crate) callable: TypeId,
    pub(crate) occurrence: u32,
    pub(crate) name: &'static str,
    pub(crate) applicability: Applicability,
    pub(crate) invoke: Box<TypedInvoke<T>>,
}

impl<T: 'static> ListenerBinding<T> {
    /// Erase the owner type. A record whose owner is not a `T` reports a
    /// stale target.
    pub(crate) fn erase(self) -> Box<crate::registry::Invoke> {
        let invoke = self.invoke;
        let name = self.name;
        Box::new(move |owner: &dyn Any, args: &[Arg]| match owner.downcast_ref::<T>() {
            Some(owner) => invoke(owner, args),
            None => Err(ListenerError::TargetGone(name.to_owned())),
        })
    }
}

/// An emitter binding before registration.
pub(crate) struct EmitterBinding<T> {
    pub(crate) message: MessageKey,
    pub(crate) callable: TypeId,
    pub(crate) occurrence: u32,
    pub(crate) wire: Box<Wire<T>>,
}

fn callable_id<F: 'static>(_: &F) -> TypeId {
    TypeId::of::<F>()
}

/// Number of earlier entries bound to the same callable and message.
fn occurrence(
    earlier: impl Iterator<Item = (TypeId, MessageKey)>,
    key: (TypeId, MessageKey),
) -> u32 {
    earlier.filter(|entry| *entry == key).count() as u32
}

/// The listeners and emitters of one owner type.
pub struct Bindings<T: 'static> {
    pub(crate) entity: Option<EntityId>,
    pub(crate) listeners: Vec<ListenerBinding<T>>,
    pub(crate) emitters: Vec<EmitterBinding<T>>,
}

impl<T: 'static> Default for Bindings<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Bindings<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            entity: None,
            listeners: Vec::new(),
            emitters: Vec::new(),
        }
    }

    /// The domain entity the owner belongs to.
    ///
    /// Relation-restricted listeners need it, and forwarded native events use
    /// it as the entity of their sends.
    pub fn entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Listen to `M` with its full argument list.
    pub fn on<M: Message>(self, f: impl Fn(&T, M::Args) + 'static) -> Self {
        self.listen::<M, M::Args, ()>(f)
    }

    /// Listen to `M` (and its descendants), receiving the leading arguments
    /// `A`.
    ///
    /// `A` must be a prefix of the message's parameters; registration rejects
    /// the binding otherwise.
    ///
    /// A binding is identified by its owner, its closure type, the message
    /// and its position among the bindings of that same closure and message
    /// in this list. Registering an equivalent list again for the same owner
    /// is therefore a no-op, while several bindings built from one closure
    /// expression (in a loop, say) are all installed.
    pub fn listen<M, A, R>(self, f: impl Fn(&T, A) -> R + 'static) -> Self
    where
        M: Message,
        A: ArgList,
        R: IntoOutcome,
    {
        self.listen_in::<M, A, R>(Applicability::new(), f)
    }

    /// Like [`listen`](Self::listen), restricted to scenes and relations.
    pub fn listen_in<M, A, R>(
        mut self,
        applicability: Applicability,
        f: impl Fn(&T, A) -> R + 'static,
    ) -> Self
    where
        M: Message,
        A: ArgList,
        R: IntoOutcome,
    {
        let callable = callable_id(&f);
        let message = MessageKey::of::<M>();
        let occurrence = occurrence(
            self.listeners.iter().map(|b| (b.callable, b.message)),
            (callable, message),
        );
        let name = std::any::type_name_of_val(&f);
        let invoke = move |owner: &T, args: &[Arg]| -> Result<(), ListenerError> {
            let args = A::from_args(args).map_err(|err| ListenerError::Failed(Box::new(err)))?;
            f(owner, args).into_outcome()
        };
        self.listeners.push(ListenerBinding {
            message,
            params: A::params(),
            callable,
            occurrence,
            name,
            applicability,
            invoke: Box::new(invoke),
        });
        self
    }

    /// Forward the native event selected by `select` to the bus as `M`.
    ///
    /// The forwarder is subscribed once per owner, on its first
    /// registration, and sends with the owner as source.
    pub fn emit<M: Message>(
        mut self,
        select: impl Fn(&T) -> &EventSlot<M::Args> + 'static,
    ) -> Self {
        let callable = callable_id(&select);
        let message = MessageKey::of::<M>();
        let occurrence = occurrence(
            self.emitters.iter().map(|b| (b.callable, b.message)),
            (callable, message),
        );
        let wire = move |owner: &Rc<T>, bus: WeakBus, entity: Option<EntityId>| {
            select(&**owner).subscribe(forwarder::<M, T>(bus, Rc::downgrade(owner), entity));
        };
        self.emitters.push(EmitterBinding {
            message,
            callable,
            occurrence,
            wire: Box::new(wire),
        });
        self
    }

    /// Number of listener bindings.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of emitter bindings.
    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }
}
