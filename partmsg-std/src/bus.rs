//! The dispatch engine.
//!
//! A [`Bus`] owns the message catalog, the listener registry, the filter
//! chain and the native-event wiring of one host. It is a cheap `Rc` handle;
//! clones share the same state. Delivery is synchronous: `send` returns once
//! every applicable listener along the ancestor chain has run, a scope
//! swallowed the dispatch, or a listener failed.
//!
//! # Example
//!
//! ```rust,ignore
//! let bus = Bus::new();
//! let engine = Rc::new(Engine::default());
//! bus.register(&engine, Bindings::<Engine>::new().on::<ThrustChanged>(|e, (t,)| e.set(t)));
//!
//! bus.send::<ThrustChanged>(&Source::new(&engine), (0.5,))?;
//! ```

use crate::{
    bindings::Bindings,
    catalog::MessageCatalog,
    config::BusConfig,
    filter::{Consolidation, ConsolidationScope, FilterChain, FilterKind, FilterScope, Match},
    registry::{BindingKey, Inserted, ListenerRecord, ListenerRegistry, owner_address},
};
use partmsg_core::{
    Arg, ArgList, CatalogError, ContextError, DispatchError, EntityId, EventInfo, FlatRelations,
    ListenerError, Message, MessageDescriptor, MessageKey, RegistrationError, Relation,
    RelationResolver, Scene, ScopeError, Source, context,
};
use std::{
    any::Any,
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

struct BusInner {
    scene: Cell<Scene>,
    max_depth: Option<usize>,
    resolver: Box<dyn RelationResolver>,
    catalog: RefCell<MessageCatalog>,
    registry: RefCell<ListenerRegistry>,
    emitters: RefCell<HashMap<BindingKey, Weak<dyn Any>>>,
    filters: RefCell<FilterChain>,
}

/// Handle to a message bus.
#[derive(Clone)]
pub struct Bus {
    inner: Rc<BusInner>,
}

/// A non-owning [`Bus`] handle.
#[derive(Clone)]
pub struct WeakBus {
    inner: Weak<BusInner>,
}

impl WeakBus {
    /// The bus, if it is still alive.
    pub fn upgrade(&self) -> Option<Bus> {
        self.inner.upgrade().map(|inner| Bus { inner })
    }
}

impl fmt::Debug for WeakBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakBus")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Builder for a [`Bus`].
pub struct BusBuilder {
    config: BusConfig,
    resolver: Box<dyn RelationResolver>,
}

impl Default for BusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BusBuilder {
    /// Start from the default configuration and [`FlatRelations`].
    pub fn new() -> Self {
        Self {
            config: BusConfig::default(),
            resolver: Box::new(FlatRelations),
        }
    }

    /// Use `config`.
    pub fn config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `resolver` to relate sending and listening entities.
    pub fn relations(mut self, resolver: impl RelationResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Build the bus.
    pub fn build(self) -> Bus {
        Bus {
            inner: Rc::new(BusInner {
                scene: Cell::new(self.config.scene),
                max_depth: self.config.max_depth,
                resolver: self.resolver,
                catalog: RefCell::new(MessageCatalog::new()),
                registry: RefCell::new(ListenerRegistry::new()),
                emitters: RefCell::new(HashMap::new()),
                filters: RefCell::new(FilterChain::default()),
            }),
        }
    }
}

/// What one [`Bus::register`] call installed.
#[derive(Debug, Default)]
pub struct Registration {
    /// Listeners appended to their bucket.
    pub installed: usize,
    /// Listeners that were already installed for this owner.
    pub duplicates: usize,
    /// Listeners skipped because the current scene is outside their mask.
    pub out_of_scene: usize,
    /// Native events newly wired to the bus.
    pub emitters: usize,
    /// Bindings that could not be installed.
    pub rejected: Vec<RegistrationError>,
}

impl Registration {
    /// Whether no binding was rejected.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    /// A bus with the default configuration.
    pub fn new() -> Self {
        BusBuilder::new().build()
    }

    /// A bus with `config`.
    pub fn with_config(config: BusConfig) -> Self {
        BusBuilder::new().config(config).build()
    }

    /// Start building a bus.
    pub fn builder() -> BusBuilder {
        BusBuilder::new()
    }

    /// A non-owning handle.
    pub fn downgrade(&self) -> WeakBus {
        WeakBus {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both handles refer to the same bus.
    pub fn ptr_eq(&self, other: &Bus) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Resolve the descriptor of `M`.
    pub fn resolve<M: Message>(&self) -> Result<Rc<MessageDescriptor>, CatalogError> {
        self.inner.catalog.borrow_mut().resolve(MessageKey::of::<M>())
    }

    /// Resolve every message declared with `#[message(collect)]`, making
    /// them reachable through [`send_named`](Self::send_named).
    #[cfg(feature = "inventory")]
    pub fn preload_collected(&self) -> Result<usize, CatalogError> {
        self.inner.catalog.borrow_mut().preload_collected()
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Install the listeners of `owner` and wire its native events.
    ///
    /// Bindings are handled independently: a rejected binding is logged and
    /// reported, and the rest are still installed. Registering the same
    /// binding for the same live owner again has no effect.
    pub fn register<T: 'static>(&self, owner: &Rc<T>, bindings: Bindings<T>) -> Registration {
        let mut report = Registration::default();
        let address = owner_address(owner);
        let erased: Rc<dyn Any> = Rc::clone(owner) as Rc<dyn Any>;
        let scene = self.scene();

        for binding in bindings.listeners {
            let descriptor = match self.inner.catalog.borrow_mut().resolve(binding.message) {
                Ok(descriptor) => descriptor,
                Err(source) => {
                    let err = RegistrationError::Catalog {
                        binding: binding.name,
                        source,
                    };
                    tracing::warn!(owner = std::any::type_name::<T>(), error = %err, "listener rejected");
                    report.rejected.push(err);
                    continue;
                }
            };

            if !binding.params.is_prefix_of(descriptor.params()) {
                let err = RegistrationError::SignatureMismatch {
                    binding: binding.name,
                    message: descriptor.name().to_owned(),
                    expected: descriptor.params().to_string(),
                    found: binding.params.to_string(),
                };
                tracing::warn!(owner = std::any::type_name::<T>(), error = %err, "listener rejected");
                report.rejected.push(err);
                continue;
            }

            if !binding.applicability.in_scene(scene) {
                tracing::debug!(
                    msg = descriptor.name(),
                    listener = binding.name,
                    scene = scene.index(),
                    "listener not applicable in current scene"
                );
                report.out_of_scene += 1;
                continue;
            }

            let record = ListenerRecord {
                owner: Rc::downgrade(&erased),
                applicability: binding.applicability,
                entity: bindings.entity,
                arity: binding.params.len(),
                binding: BindingKey::new(
                    address,
                    binding.callable,
                    binding.occurrence,
                    binding.message,
                ),
                name: binding.name,
                invoke: binding.erase(),
            };
            match self
                .inner
                .registry
                .borrow_mut()
                .insert(descriptor.shared_name(), record)
            {
                Inserted::New(_) => report.installed += 1,
                Inserted::Duplicate(_) => report.duplicates += 1,
            }
        }

        if !bindings.emitters.is_empty() {
            self.prune_emitters();
        }
        for emitter in bindings.emitters {
            let key = BindingKey::new(
                address,
                emitter.callable,
                emitter.occurrence,
                emitter.message,
            );
            {
                let mut emitters = self.inner.emitters.borrow_mut();
                if emitters.get(&key).is_some_and(|owner| owner.strong_count() > 0) {
                    continue;
                }
                emitters.insert(key, Rc::downgrade(&erased));
            }
            (emitter.wire)(owner, self.downgrade(), bindings.entity);
            report.emitters += 1;
        }

        tracing::debug!(
            owner = std::any::type_name::<T>(),
            installed = report.installed,
            duplicates = report.duplicates,
            out_of_scene = report.out_of_scene,
            emitters = report.emitters,
            rejected = report.rejected.len(),
            "owner registered"
        );
        report
    }

    /// Drop every listener record.
    ///
    /// Native-event wiring is kept: forwarders live in the owners' events
    /// and keep sending after the owners register again.
    pub fn reset(&self) {
        let dropped = {
            let mut registry = self.inner.registry.borrow_mut();
            let dropped = registry.len();
            registry.clear();
            dropped
        };
        let pruned = self.prune_emitters();
        tracing::info!(dropped, pruned, "listeners reset");
    }

    /// Forget the wiring of owners that no longer exist.
    fn prune_emitters(&self) -> usize {
        let mut emitters = self.inner.emitters.borrow_mut();
        let before = emitters.len();
        emitters.retain(|_, owner| owner.strong_count() > 0);
        let pruned = before - emitters.len();
        if pruned > 0 {
            tracing::trace!(pruned, "dead emitter wiring pruned");
        }
        pruned
    }

    /// Switch to `scene` and drop every listener record; owners are
    /// expected to register again for the new scene.
    pub fn enter_scene(&self, scene: Scene) {
        tracing::info!(
            from = self.scene().index(),
            to = scene.index(),
            "entering scene"
        );
        self.inner.scene.set(scene);
        self.reset();
    }

    /// The current scene.
    pub fn scene(&self) -> Scene {
        self.inner.scene.get()
    }

    /// Number of installed listener records.
    pub fn listener_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    /// Number of native-event wirings remembered by this bus.
    ///
    /// Wirings of dropped owners are forgotten on the next registration
    /// that wires native events, and on [`reset`](Self::reset).
    pub fn emitter_count(&self) -> usize {
        self.inner.emitters.borrow().len()
    }

    /// How the entity of `info` relates to `target`, according to this
    /// bus's resolver. `None` when the dispatch concerns no entity.
    pub fn relation_to(&self, info: &EventInfo, target: EntityId) -> Option<Relation> {
        info.relation_to(target, &*self.inner.resolver)
    }

    /// Number of installed filter scopes.
    pub fn filter_depth(&self) -> usize {
        self.inner.filters.borrow().len()
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Send `M` from `source`, concerning the source's entity.
    pub fn send<M: Message>(&self, source: &Source, args: M::Args) -> Result<(), DispatchError> {
        self.send_dyn(MessageKey::of::<M>(), source, source.entity(), args.into_args())
    }

    /// Send `M` from `source`, concerning `entity`.
    pub fn send_to<M: Message>(
        &self,
        source: &Source,
        entity: EntityId,
        args: M::Args,
    ) -> Result<(), DispatchError> {
        self.send_dyn(MessageKey::of::<M>(), source, Some(entity), args.into_args())
    }

    /// Send the message identified by `key` with type-erased arguments.
    pub fn send_dyn(
        &self,
        key: MessageKey,
        source: &Source,
        entity: Option<EntityId>,
        args: Vec<Arg>,
    ) -> Result<(), DispatchError> {
        let message = self.inner.catalog.borrow_mut().resolve(key)?;
        self.dispatch(message, source, entity, args)
    }

    /// Send a message by its declared name.
    ///
    /// The message must already be known to the catalog, by having been
    /// sent, listened to, resolved or preloaded.
    pub fn send_named(
        &self,
        name: &str,
        source: &Source,
        entity: Option<EntityId>,
        args: Vec<Arg>,
    ) -> Result<(), DispatchError> {
        let message = self.inner.catalog.borrow().resolve_name(name)?;
        self.dispatch(message, source, entity, args)
    }

    /// The in-flight dispatch on this thread.
    pub fn current_event(&self) -> Result<Rc<EventInfo>, ContextError> {
        partmsg_core::current_event()
    }

    pub(crate) fn dispatch(
        &self,
        message: Rc<MessageDescriptor>,
        source: &Source,
        entity: Option<EntityId>,
        args: Vec<Arg>,
    ) -> Result<(), DispatchError> {
        message
            .params()
            .check(&args)
            .map_err(|mismatch| DispatchError::Arguments {
                message: message.name().to_owned(),
                source: mismatch,
            })?;

        let depth = context::depth() + 1;
        if let Some(max_depth) = self.inner.max_depth {
            if depth > max_depth {
                tracing::warn!(msg = message.name(), depth, max_depth, "dispatch depth exceeded");
                return Err(DispatchError::DepthExceeded { depth, max_depth });
            }
        }

        let info = Rc::new(EventInfo::new(message, source.clone(), entity, args));
        let _frame = context::push(Rc::clone(&info));
        tracing::trace!(msg = info.message().name(), depth, "dispatch");

        let filters = self.inner.filters.borrow().snapshot();
        if let Some(entry) = filters.iter().find(|entry| entry.swallows(&info)) {
            tracing::debug!(msg = info.message().name(), scope = entry.id(), "dispatch swallowed");
            return Ok(());
        }

        let scene = self.scene();
        for ancestor in info.message().ancestors() {
            let records = self.inner.registry.borrow_mut().snapshot(ancestor.name());
            for record in records {
                if !record.applicability.in_scene(scene) {
                    continue;
                }
                if !record
                    .applicability
                    .accepts(info.entity(), record.entity, &*self.inner.resolver)
                {
                    continue;
                }
                let Some(owner) = record.owner.upgrade() else {
                    continue;
                };

                let args = &info.args()[..record.arity.min(info.args().len())];
                tracing::trace!(msg = ancestor.name(), listener = record.name, "deliver");
                match (record.invoke)(&*owner, args) {
                    Ok(()) => {}
                    Err(ListenerError::TargetGone(target)) => {
                        tracing::warn!(
                            msg = ancestor.name(),
                            listener = record.name,
                            target = %target,
                            "listener target gone, skipping"
                        );
                    }
                    Err(ListenerError::Failed(source)) => {
                        return Err(DispatchError::Listener {
                            message: ancestor.name().to_owned(),
                            binding: record.name,
                            source,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    /// Swallow matching dispatches for which `predicate` returns `true`.
    pub fn filter(
        &self,
        predicate: impl Fn(&EventInfo) -> bool + 'static,
        matcher: Match,
    ) -> FilterScope {
        let id = self
            .inner
            .filters
            .borrow_mut()
            .install(matcher, FilterKind::Predicate(Box::new(predicate)));
        tracing::debug!(scope = id, "filter installed");
        FilterScope::new(self.downgrade(), id)
    }

    /// Swallow every matching dispatch.
    pub fn ignore(&self, matcher: Match) -> FilterScope {
        let id = self
            .inner
            .filters
            .borrow_mut()
            .install(matcher, FilterKind::Ignore);
        tracing::debug!(scope = id, "ignore installed");
        FilterScope::new(self.downgrade(), id)
    }

    /// Hold back matching dispatches, dropping duplicates, until the scope
    /// is disposed.
    pub fn consolidate(&self, matcher: Match) -> ConsolidationScope {
        let captured = Rc::new(RefCell::new(Consolidation::default()));
        let id = self
            .inner
            .filters
            .borrow_mut()
            .install(matcher, FilterKind::Consolidate(Rc::clone(&captured)));
        tracing::debug!(scope = id, "consolidator installed");
        ConsolidationScope::new(self.downgrade(), id, captured)
    }

    pub(crate) fn remove_filter(&self, id: u64) -> Result<(), ScopeError> {
        self.inner.filters.borrow_mut().remove(id)?;
        tracing::debug!(scope = id, "scope removed");
        Ok(())
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("scene", &self.scene())
            .field("max_depth", &self.inner.max_depth)
            .field("listeners", &self.listener_count())
            .field("filters", &self.filter_depth())
            .finish()
    }
}
