//! Native events and their bus forwarders.
//!
//! [`EventSlot`] is a host-style multicast event whose subscribers take
//! positional parameters (`Fn(f64, String)` rather than `Fn((f64, String))`).
//! A forwarder is a subscriber of that exact shape which turns each call into
//! a bus send.

use crate::bus::WeakBus;
use partmsg_core::{ArgList, EntityId, Message, MessageKey, Source};
use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

/// A multicast event with positional subscribers of arity `A`.
///
/// ```rust,ignore
/// let moved: EventSlot<(f64, f64)> = EventSlot::new();
/// moved.subscribe(Box::new(|x, y| println!("{x},{y}")));
/// moved.fire((1.0, 2.0));
/// ```
pub struct EventSlot<A: ArgList> {
    subscribers: RefCell<Vec<Rc<A::Callback>>>,
}

impl<A: ArgList> Default for EventSlot<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ArgList> EventSlot<A> {
    /// Create an event without subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Add a positional subscriber.
    pub fn subscribe(&self, callback: Box<A::Callback>) {
        self.subscribers.borrow_mut().push(Rc::from(callback));
    }

    /// Add a subscriber taking the arguments as one tuple.
    pub fn subscribe_tuple(&self, f: impl Fn(A) + 'static) {
        self.subscribe(A::spread(f));
    }

    /// Call every subscriber in subscription order.
    ///
    /// Subscribers added while firing are called from the next fire on.
    pub fn fire(&self, args: A) {
        let subscribers = self.subscribers.borrow().clone();
        for subscriber in &subscribers {
            A::call(&**subscriber, args.clone());
        }
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Whether nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.borrow().is_empty()
    }
}

impl<A: ArgList> fmt::Debug for EventSlot<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSlot")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Build a positional callback that sends `M` from `owner`.
///
/// The callback holds the bus and the owner weakly and does nothing once
/// either is gone. Send failures are logged, since the event's signature has
/// nowhere to return them.
pub fn forwarder<M, T>(
    bus: WeakBus,
    owner: Weak<T>,
    entity: Option<EntityId>,
) -> Box<<M::Args as ArgList>::Callback>
where
    M: Message,
    T: 'static,
{
    <M::Args as ArgList>::spread(move |args: M::Args| {
        let (Some(bus), Some(owner)) = (bus.upgrade(), owner.upgrade()) else {
            tracing::trace!(msg = std::any::type_name::<M>(), "forwarder target gone");
            return;
        };
        let mut source = Source::new(&owner);
        if let Some(entity) = entity {
            source = source.with_entity(entity);
        }
        if let Err(err) = bus.send_dyn(MessageKey::of::<M>(), &source, entity, args.into_args()) {
            tracing::error!(
                msg = std::any::type_name::<M>(),
                error = %err,
                "forwarded native event failed"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_fire_positional_subscribers() {
        let slot: EventSlot<(u32, u32)> = EventSlot::new();
        let total = Rc::new(Cell::new(0));

        let sink = Rc::clone(&total);
        slot.subscribe(Box::new(move |a, b| sink.set(sink.get() + a * b)));
        let sink = Rc::clone(&total);
        slot.subscribe_tuple(move |(a, b)| sink.set(sink.get() + a + b));

        slot.fire((3, 4));
        assert_eq!(total.get(), 12 + 7);
        assert_eq!(slot.len(), 2);
    }

    #[test]
    fn test_unit_slot() {
        let slot: EventSlot<()> = EventSlot::new();
        let hits = Rc::new(Cell::new(0));
        let sink = Rc::clone(&hits);
        slot.subscribe(Box::new(move || sink.set(sink.get() + 1)));
        slot.fire(());
        slot.fire(());
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_subscribe_while_firing() {
        let slot: Rc<EventSlot<()>> = Rc::new(EventSlot::new());
        let inner = Rc::clone(&slot);
        slot.subscribe(Box::new(move || inner.subscribe(Box::new(|| {}))));

        slot.fire(());
        assert_eq!(slot.len(), 2);
    }
}
