use partmsg::{
    Bindings, Bus, EntityId, EventSlot, Message, MessageDecl, current_event, testing::CallLog,
};
use std::rc::Rc;

mod common;
use common::Widget;

pub struct Clicked;
impl Message for Clicked {
    type Args = (u32, u32);
    fn declaration() -> MessageDecl {
        MessageDecl::of::<Self>().named("clicked")
    }
}

/// An owner with a host-style native event.
struct Button {
    label: &'static str,
    clicked: EventSlot<(u32, u32)>,
}

impl Button {
    fn new(label: &'static str) -> Rc<Self> {
        Rc::new(Self {
            label,
            clicked: EventSlot::new(),
        })
    }
}

fn forward_clicks() -> Bindings<Button> {
    Bindings::<Button>::new().emit::<Clicked>(|button| &button.clicked)
}

fn click_listener() -> Bindings<Widget> {
    Bindings::<Widget>::new().on::<Clicked>(|w, (x, y)| {
        let info = current_event().unwrap();
        let from = info
            .source()
            .downcast::<Button>()
            .map_or("?", |button| button.label);
        w.note(format!("{from}@{x},{y}"));
    })
}

#[test]
fn test_native_event_forwarded_with_owner_as_source() {
    let bus = Bus::new();
    let log = CallLog::new();
    let widget = Widget::new("w", &log);
    let ok = Button::new("ok");
    bus.register(&widget, click_listener());

    let report = bus.register(&ok, forward_clicks());
    assert_eq!(report.emitters, 1);
    assert_eq!(report.installed, 0);

    ok.clicked.fire((3, 4));
    assert_eq!(log.entries(), ["w:ok@3,4"]);
}

#[test]
fn test_wiring_is_idempotent() {
    let bus = Bus::new();
    let log = CallLog::new();
    let widget = Widget::new("w", &log);
    let ok = Button::new("ok");
    bus.register(&widget, click_listener());

    assert_eq!(bus.register(&ok, forward_clicks()).emitters, 1);
    assert_eq!(bus.register(&ok, forward_clicks()).emitters, 0);
    assert_eq!(ok.clicked.len(), 1);

    ok.clicked.fire((1, 1));
    assert_eq!(log.len(), 1);
}

#[test]
fn test_wiring_survives_reset() {
    let bus = Bus::new();
    let log = CallLog::new();
    let widget = Widget::new("w", &log);
    let ok = Button::new("ok");
    bus.register(&widget, click_listener());
    bus.register(&ok, forward_clicks());

    bus.reset();
    ok.clicked.fire((0, 0));
    assert!(log.is_empty());

    bus.register(&widget, click_listener());
    assert_eq!(bus.register(&ok, forward_clicks()).emitters, 0);
    ok.clicked.fire((5, 6));
    assert_eq!(log.entries(), ["w:ok@5,6"]);
}

#[test]
fn test_forwarded_entity() {
    let bus = Bus::new();
    let log = CallLog::new();
    let widget = Widget::new("w", &log);
    let ok = Button::new("ok");
    bus.register(
        &widget,
        Bindings::<Widget>::new().listen::<Clicked, (), _>(|w, ()| {
            let entity = current_event().ok().and_then(|info| info.entity());
            w.note(format!("{entity:?}"));
        }),
    );
    bus.register(&ok, forward_clicks().entity(EntityId(5)));

    ok.clicked.fire((1, 2));
    assert_eq!(log.entries(), ["w:Some(EntityId(5))"]);
}

#[test]
fn test_forwarder_inert_after_bus_dropped() {
    let bus = Bus::new();
    let log = CallLog::new();
    let widget = Widget::new("w", &log);
    let ok = Button::new("ok");
    bus.register(&widget, click_listener());
    bus.register(&ok, forward_clicks());

    drop(bus);
    ok.clicked.fire((1, 2));

    assert!(log.is_empty());
    assert_eq!(ok.clicked.len(), 1);
}

#[test]
fn test_other_subscribers_keep_working() {
    let bus = Bus::new();
    let log = CallLog::new();
    let widget = Widget::new("w", &log);
    let ok = Button::new("ok");
    bus.register(&widget, click_listener());
    bus.register(&ok, forward_clicks());

    let direct = log.clone();
    ok.clicked
        .subscribe(Box::new(move |x, y| direct.record(format!("direct@{x},{y}"))));
    ok.clicked.fire((2, 3));

    assert_eq!(log.entries(), ["w:ok@2,3", "direct@2,3"]);
}

#[test]
fn test_wiring_of_dropped_owners_is_pruned() {
    let bus = Bus::new();
    let buttons: Vec<_> = (0..100).map(|_| Button::new("temp")).collect();
    for button in &buttons {
        bus.register(button, forward_clicks());
    }
    assert_eq!(bus.emitter_count(), 100);
    drop(buttons);

    let ok = Button::new("ok");
    assert_eq!(bus.register(&ok, forward_clicks()).emitters, 1);
    assert_eq!(bus.emitter_count(), 1);

    drop(ok);
    bus.reset();
    assert_eq!(bus.emitter_count(), 0);
}
