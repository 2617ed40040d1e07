#![cfg(all(feature = "inventory", feature = "macros"))]

use partmsg::prelude::*;
use partmsg::{CatalogError, DispatchError, testing::CallLog};

mod common;
use common::Widget;

#[derive(Message)]
#[message(name = "collected.stage", abstract, collect)]
struct StageEvent;

#[derive(Message)]
#[message(args = (u32,), parent = StageEvent, name = "collected.separated", collect)]
struct Separated;

#[test]
fn test_named_send_needs_preload() {
    let bus = Bus::new();
    let source = Source::new(&std::rc::Rc::new(()));

    assert!(matches!(
        bus.send_named("collected.separated", &source, None, args![1_u32]),
        Err(DispatchError::Catalog(CatalogError::Undeclared(_)))
    ));

    let loaded = bus.preload_collected().unwrap();
    assert!(loaded >= 2);
    bus.send_named("collected.separated", &source, None, args![1_u32])
        .unwrap();
}

#[test]
fn test_preloaded_messages_reach_listeners() {
    let bus = Bus::new();
    bus.preload_collected().unwrap();
    let log = CallLog::new();
    let widget = Widget::new("w", &log);
    bus.register(
        &widget,
        Bindings::<Widget>::new().listen::<StageEvent, (), _>(|w, ()| {
            let info = current_event().unwrap();
            w.note(format!("{}({:?})", info.message().name(), info.arg::<u32>(0)));
        }),
    );

    bus.send_named("collected.separated", &Source::new(&widget), None, args![2_u32])
        .unwrap();

    assert_eq!(log.entries(), ["w:collected.separated(Some(2))"]);
}
