#![cfg(feature = "macros")]

use partmsg::prelude::*;
use partmsg::{CatalogError, testing::CallLog};

mod common;
use common::Widget;

#[derive(Message)]
#[message(name = "physics", abstract)]
struct PhysicsChanged;

#[derive(Message)]
#[message(args = (f64,), parent = PhysicsChanged, name = "mass")]
struct MassChanged;

#[derive(Message)]
#[message(args = (f64, String), parent = MassChanged)]
struct PartMassChanged;

#[derive(Message)]
struct Ping;

#[derive(Message)]
#[message(args = (String,), parent = MassChanged)]
struct Mislabeled;

#[test]
fn test_derived_declarations() {
    let bus = Bus::new();

    let physics = bus.resolve::<PhysicsChanged>().unwrap();
    assert_eq!(physics.name(), "physics");
    assert!(physics.is_abstract());
    assert_eq!(physics.arity(), 0);

    let part = bus.resolve::<PartMassChanged>().unwrap();
    assert!(part.name().ends_with("PartMassChanged"));
    assert!(!part.is_abstract());
    assert_eq!(part.arity(), 2);
    let chain: Vec<_> = part.ancestors().map(|m| m.name().to_owned()).collect();
    assert_eq!(chain[1..], ["mass", "physics"]);
    assert!(part.is_a("physics"));

    let ping = bus.resolve::<Ping>().unwrap();
    assert_eq!(ping.arity(), 0);
    assert!(ping.parent().is_none());

    assert!(matches!(
        bus.resolve::<Mislabeled>(),
        Err(CatalogError::IncompatibleParent { .. })
    ));
}

#[test]
fn test_derived_messages_dispatch() {
    let bus = Bus::new();
    let log = CallLog::new();
    let tank = Widget::new("tank", &log);

    bus.register(
        &tank,
        Bindings::<Widget>::new()
            .on::<MassChanged>(|w, (mass,)| w.note(format!("mass={mass}")))
            .listen::<PhysicsChanged, (), _>(|w, ()| w.note("dirty")),
    );
    bus.send::<PartMassChanged>(&Source::new(&tank), (12.5, "fuel".into()))
        .unwrap();

    assert_eq!(log.entries(), ["tank:mass=12.5", "tank:dirty"]);
}
