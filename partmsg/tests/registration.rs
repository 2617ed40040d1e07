use partmsg::{
    Applicability, Bindings, Bus, BusConfig, CatalogError, EntityId, Message, MessageDecl,
    RegistrationError, Relation, Scene, SceneMask, testing::CallLog,
};

mod common;
use common::{Input, Ouroboros, Tail, Touch, Widget, any_input, init_tracing, touch_and_input};

/// Claims the name of [`Touch`] under another type.
struct Impostor;
impl Message for Impostor {
    type Args = (u32,);
    fn declaration() -> MessageDecl {
        MessageDecl::of::<Self>().named("touch")
    }
}

/// Parameters that do not extend those of its parent.
struct Pinch;
impl Message for Pinch {
    type Args = (String,);
    fn declaration() -> MessageDecl {
        MessageDecl::of::<Self>().named("pinch").with_parent::<Touch>()
    }
}

#[test]
fn test_registering_twice_installs_once() {
    let bus = Bus::new();
    let log = CallLog::new();
    let widget = Widget::new("w", &log);

    let first = bus.register(&widget, touch_and_input());
    let second = bus.register(&widget, touch_and_input());

    assert_eq!(first.installed, 2);
    assert_eq!(second.installed, 0);
    assert_eq!(second.duplicates, 2);
    assert_eq!(bus.listener_count(), 2);

    bus.send::<Touch>(&widget.source(), (1,)).unwrap();
    assert_eq!(log.entries(), ["w:touch(1)", "w:input"]);
}

#[test]
fn test_same_bindings_on_two_owners() {
    let bus = Bus::new();
    let log = CallLog::new();
    let a = Widget::new("a", &log);
    let b = Widget::new("b", &log);

    bus.register(&a, any_input());
    bus.register(&b, any_input());
    bus.send::<Touch>(&a.source(), (1,)).unwrap();

    assert_eq!(log.entries(), ["a:touch", "b:touch"]);
}

#[test]
fn test_listeners_do_not_keep_owner_alive() {
    init_tracing();
    let bus = Bus::new();
    let log = CallLog::new();
    let a = Widget::new("a", &log);
    let b = Widget::new("b", &log);
    bus.register(&a, any_input());
    bus.register(&b, any_input());

    let weak = std::rc::Rc::downgrade(&b);
    drop(b);
    assert!(weak.upgrade().is_none());
    assert_eq!(bus.listener_count(), 2);

    bus.send::<Input>(&a.source(), ()).unwrap();

    assert_eq!(log.entries(), ["a:input"]);
    assert_eq!(bus.listener_count(), 1);
}

#[test]
fn test_reregistering_a_dead_binding_is_not_a_duplicate() {
    let bus = Bus::new();
    let log = CallLog::new();
    let first = Widget::new("first", &log);
    bus.register(&first, any_input());
    drop(first);

    let second = Widget::new("second", &log);
    let report = bus.register(&second, any_input());
    assert_eq!(report.installed, 1);

    bus.send::<Input>(&second.source(), ()).unwrap();
    assert_eq!(log.entries(), ["second:input"]);
}

#[test]
fn test_signature_mismatch_rejects_only_that_binding() {
    let bus = Bus::new();
    let log = CallLog::new();
    let widget = Widget::new("w", &log);

    let report = bus.register(
        &widget,
        Bindings::<Widget>::new()
            .listen::<Touch, (String,), _>(|w, (text,)| w.note(text))
            .on::<Touch>(|w, (n,)| w.note(n)),
    );

    assert_eq!(report.installed, 1);
    assert!(!report.is_clean());
    match &report.rejected[..] {
        [RegistrationError::SignatureMismatch { message, .. }] => assert_eq!(message, "touch"),
        other => panic!("unexpected rejections: {other:?}"),
    }

    bus.send::<Touch>(&widget.source(), (3,)).unwrap();
    assert_eq!(log.entries(), ["w:3"]);
}

#[test]
fn test_cyclic_declaration_rejected() {
    let bus = Bus::new();
    let log = CallLog::new();
    let widget = Widget::new("w", &log);

    let report = bus.register(
        &widget,
        Bindings::<Widget>::new()
            .listen::<Ouroboros, (), _>(|w, ()| w.note("loop"))
            .on::<Touch>(|w, (n,)| w.note(n)),
    );

    assert_eq!(report.installed, 1);
    assert!(matches!(
        &report.rejected[..],
        [RegistrationError::Catalog {
            source: CatalogError::Cycle { .. },
            ..
        }]
    ));
    assert!(matches!(bus.resolve::<Tail>(), Err(CatalogError::Cycle { .. })));
    assert!(bus.send::<Ouroboros>(&widget.source(), ()).is_err());
}

#[test]
fn test_broken_declarations() {
    let bus = Bus::new();

    assert!(bus.resolve::<Touch>().is_ok());
    assert_eq!(
        bus.resolve::<Impostor>().unwrap_err(),
        CatalogError::DuplicateName("touch".into())
    );
    assert!(matches!(
        bus.resolve::<Pinch>(),
        Err(CatalogError::IncompatibleParent { ref parent, .. }) if parent == "touch"
    ));
}

#[test]
fn test_reset_drops_all_listeners() {
    let bus = Bus::new();
    let log = CallLog::new();
    let widget = Widget::new("w", &log);
    bus.register(&widget, touch_and_input());

    bus.reset();
    assert_eq!(bus.listener_count(), 0);
    bus.send::<Touch>(&widget.source(), (1,)).unwrap();
    assert!(log.is_empty());

    assert_eq!(bus.register(&widget, touch_and_input()).installed, 2);
    bus.send::<Touch>(&widget.source(), (2,)).unwrap();
    assert_eq!(log.entries(), ["w:touch(2)", "w:input"]);
}

#[test]
fn test_scene_restricted_listener() {
    let editor = Scene::new(2);
    let flight = Scene::new(3);
    let bus = Bus::with_config(BusConfig::default().scene(flight));
    let log = CallLog::new();
    let widget = Widget::new("w", &log);

    let editor_only = || {
        Bindings::<Widget>::new()
            .listen_in::<Touch, (u32,), _>(
                Applicability::new().scenes(SceneMask::only(editor)),
                |w, (n,)| w.note(format!("editor({n})")),
            )
            .on::<Touch>(|w, (n,)| w.note(format!("always({n})")))
    };

    let report = bus.register(&widget, editor_only());
    assert_eq!(report.installed, 1);
    assert_eq!(report.out_of_scene, 1);

    bus.enter_scene(editor);
    assert_eq!(bus.scene(), editor);
    assert_eq!(bus.listener_count(), 0);

    let report = bus.register(&widget, editor_only());
    assert_eq!(report.installed, 2);
    bus.send::<Touch>(&widget.source(), (1,)).unwrap();

    assert_eq!(log.entries(), ["w:editor(1)", "w:always(1)"]);
}

#[test]
fn test_relation_restricted_listener() {
    // Entity n's children are 10n..10n+9.
    let bus = Bus::builder()
        .relations(|source: EntityId, target: EntityId| {
            if source == target {
                Relation::SELF
            } else if target.0 / 10 == source.0 {
                Relation::CHILD | Relation::DESCENDANT
            } else if source.0 / 10 == target.0 {
                Relation::PARENT | Relation::ANCESTOR
            } else {
                Relation::UNRELATED
            }
        })
        .build();
    let log = CallLog::new();
    let parent = Widget::new("parent", &log);
    let child = Widget::new("child", &log);

    let from_parent_only = |entity: EntityId| {
        Bindings::<Widget>::new().entity(entity).listen_in::<Touch, (u32,), _>(
            Applicability::new().relations(Relation::CHILD),
            |w, (n,)| w.note(n),
        )
    };
    bus.register(&parent, from_parent_only(EntityId(1)));
    bus.register(&child, from_parent_only(EntityId(12)));

    bus.send::<Touch>(&parent.source_on(EntityId(1)), (1,)).unwrap();
    bus.send::<Touch>(&child.source_on(EntityId(12)), (2,)).unwrap();
    bus.send_to::<Touch>(&parent.source(), EntityId(1), (3,)).unwrap();
    // Without an entity on the dispatch the relation is unknown.
    bus.send::<Touch>(&parent.source(), (4,)).unwrap();

    assert_eq!(log.entries(), ["child:1", "child:3"]);
}

#[test]
fn test_listeners_built_in_a_loop_all_install() {
    let bus = Bus::new();
    let log = CallLog::new();
    let widget = Widget::new("w", &log);

    let tagged = || {
        ["x", "y"].into_iter().fold(Bindings::<Widget>::new(), |bindings, tag| {
            bindings.on::<Touch>(move |w, (n,)| w.note(format!("{tag}{n}")))
        })
    };
    let first = bus.register(&widget, tagged());
    assert_eq!(first.installed, 2);
    assert_eq!(first.duplicates, 0);

    let again = bus.register(&widget, tagged());
    assert_eq!(again.installed, 0);
    assert_eq!(again.duplicates, 2);

    bus.send::<Touch>(&widget.source(), (1,)).unwrap();
    assert_eq!(log.entries(), ["w:x1", "w:y1"]);
}

#[test]
fn test_listener_asks_relation_to_sender() {
    let bus = Bus::builder()
        .relations(|source: EntityId, target: EntityId| {
            if source == target {
                Relation::SELF
            } else if source.0 / 10 == target.0 {
                Relation::PARENT | Relation::ANCESTOR
            } else {
                Relation::UNRELATED
            }
        })
        .build();
    let log = CallLog::new();
    let parent = Widget::new("parent", &log);
    let weak_bus = bus.downgrade();

    bus.register(
        &parent,
        Bindings::<Widget>::new().on::<Touch>(move |w, _| {
            let info = partmsg::current_event().unwrap();
            let relation = weak_bus
                .upgrade()
                .and_then(|bus| bus.relation_to(&info, EntityId(1)));
            w.note(format!("{relation:?}"));
        }),
    );

    let sender = Widget::new("sender", &log);
    bus.send::<Touch>(&sender.source_on(EntityId(13)), (1,)).unwrap();
    bus.send::<Touch>(&sender.source_on(EntityId(1)), (2,)).unwrap();
    bus.send::<Touch>(&sender.source(), (3,)).unwrap();

    assert_eq!(
        log.entries(),
        [
            format!("parent:{:?}", Some(Relation::PARENT | Relation::ANCESTOR)),
            format!("parent:{:?}", Some(Relation::SELF)),
            "parent:None".to_string(),
        ]
    );
}
