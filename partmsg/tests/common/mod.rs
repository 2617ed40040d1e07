#![allow(dead_code)]

use partmsg::{
    Bindings, EntityId, Message, MessageDecl, Source, current_event, testing::CallLog,
};
use std::rc::Rc;

// ============================================================================
// Test Message Hierarchy
// ============================================================================
//
// input (abstract)
// ├── touch (u32)
// │   └── drag (u32, String)
// └── move (u32)

pub struct Input;
impl Message for Input {
    type Args = ();
    fn declaration() -> MessageDecl {
        MessageDecl::of::<Self>().named("input").abstract_()
    }
}

pub struct Touch;
impl Message for Touch {
    type Args = (u32,);
    fn declaration() -> MessageDecl {
        MessageDecl::of::<Self>().named("touch").with_parent::<Input>()
    }
}

pub struct Drag;
impl Message for Drag {
    type Args = (u32, String);
    fn declaration() -> MessageDecl {
        MessageDecl::of::<Self>().named("drag").with_parent::<Touch>()
    }
}

pub struct Move;
impl Message for Move {
    type Args = (u32,);
    fn declaration() -> MessageDecl {
        MessageDecl::of::<Self>().named("move").with_parent::<Input>()
    }
}

/// Parent chain that loops: `ouroboros -> tail -> ouroboros`.
pub struct Ouroboros;
impl Message for Ouroboros {
    type Args = ();
    fn declaration() -> MessageDecl {
        MessageDecl::of::<Self>().named("ouroboros").with_parent::<Tail>()
    }
}

pub struct Tail;
impl Message for Tail {
    type Args = ();
    fn declaration() -> MessageDecl {
        MessageDecl::of::<Self>().named("tail").with_parent::<Ouroboros>()
    }
}

// ============================================================================
// Test Owners
// ============================================================================

/// A listener owner that logs `"<name>:<what>"`.
pub struct Widget {
    pub name: &'static str,
    pub log: CallLog,
}

impl Widget {
    pub fn new(name: &'static str, log: &CallLog) -> Rc<Self> {
        Rc::new(Self {
            name,
            log: log.clone(),
        })
    }

    pub fn note(&self, what: impl std::fmt::Display) {
        self.log.record(format!("{}:{}", self.name, what));
    }

    pub fn source(self: &Rc<Self>) -> Source {
        Source::new(self)
    }

    pub fn source_on(self: &Rc<Self>, entity: EntityId) -> Source {
        Source::new(self).with_entity(entity)
    }
}

/// Listens to `touch` with its argument and to the abstract `input`.
pub fn touch_and_input() -> Bindings<Widget> {
    Bindings::<Widget>::new()
        .on::<Touch>(|widget, (n,)| widget.note(format!("touch({n})")))
        .listen::<Input, (), _>(|widget, ()| widget.note("input"))
}

/// Logs the leaf message name of every `input` dispatch.
pub fn any_input() -> Bindings<Widget> {
    Bindings::<Widget>::new().listen::<Input, (), _>(|widget, ()| {
        let leaf = current_event()
            .map(|info| info.message().name().to_owned())
            .unwrap_or_default();
        widget.note(leaf);
    })
}

// ============================================================================
// Tracing
// ============================================================================

/// Route bus diagnostics to the test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
        .with_test_writer()
        .try_init();
}
