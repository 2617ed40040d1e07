//! Message declarations and resolved descriptors.
//!
//! A message is identified by a Rust type implementing [`Message`]. The type
//! carries no payload; it only declares the message's name, its parent in the
//! hierarchy, whether it is abstract, and the positional parameters every send
//! must supply ([`Message::Args`]).

use crate::arguments::{ArgList, ParamSpec};
use std::{
    any::TypeId,
    borrow::Cow,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

/// A message type that the bus can dispatch.
///
/// # Example
///
/// ```rust,ignore
/// struct PhysicsChanged;
/// impl Message for PhysicsChanged {
///     type Args = ();
///     fn declaration() -> MessageDecl {
///         MessageDecl::of::<Self>().abstract_()
///     }
/// }
///
/// struct MassChanged;
/// impl Message for MassChanged {
///     type Args = (f64,);
///     fn declaration() -> MessageDecl {
///         MessageDecl::of::<Self>().with_parent::<PhysicsChanged>()
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a partmsg Message",
    label = "missing `Message` implementation",
    note = "Declare messages with `#[derive(Message)]` or implement `declaration`."
)]
pub trait Message: 'static {
    /// Positional parameters carried by this message.
    type Args: ArgList;

    /// The declaration metadata of this message.
    fn declaration() -> MessageDecl;
}

/// Opaque identity of a message type.
///
/// Keys compare by type identity; they also know how to obtain the
/// declaration, which is what the catalog resolves lazily.
#[derive(Clone, Copy)]
pub struct MessageKey {
    id: TypeId,
    type_name: &'static str,
    declare: fn() -> MessageDecl,
}

impl MessageKey {
    /// The key of message type `M`.
    pub fn of<M: Message>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            type_name: std::any::type_name::<M>(),
            declare: M::declaration,
        }
    }

    /// The Rust type id of the message type.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// The Rust type name of the message type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Produce the declaration of this message.
    pub fn declaration(&self) -> MessageDecl {
        (self.declare)()
    }
}

impl PartialEq for MessageKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageKey {}

impl Hash for MessageKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageKey").field(&self.type_name).finish()
    }
}

/// Declared metadata of one message, before resolution.
#[derive(Debug, Clone)]
pub struct MessageDecl {
    name: Cow<'static, str>,
    parent: Option<MessageKey>,
    is_abstract: bool,
    params: ParamSpec,
}

impl MessageDecl {
    /// Declaration for `M`, named after its Rust type path.
    pub fn of<M: Message>() -> Self {
        Self {
            name: Cow::Borrowed(std::any::type_name::<M>()),
            parent: None,
            is_abstract: false,
            params: <M::Args as ArgList>::params(),
        }
    }

    /// Override the message name.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the parent message.
    pub fn with_parent<P: Message>(mut self) -> Self {
        self.parent = Some(MessageKey::of::<P>());
        self
    }

    /// Mark the message abstract (a grouping base that is not meant to be sent).
    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// The declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared parent, if any.
    pub fn parent(&self) -> Option<MessageKey> {
        self.parent
    }

    /// Whether the message is abstract.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// The declared parameters.
    pub fn params(&self) -> &ParamSpec {
        &self.params
    }
}

/// A resolved message: declaration plus its resolved parent.
///
/// Descriptors are created once by the catalog and shared.
#[derive(Debug)]
pub struct MessageDescriptor {
    key: MessageKey,
    name: Rc<str>,
    parent: Option<Rc<MessageDescriptor>>,
    is_abstract: bool,
    params: ParamSpec,
}

impl MessageDescriptor {
    /// Build a descriptor from a declaration and its already-resolved parent.
    pub fn new(key: MessageKey, decl: MessageDecl, parent: Option<Rc<MessageDescriptor>>) -> Self {
        Self {
            key,
            name: Rc::from(decl.name.as_ref()),
            parent,
            is_abstract: decl.is_abstract,
            params: decl.params,
        }
    }

    /// Identity of the message type.
    pub fn key(&self) -> MessageKey {
        self.key
    }

    /// The unique message name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared name, for use as a map key.
    pub fn shared_name(&self) -> Rc<str> {
        Rc::clone(&self.name)
    }

    /// The parent descriptor.
    pub fn parent(&self) -> Option<&Rc<MessageDescriptor>> {
        self.parent.as_ref()
    }

    /// Whether the message is abstract.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Declared parameters.
    pub fn params(&self) -> &ParamSpec {
        &self.params
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Iterate this message and its ancestors, leaf to root.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Whether this message is `name` or descends from it.
    pub fn is_a(&self, name: &str) -> bool {
        self.ancestors().any(|d| d.name() == name)
    }
}

impl fmt::Display for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Leaf-to-root iterator over a descriptor's parent chain.
pub struct Ancestors<'a> {
    next: Option<&'a MessageDescriptor>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a MessageDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}
