//! Listener applicability: which scenes a listener is live in, and which
//! relationships between the sending entity and the listening entity it
//! accepts.

use crate::{error::SceneOutOfRange, info::EntityId};
use bitflags::bitflags;

/// A host scene (loading screen, editor, flight, ...), numbered 0..32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct Scene(u8);

impl Scene {
    /// The highest valid scene index.
    pub const MAX: u8 = 31;

    /// Scene number `index`, clamped to [`Scene::MAX`].
    pub const fn new(index: u8) -> Self {
        if index > Self::MAX {
            Self(Self::MAX)
        } else {
            Self(index)
        }
    }

    /// The scene number.
    pub const fn index(self) -> u8 {
        self.0
    }

    const fn bit(self) -> u32 {
        match 1_u32.checked_shl(self.0 as u32) {
            Some(bit) => bit,
            None => 0,
        }
    }
}

impl TryFrom<u8> for Scene {
    type Error = SceneOutOfRange;

    /// Scene number `index`, rejecting indexes above [`Scene::MAX`].
    fn try_from(index: u8) -> Result<Self, Self::Error> {
        if index > Self::MAX {
            Err(SceneOutOfRange(index))
        } else {
            Ok(Self(index))
        }
    }
}

impl From<Scene> for u8 {
    fn from(scene: Scene) -> u8 {
        scene.0
    }
}

/// A set of scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneMask(u32);

impl SceneMask {
    /// Every scene.
    pub const ALL: SceneMask = SceneMask(u32::MAX);
    /// No scene.
    pub const NONE: SceneMask = SceneMask(0);

    /// A mask holding exactly `scene`.
    pub const fn only(scene: Scene) -> Self {
        Self(scene.bit())
    }

    /// Add a scene.
    pub const fn with(self, scene: Scene) -> Self {
        Self(self.0 | scene.bit())
    }

    /// Whether `scene` is in the mask.
    pub const fn contains(self, scene: Scene) -> bool {
        self.0 & scene.bit() != 0
    }
}

impl Default for SceneMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromIterator<Scene> for SceneMask {
    fn from_iter<I: IntoIterator<Item = Scene>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, SceneMask::with)
    }
}

bitflags! {
    /// How the receiving entity relates to the sending entity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Relation: u8 {
        /// The same entity.
        const SELF = 1 << 0;
        /// The receiver is the sender's direct parent.
        const PARENT = 1 << 1;
        /// The receiver is a direct child of the sender.
        const CHILD = 1 << 2;
        /// The receiver is a parent, grandparent, ... of the sender.
        const ANCESTOR = 1 << 3;
        /// The receiver is a child, grandchild, ... of the sender.
        const DESCENDANT = 1 << 4;
        /// Both share a direct parent.
        const SIBLING = 1 << 5;
        /// None of the above.
        const UNRELATED = 1 << 6;
    }
}

/// Computes how two host entities relate.
///
/// The bus calls this only when a listener restricts relations and both the
/// dispatch and the listener carry an entity.
pub trait RelationResolver {
    /// The relation of `target` (the listener's entity) to `source`.
    ///
    /// Implementations should include implied flags, e.g. a direct parent is
    /// `PARENT | ANCESTOR`.
    fn relation(&self, source: EntityId, target: EntityId) -> Relation;
}

/// Resolver for hosts without an entity hierarchy: equal ids are
/// [`Relation::SELF`], anything else is [`Relation::UNRELATED`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatRelations;

impl RelationResolver for FlatRelations {
    fn relation(&self, source: EntityId, target: EntityId) -> Relation {
        if source == target {
            Relation::SELF
        } else {
            Relation::UNRELATED
        }
    }
}

impl<F> RelationResolver for F
where
    F: Fn(EntityId, EntityId) -> Relation,
{
    fn relation(&self, source: EntityId, target: EntityId) -> Relation {
        self(source, target)
    }
}

/// Where a listener applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applicability {
    scenes: SceneMask,
    relations: Relation,
}

impl Default for Applicability {
    fn default() -> Self {
        Self::new()
    }
}

impl Applicability {
    /// Applicable in every scene, for every relation.
    pub fn new() -> Self {
        Self {
            scenes: SceneMask::ALL,
            relations: Relation::all(),
        }
    }

    /// Restrict to scenes.
    pub fn scenes(mut self, scenes: SceneMask) -> Self {
        self.scenes = scenes;
        self
    }

    /// Restrict to relations between sender and listener.
    pub fn relations(mut self, relations: Relation) -> Self {
        self.relations = relations;
        self
    }

    /// The scene mask.
    pub fn scene_mask(&self) -> SceneMask {
        self.scenes
    }

    /// The accepted relations.
    pub fn relation_mask(&self) -> Relation {
        self.relations
    }

    /// Whether the listener is live in `scene`.
    pub fn in_scene(&self, scene: Scene) -> bool {
        self.scenes.contains(scene)
    }

    /// Whether a dispatch from `source` may reach a listener on `target`.
    ///
    /// An unrestricted mask accepts everything. A restricted mask needs both
    /// entities to decide and rejects when either is missing.
    pub fn accepts(
        &self,
        source: Option<EntityId>,
        target: Option<EntityId>,
        resolver: &dyn RelationResolver,
    ) -> bool {
        if self.relations.is_all() {
            return true;
        }
        match (source, target) {
            (Some(source), Some(target)) => self.relations.intersects(resolver.relation(source, target)),
            _ => false,
        }
    }
}
