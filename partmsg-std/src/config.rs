//! Bus configuration.
//!
//! With the `serde` feature the configuration can be embedded in a host's
//! settings file.
//!
//! # Example TOML
//!
//! ```toml
//! scene = 4
//! max_depth = 32
//! ```

use partmsg_core::Scene;

/// Default limit on nested sends.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Runtime settings of a [`Bus`](crate::Bus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BusConfig {
    /// Scene the bus starts in.
    pub scene: Scene,

    /// Maximum nesting of reentrant sends. `None` disables the check.
    pub max_depth: Option<usize>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            scene: Scene::new(0),
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

impl BusConfig {
    /// Set the initial scene.
    pub fn scene(mut self, scene: Scene) -> Self {
        self.scene = scene;
        self
    }

    /// Set the nesting limit.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Allow unbounded nesting.
    pub fn unbounded(mut self) -> Self {
        self.max_depth = None;
        self
    }
}
