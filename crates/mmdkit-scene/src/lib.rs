//! mmdkit-scene
//!
//! The scene graph the exporter reads: objects with world transforms,
//! parenting and instancing, polygon meshes with UV layers and shading
//! flags, and armatures made of head/tail bones.
//!
//! Hosts expose their scene through the [`SceneHost`] trait. [`Scene`] is a
//! self-contained implementation that can be loaded from a JSON document.
//!
//! # Example
//!
//! ```rust,ignore
//! use mmdkit_scene::{Scene, SceneHost};
//!
//! let scene = Scene::load("scene.json")?;
//! for id in scene.object_ids(false) {
//!     println!("{}", scene.require(id)?.name);
//! }
//! ```

pub mod armature;
pub mod mesh;
pub mod scene;
pub mod traits;

pub use armature::{Armature, Bone};
pub use mesh::{edge_key, Mesh, Polygon, UvLayer};
pub use scene::{InstancingMode, ObjectData, Scene, SceneObject};
pub use traits::{Instance, SceneError, SceneHost, SceneResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
