//! mmdkit Export Pipeline
//!
//! Writes a [`SceneHost`](mmdkit_scene::SceneHost) scene as an MMD file: an
//! OBJ-like text format with an optional joint hierarchy per object.
//!
//! Each export runs four stages per object, strictly forward:
//! - flatten: object list and instancing resolved into (object, matrix) pairs
//! - realize: world-space snapshot, triangulated, with split normals
//! - write: vertices, deduplicated UVs and normals, faces
//! - bones: joint records before the object's vertices (optional)
//!
//! # Example
//!
//! ```rust,ignore
//! use mmdkit_export::{ExportOptions, MmdExporter};
//! use mmdkit_scene::Scene;
//!
//! let scene = Scene::load("scene.json")?;
//! let report = MmdExporter::new(ExportOptions::default())
//!     .export_to_path(&scene, "scene.mmd")?;
//! println!("{} objects written", report.objects_exported);
//! ```

pub mod bones;
pub mod exporter;
pub mod flatten;
pub mod normals;
pub mod options;
pub mod paths;
pub mod progress;
pub mod realize;
pub mod triangulate;
pub mod writer;

pub use bones::{write_skeleton, BoneRole, SkeletonStats};
pub use exporter::{ExportReport, MmdExporter, ObjectReport};
pub use flatten::{flatten_scene, FlatObject};
pub use options::ExportOptions;
pub use paths::{PathMode, ReferencedFiles};
pub use progress::{CancelFlag, ExportPhase, ExportProgress, ProgressCallback};
pub use realize::{realize_object, MeshSnapshot, SnapshotFace};
pub use writer::{FaceLayout, IndexOffsets, ObjectStats, ObjectWriter};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default file extension for MMD output
pub const FILE_EXTENSION: &str = "mmd";
