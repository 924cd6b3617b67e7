// mmdkit-scene/src/traits.rs
//! The interface between a scene host and the exporter.
//!
//! The exporter never reaches into host internals. Everything it reads
//! (object list, transforms, instances, geometry, skeletons) goes through
//! [`SceneHost`], so any application able to describe its scene in these
//! terms can drive an export.

use std::borrow::Cow;

use glam::Mat4;
use mmdkit_core::ObjectId;
use thiserror::Error;

use crate::armature::Armature;
use crate::mesh::Mesh;
use crate::scene::{InstancingMode, ObjectData, SceneObject};

/// Errors raised by a scene host
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene document error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown object {0}")]
    UnknownObject(ObjectId),

    #[error("Object '{object}' has no geometry ({kind})")]
    NoGeometry { object: String, kind: &'static str },

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Invalid armature: {0}")]
    InvalidArmature(String),

    #[error("Object '{object}' has an invalid reference: {message}")]
    InvalidReference { object: String, message: String },

    #[error("Nested error in {context}: {source}")]
    Nested {
        context: String,
        #[source]
        source: Box<SceneError>,
    },
}

impl SceneError {
    /// Wrap this error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SceneError::Nested {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<SceneError> for mmdkit_core::Error {
    fn from(err: SceneError) -> Self {
        match err {
            SceneError::Io(io) => mmdkit_core::Error::Io(io),
            SceneError::UnknownObject(id) => mmdkit_core::Error::ObjectNotFound {
                name: id.to_string(),
            },
            other => mmdkit_core::Error::Scene {
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias for scene operations
pub type SceneResult<T> = Result<T, SceneError>;

/// One concrete copy produced by an instancing object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    /// Object whose geometry is instanced
    pub object: ObjectId,
    /// Resolved world matrix of this copy
    pub matrix: Mat4,
}

/// Read-only access to a host scene.
///
/// Only the object list, object lookup and instance resolution are
/// required; geometry and armature access have defaults that read the
/// [`SceneObject`] payloads directly.
pub trait SceneHost {
    /// Human-readable scene name (used in the file header)
    fn scene_name(&self) -> &str;

    /// Objects to consider, in host order (selection order when
    /// `selection_only` is set)
    fn object_ids(&self, selection_only: bool) -> Vec<ObjectId>;

    /// Look up an object
    fn object(&self, id: ObjectId) -> Option<&SceneObject>;

    /// Concrete copies produced by an instancing object
    fn instances(&self, id: ObjectId) -> SceneResult<Vec<Instance>>;

    /// Look up an object or fail with [`SceneError::UnknownObject`]
    fn require(&self, id: ObjectId) -> SceneResult<&SceneObject> {
        self.object(id).ok_or(SceneError::UnknownObject(id))
    }

    /// Instancing mode of the object's parent, if it has one
    fn parent_instancing(&self, id: ObjectId) -> InstancingMode {
        self.object(id)
            .and_then(|object| object.parent)
            .and_then(|parent| self.object(parent))
            .map(|parent| parent.instancing)
            .unwrap_or_default()
    }

    /// Produce renderable geometry for an object.
    ///
    /// Objects without geometry report [`SceneError::NoGeometry`]; the
    /// exporter treats any error here as "skip this object".
    fn realize_mesh(&self, id: ObjectId) -> SceneResult<Cow<'_, Mesh>> {
        let object = self.require(id)?;
        match &object.data {
            ObjectData::Mesh(mesh) => Ok(Cow::Borrowed(mesh)),
            other => Err(SceneError::NoGeometry {
                object: object.name.clone(),
                kind: other.kind(),
            }),
        }
    }

    /// Armature deforming an object: its explicit armature link, else an
    /// armature parent
    fn find_armature(&self, id: ObjectId) -> Option<&Armature> {
        let object = self.object(id)?;
        let candidates = [object.armature, object.parent];
        candidates
            .into_iter()
            .flatten()
            .filter_map(|candidate| self.object(candidate))
            .find_map(|candidate| match &candidate.data {
                ObjectData::Armature(armature) => Some(armature),
                _ => None,
            })
    }
}
