// mmdkit-scene/src/scene.rs
//! Scene documents: a serde-loadable scene that implements [`SceneHost`]

use std::fs;
use std::path::Path;

use glam::{Mat4, Vec3};
use mmdkit_core::ObjectId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::armature::Armature;
use crate::mesh::Mesh;
use crate::traits::{Instance, SceneError, SceneHost, SceneResult};

/// How an object stands in for multiple copies of its children
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstancingMode {
    /// Regular object
    #[default]
    None,
    /// One copy of each child per vertex
    Verts,
    /// One copy of each child per polygon
    Faces,
}

impl InstancingMode {
    /// Children of an object in this mode are only exported as instances
    pub fn hides_children(self) -> bool {
        matches!(self, InstancingMode::Verts | InstancingMode::Faces)
    }
}

/// Object payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectData {
    Mesh(Mesh),
    Armature(Armature),
    Empty,
}

impl ObjectData {
    /// Short kind name for logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            ObjectData::Mesh(_) => "mesh",
            ObjectData::Armature(_) => "armature",
            ObjectData::Empty => "empty",
        }
    }
}

/// An object in the scene graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Object name
    pub name: String,
    /// Object-to-world transform (column-major)
    #[serde(default)]
    pub matrix_world: Mat4,
    /// Parent object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ObjectId>,
    /// Instancing mode
    #[serde(default)]
    pub instancing: InstancingMode,
    /// Armature deforming this object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armature: Option<ObjectId>,
    /// Geometry or skeleton
    pub data: ObjectData,
}

impl SceneObject {
    /// Create an object at the world origin
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            matrix_world: Mat4::IDENTITY,
            parent: None,
            instancing: InstancingMode::None,
            armature: None,
            data,
        }
    }

    /// Create a mesh object
    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self::new(name, ObjectData::Mesh(mesh))
    }

    /// Create an armature object
    pub fn armature(name: impl Into<String>, armature: Armature) -> Self {
        Self::new(name, ObjectData::Armature(armature))
    }

    /// Builder-style world matrix
    pub fn with_matrix(mut self, matrix: Mat4) -> Self {
        self.matrix_world = matrix;
        self
    }

    /// Builder-style parent
    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Builder-style instancing mode
    pub fn with_instancing(mut self, mode: InstancingMode) -> Self {
        self.instancing = mode;
        self
    }

    /// Builder-style armature link
    pub fn with_armature(mut self, armature: ObjectId) -> Self {
        self.armature = Some(armature);
        self
    }

    /// Mesh payload, if this is a mesh object
    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.data {
            ObjectData::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Armature payload, if this is an armature object
    pub fn as_armature(&self) -> Option<&Armature> {
        match &self.data {
            ObjectData::Armature(armature) => Some(armature),
            _ => None,
        }
    }
}

/// A complete scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene name
    #[serde(default)]
    pub name: String,
    /// Objects in scene order; [`ObjectId`] is the index into this list
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    /// Selected objects, in selection order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selection: Vec<ObjectId>,
}

impl Scene {
    /// Create an empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an object and return its id
    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId::new(self.objects.len());
        self.objects.push(object);
        id
    }

    /// Append an object to the selection
    pub fn select(&mut self, id: ObjectId) {
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
    }

    /// Find an object by name
    pub fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .position(|o| o.name == name)
            .map(ObjectId::new)
    }

    /// Parse and validate a scene document
    pub fn from_json(json: &str) -> SceneResult<Self> {
        let scene: Scene = serde_json::from_str(json)?;
        scene.validate()?;
        Ok(scene)
    }

    /// Load a scene document from disk
    pub fn load(path: impl AsRef<Path>) -> SceneResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let mut scene = Self::from_json(&json)
            .map_err(|e| e.with_context(format!("loading {}", path.display())))?;
        if scene.name.is_empty() {
            scene.name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        debug!(path = %path.display(), objects = scene.objects.len(), "Loaded scene");
        Ok(scene)
    }

    /// Serialize the scene document
    pub fn to_json(&self) -> SceneResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check object references and payloads
    pub fn validate(&self) -> SceneResult<()> {
        let count = self.objects.len();
        let check = |object: &SceneObject, what: &str, id: Option<ObjectId>| {
            match id {
                Some(id) if id.index() >= count => Err(SceneError::InvalidReference {
                    object: object.name.clone(),
                    message: format!("{} {} out of range ({} objects)", what, id, count),
                }),
                _ => Ok(()),
            }
        };

        for object in &self.objects {
            check(object, "parent", object.parent)?;
            check(object, "armature", object.armature)?;
            match &object.data {
                ObjectData::Mesh(mesh) => mesh
                    .validate()
                    .map_err(|e| e.with_context(format!("object '{}'", object.name)))?,
                ObjectData::Armature(armature) => armature
                    .validate()
                    .map_err(|e| e.with_context(format!("object '{}'", object.name)))?,
                ObjectData::Empty => {}
            }
        }

        for &id in &self.selection {
            if id.index() >= count {
                return Err(SceneError::UnknownObject(id));
            }
        }

        Ok(())
    }

    /// Children of an object, in scene order
    pub fn children(&self, id: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects
            .iter()
            .enumerate()
            .filter(move |(_, o)| o.parent == Some(id))
            .map(|(i, _)| ObjectId::new(i))
    }

    /// World-space points at which an instancing object places copies
    fn instance_points(&self, object: &SceneObject) -> Vec<Vec3> {
        let Some(mesh) = object.as_mesh() else {
            return Vec::new();
        };
        let local: Vec<Vec3> = match object.instancing {
            InstancingMode::None => Vec::new(),
            InstancingMode::Verts => mesh.vertices.clone(),
            InstancingMode::Faces => (0..mesh.polygon_count())
                .filter_map(|i| mesh.polygon_center(i))
                .collect(),
        };
        local
            .into_iter()
            .map(|p| object.matrix_world.transform_point3(p))
            .collect()
    }
}

impl SceneHost for Scene {
    fn scene_name(&self) -> &str {
        &self.name
    }

    fn object_ids(&self, selection_only: bool) -> Vec<ObjectId> {
        if selection_only {
            self.selection.clone()
        } else {
            (0..self.objects.len()).map(ObjectId::new).collect()
        }
    }

    fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.index())
    }

    /// Each child is copied to every instance point, offset by the point's
    /// distance from the instancing object's origin.
    fn instances(&self, id: ObjectId) -> SceneResult<Vec<Instance>> {
        let object = self.require(id)?;
        let origin = object.matrix_world.w_axis.truncate();
        let points = self.instance_points(object);
        let children: Vec<ObjectId> = self.children(id).collect();

        let mut instances = Vec::with_capacity(points.len() * children.len());
        for point in points {
            let offset = Mat4::from_translation(point - origin);
            for &child in &children {
                let child_object = self.require(child)?;
                instances.push(Instance {
                    object: child,
                    matrix: offset * child_object.matrix_world,
                });
            }
        }
        Ok(instances)
    }
}
