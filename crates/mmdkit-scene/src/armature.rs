// mmdkit-scene/src/armature.rs
//! Armature (skeleton) and bone structures

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::traits::{SceneError, SceneResult};

/// Bone hierarchy of an armature object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Armature {
    /// All bones; parents are referenced by index into this list
    pub bones: Vec<Bone>,
}

impl Armature {
    /// Create a new empty armature
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bone to the armature
    pub fn add_bone(&mut self, bone: Bone) -> usize {
        let idx = self.bones.len();
        self.bones.push(bone);
        idx
    }

    /// Get bone count
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Child lists for every bone, computed in one pass
    pub fn child_map(&self) -> HashMap<usize, Vec<usize>> {
        let mut map: HashMap<usize, Vec<usize>> = HashMap::new();
        for (idx, bone) in self.bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                map.entry(parent).or_default().push(idx);
            }
        }
        map
    }

    /// Copy of the armature with every head and tail transformed
    pub fn transformed(&self, matrix: Mat4) -> Armature {
        Armature {
            bones: self
                .bones
                .iter()
                .map(|bone| Bone {
                    head: matrix.transform_point3(bone.head),
                    tail: matrix.transform_point3(bone.tail),
                    ..bone.clone()
                })
                .collect(),
        }
    }

    /// Validate parent references
    pub fn validate(&self) -> SceneResult<()> {
        for (idx, bone) in self.bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent >= self.bones.len() {
                    return Err(SceneError::InvalidArmature(format!(
                        "Bone {} has invalid parent index {}",
                        bone.name, parent
                    )));
                }
                if parent == idx {
                    return Err(SceneError::InvalidArmature(format!(
                        "Bone {} references itself as parent",
                        bone.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A single bone, positioned in armature space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    /// Bone name
    pub name: String,
    /// Head (joint) position
    pub head: Vec3,
    /// Tail (end) position
    pub tail: Vec3,
    /// Parent bone index (None for root bones)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
}

impl Bone {
    /// Create a new root bone
    pub fn new(name: impl Into<String>, head: Vec3, tail: Vec3) -> Self {
        Self {
            name: name.into(),
            head,
            tail,
            parent: None,
        }
    }

    /// Builder-style parent assignment
    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Check if this is a root bone
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
