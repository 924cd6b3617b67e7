//! Joint hierarchy records
//!
//! Every root bone becomes two joints: its head (parent 0) and its tail
//! (parented to the head). Descendants follow in depth-first pre-order as
//! tail joints referencing their parent's joint index, so a reader never
//! sees a forward reference.

use std::collections::HashMap;
use std::io::Write;

use mmdkit_core::{Error, Result};
use mmdkit_scene::{Armature, Bone};

/// Role of a bone, decided by markers in its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneRole {
    /// `j`
    Joint,
    /// `jl`
    Leg,
    /// `ja`
    Arm,
    /// `jh`
    Head,
}

impl BoneRole {
    /// Classify by case-sensitive substring. Leg wins over arm, arm over head.
    pub fn classify(name: &str) -> Self {
        if name.contains("LIMB_LEG") {
            BoneRole::Leg
        } else if name.contains("LIMB_ARM") {
            BoneRole::Arm
        } else if name.contains("LIMB_HEAD") {
            BoneRole::Head
        } else {
            BoneRole::Joint
        }
    }

    /// Record tag written for this role
    pub fn tag(self) -> &'static str {
        match self {
            BoneRole::Joint => "j",
            BoneRole::Leg => "jl",
            BoneRole::Arm => "ja",
            BoneRole::Head => "jh",
        }
    }
}

/// Counts from one skeleton write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkeletonStats {
    /// Bones in the armature
    pub bones: usize,
    /// Joint records written (one extra head joint per root)
    pub joints: usize,
}

/// Write the joint records for `armature`, numbering from `start_index`.
///
/// The armature is expected to already be in output space. Bones that
/// cannot be reached from a root (a parent cycle) fail with
/// [`Error::BoneCycle`].
pub fn write_skeleton<W: Write>(
    out: &mut W,
    armature: &Armature,
    start_index: usize,
) -> Result<SkeletonStats> {
    let children = armature.child_map();
    let mut writer = SkeletonWriter {
        out,
        bones: &armature.bones,
        children: &children,
        visited: vec![false; armature.bones.len()],
    };

    let mut index = start_index;
    let mut roots = 0;
    for (root, bone) in armature.bones.iter().enumerate() {
        if !bone.is_root() {
            continue;
        }
        writer.visit(root)?;
        writer.joint("j", bone.head, 0)?;
        writer.joint(BoneRole::classify(&bone.name).tag(), bone.tail, index)?;
        let descendants = writer.write_children(root, index + 1)?;
        index += descendants + 2;
        roots += 1;
    }

    if let Some(orphan) = writer.visited.iter().position(|seen| !seen) {
        return Err(Error::BoneCycle {
            bone: armature.bones[orphan].name.clone(),
        });
    }

    Ok(SkeletonStats {
        bones: armature.bones.len(),
        joints: armature.bones.len() + roots,
    })
}

struct SkeletonWriter<'a, W> {
    out: &'a mut W,
    bones: &'a [Bone],
    children: &'a HashMap<usize, Vec<usize>>,
    visited: Vec<bool>,
}

impl<W: Write> SkeletonWriter<'_, W> {
    fn visit(&mut self, bone: usize) -> Result<()> {
        if std::mem::replace(&mut self.visited[bone], true) {
            return Err(Error::BoneCycle {
                bone: self.bones[bone].name.clone(),
            });
        }
        Ok(())
    }

    fn joint(&mut self, tag: &str, at: glam::Vec3, parent: usize) -> Result<()> {
        writeln!(self.out, "{} {:.6} {:.6} {:.6} {}", tag, at.x, at.y, at.z, parent)?;
        Ok(())
    }

    /// Write the subtree below `bone`, whose tail joint has index `parent`.
    /// Returns the number of descendants written.
    fn write_children(&mut self, bone: usize, parent: usize) -> Result<usize> {
        let Some(children) = self.children.get(&bone) else {
            return Ok(0);
        };

        let mut next = parent + 1;
        let mut written = 0;
        for &child in children {
            self.visit(child)?;
            let record = &self.bones[child];
            self.joint(BoneRole::classify(&record.name).tag(), record.tail, parent)?;
            let below = self.write_children(child, next)?;
            next += below + 1;
            written += below + 1;
        }
        Ok(written)
    }
}
