//! Mesh realization: world-space snapshots ready for writing

use std::ops::Range;

use glam::{Vec2, Vec3};
use mmdkit_core::name_compat;
use mmdkit_scene::{SceneError, SceneHost};
use tracing::{debug, warn};

use crate::flatten::FlatObject;
use crate::normals::split_normals;
use crate::options::ExportOptions;
use crate::triangulate::triangulate_faces;

/// Exporter-owned copy of one object's geometry in output space
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSnapshot {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub faces: Vec<SnapshotFace>,
    /// One UV per corner, indexed by loop
    pub uvs: Option<Vec<Vec2>>,
    /// One normal per corner, indexed by loop
    pub normals: Option<Vec<Vec3>>,
}

impl MeshSnapshot {
    /// Number of face corners (loops)
    pub fn corner_count(&self) -> usize {
        self.faces
            .iter()
            .map(|f| f.loop_start + f.vertices.len())
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.faces.is_empty()
    }
}

/// A face of a snapshot
///
/// `loop_start` keeps pointing into the per-corner arrays after faces are
/// reordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFace {
    pub vertices: Vec<u32>,
    pub loop_start: usize,
    pub smooth: bool,
}

impl SnapshotFace {
    pub fn new(vertices: Vec<u32>, loop_start: usize, smooth: bool) -> Self {
        Self {
            vertices,
            loop_start,
            smooth,
        }
    }

    /// Loop indices of this face's corners
    pub fn corners(&self) -> Range<usize> {
        self.loop_start..self.loop_start + self.vertices.len()
    }
}

/// Build the snapshot for one flattened object.
///
/// Returns `None` when the object should be skipped: the host cannot
/// produce a mesh for it, the mesh is malformed, or nothing is left to write.
pub fn realize_object<H>(
    host: &H,
    object: &FlatObject,
    options: &ExportOptions,
) -> Option<MeshSnapshot>
where
    H: SceneHost + ?Sized,
{
    let name = name_compat(Some(object.name.as_str()));

    let mesh = match host.realize_mesh(object.object) {
        Ok(mesh) => mesh,
        Err(SceneError::NoGeometry { kind, .. }) => {
            debug!(object = %name, kind, "no geometry - skipping");
            return None;
        }
        Err(e) => {
            warn!(object = %name, error = %e, "could not realize mesh - skipping");
            return None;
        }
    };

    if let Err(e) = mesh.validate() {
        warn!(object = %name, error = %e, "invalid mesh - skipping");
        return None;
    }

    let matrix = options.global_matrix * object.matrix;
    let positions: Vec<Vec3> = mesh
        .vertices
        .iter()
        .map(|&v| matrix.transform_point3(v))
        .collect();

    let mut faces: Vec<SnapshotFace> = mesh
        .polygons
        .iter()
        .zip(mesh.corner_offsets())
        .map(|(polygon, start)| SnapshotFace::new(polygon.vertices.clone(), start, polygon.smooth))
        .collect();

    let mut uvs = if options.include_uvs {
        mesh.active_uv_layer().map(|layer| layer.uvs.clone())
    } else {
        None
    };

    if options.triangulate {
        let (triangulated, remapped) = triangulate_faces(&positions, &faces, uvs.as_deref());
        faces = triangulated;
        uvs = remapped;
    }

    if positions.is_empty() && faces.is_empty() {
        debug!(object = %name, "empty mesh - skipping");
        return None;
    }

    let normals = if options.include_normals && !faces.is_empty() {
        Some(split_normals(
            &positions,
            &faces,
            &mesh.sharp_edge_set(),
            mesh.auto_smooth_angle,
        ))
    } else {
        None
    };

    if !options.keep_vertex_order {
        faces.sort_by_key(|face| face.smooth);
    }

    Some(MeshSnapshot {
        name: object.name.clone(),
        positions,
        faces,
        uvs,
        normals,
    })
}
