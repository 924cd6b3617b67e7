//! Per-corner (split) normals

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use mmdkit_scene::edge_key;

use crate::realize::SnapshotFace;
use crate::triangulate::newell_normal;

/// Normal given to faces with no area
const FALLBACK_NORMAL: Vec3 = Vec3::Z;

/// Compute one normal per face corner, indexed like the snapshot's loops.
///
/// Flat faces use their face normal at every corner. A smooth face corner
/// averages (angle weighted) the normals of the faces reachable around its
/// vertex through smooth edges. An edge is smooth when both of its faces are
/// smooth, it is not in `sharp`, it is manifold, and the angle between the
/// faces does not exceed `auto_smooth_angle` (radians) when one is given.
pub fn split_normals(
    positions: &[Vec3],
    faces: &[SnapshotFace],
    sharp: &HashSet<(u32, u32)>,
    auto_smooth_angle: Option<f32>,
) -> Vec<Vec3> {
    let corner_count = faces
        .iter()
        .map(|f| f.loop_start + f.vertices.len())
        .max()
        .unwrap_or(0);
    let mut normals = vec![FALLBACK_NORMAL; corner_count];

    let face_normals: Vec<Vec3> = faces
        .iter()
        .map(|face| face_normal(positions, &face.vertices))
        .collect();

    let mut edge_faces: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for (index, face) in faces.iter().enumerate() {
        for (a, b) in face_edges(&face.vertices) {
            edge_faces.entry(edge_key(a, b)).or_default().push(index);
        }
    }

    let smooth_neighbor = |face: usize, a: u32, b: u32| -> Option<usize> {
        let key = edge_key(a, b);
        if sharp.contains(&key) {
            return None;
        }
        let linked = edge_faces.get(&key)?;
        if linked.len() != 2 {
            return None;
        }
        let other = if linked[0] == face { linked[1] } else { linked[0] };
        if other == face || !faces[other].smooth {
            return None;
        }
        if let Some(limit) = auto_smooth_angle {
            if face_normals[face].angle_between(face_normals[other]) > limit {
                return None;
            }
        }
        Some(other)
    };

    for (index, face) in faces.iter().enumerate() {
        if !face.smooth {
            for corner in face.corners() {
                normals[corner] = face_normals[index];
            }
            continue;
        }

        for (offset, &vertex) in face.vertices.iter().enumerate() {
            let mut visited = HashSet::from([index]);
            let mut stack = vec![index];
            let mut sum = Vec3::ZERO;

            while let Some(current) = stack.pop() {
                let verts = &faces[current].vertices;
                let Some(at) = verts.iter().position(|&v| v == vertex) else {
                    continue;
                };
                sum += face_normals[current] * corner_angle(positions, verts, at);

                let prev = verts[(at + verts.len() - 1) % verts.len()];
                let next = verts[(at + 1) % verts.len()];
                for other in [prev, next] {
                    if let Some(neighbor) = smooth_neighbor(current, vertex, other) {
                        if visited.insert(neighbor) {
                            stack.push(neighbor);
                        }
                    }
                }
            }

            let normal = sum.normalize_or_zero();
            normals[face.loop_start + offset] = if normal == Vec3::ZERO {
                face_normals[index]
            } else {
                normal
            };
        }
    }

    normals
}

fn face_edges(vertices: &[u32]) -> impl Iterator<Item = (u32, u32)> + '_ {
    let n = vertices.len();
    (0..n).map(move |i| (vertices[i], vertices[(i + 1) % n]))
}

fn face_normal(positions: &[Vec3], vertices: &[u32]) -> Vec3 {
    let points: Vec<Vec3> = vertices
        .iter()
        .map(|&v| positions.get(v as usize).copied().unwrap_or(Vec3::ZERO))
        .collect();
    let normal = newell_normal(&points).normalize_or_zero();
    if normal == Vec3::ZERO {
        FALLBACK_NORMAL
    } else {
        normal
    }
}

fn corner_angle(positions: &[Vec3], vertices: &[u32], at: usize) -> f32 {
    let n = vertices.len();
    let point = |i: usize| {
        positions
            .get(vertices[i] as usize)
            .copied()
            .unwrap_or(Vec3::ZERO)
    };
    let here = point(at);
    let to_prev = point((at + n - 1) % n) - here;
    let to_next = point((at + 1) % n) - here;
    if to_prev.length_squared() == 0.0 || to_next.length_squared() == 0.0 {
        return 0.0;
    }
    to_prev.angle_between(to_next)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two quads folded 90 degrees along the shared edge 1-4
    fn folded(smooth: bool) -> (Vec<Vec3>, Vec<SnapshotFace>) {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, -1.0),
        ];
        let faces = vec![
            SnapshotFace::new(vec![0, 1, 4, 3], 0, smooth),
            SnapshotFace::new(vec![1, 2, 5, 4], 4, smooth),
        ];
        (positions, faces)
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_flat_faces_use_face_normal() {
        let (positions, faces) = folded(false);
        let normals = split_normals(&positions, &faces, &HashSet::new(), None);
        assert_eq!(normals.len(), 8);
        assert!(normals[..4].iter().all(|&n| approx(n, Vec3::Z)));
        assert!(normals[4..].iter().all(|&n| approx(n, Vec3::X)));
    }

    #[test]
    fn test_smooth_faces_average_across_edge() {
        let (positions, faces) = folded(true);
        let normals = split_normals(&positions, &faces, &HashSet::new(), None);
        let shared = Vec3::new(1.0, 0.0, 1.0).normalize();

        // Corner of vertex 1 in both faces
        assert!(approx(normals[1], shared));
        assert!(approx(normals[4], shared));
        // Vertex 0 only touches the first face
        assert!(approx(normals[0], Vec3::Z));
    }

    #[test]
    fn test_sharp_edge_splits() {
        let (positions, faces) = folded(true);
        let sharp: HashSet<_> = [edge_key(4, 1)].into_iter().collect();
        let normals = split_normals(&positions, &faces, &sharp, None);
        assert!(approx(normals[1], Vec3::Z));
        assert!(approx(normals[4], Vec3::X));
    }

    #[test]
    fn test_auto_smooth_angle() {
        let (positions, faces) = folded(true);

        let tight = split_normals(&positions, &faces, &HashSet::new(), Some(0.5));
        assert!(approx(tight[1], Vec3::Z));

        let loose = split_normals(&positions, &faces, &HashSet::new(), Some(2.0));
        assert!(approx(loose[1], Vec3::new(1.0, 0.0, 1.0).normalize()));
    }

    #[test]
    fn test_mixed_shading_does_not_blend() {
        let (positions, mut faces) = folded(true);
        faces[1].smooth = false;
        let normals = split_normals(&positions, &faces, &HashSet::new(), None);
        assert!(approx(normals[1], Vec3::Z));
        assert!(approx(normals[4], Vec3::X));
    }

    #[test]
    fn test_high_valence_fan_visits_each_face_once() {
        // Cone around vertex 0: every corner at the apex sees the whole fan
        let count = 64u32;
        let mut positions = vec![Vec3::new(0.0, 0.0, 1.0)];
        positions.extend((0..count).map(|i| {
            let a = i as f32 / count as f32 * std::f32::consts::TAU;
            Vec3::new(a.cos(), a.sin(), 0.0)
        }));
        let faces: Vec<SnapshotFace> = (0..count)
            .map(|i| {
                let next = (i + 1) % count;
                SnapshotFace::new(vec![0, i + 1, next + 1], i as usize * 3, true)
            })
            .collect();

        let normals = split_normals(&positions, &faces, &HashSet::new(), None);
        assert_eq!(normals.len(), count as usize * 3);
        for face in &faces {
            assert!(approx(normals[face.loop_start], Vec3::Z));
        }
    }

    #[test]
    fn test_degenerate_face() {
        let positions = vec![Vec3::ONE; 3];
        let faces = vec![SnapshotFace::new(vec![0, 1, 2], 0, true)];
        let normals = split_normals(&positions, &faces, &HashSet::new(), None);
        assert!(normals.iter().all(|n| n.is_finite() && approx(*n, Vec3::Z)));
    }
}
