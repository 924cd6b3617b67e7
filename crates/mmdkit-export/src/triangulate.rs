//! Polygon triangulation
//!
//! Quads split along their shorter diagonal unless concave. Larger polygons
//! are ear clipped in the plane of their Newell normal, falling back to a fan
//! when the projection is degenerate.

use glam::{Vec2, Vec3};

use crate::realize::SnapshotFace;

/// Triangulate one polygon.
///
/// Returns triangles as corner positions within `polygon` (not vertex
/// indices), so per-corner attributes can follow. Polygons with fewer than
/// four corners come back unchanged.
pub fn triangulate_polygon(positions: &[Vec3], polygon: &[u32]) -> Vec<[usize; 3]> {
    let n = polygon.len();
    if n < 3 {
        return Vec::new();
    }
    if n == 3 {
        return vec![[0, 1, 2]];
    }

    let points: Vec<Vec3> = polygon
        .iter()
        .map(|&v| positions.get(v as usize).copied().unwrap_or(Vec3::ZERO))
        .collect();

    let Some(projected) = project(&points) else {
        return fan(n);
    };

    if n == 4 {
        return split_quad(&points, &projected);
    }

    ear_clip(&projected).unwrap_or_else(|| fan(n))
}

/// Triangulate every face, rebuilding the per-corner UV array to match.
///
/// Faces with fewer than three corners are passed through as they are.
pub fn triangulate_faces(
    positions: &[Vec3],
    faces: &[SnapshotFace],
    uvs: Option<&[Vec2]>,
) -> (Vec<SnapshotFace>, Option<Vec<Vec2>>) {
    let mut out_faces = Vec::with_capacity(faces.len());
    let mut out_uvs = uvs.map(|uvs| Vec::with_capacity(uvs.len()));
    let mut next_loop = 0;

    let mut push = |vertices: Vec<u32>, corners: &[usize], face: &SnapshotFace| {
        if let (Some(out), Some(src)) = (out_uvs.as_mut(), uvs) {
            out.extend(
                corners
                    .iter()
                    .map(|&c| src.get(face.loop_start + c).copied().unwrap_or(Vec2::ZERO)),
            );
        }
        let len = vertices.len();
        out_faces.push(SnapshotFace::new(vertices, next_loop, face.smooth));
        next_loop += len;
    };

    for face in faces {
        if face.vertices.len() <= 3 {
            let corners: Vec<usize> = (0..face.vertices.len()).collect();
            push(face.vertices.clone(), &corners, face);
            continue;
        }
        for tri in triangulate_polygon(positions, &face.vertices) {
            let vertices = tri.iter().map(|&c| face.vertices[c]).collect();
            push(vertices, &tri, face);
        }
    }

    (out_faces, out_uvs)
}

fn fan(n: usize) -> Vec<[usize; 3]> {
    (1..n - 1).map(|i| [0, i, i + 1]).collect()
}

/// Drop the dominant axis of the Newell normal
fn project(points: &[Vec3]) -> Option<Vec<Vec2>> {
    let normal = newell_normal(points);
    if normal.length_squared() <= f32::EPSILON * f32::EPSILON {
        return None;
    }
    let abs = normal.abs();
    let projected = if abs.x >= abs.y && abs.x >= abs.z {
        points.iter().map(|p| Vec2::new(p.y, p.z)).collect()
    } else if abs.y >= abs.z {
        points.iter().map(|p| Vec2::new(p.z, p.x)).collect()
    } else {
        points.iter().map(|p| Vec2::new(p.x, p.y)).collect()
    };
    Some(projected)
}

/// Unnormalized polygon normal, robust for non-planar polygons
pub(crate) fn newell_normal(points: &[Vec3]) -> Vec3 {
    let mut normal = Vec3::ZERO;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

fn signed_area(points: &[Vec2]) -> f32 {
    let mut area = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        area += a.perp_dot(b);
    }
    area * 0.5
}

fn is_reflex(points: &[Vec2], prev: usize, cur: usize, next: usize, winding: f32) -> bool {
    (points[cur] - points[prev]).perp_dot(points[next] - points[cur]) * winding < 0.0
}

fn split_quad(points: &[Vec3], projected: &[Vec2]) -> Vec<[usize; 3]> {
    let along_02 = vec![[0, 1, 2], [0, 2, 3]];
    let along_13 = vec![[0, 1, 3], [1, 2, 3]];

    let winding = signed_area(projected).signum();
    if is_reflex(projected, 3, 0, 1, winding) || is_reflex(projected, 1, 2, 3, winding) {
        return along_02;
    }
    if is_reflex(projected, 0, 1, 2, winding) || is_reflex(projected, 2, 3, 0, winding) {
        return along_13;
    }

    if points[0].distance_squared(points[2]) <= points[1].distance_squared(points[3]) {
        along_02
    } else {
        along_13
    }
}

fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = (b - a).perp_dot(p - a);
    let d2 = (c - b).perp_dot(p - b);
    let d3 = (a - c).perp_dot(p - c);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

fn ear_clip(points: &[Vec2]) -> Option<Vec<[usize; 3]>> {
    let area = signed_area(points);
    if area.abs() <= f32::EPSILON {
        return None;
    }
    let winding = area.signum();

    let mut remaining: Vec<usize> = (0..points.len()).collect();
    let mut triangles = Vec::with_capacity(points.len() - 2);

    while remaining.len() > 3 {
        let m = remaining.len();
        let ear = (0..m).find(|&i| {
            let prev = remaining[(i + m - 1) % m];
            let cur = remaining[i];
            let next = remaining[(i + 1) % m];

            let turn = (points[cur] - points[prev]).perp_dot(points[next] - points[cur]);
            if turn * winding <= 0.0 {
                return false;
            }
            !remaining.iter().any(|&j| {
                j != prev
                    && j != cur
                    && j != next
                    && point_in_triangle(points[j], points[prev], points[cur], points[next])
            })
        })?;

        let prev = remaining[(ear + m - 1) % m];
        let next = remaining[(ear + 1) % m];
        triangles.push([prev, remaining[ear], next]);
        remaining.remove(ear);
    }
    triangles.push([remaining[0], remaining[1], remaining[2]]);

    Some(triangles)
}
