//! Attribute deduplication and record writing for one object

use std::collections::HashMap;
use std::io::{self, Write};
use std::ops::AddAssign;

use mmdkit_core::{round_decimals, UvKey, Vec3Key};
use serde::Serialize;

use crate::realize::MeshSnapshot;

/// Running 1-based index bases shared by all objects of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOffsets {
    pub verts: usize,
    pub uvs: usize,
    pub normals: usize,
}

impl IndexOffsets {
    /// Offsets at the start of a file
    pub fn new() -> Self {
        Self {
            verts: 1,
            uvs: 1,
            normals: 1,
        }
    }

    /// Offsets after an object with the given counts has been written
    pub fn advance(self, stats: &ObjectStats) -> Self {
        Self {
            verts: self.verts + stats.vertices,
            uvs: self.uvs + stats.uvs,
            normals: self.normals + stats.normals,
        }
    }
}

impl Default for IndexOffsets {
    fn default() -> Self {
        Self::new()
    }
}

/// Which index groups a face corner carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceLayout {
    /// `v`
    Vertex,
    /// `v/t`
    VertexUv,
    /// `v//n`
    VertexNormal,
    /// `v/t/n`
    VertexUvNormal,
}

impl FaceLayout {
    pub fn from_flags(uvs: bool, normals: bool) -> Self {
        match (uvs, normals) {
            (false, false) => FaceLayout::Vertex,
            (true, false) => FaceLayout::VertexUv,
            (false, true) => FaceLayout::VertexNormal,
            (true, true) => FaceLayout::VertexUvNormal,
        }
    }

    pub fn has_uvs(self) -> bool {
        matches!(self, FaceLayout::VertexUv | FaceLayout::VertexUvNormal)
    }

    pub fn has_normals(self) -> bool {
        matches!(self, FaceLayout::VertexNormal | FaceLayout::VertexUvNormal)
    }

    pub fn without_uvs(self) -> Self {
        Self::from_flags(false, self.has_normals())
    }

    pub fn without_normals(self) -> Self {
        Self::from_flags(self.has_uvs(), false)
    }

    fn write_corner<W: Write>(self, out: &mut W, v: usize, t: usize, n: usize) -> io::Result<()> {
        match self {
            FaceLayout::Vertex => write!(out, " {}", v),
            FaceLayout::VertexUv => write!(out, " {}/{}", v, t),
            FaceLayout::VertexNormal => write!(out, " {}//{}", v, n),
            FaceLayout::VertexUvNormal => write!(out, " {}/{}/{}", v, t, n),
        }
    }
}

/// Records written for one object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObjectStats {
    pub vertices: usize,
    pub uvs: usize,
    pub normals: usize,
    pub faces: usize,
}

impl AddAssign for ObjectStats {
    fn add_assign(&mut self, other: Self) {
        self.vertices += other.vertices;
        self.uvs += other.uvs;
        self.normals += other.normals;
        self.faces += other.faces;
    }
}

/// Assigns object-local indices to keys in first-seen order
struct Dedup<K> {
    indices: HashMap<K, usize>,
}

impl<K: std::hash::Hash + Eq> Dedup<K> {
    fn new() -> Self {
        Self {
            indices: HashMap::new(),
        }
    }

    /// Returns the key's index and whether it was seen for the first time
    fn index(&mut self, key: K) -> (usize, bool) {
        let next = self.indices.len();
        let mut inserted = false;
        let index = *self.indices.entry(key).or_insert_with(|| {
            inserted = true;
            next
        });
        (index, inserted)
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}

/// Streams one mesh snapshot as `v`/`vt`/`vn`/`f` records
#[derive(Debug, Clone, Copy)]
pub struct ObjectWriter {
    layout: FaceLayout,
    tag_vertices: bool,
}

impl ObjectWriter {
    /// `layout` is the file-wide layout; it is narrowed per object when the
    /// snapshot lacks UVs or normals.
    pub fn new(layout: FaceLayout, tag_vertices: bool) -> Self {
        Self {
            layout,
            tag_vertices,
        }
    }

    /// Write the snapshot using `offsets` as index bases.
    ///
    /// Returns the object's record counts and the offsets for the next object.
    pub fn write<W: Write>(
        &self,
        out: &mut W,
        snapshot: &MeshSnapshot,
        offsets: IndexOffsets,
    ) -> io::Result<(ObjectStats, IndexOffsets)> {
        let mut layout = self.layout;
        if snapshot.uvs.is_none() {
            layout = layout.without_uvs();
        }
        if snapshot.normals.is_none() {
            layout = layout.without_normals();
        }

        for p in &snapshot.positions {
            if self.tag_vertices {
                writeln!(out, "vb {:.6} {:.6} {:.6} 0", p.x, p.y, p.z)?;
            } else {
                writeln!(out, "v {:.6} {:.6} {:.6}", p.x, p.y, p.z)?;
            }
        }

        let corner_count = snapshot.corner_count();

        let mut uv_dedup = Dedup::<UvKey>::new();
        let mut uv_index = vec![0usize; corner_count];
        if let (true, Some(uvs)) = (layout.has_uvs(), snapshot.uvs.as_ref()) {
            for face in &snapshot.faces {
                for corner in face.corners() {
                    let uv = uvs[corner];
                    let (index, first) = uv_dedup.index(UvKey::new([uv.x, uv.y]));
                    if first {
                        writeln!(out, "vt {:.6} {:.6}", uv.x, uv.y)?;
                    }
                    uv_index[corner] = index;
                }
            }
        }

        let mut normal_dedup = Dedup::<Vec3Key>::new();
        let mut normal_index = vec![0usize; corner_count];
        if let (true, Some(normals)) = (layout.has_normals(), snapshot.normals.as_ref()) {
            for face in &snapshot.faces {
                for corner in face.corners() {
                    let n = normals[corner];
                    let (index, first) = normal_dedup.index(Vec3Key::new([n.x, n.y, n.z]));
                    if first {
                        let [x, y, z] = [n.x, n.y, n.z].map(round_decimals);
                        writeln!(out, "vn {:.6} {:.6} {:.6}", x, y, z)?;
                    }
                    normal_index[corner] = index;
                }
            }
        }

        for face in &snapshot.faces {
            out.write_all(b"f")?;
            for (vertex, corner) in face.vertices.iter().zip(face.corners()) {
                layout.write_corner(
                    out,
                    offsets.verts + *vertex as usize,
                    offsets.uvs + uv_index[corner],
                    offsets.normals + normal_index[corner],
                )?;
            }
            out.write_all(b"\n")?;
        }

        let stats = ObjectStats {
            vertices: snapshot.positions.len(),
            uvs: uv_dedup.len(),
            normals: normal_dedup.len(),
            faces: snapshot.faces.len(),
        };
        Ok((stats, offsets.advance(&stats)))
    }
}
