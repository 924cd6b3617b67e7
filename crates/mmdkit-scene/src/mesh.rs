// mmdkit-scene/src/mesh.rs
//! Polygon mesh data as supplied by the scene host

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::traits::{SceneError, SceneResult};

/// A polygon mesh in object space
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Vertex positions
    pub vertices: Vec<Vec3>,
    /// Polygons, each an ordered loop of vertex indices
    pub polygons: Vec<Polygon>,
    /// UV layers, one coordinate per polygon corner
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uv_layers: Vec<UvLayer>,
    /// Index of the active UV layer (first layer when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_uv_layer: Option<usize>,
    /// Edges marked sharp, as vertex index pairs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sharp_edges: Vec<[u32; 2]>,
    /// Edges whose faces meet at a larger angle (radians) shade flat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_smooth_angle: Option<f32>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from positions and polygon loops, all polygons flat
    pub fn from_polygons(vertices: Vec<Vec3>, polygons: Vec<Vec<u32>>) -> Self {
        Self {
            vertices,
            polygons: polygons.into_iter().map(Polygon::new).collect(),
            ..Self::default()
        }
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get polygon count
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Total number of polygon corners (loops)
    pub fn loop_count(&self) -> usize {
        self.polygons.iter().map(|p| p.vertices.len()).sum()
    }

    /// Nothing to export
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.polygons.is_empty()
    }

    /// Index of the first corner of every polygon in the flat loop array
    pub fn corner_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.polygons.len());
        let mut next = 0;
        for polygon in &self.polygons {
            offsets.push(next);
            next += polygon.vertices.len();
        }
        offsets
    }

    /// The UV layer used for export, if any
    pub fn active_uv_layer(&self) -> Option<&UvLayer> {
        match self.active_uv_layer {
            Some(index) => self.uv_layers.get(index),
            None => self.uv_layers.first(),
        }
    }

    /// Add a UV layer and make it active
    pub fn add_uv_layer(&mut self, layer: UvLayer) -> usize {
        let idx = self.uv_layers.len();
        self.uv_layers.push(layer);
        self.active_uv_layer = Some(idx);
        idx
    }

    /// Average of a polygon's vertex positions
    pub fn polygon_center(&self, index: usize) -> Option<Vec3> {
        let polygon = self.polygons.get(index)?;
        if polygon.vertices.is_empty() {
            return None;
        }
        let sum: Vec3 = polygon
            .vertices
            .iter()
            .filter_map(|&v| self.vertices.get(v as usize))
            .copied()
            .sum();
        Some(sum / polygon.vertices.len() as f32)
    }

    /// Sharp edges as a lookup set of ordered vertex pairs
    pub fn sharp_edge_set(&self) -> HashSet<(u32, u32)> {
        self.sharp_edges
            .iter()
            .map(|&[a, b]| edge_key(a, b))
            .collect()
    }

    /// Check that every index the exporter will follow is in range
    pub fn validate(&self) -> SceneResult<()> {
        let vertex_count = self.vertices.len();
        for (idx, polygon) in self.polygons.iter().enumerate() {
            if let Some(&bad) = polygon
                .vertices
                .iter()
                .find(|&&v| v as usize >= vertex_count)
            {
                return Err(SceneError::InvalidMesh(format!(
                    "polygon {} references vertex {} but mesh has {} vertices",
                    idx, bad, vertex_count
                )));
            }
        }

        let loops = self.loop_count();
        for layer in &self.uv_layers {
            if layer.uvs.len() != loops {
                return Err(SceneError::InvalidMesh(format!(
                    "UV layer '{}' has {} coordinates for {} corners",
                    layer.name,
                    layer.uvs.len(),
                    loops
                )));
            }
        }

        if let Some(active) = self.active_uv_layer {
            if active >= self.uv_layers.len() {
                return Err(SceneError::InvalidMesh(format!(
                    "active UV layer {} out of range ({} layers)",
                    active,
                    self.uv_layers.len()
                )));
            }
        }

        Ok(())
    }
}

/// A polygon: an ordered loop of vertex indices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    /// Vertex indices, in winding order
    pub vertices: Vec<u32>,
    /// Smooth shading flag
    #[serde(default)]
    pub smooth: bool,
}

impl Polygon {
    /// Create a flat-shaded polygon
    pub fn new(vertices: Vec<u32>) -> Self {
        Self {
            vertices,
            smooth: false,
        }
    }

    /// Create a smooth-shaded polygon
    pub fn smooth(vertices: Vec<u32>) -> Self {
        Self {
            vertices,
            smooth: true,
        }
    }
}

/// Per-corner texture coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UvLayer {
    /// Layer name
    pub name: String,
    /// One coordinate per polygon corner, in polygon order
    pub uvs: Vec<Vec2>,
}

impl UvLayer {
    /// Create a UV layer
    pub fn new(name: impl Into<String>, uvs: Vec<Vec2>) -> Self {
        Self {
            name: name.into(),
            uvs,
        }
    }
}

/// Order-independent key for the edge between two vertices
pub fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
