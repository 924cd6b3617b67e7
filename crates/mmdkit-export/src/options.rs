//! Export options

use glam::Mat4;
use mmdkit_core::{global_matrix, AxisConversion, Error, Result};
use serde::{Deserialize, Serialize};

use crate::paths::PathMode;
use crate::writer::FaceLayout;

/// MMD export options
///
/// Serializable so a set of options can be stored as a JSON preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Convert all faces to triangles
    pub triangulate: bool,
    /// Write per-corner (split) normals
    pub include_normals: bool,
    /// Write the active UV layer
    pub include_uvs: bool,
    /// Write the armature's joint hierarchy before each object's vertices
    pub include_bones: bool,
    /// Write `vb` vertex records carrying a bone tag placeholder
    pub tag_vertices: bool,
    /// Keep polygon order instead of grouping faces by shading
    pub keep_vertex_order: bool,
    /// Only export the host's selected objects
    pub selection_only: bool,
    /// Axis conversion and scale applied on top of every object transform
    pub global_matrix: Mat4,
    /// How externally referenced files are handled
    pub path_mode: PathMode,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            triangulate: true,
            include_normals: true,
            include_uvs: true,
            include_bones: false,
            tag_vertices: false,
            keep_vertex_order: false,
            selection_only: false,
            global_matrix: Mat4::IDENTITY,
            path_mode: PathMode::Auto,
        }
    }
}

impl ExportOptions {
    /// Set the global matrix from a target axis system and uniform scale
    pub fn with_axes(mut self, conversion: AxisConversion, scale: f32) -> Result<Self> {
        self.global_matrix = global_matrix(conversion, scale)?;
        Ok(self)
    }

    /// Face record layout implied by the attribute options
    pub fn face_layout(&self) -> FaceLayout {
        FaceLayout::from_flags(self.include_uvs, self.include_normals)
    }

    /// Validate once before exporting
    pub fn validate(&self) -> Result<()> {
        if !self.global_matrix.is_finite() {
            return Err(Error::invalid_config("global matrix contains non-finite values"));
        }
        if self.global_matrix.determinant().abs() <= f32::EPSILON {
            return Err(Error::invalid_config("global matrix is not invertible"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use mmdkit_core::Axis;

    #[test]
    fn test_defaults() {
        let options = ExportOptions::default();
        assert!(options.triangulate);
        assert!(options.include_normals);
        assert!(options.include_uvs);
        assert!(!options.include_bones);
        assert!(!options.tag_vertices);
        assert!(!options.keep_vertex_order);
        assert!(!options.selection_only);
        assert_eq!(options.global_matrix, Mat4::IDENTITY);
        assert_eq!(options.path_mode, PathMode::Auto);
        assert_eq!(options.face_layout(), FaceLayout::VertexUvNormal);
    }

    #[test]
    fn test_validate() {
        assert!(ExportOptions::default().validate().is_ok());

        let flat = ExportOptions {
            global_matrix: Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0)),
            ..Default::default()
        };
        assert!(flat.validate().is_err());

        let nan = ExportOptions {
            global_matrix: Mat4::from_translation(Vec3::new(f32::NAN, 0.0, 0.0)),
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_with_axes() {
        let options = ExportOptions::default()
            .with_axes(AxisConversion::default(), 2.0)
            .unwrap();
        let p = options.global_matrix.transform_point3(Vec3::Z);
        assert!((p - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-6);

        let bad = AxisConversion {
            forward: Axis::Y,
            up: Axis::NegY,
        };
        assert!(ExportOptions::default().with_axes(bad, 1.0).is_err());
    }

    #[test]
    fn test_preset_round_trip() {
        let options = ExportOptions {
            include_bones: true,
            path_mode: PathMode::Strip,
            ..Default::default()
        };
        let json = serde_json::to_string(&options).unwrap();
        let parsed: ExportOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, options);

        let partial: ExportOptions = serde_json::from_str(r#"{ "triangulate": false }"#).unwrap();
        assert!(!partial.triangulate);
        assert!(partial.include_uvs);
    }
}
