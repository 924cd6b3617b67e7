//! Common types used across mmdkit
//!
//! This module provides shared type definitions used by multiple crates.

use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Index of an object inside a host scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub usize);

impl ObjectId {
    /// Create a new object ID
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw index
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for ObjectId {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

/// Signed coordinate axis, used to describe the output coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[serde(rename = "X")]
    X,
    #[serde(rename = "Y")]
    Y,
    #[serde(rename = "Z")]
    Z,
    #[serde(rename = "-X")]
    NegX,
    #[serde(rename = "-Y")]
    NegY,
    #[serde(rename = "-Z")]
    NegZ,
}

impl Axis {
    /// Unit vector pointing along this axis
    pub fn vector(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
            Axis::NegX => Vec3::NEG_X,
            Axis::NegY => Vec3::NEG_Y,
            Axis::NegZ => Vec3::NEG_Z,
        }
    }

    /// Component index ignoring the sign (0 = X, 1 = Y, 2 = Z)
    pub fn component(self) -> usize {
        match self {
            Axis::X | Axis::NegX => 0,
            Axis::Y | Axis::NegY => 1,
            Axis::Z | Axis::NegZ => 2,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
            Axis::NegX => "-X",
            Axis::NegY => "-Y",
            Axis::NegZ => "-Z",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "X" => Ok(Axis::X),
            "Y" => Ok(Axis::Y),
            "Z" => Ok(Axis::Z),
            "-X" => Ok(Axis::NegX),
            "-Y" => Ok(Axis::NegY),
            "-Z" => Ok(Axis::NegZ),
            _ => Err(format!("Unknown axis: {}", s)),
        }
    }
}

/// Target coordinate system for export.
///
/// Scenes are authored Z-up with Y forward; the conversion maps that basis
/// onto `forward`/`up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisConversion {
    pub forward: Axis,
    pub up: Axis,
}

impl Default for AxisConversion {
    fn default() -> Self {
        Self {
            forward: Axis::NegZ,
            up: Axis::Y,
        }
    }
}

impl AxisConversion {
    /// Scene-space forward axis
    pub const SOURCE_FORWARD: Axis = Axis::Y;
    /// Scene-space up axis
    pub const SOURCE_UP: Axis = Axis::Z;

    /// Build the rotation mapping scene axes onto the target axes.
    ///
    /// Fails when forward and up lie on the same axis.
    pub fn to_matrix(&self) -> Result<Mat3> {
        if self.forward.component() == self.up.component() {
            return Err(Error::invalid_config(format!(
                "forward axis {} and up axis {} must differ",
                self.forward, self.up
            )));
        }

        let basis = |forward: Axis, up: Axis| {
            let f = forward.vector();
            let u = up.vector();
            Mat3::from_cols(f.cross(u), f, u)
        };

        let source = basis(Self::SOURCE_FORWARD, Self::SOURCE_UP);
        let target = basis(self.forward, self.up);
        Ok(target * source.transpose())
    }
}

/// Compose the global export matrix: uniform scale after axis conversion.
pub fn global_matrix(conversion: AxisConversion, scale: f32) -> Result<Mat4> {
    if !(0.01..=1000.0).contains(&scale) {
        return Err(Error::invalid_config(format!(
            "global scale {} outside 0.01..=1000",
            scale
        )));
    }
    let rotation = conversion.to_matrix()?;
    Ok(Mat4::from_scale(Vec3::splat(scale)) * Mat4::from_mat3(rotation))
}

const KEY_SCALE: f64 = 1_000_000.0;

/// Round to six decimals, ties to even, keeping the sign of zero
pub fn round_decimals(value: f32) -> f64 {
    (f64::from(value) * KEY_SCALE).round_ties_even() / KEY_SCALE
}

/// Float tuple rounded to six decimals, usable as a hash key.
///
/// Two tuples that round to the same six-decimal values compare equal
/// regardless of their original bit patterns. The key ignores the sign of
/// zero; use [`round_decimals`] for the value to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoundedKey<const N: usize>([i64; N]);

impl<const N: usize> RoundedKey<N> {
    /// Round every component to six decimals
    pub fn new(values: [f32; N]) -> Self {
        let mut scaled = [0i64; N];
        for (slot, value) in scaled.iter_mut().zip(values) {
            *slot = (f64::from(value) * KEY_SCALE).round_ties_even() as i64;
        }
        Self(scaled)
    }
}

/// Key for UV coordinates
pub type UvKey = RoundedKey<2>;
/// Key for positions and normals
pub type Vec3Key = RoundedKey<3>;

/// Replace spaces so names stay a single whitespace-separated token
pub fn name_compat(name: Option<&str>) -> String {
    match name {
        None => "None".to_string(),
        Some(name) => name.replace(' ', "_"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_default_axis_conversion() {
        let m = AxisConversion::default().to_matrix().unwrap();

        // Scene forward (+Y) becomes -Z, scene up (+Z) becomes +Y
        assert!(approx(m * Vec3::Y, Vec3::NEG_Z));
        assert!(approx(m * Vec3::Z, Vec3::Y));
        assert!(approx(m * Vec3::X, Vec3::X));
    }

    #[test]
    fn test_identity_conversion() {
        let conversion = AxisConversion {
            forward: Axis::Y,
            up: Axis::Z,
        };
        let m = conversion.to_matrix().unwrap();
        assert!(m.abs_diff_eq(Mat3::IDENTITY, 1e-6));
    }

    #[test]
    fn test_conflicting_axes_rejected() {
        let conversion = AxisConversion {
            forward: Axis::Z,
            up: Axis::NegZ,
        };
        assert!(conversion.to_matrix().is_err());
    }

    #[test]
    fn test_global_matrix_scale() {
        let conversion = AxisConversion {
            forward: Axis::Y,
            up: Axis::Z,
        };
        let m = global_matrix(conversion, 2.0).unwrap();
        assert!(approx(m.transform_point3(Vec3::ONE), Vec3::splat(2.0)));
        assert!(global_matrix(conversion, 0.0).is_err());
        assert!(global_matrix(conversion, 5000.0).is_err());
    }

    #[test]
    fn test_rounded_key_equality() {
        let a = Vec3Key::new([0.1 + 0.2, 1.0, -0.0]);
        let b = Vec3Key::new([0.3, 1.0000001, 0.0]);
        assert_eq!(a, b);

        let c = UvKey::new([0.5, 0.25]);
        let d = UvKey::new([0.500002, 0.25]);
        assert_ne!(c, d);
    }

    #[test]
    fn test_rounded_key_ties_to_even() {
        // 1/128 sits exactly halfway between 0.007812 and 0.007813
        assert_eq!(UvKey::new([0.0078125, 0.0]), UvKey::new([0.0078124, 0.0]));
        assert_ne!(UvKey::new([0.0078125, 0.0]), UvKey::new([0.0078126, 0.0]));
        assert_eq!(format!("{:.6}", round_decimals(0.0078125)), "0.007812");
    }

    #[test]
    fn test_round_decimals_keeps_sign() {
        assert_eq!(format!("{:.6}", round_decimals(-0.0)), "-0.000000");
        assert_eq!(format!("{:.6}", round_decimals(-1e-7)), "-0.000000");
        assert_eq!(format!("{:.6}", round_decimals(0.1234567)), "0.123457");
        assert_eq!(Vec3Key::new([-0.0, -1e-7, 1.0]), Vec3Key::new([0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_axis_parse() {
        assert_eq!("-z".parse::<Axis>().unwrap(), Axis::NegZ);
        assert_eq!("Y".parse::<Axis>().unwrap(), Axis::Y);
        assert!("W".parse::<Axis>().is_err());
    }

    #[test]
    fn test_name_compat() {
        assert_eq!(name_compat(Some("Left Arm")), "Left_Arm");
        assert_eq!(name_compat(None), "None");
    }
}
