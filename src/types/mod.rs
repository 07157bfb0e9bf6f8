pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One accelerometer reading as delivered by a motion source.
///
/// Axes are in g-units, `t` is the arrival timestamp in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default, alias = "timestamp")]
    pub t: u64,
}

impl MotionSample {
    pub fn new(x: f64, y: f64, z: f64, t: u64) -> Self {
        Self { x, y, z, t }
    }

    pub fn from_vector(v: Vec3, t: u64) -> Self {
        Self::new(v.x, v.y, v.z, t)
    }

    /// Axis values with non-finite components replaced by zero.
    pub fn vector(&self) -> Vec3 {
        sanitize(Vec3::new(self.x, self.y, self.z))
    }

    pub fn magnitude(&self) -> f64 {
        self.vector().norm()
    }
}

/// Device axis used by the axis-deviation strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn pick(self, v: &Vec3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(format!("unknown axis '{other}' (expected x, y or z)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_magnitude() {
        let sample = MotionSample::new(3.0, 4.0, 0.0, 0);
        assert_eq!(sample.magnitude(), 5.0);
    }

    #[test]
    fn test_non_finite_axes_read_as_zero() {
        let sample = MotionSample::new(f64::NAN, 1.0, f64::NEG_INFINITY, 10);
        assert_eq!(sample.vector(), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_missing_axes_deserialize_as_zero() {
        let sample: MotionSample = serde_json::from_str(r#"{"y": 0.98, "timestamp": 120}"#).unwrap();
        assert_eq!(sample, MotionSample::new(0.0, 0.98, 0.0, 120));
    }

    #[test]
    fn test_axis_parse_and_pick() {
        let v = Vec3::new(0.1, 0.2, 0.3);
        assert_eq!("Y".parse::<Axis>().unwrap().pick(&v), 0.2);
        assert_eq!(Axis::Z.pick(&v), 0.3);
        assert!("w".parse::<Axis>().is_err());
    }
}
