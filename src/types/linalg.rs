//! Vector type aliases and helpers shared by the filter and the signal strategies.

use nalgebra::Vector3;

/// 3-axis acceleration vector in g-units.
pub type Vec3 = Vector3<f64>;

/// Angle between two vectors in degrees.
///
/// `acos(clamp(dot / (|a|·|b|), -1, 1))`, converted to degrees.
/// Zero-magnitude input yields 0 instead of NaN.
pub fn angle_between_deg(a: &Vec3, b: &Vec3) -> f64 {
    let norm_a = a.norm();
    let norm_b = b.norm();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let cos = (a.dot(b) / (norm_a * norm_b)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Replace NaN / infinite components with zero.
pub fn sanitize(v: Vec3) -> Vec3 {
    v.map(|c| if c.is_finite() { c } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_orthogonal_vectors() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 0.0, 2.0);
        assert_relative_eq!(angle_between_deg(&a, &b), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_parallel_and_opposite() {
        let a = Vec3::new(0.0, 0.3, 0.9);
        assert_relative_eq!(angle_between_deg(&a, &(a * 4.0)), 0.0, epsilon = 1e-6);
        assert_relative_eq!(angle_between_deg(&a, &(-a)), 180.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_magnitude_is_zero_angle() {
        let a = Vec3::zeros();
        let b = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(angle_between_deg(&a, &b), 0.0);
        assert_eq!(angle_between_deg(&b, &a), 0.0);
    }

    #[test]
    fn test_sanitize() {
        let v = sanitize(Vec3::new(f64::NAN, 0.5, f64::INFINITY));
        assert_eq!(v, Vec3::new(0.0, 0.5, 0.0));
    }
}
