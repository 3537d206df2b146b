//! Mathematical primitives for 2D localization.
//!
//! Functions for angle normalization and angular arithmetic.

use std::f64::consts::PI;

/// Normalize angle to (-π, π].
///
/// # Example
/// ```
/// use dhruva_mcl::core::math::normalize_angle;
/// use std::f64::consts::PI;
///
/// assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-12);
/// assert!((normalize_angle(-PI) - PI).abs() < 1e-12);
/// ```
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Shortest angular difference from angle `a` to angle `b`.
///
/// Returns the signed angle you need to add to `a` to reach `b`,
/// taking the shortest path around the circle.
#[inline]
pub fn angle_diff(a: f64, b: f64) -> f64 {
    normalize_angle(b - a)
}

/// Linear interpolation between two angles, taking the shortest path.
///
/// `t` should be in [0, 1] where 0 returns `a` and 1 returns `b`.
#[inline]
pub fn angle_lerp(a: f64, b: f64, t: f64) -> f64 {
    normalize_angle(a + angle_diff(a, b) * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_angle_zero() {
        assert_relative_eq!(normalize_angle(0.0), 0.0);
    }

    #[test]
    fn test_normalize_angle_boundary() {
        // Range is half-open: both ±π map to +π
        assert_relative_eq!(normalize_angle(PI), PI);
        assert_relative_eq!(normalize_angle(-PI), PI);
    }

    #[test]
    fn test_normalize_angle_wrap_positive() {
        assert_relative_eq!(normalize_angle(2.0 * PI), 0.0, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(3.0 * PI), PI, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(4.0 * PI), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_angle_wrap_negative() {
        assert_relative_eq!(normalize_angle(-2.0 * PI), 0.0, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(-3.0 * PI), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_angle_periodicity() {
        for k in -5i32..=5 {
            for &theta in &[0.0, 0.3, -0.3, 1.7, -2.9] {
                let shifted = theta + 2.0 * PI * k as f64;
                assert_relative_eq!(
                    normalize_angle(shifted),
                    normalize_angle(theta),
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn test_normalize_angle_in_range() {
        for i in -1000..1000 {
            let a = normalize_angle(i as f64 * 0.1);
            assert!(a > -PI && a <= PI, "Out of range: {}", a);
        }
    }

    #[test]
    fn test_angle_diff_same_sign() {
        assert_relative_eq!(angle_diff(0.0, PI / 2.0), PI / 2.0);
        assert_relative_eq!(angle_diff(PI / 2.0, 0.0), -PI / 2.0);
    }

    #[test]
    fn test_angle_diff_crossing_pi() {
        // From just below π to just above -π (should be small positive)
        assert_relative_eq!(angle_diff(PI - 0.1, -PI + 0.1), 0.2, epsilon = 1e-12);
        // From just above -π to just below π (should be small negative)
        assert_relative_eq!(angle_diff(-PI + 0.1, PI - 0.1), -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_angle_lerp() {
        assert_relative_eq!(angle_lerp(0.0, PI / 2.0, 0.0), 0.0);
        assert_relative_eq!(angle_lerp(0.0, PI / 2.0, 1.0), PI / 2.0);
        assert_relative_eq!(angle_lerp(0.0, PI / 2.0, 0.5), PI / 4.0);

        // Crossing ±π boundary
        let result = angle_lerp(PI - 0.1, -PI + 0.1, 0.5);
        assert_relative_eq!(result, PI, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_handles_nan_gracefully() {
        assert!(normalize_angle(f64::NAN).is_nan());
        assert!(normalize_angle(f64::INFINITY).is_nan());
    }
}
