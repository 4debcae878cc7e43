//! Vector types shared with the host simulation.

use serde::{Deserialize, Serialize};

/// Distance below which two positions are treated as the same point.
///
/// Hosts report positions after their own float integration, so a body
/// pinned against a wall still jitters in the last few bits.
pub const POSITION_EPSILON: f64 = 1e-5;

/// 3D vector for positions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component (up).
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Zero vector.
    #[must_use]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }

    /// Magnitude squared.
    #[must_use]
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Magnitude (length).
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Distance to another point.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (*self - *other).magnitude()
    }

    /// Same point within [`POSITION_EPSILON`].
    #[must_use]
    pub fn approx_eq(&self, other: &Self) -> bool {
        self.distance(other) < POSITION_EPSILON
    }

    /// Check if all components are finite.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // is_finite not const
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// 2D vector for planar movement input (XZ plane).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component.
    pub x: f64,
    /// Y component (maps to world Z).
    pub y: f64,
}

impl Vec2 {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    #[must_use]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Whether both components are exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_arithmetic() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(0.5, 0.5, 0.5);
        assert_eq!(a + b, Vec3::new(1.5, 2.5, 3.5));
        assert_eq!(a - b, Vec3::new(0.5, 1.5, 2.5));
    }

    #[test]
    fn test_vec3_distance() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 0.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_vec3_approx_eq() {
        let a = Vec3::new(1.0, 1.0, 1.0);
        assert!(a.approx_eq(&Vec3::new(1.0, 1.0, 1.000_000_1)));
        assert!(!a.approx_eq(&Vec3::new(1.0, 1.0, 1.001)));
    }

    #[test]
    fn test_vec3_finite() {
        assert!(Vec3::zero().is_finite());
        assert!(!Vec3::new(f64::NAN, 0.0, 0.0).is_finite());
    }

    #[test]
    fn test_vec2_is_zero() {
        assert!(Vec2::zero().is_zero());
        assert!(Vec2::default().is_zero());
        assert!(!Vec2::new(0.0, -0.1).is_zero());
    }

    #[test]
    fn test_vec3_display() {
        assert_eq!(Vec3::new(1.0, 2.5, -3.0).to_string(), "(1.00, 2.50, -3.00)");
    }
}
