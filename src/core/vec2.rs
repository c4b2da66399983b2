//! 2D Vector
//!
//! Small `f32` vector used for positions, velocities and facing.
//! Normalization degrades to the zero vector instead of dividing by ~0.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};
use serde::{Serialize, Deserialize};

/// Lengths below this are treated as zero.
pub const EPSILON: f32 = 1e-6;

/// 2D vector with `f32` components.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component (screen space, grows right)
    pub x: f32,
    /// Y component (screen space, grows down)
    pub y: f32,
}

impl Vec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Unit vector pointing right (+X)
    pub const RIGHT: Self = Self { x: 1.0, y: 0.0 };

    /// Unit vector pointing left (-X)
    pub const LEFT: Self = Self { x: -1.0, y: 0.0 };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Scale by a scalar.
    #[inline]
    pub fn scale(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    /// Squared length (prefer this for comparisons).
    #[inline]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Length (magnitude).
    #[inline]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Normalize to unit length.
    /// Returns ZERO if the length is below [`EPSILON`] or not finite.
    #[inline]
    pub fn normalize(self) -> Self {
        if self.is_zero() {
            return Self::ZERO;
        }
        self.scale(1.0 / self.length())
    }

    /// True if this vector is (numerically) zero. NaN and infinite
    /// lengths count as zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        let len = self.length();
        !len.is_finite() || len < EPSILON
    }

    /// True if both components are finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Dot product with another vector.
    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Angle of this vector in radians (`atan2(y, x)`).
    #[inline]
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Rotate 90 degrees (left-hand perpendicular in screen space).
    #[inline]
    pub fn perpendicular(self) -> Self {
        Self {
            x: -self.y,
            y: self.x,
        }
    }

    /// Clamp each component into `[min, max]`.
    #[inline]
    pub fn clamp_to(self, min: Vec2, max: Vec2) -> Self {
        Self {
            x: self.x.clamp(min.x, max.x),
            y: self.y.clamp(min.y, max.y),
        }
    }
}

/// Signed smallest difference between two angles, in `(-PI, PI]`.
#[inline]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    (a - b).sin().atan2((a - b).cos())
}

impl Add for Vec2 {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    #[inline]
    fn mul(self, scalar: f32) -> Self {
        self.scale(scalar)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl fmt::Debug for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vec2({:.3}, {:.3})", self.x, self.y)
    }
}
