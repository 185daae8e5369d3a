//! Homogeneous vectors.
//! This module is private but reexported by its parent.

use core::fmt;
use core::ops;

use euclid::default::{Point3D, Vector3D};

use crate::math::FreeCoordinate;

/// A 4-component homogeneous vector.
///
/// Points have `h == 1` and directions (normals, offsets) have `h == 0`.
/// Arithmetic is component-wise on all four components, so subtracting two points
/// yields a direction and adding a direction to a point yields a point.
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector {
    #[allow(missing_docs)]
    pub x: FreeCoordinate,
    #[allow(missing_docs)]
    pub y: FreeCoordinate,
    #[allow(missing_docs)]
    pub z: FreeCoordinate,
    /// Homogeneous coordinate.
    pub h: FreeCoordinate,
}

impl Vector {
    /// The zero direction.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// The point at the origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    #[inline]
    #[allow(missing_docs)]
    pub const fn new(
        x: FreeCoordinate,
        y: FreeCoordinate,
        z: FreeCoordinate,
        h: FreeCoordinate,
    ) -> Self {
        Self { x, y, z, h }
    }

    /// Constructs a point, with `h == 1`.
    #[inline]
    pub const fn point(x: FreeCoordinate, y: FreeCoordinate, z: FreeCoordinate) -> Self {
        Self::new(x, y, z, 1.0)
    }

    /// Constructs a direction, with `h == 0`.
    #[inline]
    pub const fn direction(x: FreeCoordinate, y: FreeCoordinate, z: FreeCoordinate) -> Self {
        Self::new(x, y, z, 0.0)
    }

    /// Returns the components as `[x, y, z, h]`.
    #[inline]
    pub const fn to_array(self) -> [FreeCoordinate; 4] {
        [self.x, self.y, self.z, self.h]
    }

    /// Dot product of the spatial (x, y, z) components.
    #[inline]
    pub fn dot(self, other: Self) -> FreeCoordinate {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product of the spatial components. The result is a direction.
    #[inline]
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::direction(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Length of the spatial components.
    #[inline]
    pub fn magnitude(self) -> FreeCoordinate {
        self.dot(self).sqrt()
    }

    /// Scales the spatial components to unit length, leaving `h` alone.
    ///
    /// Returns [`None`] if the vector has zero or non-finite length, since such a vector
    /// has no direction.
    #[inline]
    pub fn normalize(self) -> Option<Self> {
        let length = self.magnitude();
        if length == 0.0 || !length.is_finite() {
            return None;
        }
        Some(Self::new(
            self.x / length,
            self.y / length,
            self.z / length,
            self.h,
        ))
    }

    /// Divides every component by `h`, so that the result has `h == 1`.
    ///
    /// Returns [`None`] if `h` is zero or the result would not be finite; such a vector
    /// is a direction or a point at infinity and has no finite position.
    ///
    /// ```
    /// # extern crate lilac_base as lilac;
    /// use lilac::math::Vector;
    ///
    /// assert_eq!(
    ///     Vector::new(2.0, 4.0, 6.0, 2.0).homogenize(),
    ///     Some(Vector::point(1.0, 2.0, 3.0)),
    /// );
    /// assert_eq!(Vector::direction(1.0, 0.0, 0.0).homogenize(), None);
    /// ```
    #[inline]
    pub fn homogenize(self) -> Option<Self> {
        if self.h == 0.0 {
            return None;
        }
        let result = Self::new(self.x / self.h, self.y / self.h, self.z / self.h, 1.0);
        result.is_finite().then_some(result)
    }

    /// Returns whether all four components are finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.h.is_finite()
    }

    /// Linear interpolation of all four components; `t == 0` yields `self`.
    #[inline]
    #[must_use]
    pub fn lerp(self, other: Self, t: FreeCoordinate) -> Self {
        self + (other - self) * t
    }

    /// Returns the spatial components as a [`euclid`] point, discarding `h`.
    #[inline]
    pub fn to_point3d(self) -> Point3D<FreeCoordinate> {
        Point3D::new(self.x, self.y, self.z)
    }
}

impl fmt::Debug for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { x, y, z, h } = self;
        write!(f, "[{x:?}, {y:?}, {z:?}; {h:?}]")
    }
}

impl From<[FreeCoordinate; 4]> for Vector {
    #[inline]
    fn from([x, y, z, h]: [FreeCoordinate; 4]) -> Self {
        Self::new(x, y, z, h)
    }
}

impl From<Vector> for [FreeCoordinate; 4] {
    #[inline]
    fn from(value: Vector) -> Self {
        value.to_array()
    }
}

impl From<Point3D<FreeCoordinate>> for Vector {
    #[inline]
    fn from(value: Point3D<FreeCoordinate>) -> Self {
        Self::point(value.x, value.y, value.z)
    }
}

impl From<Vector3D<FreeCoordinate>> for Vector {
    #[inline]
    fn from(value: Vector3D<FreeCoordinate>) -> Self {
        Self::direction(value.x, value.y, value.z)
    }
}

impl ops::Add for Vector {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(
            self.x + rhs.x,
            self.y + rhs.y,
            self.z + rhs.z,
            self.h + rhs.h,
        )
    }
}

impl ops::Sub for Vector {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(
            self.x - rhs.x,
            self.y - rhs.y,
            self.z - rhs.z,
            self.h - rhs.h,
        )
    }
}

impl ops::Mul<FreeCoordinate> for Vector {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: FreeCoordinate) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs, self.h * rhs)
    }
}

impl ops::Neg for Vector {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z, -self.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn homogenize_unit_h_is_identity() {
        let p = Vector::point(3.5, -2.0, 7.25);
        assert_eq!(p.homogenize(), Some(p));
    }

    #[test]
    fn homogenize_halves() {
        let v = Vector::new(4.0, -6.0, 1.0, 2.0);
        assert_eq!(v.homogenize(), Some(Vector::new(2.0, -3.0, 0.5, 1.0)));
    }

    #[test]
    fn normalize_zero_is_none() {
        assert_eq!(Vector::ZERO.normalize(), None);
        assert_eq!(
            Vector::direction(f64::NAN, 0.0, 0.0).normalize(),
            None
        );
    }

    #[test]
    fn normalize_keeps_h() {
        let n = Vector::new(3.0, 0.0, 4.0, 1.0).normalize().unwrap();
        assert_eq!(n, Vector::new(0.6, 0.0, 0.8, 1.0));
    }

    #[test]
    fn cross_is_right_handed() {
        let x = Vector::direction(1.0, 0.0, 0.0);
        let y = Vector::direction(0.0, 1.0, 0.0);
        assert_eq!(x.cross(y), Vector::direction(0.0, 0.0, 1.0));
    }

    #[test]
    fn point_difference_is_direction() {
        let d = Vector::point(1.0, 2.0, 3.0) - Vector::point(1.0, 1.0, 1.0);
        assert_eq!(d, Vector::direction(0.0, 1.0, 2.0));
    }
}
