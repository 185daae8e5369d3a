//! 4×4 transformation matrices.
//! This module is private but reexported by its parent.

use core::fmt;
use core::ops;

use crate::math::{FreeCoordinate, Vector};

/// A 4×4 transformation matrix acting on column [`Vector`]s.
///
/// `Matrix` is [`Copy`] and every operation replaces the whole grid, so a value read
/// out of a scene element or a traversal is always a snapshot.
///
/// Transformations compose by *premultiplication*: [`Matrix::multiply`] puts the new
/// operation on the left, so it is applied after every operation already accumulated.
//---
// Design note: euclid's `Transform3D` uses the row-vector convention, which would
// make every composition in the scene graph read backwards.
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix {
    rows: [[FreeCoordinate; 4]; 4],
}

impl Matrix {
    /// The identity matrix.
    pub const IDENTITY: Self = Self::from_rows([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    /// The zero matrix, which transforms all vectors to zero.
    pub const ZERO: Self = Self::from_rows([[0.0; 4]; 4]);

    /// Constructs a matrix from its rows, in the conventional textual order.
    #[inline]
    pub const fn from_rows(rows: [[FreeCoordinate; 4]; 4]) -> Self {
        Self { rows }
    }

    /// Returns the rows of this matrix.
    #[inline]
    pub const fn rows(&self) -> [[FreeCoordinate; 4]; 4] {
        self.rows
    }

    /// Replaces this matrix with the identity.
    #[inline]
    pub fn identity(&mut self) {
        *self = Self::IDENTITY;
    }

    /// Replaces this matrix with the zero matrix.
    #[inline]
    pub fn clear(&mut self) {
        *self = Self::ZERO;
    }

    /// Returns the transpose of this matrix.
    #[inline]
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = self.rows[c][r];
            }
        }
        Self { rows }
    }

    /// Composes `operation` after this matrix: `self = operation · self`.
    ///
    /// ```
    /// # extern crate lilac_base as lilac;
    /// use lilac::math::{Matrix, Vector};
    ///
    /// let mut m = Matrix::scale(2.0, 2.0, 2.0);
    /// m.multiply(&Matrix::translate(1.0, 0.0, 0.0));
    /// // Scaled first, then translated.
    /// assert_eq!(m * Vector::point(1.0, 1.0, 1.0), Vector::point(3.0, 2.0, 2.0));
    /// ```
    #[inline]
    pub fn multiply(&mut self, operation: &Matrix) {
        *self = *operation * *self;
    }

    /// Applies this matrix to a single vector. Equivalent to `self * vector`.
    #[inline]
    pub fn transform_vector(&self, vector: Vector) -> Vector {
        let v = vector.to_array();
        let row = |r: &[FreeCoordinate; 4]| r[0] * v[0] + r[1] * v[1] + r[2] * v[2] + r[3] * v[3];
        Vector::new(
            row(&self.rows[0]),
            row(&self.rows[1]),
            row(&self.rows[2]),
            row(&self.rows[3]),
        )
    }

    /// Returns whether every element is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.rows.iter().flatten().all(|e| e.is_finite())
    }

    // --- Generators ---
    // Each returns the matrix for a single operation, to be composed with `multiply`.

    /// Scale along each axis.
    #[inline]
    pub const fn scale(sx: FreeCoordinate, sy: FreeCoordinate, sz: FreeCoordinate) -> Self {
        Self::from_rows([
            [sx, 0.0, 0.0, 0.0],
            [0.0, sy, 0.0, 0.0],
            [0.0, 0.0, sz, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Scale along the X and Y axes only.
    #[inline]
    pub const fn scale_2d(sx: FreeCoordinate, sy: FreeCoordinate) -> Self {
        Self::scale(sx, sy, 1.0)
    }

    /// Translation.
    #[inline]
    pub const fn translate(tx: FreeCoordinate, ty: FreeCoordinate, tz: FreeCoordinate) -> Self {
        Self::from_rows([
            [1.0, 0.0, 0.0, tx],
            [0.0, 1.0, 0.0, ty],
            [0.0, 0.0, 1.0, tz],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Translation in the XY plane.
    #[inline]
    pub const fn translate_2d(tx: FreeCoordinate, ty: FreeCoordinate) -> Self {
        Self::translate(tx, ty, 0.0)
    }

    /// Rotation about the X axis, given the cosine and sine of the angle.
    ///
    /// The two values are not checked for consistency.
    #[inline]
    pub const fn rotate_x(cos: FreeCoordinate, sin: FreeCoordinate) -> Self {
        Self::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, cos, -sin, 0.0],
            [0.0, sin, cos, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation about the Y axis, given the cosine and sine of the angle.
    ///
    /// The two values are not checked for consistency.
    #[inline]
    pub const fn rotate_y(cos: FreeCoordinate, sin: FreeCoordinate) -> Self {
        Self::from_rows([
            [cos, 0.0, sin, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [-sin, 0.0, cos, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation about the Z axis, given the cosine and sine of the angle.
    ///
    /// The two values are not checked for consistency.
    #[inline]
    pub const fn rotate_z(cos: FreeCoordinate, sin: FreeCoordinate) -> Self {
        Self::from_rows([
            [cos, -sin, 0.0, 0.0],
            [sin, cos, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation into the orthonormal basis `u`, `v`, `w`, which become the rows of the
    /// matrix. Only the spatial components of the vectors are used.
    #[inline]
    pub const fn rotate_xyz(u: Vector, v: Vector, w: Vector) -> Self {
        Self::from_rows([
            [u.x, u.y, u.z, 0.0],
            [v.x, v.y, v.z, 0.0],
            [w.x, w.y, w.z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Shear of X by Y and Y by X.
    #[inline]
    pub const fn shear_2d(shx: FreeCoordinate, shy: FreeCoordinate) -> Self {
        Self::from_rows([
            [1.0, shx, 0.0, 0.0],
            [shy, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Shear of X and Y by Z.
    #[inline]
    pub const fn shear_z(shx: FreeCoordinate, shy: FreeCoordinate) -> Self {
        Self::from_rows([
            [1.0, 0.0, shx, 0.0],
            [0.0, 1.0, shy, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Sets up a perspective divide for a center of projection at distance `d` behind
    /// the view plane: the resulting `h` is `z / d`.
    #[inline]
    pub fn perspective(d: FreeCoordinate) -> Self {
        Self::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0 / d, 0.0],
        ])
    }
}

impl Default for Matrix {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rows.iter()).finish()
    }
}

impl ops::Mul for Matrix {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.rows[r][k] * rhs.rows[k][c]).sum();
            }
        }
        Self { rows }
    }
}

impl ops::Mul<Vector> for Matrix {
    type Output = Vector;

    #[inline]
    fn mul(self, rhs: Vector) -> Self::Output {
        self.transform_vector(rhs)
    }
}
