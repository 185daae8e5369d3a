//! Cameras: the mapping from world space to screen space.
//!
//! A [`Camera`] is built once from either a [`View2D`] or a [`View3D`] and holds the
//! composed view transformation matrix, which is reused for every frame until the
//! camera is replaced.
//!
//! After the view matrix is applied, a point becomes a screen position by dividing its
//! X and Y by its homogeneous coordinate and negating its Z; see [`to_screen()`].
//! The resulting depth is smaller for nearer points.

use std::fmt;

use crate::math::{FreeCoordinate, ImageSize, Matrix, Vector};

/// Parameters of an orthographic view of the XY plane.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub struct View2D {
    /// World point shown at the center of the screen. Only X and Y are used.
    pub center: Vector,
    /// Rotation of the view, as the cosine and sine of its angle. Need not be unit
    /// length, but must not be zero.
    pub orientation: [FreeCoordinate; 2],
    /// Width of the visible area in world units. The height follows from the
    /// aspect ratio of `size`.
    pub width: FreeCoordinate,
    /// Size of the screen in pixels.
    pub size: ImageSize,
}

impl View2D {
    #[allow(missing_docs)]
    pub fn new(center: Vector, width: FreeCoordinate, size: ImageSize) -> Self {
        Self {
            center,
            orientation: [1.0, 0.0],
            width,
            size,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn with_orientation(mut self, orientation: [FreeCoordinate; 2]) -> Self {
        self.orientation = orientation;
        self
    }

    fn matrix(&self) -> Result<Matrix, ViewError> {
        let (cols, rows) = screen_dimensions(self.size)?;
        positive("width", self.width)?;
        finite_vector("center", self.center)?;
        let [nx, ny] = self.orientation;
        let length = nx.hypot(ny);
        if !(length > 0.0 && length.is_finite()) {
            return Err(ViewError::ZeroOrientation);
        }
        let (nx, ny) = (nx / length, ny / length);

        let du = self.width;
        let dv = du * rows / cols;
        let mut vtm = Matrix::translate_2d(-self.center.x, -self.center.y);
        vtm.multiply(&Matrix::scale_2d(cols / du, -rows / dv));
        vtm.multiply(&Matrix::rotate_z(nx, -ny));
        vtm.multiply(&Matrix::translate_2d(cols / 2.0, rows / 2.0));
        Ok(vtm)
    }
}

/// Parameters of a perspective view.
///
/// The view looks from the center of projection, `d` units behind `vrp`, along `vpn`.
/// The view window is `width` units wide at `vrp`; the front and back clipping planes
/// are `f` and `b` units beyond it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub struct View3D {
    /// View reference point: the center of the view window.
    pub vrp: Vector,
    /// View plane normal: the direction the camera looks.
    pub vpn: Vector,
    /// Approximate up direction; must not be parallel to `vpn`.
    pub vup: Vector,
    /// Distance from the center of projection to the view window.
    pub d: FreeCoordinate,
    /// Distance from the view window to the front clipping plane.
    pub f: FreeCoordinate,
    /// Distance from the view window to the back clipping plane.
    pub b: FreeCoordinate,
    /// Width of the view window in world units.
    pub width: FreeCoordinate,
    /// Size of the screen in pixels.
    pub size: ImageSize,
}

impl View3D {
    /// Constructs a view with a 2×2 view window, `d = 2`, `f = 0`, `b = 15`.
    pub fn new(vrp: Vector, vpn: Vector, vup: Vector, size: ImageSize) -> Self {
        Self {
            vrp,
            vpn,
            vup,
            d: 2.0,
            f: 0.0,
            b: 15.0,
            width: 2.0,
            size,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn with_distances(
        mut self,
        d: FreeCoordinate,
        f: FreeCoordinate,
        b: FreeCoordinate,
    ) -> Self {
        self.d = d;
        self.f = f;
        self.b = b;
        self
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn with_width(mut self, width: FreeCoordinate) -> Self {
        self.width = width;
        self
    }

    /// Unit view plane normal, and the unit right and up vectors of the view.
    fn basis(&self) -> Result<(Vector, Vector, Vector), ViewError> {
        finite_vector("vrp", self.vrp)?;
        finite_vector("vpn", self.vpn)?;
        finite_vector("vup", self.vup)?;
        let vpn = direction_of(self.vpn)
            .normalize()
            .ok_or(ViewError::ZeroNormal)?;
        let u = direction_of(self.vup)
            .cross(vpn)
            .normalize()
            .ok_or(ViewError::ParallelUp)?;
        let vup = vpn.cross(u);
        Ok((vpn, u, vup))
    }

    fn matrix(&self) -> Result<Matrix, ViewError> {
        let (cols, rows) = screen_dimensions(self.size)?;
        positive("d", self.d)?;
        positive("b", self.b)?;
        positive("width", self.width)?;
        if !(self.f > -self.d && self.f < self.b) {
            return Err(ViewError::ClipPlanes {
                d: self.d,
                f: self.f,
                b: self.b,
            });
        }
        let (vpn, u, vup) = self.basis()?;

        let d = self.d;
        let du = self.width;
        let dv = du * rows / cols;
        let back = d + self.b;
        let projected_d = d / back;

        let mut vtm = Matrix::translate(-self.vrp.x, -self.vrp.y, -self.vrp.z);
        vtm.multiply(&Matrix::rotate_xyz(u, vup, vpn));
        // move the center of projection to the origin
        vtm.multiply(&Matrix::translate(0.0, 0.0, d));
        // canonical view volume, back plane at z = 1
        vtm.multiply(&Matrix::scale(
            2.0 * d / (du * back),
            2.0 * d / (dv * back),
            1.0 / back,
        ));
        vtm.multiply(&Matrix::perspective(projected_d));
        vtm.multiply(&Matrix::scale_2d(
            -cols / (2.0 * projected_d),
            -rows / (2.0 * projected_d),
        ));
        vtm.multiply(&Matrix::translate_2d(cols / 2.0, rows / 2.0));
        vtm.multiply(&Matrix::scale(1.0, 1.0, -1.0));
        Ok(vtm)
    }
}

/// Either kind of view.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::large_enum_variant)]
#[non_exhaustive]
pub enum View {
    #[allow(missing_docs)]
    TwoD(View2D),
    #[allow(missing_docs)]
    ThreeD(View3D),
}

impl From<View2D> for View {
    fn from(view: View2D) -> Self {
        Self::TwoD(view)
    }
}

impl From<View3D> for View {
    fn from(view: View3D) -> Self {
        Self::ThreeD(view)
    }
}

/// Where the viewer is, in world space, for specular shading.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum Eye {
    /// The center of projection of a perspective view.
    Position(Vector),
    /// The viewer is infinitely far away in this direction.
    Direction(Vector),
}

impl Eye {
    /// Unit vector from `point` toward the viewer, or [`None`] if `point` is at the eye.
    pub fn direction_from(self, point: Vector) -> Option<Vector> {
        match self {
            Eye::Position(eye) => direction_of(eye - point).normalize(),
            Eye::Direction(direction) => Some(direction),
        }
    }
}

/// A validated view and its view transformation matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    view: View,
    matrix: Matrix,
    eye: Eye,
    near_depth: Option<FreeCoordinate>,
}

impl Camera {
    /// Validates the view parameters and composes the view transformation matrix.
    pub fn new(view: impl Into<View>) -> Result<Self, ViewError> {
        let view = view.into();
        let (matrix, eye, near_depth) = match &view {
            View::TwoD(v) => (
                v.matrix()?,
                Eye::Direction(Vector::direction(0.0, 0.0, 1.0)),
                None,
            ),
            View::ThreeD(v) => {
                let (vpn, _, _) = v.basis()?;
                let cop = direction_of(v.vrp) - vpn * v.d;
                (
                    v.matrix()?,
                    Eye::Position(Vector::point(cop.x, cop.y, cop.z)),
                    Some((v.d + v.f) / (v.d + v.b)),
                )
            }
        };
        if !matrix.is_finite() {
            return Err(ViewError::NonFinite { name: "matrix" });
        }
        log::debug!("camera matrix: {matrix:?}");
        Ok(Self {
            view,
            matrix,
            eye,
            near_depth,
        })
    }

    /// The parameters this camera was built from.
    pub fn view(&self) -> &View {
        &self.view
    }

    /// The view transformation matrix.
    pub fn view_matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Size of the screen in pixels.
    pub fn size(&self) -> ImageSize {
        match &self.view {
            View::TwoD(v) => v.size,
            View::ThreeD(v) => v.size,
        }
    }

    #[allow(missing_docs)]
    pub fn eye(&self) -> Eye {
        self.eye
    }

    /// Screen depth of the front clipping plane. Anything nearer is not drawn.
    pub fn near_depth(&self) -> Option<FreeCoordinate> {
        self.near_depth
    }
}

impl Default for Camera {
    /// A 2D view of the unit square around the origin, 500 pixels square.
    fn default() -> Self {
        let view = View2D::new(Vector::ORIGIN, 2.0, ImageSize::new(500, 500));
        Self {
            matrix: view.matrix().unwrap_or_default(),
            view: View::TwoD(view),
            eye: Eye::Direction(Vector::direction(0.0, 0.0, 1.0)),
            near_depth: None,
        }
    }
}

/// Converts a point in view-transformed coordinates to screen coordinates: X and Y in
/// pixels, Z as depth with nearer points smaller, and H as 1.
///
/// Returns [`None`] for points at or behind the center of projection, and for results
/// that are not finite.
pub fn to_screen(point: Vector) -> Option<Vector> {
    if !(point.h > 0.0) {
        return None;
    }
    let screen = Vector::point(point.x / point.h, point.y / point.h, -point.z);
    screen.is_finite().then_some(screen)
}

/// Error from [`Camera::new()`] when the view parameters do not describe a view.
#[derive(Clone, Debug, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum ViewError {
    /// screen size {width}×{height} has no pixels
    EmptyScreen {
        #[allow(missing_docs)]
        width: u32,
        #[allow(missing_docs)]
        height: u32,
    },
    /// view parameter {name} must be positive, not {value}
    NotPositive {
        #[allow(missing_docs)]
        name: &'static str,
        #[allow(missing_docs)]
        value: FreeCoordinate,
    },
    /// view parameter {name} is not finite
    NonFinite {
        #[allow(missing_docs)]
        name: &'static str,
    },
    /// front clipping distance {f} must lie between -{d} and the back distance {b}
    ClipPlanes {
        #[allow(missing_docs)]
        d: FreeCoordinate,
        #[allow(missing_docs)]
        f: FreeCoordinate,
        #[allow(missing_docs)]
        b: FreeCoordinate,
    },
    /// view orientation has zero length
    ZeroOrientation,
    /// view plane normal has zero length
    ZeroNormal,
    /// view-up vector is parallel to the view plane normal
    ParallelUp,
}

impl std::error::Error for ViewError {}

fn screen_dimensions(size: ImageSize) -> Result<(FreeCoordinate, FreeCoordinate), ViewError> {
    if size.is_empty() {
        return Err(ViewError::EmptyScreen {
            width: size.width,
            height: size.height,
        });
    }
    Ok((
        FreeCoordinate::from(size.width),
        FreeCoordinate::from(size.height),
    ))
}

fn positive(name: &'static str, value: FreeCoordinate) -> Result<(), ViewError> {
    if !value.is_finite() {
        Err(ViewError::NonFinite { name })
    } else if value > 0.0 {
        Ok(())
    } else {
        Err(ViewError::NotPositive { name, value })
    }
}

fn finite_vector(name: &'static str, v: Vector) -> Result<(), ViewError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ViewError::NonFinite { name })
    }
}

fn direction_of(v: Vector) -> Vector {
    Vector::direction(v.x, v.y, v.z)
}

impl fmt::Display for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.size();
        match &self.view {
            View::TwoD(_) => write!(f, "2D camera, {}×{}", size.width, size.height),
            View::ThreeD(_) => write!(f, "3D camera, {}×{}", size.width, size.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn screen(camera: &Camera, p: Vector) -> Vector {
        to_screen(*camera.view_matrix() * p).unwrap()
    }

    fn assert_near(actual: Vector, expected: Vector) {
        assert!(
            (actual - expected).magnitude() < 1e-9,
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn view_2d_maps_corners() {
        let camera = Camera::new(View2D::new(
            Vector::point(1.0, 1.0, 0.0),
            4.0,
            ImageSize::new(100, 50),
        ))
        .unwrap();
        assert_near(
            screen(&camera, Vector::point(1.0, 1.0, 0.0)),
            Vector::point(50.0, 25.0, 0.0),
        );
        // world +Y is screen up
        assert_near(
            screen(&camera, Vector::point(-1.0, 2.0, 0.0)),
            Vector::point(0.0, 0.0, 0.0),
        );
        // larger world Z is nearer
        assert_near(
            screen(&camera, Vector::point(1.0, 1.0, 3.0)),
            Vector::point(50.0, 25.0, -3.0),
        );
        assert_eq!(camera.near_depth(), None);
    }

    #[test]
    fn view_3d_maps_window_and_depth() {
        let view = View3D::new(
            Vector::ORIGIN,
            Vector::direction(0.0, 0.0, 1.0),
            Vector::direction(0.0, 1.0, 0.0),
            ImageSize::new(200, 100),
        )
        .with_distances(2.0, 0.0, 8.0)
        .with_width(4.0);
        let camera = Camera::new(view).unwrap();

        assert_near(
            screen(&camera, Vector::ORIGIN),
            Vector::point(100.0, 50.0, 0.2),
        );
        // the view window's top edge is the top row, and -X is screen right
        assert_near(
            screen(&camera, Vector::point(-2.0, 1.0, 0.0)),
            Vector::point(200.0, 0.0, 0.2),
        );
        // back clipping plane has depth 1
        assert_near(
            screen(&camera, Vector::point(0.0, 0.0, 8.0)),
            Vector::point(100.0, 50.0, 1.0),
        );
        assert_eq!(camera.near_depth(), Some(0.2));
        assert_eq!(
            camera.eye(),
            Eye::Position(Vector::point(0.0, 0.0, -2.0))
        );
    }

    #[test]
    fn behind_eye_is_not_projected() {
        let camera = Camera::new(View3D::new(
            Vector::ORIGIN,
            Vector::direction(0.0, 0.0, 1.0),
            Vector::direction(0.0, 1.0, 0.0),
            ImageSize::new(10, 10),
        ))
        .unwrap();
        assert_eq!(
            to_screen(*camera.view_matrix() * Vector::point(0.0, 0.0, -5.0)),
            None
        );
    }

    #[rstest]
    #[case::empty(
        View2D::new(Vector::ORIGIN, 2.0, ImageSize::new(0, 10)).into(),
        ViewError::EmptyScreen { width: 0, height: 10 },
    )]
    #[case::width(
        View2D::new(Vector::ORIGIN, -1.0, ImageSize::new(10, 10)).into(),
        ViewError::NotPositive { name: "width", value: -1.0 },
    )]
    #[case::orientation(
        View2D::new(Vector::ORIGIN, 1.0, ImageSize::new(10, 10)).with_orientation([0.0, 0.0]).into(),
        ViewError::ZeroOrientation,
    )]
    #[case::d(
        View3D::new(
            Vector::ORIGIN,
            Vector::direction(0.0, 0.0, 1.0),
            Vector::direction(0.0, 1.0, 0.0),
            ImageSize::new(10, 10),
        ).with_distances(0.0, 0.0, 1.0).into(),
        ViewError::NotPositive { name: "d", value: 0.0 },
    )]
    #[case::parallel(
        View3D::new(
            Vector::ORIGIN,
            Vector::direction(0.0, 0.0, 1.0),
            Vector::direction(0.0, 0.0, -3.0),
            ImageSize::new(10, 10),
        ).into(),
        ViewError::ParallelUp,
    )]
    #[case::zero_normal(
        View3D::new(
            Vector::ORIGIN,
            Vector::ZERO,
            Vector::direction(0.0, 1.0, 0.0),
            ImageSize::new(10, 10),
        ).into(),
        ViewError::ZeroNormal,
    )]
    #[case::clip(
        View3D::new(
            Vector::ORIGIN,
            Vector::direction(0.0, 0.0, 1.0),
            Vector::direction(0.0, 1.0, 0.0),
            ImageSize::new(10, 10),
        ).with_distances(1.0, 5.0, 2.0).into(),
        ViewError::ClipPlanes { d: 1.0, f: 5.0, b: 2.0 },
    )]
    fn invalid_views(#[case] view: View, #[case] expected: ViewError) {
        assert_eq!(Camera::new(view), Err(expected));
    }

    #[test]
    fn error_message() {
        assert_eq!(
            ViewError::NotPositive {
                name: "d",
                value: -1.0
            }
            .to_string(),
            "view parameter d must be positive, not -1"
        );
    }

    #[test]
    fn default_camera_is_valid() {
        let camera = Camera::default();
        assert_eq!(
            Camera::new(View2D::new(Vector::ORIGIN, 2.0, ImageSize::new(500, 500))).unwrap(),
            camera
        );
        assert_eq!(camera.to_string(), "2D camera, 500×500");
    }

    #[cfg(feature = "save")]
    #[test]
    fn view_serde_round_trip() {
        let view = View::from(View2D::new(
            Vector::point(1.0, 2.0, 0.0),
            3.0,
            ImageSize::new(4, 5),
        ));
        let json = serde_json::to_string(&view).unwrap();
        let back: View = serde_json::from_str(&json).unwrap();
        assert_eq!(back, view);
    }
}
