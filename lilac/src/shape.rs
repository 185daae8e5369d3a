//! Drawable shapes. This module is private but reexported by its parent.

use std::fmt;

use crate::math::{FreeCoordinate, Matrix, Rgba8, Vector};

/// Texture-space sample position attached to a polygon vertex.
///
/// Both components are on the 0–255 scale regardless of the size of the texture that is
/// eventually bound; the rasterizer rescales them.
pub type Anchor = [FreeCoordinate; 2];

/// Error when a [`Shape`] cannot be constructed from the given data.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ShapeError {
    /// A shape with a fixed number of coordinates got a different number.
    #[error("{shape} requires exactly {expected} coordinates, but {actual} were given")]
    #[allow(missing_docs)]
    WrongVertexCount {
        shape: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A polygon or batch got too few coordinates to enclose an area.
    #[error("{shape} requires at least {minimum} coordinates, but {actual} were given")]
    #[allow(missing_docs)]
    TooFewVertices {
        shape: &'static str,
        minimum: usize,
        actual: usize,
    },

    /// The color array does not match the coordinate array.
    #[error("{shape} has {coordinates} coordinates but {colors} colors")]
    #[allow(missing_docs)]
    ColorCountMismatch {
        shape: &'static str,
        coordinates: usize,
        colors: usize,
    },

    /// A polyline's start and end arrays differ in length.
    #[error("polyline has {starts} start points but {ends} end points")]
    #[allow(missing_docs)]
    EndpointCountMismatch { starts: usize, ends: usize },

    /// A per-vertex polygon attribute does not have one entry per vertex.
    #[error("polygon has {vertices} vertices but {actual} {attribute}")]
    #[allow(missing_docs)]
    AttributeCountMismatch {
        attribute: &'static str,
        vertices: usize,
        actual: usize,
    },

    /// A coordinate contains NaN or infinity.
    #[error("{shape} coordinate {index} is not finite: {value:?}")]
    #[allow(missing_docs)]
    NonFinite {
        shape: &'static str,
        index: usize,
        value: Vector,
    },
}

fn check_finite(shape: &'static str, coordinates: &[Vector]) -> Result<(), ShapeError> {
    match coordinates.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ShapeError::NonFinite {
            shape,
            index,
            value: coordinates[index],
        }),
        None => Ok(()),
    }
}

// -------------------------------------------------------------------------------------------------

/// A filled circle of `radius` pixels around a projected position.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    position: Vector,
    radius: i32,
    color: Rgba8,
}

impl Point {
    /// A `radius` of zero or less is permitted, and draws nothing.
    pub fn new(position: Vector, radius: i32, color: Rgba8) -> Result<Self, ShapeError> {
        check_finite("point", &[position])?;
        Ok(Self {
            position,
            radius,
            color,
        })
    }

    #[allow(missing_docs)]
    pub fn position(&self) -> Vector {
        self.position
    }
    #[allow(missing_docs)]
    pub fn radius(&self) -> i32 {
        self.radius
    }
    #[allow(missing_docs)]
    pub fn color(&self) -> Rgba8 {
        self.color
    }
}

/// Many points sharing one radius, each with its own color.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    positions: Vec<Vector>,
    colors: Vec<Rgba8>,
    radius: i32,
}

impl PointCloud {
    /// `positions` and `colors` must have the same length.
    pub fn new(
        positions: Vec<Vector>,
        colors: Vec<Rgba8>,
        radius: i32,
    ) -> Result<Self, ShapeError> {
        if positions.len() != colors.len() {
            return Err(ShapeError::ColorCountMismatch {
                shape: "point cloud",
                coordinates: positions.len(),
                colors: colors.len(),
            });
        }
        check_finite("point cloud", &positions)?;
        Ok(Self {
            positions,
            colors,
            radius,
        })
    }

    #[allow(missing_docs)]
    pub fn positions(&self) -> &[Vector] {
        &self.positions
    }
    #[allow(missing_docs)]
    pub fn colors(&self) -> &[Rgba8] {
        &self.colors
    }
    #[allow(missing_docs)]
    pub fn radius(&self) -> i32 {
        self.radius
    }
}

/// A single line segment.
#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    endpoints: [Vector; 2],
    color: Rgba8,
}

impl Line {
    #[allow(missing_docs)]
    pub fn new(start: Vector, end: Vector, color: Rgba8) -> Result<Self, ShapeError> {
        check_finite("line", &[start, end])?;
        Ok(Self {
            endpoints: [start, end],
            color,
        })
    }

    /// Constructs a line from a coordinate list, which must have exactly two entries.
    pub fn from_coordinates(coordinates: &[Vector], color: Rgba8) -> Result<Self, ShapeError> {
        match *coordinates {
            [start, end] => Self::new(start, end, color),
            _ => Err(ShapeError::WrongVertexCount {
                shape: "line",
                expected: 2,
                actual: coordinates.len(),
            }),
        }
    }

    #[allow(missing_docs)]
    pub fn endpoints(&self) -> [Vector; 2] {
        self.endpoints
    }
    #[allow(missing_docs)]
    pub fn color(&self) -> Rgba8 {
        self.color
    }
}

/// Independent line segments, each with its own color.
#[derive(Clone, Debug, PartialEq)]
pub struct PolyLine {
    starts: Vec<Vector>,
    ends: Vec<Vector>,
    colors: Vec<Rgba8>,
}

impl PolyLine {
    /// All three arrays must have the same length.
    pub fn new(
        starts: Vec<Vector>,
        ends: Vec<Vector>,
        colors: Vec<Rgba8>,
    ) -> Result<Self, ShapeError> {
        if starts.len() != ends.len() {
            return Err(ShapeError::EndpointCountMismatch {
                starts: starts.len(),
                ends: ends.len(),
            });
        }
        if starts.len() != colors.len() {
            return Err(ShapeError::ColorCountMismatch {
                shape: "polyline",
                coordinates: starts.len(),
                colors: colors.len(),
            });
        }
        check_finite("polyline", &starts)?;
        check_finite("polyline", &ends)?;
        Ok(Self {
            starts,
            ends,
            colors,
        })
    }

    /// Returns each segment's start, end, and color.
    pub fn segments(&self) -> impl Iterator<Item = (Vector, Vector, Rgba8)> + '_ {
        self.starts
            .iter()
            .zip(&self.ends)
            .zip(&self.colors)
            .map(|((&s, &e), &c)| (s, e, c))
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.starts.len()
    }
    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Surface normals of a [`Polygon`].
#[derive(Clone, Debug, PartialEq)]
pub enum Normals {
    /// One normal for the whole face; shading is flat.
    Face(Vector),
    /// One normal per vertex; shading is interpolated.
    Vertex(Vec<Vector>),
}

impl Normals {
    /// Returns the normal to use at vertex `index`.
    pub fn at(&self, index: usize) -> Vector {
        match self {
            Normals::Face(n) => *n,
            Normals::Vertex(ns) => ns.get(index).copied().unwrap_or(Vector::ZERO),
        }
    }
}

/// A simple (possibly non-convex) filled polygon ring.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vector>,
    normals: Normals,
    color: Rgba8,
    vertex_colors: Vec<Rgba8>,
    anchors: Vec<Anchor>,
}

impl Polygon {
    /// Constructs a polygon with a face normal computed from its vertices.
    ///
    /// At least three vertices are required.
    pub fn new(vertices: Vec<Vector>, color: Rgba8) -> Result<Self, ShapeError> {
        if vertices.len() < 3 {
            return Err(ShapeError::TooFewVertices {
                shape: "polygon",
                minimum: 3,
                actual: vertices.len(),
            });
        }
        check_finite("polygon", &vertices)?;
        let normals = Normals::Face(newell_normal(&vertices));
        Ok(Self {
            vertices,
            normals,
            color,
            vertex_colors: Vec::new(),
            anchors: Vec::new(),
        })
    }

    /// Replaces the normals. Per-vertex normals must have one entry per vertex.
    pub fn with_normals(mut self, normals: Normals) -> Result<Self, ShapeError> {
        if let Normals::Vertex(ns) = &normals {
            self.check_count("normals", ns.len())?;
            check_finite("polygon normal", ns)?;
        }
        self.normals = normals;
        Ok(self)
    }

    /// Sets colors sampled ahead of time from a texture, which override the base color.
    /// There must be either one color for the whole face or one per vertex.
    pub fn with_vertex_colors(mut self, colors: Vec<Rgba8>) -> Result<Self, ShapeError> {
        if colors.len() != 1 {
            self.check_count("vertex colors", colors.len())?;
        }
        self.vertex_colors = colors;
        Ok(self)
    }

    /// Sets texture anchors, one per vertex.
    pub fn with_anchors(mut self, anchors: Vec<Anchor>) -> Result<Self, ShapeError> {
        self.check_count("anchors", anchors.len())?;
        self.anchors = anchors;
        Ok(self)
    }

    fn check_count(&self, attribute: &'static str, actual: usize) -> Result<(), ShapeError> {
        if actual == self.vertices.len() {
            Ok(())
        } else {
            Err(ShapeError::AttributeCountMismatch {
                attribute,
                vertices: self.vertices.len(),
                actual,
            })
        }
    }

    #[allow(missing_docs)]
    pub fn vertices(&self) -> &[Vector] {
        &self.vertices
    }
    #[allow(missing_docs)]
    pub fn normals(&self) -> &Normals {
        &self.normals
    }
    #[allow(missing_docs)]
    pub fn color(&self) -> Rgba8 {
        self.color
    }
    /// Pre-sampled texture colors; empty if there are none.
    pub fn vertex_colors(&self) -> &[Rgba8] {
        &self.vertex_colors
    }
    /// Texture anchors; empty if there are none.
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Returns the color a vertex should have before lighting, honoring pre-sampled
    /// texture colors.
    pub fn vertex_color(&self, index: usize) -> Rgba8 {
        match self.vertex_colors.as_slice() {
            [] => self.color,
            [single] => *single,
            colors => colors.get(index).copied().unwrap_or(self.color),
        }
    }

    /// Computes the geometric face normal from the vertices, regardless of the stored
    /// normals. The result is the zero vector if the polygon is degenerate.
    pub fn face_normal(&self) -> Vector {
        newell_normal(&self.vertices)
    }

    fn transformed(&self, matrix: &Matrix) -> Self {
        Self {
            vertices: self.vertices.iter().map(|&v| *matrix * v).collect(),
            normals: match &self.normals {
                Normals::Face(n) => Normals::Face(*matrix * *n),
                Normals::Vertex(ns) => Normals::Vertex(ns.iter().map(|&n| *matrix * n).collect()),
            },
            color: self.color,
            vertex_colors: self.vertex_colors.clone(),
            anchors: self.anchors.clone(),
        }
    }

    pub(crate) fn set_normals_unchecked(&mut self, normals: Normals) {
        self.normals = normals;
    }
}

/// Newell's method: robust for non-planar and non-convex rings.
fn newell_normal(vertices: &[Vector]) -> Vector {
    let mut normal = Vector::ZERO;
    for (i, a) in vertices.iter().enumerate() {
        let b = vertices[(i + 1) % vertices.len()];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal.normalize().unwrap_or(Vector::ZERO)
}

/// Several polygons drawn as one shape, sharing a single trip through the transform
/// pipeline. Produces exactly the same pixels as drawing the polygons one at a time.
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonBatch {
    polygons: Vec<Polygon>,
}

impl PolygonBatch {
    /// At least one polygon is required.
    pub fn new(polygons: Vec<Polygon>) -> Result<Self, ShapeError> {
        if polygons.is_empty() {
            return Err(ShapeError::TooFewVertices {
                shape: "polygon batch",
                minimum: 1,
                actual: 0,
            });
        }
        Ok(Self { polygons })
    }

    #[allow(missing_docs)]
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub(crate) fn polygons_mut(&mut self) -> &mut [Polygon] {
        &mut self.polygons
    }
}

// -------------------------------------------------------------------------------------------------

/// A drawable element of a [`Module`](crate::Module).
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum Shape {
    Point(Point),
    PointCloud(PointCloud),
    Line(Line),
    PolyLine(PolyLine),
    Polygon(Polygon),
    PolygonBatch(PolygonBatch),
}

impl Shape {
    /// Returns a copy of this shape with every coordinate and normal transformed by
    /// `matrix`. The original is not modified.
    #[must_use]
    pub fn transformed(&self, matrix: &Matrix) -> Self {
        let m = matrix;
        match self {
            Shape::Point(p) => Shape::Point(Point {
                position: *m * p.position,
                ..p.clone()
            }),
            Shape::PointCloud(c) => Shape::PointCloud(PointCloud {
                positions: c.positions.iter().map(|&v| *m * v).collect(),
                colors: c.colors.clone(),
                radius: c.radius,
            }),
            Shape::Line(l) => Shape::Line(Line {
                endpoints: l.endpoints.map(|v| *m * v),
                color: l.color,
            }),
            Shape::PolyLine(pl) => Shape::PolyLine(PolyLine {
                starts: pl.starts.iter().map(|&v| *m * v).collect(),
                ends: pl.ends.iter().map(|&v| *m * v).collect(),
                colors: pl.colors.clone(),
            }),
            Shape::Polygon(p) => Shape::Polygon(p.transformed(m)),
            Shape::PolygonBatch(b) => Shape::PolygonBatch(PolygonBatch {
                polygons: b.polygons.iter().map(|p| p.transformed(m)).collect(),
            }),
        }
    }

    /// Calls `f` on every position (not normal) in this shape.
    pub fn for_each_position_mut(&mut self, mut f: impl FnMut(&mut Vector)) {
        match self {
            Shape::Point(p) => f(&mut p.position),
            Shape::PointCloud(c) => c.positions.iter_mut().for_each(f),
            Shape::Line(l) => l.endpoints.iter_mut().for_each(f),
            Shape::PolyLine(pl) => pl.starts.iter_mut().chain(&mut pl.ends).for_each(f),
            Shape::Polygon(p) => p.vertices.iter_mut().for_each(f),
            Shape::PolygonBatch(b) => b
                .polygons
                .iter_mut()
                .flat_map(|p| p.vertices.iter_mut())
                .for_each(f),
        }
    }

    /// Calls `f` on every position (not normal) in this shape.
    pub fn for_each_position(&self, mut f: impl FnMut(Vector)) {
        match self {
            Shape::Point(p) => f(p.position),
            Shape::PointCloud(c) => c.positions.iter().copied().for_each(f),
            Shape::Line(l) => l.endpoints.into_iter().for_each(f),
            Shape::PolyLine(pl) => pl.starts.iter().chain(&pl.ends).copied().for_each(f),
            Shape::Polygon(p) => p.vertices.iter().copied().for_each(f),
            Shape::PolygonBatch(b) => b
                .polygons
                .iter()
                .flat_map(|p| p.vertices.iter().copied())
                .for_each(f),
        }
    }

    /// Returns the mean of all finite positions in this shape, or [`None`] if it has none.
    pub fn centroid(&self) -> Option<Vector> {
        let mut sum = Vector::ZERO;
        let mut count = 0usize;
        self.for_each_position(|v| {
            if let Some(v) = v.homogenize() {
                sum = sum + v;
                count += 1;
            }
        });
        (count > 0).then(|| sum * (1.0 / count as FreeCoordinate))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Point(p) => write!(f, "Point(radius {})", p.radius),
            Shape::PointCloud(c) => write!(f, "PointCloud({} points)", c.positions.len()),
            Shape::Line(_) => write!(f, "Line"),
            Shape::PolyLine(pl) => write!(f, "PolyLine({} segments)", pl.len()),
            Shape::Polygon(p) => write!(f, "Polygon({} vertices)", p.vertices.len()),
            Shape::PolygonBatch(b) => write!(f, "PolygonBatch({} polygons)", b.polygons.len()),
        }
    }
}

impl From<Point> for Shape {
    fn from(value: Point) -> Self {
        Shape::Point(value)
    }
}
impl From<PointCloud> for Shape {
    fn from(value: PointCloud) -> Self {
        Shape::PointCloud(value)
    }
}
impl From<Line> for Shape {
    fn from(value: Line) -> Self {
        Shape::Line(value)
    }
}
impl From<PolyLine> for Shape {
    fn from(value: PolyLine) -> Self {
        Shape::PolyLine(value)
    }
}
impl From<Polygon> for Shape {
    fn from(value: Polygon) -> Self {
        Shape::Polygon(value)
    }
}
impl From<PolygonBatch> for Shape {
    fn from(value: PolygonBatch) -> Self {
        Shape::PolygonBatch(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn square() -> Vec<Vector> {
        vec![
            Vector::point(0.0, 0.0, 0.0),
            Vector::point(1.0, 0.0, 0.0),
            Vector::point(1.0, 1.0, 0.0),
            Vector::point(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn line_requires_two_coordinates() {
        let p = Vector::ORIGIN;
        assert_eq!(
            Line::from_coordinates(&[p, p, p], Rgba8::WHITE),
            Err(ShapeError::WrongVertexCount {
                shape: "line",
                expected: 2,
                actual: 3
            })
        );
        assert!(Line::from_coordinates(&[p, p], Rgba8::WHITE).is_ok());
    }

    #[test]
    fn point_cloud_color_mismatch() {
        let err = PointCloud::new(vec![Vector::ORIGIN; 3], vec![Rgba8::BLACK; 2], 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "point cloud has 3 coordinates but 2 colors"
        );
    }

    #[test]
    fn polyline_mismatches() {
        let p = Vector::ORIGIN;
        assert_eq!(
            PolyLine::new(vec![p; 2], vec![p; 1], vec![Rgba8::BLACK; 2]),
            Err(ShapeError::EndpointCountMismatch { starts: 2, ends: 1 })
        );
        assert!(matches!(
            PolyLine::new(vec![p; 2], vec![p; 2], vec![Rgba8::BLACK; 3]),
            Err(ShapeError::ColorCountMismatch { .. })
        ));
    }

    #[test]
    fn non_finite_rejected() {
        let err = Point::new(Vector::point(f64::NAN, 0.0, 0.0), 1, Rgba8::WHITE).unwrap_err();
        assert!(matches!(err, ShapeError::NonFinite { index: 0, .. }));
    }

    #[test]
    fn polygon_needs_three_vertices() {
        assert!(matches!(
            Polygon::new(square()[..2].to_vec(), Rgba8::WHITE),
            Err(ShapeError::TooFewVertices { actual: 2, .. })
        ));
    }

    #[test]
    fn polygon_face_normal_counterclockwise() {
        let p = Polygon::new(square(), Rgba8::WHITE).unwrap();
        assert_eq!(p.normals(), &Normals::Face(Vector::direction(0.0, 0.0, 1.0)));
    }

    #[test]
    fn polygon_attribute_counts() {
        let p = Polygon::new(square(), Rgba8::WHITE).unwrap();
        assert!(matches!(
            p.clone().with_anchors(vec![[0.0, 0.0]; 3]),
            Err(ShapeError::AttributeCountMismatch {
                attribute: "anchors",
                vertices: 4,
                actual: 3
            })
        ));
        assert!(p.clone().with_vertex_colors(vec![Rgba8::BLACK]).is_ok());
        assert!(p.with_vertex_colors(vec![Rgba8::BLACK; 2]).is_err());
    }

    #[test]
    fn vertex_color_override() {
        let red = Rgba8::new(255, 0, 0, 255);
        let p = Polygon::new(square(), Rgba8::WHITE).unwrap();
        assert_eq!(p.vertex_color(2), Rgba8::WHITE);
        let p = p.with_vertex_colors(vec![red]).unwrap();
        assert_eq!(p.vertex_color(2), red);
    }

    #[test]
    fn transformed_copies() {
        let shape = Shape::from(Polygon::new(square(), Rgba8::WHITE).unwrap());
        let moved = shape.transformed(&Matrix::translate(0.0, 0.0, 5.0));
        let Shape::Polygon(moved) = &moved else {
            panic!("{moved:?}")
        };
        assert_eq!(moved.vertices()[2], Vector::point(1.0, 1.0, 5.0));
        // normals are directions and are unaffected by translation
        assert_eq!(moved.normals(), &Normals::Face(Vector::direction(0.0, 0.0, 1.0)));
        let Shape::Polygon(original) = &shape else {
            unreachable!()
        };
        assert_eq!(original.vertices()[2], Vector::point(1.0, 1.0, 0.0));
    }

    #[test]
    fn centroid() {
        let shape = Shape::from(Polygon::new(square(), Rgba8::WHITE).unwrap());
        assert_eq!(shape.centroid(), Some(Vector::point(0.5, 0.5, 0.0)));
    }

    #[test]
    fn display() {
        let shape = Shape::from(Polygon::new(square(), Rgba8::WHITE).unwrap());
        assert_eq!(shape.to_string(), "Polygon(4 vertices)");
    }
}
