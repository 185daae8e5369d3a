//! Generators for common shapes, and the cache that keeps expensive meshes around.

use std::f64::consts::PI;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::math::{FreeCoordinate, Rgba8, Vector};
use crate::{Anchor, Normals, Polygon, ShapeError};

/// A triangle mesh as a list of vertex triples.
pub type Triangles = Arc<[[Vector; 3]]>;

/// Identifies a generated mesh by the parameters it was generated from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum MeshKey {
    /// Unit sphere from a subdivided icosahedron.
    #[allow(missing_docs)]
    Sphere { recursion: u8 },
}

/// Cache of generated triangle meshes, keyed by generation parameters.
///
/// Owned by whatever code builds scenes, and passed to the generators that use it.
#[derive(Clone, Debug, Default)]
pub struct MeshCache {
    meshes: HashMap<MeshKey, Triangles>,
}

impl MeshCache {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the triangles of a unit sphere made by subdividing an icosahedron
    /// `recursion` times, generating them if they are not cached.
    ///
    /// Each level of recursion multiplies the triangle count by four.
    pub fn sphere(&mut self, recursion: u8) -> Triangles {
        self.meshes
            .entry(MeshKey::Sphere { recursion })
            .or_insert_with(|| {
                log::debug!("generating sphere mesh with recursion {recursion}");
                generate_sphere(recursion).into()
            })
            .clone()
    }

    /// Number of cached meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Discards all cached meshes.
    pub fn clear(&mut self) {
        self.meshes.clear();
    }
}

// -------------------------------------------------------------------------------------------------

/// A rectangle in the XY plane spanning `center ± (width, height)`, facing +Z, with
/// anchors covering the whole texture.
pub fn rectangle(
    width: FreeCoordinate,
    height: FreeCoordinate,
    center: [FreeCoordinate; 2],
    color: Rgba8,
) -> Result<Polygon, ShapeError> {
    let [x0, y0] = center;
    Polygon::new(
        vec![
            Vector::point(x0 - width, y0 - height, 0.0),
            Vector::point(x0 + width, y0 - height, 0.0),
            Vector::point(x0 + width, y0 + height, 0.0),
            Vector::point(x0 - width, y0 + height, 0.0),
        ],
        color,
    )?
    .with_normals(Normals::Face(Vector::direction(0.0, 0.0, 1.0)))?
    .with_anchors(vec![[0.0, 255.0], [255.0, 255.0], [255.0, 0.0], [0.0, 0.0]])
}

/// The six faces of a box spanning `center ± half_extents`, in the order back, front,
/// left, right, top, bottom, each with its own color from `colors`.
pub fn box_faces(
    half_extents: [FreeCoordinate; 3],
    center: [FreeCoordinate; 3],
    colors: [Rgba8; 6],
) -> Result<Vec<Polygon>, ShapeError> {
    let [w, h, d] = half_extents;
    let [x0, y0, z0] = center;
    let p = |x: FreeCoordinate, y: FreeCoordinate, z: FreeCoordinate| {
        Vector::point(x0 + x, y0 + y, z0 + z)
    };
    let ends: Vec<Anchor> = vec![[0.0, 255.0], [0.0, 0.0], [255.0, 0.0], [255.0, 255.0]];
    let sides: Vec<Anchor> = vec![[0.0, 0.0], [255.0, 0.0], [255.0, 255.0], [0.0, 255.0]];
    let caps: Vec<Anchor> = vec![[0.0, 0.0], [0.0, 255.0], [255.0, 255.0], [255.0, 0.0]];

    let faces = [
        (
            [p(-w, -h, -d), p(-w, h, -d), p(w, h, -d), p(w, -h, -d)],
            Vector::direction(0.0, 0.0, -1.0),
            &ends,
        ),
        (
            [p(-w, -h, d), p(-w, h, d), p(w, h, d), p(w, -h, d)],
            Vector::direction(0.0, 0.0, 1.0),
            &ends,
        ),
        (
            [p(-w, -h, d), p(-w, -h, -d), p(-w, h, -d), p(-w, h, d)],
            Vector::direction(-1.0, 0.0, 0.0),
            &sides,
        ),
        (
            [p(w, -h, d), p(w, -h, -d), p(w, h, -d), p(w, h, d)],
            Vector::direction(1.0, 0.0, 0.0),
            &sides,
        ),
        (
            [p(-w, h, d), p(-w, h, -d), p(w, h, -d), p(w, h, d)],
            Vector::direction(0.0, 1.0, 0.0),
            &caps,
        ),
        (
            [p(-w, -h, d), p(-w, -h, -d), p(w, -h, -d), p(w, -h, d)],
            Vector::direction(0.0, -1.0, 0.0),
            &caps,
        ),
    ];

    faces
        .into_iter()
        .zip(colors)
        .map(|((vertices, normal, anchors), color)| {
            Polygon::new(vertices.to_vec(), color)?
                .with_normals(Normals::Face(normal))?
                .with_anchors(anchors.clone())
        })
        .collect()
}

/// A cylinder of unit height standing on the XZ plane, with `sides` slices. `width`
/// is the radius along X and `height` the radius along Z.
///
/// Each slice contributes a top triangle, a bottom triangle, and a side quad, in that
/// order.
pub fn cylinder_faces(
    width: FreeCoordinate,
    height: FreeCoordinate,
    sides: usize,
    color: Rgba8,
) -> Result<Vec<Polygon>, ShapeError> {
    if sides < 3 {
        return Err(ShapeError::TooFewVertices {
            shape: "cylinder",
            minimum: 3,
            actual: sides,
        });
    }
    let step = 255.0 / sides as FreeCoordinate;
    let mut faces = Vec::with_capacity(sides * 3);
    for i in 0..sides {
        let a1 = i as FreeCoordinate * 2.0 * PI / sides as FreeCoordinate;
        let a2 = ((i + 1) % sides) as FreeCoordinate * 2.0 * PI / sides as FreeCoordinate;
        let (x1, z1) = (a1.cos() * width, a1.sin() * height);
        let (x2, z2) = (a2.cos() * width, a2.sin() * height);
        // the caps map onto a disc in the middle of the texture
        let disc = |a: FreeCoordinate| [a.cos() * 120.0 + 120.0, a.sin() * 120.0 + 120.0];
        let cap_anchors = vec![disc(a1), disc(a2), [120.0, 120.0]];

        for y in [1.0, 0.0] {
            faces.push(
                Polygon::new(
                    vec![
                        Vector::point(x1, y, z1),
                        Vector::point(x2, y, z2),
                        Vector::point(0.0, y, 0.0),
                    ],
                    color,
                )?
                .with_normals(Normals::Face(Vector::direction(0.0, y * 2.0 - 1.0, 0.0)))?
                .with_anchors(cap_anchors.clone())?,
            );
        }

        let out1 = Vector::direction(x1, 0.0, z1)
            .normalize()
            .unwrap_or(Vector::ZERO);
        let out2 = Vector::direction(x2, 0.0, z2)
            .normalize()
            .unwrap_or(Vector::ZERO);
        let (u1, u2) = (i as FreeCoordinate * step, (i + 1) as FreeCoordinate * step);
        faces.push(
            Polygon::new(
                vec![
                    Vector::point(x1, 0.0, z1),
                    Vector::point(x2, 0.0, z2),
                    Vector::point(x2, 1.0, z2),
                    Vector::point(x1, 1.0, z1),
                ],
                color,
            )?
            .with_normals(Normals::Vertex(vec![out1, out2, out2, out1]))?
            .with_anchors(vec![[u1, 255.0], [u2, 255.0], [u2, 0.0], [u1, 0.0]])?,
        );
    }
    Ok(faces)
}

/// Polygons of a unit sphere. Normals equal positions, and anchors follow longitude and
/// latitude.
pub fn sphere_faces(
    cache: &mut MeshCache,
    recursion: u8,
    color: Rgba8,
) -> Result<Vec<Polygon>, ShapeError> {
    cache
        .sphere(recursion)
        .iter()
        .map(|triangle| {
            let normals = triangle
                .iter()
                .map(|v| Vector::direction(v.x, v.y, v.z))
                .collect();
            let anchors = triangle.iter().map(|&v| sphere_anchor(v)).collect();
            Polygon::new(triangle.to_vec(), color)?
                .with_normals(Normals::Vertex(normals))?
                .with_anchors(anchors)
        })
        .collect()
}

fn sphere_anchor(v: Vector) -> Anchor {
    let u = 0.5 + v.z.atan2(v.x) / (2.0 * PI);
    let w = 0.5 - v.y.clamp(-1.0, 1.0).asin() / PI;
    [255.0 * u, 255.0 * w]
}

/// Golden ratio.
const G: FreeCoordinate = 1.618_033_988_749_895;

fn generate_sphere(recursion: u8) -> Vec<[Vector; 3]> {
    let v = [
        [-1.0, G, 0.0],
        [1.0, G, 0.0],
        [-1.0, -G, 0.0],
        [1.0, -G, 0.0],
        [0.0, -1.0, G],
        [0.0, 1.0, G],
        [0.0, -1.0, -G],
        [0.0, 1.0, -G],
        [G, 0.0, -1.0],
        [G, 0.0, 1.0],
        [-G, 0.0, -1.0],
        [-G, 0.0, 1.0],
    ]
    .map(|[x, y, z]| on_sphere(Vector::point(x, y, z)));

    const FACES: [[usize; 3]; 20] = [
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];
    let mut triangles: Vec<[Vector; 3]> = FACES.iter().map(|f| f.map(|i| v[i])).collect();

    for _ in 0..recursion {
        triangles = triangles
            .iter()
            .flat_map(|&[p0, p1, p2]| {
                let a = on_sphere(p0.lerp(p1, 0.5));
                let b = on_sphere(p1.lerp(p2, 0.5));
                let c = on_sphere(p0.lerp(p2, 0.5));
                [[p0, a, c], [p1, b, a], [p2, c, b], [a, b, c]]
            })
            .collect();
    }
    triangles
}

/// Projects a point radially onto the unit sphere.
fn on_sphere(p: Vector) -> Vector {
    let n = p.magnitude();
    Vector::point(p.x / n, p.y / n, p.z / n)
}
