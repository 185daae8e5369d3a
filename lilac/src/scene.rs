//! The scene arena and its construction API.
//! This module is private but reexported by its parent.

use crate::factory::{self, MeshCache};
use crate::math::{FreeCoordinate, Matrix, Rgba8, Vector};
use crate::{
    DrawStateChange, Element, ElementKind, Lighting, Line, Module, Point, PointCloud, PolyLine,
    Polygon, Shape, ShapeError, Transform,
};

/// Names a [`Module`] within the [`Scene`] that created it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ModuleId(usize);

impl ModuleId {
    /// Index of the module within its scene's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Names one [`Element`] of a module, as returned by the construction methods.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ElementRef {
    /// Module containing the element.
    pub module: ModuleId,
    /// Position of the element in the module's sequence.
    pub index: usize,
}

/// Error when a [`Scene`] cannot perform a requested edit.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum SceneError {
    /// A module was asked to contain itself.
    #[error("module {0:?} cannot be added to itself")]
    SelfReference(ModuleId),

    /// Adding the child would make a module contain itself through other modules.
    #[error("adding module {child:?} to {parent:?} would create a cycle")]
    #[allow(missing_docs)]
    Cycle { parent: ModuleId, child: ModuleId },

    /// The module does not belong to this scene.
    #[error("no module {0:?} in this scene")]
    UnknownModule(ModuleId),

    /// The element does not exist.
    #[error("no element {0:?} in this scene")]
    UnknownElement(ElementRef),

    /// A draw-state coefficient is outside 0–1.
    #[error("draw state {name} must be between 0 and 1, not {value}")]
    #[allow(missing_docs)]
    InvalidCoefficient { name: &'static str, value: f64 },

    /// A shape could not be constructed.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// A scene graph: an arena of [`Module`]s with a designated root, plus the lights that
/// shade it.
///
/// All edits go through the scene so that it can keep the module graph acyclic.
#[derive(Clone, Debug)]
pub struct Scene {
    modules: Vec<Module>,
    root: ModuleId,
    lighting: Lighting,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Creates a scene containing only an empty root module and no lights.
    pub fn new() -> Self {
        Self {
            modules: vec![Module::new()],
            root: ModuleId(0),
            lighting: Lighting::new(),
        }
    }

    /// The module at which traversal starts.
    pub fn root(&self) -> ModuleId {
        self.root
    }

    #[allow(missing_docs)]
    pub fn module(&self, id: ModuleId) -> Result<&Module, SceneError> {
        self.modules.get(id.0).ok_or(SceneError::UnknownModule(id))
    }

    #[allow(missing_docs)]
    pub fn module_mut(&mut self, id: ModuleId) -> Result<&mut Module, SceneError> {
        self.modules.get_mut(id.0).ok_or(SceneError::UnknownModule(id))
    }

    #[allow(missing_docs)]
    pub fn element(&self, r: ElementRef) -> Result<&Element, SceneError> {
        self.module(r.module)?
            .elements()
            .get(r.index)
            .ok_or(SceneError::UnknownElement(r))
    }

    /// Mutable access to an element; use the element's accessors to edit it, which marks
    /// it dirty.
    pub fn element_mut(&mut self, r: ElementRef) -> Result<&mut Element, SceneError> {
        self.module_mut(r.module)?
            .element_mut(r.index)
            .ok_or(SceneError::UnknownElement(r))
    }

    #[allow(missing_docs)]
    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    #[allow(missing_docs)]
    pub fn lighting_mut(&mut self) -> &mut Lighting {
        &mut self.lighting
    }

    /// Number of modules in the arena, including unreachable ones.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    // --- Structure ---

    /// Creates an empty module that is not yet part of the graph.
    /// Use [`Scene::add_module()`] to place it.
    pub fn new_module(&mut self) -> ModuleId {
        self.modules.push(Module::new());
        ModuleId(self.modules.len() - 1)
    }

    /// Creates an empty module and appends it to `parent`.
    pub fn create_module(&mut self, parent: ModuleId) -> Result<ModuleId, SceneError> {
        self.module(parent)?;
        let child = self.new_module();
        self.add_module(parent, child)?;
        Ok(child)
    }

    /// Appends `child` to `parent`'s sequence. A module may appear in several parents,
    /// but never within itself.
    pub fn add_module(
        &mut self,
        parent: ModuleId,
        child: ModuleId,
    ) -> Result<ElementRef, SceneError> {
        self.module(parent)?;
        self.module(child)?;
        if parent == child {
            return Err(SceneError::SelfReference(parent));
        }
        if self.reaches(child, parent) {
            return Err(SceneError::Cycle { parent, child });
        }
        self.push(parent, ElementKind::Module(child))
    }

    /// Whether `target` is `from` or is nested anywhere within it.
    fn reaches(&self, from: ModuleId, target: ModuleId) -> bool {
        let mut visited = vec![false; self.modules.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if std::mem::replace(&mut visited[id.0], true) {
                continue;
            }
            stack.extend(self.modules[id.0].children());
        }
        false
    }

    fn push(&mut self, parent: ModuleId, kind: ElementKind) -> Result<ElementRef, SceneError> {
        let index = self.module_mut(parent)?.push(kind);
        Ok(ElementRef {
            module: parent,
            index,
        })
    }

    /// Appends a shape to `parent`.
    pub fn add_shape(
        &mut self,
        parent: ModuleId,
        shape: impl Into<Shape>,
    ) -> Result<ElementRef, SceneError> {
        self.push(parent, ElementKind::Shape(shape.into()))
    }

    /// Appends a transform element to `parent`.
    pub fn add_transform(
        &mut self,
        parent: ModuleId,
        transform: Transform,
    ) -> Result<ElementRef, SceneError> {
        self.push(parent, ElementKind::Transform(transform))
    }

    /// Appends a draw-state change to `parent`. Alpha and beta must be within 0–1.
    pub fn add_draw_state(
        &mut self,
        parent: ModuleId,
        change: DrawStateChange,
    ) -> Result<ElementRef, SceneError> {
        if let Some((name, value)) = change.invalid_coefficient() {
            return Err(SceneError::InvalidCoefficient { name, value });
        }
        self.push(parent, ElementKind::DrawState(change))
    }

    /// Appends copies of `shapes` to `module`, in order; the inverse of
    /// [`Module::export_shapes()`].
    pub fn import_shapes(
        &mut self,
        module: ModuleId,
        shapes: impl IntoIterator<Item = Shape>,
    ) -> Result<(), SceneError> {
        let module = self.module_mut(module)?;
        for shape in shapes {
            module.push(ElementKind::Shape(shape));
        }
        Ok(())
    }

    // --- Transform elements ---

    #[allow(missing_docs)]
    pub fn add_matrix(&mut self, parent: ModuleId, m: Matrix) -> Result<ElementRef, SceneError> {
        self.add_transform(parent, Transform::Compose(m))
    }

    #[allow(missing_docs)]
    pub fn add_scale(
        &mut self,
        parent: ModuleId,
        sx: FreeCoordinate,
        sy: FreeCoordinate,
        sz: FreeCoordinate,
    ) -> Result<ElementRef, SceneError> {
        self.add_matrix(parent, Matrix::scale(sx, sy, sz))
    }

    #[allow(missing_docs)]
    pub fn add_translate(
        &mut self,
        parent: ModuleId,
        tx: FreeCoordinate,
        ty: FreeCoordinate,
        tz: FreeCoordinate,
    ) -> Result<ElementRef, SceneError> {
        self.add_matrix(parent, Matrix::translate(tx, ty, tz))
    }

    /// Rotation about the X axis by `angle` radians.
    pub fn add_rotate_x(
        &mut self,
        parent: ModuleId,
        angle: FreeCoordinate,
    ) -> Result<ElementRef, SceneError> {
        self.add_matrix(parent, Matrix::rotate_x(angle.cos(), angle.sin()))
    }

    /// Rotation about the Y axis by `angle` radians.
    pub fn add_rotate_y(
        &mut self,
        parent: ModuleId,
        angle: FreeCoordinate,
    ) -> Result<ElementRef, SceneError> {
        self.add_matrix(parent, Matrix::rotate_y(angle.cos(), angle.sin()))
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn add_rotate_z(
        &mut self,
        parent: ModuleId,
        angle: FreeCoordinate,
    ) -> Result<ElementRef, SceneError> {
        self.add_matrix(parent, Matrix::rotate_z(angle.cos(), angle.sin()))
    }

    #[allow(missing_docs)]
    pub fn add_rotate_xyz(
        &mut self,
        parent: ModuleId,
        u: Vector,
        v: Vector,
        w: Vector,
    ) -> Result<ElementRef, SceneError> {
        self.add_matrix(parent, Matrix::rotate_xyz(u, v, w))
    }

    #[allow(missing_docs)]
    pub fn add_shear_2d(
        &mut self,
        parent: ModuleId,
        shx: FreeCoordinate,
        shy: FreeCoordinate,
    ) -> Result<ElementRef, SceneError> {
        self.add_matrix(parent, Matrix::shear_2d(shx, shy))
    }

    #[allow(missing_docs)]
    pub fn add_shear_z(
        &mut self,
        parent: ModuleId,
        shx: FreeCoordinate,
        shy: FreeCoordinate,
    ) -> Result<ElementRef, SceneError> {
        self.add_matrix(parent, Matrix::shear_z(shx, shy))
    }

    /// Appends an element that resets the local transform to the identity.
    pub fn add_identity(&mut self, parent: ModuleId) -> Result<ElementRef, SceneError> {
        self.add_transform(parent, Transform::ResetLocal)
    }

    // --- Shapes ---

    #[allow(missing_docs)]
    pub fn create_point(
        &mut self,
        parent: ModuleId,
        position: Vector,
        radius: i32,
        color: Rgba8,
    ) -> Result<ElementRef, SceneError> {
        let shape = Point::new(position, radius, color)?;
        self.add_shape(parent, shape)
    }

    #[allow(missing_docs)]
    pub fn create_point_cloud(
        &mut self,
        parent: ModuleId,
        positions: Vec<Vector>,
        colors: Vec<Rgba8>,
        radius: i32,
    ) -> Result<ElementRef, SceneError> {
        let shape = PointCloud::new(positions, colors, radius)?;
        self.add_shape(parent, shape)
    }

    #[allow(missing_docs)]
    pub fn create_line(
        &mut self,
        parent: ModuleId,
        start: Vector,
        end: Vector,
        color: Rgba8,
    ) -> Result<ElementRef, SceneError> {
        let shape = Line::new(start, end, color)?;
        self.add_shape(parent, shape)
    }

    #[allow(missing_docs)]
    pub fn create_polyline(
        &mut self,
        parent: ModuleId,
        starts: Vec<Vector>,
        ends: Vec<Vector>,
        colors: Vec<Rgba8>,
    ) -> Result<ElementRef, SceneError> {
        let shape = PolyLine::new(starts, ends, colors)?;
        self.add_shape(parent, shape)
    }

    /// Creates a polygon with a computed face normal. Use [`Scene::add_shape()`] with a
    /// [`Polygon`] built by hand to supply normals, anchors, or vertex colors.
    pub fn create_polygon(
        &mut self,
        parent: ModuleId,
        vertices: Vec<Vector>,
        color: Rgba8,
    ) -> Result<ElementRef, SceneError> {
        let shape = Polygon::new(vertices, color)?;
        self.add_shape(parent, shape)
    }

    /// Creates an axis-aligned rectangle in the XY plane, extending `width` and `height`
    /// from its center at `(x0, y0)`.
    pub fn create_rectangle(
        &mut self,
        parent: ModuleId,
        width: FreeCoordinate,
        height: FreeCoordinate,
        center: [FreeCoordinate; 2],
        color: Rgba8,
    ) -> Result<ElementRef, SceneError> {
        let shape = factory::rectangle(width, height, center, color)?;
        self.add_shape(parent, shape)
    }

    /// Creates a module holding the six faces of a box, and appends it to `parent`.
    pub fn create_box(
        &mut self,
        parent: ModuleId,
        half_extents: [FreeCoordinate; 3],
        center: [FreeCoordinate; 3],
        colors: [Rgba8; 6],
    ) -> Result<ModuleId, SceneError> {
        let faces = factory::box_faces(half_extents, center, colors)?;
        self.create_module_of(parent, faces)
    }

    /// Creates a module holding a cylinder of unit height, and appends it to `parent`.
    pub fn create_cylinder(
        &mut self,
        parent: ModuleId,
        width: FreeCoordinate,
        height: FreeCoordinate,
        sides: usize,
        color: Rgba8,
    ) -> Result<ModuleId, SceneError> {
        let faces = factory::cylinder_faces(width, height, sides, color)?;
        self.create_module_of(parent, faces)
    }

    /// Creates a module holding a unit sphere subdivided `recursion` times, and appends
    /// it to `parent`. The triangle mesh is taken from `cache` when already generated.
    pub fn create_sphere(
        &mut self,
        parent: ModuleId,
        recursion: u8,
        color: Rgba8,
        cache: &mut MeshCache,
    ) -> Result<ModuleId, SceneError> {
        let faces = factory::sphere_faces(cache, recursion, color)?;
        self.create_module_of(parent, faces)
    }

    fn create_module_of(
        &mut self,
        parent: ModuleId,
        polygons: Vec<Polygon>,
    ) -> Result<ModuleId, SceneError> {
        let module = self.create_module(parent)?;
        self.import_shapes(module, polygons.into_iter().map(Shape::Polygon))?;
        Ok(module)
    }

    // --- Whole-graph operations ---

    /// Modules reachable from the root, including ignored ones, each listed once.
    fn reachable(&self) -> Vec<ModuleId> {
        let mut visited = vec![false; self.modules.len()];
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut visited[id.0], true) {
                continue;
            }
            order.push(id);
            stack.extend(self.modules[id.0].children());
        }
        order
    }

    /// Whether anything that affects the rendered image changed since the last
    /// [`Scene::clean()`]: an element of any module reachable from the root (ignored
    /// modules included), or the lighting.
    pub fn is_dirty(&self) -> bool {
        self.lighting.is_dirty()
            || self
                .reachable()
                .into_iter()
                .any(|id| self.modules[id.0].is_dirty_locally())
    }

    /// Clears every dirty flag, including those of unreachable modules.
    pub fn clean(&mut self) {
        for module in &mut self.modules {
            module.clean_locally();
        }
        self.lighting.clean();
    }

    /// Flips the `ignore` flag of every module directly nested in `module`.
    ///
    /// Applying this twice restores the original flags.
    pub fn toggle_visibility(&mut self, module: ModuleId) -> Result<(), SceneError> {
        let children: Vec<ModuleId> = self.module(module)?.children().collect();
        for child in children {
            self.modules[child.0].toggle_ignore();
        }
        Ok(())
    }

    /// Pushes every shape in `module` away from the module's centroid by `strength`
    /// times its own distance from it.
    pub fn explode(&mut self, module: ModuleId, strength: FreeCoordinate) -> Result<(), SceneError> {
        let module = self.module_mut(module)?;
        let centroids: Vec<Vector> = module
            .elements()
            .iter()
            .filter_map(|e| match e.kind() {
                ElementKind::Shape(shape) => shape.centroid(),
                _ => None,
            })
            .collect();
        let Some(center) = mean(&centroids) else {
            return Ok(());
        };
        for index in 0..module.elements().len() {
            let Some(element) = module.element_mut(index) else {
                continue;
            };
            let Some(shape_center) = (match element.kind() {
                ElementKind::Shape(shape) => shape.centroid(),
                _ => None,
            }) else {
                continue;
            };
            let offset = (shape_center - center) * strength;
            if let Some(shape) = element.shape_mut() {
                shape.for_each_position_mut(|v| *v = *v + offset * v.h);
            }
        }
        Ok(())
    }
}

fn mean(points: &[Vector]) -> Option<Vector> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vector::ZERO, |a, &b| a + b);
    Some(sum * (1.0 / points.len() as FreeCoordinate))
}
