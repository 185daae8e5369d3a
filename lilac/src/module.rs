//! Modules and their elements. This module is private but reexported by its parent.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;

use crate::math::{Matrix, Vector};
use crate::{DrawStateChange, ModuleId, Normals, Polygon, PolygonBatch, Shape};

/// Unique, monotonically increasing identifier of a [`Module`] or [`Element`].
///
/// Used only for display and debugging; it has no effect on rendering.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ElementId(u64);

impl ElementId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A scene element that changes the local transform for the elements after it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum Transform {
    /// Composes the matrix after the current local transform.
    Compose(Matrix),
    /// Resets the local transform to the identity.
    ResetLocal,
}

/// The content of an [`Element`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ElementKind {
    /// Drawn with the current transforms and draw state.
    Shape(Shape),
    /// Changes the local transform.
    Transform(Transform),
    /// Changes the draw state.
    DrawState(DrawStateChange),
    /// A nested module, drawn with its own local transform and a copy of the draw state.
    Module(ModuleId),
}

/// One entry in a [`Module`]'s sequence.
#[derive(Clone, Debug)]
pub struct Element {
    id: ElementId,
    kind: ElementKind,
    dirty: bool,
}

impl Element {
    pub(crate) fn new(kind: ElementKind) -> Self {
        Self {
            id: ElementId::next(),
            kind,
            dirty: false,
        }
    }

    #[allow(missing_docs)]
    pub fn id(&self) -> ElementId {
        self.id
    }

    #[allow(missing_docs)]
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Whether this element was changed since the last [`Scene::clean()`](crate::Scene::clean).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mutable access to a shape element. Marks the element dirty.
    pub fn shape_mut(&mut self) -> Option<&mut Shape> {
        match &mut self.kind {
            ElementKind::Shape(shape) => {
                self.dirty = true;
                Some(shape)
            }
            _ => None,
        }
    }

    /// Mutable access to a transform element. Marks the element dirty.
    pub fn transform_mut(&mut self) -> Option<&mut Transform> {
        match &mut self.kind {
            ElementKind::Transform(t) => {
                self.dirty = true;
                Some(t)
            }
            _ => None,
        }
    }

    /// Mutable access to a draw-state element. Marks the element dirty.
    pub fn draw_state_mut(&mut self) -> Option<&mut DrawStateChange> {
        match &mut self.kind {
            ElementKind::DrawState(d) => {
                self.dirty = true;
                Some(d)
            }
            _ => None,
        }
    }

    /// Marks this element as needing a redraw.
    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ElementKind::Shape(shape) => write!(f, "{shape} {}", self.id),
            ElementKind::Transform(Transform::Compose(_)) => write!(f, "Transform {}", self.id),
            ElementKind::Transform(Transform::ResetLocal) => write!(f, "Identity {}", self.id),
            ElementKind::DrawState(_) => write!(f, "DrawState {}", self.id),
            ElementKind::Module(child) => write!(f, "Module({child:?}) {}", self.id),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A scene-graph node: an ordered sequence of [`Element`]s.
///
/// Modules are owned by a [`Scene`](crate::Scene); adding nested modules goes through
/// the scene so that it can refuse cycles.
#[derive(Clone, Debug)]
pub struct Module {
    id: ElementId,
    elements: Vec<Element>,
    ignore: bool,
    dirty: bool,
}

impl Module {
    pub(crate) fn new() -> Self {
        Self {
            id: ElementId::next(),
            elements: Vec::new(),
            ignore: false,
            dirty: true,
        }
    }

    #[allow(missing_docs)]
    pub fn id(&self) -> ElementId {
        self.id
    }

    #[allow(missing_docs)]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Mutable access to one element; use the element's accessors to edit it.
    pub fn element_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.elements.get_mut(index)
    }

    pub(crate) fn push(&mut self, kind: ElementKind) -> usize {
        self.elements.push(Element::new(kind));
        self.dirty = true;
        self.elements.len() - 1
    }

    /// Whether traversal skips this module and everything in it.
    pub fn is_ignored(&self) -> bool {
        self.ignore
    }

    /// Sets whether traversal skips this module.
    pub fn set_ignore(&mut self, ignore: bool) {
        if self.ignore != ignore {
            self.ignore = ignore;
            self.dirty = true;
        }
    }

    pub(crate) fn toggle_ignore(&mut self) {
        self.set_ignore(!self.ignore);
    }

    /// Whether this module or any of its own elements changed. Nested modules are not
    /// consulted; see [`Scene::is_dirty()`](crate::Scene::is_dirty).
    pub fn is_dirty_locally(&self) -> bool {
        self.dirty || self.elements.iter().any(Element::is_dirty)
    }

    pub(crate) fn clean_locally(&mut self) {
        self.dirty = false;
        for element in &mut self.elements {
            element.dirty = false;
        }
    }

    /// Returns the nested modules, in order.
    pub fn children(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.elements.iter().filter_map(|e| match e.kind {
            ElementKind::Module(id) => Some(id),
            _ => None,
        })
    }

    /// Returns copies of this module's shapes, in order.
    pub fn export_shapes(&self) -> Vec<Shape> {
        self.elements
            .iter()
            .filter_map(|e| match &e.kind {
                ElementKind::Shape(shape) => Some(shape.clone()),
                _ => None,
            })
            .collect()
    }

    /// Merges each run of two or more consecutive polygon elements into a single
    /// [`PolygonBatch`], and returns the number of batches created.
    ///
    /// Batches draw identically to the polygons they replace.
    pub fn optimize(&mut self) -> usize {
        let mut batches = 0;
        let mut output = Vec::with_capacity(self.elements.len());
        let mut run: Vec<Element> = Vec::new();

        let mut flush = |run: &mut Vec<Element>, output: &mut Vec<Element>| {
            if run.len() >= 2 {
                let polygons: Vec<Polygon> = run
                    .drain(..)
                    .filter_map(|e| match e.kind {
                        ElementKind::Shape(Shape::Polygon(p)) => Some(p),
                        _ => None,
                    })
                    .collect();
                if let Ok(batch) = PolygonBatch::new(polygons) {
                    let mut element = Element::new(ElementKind::Shape(Shape::PolygonBatch(batch)));
                    element.dirty = true;
                    output.push(element);
                    batches += 1;
                }
            } else {
                output.append(run);
            }
        };

        for element in self.elements.drain(..) {
            if matches!(element.kind, ElementKind::Shape(Shape::Polygon(_))) {
                run.push(element);
            } else {
                flush(&mut run, &mut output);
                output.push(element);
            }
        }
        flush(&mut run, &mut output);

        self.elements = output;
        if batches > 0 {
            self.dirty = true;
        }
        batches
    }

    /// Replaces the normals of every polygon in this module with per-vertex normals,
    /// each the average of the face normals of all polygons sharing that vertex
    /// position. This makes faceted meshes shade smoothly.
    pub fn average_normals(&mut self) {
        type Key = [u64; 3];
        fn key(v: Vector) -> Key {
            // +0.0 so that -0.0 and 0.0 are the same vertex
            [(v.x + 0.0).to_bits(), (v.y + 0.0).to_bits(), (v.z + 0.0).to_bits()]
        }

        let mut sums: HashMap<Key, Vector> = HashMap::new();
        for polygon in polygons(&mut self.elements) {
            let face = polygon.face_normal();
            for &v in polygon.vertices() {
                let sum = sums.entry(key(v)).or_insert(Vector::ZERO);
                *sum = *sum + face;
            }
        }
        for polygon in polygons(&mut self.elements) {
            let normals = polygon
                .vertices()
                .iter()
                .map(|&v| {
                    sums.get(&key(v))
                        .and_then(|n| n.normalize())
                        .unwrap_or(Vector::ZERO)
                })
                .collect();
            polygon.set_normals_unchecked(Normals::Vertex(normals));
        }
        for element in &mut self.elements {
            if matches!(element.kind, ElementKind::Shape(_)) {
                element.dirty = true;
            }
        }
    }
}

/// Every polygon in `elements`, including those inside batches.
fn polygons(elements: &mut [Element]) -> impl Iterator<Item = &mut Polygon> {
    elements.iter_mut().flat_map(|e| {
        let slice: &mut [Polygon] = match &mut e.kind {
            ElementKind::Shape(Shape::Polygon(p)) => std::slice::from_mut(p),
            ElementKind::Shape(Shape::PolygonBatch(b)) => b.polygons_mut(),
            _ => &mut [],
        };
        slice.iter_mut()
    })
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Module({} elements) {}", self.elements.len(), self.id)?;
        if self.ignore {
            write!(f, " (ignored)")?;
        }
        Ok(())
    }
}
