//! Light sources. This module is private but reexported by its parent.

use crate::math::{Rgba8, Vector};

/// Kind of a [`Light`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum LightKind {
    /// Contributes a flat tint everywhere, independent of geometry.
    Ambient,
    /// Radiates from a position, producing diffuse and specular shading and shadows.
    Point,
}

/// A light source.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Light {
    #[allow(missing_docs)]
    pub kind: LightKind,
    #[allow(missing_docs)]
    pub color: Rgba8,
    /// World-space position; meaningful only for [`LightKind::Point`].
    pub position: Vector,
    /// Specular exponent; 0 makes highlights uniform.
    pub sharpness: u32,
}

impl Light {
    /// Constructs an ambient light.
    pub fn ambient(color: Rgba8) -> Self {
        Self {
            kind: LightKind::Ambient,
            color,
            position: Vector::ORIGIN,
            sharpness: 0,
        }
    }

    /// Constructs a point light.
    pub fn point(color: Rgba8, position: Vector, sharpness: u32) -> Self {
        Self {
            kind: LightKind::Point,
            color,
            position,
            sharpness,
        }
    }
}

/// Error when a [`Light`] is rejected by [`Lighting::add_light()`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum LightError {
    /// The position of a point light is not a finite point.
    #[error("point light position is not a finite point: {0:?}")]
    NonFinitePosition(Vector),
}

/// The ordered list of lights shading a scene.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lighting {
    lights: Vec<Light>,
    dirty: bool,
}

impl Lighting {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a light after the existing ones.
    ///
    /// Point lights are stored with their position homogenized; a position that cannot
    /// be homogenized to a finite point is rejected.
    pub fn add_light(&mut self, mut light: Light) -> Result<(), LightError> {
        if light.kind == LightKind::Point {
            light.position = light
                .position
                .homogenize()
                .ok_or(LightError::NonFinitePosition(light.position))?;
        }
        self.lights.push(light);
        self.dirty = true;
        Ok(())
    }

    /// Removes all lights.
    pub fn clear(&mut self) {
        if !self.lights.is_empty() {
            self.dirty = true;
        }
        self.lights.clear();
    }

    #[allow(missing_docs)]
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Returns the point lights only.
    pub fn point_lights(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter().filter(|l| l.kind == LightKind::Point)
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clean(&mut self) {
        self.dirty = false;
    }
}
