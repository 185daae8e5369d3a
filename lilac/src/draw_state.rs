//! Draw state: the color, blending, and texture context of shapes.
//! This module is private but reexported by its parent.

use std::fmt;
use std::sync::Arc;

use crate::math::Rgba8;

/// Identifies a texture or bump map to be loaded by the renderer's texture source,
/// such as a file path.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
pub struct TextureRef(Arc<str>);

impl TextureRef {
    #[allow(missing_docs)]
    pub fn new(identifier: impl Into<Arc<str>>) -> Self {
        Self(identifier.into())
    }

    #[allow(missing_docs)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TextureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The draw state in effect for a shape.
///
/// Traversal hands each nested module its own copy, so a change made inside one branch
/// of the scene graph is never seen by its siblings.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct DrawState {
    /// If set, replaces the shapes' own base colors.
    pub body_color: Option<Rgba8>,
    /// Color of specular highlights.
    pub surface_color: Rgba8,
    /// Opacity, from 0 (invisible) to 1 (opaque). Translucent fragments blend over
    /// what is already in the frame buffer.
    pub alpha: f64,
    /// Reflectivity, from 0 (matte) to 1 (mirror).
    pub beta: f64,
    /// Whether fog applies to the shapes.
    pub fog: bool,
    /// Texture overriding the base color, sampled through polygon anchors.
    pub texture: Option<TextureRef>,
    /// Bump map perturbing the shading normal, sampled through polygon anchors.
    pub bump_map: Option<TextureRef>,
}

impl DrawState {
    /// The state at the root of every traversal.
    pub const DEFAULT: Self = Self {
        body_color: None,
        surface_color: Rgba8::WHITE,
        alpha: 1.0,
        beta: 0.0,
        fog: true,
        texture: None,
        bump_map: None,
    };
}

impl Default for DrawState {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A scene element that changes some fields of the [`DrawState`] for the elements after it.
///
/// Fields left as [`None`] keep their previous value.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct DrawStateChange {
    /// `Some(None)` removes a body color override.
    pub body_color: Option<Option<Rgba8>>,
    #[allow(missing_docs)]
    pub surface_color: Option<Rgba8>,
    #[allow(missing_docs)]
    pub alpha: Option<f64>,
    #[allow(missing_docs)]
    pub beta: Option<f64>,
    #[allow(missing_docs)]
    pub fog: Option<bool>,
    /// `Some(None)` unbinds the texture.
    pub texture: Option<Option<TextureRef>>,
    /// `Some(None)` unbinds the bump map.
    pub bump_map: Option<Option<TextureRef>>,
}

impl DrawStateChange {
    /// A change that changes nothing.
    pub const NONE: Self = Self {
        body_color: None,
        surface_color: None,
        alpha: None,
        beta: None,
        fog: None,
        texture: None,
        bump_map: None,
    };

    /// Returns the state that results from applying this change to `state`.
    #[must_use]
    pub fn apply(&self, state: &DrawState) -> DrawState {
        DrawState {
            body_color: self.body_color.unwrap_or(state.body_color),
            surface_color: self.surface_color.unwrap_or(state.surface_color),
            alpha: self.alpha.unwrap_or(state.alpha),
            beta: self.beta.unwrap_or(state.beta),
            fog: self.fog.unwrap_or(state.fog),
            texture: match &self.texture {
                Some(t) => t.clone(),
                None => state.texture.clone(),
            },
            bump_map: match &self.bump_map {
                Some(b) => b.clone(),
                None => state.bump_map.clone(),
            },
        }
    }

    /// Returns the name and value of the first coefficient outside 0–1, if any.
    pub(crate) fn invalid_coefficient(&self) -> Option<(&'static str, f64)> {
        [("alpha", self.alpha), ("beta", self.beta)]
            .into_iter()
            .find_map(|(name, value)| {
                value
                    .filter(|v| !(0.0..=1.0).contains(v))
                    .map(|v| (name, v))
            })
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn with_body_color(mut self, color: Rgba8) -> Self {
        self.body_color = Some(Some(color));
        self
    }
    #[allow(missing_docs)]
    #[must_use]
    pub fn with_surface_color(mut self, color: Rgba8) -> Self {
        self.surface_color = Some(color);
        self
    }
    #[allow(missing_docs)]
    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }
    #[allow(missing_docs)]
    #[must_use]
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = Some(beta);
        self
    }
    #[allow(missing_docs)]
    #[must_use]
    pub fn with_fog(mut self, fog: bool) -> Self {
        self.fog = Some(fog);
        self
    }
    /// Binds (`Some`) or unbinds (`None`) a texture.
    #[must_use]
    pub fn with_texture(mut self, texture: Option<TextureRef>) -> Self {
        self.texture = Some(texture);
        self
    }
    /// Binds (`Some`) or unbinds (`None`) a bump map.
    #[must_use]
    pub fn with_bump_map(mut self, bump_map: Option<TextureRef>) -> Self {
        self.bump_map = Some(bump_map);
        self
    }
}
