//! Software rendering of [`lilac`] scenes: rasterization with depth buffering, lighting,
//! shadows, reflections, fog, and texture and bump mapping.
//!
//! The entry point is [`Renderer`], which draws a [`Scene`](lilac::Scene) as seen by a
//! [`Camera`](lilac::camera::Camera) into its own frame buffer and hands out the result
//! as a [`Rendering`] or presents it on a [`DisplaySurface`].
//!
//! ## Package features
//!
//! This package, `lilac-render`, defines the following feature flags:
//!
//! * `"auto-threads"`:
//!   Run the shadow and reflection passes on [`rayon`]’s global thread pool.
//!   Output is identical with and without this feature.
//! * `"save"`:
//!   Enable [`serde`] serialization of [`RenderOptions`] and camera parameters.

#![forbid(unsafe_code)]

// -------------------------------------------------------------------------------------------------

mod flaws;
pub use flaws::Flaws;

mod frame;
pub use frame::{BACKGROUND_DEPTH, FOREGROUND_LIMIT, FrameBuffer, Fragment, SurfaceId};

mod options;
pub use options::{FogOptions, ReflectionOptions, RenderOptions, ShadowOptions};

mod post;

pub mod raster;

mod rendering;
pub use rendering::{DisplaySurface, Rendering};

mod renderer;
pub use renderer::{RenderInfo, Renderer};

mod shade;
pub use shade::{ShadeInput, fog, shade};

mod texture;
pub use texture::{MemoryTextureSource, Texture, TextureCache, TextureError, TextureSource};

// -------------------------------------------------------------------------------------------------

/// An error that aborted drawing a frame. The previously drawn frame remains visible.
#[derive(Clone, Debug, Eq, Hash, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum RenderError {
    /// scene refers to module {0:?}, which does not exist
    UnknownModule(lilac::ModuleId),
    /// modules are nested more than {limit} deep
    TooDeep {
        #[allow(missing_docs)]
        limit: usize,
    },
}

impl std::error::Error for RenderError {}
