//! Lilac is an interactive 3D scene-graph renderer. This crate defines the scene model:
//! a graph of [`Module`]s whose ordered elements are shapes, transforms, draw-state
//! changes, and nested modules, together with the lights and cameras used to view it.
//!
//! Rasterization, shading, and the per-frame orchestration live in `lilac-render`.
//!
//! ## Data model
//!
//! * A [`Scene`] owns every [`Module`] in an arena and names them by [`ModuleId`].
//!   Modules may be shared by several parents, but the scene refuses any addition that
//!   would make a module contain itself, so traversal always terminates.
//! * Within a module, elements apply strictly in order: a [`Transform`] or
//!   [`DrawStateChange`] affects only the elements after it.
//! * [`Shape`]s are validated when constructed; a malformed shape is reported as a
//!   [`ShapeError`] and never reaches the renderer.
//! * Every element carries a dirty flag. [`Scene::is_dirty()`] lets a host redraw only
//!   when something changed.
//!
//! ## Coordinate system
//!
//! World space is right-handed. The [`camera`] module maps world space to screen space,
//! where X grows rightward in pixels, Y grows downward in pixels, and Z is a depth that
//! grows away from the viewer.
//!
//! ## Crate features
//!
//! * `save`: Enable [`serde`] serialization of camera parameters and the math types.
//!
//! ## Dependencies and global state
//!
//! `lilac` has no global state other than the counter handing out [`ElementId`]s.
//! It writes log messages using the [`log`] crate.

#![forbid(unsafe_code)]

pub use lilac_base::math;

pub mod camera;

mod draw_state;
pub use draw_state::*;

pub mod factory;

mod lighting;
pub use lighting::*;

mod module;
pub use module::*;

mod scene;
pub use scene::*;

mod shape;
pub use shape::*;
