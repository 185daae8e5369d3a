//! Mathematical utilities and decisions.

mod color;
pub use color::*;
mod matrix;
pub use matrix::*;
mod vector;
pub use vector::*;

/// Coordinates that are not locked to any grid: world, view, and screen space.
pub type FreeCoordinate = f64;

/// Unit-of-measure type for sizes and positions in the pixels of a frame buffer.
#[expect(clippy::exhaustive_enums)]
#[derive(Debug)]
pub enum ImagePixel {}

/// Size of a frame buffer or texture, in pixels.
pub type ImageSize = euclid::Size2D<u32, ImagePixel>;

/// Computes the number of pixels in an image of the given size, or [`None`] if it
/// would not fit in a `usize`.
#[inline]
pub fn area_usize(size: ImageSize) -> Option<usize> {
    let w = usize::try_from(size.width).ok()?;
    let h = usize::try_from(size.height).ok()?;
    w.checked_mul(h)
}
