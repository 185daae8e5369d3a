//! This library is an internal component of [`lilac`],
//! which defines the homogeneous vector, matrix, and color types.
//! Do not depend on this library; use only [`lilac`] instead.
//!
//! [`lilac`]: https://crates.io/crates/lilac/

#![forbid(unsafe_code)]
#![warn(clippy::missing_inline_in_public_items)]

/// Do not use this module directly; its contents are re-exported from `lilac`.
pub mod math;

// reexport for convenience of our tests
#[doc(hidden)]
pub use euclid;
