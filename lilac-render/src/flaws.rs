use core::fmt;

bitflags::bitflags! {
    /// Deficiencies of a rendering.
    ///
    /// This type describes the ways in which a rendered image could fail to accurately
    /// represent the scene, without the problem being severe enough to abort the frame.
    ///
    /// It is a [`bitflags`] generated bit-flag type. *Note: We make no guarantees that
    /// the numeric value of flags will stay the same across versions*; please treat this
    /// as a set of named values only.
    ///
    /// The [empty](Self::empty) set means no flaws are present.
    #[derive(Clone, Copy, Debug, Hash, Eq, Ord, PartialEq, PartialOrd)]
    pub struct Flaws: u16 {
        /// Surfaces that should have a texture or bump map don't, because it could not
        /// be loaded.
        const MISSING_TEXTURES = 1 << 0;

        /// Some shapes were skipped because they projected to points at or behind the
        /// eye, or to non-finite coordinates.
        const DEGENERATE_GEOMETRY = 1 << 1;

        /// Some surfaces had no usable normal and received only ambient light.
        const UNLIT_FACETS = 1 << 2;

        /// Shadows from some lights were not cast because the light is behind the eye.
        const SKIPPED_SHADOWS = 1 << 3;
    }
}

impl Default for Flaws {
    /// Equivalent to [`Self::empty()`].
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Flaws {
    /// Displays the flags as text like “`MISSING_TEXTURES | UNLIT_FACETS`".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
