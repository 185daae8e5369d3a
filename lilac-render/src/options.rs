use lilac::math::Rgba8;

/// Options controlling how a [`Renderer`](crate::Renderer) draws, independent of the
/// scene and camera.
///
/// [`Renderer::set_options()`](crate::Renderer::set_options) constrains every value to its
/// sensible range with [`RenderOptions::repair()`] before drawing with it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "save", serde(default))]
#[non_exhaustive]
pub struct RenderOptions {
    /// Color of pixels no shape was drawn on.
    pub background: Rgba8,
    /// Depth-wise fading toward a fog color.
    pub fog: FogOptions,
    /// Shadows cast from point lights.
    pub shadows: ShadowOptions,
    /// Reflections on surfaces whose draw state has a nonzero `beta`.
    pub reflections: ReflectionOptions,
    /// After the shadowed pass, flip the visibility of the root's child modules and
    /// draw the newly visible ones over the frame without shadows.
    pub selective_shadows: bool,
    /// Point light attenuation: light falls off as `1 / (1 + light_falloff · distance²)`.
    pub light_falloff: f64,
    /// Whether surfaces facing away from a point light are lit as if they faced it.
    pub two_sided_lighting: bool,
    /// Seed for the jitter of shadow and reflection samples. The same seed always
    /// produces the same frame.
    pub seed: u64,
}

/// Fog settings; part of [`RenderOptions`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "save", serde(default))]
#[non_exhaustive]
pub struct FogOptions {
    /// Strength of the fog; 0 disables it. Around 70 gives a noticeable fade over the
    /// depth range of a perspective view.
    pub magnitude: f64,
    /// Color that distant surfaces fade toward.
    pub color: Rgba8,
}

/// Shadow settings; part of [`RenderOptions`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "save", serde(default))]
#[non_exhaustive]
pub struct ShadowOptions {
    #[allow(missing_docs)]
    pub enabled: bool,
    /// Largest depth difference at which a shadow ray counts as hitting a surface.
    pub tolerance: f64,
    /// Size in pixels of the area light that samples are jittered over.
    pub area: [u32; 2],
    /// Samples per axis; each shaded pixel traces `diffusion²` rays.
    pub diffusion: u32,
    /// Fraction of brightness removed from a fully shadowed pixel.
    pub darkness: f64,
}

/// Reflection settings; part of [`RenderOptions`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "save", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "save", serde(default))]
#[non_exhaustive]
pub struct ReflectionOptions {
    #[allow(missing_docs)]
    pub enabled: bool,
    /// Distance from the reflecting pixel at which the reflected ray starts, so that a
    /// surface does not reflect its immediate neighborhood.
    pub offset: f64,
    /// Length in pixels of the reflected ray.
    pub projection: f64,
    /// Largest depth difference at which a reflected ray counts as hitting a surface.
    pub threshold: f64,
    /// Size in pixels of the area that light samples are jittered over.
    pub area: [u32; 2],
    /// Samples per axis; each reflecting pixel traces `diffusion²` rays per light.
    pub diffusion: u32,
}

impl RenderOptions {
    /// Constrain fields to valid and practical values.
    #[must_use]
    pub fn repair(mut self) -> Self {
        fn unit(value: f64) -> f64 {
            if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
        }
        fn non_negative(value: f64, fallback: f64) -> f64 {
            if value.is_nan() { fallback } else { value.max(0.0) }
        }

        self.fog.magnitude = non_negative(self.fog.magnitude, 0.0).min(10_000.0);
        self.light_falloff = non_negative(self.light_falloff, 0.0);

        let shadows = &mut self.shadows;
        shadows.tolerance = non_negative(shadows.tolerance, ShadowOptions::DEFAULT.tolerance);
        shadows.darkness = unit(shadows.darkness);
        shadows.area = shadows.area.map(|a| a.clamp(1, 4096));
        shadows.diffusion = shadows.diffusion.clamp(1, 16);

        let reflections = &mut self.reflections;
        reflections.offset = non_negative(reflections.offset, ReflectionOptions::DEFAULT.offset);
        reflections.projection = non_negative(
            reflections.projection,
            ReflectionOptions::DEFAULT.projection,
        )
        .min(100_000.0);
        reflections.threshold = non_negative(
            reflections.threshold,
            ReflectionOptions::DEFAULT.threshold,
        );
        reflections.area = reflections.area.map(|a| a.clamp(1, 100_000));
        reflections.diffusion = reflections.diffusion.clamp(1, 16);
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            background: Rgba8::BLACK,
            fog: FogOptions::default(),
            shadows: ShadowOptions::default(),
            reflections: ReflectionOptions::default(),
            selective_shadows: false,
            light_falloff: 0.01,
            two_sided_lighting: true,
            seed: 0,
        }
    }
}

impl Default for FogOptions {
    fn default() -> Self {
        Self {
            magnitude: 0.0,
            color: Rgba8::BLACK,
        }
    }
}

impl ShadowOptions {
    const DEFAULT: Self = Self {
        enabled: true,
        tolerance: 0.01,
        area: [10, 10],
        diffusion: 1,
        darkness: 0.5,
    };
}

impl Default for ShadowOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl ReflectionOptions {
    const DEFAULT: Self = Self {
        enabled: true,
        offset: 1.275,
        projection: 200.0,
        threshold: 0.01,
        area: [1000, 1000],
        diffusion: 1,
    };
}

impl Default for ReflectionOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}
