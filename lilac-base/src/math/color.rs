//! Color data types. This module is private but reexported by its parent.

use core::fmt;
use core::ops::{Add, AddAssign, Mul};

use euclid::{Vector3D, vec3};

/// An 8-bit-per-channel RGBA color, as stored in shapes, draw states, and frame buffers.
///
/// The alpha channel is index 3. It is carried through unchanged by shading; blending is
/// controlled by the draw state instead.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgba8([u8; 4]);

impl Rgba8 {
    /// Opaque black.
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    /// Opaque white.
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self([0, 0, 0, 0]);

    /// Constructs a color from components.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Returns the red component.
    #[inline]
    pub const fn red(self) -> u8 {
        self.0[0]
    }
    /// Returns the green component.
    #[inline]
    pub const fn green(self) -> u8 {
        self.0[1]
    }
    /// Returns the blue component.
    #[inline]
    pub const fn blue(self) -> u8 {
        self.0[2]
    }
    /// Returns the alpha component.
    #[inline]
    pub const fn alpha(self) -> u8 {
        self.0[3]
    }

    /// Returns the components as `[r, g, b, a]`.
    #[inline]
    pub const fn to_array(self) -> [u8; 4] {
        self.0
    }

    /// Converts the color channels to the 0–1 floating-point scale, discarding alpha.
    #[inline]
    pub fn to_rgb(self) -> Rgb {
        Rgb(vec3(
            f64::from(self.red()),
            f64::from(self.green()),
            f64::from(self.blue()),
        )) * (1.0 / 255.0)
    }
}

impl fmt::Debug for Rgba8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "Rgba8({r}, {g}, {b}, {a})")
    }
}

impl From<[u8; 4]> for Rgba8 {
    #[inline]
    fn from(value: [u8; 4]) -> Self {
        Self(value)
    }
}

impl From<Rgba8> for [u8; 4] {
    #[inline]
    fn from(value: Rgba8) -> Self {
        value.0
    }
}

/// Unit-of-measure type for vectors that contain color channels.
#[expect(clippy::exhaustive_enums)]
#[derive(Debug, Eq, PartialEq)]
pub enum Intensity {}

/// A floating-point RGB color value, used while accumulating light.
///
/// The nominal range of each component is 0 to 1. Values outside that range are preserved
/// until [`Rgb::to_rgba8`] clamps them.
#[derive(Clone, Copy, PartialEq)]
pub struct Rgb(Vector3D<f64, Intensity>);

impl Rgb {
    /// Black.
    pub const ZERO: Rgb = Rgb(vec3(0.0, 0.0, 0.0));
    /// Nominal white.
    pub const ONE: Rgb = Rgb(vec3(1.0, 1.0, 1.0));

    /// Constructs a color from components.
    #[inline]
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self(vec3(r, g, b))
    }

    /// Returns the red color component.
    #[inline]
    pub const fn red(self) -> f64 {
        self.0.x
    }
    /// Returns the green color component.
    #[inline]
    pub const fn green(self) -> f64 {
        self.0.y
    }
    /// Returns the blue color component.
    #[inline]
    pub const fn blue(self) -> f64 {
        self.0.z
    }

    /// Linear interpolation; `t == 0` yields `self`.
    #[inline]
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self(self.0.lerp(other.0, t))
    }

    /// Converts to 8-bit channels, clamping each to 0–255 and rounding.
    /// NaN components become 0.
    #[inline]
    pub fn to_rgba8(self, alpha: u8) -> Rgba8 {
        fn channel(value: f64) -> u8 {
            if value.is_nan() {
                0
            } else {
                (value * 255.0).round().clamp(0.0, 255.0) as u8
            }
        }
        Rgba8::new(
            channel(self.red()),
            channel(self.green()),
            channel(self.blue()),
            alpha,
        )
    }
}

impl fmt::Debug for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rgb({:?}, {:?}, {:?})",
            self.red(),
            self.green(),
            self.blue()
        )
    }
}

impl Add for Rgb {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Rgb {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Multiplies two color values componentwise.
impl Mul<Rgb> for Rgb {
    type Output = Self;
    #[inline]
    fn mul(self, other: Rgb) -> Self {
        Self(self.0.component_mul(other.0))
    }
}

/// Multiplies this color value by a scalar.
impl Mul<f64> for Rgb {
    type Output = Self;
    #[inline]
    fn mul(self, scalar: f64) -> Self {
        Self(self.0 * scalar)
    }
}
