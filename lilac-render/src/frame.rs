//! The frame buffer: pixel colors plus a per-pixel record of the nearest surface.

use lilac::math::{ImageSize, Rgba8, Vector, area_usize};

/// Depth of pixels no shape has been drawn on.
pub const BACKGROUND_DEPTH: f64 = 1000.0;

/// Pixels deeper than this are treated as background by the shadow and reflection passes.
pub const FOREGROUND_LIMIT: f64 = 100.0;

/// Translucent surfaces kept per pixel; beyond this the farthest ones are dropped.
pub const MAX_LAYERS: usize = 4;

/// Identifies the module instance a fragment was drawn by, within one frame.
///
/// Shadow and reflection rays ignore fragments with the same id as the pixel they start
/// from, so a surface never shadows or reflects itself.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SurfaceId(pub(crate) u32);

impl SurfaceId {
    /// The id of background pixels.
    pub const NONE: Self = Self(0);
}

/// What the frame buffer knows about the nearest surface at one pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct Fragment {
    /// Screen depth; smaller is nearer.
    pub depth: f64,
    /// Opacity of the surface.
    pub alpha: f64,
    /// Reflectivity of the surface.
    pub beta: f64,
    /// Surface normal in screen space, or zero if unknown.
    pub normal: Vector,
    #[allow(missing_docs)]
    pub surface: SurfaceId,
}

impl Fragment {
    const BACKGROUND: Self = Self {
        depth: BACKGROUND_DEPTH,
        alpha: 1.0,
        beta: 0.0,
        normal: Vector::ZERO,
        surface: SurfaceId::NONE,
    };

    /// Whether a shape has been drawn here.
    pub fn is_foreground(&self) -> bool {
        self.depth <= FOREGROUND_LIMIT
    }
}

/// A translucent surface waiting to be composited over the opaque color of its pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Layer {
    depth: f64,
    alpha: f64,
    color: Rgba8,
}

impl Layer {
    const EMPTY: Self = Self {
        depth: BACKGROUND_DEPTH,
        alpha: 0.0,
        color: Rgba8::BLACK,
    };
}

/// Colors and [`Fragment`]s for every pixel of a frame, in row-major order from the top
/// left.
///
/// Opaque surfaces are resolved by depth as they are written. Translucent surfaces are
/// held aside, up to [`MAX_LAYERS`] per pixel, and blended back to front by
/// [`FrameBuffer::composite()`], so the result does not depend on drawing order.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    size: ImageSize,
    colors: Vec<Rgba8>,
    fragments: Vec<Fragment>,
    /// `MAX_LAYERS` slots per pixel, nearest first; unused slots are `Layer::EMPTY`.
    layers: Vec<Layer>,
    layer_counts: Vec<u8>,
}

impl FrameBuffer {
    /// Constructs a buffer filled with `background`.
    ///
    /// Panics if the area of `size` does not fit in memory.
    pub fn new(size: ImageSize, background: Rgba8) -> Self {
        let area = area_usize(size).expect("frame buffer size overflows usize");
        Self {
            size,
            colors: vec![background; area],
            fragments: vec![Fragment::BACKGROUND; area],
            layers: vec![Layer::EMPTY; area * MAX_LAYERS],
            layer_counts: vec![0; area],
        }
    }

    #[allow(missing_docs)]
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Resets every pixel to `background` at [`BACKGROUND_DEPTH`].
    pub fn clear(&mut self, background: Rgba8) {
        self.colors.fill(background);
        self.fragments.fill(Fragment::BACKGROUND);
        self.layers.fill(Layer::EMPTY);
        self.layer_counts.fill(0);
    }

    /// Index of the pixel at `(x, y)`, or [`None`] if it is outside the buffer.
    #[inline]
    pub fn index(&self, x: i64, y: i64) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        let width = self.size.width as usize;
        (x < width && y < self.size.height as usize).then_some(y * width + x)
    }

    #[allow(missing_docs)]
    pub fn colors(&self) -> &[Rgba8] {
        &self.colors
    }

    #[allow(missing_docs)]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Depth at `(x, y)`, or [`None`] if out of bounds.
    pub fn depth(&self, x: i64, y: i64) -> Option<f64> {
        Some(self.fragments[self.index(x, y)?].depth)
    }

    /// Color at `(x, y)`, or [`None`] if out of bounds.
    pub fn color(&self, x: i64, y: i64) -> Option<Rgba8> {
        Some(self.colors[self.index(x, y)?])
    }

    /// Borrows the colors for writing while the fragments stay readable.
    pub(crate) fn split_mut(&mut self) -> (&mut [Rgba8], &[Fragment]) {
        (&mut self.colors, &self.fragments)
    }

    /// Writes a fragment if it is nearer than the opaque surface already at `index`.
    ///
    /// Opaque fragments replace the color and the record, and discard translucent layers
    /// behind them. Translucent fragments are kept as layers until
    /// [`FrameBuffer::composite()`] and leave the record alone, so surfaces behind them
    /// can still be drawn and traced. Returns whether anything was written.
    pub(crate) fn write(&mut self, index: usize, color: Rgba8, fragment: Fragment) -> bool {
        if !(fragment.depth < self.fragments[index].depth) {
            return false;
        }
        if fragment.alpha >= 1.0 {
            self.fragments[index] = fragment;
            self.colors[index] = color;
            let layers = self.pixel_layers(index);
            let behind = layers.iter().take_while(|l| l.depth < fragment.depth).count();
            layers[behind..].fill(Layer::EMPTY);
            self.layer_counts[index] = behind as u8;
            true
        } else {
            self.push_layer(
                index,
                Layer {
                    depth: fragment.depth,
                    alpha: fragment.alpha.max(0.0),
                    color,
                },
            )
        }
    }

    fn pixel_layers(&mut self, index: usize) -> &mut [Layer] {
        let count = usize::from(self.layer_counts[index]);
        &mut self.layers[index * MAX_LAYERS..][..count]
    }

    /// Inserts a layer in depth order, dropping the farthest if the pixel is full.
    fn push_layer(&mut self, index: usize, layer: Layer) -> bool {
        let count = usize::from(self.layer_counts[index]);
        let slots = &mut self.layers[index * MAX_LAYERS..][..MAX_LAYERS];
        let position = slots[..count]
            .iter()
            .take_while(|l| l.depth <= layer.depth)
            .count();
        if position == MAX_LAYERS {
            return false;
        }
        let count = (count + 1).min(MAX_LAYERS);
        slots[position..count].rotate_right(1);
        slots[position] = layer;
        self.layer_counts[index] = count as u8;
        true
    }

    /// Blends the translucent layers of every pixel over its opaque color, farthest
    /// first, and forgets them.
    pub(crate) fn composite(&mut self) {
        for (index, count) in self.layer_counts.iter_mut().enumerate() {
            if *count == 0 {
                continue;
            }
            let slots = &mut self.layers[index * MAX_LAYERS..][..usize::from(*count)];
            let under = self.colors[index];
            let blended = slots
                .iter()
                .rev()
                .fold(under.to_rgb(), |color, layer| {
                    color.lerp(layer.color.to_rgb(), layer.alpha)
                });
            self.colors[index] = blended.to_rgba8(under.alpha());
            slots.fill(Layer::EMPTY);
            *count = 0;
        }
    }
}
