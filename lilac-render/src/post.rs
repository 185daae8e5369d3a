//! Screen-space passes run over a finished frame: shadows and reflections.
//!
//! Both passes trace rays across the frame buffer with Bresenham walks, comparing the
//! ray's interpolated depth with the recorded [`Fragment`]s. Each row draws its jitter
//! from its own generator seeded from the frame seed, so rows can be processed in any
//! order, or in parallel, with identical results.

use rand::{Rng as _, SeedableRng as _};
use rand_xoshiro::Xoshiro256Plus;

use lilac::math::{ImageSize, Rgb, Rgba8, Vector};

use crate::frame::{Fragment, FrameBuffer};
use crate::raster::{Bresenham, pixel};
use crate::{ReflectionOptions, ShadowOptions};

/// A point light projected to the screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ScreenLight {
    pub x: f64,
    pub y: f64,
    pub depth: f64,
}

/// Read-only view of the recorded surfaces, for ray tests.
#[derive(Clone, Copy)]
struct Surfaces<'a> {
    size: ImageSize,
    fragments: &'a [Fragment],
}

impl Surfaces<'_> {
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        let width = self.size.width as usize;
        (x < width && y < self.size.height as usize).then_some(y * width + x)
    }

    /// Walks from `start` toward `end`, excluding `end` and the pixel of `origin`, and
    /// returns the index of the first foreground pixel of a surface other than
    /// `origin`'s whose depth is within `tolerance` of the ray's.
    ///
    /// Only the part of the segment that crosses the frame is walked.
    fn first_hit(
        &self,
        start: [f64; 3],
        end: [f64; 3],
        origin: (usize, &Fragment),
        tolerance: f64,
    ) -> Option<usize> {
        let (t0, t1) = clip_to_frame(start, end, self.size)?;
        let at = |t: f64| -> [f64; 3] {
            core::array::from_fn(|i| start[i] + (end[i] - start[i]) * t)
        };
        let (from, to) = (at(t0), at(t1));
        let walk = Bresenham::new(
            (pixel(from[0])?, pixel(from[1])?),
            (pixel(to[0])?, pixel(to[1])?),
        );
        let steps = walk.steps();
        // the last pixel is the ray's target unless clipping cut it off
        let count = if t1 < 1.0 { steps + 1 } else { steps };
        for (k, (x, y)) in walk.enumerate().take(usize::try_from(count).unwrap_or(0)) {
            let Some(index) = self.index(x, y) else {
                continue;
            };
            if index == origin.0 {
                continue;
            }
            let other = &self.fragments[index];
            let t = if steps == 0 {
                0.0
            } else {
                k as f64 / steps as f64
            };
            let ray_depth = from[2] + (to[2] - from[2]) * t;
            if other.is_foreground()
                && other.surface != origin.1.surface
                && (other.depth - ray_depth).abs() < tolerance
            {
                return Some(index);
            }
        }
        None
    }
}

/// Liang–Barsky clipping of the screen projection of a segment to the pixels of a frame.
///
/// Returns the parameter range `(t0, t1)` within `0..=1` that lies inside, or [`None`] if
/// the segment misses the frame.
fn clip_to_frame(start: [f64; 3], end: [f64; 3], size: ImageSize) -> Option<(f64, f64)> {
    let dx = end[0] - start[0];
    let dy = end[1] - start[1];
    let max_x = f64::from(size.width) - 0.5;
    let max_y = f64::from(size.height) - 0.5;
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [
        (-dx, start[0] + 0.5),
        (dx, max_x - start[0]),
        (-dy, start[1] + 0.5),
        (dy, max_y - start[1]),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else if p < 0.0 {
            t0 = t0.max(q / p);
        } else {
            t1 = t1.min(q / p);
        }
    }
    (t0 <= t1).then_some((t0, t1))
}

/// Offset of a jittered sample within the `i`th of `n` cells across `extent` pixels,
/// centered on zero.
fn jitter(rng: &mut Xoshiro256Plus, extent: u32, n: u32, i: u32) -> f64 {
    let extent = f64::from(extent);
    let n = f64::from(n);
    let i = f64::from(i);
    let lo = extent * i / n;
    let hi = extent * (i + 1.0) / n;
    lo + rng.random::<f64>() * (hi - lo) - extent / 2.0
}

fn row_rng(seed: u64, pass: u64, row: usize) -> Xoshiro256Plus {
    Xoshiro256Plus::seed_from_u64(
        seed ^ pass.rotate_left(32) ^ (row as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15),
    )
}

/// Runs `f(row_index, row)` over every row of `colors`, in parallel if enabled.
fn for_each_row<F>(colors: &mut [Rgba8], width: usize, f: F)
where
    F: Fn(usize, &mut [Rgba8]) + Send + Sync,
{
    #[cfg(feature = "auto-threads")]
    {
        use rayon::iter::{IndexedParallelIterator as _, ParallelIterator as _};
        use rayon::slice::ParallelSliceMut as _;

        // x.max(1) is zero-sized-frame protection; there will be zero chunks anyway.
        colors
            .par_chunks_mut(width.max(1))
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    }
    #[cfg(not(feature = "auto-threads"))]
    {
        colors
            .chunks_mut(width.max(1))
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    }
}

/// Darkens every foreground pixel by the fraction of its rays to each light that are
/// blocked by another surface.
///
/// Returns the number of pixels darkened.
pub(crate) fn shadow_pass(
    frame: &mut FrameBuffer,
    lights: &[ScreenLight],
    options: &ShadowOptions,
    seed: u64,
) -> usize {
    if lights.is_empty() {
        return 0;
    }
    let n = options.diffusion.max(1);
    let per_ray = options.darkness / f64::from(n).powi(2);
    let area = options.area;
    let tolerance = options.tolerance;

    let size = frame.size();
    let width = size.width as usize;
    let (colors, fragments) = frame.split_mut();
    let surfaces = Surfaces { size, fragments };
    let darkened = std::sync::atomic::AtomicUsize::new(0);

    for_each_row(colors, width, |y, row| {
        let mut rng = row_rng(seed, 1, y);
        for (x, color) in row.iter_mut().enumerate() {
            let index = y * width + x;
            let fragment = &surfaces.fragments[index];
            if !fragment.is_foreground() {
                continue;
            }
            let target = [x as f64, y as f64, fragment.depth];
            let mut shadow = 1.0;
            for light in lights {
                for i in 0..n {
                    for j in 0..n {
                        let start = [
                            light.x + jitter(&mut rng, area[0], n, i),
                            light.y + jitter(&mut rng, area[1], n, j),
                            light.depth,
                        ];
                        if let Some(hit) =
                            surfaces.first_hit(start, target, (index, fragment), tolerance)
                        {
                            shadow -= surfaces.fragments[hit].alpha * per_ray;
                        }
                    }
                }
            }
            if shadow < 1.0 {
                *color = (color.to_rgb() * shadow.max(0.0)).to_rgba8(color.alpha());
                darkened.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        }
    });
    darkened.into_inner()
}

/// Blends reflective pixels toward the colors their reflected light rays reach.
///
/// For each pixel with nonzero `beta`, the direction toward each jittered light sample
/// is mirrored about the pixel's normal and walked across the frame. A pixel whose rays
/// hit other surfaces with fraction `f` becomes
/// `own · (1 − beta·f) + beta·f · mean(hit colors)`.
///
/// Returns the number of pixels changed.
pub(crate) fn reflection_pass(
    frame: &mut FrameBuffer,
    lights: &[ScreenLight],
    options: &ReflectionOptions,
    seed: u64,
) -> usize {
    if lights.is_empty() {
        return 0;
    }
    let n = options.diffusion.max(1);
    let size = frame.size();
    let width = size.width as usize;
    let before: Vec<Rgba8> = frame.colors().to_vec();
    let (colors, fragments) = frame.split_mut();
    let surfaces = Surfaces { size, fragments };
    let changed = std::sync::atomic::AtomicUsize::new(0);

    for_each_row(colors, width, |y, row| {
        let mut rng = row_rng(seed, 2, y);
        for (x, color) in row.iter_mut().enumerate() {
            let index = y * width + x;
            let fragment = &surfaces.fragments[index];
            if !fragment.is_foreground() || !(fragment.beta > 0.0) {
                continue;
            }
            let Some(normal) = fragment.normal.normalize() else {
                continue;
            };

            let mut rays = 0u32;
            let mut hits = 0u32;
            let mut sum = Rgb::ZERO;
            for light in lights {
                for i in 0..n {
                    for j in 0..n {
                        let to_light = Vector::direction(
                            light.x + jitter(&mut rng, options.area[0], n, i) - x as f64,
                            light.y + jitter(&mut rng, options.area[1], n, j) - y as f64,
                            light.depth - fragment.depth,
                        );
                        let Some(l) = to_light.normalize() else {
                            continue;
                        };
                        let out = normal * (2.0 * l.dot(normal)) - l;
                        rays += 1;

                        let origin = [x as f64, y as f64, fragment.depth];
                        let along = |distance: f64| {
                            [
                                origin[0] + out.x * distance,
                                origin[1] + out.y * distance,
                                origin[2] + out.z * distance,
                            ]
                        };
                        if let Some(hit) = surfaces.first_hit(
                            along(options.offset),
                            along(options.offset + options.projection),
                            (index, fragment),
                            options.threshold,
                        ) {
                            hits += 1;
                            sum += before[hit].to_rgb();
                        }
                    }
                }
            }
            if hits == 0 {
                continue;
            }
            let fraction = f64::from(hits) / f64::from(rays);
            let weight = fragment.beta * fraction;
            let mean = sum * (1.0 / f64::from(hits));
            *color = (color.to_rgb() * (1.0 - weight) + mean * weight).to_rgba8(color.alpha());
            changed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    });
    changed.into_inner()
}
