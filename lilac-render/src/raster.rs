//! Scan conversion of lines, discs and polygons into pixel coordinates.
//!
//! These functions only decide which pixels are covered and what the interpolated
//! values there are; depth testing and shading are up to the caller's `plot` function.

/// A vertex in screen space, carrying `N` values to be interpolated across the shape.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct ScreenVertex<const N: usize> {
    /// Horizontal position in pixels.
    pub x: f64,
    /// Vertical position in pixels, downward.
    pub y: f64,
    /// Depth; smaller is nearer.
    pub depth: f64,
    /// Arbitrary values interpolated linearly in screen space.
    pub varyings: [f64; N],
}

impl<const N: usize> ScreenVertex<N> {
    /// Linear interpolation of every field; `t == 0` yields `self`.
    #[inline]
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self {
            x: mix(self.x, other.x),
            y: mix(self.y, other.y),
            depth: mix(self.depth, other.depth),
            varyings: core::array::from_fn(|i| mix(self.varyings[i], other.varyings[i])),
        }
    }
}

/// Iterator over the pixels of a Bresenham line, both endpoints included.
#[derive(Clone, Debug)]
pub struct Bresenham {
    x: i64,
    y: i64,
    end: (i64, i64),
    dx: i64,
    dy: i64,
    sx: i64,
    sy: i64,
    err: i64,
    done: bool,
}

impl Bresenham {
    #[allow(missing_docs)]
    pub fn new(start: (i64, i64), end: (i64, i64)) -> Self {
        let dx = (end.0 - start.0).abs();
        let dy = -(end.1 - start.1).abs();
        Self {
            x: start.0,
            y: start.1,
            end,
            dx,
            dy,
            sx: if start.0 < end.0 { 1 } else { -1 },
            sy: if start.1 < end.1 { 1 } else { -1 },
            err: dx + dy,
            done: false,
        }
    }

    /// Number of steps from start to end; the iterator yields one more pixel than this.
    pub fn steps(&self) -> i64 {
        self.dx.max(-self.dy)
    }
}

impl Iterator for Bresenham {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let current = (self.x, self.y);
        if current == self.end {
            self.done = true;
        } else {
            let e2 = 2 * self.err;
            if e2 >= self.dy {
                self.err += self.dy;
                self.x += self.sx;
            }
            if e2 <= self.dx {
                self.err += self.dx;
                self.y += self.sy;
            }
        }
        Some(current)
    }
}

/// Rounds a screen coordinate to the pixel containing it, or [`None`] if it is too large
/// to address.
#[inline]
pub fn pixel(coordinate: f64) -> Option<i64> {
    let rounded = coordinate.round();
    // beyond this any line would take longer to walk than to give up on
    (rounded.abs() < 1e9).then_some(rounded as i64)
}

/// Rasterizes a line between two screen points, endpoints included, calling
/// `plot(x, y, depth)` for each pixel. Depth is interpolated linearly.
///
/// Pixels outside the screen are still reported; the caller discards them.
pub fn line(from: [f64; 3], to: [f64; 3], mut plot: impl FnMut(i64, i64, f64)) {
    let (Some(x0), Some(y0), Some(x1), Some(y1)) =
        (pixel(from[0]), pixel(from[1]), pixel(to[0]), pixel(to[1]))
    else {
        return;
    };
    let walk = Bresenham::new((x0, y0), (x1, y1));
    let steps = walk.steps();
    for (i, (x, y)) in walk.enumerate() {
        let t = if steps == 0 {
            0.0
        } else {
            i as f64 / steps as f64
        };
        plot(x, y, from[2] + (to[2] - from[2]) * t);
    }
}

/// Fills a disc of `radius` pixels around a screen point, calling `plot(x, y)` for
/// each covered pixel. A radius of 0 covers one pixel.
pub fn disc(center: [f64; 2], radius: i32, mut plot: impl FnMut(i64, i64)) {
    let (Some(cx), Some(cy)) = (pixel(center[0]), pixel(center[1])) else {
        return;
    };
    let r = i64::from(radius.max(0));
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                plot(cx + dx, cy + dy);
            }
        }
    }
}

/// Returns whether every vertex lies beyond the same edge of a `width` × `height`
/// screen, in which case the polygon certainly covers no pixels.
///
/// Polygons that are not rejected by this test may still lie entirely off screen;
/// [`fill_polygon()`] only visits on-screen pixels regardless.
pub fn outside<const N: usize>(vertices: &[ScreenVertex<N>], width: u32, height: u32) -> bool {
    let (w, h) = (f64::from(width), f64::from(height));
    vertices.iter().all(|v| v.x < 0.0)
        || vertices.iter().all(|v| v.x >= w)
        || vertices.iter().all(|v| v.y < 0.0)
        || vertices.iter().all(|v| v.y >= h)
}

/// Scan-converts a simple polygon, calling `plot(x, y, interpolated)` for every on-screen
/// pixel whose center lies inside it.
///
/// Pixel centers lying exactly on a shared edge belong to only one of the polygons
/// sharing it, so meshes are drawn without gaps or double coverage.
pub fn fill_polygon<const N: usize>(
    vertices: &[ScreenVertex<N>],
    width: u32,
    height: u32,
    mut plot: impl FnMut(i64, i64, &ScreenVertex<N>),
) {
    if vertices.len() < 3 || outside(vertices, width, height) {
        return;
    }
    let (min_y, max_y) = vertices
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v.y), hi.max(v.y))
        });
    let first_row = (min_y - 0.5).ceil().max(0.0);
    let end_row = (max_y - 0.5).ceil().min(f64::from(height));
    if !(first_row < end_row) {
        return;
    }

    let mut crossings: Vec<ScreenVertex<N>> = Vec::with_capacity(vertices.len());
    for row in (first_row as i64)..(end_row as i64) {
        let yc = row as f64 + 0.5;
        crossings.clear();
        for (i, a) in vertices.iter().enumerate() {
            let b = &vertices[(i + 1) % vertices.len()];
            if (a.y <= yc) != (b.y <= yc) {
                crossings.push(a.lerp(b, (yc - a.y) / (b.y - a.y)));
            }
        }
        crossings.sort_by(|a, b| a.x.total_cmp(&b.x));

        for span in crossings.chunks_exact(2) {
            let [left, right] = span else { continue };
            let first = (left.x - 0.5).ceil().max(0.0);
            let end = (right.x - 0.5).ceil().min(f64::from(width));
            let extent = right.x - left.x;
            let mut x = first;
            while x < end {
                let t = if extent > 0.0 {
                    (x + 0.5 - left.x) / extent
                } else {
                    0.0
                };
                plot(x as i64, row, &left.lerp(right, t));
                x += 1.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn v(x: f64, y: f64) -> ScreenVertex<1> {
        ScreenVertex {
            x,
            y,
            depth: 0.0,
            varyings: [x],
        }
    }

    #[rstest]
    #[case((0, 0), (10, 0), 11)]
    #[case((0, 0), (0, -4), 5)]
    #[case((3, 3), (3, 3), 1)]
    #[case((0, 0), (7, 3), 8)]
    fn bresenham_counts(#[case] a: (i64, i64), #[case] b: (i64, i64), #[case] count: usize) {
        let pixels: Vec<_> = Bresenham::new(a, b).collect();
        assert_eq!(pixels.len(), count);
        assert_eq!(pixels.first(), Some(&a));
        assert_eq!(pixels.last(), Some(&b));
    }

    #[test]
    fn line_interpolates_depth() {
        let mut depths = Vec::new();
        line([0.0, 0.0, 0.0], [4.0, 0.0, 1.0], |_, _, d| depths.push(d));
        assert_eq!(depths, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn disc_sizes() {
        let mut n = 0;
        disc([5.0, 5.0], 0, |_, _| n += 1);
        assert_eq!(n, 1);
        n = 0;
        disc([5.0, 5.0], 1, |_, _| n += 1);
        assert_eq!(n, 5);
    }

    #[test]
    fn square_covers_pixel_centers() {
        let square = [v(1.0, 1.0), v(4.0, 1.0), v(4.0, 3.0), v(1.0, 3.0)];
        let mut covered = Vec::new();
        fill_polygon(&square, 10, 10, |x, y, _| covered.push((x, y)));
        assert_eq!(
            covered,
            vec![(1, 1), (2, 1), (3, 1), (1, 2), (2, 2), (3, 2)]
        );
    }

    #[test]
    fn adjacent_triangles_do_not_overlap() {
        let a = [v(0.0, 0.0), v(8.0, 0.0), v(8.0, 8.0)];
        let b = [v(0.0, 0.0), v(8.0, 8.0), v(0.0, 8.0)];
        let mut counts = vec![0; 64];
        for tri in [&a, &b] {
            fill_polygon(tri, 8, 8, |x, y, _| counts[(y * 8 + x) as usize] += 1);
        }
        assert!(counts.iter().all(|&c| c == 1), "{counts:?}");
    }

    #[test]
    fn interpolates_varyings() {
        let tri = [v(0.0, 0.0), v(10.0, 0.0), v(0.0, 10.0)];
        fill_polygon(&tri, 10, 10, |x, _, value| {
            assert!((value.varyings[0] - (x as f64 + 0.5)).abs() < 1e-9);
        });
    }

    #[test]
    fn offscreen_polygon_plots_nothing() {
        let tri = [v(-10.0, 0.0), v(-5.0, 0.0), v(-5.0, 5.0)];
        assert!(outside(&tri, 10, 10));
        let mut n = 0;
        fill_polygon(&tri, 10, 10, |_, _, _| n += 1);
        assert_eq!(n, 0);
    }

    #[test]
    fn straddling_polygon_is_clipped_to_screen() {
        let square = [v(-5.0, -5.0), v(15.0, -5.0), v(15.0, 15.0), v(-5.0, 15.0)];
        let mut n = 0;
        fill_polygon(&square, 4, 3, |x, y, _| {
            assert!((0..4).contains(&x) && (0..3).contains(&y));
            n += 1;
        });
        assert_eq!(n, 12);
    }
}
