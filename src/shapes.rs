//! Shape rasterization primitives for pixel-exact annotation drawing.
//!
//! Shapes are given in integer pixel coordinates that may be negative or
//! lie far outside the target raster. Every function clips against a
//! [`Clip`] while walking the shape and hands each visible pixel to a
//! `plot` callback, so the work done is bounded by the raster size rather
//! than by the size of the shape.
//!
//! Coordinate differences are taken in `i64` and products in `i128`, so
//! any pair of `i32` coordinates is safe.

/// The visible area `[0, width) x [0, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clip {
    pub width: u32,
    pub height: u32,
}

impl Clip {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Visible part of the column range `[lo, hi]`.
    fn columns(&self, lo: i64, hi: i64) -> Option<(i64, i64)> {
        clamp_span(lo, hi, self.width)
    }

    /// Visible part of the row range `[lo, hi]`.
    fn rows(&self, lo: i64, hi: i64) -> Option<(i64, i64)> {
        clamp_span(lo, hi, self.height)
    }

    fn contains(&self, x: i64, y: i64) -> bool {
        (0..i64::from(self.width)).contains(&x) && (0..i64::from(self.height)).contains(&y)
    }

    fn plot(&self, x: i64, y: i64, plot: &mut dyn FnMut(u32, u32)) {
        if self.contains(x, y) {
            plot(x as u32, y as u32);
        }
    }
}

fn clamp_span(lo: i64, hi: i64, extent: u32) -> Option<(i64, i64)> {
    let lo = lo.max(0);
    let hi = hi.min(i64::from(extent) - 1);
    (lo <= hi).then_some((lo, hi))
}

/// `n / d` rounded to the nearest integer, halves rounded up.
fn div_round(n: i128, d: i128) -> i64 {
    let (n, d) = if d < 0 { (-n, -d) } else { (n, d) };
    (2 * n + d).div_euclid(2 * d) as i64
}

/// Rasterize a line between two points, both ends included.
///
/// The line is stepped along its major axis, one pixel per column (or row),
/// and only the visible part of that axis is walked.
///
/// # Examples
///
/// ```
/// use overlay_labels::shapes::{rasterize_line, Clip};
///
/// let mut pixels = Vec::new();
/// rasterize_line((0, 0), (3, 3), Clip::new(8, 8), &mut |x, y| pixels.push((x, y)));
/// assert_eq!(pixels, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
/// ```
pub fn rasterize_line(p0: (i32, i32), p1: (i32, i32), clip: Clip, plot: &mut dyn FnMut(u32, u32)) {
    let (x0, y0) = (i64::from(p0.0), i64::from(p0.1));
    let (x1, y1) = (i64::from(p1.0), i64::from(p1.1));
    let (dx, dy) = (x1 - x0, y1 - y0);

    if dx == 0 && dy == 0 {
        clip.plot(x0, y0, plot);
        return;
    }

    if dx.abs() >= dy.abs() {
        let Some((first, last)) = clip.columns(x0.min(x1), x0.max(x1)) else {
            return;
        };
        for x in first..=last {
            let y = y0 + div_round(i128::from(x - x0) * i128::from(dy), i128::from(dx));
            clip.plot(x, y, plot);
        }
    } else {
        let Some((first, last)) = clip.rows(y0.min(y1), y0.max(y1)) else {
            return;
        };
        for y in first..=last {
            let x = x0 + div_round(i128::from(y - y0) * i128::from(dx), i128::from(dy));
            clip.plot(x, y, plot);
        }
    }
}

/// Rasterize a filled box between two opposite corners, both included.
///
/// The corners may be given in any order.
///
/// # Examples
///
/// ```
/// use overlay_labels::shapes::{rasterize_box, Clip};
///
/// let mut count = 0;
/// rasterize_box((0, 0), (2, 1), Clip::new(8, 8), &mut |_, _| count += 1);
/// assert_eq!(count, 6);
/// ```
pub fn rasterize_box(c0: (i32, i32), c1: (i32, i32), clip: Clip, plot: &mut dyn FnMut(u32, u32)) {
    let (x0, x1) = (i64::from(c0.0.min(c1.0)), i64::from(c0.0.max(c1.0)));
    let (y0, y1) = (i64::from(c0.1.min(c1.1)), i64::from(c0.1.max(c1.1)));

    let (Some((left, right)), Some((top, bottom))) = (clip.columns(x0, x1), clip.rows(y0, y1))
    else {
        return;
    };
    for y in top..=bottom {
        for x in left..=right {
            plot(x as u32, y as u32);
        }
    }
}

/// Rasterize the closed outline through `vertices`, including the edge
/// from the last vertex back to the first.
///
/// One vertex yields a single pixel, two yield a line.
pub fn rasterize_outline(vertices: &[(i32, i32)], clip: Clip, plot: &mut dyn FnMut(u32, u32)) {
    match vertices {
        [] => {}
        [only] => clip.plot(i64::from(only.0), i64::from(only.1), plot),
        _ => {
            for (i, &start) in vertices.iter().enumerate() {
                let end = vertices[(i + 1) % vertices.len()];
                rasterize_line(start, end, clip, plot);
            }
        }
    }
}

/// Rasterize a filled polygon, outline included.
///
/// The interior uses an even-odd scanline fill over the visible rows. Each
/// edge covers the half-open span `[y_min, y_max)` so a vertex shared by
/// two edges is counted once; the outline then covers the boundary rows.
///
/// # Examples
///
/// ```
/// use overlay_labels::shapes::{rasterize_polygon, Clip};
///
/// let mut pixels = Vec::new();
/// rasterize_polygon(&[(0, 0), (4, 0), (2, 3)], Clip::new(8, 8), &mut |x, y| pixels.push((x, y)));
/// assert!(pixels.contains(&(2, 1)));
/// assert!(pixels.contains(&(2, 3)));
/// ```
pub fn rasterize_polygon(vertices: &[(i32, i32)], clip: Clip, plot: &mut dyn FnMut(u32, u32)) {
    rasterize_outline(vertices, clip, plot);

    if vertices.len() < 3 {
        return;
    }

    let min_y = vertices.iter().map(|&(_, y)| y).min().unwrap_or(0);
    let max_y = vertices.iter().map(|&(_, y)| y).max().unwrap_or(0);
    let Some((top, bottom)) = clip.rows(i64::from(min_y), i64::from(max_y)) else {
        return;
    };

    let mut intersections = Vec::with_capacity(vertices.len());
    for y in top..=bottom {
        intersections.clear();

        for (i, &(x1, y1)) in vertices.iter().enumerate() {
            let (x2, y2) = vertices[(i + 1) % vertices.len()];
            let (x1, y1, x2, y2) = (i64::from(x1), i64::from(y1), i64::from(x2), i64::from(y2));

            // Horizontal edges never cross a scanline
            if y1 == y2 {
                continue;
            }

            if y >= y1.min(y2) && y < y1.max(y2) {
                let offset = i128::from(y - y1) * i128::from(x2 - x1) / i128::from(y2 - y1);
                intersections.push(x1 + offset as i64);
            }
        }

        intersections.sort_unstable();

        for pair in intersections.chunks_exact(2) {
            if let Some((left, right)) = clip.columns(pair[0], pair[1]) {
                for x in left..=right {
                    plot(x as u32, y as u32);
                }
            }
        }
    }
}
