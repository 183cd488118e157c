//! External contours of a binary mask and closed-polygon simplification.
//!
//! Components are 8-connected. Each component contributes exactly one
//! contour: its outer boundary, traced clockwise (image coordinates, y down)
//! from the component's first pixel in raster order. Holes are ignored.

use nalgebra::Point2;
use xqsight_core::GrayImageView;

/// Moore neighbourhood, clockwise starting at west.
const RING: [(i32, i32); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

#[derive(Clone, Debug, PartialEq)]
pub struct Contour {
    /// Boundary pixels in tracing order, closed implicitly.
    pub points: Vec<Point2<f32>>,
    /// Number of pixels in the traced component.
    pub pixel_count: usize,
}

impl Contour {
    pub fn area(&self) -> f32 {
        polygon_area(&self.points).abs()
    }

    pub fn perimeter(&self) -> f32 {
        arc_length_closed(&self.points)
    }
}

struct Mask<'a> {
    view: &'a GrayImageView<'a>,
}

impl Mask<'_> {
    #[inline]
    fn fg(&self, x: i32, y: i32) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.view.width
            && (y as usize) < self.view.height
            && self.view.data[y as usize * self.view.width + x as usize] != 0
    }
}

/// Outer boundaries of every 8-connected foreground component.
pub fn find_external_contours(mask: &GrayImageView<'_>) -> Vec<Contour> {
    let (w, h) = (mask.width, mask.height);
    let m = Mask { view: mask };
    let mut visited = vec![false; w * h];
    let mut out = Vec::new();
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if visited[idx] || mask.data[idx] == 0 {
                continue;
            }

            let mut pixel_count = 0usize;
            visited[idx] = true;
            stack.push((x as i32, y as i32));
            while let Some((cx, cy)) = stack.pop() {
                pixel_count += 1;
                for (dx, dy) in RING {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if m.fg(nx, ny) {
                        let nidx = ny as usize * w + nx as usize;
                        if !visited[nidx] {
                            visited[nidx] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            let points = trace_boundary(&m, (x as i32, y as i32), pixel_count);
            out.push(Contour {
                points,
                pixel_count,
            });
        }
    }
    out
}

/// Next boundary pixel after `c`, scanning clockwise from the backtrack `b`.
/// Returns the new pixel and its backtrack.
fn moore_step(m: &Mask<'_>, c: (i32, i32), b: (i32, i32)) -> Option<((i32, i32), (i32, i32))> {
    let rel = (b.0 - c.0, b.1 - c.1);
    let k = RING.iter().position(|&o| o == rel)?;
    for step in 1..=8 {
        let j = (k + step) % 8;
        let p = (c.0 + RING[j].0, c.1 + RING[j].1);
        if m.fg(p.0, p.1) {
            let prev = RING[(j + 7) % 8];
            return Some((p, (c.0 + prev.0, c.1 + prev.1)));
        }
    }
    None
}

fn trace_boundary(m: &Mask<'_>, start: (i32, i32), pixel_count: usize) -> Vec<Point2<f32>> {
    let to_pt = |p: (i32, i32)| Point2::new(p.0 as f32, p.1 as f32);

    // raster-first pixel: its west neighbour is background
    let mut c = start;
    let mut b = (start.0 - 1, start.1);
    let mut second = None;
    let mut pts = Vec::new();

    let cap = 4 * pixel_count + 16;
    for _ in 0..cap {
        let Some((n, nb)) = moore_step(m, c, b) else {
            pts.push(to_pt(c));
            break;
        };
        if c == start {
            match second {
                Some(s) if s == n => break,
                None => second = Some(n),
                _ => {}
            }
        }
        pts.push(to_pt(c));
        c = n;
        b = nb;
    }
    pts
}

/// Signed shoelace area; positive for clockwise order in image coordinates.
pub fn polygon_area(points: &[Point2<f32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        acc += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    (acc * 0.5) as f32
}

pub fn arc_length_closed(points: &[Point2<f32>]) -> f32 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .enumerate()
        .map(|(i, p)| (points[(i + 1) % points.len()] - p).norm())
        .sum()
}

fn dist_to_line(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len = ab.norm();
    if len <= f32::EPSILON {
        return (p - a).norm();
    }
    let ap = p - a;
    (ab.x * ap.y - ab.y * ap.x).abs() / len
}

/// Douglas-Peucker on the open chain `pts[lo..=hi]`; pushes kept vertices
/// excluding `pts[hi]`.
fn simplify_chain(
    pts: &[Point2<f32>],
    lo: usize,
    hi: usize,
    eps: f32,
    out: &mut Vec<Point2<f32>>,
) {
    let mut stack = vec![(lo, hi)];
    let mut keep = vec![false; hi - lo + 1];
    keep[0] = true;
    while let Some((a, b)) = stack.pop() {
        let mut best = (0.0f32, a);
        for i in a + 1..b {
            let d = dist_to_line(pts[i], pts[a], pts[b]);
            if d > best.0 {
                best = (d, i);
            }
        }
        if best.0 > eps {
            keep[best.1 - lo] = true;
            stack.push((a, best.1));
            stack.push((best.1, b));
        }
    }
    out.extend(
        keep[..keep.len() - 1]
            .iter()
            .enumerate()
            .filter(|(_, k)| **k)
            .map(|(i, _)| pts[lo + i]),
    );
}

/// Simplify a closed polygon with tolerance `eps` (pixels).
///
/// The ring is cut at its first vertex and at the vertex farthest from it;
/// both halves are simplified independently.
pub fn approx_poly_closed(points: &[Point2<f32>], eps: f32) -> Vec<Point2<f32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let far = points
        .iter()
        .enumerate()
        .skip(1)
        .max_by(|(_, a), (_, b)| {
            (*a - points[0])
                .norm_squared()
                .total_cmp(&(*b - points[0]).norm_squared())
        })
        .map(|(i, _)| i)
        .unwrap_or(1);

    let mut ring: Vec<Point2<f32>> = points.to_vec();
    ring.push(points[0]);

    let mut out = Vec::new();
    simplify_chain(&ring, 0, far, eps, &mut out);
    simplify_chain(&ring, far, ring.len() - 1, eps, &mut out);
    out
}
