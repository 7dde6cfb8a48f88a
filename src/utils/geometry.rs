//! Geometry utilities: perspective transforms, resampling and polygon measures

use crate::models::Point;
use image::{GrayImage, Luma};
use imageproc::point::Point as PixelPoint;

/// Perspective transformation matrix (3x3)
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveTransform {
    a11: f32,
    a12: f32,
    a13: f32,
    a21: f32,
    a22: f32,
    a23: f32,
    a31: f32,
    a32: f32,
    a33: f32,
}

impl PerspectiveTransform {
    /// Create transform from 4 source points to 4 destination points
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        // Direct linear transform with a33 fixed to 1
        let mut a = [[0.0f32; 8]; 8];
        let mut b = [0.0f32; 8];

        for i in 0..4 {
            let (sx, sy) = (src[i].x, src[i].y);
            let (dx, dy) = (dst[i].x, dst[i].y);

            let row = i * 2;
            a[row] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy];
            b[row] = dx;
            a[row + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy];
            b[row + 1] = dy;
        }

        solve_linear_system(&a, &b).map(|s| Self {
            a11: s[0],
            a12: s[1],
            a13: s[2],
            a21: s[3],
            a22: s[4],
            a23: s[5],
            a31: s[6],
            a32: s[7],
            a33: 1.0,
        })
    }

    /// Transform a point using this perspective matrix
    pub fn transform(&self, p: &Point) -> Point {
        let denominator = self.a31 * p.x + self.a32 * p.y + self.a33;
        if denominator.abs() < 1e-10 {
            return Point::new(0.0, 0.0);
        }

        let x = (self.a11 * p.x + self.a12 * p.y + self.a13) / denominator;
        let y = (self.a21 * p.x + self.a22 * p.y + self.a23) / denominator;
        Point::new(x, y)
    }
}

/// Solve 8x8 linear system using Gaussian elimination
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(a: &[[f32; 8]; 8], b: &[f32; 8]) -> Option<[f32; 8]> {
    let mut a = *a;
    let mut b = *b;
    let n = 8;

    for i in 0..n {
        let mut max_val = a[i][i].abs();
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k][i].abs() > max_val {
                max_val = a[k][i].abs();
                max_row = k;
            }
        }

        // Singular
        if max_val < 1e-10 {
            return None;
        }

        if max_row != i {
            a.swap(i, max_row);
            b.swap(i, max_row);
        }

        for k in (i + 1)..n {
            let factor = a[k][i] / a[i][i];
            b[k] -= factor * b[i];
            for j in i..n {
                a[k][j] -= factor * a[i][j];
            }
        }
    }

    let mut x = [0.0f32; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }
        if a[i][i].abs() < 1e-10 {
            return None;
        }
        x[i] = sum / a[i][i];
    }

    Some(x)
}

/// Bilinear sample at a sub-pixel location; `None` outside the image.
pub fn sample_bilinear(gray: &GrayImage, x: f32, y: f32) -> Option<f32> {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 || x < -0.5 || y < -0.5 || x > w as f32 - 0.5 || y > h as f32 - 0.5 {
        return None;
    }
    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p = |px: u32, py: u32| gray.get_pixel(px, py).0[0] as f32;
    let top = p(x0, y0) * (1.0 - fx) + p(x1, y0) * fx;
    let bottom = p(x0, y1) * (1.0 - fx) + p(x1, y1) * fx;
    Some(top * (1.0 - fy) + bottom * fy)
}

/// Build an output image by pulling every output pixel from `map(x, y)` in the source.
///
/// Locations that fall outside the source get `fill`.
pub fn remap<F>(gray: &GrayImage, width: u32, height: u32, fill: u8, map: F) -> GrayImage
where
    F: Fn(f32, f32) -> Point,
{
    let mut out = GrayImage::from_pixel(width, height, Luma([fill]));
    for y in 0..height {
        for x in 0..width {
            let src = map(x as f32, y as f32);
            if let Some(v) = sample_bilinear(gray, src.x, src.y) {
                out.put_pixel(x, y, Luma([v.round().clamp(0.0, 255.0) as u8]));
            }
        }
    }
    out
}

/// Warp the quadrilateral `corners` (TL, TR, BR, BL) onto a `width` x `height` rectangle.
pub fn warp_quad(
    gray: &GrayImage,
    corners: &[Point; 4],
    width: u32,
    height: u32,
) -> Option<GrayImage> {
    if width == 0 || height == 0 {
        return None;
    }
    let (w, h) = ((width - 1) as f32, (height - 1) as f32);
    let rect = [
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(w, h),
        Point::new(0.0, h),
    ];
    // Map destination pixels back into the photo.
    let inverse = PerspectiveTransform::from_points(&rect, corners)?;
    Some(remap(gray, width, height, 255, |x, y| {
        inverse.transform(&Point::new(x, y))
    }))
}

/// Rotate the whole image clockwise by `theta` radians about `center`, keeping its size.
pub fn rotate_about(gray: &GrayImage, center: &Point, theta: f32, fill: u8) -> GrayImage {
    let (w, h) = gray.dimensions();
    remap(gray, w, h, fill, |x, y| {
        Point::new(x, y).rotate_about(center, -theta)
    })
}

/// Order four corners as (top-left, top-right, bottom-right, bottom-left).
///
/// Top-left has the smallest x+y, bottom-right the largest; top-right has
/// the smallest y-x, bottom-left the largest.
pub fn order_corners(points: &[Point; 4]) -> [Point; 4] {
    let by = |key: fn(&Point) -> f32, largest: bool| {
        let mut best = points[0];
        for p in &points[1..] {
            let better = if largest { key(p) > key(&best) } else { key(p) < key(&best) };
            if better {
                best = *p;
            }
        }
        best
    };
    let sum = |p: &Point| p.x + p.y;
    let diff = |p: &Point| p.y - p.x;
    [by(sum, false), by(diff, false), by(sum, true), by(diff, true)]
}

/// Absolute area enclosed by a closed polygon (shoelace formula).
pub fn polygon_area(points: &[Point]) -> f32 {
    signed_area(points).abs()
}

fn signed_area(points: &[Point]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        acc += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    (acc / 2.0) as f32
}

/// Length of a closed polyline, including the closing segment.
pub fn closed_perimeter(points: &[Point]) -> f32 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .enumerate()
        .map(|(i, p)| p.distance(&points[(i + 1) % points.len()]))
        .sum()
}

/// Area centroid of a closed polygon; vertex mean when the area vanishes.
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::default();
    }
    let a = signed_area(points) as f64;
    if a.abs() > 1e-6 {
        let (mut cx, mut cy) = (0.0f64, 0.0f64);
        for (i, p) in points.iter().enumerate() {
            let q = &points[(i + 1) % points.len()];
            let cross = p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
            cx += (p.x as f64 + q.x as f64) * cross;
            cy += (p.y as f64 + q.y as f64) * cross;
        }
        return Point::new((cx / (6.0 * a)) as f32, (cy / (6.0 * a)) as f32);
    }
    let n = points.len() as f32;
    let sx: f32 = points.iter().map(|p| p.x).sum();
    let sy: f32 = points.iter().map(|p| p.y).sum();
    Point::new(sx / n, sy / n)
}

/// Axis-aligned bounds `(min_x, min_y, max_x, max_y)`; `None` for no points.
pub fn bounds(points: &[Point]) -> Option<(f32, f32, f32, f32)> {
    let first = points.first()?;
    Some(points.iter().fold(
        (first.x, first.y, first.x, first.y),
        |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
    ))
}

fn segment_distance(p: &Point, a: &Point, b: &Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq < 1e-12 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(&Point::new(a.x + t * dx, a.y + t * dy))
}

/// Douglas-Peucker simplification of an open polyline; keeps both endpoints.
fn simplify_open(points: &[Point], epsilon: f32) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let mut max_dist = 0.0;
        let mut index = start;
        for i in (start + 1)..end {
            let d = segment_distance(&points[i], &points[start], &points[end]);
            if d > max_dist {
                max_dist = d;
                index = i;
            }
        }
        if max_dist > epsilon {
            keep[index] = true;
            stack.push((start, index));
            stack.push((index, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Simplify a closed contour to a polygon with tolerance `epsilon`.
///
/// The contour is split at the vertex farthest from its first point and
/// each half is simplified separately, so the result does not depend on a
/// closing segment of zero length.
pub fn approximate_closed_polygon(points: &[Point], epsilon: f32) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let start = points[0];
    let (far, _) = points
        .iter()
        .enumerate()
        .fold((0usize, 0.0f32), |(bi, bd), (i, p)| {
            let d = p.distance(&start);
            if d > bd { (i, d) } else { (bi, bd) }
        });
    if far == 0 {
        return vec![start];
    }

    let first = simplify_open(&points[..=far], epsilon);
    let mut second_half: Vec<Point> = points[far..].to_vec();
    second_half.push(start);
    let second = simplify_open(&second_half, epsilon);

    let mut polygon = first;
    // Skip the shared split vertex and the closing copy of the start.
    polygon.extend_from_slice(&second[1..second.len() - 1]);
    polygon
}

/// Minimum-area enclosing rectangle of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinAreaRect {
    /// Rectangle centre.
    pub center: Point,
    /// Side length along `angle`.
    pub width: f32,
    /// Side length perpendicular to `angle`.
    pub height: f32,
    /// Direction of the `width` side in degrees, clockwise from +x (y down).
    pub angle: f32,
}

impl MinAreaRect {
    /// Fit the rectangle by testing every convex hull edge direction.
    pub fn from_contour(contour: &[PixelPoint<i32>]) -> Option<Self> {
        if contour.is_empty() {
            return None;
        }
        let hull: Vec<Point> = imageproc::geometry::convex_hull(contour)
            .into_iter()
            .map(Point::from)
            .collect();
        if hull.len() < 3 {
            let (x0, y0, x1, y1) = bounds(&hull)?;
            return Some(Self {
                center: Point::new((x0 + x1) / 2.0, (y0 + y1) / 2.0),
                width: x1 - x0,
                height: y1 - y0,
                angle: 0.0,
            });
        }

        let mut best: Option<(f32, Self)> = None;
        for (i, a) in hull.iter().enumerate() {
            let b = &hull[(i + 1) % hull.len()];
            let theta = (b.y - a.y).atan2(b.x - a.x);
            let (sin, cos) = theta.sin_cos();

            let (mut u0, mut u1, mut v0, mut v1) = (f32::MAX, f32::MIN, f32::MAX, f32::MIN);
            for p in &hull {
                let u = p.x * cos + p.y * sin;
                let v = -p.x * sin + p.y * cos;
                u0 = u0.min(u);
                u1 = u1.max(u);
                v0 = v0.min(v);
                v1 = v1.max(v);
            }

            let area = (u1 - u0) * (v1 - v0);
            if best.as_ref().is_none_or(|(best_area, _)| area < *best_area) {
                let (uc, vc) = ((u0 + u1) / 2.0, (v0 + v1) / 2.0);
                let rect = Self {
                    center: Point::new(uc * cos - vc * sin, uc * sin + vc * cos),
                    width: u1 - u0,
                    height: v1 - v0,
                    angle: theta.to_degrees(),
                };
                best = Some((area, rect));
            }
        }
        best.map(|(_, rect)| rect)
    }

    /// Smallest rotation in degrees, in `[-45, 45)`, that makes the rectangle axis-aligned.
    ///
    /// Rotating the image clockwise by `-deskew_angle()` levels the sides.
    pub fn deskew_angle(&self) -> f32 {
        let mut angle = if self.height > self.width {
            self.angle + 90.0
        } else {
            self.angle
        };
        angle = angle.rem_euclid(90.0);
        if angle >= 45.0 {
            angle -= 90.0;
        }
        angle
    }
}
