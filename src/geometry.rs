//! Pure geometry helpers used by the surface detector.
//!
//! Corner ordering, size estimation and 4-point homographies. Nothing here
//! touches pixels.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use thiserror::Error;

use crate::models::{Point2D, Quadrilateral};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("perspective system is singular; corners are degenerate")]
    SingularSystem,
}

/// Order four points as top-left, top-right, bottom-right, bottom-left.
///
/// Top-left has the smallest `x + y`, bottom-right the largest. Of the two
/// points left over, top-right has the smallest `y - x` and bottom-left the
/// largest. Ties go to the first point in input order, so duplicate or
/// collinear input gives a meaningless (but well-defined) ordering.
pub fn classify_corners(points: [Point2D; 4]) -> Quadrilateral {
    let sums = points.map(|p| p.x + p.y);
    let top_left = first_argmin(&sums);
    let bottom_right = first_argmax(&sums);

    // When every sum ties both picks land on index 0; keep the first two
    // leftovers so the result still has four entries.
    let rest: Vec<Point2D> = (0..4)
        .filter(|&i| i != top_left && i != bottom_right)
        .map(|i| points[i])
        .take(2)
        .collect();

    let diffs: Vec<f64> = rest.iter().map(|p| p.y - p.x).collect();
    let top_right = rest[first_argmin(&diffs)];
    let bottom_left = rest[first_argmax(&diffs)];

    Quadrilateral::new([
        points[top_left],
        top_right,
        points[bottom_right],
        bottom_left,
    ])
}

fn first_argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v < values[best] {
            best = i;
        }
    }
    best
}

fn first_argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Estimate output `(width, height)` from an ordered quadrilateral.
///
/// Width is the longer of the top and bottom edges, height the longer of the
/// left and right edges, each truncated to whole pixels.
pub fn estimate_dimensions(quad: &Quadrilateral) -> (u32, u32) {
    let width_bottom = quad.bottom_right().distance(&quad.bottom_left()) as u32;
    let width_top = quad.top_right().distance(&quad.top_left()) as u32;
    let height_right = quad.top_right().distance(&quad.bottom_right()) as u32;
    let height_left = quad.top_left().distance(&quad.bottom_left()) as u32;
    (width_bottom.max(width_top), height_right.max(height_left))
}

/// Corners of a `width x height` output image, ordered like a classified quadrilateral
pub fn destination_rectangle(width: u32, height: u32) -> Quadrilateral {
    let w = width as f64 - 1.0;
    let h = height as f64 - 1.0;
    Quadrilateral::new([
        Point2D::new(0.0, 0.0),
        Point2D::new(w, 0.0),
        Point2D::new(w, h),
        Point2D::new(0.0, h),
    ])
}

/// Homography taking each `src` corner onto the matching `dst` corner.
///
/// Solves the 8x8 system for the eight free entries with `h33 = 1`. Both
/// quadrilaterals must use the same corner order.
pub fn perspective_matrix(
    src: &Quadrilateral,
    dst: &Quadrilateral,
) -> Result<Matrix3<f64>, GeometryError> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for i in 0..4 {
        let (x, y) = (src.points[i].x, src.points[i].y);
        let (u, v) = (dst.points[i].x, dst.points[i].y);

        // u = (h0 x + h1 y + h2) / (h6 x + h7 y + 1)
        a[(i, 0)] = x;
        a[(i, 1)] = y;
        a[(i, 2)] = 1.0;
        a[(i, 6)] = -x * u;
        a[(i, 7)] = -y * u;
        b[i] = u;

        // v = (h3 x + h4 y + h5) / (h6 x + h7 y + 1)
        a[(i + 4, 3)] = x;
        a[(i + 4, 4)] = y;
        a[(i + 4, 5)] = 1.0;
        a[(i + 4, 6)] = -x * v;
        a[(i + 4, 7)] = -y * v;
        b[i + 4] = v;
    }

    let h = a.lu().solve(&b).ok_or(GeometryError::SingularSystem)?;
    if h.iter().any(|v| !v.is_finite()) {
        return Err(GeometryError::SingularSystem);
    }

    Ok(Matrix3::new(
        h[0], h[1], h[2], //
        h[3], h[4], h[5], //
        h[6], h[7], 1.0,
    ))
}

/// Map a point through a homography
pub fn project(h: &Matrix3<f64>, point: Point2D) -> Point2D {
    let p = h * Vector3::new(point.x, point.y, 1.0);
    if p[2].abs() < 1e-15 {
        return Point2D::new(f64::NAN, f64::NAN);
    }
    Point2D::new(p[0] / p[2], p[1] / p[2])
}

/// Row-major `f32` copy of a homography, the layout `imageproc` projections take
pub fn to_row_major_f32(h: &Matrix3<f64>) -> [f32; 9] {
    let mut out = [0.0f32; 9];
    for r in 0..3 {
        for c in 0..3 {
            out[r * 3 + c] = h[(r, c)] as f32;
        }
    }
    out
}

/// Unsigned polygon area via the shoelace formula
pub fn polygon_area(points: &[Point2D]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            points[i].x * points[j].y - points[j].x * points[i].y
        })
        .sum();
    twice.abs() / 2.0
}
