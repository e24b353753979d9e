use image::{GrayImage, Rgb, RgbImage};
use imageproc::contours::find_contours;
use imageproc::drawing::draw_line_segment_mut;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;

use crate::geometry::polygon_area;
use crate::models::Point2D;

/// A traced border from the edge map, with its enclosed area
#[derive(Debug, Clone)]
pub struct Candidate {
    pub points: Vec<Point<i32>>,
    pub area: f64,
}

impl Candidate {
    pub fn perimeter(&self) -> f64 {
        arc_length(&self.points, true)
    }
}

/// Trace every border in the edge map and keep the `keep` largest by area.
///
/// Ties keep their tracing order.
pub fn find_candidates(edges: &GrayImage, keep: usize) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = find_contours::<i32>(edges)
        .into_iter()
        .map(|c| {
            let area = contour_area(&c.points);
            Candidate {
                points: c.points,
                area,
            }
        })
        .collect();

    candidates.sort_by(|a, b| b.area.total_cmp(&a.area));
    candidates.truncate(keep);
    candidates
}

/// Douglas-Peucker simplification with tolerance `accuracy * perimeter`.
///
/// The closed contour is first cut at two far-apart points: the point
/// farthest from the start, then the point farthest from that one. Each of
/// the two open chains between them is simplified separately, so both cut
/// points are kept as vertices.
///
/// Curves too short to simplify come back unchanged.
pub fn approximate_polygon(points: &[Point<i32>], accuracy: f64) -> Vec<Point<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let epsilon = accuracy * arc_length(points, true);
    if epsilon.is_nan() || epsilon <= 0.0 {
        return points.to_vec();
    }

    let first = farthest_from(points, 0);
    let second = farthest_from(points, first);
    if first == second {
        return vec![points[first]];
    }
    let (lo, hi) = (first.min(second), first.max(second));

    let head = approximate_polygon_dp(&points[lo..=hi], epsilon, false);
    let mut wrapped = points[hi..].to_vec();
    wrapped.extend_from_slice(&points[..=lo]);
    let tail = approximate_polygon_dp(&wrapped, epsilon, false);

    // Both chains end on the cut points
    let mut polygon = head;
    polygon.extend_from_slice(&tail[1..tail.len() - 1]);
    polygon
}

/// Index of the point farthest from `points[from]`; `from` itself when all coincide
fn farthest_from(points: &[Point<i32>], from: usize) -> usize {
    let origin = points[from];
    let mut best = from;
    let mut best_distance = 0i64;
    for (i, p) in points.iter().enumerate() {
        let dx = (p.x - origin.x) as i64;
        let dy = (p.y - origin.y) as i64;
        let distance = dx * dx + dy * dy;
        if distance > best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

/// Shoelace area of a closed integer contour
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    let pts: Vec<Point2D> = points.iter().map(to_point2d).collect();
    polygon_area(&pts)
}

pub fn to_point2d(p: &Point<i32>) -> Point2D {
    Point2D::new(p.x as f64, p.y as f64)
}

/// Draw a closed polyline, `thickness` pixels wide
pub fn draw_contour(canvas: &mut RgbImage, points: &[Point<i32>], colour: Rgb<u8>, thickness: u32) {
    if points.is_empty() {
        return;
    }
    for offset in 0..thickness.max(1) {
        let o = offset as f32;
        for (i, start) in points.iter().enumerate() {
            let end = &points[(i + 1) % points.len()];
            draw_line_segment_mut(
                canvas,
                (start.x as f32 + o, start.y as f32 + o),
                (end.x as f32 + o, end.y as f32 + o),
                colour,
            );
        }
    }
}
