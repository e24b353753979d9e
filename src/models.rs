use image::{DynamicImage, RgbImage};
use nalgebra::Matrix3;
use time::OffsetDateTime;

/// A coordinate in image space (y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn scaled(&self, ratio: f64) -> Self {
        Self {
            x: self.x * ratio,
            y: self.y * ratio,
        }
    }
}

/// Four corners of a surface outline.
///
/// Straight out of polygon approximation the points are in contour order;
/// after [`crate::geometry::classify_corners`] they are top-left, top-right,
/// bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral {
    pub points: [Point2D; 4],
}

impl Quadrilateral {
    pub fn new(points: [Point2D; 4]) -> Self {
        Self { points }
    }

    pub fn top_left(&self) -> Point2D {
        self.points[0]
    }

    pub fn top_right(&self) -> Point2D {
        self.points[1]
    }

    pub fn bottom_right(&self) -> Point2D {
        self.points[2]
    }

    pub fn bottom_left(&self) -> Point2D {
        self.points[3]
    }

    /// Multiply every corner by `ratio`
    pub fn scaled(&self, ratio: f64) -> Self {
        Self {
            points: self.points.map(|p| p.scaled(ratio)),
        }
    }
}

/// Inclusive column interval of the rectified image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    pub start: u32,
    pub end: u32,
}

impl ColumnRange {
    pub fn contains(&self, column: u32) -> bool {
        column >= self.start && column <= self.end
    }
}

/// A detected and rectified playing surface.
///
/// Built once per successful detection and never modified afterwards.
#[derive(Debug, Clone)]
pub struct PlayingSurface {
    pub name: String,
    /// Ordered corners in full-resolution frame coordinates
    pub contour: Quadrilateral,
    /// Ordered corners in working-frame coordinates, before scaling
    pub working_contour: Quadrilateral,
    /// Working frame with the accepted contour drawn on it
    pub annotated_frame: RgbImage,
    /// Top-down view, exactly `width x height`
    pub rectified_image: RgbImage,
    /// Contour area in working-frame pixels
    pub area: f64,
    /// `area` divided by the full-resolution frame area
    pub relative_area: f64,
    pub perspective_matrix: Matrix3<f64>,
    pub width: u32,
    pub height: u32,
    pub dealer_region: ColumnRange,
    pub player_region: ColumnRange,
    pub detected_at: OffsetDateTime,
}

impl PlayingSurface {
    /// Split the rectified width into the dealer (left) and player (right) halves
    pub fn regions_for_width(width: u32) -> (ColumnRange, ColumnRange) {
        let half = width / 2;
        (
            ColumnRange { start: 0, end: half },
            ColumnRange {
                start: half + 1,
                end: width,
            },
        )
    }

    pub fn rectified(&self) -> DynamicImage {
        DynamicImage::ImageRgb8(self.rectified_image.clone())
    }

    pub fn annotated(&self) -> DynamicImage {
        DynamicImage::ImageRgb8(self.annotated_frame.clone())
    }
}
