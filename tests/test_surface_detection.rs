//! Integration tests for surface detection on synthetic frames.
//!
//! Tests cover:
//! - Fixed rectified output size for any outline
//! - Corner ordering and scaling back to full resolution
//! - Corner recovery on tilted outlines
//! - Frames without contours or without a four-sided shape
//! - The relative-area cutoff, boundary included
//! - Debug stage images

mod common;

use common::*;
use imageproc::point::Point;
use surfacecam::detection::contours::approximate_polygon;
use surfacecam::detection::meets_cutoff;
use surfacecam::{DetectionMiss, DetectorParams, SurfaceDetector};

fn assert_near(actual: (f64, f64), expected: (f64, f64), tolerance: f64) {
    let dx = (actual.0 - expected.0).abs();
    let dy = (actual.1 - expected.1).abs();
    assert!(
        dx <= tolerance && dy <= tolerance,
        "corner {:?} is not within {} of {:?}",
        actual,
        tolerance,
        expected
    );
}

#[test]
fn test_large_rectangle_is_rectified_to_fixed_size() -> anyhow::Result<()> {
    // 1. A bright rectangle covering most of the frame
    let frame = rectangle_frame(100, 80, 440, 320, SURFACE_FILL);
    let detector = SurfaceDetector::new();

    // 2. Detect
    let surface = detector
        .try_detect(&frame)
        .map_err(|miss| anyhow::anyhow!("expected a surface: {}", miss))?;

    // 3. Output size is fixed regardless of the outline
    assert_eq!(surface.width, 1440);
    assert_eq!(surface.height, 800);
    assert_eq!(surface.rectified_image.dimensions(), (1440, 800));
    assert_eq!(surface.name, "primary");

    // 4. Regions split the rectified width
    assert_eq!((surface.dealer_region.start, surface.dealer_region.end), (0, 720));
    assert_eq!((surface.player_region.start, surface.player_region.end), (721, 1440));
    assert!(surface.dealer_region.contains(720) && !surface.player_region.contains(720));

    // 5. The warp shows the surface, not the background
    let centre = surface.rectified_image.get_pixel(720, 400);
    assert!(centre[0] > 180, "rectified centre should be the surface, got {:?}", centre);

    // 6. Annotated frame is the 300 px working copy
    assert_eq!(surface.annotated_frame.height(), 300);
    assert_eq!(surface.annotated_frame.width(), 400);

    Ok(())
}

#[test]
fn test_corners_are_ordered_and_scaled_to_full_resolution() -> anyhow::Result<()> {
    let frame = rectangle_frame(100, 80, 440, 320, SURFACE_FILL);
    let surface = SurfaceDetector::new()
        .try_detect(&frame)
        .map_err(|miss| anyhow::anyhow!("expected a surface: {}", miss))?;

    let c = surface.contour;
    assert_near((c.top_left().x, c.top_left().y), (100.0, 80.0), 8.0);
    assert_near((c.top_right().x, c.top_right().y), (540.0, 80.0), 8.0);
    assert_near((c.bottom_right().x, c.bottom_right().y), (540.0, 400.0), 8.0);
    assert_near((c.bottom_left().x, c.bottom_left().y), (100.0, 400.0), 8.0);

    // Working corners scale by 480 / 300
    let w = surface.working_contour;
    for (full, working) in c.points.iter().zip(w.points.iter()) {
        assert!((full.x - working.x * 1.6).abs() < 1e-9);
        assert!((full.y - working.y * 1.6).abs() < 1e-9);
    }

    // Area is measured on the working copy: about 275 x 200 px
    assert!(surface.area > 50_000.0 && surface.area < 60_000.0, "area {}", surface.area);
    let expected_relative = surface.area / (640.0 * 480.0);
    assert!((surface.relative_area - expected_relative).abs() < 1e-12);

    Ok(())
}

#[test]
fn test_tilted_quadrilateral_still_gives_fixed_size() -> anyhow::Result<()> {
    let frame = quad_frame([(150, 100), (500, 125), (560, 420), (90, 380)], SURFACE_FILL);
    let surface = SurfaceDetector::new()
        .try_detect(&frame)
        .map_err(|miss| anyhow::anyhow!("expected a surface: {}", miss))?;

    assert_eq!(surface.rectified_image.dimensions(), (1440, 800));
    let c = surface.contour;
    assert_near((c.top_left().x, c.top_left().y), (150.0, 100.0), 10.0);
    assert_near((c.top_right().x, c.top_right().y), (500.0, 125.0), 10.0);
    assert_near((c.bottom_right().x, c.bottom_right().y), (560.0, 420.0), 10.0);
    assert_near((c.bottom_left().x, c.bottom_left().y), (90.0, 380.0), 10.0);

    Ok(())
}

/// Every pixel step along the closed outline through `corners`
fn traced_outline(corners: &[(i32, i32)]) -> Vec<Point<i32>> {
    let mut outline = Vec::new();
    for (i, &(x0, y0)) in corners.iter().enumerate() {
        let (x1, y1) = corners[(i + 1) % corners.len()];
        let steps = (x1 - x0).abs().max((y1 - y0).abs());
        for s in 0..steps {
            let t = s as f64 / steps as f64;
            outline.push(Point::new(
                (x0 as f64 + t * (x1 - x0) as f64).round() as i32,
                (y0 as f64 + t * (y1 - y0) as f64).round() as i32,
            ));
        }
    }
    outline
}

#[test]
fn test_approximate_polygon_keeps_tilted_corners() {
    let corners = [(94, 62), (312, 78), (350, 262), (56, 238)];
    let outline = traced_outline(&corners);

    // Start the closed curve mid-edge, as a tracer might
    for start in [0, outline.len() / 7, outline.len() / 3, outline.len() - 5] {
        let mut rotated = outline[start..].to_vec();
        rotated.extend_from_slice(&outline[..start]);

        let polygon = approximate_polygon(&rotated, 0.02);
        assert_eq!(polygon.len(), 4, "start {}: {:?}", start, polygon);
        for &(x, y) in &corners {
            let near = polygon
                .iter()
                .any(|p| (p.x - x).abs() <= 2 && (p.y - y).abs() <= 2);
            assert!(near, "start {}: corner ({}, {}) missing from {:?}", start, x, y, polygon);
        }
    }
}

#[test]
fn test_uniform_frame_has_no_surface() {
    let frame = uniform_frame(640, 480, BACKGROUND);
    let detector = SurfaceDetector::new();

    assert!(detector.detect(&frame).is_none());
    assert_eq!(detector.try_detect(&frame).err(), Some(DetectionMiss::NoContours));
}

#[test]
fn test_round_shape_has_no_quadrilateral_candidate() {
    let frame = disc_frame((320, 240), 150, SURFACE_FILL);
    let detector = SurfaceDetector::new();

    assert!(detector.detect(&frame).is_none());
    assert!(matches!(
        detector.try_detect(&frame),
        Err(DetectionMiss::NoCandidateFound { candidates }) if candidates > 0
    ));
}

#[test]
fn test_small_quadrilateral_is_rejected_by_cutoff() -> anyhow::Result<()> {
    // 1. 160x120 at full resolution is 100x75 working pixels: ~2.4% of the frame
    let frame = rectangle_frame(240, 180, 160, 120, SURFACE_FILL);
    let detector = SurfaceDetector::new();

    assert!(detector.detect(&frame).is_none());
    let relative_area = match detector.try_detect(&frame) {
        Err(DetectionMiss::BelowAreaThreshold { relative_area, cutoff }) => {
            assert_eq!(cutoff, 0.03);
            relative_area
        }
        other => anyhow::bail!("expected an area rejection, got {:?}", other.err()),
    };
    assert!(relative_area > 0.0 && relative_area < 0.03);

    // 2. A cutoff exactly at the measured ratio accepts the same frame
    let at_boundary = SurfaceDetector::new().with_cutoff(relative_area);
    let surface = at_boundary
        .detect(&frame)
        .ok_or_else(|| anyhow::anyhow!("cutoff should be inclusive"))?;
    assert_eq!(surface.relative_area, relative_area);

    // 3. Anything above it rejects again
    let above = SurfaceDetector::new().with_cutoff(relative_area + 1e-9);
    assert!(above.detect(&frame).is_none());

    Ok(())
}

#[test]
fn test_meets_cutoff_is_inclusive() {
    assert!(meets_cutoff(0.03, 0.03));
    assert!(meets_cutoff(0.5, 0.03));
    assert!(!meets_cutoff(0.029_999, 0.03));
}

#[test]
fn test_default_params() {
    let params = DetectorParams::default();
    assert_eq!(params.output_size(), (1440, 800));
    assert_eq!(params.processing_height, 300);
    assert_eq!(params.max_candidates, 5);
    assert_eq!(params.cutoff, 0.03);
}

#[test]
fn test_debug_output_writes_stage_images() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let detector = SurfaceDetector::new().with_debug(dir.path().to_path_buf())?;

    let frame = rectangle_frame(100, 80, 440, 320, SURFACE_FILL);
    assert!(detector.detect(&frame).is_some());
    assert!(detector.detect(&uniform_frame(640, 480, BACKGROUND)).is_none());

    let first = dir.path().join("0001");
    for stage in ["00_input", "01_working", "02_grayscale", "03_smoothed", "04_edges", "05_contoured", "06_rectified"] {
        assert!(first.join(format!("{}.png", stage)).exists(), "missing {}", stage);
    }

    // The miss stops after the edge map
    let second = dir.path().join("0002");
    assert!(second.join("04_edges.png").exists());
    assert!(!second.join("06_rectified.png").exists());

    Ok(())
}
