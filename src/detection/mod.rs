pub mod preprocessing;
pub mod contours;
pub mod rectify;

use image::{DynamicImage, Rgb};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use time::OffsetDateTime;

use crate::config::DetectorParams;
use crate::geometry::{
    classify_corners, destination_rectangle, estimate_dimensions, perspective_matrix,
    polygon_area,
};
use crate::models::{PlayingSurface, Point2D};

/// Colour the accepted outline is drawn in
pub const CONTOUR_COLOUR: Rgb<u8> = Rgb([0, 180, 255]);

/// Why a frame produced no surface. None of these are fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionMiss {
    #[error("no contours in edge map")]
    NoContours,
    #[error("none of the {candidates} largest contours is a quadrilateral")]
    NoCandidateFound { candidates: usize },
    #[error("quadrilateral corners are degenerate")]
    DegenerateCorners,
    #[error("relative area {relative_area:.4} is below cutoff {cutoff}")]
    BelowAreaThreshold { relative_area: f64, cutoff: f64 },
}

/// Anything that can turn a frame into an optional surface
pub trait Detect {
    fn detect(&self, frame: &DynamicImage) -> Option<PlayingSurface>;
}

impl<T: Detect + ?Sized> Detect for &T {
    fn detect(&self, frame: &DynamicImage) -> Option<PlayingSurface> {
        (**self).detect(frame)
    }
}

/// `true` when a surface of `relative_area` is large enough to accept
pub fn meets_cutoff(relative_area: f64, cutoff: f64) -> bool {
    relative_area >= cutoff
}

/// Finds the largest quadrilateral in a frame and rectifies it
pub struct SurfaceDetector {
    pub params: DetectorParams,
    dumps: AtomicUsize,
}

impl SurfaceDetector {
    pub fn new() -> Self {
        Self::with_params(DetectorParams::default())
    }

    pub fn with_params(params: DetectorParams) -> Self {
        Self {
            params,
            dumps: AtomicUsize::new(0),
        }
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.params.cutoff = cutoff;
        self
    }

    /// Write stage images of every detection below `output_dir`
    pub fn with_debug(mut self, output_dir: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&output_dir)?;
        self.params.debug_out = Some(output_dir);
        Ok(self)
    }

    /// Detect the playing surface, or `None` if this frame has none
    pub fn detect(&self, frame: &DynamicImage) -> Option<PlayingSurface> {
        match self.try_detect(frame) {
            Ok(surface) => Some(surface),
            Err(miss) => {
                debug!("No playing surface: {}", miss);
                None
            }
        }
    }

    /// Like [`SurfaceDetector::detect`] but reports why nothing was found
    pub fn try_detect(&self, frame: &DynamicImage) -> Result<PlayingSurface, DetectionMiss> {
        let p = &self.params;
        let dump = self.next_dump();
        if let Some(d) = &dump {
            d.save("00_input", frame);
        }

        // Step 1: work on a small copy, keep the original for the warp
        let ratio = frame.height() as f64 / p.processing_height as f64;
        let working = preprocessing::resize_to_height(frame, p.processing_height);
        debug!(
            "Working copy {}x{} (ratio {:.3} to {}x{})",
            working.width(),
            working.height(),
            ratio,
            frame.width(),
            frame.height()
        );

        // Step 2: edges
        let gray = preprocessing::to_grayscale(&working);
        let smoothed = preprocessing::bilateral_smooth(
            &gray,
            p.bilateral_window,
            p.bilateral_sigma_color,
            p.bilateral_sigma_spatial,
        );
        let edges = preprocessing::detect_edges(&smoothed, p.canny_low, p.canny_high);
        if let Some(d) = &dump {
            d.save("01_working", &working);
            d.save("02_grayscale", &DynamicImage::ImageLuma8(gray));
            d.save("03_smoothed", &DynamicImage::ImageLuma8(smoothed));
            d.save("04_edges", &DynamicImage::ImageLuma8(edges.clone()));
        }

        // Step 3: largest contours first
        let candidates = contours::find_candidates(&edges, p.max_candidates);
        if candidates.is_empty() {
            return Err(DetectionMiss::NoContours);
        }
        debug!("Trying {} candidate contours", candidates.len());

        // Step 4: the first one that simplifies to four vertices wins
        let (outline, approx) = candidates
            .iter()
            .enumerate()
            .find_map(|(i, c)| {
                let approx = contours::approximate_polygon(&c.points, p.poly_accuracy);
                debug!(
                    "  Candidate {}: area={:.1}, perimeter={:.1}, vertices={}",
                    i + 1,
                    c.area,
                    c.perimeter(),
                    approx.len()
                );
                (approx.len() == 4).then_some((c, approx))
            })
            .ok_or(DetectionMiss::NoCandidateFound {
                candidates: candidates.len(),
            })?;

        let vertices: [Point2D; 4] = [
            contours::to_point2d(&approx[0]),
            contours::to_point2d(&approx[1]),
            contours::to_point2d(&approx[2]),
            contours::to_point2d(&approx[3]),
        ];

        // Steps 5 & 6: order corners, then map them to full resolution
        let working_contour = classify_corners(vertices);
        let contour = working_contour.scaled(ratio);

        let (estimated_width, estimated_height) = estimate_dimensions(&contour);
        debug!(
            "Outline spans roughly {}x{} px; output size stays fixed",
            estimated_width, estimated_height
        );

        // Step 7
        let (width, height) = p.output_size();
        let destination = destination_rectangle(width, height);

        // Step 8
        let matrix = perspective_matrix(&contour, &destination)
            .map_err(|_| DetectionMiss::DegenerateCorners)?;
        let rectified = rectify::warp_perspective(frame, &matrix, width, height)
            .ok_or(DetectionMiss::DegenerateCorners)?;

        // Step 9: working-resolution area over full-resolution frame area
        let area = polygon_area(&vertices);
        let frame_area = frame.width() as f64 * frame.height() as f64;
        let relative_area = area / frame_area;

        // Step 10
        if !meets_cutoff(relative_area, p.cutoff) {
            return Err(DetectionMiss::BelowAreaThreshold {
                relative_area,
                cutoff: p.cutoff,
            });
        }

        // Step 11
        let mut annotated = working.to_rgb8();
        contours::draw_contour(&mut annotated, &outline.points, CONTOUR_COLOUR, 2);

        if let Some(d) = &dump {
            d.save("05_contoured", &DynamicImage::ImageRgb8(annotated.clone()));
            d.save("06_rectified", &DynamicImage::ImageRgb8(rectified.clone()));
        }

        info!(
            "Playing surface found: area={:.1}, relative={:.4}",
            area, relative_area
        );

        let (dealer_region, player_region) = PlayingSurface::regions_for_width(width);
        Ok(PlayingSurface {
            name: "primary".to_string(),
            contour,
            working_contour,
            annotated_frame: annotated,
            rectified_image: rectified,
            area,
            relative_area,
            perspective_matrix: matrix,
            width,
            height,
            dealer_region,
            player_region,
            detected_at: OffsetDateTime::now_utc(),
        })
    }

    fn next_dump(&self) -> Option<DebugDump> {
        let root = self.params.debug_out.as_ref()?;
        let index = self.dumps.fetch_add(1, Ordering::Relaxed);
        Some(DebugDump::new(root, index))
    }
}

impl Default for SurfaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detect for SurfaceDetector {
    fn detect(&self, frame: &DynamicImage) -> Option<PlayingSurface> {
        SurfaceDetector::detect(self, frame)
    }
}

/// Stage images for one detection call, under `<root>/<index>/`
struct DebugDump {
    dir: PathBuf,
}

impl DebugDump {
    fn new(root: &Path, index: usize) -> Self {
        Self {
            dir: root.join(format!("{:04}", index + 1)),
        }
    }

    fn save(&self, stage: &str, img: &DynamicImage) {
        if let Err(e) = self.try_save(stage, img) {
            warn!("Failed to save debug image {}: {}", stage, e);
        }
    }

    fn try_save(&self, stage: &str, img: &DynamicImage) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.png", stage));
        img.save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to save {}: {}", path.display(), e))?;
        debug!("  Debug: saved {}", path.display());
        Ok(())
    }
}
