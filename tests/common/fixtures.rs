use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use nalgebra::Matrix3;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use time::OffsetDateTime;

use surfacecam::display::{DisplayError, DisplaySink, TickDisplay};
use surfacecam::{
    Clock, ColumnRange, Detect, FrameError, FrameSource, InteractionSource, PlayingSurface,
    Point2D, Quadrilateral,
};

pub const BACKGROUND: Rgb<u8> = Rgb([30, 30, 30]);
pub const SURFACE_FILL: Rgb<u8> = Rgb([220, 220, 220]);

/// A frame of one flat colour
pub fn uniform_frame(width: u32, height: u32, colour: Rgb<u8>) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, colour))
}

/// A 640x480 dark frame with a filled axis-aligned rectangle
pub fn rectangle_frame(x: i32, y: i32, width: u32, height: u32, fill: Rgb<u8>) -> DynamicImage {
    let mut img = RgbImage::from_pixel(640, 480, BACKGROUND);
    draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(width, height), fill);
    DynamicImage::ImageRgb8(img)
}

/// A 640x480 dark frame with a filled disc
pub fn disc_frame(centre: (i32, i32), radius: i32, fill: Rgb<u8>) -> DynamicImage {
    let mut img = RgbImage::from_pixel(640, 480, BACKGROUND);
    draw_filled_circle_mut(&mut img, centre, radius, fill);
    DynamicImage::ImageRgb8(img)
}

/// A 640x480 dark frame with a filled quadrilateral, corners given clockwise
/// from the top left
pub fn quad_frame(corners: [(i32, i32); 4], fill: Rgb<u8>) -> DynamicImage {
    let mut img = RgbImage::from_pixel(640, 480, BACKGROUND);
    let poly: Vec<Point<i32>> = corners.iter().map(|&(x, y)| Point::new(x, y)).collect();
    draw_polygon_mut(&mut img, &poly, fill);
    DynamicImage::ImageRgb8(img)
}

/// Small frame whose first pixel encodes a scripted detection outcome:
/// 0 means no surface, anything else a surface tagged with that value
pub fn tagged_frame(tag: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([tag, 0, 0])))
}

/// A surface whose rectified image is filled with `tag`
pub fn tagged_surface(tag: u8) -> PlayingSurface {
    let square = Quadrilateral::new([
        Point2D::new(0.0, 0.0),
        Point2D::new(10.0, 0.0),
        Point2D::new(10.0, 10.0),
        Point2D::new(0.0, 10.0),
    ]);
    PlayingSurface {
        name: "primary".to_string(),
        contour: square,
        working_contour: square,
        annotated_frame: RgbImage::from_pixel(40, 30, Rgb([tag, tag, tag])),
        rectified_image: RgbImage::from_pixel(72, 40, Rgb([tag, tag, tag])),
        area: 100.0,
        relative_area: 0.5,
        perspective_matrix: Matrix3::identity(),
        width: 72,
        height: 40,
        dealer_region: ColumnRange { start: 0, end: 36 },
        player_region: ColumnRange { start: 37, end: 72 },
        detected_at: OffsetDateTime::now_utc(),
    }
}

/// Red channel of a displayed buffer's centre pixel
pub fn centre_tag(img: &DynamicImage) -> u8 {
    let rgb = img.to_rgb8();
    rgb.get_pixel(rgb.width() / 2, rgb.height() / 2)[0]
}

/// Detector double driven by [`tagged_frame`]
pub struct ScriptedDetector;

impl Detect for ScriptedDetector {
    fn detect(&self, frame: &DynamicImage) -> Option<PlayingSurface> {
        let tag = frame.to_rgb8().get_pixel(0, 0)[0];
        (tag != 0).then(|| tagged_surface(tag))
    }
}

/// Frames handed out in order, then exhaustion
pub struct ScriptedSource {
    frames: VecDeque<DynamicImage>,
}

impl ScriptedSource {
    pub fn new(frames: Vec<DynamicImage>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn tags(tags: &[u8]) -> Self {
        Self::new(tags.iter().map(|&t| tagged_frame(t)).collect())
    }
}

impl FrameSource for ScriptedSource {
    fn read(&mut self) -> Result<DynamicImage, FrameError> {
        self.frames.pop_front().ok_or(FrameError::Exhausted)
    }
}

/// Clock that moves forward by `step` every time it is read
pub struct SteppingClock {
    now: Duration,
    step: Duration,
}

impl SteppingClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&mut self) -> Duration {
        let now = self.now;
        self.now += self.step;
        now
    }
}

/// Requests cancellation on the `n`th poll
pub struct CancelOnPoll {
    n: usize,
    polls: usize,
}

impl CancelOnPoll {
    pub fn new(n: usize) -> Self {
        Self { n, polls: 0 }
    }
}

impl InteractionSource for CancelOnPoll {
    fn cancel_requested(&mut self) -> bool {
        self.polls += 1;
        self.polls >= self.n
    }
}

/// What a [`RecordingSink`] saw
#[derive(Default)]
pub struct Recording {
    pub ticks: Vec<TickDisplay>,
    pub closed: bool,
}

/// Sink that keeps every presented tick; the recording is shared so tests
/// can inspect it after the loop has consumed the sink
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub recording: Rc<RefCell<Recording>>,
}

impl DisplaySink for RecordingSink {
    fn show(&mut self, _name: &str, _image: &DynamicImage) -> Result<(), DisplayError> {
        Ok(())
    }

    fn present(&mut self, display: &TickDisplay) -> Result<(), DisplayError> {
        self.recording.borrow_mut().ticks.push(display.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.recording.borrow_mut().closed = true;
    }
}
