//! Countdown and "not found" annotations for the display frames.
//!
//! Drawn from filled rectangles so no font assets are needed.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Baseline anchor of the countdown, `(left, bottom)`
const COUNTDOWN_ANCHOR: (i32, i32) = (380, 70);
const COUNTDOWN_SHADOW: i32 = 2;
const DIGIT_WIDTH: u32 = 24;
const DIGIT_HEIGHT: u32 = 44;
const DIGIT_STROKE: u32 = 6;
const DIGIT_GAP: u32 = 8;

const NOT_FOUND_MARGIN: i32 = 10;
const NOT_FOUND_BASELINE: i32 = 20;
const NOT_FOUND_SHADOW: i32 = 1;

/// Segments lit per digit, ordered top, top-right, bottom-right, bottom,
/// bottom-left, top-left, middle
const SEGMENTS: [[bool; 7]; 10] = [
    [true, true, true, true, true, true, false],
    [false, true, true, false, false, false, false],
    [true, true, false, true, true, false, true],
    [true, true, true, true, false, false, true],
    [false, true, true, false, false, true, true],
    [true, false, true, true, false, true, true],
    [true, false, true, true, true, true, true],
    [true, true, true, false, false, false, false],
    [true, true, true, true, true, true, true],
    [true, true, true, true, false, true, true],
];

/// Red on even counts from ten down and for the last three, white otherwise
pub fn countdown_colour(count: u32) -> Rgb<u8> {
    if (count <= 10 && count % 2 == 0) || count <= 3 {
        RED
    } else {
        WHITE
    }
}

/// Draw `count` as two digits near the top right, with a drop shadow
pub fn draw_countdown(canvas: &mut RgbImage, count: u32) {
    let text = format!("{:02}", count);
    let digits: Vec<usize> = text
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as usize)
        .collect();

    let total_width = digits.len() as i32 * (DIGIT_WIDTH + DIGIT_GAP) as i32;
    let left = COUNTDOWN_ANCHOR
        .0
        .min(canvas.width() as i32 - total_width - COUNTDOWN_SHADOW)
        .max(0);
    let top = (COUNTDOWN_ANCHOR.1 - DIGIT_HEIGHT as i32).max(0);

    let colour = countdown_colour(count);
    for (layer_offset, layer_colour) in [(COUNTDOWN_SHADOW, BLACK), (0, colour)] {
        for (i, digit) in digits.iter().enumerate() {
            let x = left + i as i32 * (DIGIT_WIDTH + DIGIT_GAP) as i32 + layer_offset;
            draw_digit(canvas, *digit, x, top + layer_offset, layer_colour);
        }
    }
}

fn draw_digit(canvas: &mut RgbImage, digit: usize, x: i32, y: i32, colour: Rgb<u8>) {
    let w = DIGIT_WIDTH as i32;
    let h = DIGIT_HEIGHT as i32;
    let s = DIGIT_STROKE as i32;
    let half = (h - s) / 2;

    // (x, y, width, height) relative to the digit's top-left
    let segments = [
        (0, 0, w, s),
        (w - s, 0, s, half + s),
        (w - s, half, s, h - half),
        (0, h - s, w, s),
        (0, half, s, h - half),
        (0, 0, s, half + s),
        (0, half, w, s),
    ];

    for (lit, (sx, sy, sw, sh)) in SEGMENTS[digit % 10].iter().zip(segments) {
        if *lit {
            draw_filled_rect_mut(
                canvas,
                Rect::at(x + sx, y + sy).of_size(sw as u32, sh as u32),
                colour,
            );
        }
    }
}

/// Mark a frame as having no playing surface: a crossed-out banner along
/// the bottom edge
pub fn draw_not_found(canvas: &mut RgbImage) {
    let (width, height) = canvas.dimensions();
    let banner_height = 24i32;
    let banner_width = (width as i32 - 2 * NOT_FOUND_MARGIN).clamp(1, 260);
    let top = (height as i32 - NOT_FOUND_BASELINE - banner_height).max(0);

    for (offset, colour) in [(NOT_FOUND_SHADOW, BLACK), (0, RED)] {
        let left = NOT_FOUND_MARGIN + offset;
        let y = top + offset;
        let rect = Rect::at(left, y).of_size(banner_width as u32, banner_height as u32);
        draw_hollow_rect_mut(canvas, rect, colour);

        // Cross at the left end of the banner
        let x0 = left as f32 + 4.0;
        let y0 = y as f32 + 4.0;
        let size = banner_height as f32 - 8.0;
        for t in 0..2 {
            let t = t as f32;
            draw_line_segment_mut(canvas, (x0 + t, y0), (x0 + size + t, y0 + size), colour);
            draw_line_segment_mut(canvas, (x0 + t, y0 + size), (x0 + size + t, y0), colour);
        }

        // Bar standing in for the message text
        let bar_left = left + banner_height;
        let bar_width = banner_width - banner_height - 4;
        if bar_width > 0 {
            draw_filled_rect_mut(
                canvas,
                Rect::at(bar_left, y + banner_height / 2 - 2).of_size(bar_width as u32, 4),
                colour,
            );
        }
    }
}
