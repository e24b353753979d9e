use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use imageproc::edges::canny;
use imageproc::filter::bilateral_filter;

/// Resize keeping the aspect ratio so the result is `height` pixels tall
pub fn resize_to_height(img: &DynamicImage, height: u32) -> DynamicImage {
    let width = (img.width() as f64 * height as f64 / img.height() as f64) as u32;
    img.resize_exact(width.max(1), height, FilterType::Triangle)
}

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Edge-preserving smoothing.
///
/// Flat regions blur while strong edges stay sharp; `window` is the
/// neighbourhood diameter in pixels.
pub fn bilateral_smooth(
    img: &GrayImage,
    window: u32,
    sigma_color: f32,
    sigma_spatial: f32,
) -> GrayImage {
    bilateral_filter(img, window, sigma_color, sigma_spatial)
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}
