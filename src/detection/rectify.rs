use image::{DynamicImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use nalgebra::Matrix3;

use crate::geometry::to_row_major_f32;

/// Warp `frame` through `matrix` into a fresh `width x height` image.
///
/// Returns `None` when the matrix has no inverse. Pixels that map outside
/// the source stay black.
pub fn warp_perspective(
    frame: &DynamicImage,
    matrix: &Matrix3<f64>,
    width: u32,
    height: u32,
) -> Option<RgbImage> {
    let projection = Projection::from_matrix(to_row_major_f32(matrix))?;
    let source = frame.to_rgb8();
    let mut output = RgbImage::new(width, height);
    warp_into(
        &source,
        &projection,
        Interpolation::Bilinear,
        Rgb([0u8, 0, 0]),
        &mut output,
    );
    Some(output)
}
