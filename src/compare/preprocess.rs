use image::{GrayImage, Luma, RgbImage};
use ndarray::Array2;

use super::types::SimilarityMap;

/// Convert an RGB image to 8-bit luminance (BT.601 weights)
pub fn to_luma(image: &RgbImage) -> GrayImage {
    let _span = tracing::debug_span!("to_luma").entered();

    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let pixel = image.get_pixel(x, y);
        Luma([luma(pixel[0], pixel[1], pixel[2])])
    })
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let r = r as f32;
    let g = g as f32;
    let b = b as f32;

    (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8
}

/// Lift a grayscale image into a float matrix indexed `[row, column]`
pub fn to_array(image: &GrayImage) -> Array2<f64> {
    let (width, height) = image.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        image.get_pixel(col as u32, row as u32)[0] as f64
    })
}

/// Rescale a similarity map into an 8-bit difference map
///
/// Negative similarity saturates at 0; the fractional part is truncated.
pub fn to_difference_map(similarity: &SimilarityMap) -> GrayImage {
    let (width, height) = similarity.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let value = similarity.map[[y as usize, x as usize]];
        Luma([(value.clamp(0.0, 1.0) * 255.0) as u8])
    })
}
