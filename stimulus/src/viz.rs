//! Debug export of templates and rendered frames to standard image types.
//!
//! Not used on the measurement path; handy for eyeballing filter output and
//! for saving stimuli from integration tests.

use image::{GrayImage, Luma, RgbaImage};
use ndarray::Array2;

/// Map a signed `[-1, 1]` template onto an 8-bit grey image (0.0 maps to
/// mid-grey).
pub fn template_to_gray_image(data: &Array2<f64>) -> GrayImage {
    let (height, width) = data.dim();
    let mut img = GrayImage::new(width as u32, height as u32);
    for y in 0..height {
        for x in 0..width {
            let v = ((data[[y, x]] * 0.5 + 0.5) * 255.0).round().clamp(0.0, 255.0) as u8;
            img.put_pixel(x as u32, y as u32, Luma([v]));
        }
    }
    img
}

/// Wrap a rendered RGBA8 frame buffer; `None` when the length does not
/// match the dimensions.
pub fn frame_to_rgba_image(data: &[u8], width: u32, height: u32) -> Option<RgbaImage> {
    RgbaImage::from_raw(width, height, data.to_vec())
}
