use image::GrayImage;

use super::blur::{convolve_plane, gaussian_kernel};
use super::TransformError;
use crate::buffer::PixelBuffer;

/// Global binary threshold: `pixel >= value` becomes 255, everything else 0.
///
/// Color input is reduced to luma first; the result is always one channel.
pub fn threshold(input: &PixelBuffer, value: u8) -> Result<PixelBuffer, TransformError> {
    let mut gray = input.to_luma();
    for px in gray.iter_mut() {
        *px = if *px >= value { 255 } else { 0 };
    }
    Ok(PixelBuffer::from_gray(gray))
}

/// Local threshold against a Gaussian-weighted neighborhood mean.
///
/// `T(x, y) = mean(block_size x block_size around (x, y)) - c`, and a pixel
/// strictly above `T` becomes 255.
pub fn adaptive_threshold(
    input: &PixelBuffer,
    block_size: u32,
    c: f32,
) -> Result<PixelBuffer, TransformError> {
    if block_size < 3 || block_size % 2 == 0 {
        return Err(TransformError::Invalid(format!(
            "block size must be odd and >= 3, got {}",
            block_size
        )));
    }
    if !c.is_finite() {
        return Err(TransformError::NonFinite);
    }

    let gray = input.to_luma();
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let mean = convolve_plane(gray.as_raw(), w, h, 1, 0, &gaussian_kernel(block_size));

    let mut data = Vec::with_capacity(w * h);
    for (&px, &m) in gray.as_raw().iter().zip(&mean) {
        let t = m - c;
        if !t.is_finite() {
            return Err(TransformError::NonFinite);
        }
        data.push(if f32::from(px) > t { 255 } else { 0 });
    }

    GrayImage::from_raw(gray.width(), gray.height(), data)
        .map(PixelBuffer::from_gray)
        .ok_or_else(|| TransformError::Invalid("threshold plane size mismatch".to_string()))
}
