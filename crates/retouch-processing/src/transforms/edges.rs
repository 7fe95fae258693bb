//! Canny edge detection.
//!
//! Gaussian pre-smoothing and Sobel gradients come from `imageproc`; the
//! non-maximum suppression and hysteresis stages are local so that edge
//! linking checks all eight neighbours and stays inside the image bounds.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use super::TransformError;
use crate::buffer::PixelBuffer;

const PRE_BLUR_SIGMA: f32 = 1.4;

/// Canny on any buffer; color input is reduced to luma. Output is one channel.
pub fn canny(input: &PixelBuffer, low: f32, high: f32) -> Result<PixelBuffer, TransformError> {
    if !low.is_finite() || !high.is_finite() {
        return Err(TransformError::NonFinite);
    }
    if low >= high {
        return Err(TransformError::Invalid(format!(
            "low threshold {} must be below high threshold {}",
            low, high
        )));
    }
    Ok(PixelBuffer::from_gray(canny_gray(&input.to_luma(), low, high)))
}

/// Edge map of a grayscale image: 255 on edges, 0 elsewhere.
pub fn canny_gray(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w < 3 || h < 3 {
        return GrayImage::new(w, h);
    }

    let blurred = gaussian_blur_f32(image, PRE_BLUR_SIGMA);
    let gx = horizontal_sobel(&blurred);
    let gy = vertical_sobel(&blurred);
    let magnitude: Image<Luma<f32>> = Image::from_fn(w, h, |x, y| {
        let dx = f32::from(gx.get_pixel(x, y)[0]);
        let dy = f32::from(gy.get_pixel(x, y)[0]);
        Luma([dx.hypot(dy)])
    });

    let thinned = non_maximum_suppression(&magnitude, &gx, &gy);
    hysteresis(&thinned, low, high)
}

/// Keep only pixels that are a local maximum across the gradient direction.
fn non_maximum_suppression(
    g: &Image<Luma<f32>>,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Image<Luma<f32>> {
    let (w, h) = g.dimensions();
    let mut out = Image::from_pixel(w, h, Luma([0.0f32]));
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut angle = f32::from(gy.get_pixel(x, y)[0])
                .atan2(f32::from(gx.get_pixel(x, y)[0]))
                .to_degrees();
            if angle < 0.0 {
                angle += 180.0;
            }

            let (a, b) = if !(22.5..157.5).contains(&angle) {
                ((x - 1, y), (x + 1, y))
            } else if angle < 67.5 {
                ((x + 1, y + 1), (x - 1, y - 1))
            } else if angle < 112.5 {
                ((x, y - 1), (x, y + 1))
            } else {
                ((x - 1, y + 1), (x + 1, y - 1))
            };

            let pixel = g.get_pixel(x, y)[0];
            if pixel >= g.get_pixel(a.0, a.1)[0] && pixel >= g.get_pixel(b.0, b.1)[0] {
                out.put_pixel(x, y, Luma([pixel]));
            }
        }
    }
    out
}

/// Strong pixels (`> high`) seed a flood fill through weak ones (`>= low`).
fn hysteresis(input: &Image<Luma<f32>>, low: f32, high: f32) -> GrayImage {
    let (w, h) = input.dimensions();
    let mut out = GrayImage::new(w, h);
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if input.get_pixel(x, y)[0] <= high || out.get_pixel(x, y)[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma([255]));
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = i64::from(cx) + dx;
                        let ny = i64::from(cy) + dy;
                        if nx < 0 || ny < 0 || nx >= i64::from(w) || ny >= i64::from(h) {
                            continue;
                        }
                        let (nx, ny) = (nx as u32, ny as u32);
                        if input.get_pixel(nx, ny)[0] >= low && out.get_pixel(nx, ny)[0] == 0 {
                            out.put_pixel(nx, ny, Luma([255]));
                            stack.push((nx, ny));
                        }
                    }
                }
            }
        }
    }
    out
}
