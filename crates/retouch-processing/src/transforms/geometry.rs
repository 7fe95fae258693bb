//! Rotation, mirroring and resampling.
//!
//! Rotation uses inverse mapping with bilinear sampling: for each output pixel
//! the source position is
//!
//! ```text
//! src_x = cos(a) * dx - sin(a) * dy + src_cx
//! src_y = sin(a) * dx + cos(a) * dy + src_cy
//! ```
//!
//! where `(dx, dy)` is the offset from the output center. Positive angles turn
//! the picture counter-clockwise. Uncovered pixels are black.

use std::str::FromStr;

use image::imageops::{self, FilterType};

use super::{to_sample, TransformError};
use crate::buffer::PixelBuffer;

const ANGLE_EPSILON: f64 = 1e-9;

/// Canvas policy for rotations that are not a multiple of 180 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Canvas {
    /// Grow the canvas to the rotated bounding box so nothing is cut off.
    #[default]
    Expand,
    /// Keep the input dimensions; corners that leave the frame are lost.
    Crop,
}

impl FromStr for Canvas {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expand" => Ok(Canvas::Expand),
            "crop" => Ok(Canvas::Crop),
            other => Err(TransformError::Invalid(format!(
                "unknown canvas policy '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    Horizontal,
    Vertical,
    Both,
}

impl FromStr for FlipDirection {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horizontal" => Ok(FlipDirection::Horizontal),
            "vertical" => Ok(FlipDirection::Vertical),
            "both" => Ok(FlipDirection::Both),
            other => Err(TransformError::Invalid(format!(
                "unknown flip direction '{}'",
                other
            ))),
        }
    }
}

/// Wrap any angle into (-180, 180].
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}

/// Dimensions of the axis-aligned box containing the rotated image.
pub fn rotated_bounds(width: u32, height: u32, angle: f64) -> (u32, u32) {
    let rad = angle.to_radians();
    let (sin, cos) = (rad.sin().abs(), rad.cos().abs());
    let (w, h) = (f64::from(width), f64::from(height));
    let new_w = (w * cos + h * sin).round() as u32;
    let new_h = (w * sin + h * cos).round() as u32;
    (new_w.max(1), new_h.max(1))
}

fn is_angle(a: f64, target: f64) -> bool {
    (a - target).abs() < ANGLE_EPSILON
}

/// Lossless pixel permutation: `map(x, y)` gives the source of output `(x, y)`.
fn remap(
    input: &PixelBuffer,
    out_w: u32,
    out_h: u32,
    map: impl Fn(u32, u32) -> (u32, u32),
) -> Result<PixelBuffer, TransformError> {
    let n = input.channels();
    let mut data = Vec::with_capacity(out_w as usize * out_h as usize * n as usize);
    for y in 0..out_h {
        for x in 0..out_w {
            let (sx, sy) = map(x, y);
            for c in 0..n {
                data.push(input.sample(sx, sy, c));
            }
        }
    }
    PixelBuffer::new(out_w, out_h, n, data).map_err(|e| TransformError::Invalid(e.to_string()))
}

pub fn rotate(input: &PixelBuffer, angle: f64, canvas: Canvas) -> Result<PixelBuffer, TransformError> {
    if !angle.is_finite() {
        return Err(TransformError::NonFinite);
    }
    let angle = wrap_angle(angle);
    let (w, h) = (input.width(), input.height());
    let square = w == h;

    if is_angle(angle, 0.0) {
        return Ok(input.clone());
    }
    if is_angle(angle, 180.0) {
        return remap(input, w, h, |x, y| (w - 1 - x, h - 1 - y));
    }
    if canvas == Canvas::Expand || square {
        if is_angle(angle, 90.0) {
            return remap(input, h, w, |x, y| (w - 1 - y, x));
        }
        if is_angle(angle, -90.0) {
            return remap(input, h, w, |x, y| (y, h - 1 - x));
        }
    }

    let (out_w, out_h) = match canvas {
        Canvas::Expand => rotated_bounds(w, h, angle),
        Canvas::Crop => (w, h),
    };
    rotate_bilinear(input, angle, out_w, out_h)
}

fn rotate_bilinear(
    input: &PixelBuffer,
    angle: f64,
    out_w: u32,
    out_h: u32,
) -> Result<PixelBuffer, TransformError> {
    let rad = angle.to_radians();
    let (sin, cos) = (rad.sin(), rad.cos());
    let src_cx = (f64::from(input.width()) - 1.0) / 2.0;
    let src_cy = (f64::from(input.height()) - 1.0) / 2.0;
    let dst_cx = (f64::from(out_w) - 1.0) / 2.0;
    let dst_cy = (f64::from(out_h) - 1.0) / 2.0;
    let n = input.channels();
    let (w, h) = (i64::from(input.width()), i64::from(input.height()));

    let fetch = |x: i64, y: i64, c: u8| -> f64 {
        if x < 0 || y < 0 || x >= w || y >= h {
            0.0
        } else {
            f64::from(input.sample(x as u32, y as u32, c))
        }
    };

    let mut data = Vec::with_capacity(out_w as usize * out_h as usize * n as usize);
    for y in 0..out_h {
        for x in 0..out_w {
            let dx = f64::from(x) - dst_cx;
            let dy = f64::from(y) - dst_cy;
            let sx = cos * dx - sin * dy + src_cx;
            let sy = sin * dx + cos * dy + src_cy;

            if sx <= -1.0 || sy <= -1.0 || sx >= w as f64 || sy >= h as f64 {
                data.extend(std::iter::repeat(0).take(n as usize));
                continue;
            }

            let x0 = sx.floor() as i64;
            let y0 = sy.floor() as i64;
            let fx = sx - x0 as f64;
            let fy = sy - y0 as f64;
            for c in 0..n {
                let top = fetch(x0, y0, c) * (1.0 - fx) + fetch(x0 + 1, y0, c) * fx;
                let bottom = fetch(x0, y0 + 1, c) * (1.0 - fx) + fetch(x0 + 1, y0 + 1, c) * fx;
                data.push(to_sample((top * (1.0 - fy) + bottom * fy) as f32)?);
            }
        }
    }
    PixelBuffer::new(out_w, out_h, n, data).map_err(|e| TransformError::Invalid(e.to_string()))
}

pub fn flip(input: &PixelBuffer, direction: FlipDirection) -> Result<PixelBuffer, TransformError> {
    let (w, h) = (input.width(), input.height());
    match direction {
        FlipDirection::Horizontal => remap(input, w, h, |x, y| (w - 1 - x, y)),
        FlipDirection::Vertical => remap(input, w, h, |x, y| (x, h - 1 - y)),
        FlipDirection::Both => remap(input, w, h, |x, y| (w - 1 - x, h - 1 - y)),
    }
}

/// Bilinear (triangle filter) resample to exactly `width` x `height`.
pub fn resize(input: &PixelBuffer, width: u32, height: u32) -> Result<PixelBuffer, TransformError> {
    if width == 0 || height == 0 {
        return Err(TransformError::Invalid(format!(
            "target size {}x{} has no pixels",
            width, height
        )));
    }
    if (width, height) == (input.width(), input.height()) {
        return Ok(input.clone());
    }
    Ok(if input.is_gray() {
        PixelBuffer::from_gray(imageops::resize(
            &input.to_luma(),
            width,
            height,
            FilterType::Triangle,
        ))
    } else {
        PixelBuffer::from_rgb(imageops::resize(
            &input.to_rgb(),
            width,
            height,
            FilterType::Triangle,
        ))
    })
}
