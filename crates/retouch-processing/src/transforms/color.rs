use std::str::FromStr;

use image::GrayImage;
use imageproc::contrast::equalize_histogram;

use super::{to_sample, TransformError};
use crate::buffer::PixelBuffer;

/// How [`equalize`] treats color images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EqualizeMode {
    /// Equalize R, G and B independently.
    #[default]
    PerChannel,
    /// Equalize only Y of YCrCb, keeping chroma.
    Luma,
}

impl FromStr for EqualizeMode {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_channel" => Ok(EqualizeMode::PerChannel),
            "luma" => Ok(EqualizeMode::Luma),
            other => Err(TransformError::Invalid(format!(
                "unknown equalize mode '{}'",
                other
            ))),
        }
    }
}

/// Luma-weighted reduction to one channel. Gray input is returned as is.
pub fn grayscale(input: &PixelBuffer) -> Result<PixelBuffer, TransformError> {
    if input.is_gray() {
        return Ok(input.clone());
    }
    Ok(PixelBuffer::from_gray(input.to_luma()))
}

pub fn equalize(input: &PixelBuffer, mode: EqualizeMode) -> Result<PixelBuffer, TransformError> {
    if input.is_gray() {
        return Ok(PixelBuffer::from_gray(equalize_histogram(&input.to_luma())));
    }

    match mode {
        EqualizeMode::PerChannel => {
            let planes: Vec<GrayImage> = input.planes().iter().map(equalize_histogram).collect();
            PixelBuffer::from_planes(&planes).map_err(|e| TransformError::Invalid(e.to_string()))
        }
        EqualizeMode::Luma => equalize_luma(input),
    }
}

fn equalize_luma(input: &PixelBuffer) -> Result<PixelBuffer, TransformError> {
    let n = input.pixel_count();
    let mut y = Vec::with_capacity(n);
    let mut cr = Vec::with_capacity(n);
    let mut cb = Vec::with_capacity(n);

    for px in input.data().chunks_exact(3) {
        let (r, g, b) = (f32::from(px[0]), f32::from(px[1]), f32::from(px[2]));
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        y.push(to_sample(luma)?);
        cr.push((r - luma) * 0.713 + 128.0);
        cb.push((b - luma) * 0.564 + 128.0);
    }

    let y = GrayImage::from_raw(input.width(), input.height(), y)
        .ok_or_else(|| TransformError::Invalid("luma plane size mismatch".to_string()))?;
    let y = equalize_histogram(&y);

    let mut data = Vec::with_capacity(n * 3);
    for ((&luma, &cr), &cb) in y.as_raw().iter().zip(&cr).zip(&cb) {
        let luma = f32::from(luma);
        data.push(to_sample(luma + 1.403 * (cr - 128.0))?);
        data.push(to_sample(luma - 0.714 * (cr - 128.0) - 0.344 * (cb - 128.0))?);
        data.push(to_sample(luma + 1.773 * (cb - 128.0))?);
    }
    PixelBuffer::new(input.width(), input.height(), 3, data)
        .map_err(|e| TransformError::Invalid(e.to_string()))
}

/// Linear stretch of the observed sample range to 0..=255.
///
/// A constant image has no range to stretch and is returned unchanged.
pub fn normalize(input: &PixelBuffer) -> Result<PixelBuffer, TransformError> {
    let (min, max) = input
        .data()
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min >= max {
        return Ok(input.clone());
    }

    let scale = 255.0 / f32::from(max - min);
    let data = input
        .data()
        .iter()
        .map(|&v| to_sample(f32::from(v - min) * scale))
        .collect::<Result<Vec<u8>, _>>()?;
    PixelBuffer::new(input.width(), input.height(), input.channels(), data)
        .map_err(|e| TransformError::Invalid(e.to_string()))
}
