//! Separable Gaussian blur with an explicit odd kernel size.
//!
//! The kernel sigma follows the usual size-derived rule
//! `sigma = 0.3 * ((k - 1) / 2 - 1) + 0.8`, so a larger kernel always means
//! more smoothing. Borders are reflected (reflect-101), so dimensions never
//! shrink.

use super::{reflect101, to_sample, TransformError};
use crate::buffer::PixelBuffer;

pub fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian weights of odd length `ksize`.
pub fn gaussian_kernel(ksize: u32) -> Vec<f32> {
    let sigma = sigma_for_kernel(ksize);
    let radius = (ksize / 2) as i32;
    let weights: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Convolve one interleaved channel with `kernel` along x then y.
pub(crate) fn convolve_plane(
    samples: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    channel: usize,
    kernel: &[f32],
) -> Vec<f32> {
    let radius = (kernel.len() / 2) as i64;
    let mut horizontal = vec![0f32; width * height];
    for y in 0..height {
        let row = y * width;
        for x in 0..width {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let sx = reflect101(x as i64 + k as i64 - radius, width);
                acc += w * f32::from(samples[(row + sx) * stride + channel]);
            }
            horizontal[row + x] = acc;
        }
    }

    let mut out = vec![0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let sy = reflect101(y as i64 + k as i64 - radius, height);
                acc += w * horizontal[sy * width + x];
            }
            out[y * width + x] = acc;
        }
    }
    out
}

pub fn gaussian_blur(input: &PixelBuffer, ksize: u32) -> Result<PixelBuffer, TransformError> {
    if ksize == 0 || ksize % 2 == 0 {
        return Err(TransformError::Invalid(format!(
            "kernel size must be odd, got {}",
            ksize
        )));
    }
    if ksize == 1 {
        return Ok(input.clone());
    }

    let kernel = gaussian_kernel(ksize);
    let (w, h) = (input.width() as usize, input.height() as usize);
    let stride = input.channels() as usize;

    let mut data = vec![0u8; w * h * stride];
    for c in 0..stride {
        let plane = convolve_plane(input.data(), w, h, stride, c, &kernel);
        for (i, v) in plane.into_iter().enumerate() {
            data[i * stride + c] = to_sample(v)?;
        }
    }

    PixelBuffer::new(input.width(), input.height(), input.channels(), data)
        .map_err(|e| TransformError::Invalid(e.to_string()))
}
