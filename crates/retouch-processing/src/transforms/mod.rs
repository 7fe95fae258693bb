//! Pure image transforms.
//!
//! Every transform reads a borrowed [`PixelBuffer`] and returns a new one. None
//! of them touch session state, so a failure can never leave a half-applied
//! result behind.

pub mod blur;
pub mod color;
pub mod edges;
pub mod geometry;
pub mod roi;
pub mod stylize;
pub mod threshold;

use std::time::Instant;

use retouch_core::AppError;

use crate::buffer::PixelBuffer;
use crate::catalog::{Operation, ResolvedParams};

pub use geometry::{Canvas, FlipDirection};
pub use color::EqualizeMode;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("image is empty")]
    EmptyBuffer,

    #[error("{channels}-channel images are not supported")]
    UnsupportedChannels { channels: u8 },

    #[error("computation produced a non-finite value")]
    NonFinite,

    #[error("missing resolved parameter '{0}'")]
    MissingParam(&'static str),

    #[error("{0}")]
    Invalid(String),
}

/// Reject empty buffers and channel layouts other than gray or RGB.
pub(crate) fn ensure_supported(input: &PixelBuffer) -> Result<(), TransformError> {
    if input.is_empty() {
        return Err(TransformError::EmptyBuffer);
    }
    match input.channels() {
        1 | 3 => Ok(()),
        channels => Err(TransformError::UnsupportedChannels { channels }),
    }
}

/// Round a computed sample back to 8 bits, failing on NaN or infinity.
#[inline]
pub(crate) fn to_sample(value: f32) -> Result<u8, TransformError> {
    if !value.is_finite() {
        return Err(TransformError::NonFinite);
    }
    Ok(value.round().clamp(0.0, 255.0) as u8)
}

/// Border index for BORDER_REFLECT_101 (`gfedcb|abcdefgh|gfedcba`).
#[inline]
pub(crate) fn reflect101(mut i: i64, len: usize) -> usize {
    let n = len as i64;
    if n <= 1 {
        return 0;
    }
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * (n - 1) - i;
        }
    }
    i as usize
}

fn integer(params: &ResolvedParams, name: &'static str) -> Result<i64, TransformError> {
    params.integer(name).ok_or(TransformError::MissingParam(name))
}

fn real(params: &ResolvedParams, name: &'static str) -> Result<f64, TransformError> {
    params.number(name).ok_or(TransformError::MissingParam(name))
}

fn text<'a>(params: &'a ResolvedParams, name: &'static str) -> Result<&'a str, TransformError> {
    params.text(name).ok_or(TransformError::MissingParam(name))
}

fn dimension(params: &ResolvedParams, name: &'static str) -> Result<u32, TransformError> {
    let value = integer(params, name)?;
    u32::try_from(value).map_err(|_| TransformError::Invalid(format!("{} out of range", name)))
}

/// Run one operation with already-validated parameters.
pub fn run(
    operation: Operation,
    input: &PixelBuffer,
    params: &ResolvedParams,
) -> Result<PixelBuffer, TransformError> {
    ensure_supported(input)?;

    let output = match operation {
        Operation::Grayscale => color::grayscale(input)?,
        Operation::GaussianBlur => blur::gaussian_blur(input, dimension(params, "intensity")?)?,
        Operation::Beautify => stylize::beautify(
            input,
            real(params, "smoothing")? as f32,
            dimension(params, "brightness")?.min(255) as u8,
        )?,
        Operation::FlowerSketch => {
            stylize::flower_sketch(input, dimension(params, "intensity")?)?
        }
        Operation::Threshold => {
            let value = u8::try_from(integer(params, "value")?)
                .map_err(|_| TransformError::Invalid("value out of range".to_string()))?;
            threshold::threshold(input, value)?
        }
        Operation::AdaptiveThreshold => threshold::adaptive_threshold(
            input,
            dimension(params, "block_size")?,
            real(params, "c")? as f32,
        )?,
        Operation::Rotate => geometry::rotate(
            input,
            real(params, "angle")?,
            text(params, "canvas")?.parse()?,
        )?,
        Operation::Flip => geometry::flip(input, text(params, "direction")?.parse()?)?,
        Operation::Resize => geometry::resize(
            input,
            dimension(params, "width")?,
            dimension(params, "height")?,
        )?,
        Operation::Equalize => color::equalize(input, text(params, "mode")?.parse()?)?,
        Operation::Normalize => color::normalize(input)?,
        Operation::Canny => edges::canny(
            input,
            real(params, "low")? as f32,
            real(params, "high")? as f32,
        )?,
        Operation::Roi => roi::roi(input, dimension(params, "max_regions")? as usize)?,
    };

    if output.is_empty() {
        return Err(TransformError::EmptyBuffer);
    }
    Ok(output)
}

/// [`run`], with failures reported as [`AppError::ProcessingError`].
pub fn apply(
    operation: Operation,
    input: &PixelBuffer,
    params: &ResolvedParams,
) -> Result<PixelBuffer, AppError> {
    let started = Instant::now();
    let result = run(operation, input, params).map_err(|e| AppError::ProcessingError {
        operation: operation.to_string(),
        reason: e.to_string(),
    })?;
    tracing::debug!(
        operation = %operation,
        width = result.width(),
        height = result.height(),
        channels = result.channels(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Transform complete"
    );
    Ok(result)
}


#[cfg(test)]
mod tests {
    use super::test_support::sample_rgb;
    use super::*;
    use crate::catalog::Catalog;
    use serde_json::Map;

    #[test]
    fn test_reflect101() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(6, 5), 2);
        assert_eq!(reflect101(3, 5), 3);
        assert_eq!(reflect101(-7, 1), 0);
        assert_eq!(reflect101(-3, 2), 1);
    }

    #[test]
    fn test_to_sample_rejects_nan() {
        assert_eq!(to_sample(f32::NAN), Err(TransformError::NonFinite));
        assert_eq!(to_sample(300.0), Ok(255));
        assert_eq!(to_sample(-4.0), Ok(0));
        assert_eq!(to_sample(12.5), Ok(13));
    }

    #[test]
    fn test_every_operation_runs_with_defaults() {
        let catalog = Catalog::builtin();
        let input = sample_rgb(24, 16);
        for op in catalog.operations() {
            let params = op.validate(&Map::new()).unwrap();
            let output = run(op.id, &input, &params)
                .unwrap_or_else(|e| panic!("{} failed: {e}", op.id));
            assert!(!output.is_empty(), "{}", op.id);
        }
    }

    #[test]
    fn test_empty_buffer_is_processing_error() {
        let empty = PixelBuffer::new(0, 0, 3, vec![]).unwrap();
        let err = apply(Operation::Grayscale, &empty, &ResolvedParams::new()).unwrap_err();
        match err {
            AppError::ProcessingError { operation, reason } => {
                assert_eq!(operation, "grayscale");
                assert!(reason.contains("empty"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrapped_angles_rotate_identically() {
        let catalog = Catalog::builtin();
        let input = sample_rgb(20, 12);
        let rotate = |angle: i64| {
            let raw: Map<String, serde_json::Value> =
                [("angle".to_string(), angle.into())].into_iter().collect();
            let (op, params) = catalog.resolve("rotate", &raw).unwrap();
            run(op, &input, &params).unwrap()
        };
        assert_eq!(rotate(1000), rotate(-80));
        assert_eq!(rotate(-1000), rotate(80));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let input = sample_rgb(10, 10);
        let before = input.clone();
        let params = Catalog::builtin()
            .lookup("gaussian_blur")
            .unwrap()
            .validate(&Map::new())
            .unwrap();
        let _ = run(Operation::GaussianBlur, &input, &params).unwrap();
        assert_eq!(input, before);
    }
}
