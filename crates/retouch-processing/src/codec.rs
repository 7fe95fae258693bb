//! Decoding of uploaded bytes and PNG encoding for transport.
//!
//! The input format is sniffed from the magic bytes, never from the filename.
//! Grayscale sources decode to one channel; everything else decodes to RGB
//! with any alpha channel discarded and 16-bit samples reduced to 8-bit.

use image::codecs::png::PngEncoder;
use image::{ColorType, ExtendedColorType, ImageEncoder, ImageError, ImageFormat};
use retouch_core::AppError;

use crate::buffer::PixelBuffer;

/// Formats accepted by [`decode`].
pub const SUPPORTED_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::WebP,
];

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Empty image data")]
    EmptyInput,

    #[error("{0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    CorruptData(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::EmptyInput => AppError::CorruptData("empty image data".to_string()),
            CodecError::UnsupportedFormat(msg) => AppError::UnsupportedFormat(msg),
            CodecError::CorruptData(msg) => AppError::CorruptData(msg),
            CodecError::Encode(msg) => AppError::Internal(format!("PNG encoding failed: {}", msg)),
        }
    }
}

/// Output format for [`encode`]. Transport always uses PNG.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Png,
}

pub fn decode(bytes: &[u8]) -> Result<PixelBuffer, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::EmptyInput);
    }

    let format = image::guess_format(bytes)
        .map_err(|_| CodecError::UnsupportedFormat("unrecognized image signature".to_string()))?;
    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(CodecError::UnsupportedFormat(format!(
            "{:?} images are not supported",
            format
        )));
    }

    let image = image::load_from_memory_with_format(bytes, format).map_err(|e| match e {
        ImageError::Unsupported(inner) => CodecError::UnsupportedFormat(inner.to_string()),
        other => CodecError::CorruptData(other.to_string()),
    })?;

    if image.width() == 0 || image.height() == 0 {
        return Err(CodecError::CorruptData("image has no pixels".to_string()));
    }

    let buffer = match image.color() {
        ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16 => {
            PixelBuffer::from_gray(image.to_luma8())
        }
        _ => PixelBuffer::from_rgb(image.to_rgb8()),
    };

    tracing::debug!(
        format = ?format,
        width = buffer.width(),
        height = buffer.height(),
        channels = buffer.channels(),
        "Decoded image"
    );

    Ok(buffer)
}

pub fn encode(buffer: &PixelBuffer, format: OutputFormat) -> Result<Vec<u8>, CodecError> {
    match format {
        OutputFormat::Png => encode_png(buffer),
    }
}

pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, CodecError> {
    if buffer.is_empty() {
        return Err(CodecError::Encode("image has no pixels".to_string()));
    }
    let color = match buffer.channels() {
        1 => ExtendedColorType::L8,
        3 => ExtendedColorType::Rgb8,
        4 => ExtendedColorType::Rgba8,
        n => {
            return Err(CodecError::Encode(format!(
                "cannot encode {} channel image",
                n
            )))
        }
    };

    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(buffer.data(), buffer.width(), buffer.height(), color)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(out)
}
