//! Base64 PNG transport encoding.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use retouch_core::models::ImageDimensions;
use retouch_core::AppError;
use retouch_processing::{encode_png, PixelBuffer};

/// Encode a buffer as a standard-alphabet base64 PNG on the blocking pool.
pub async fn encode_base64_png(buffer: Arc<PixelBuffer>) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || -> Result<String, AppError> {
        let png = encode_png(&buffer)?;
        Ok(STANDARD.encode(png))
    })
    .await
    .map_err(|e| AppError::Internal(format!("encode task failed: {}", e)))?
}

pub fn dimensions(buffer: &PixelBuffer) -> ImageDimensions {
    ImageDimensions {
        width: buffer.width(),
        height: buffer.height(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retouch_processing::decode;

    #[tokio::test]
    async fn test_encoded_png_decodes_to_same_pixels() {
        let buffer = Arc::new(PixelBuffer::new(3, 2, 3, (0..18).collect()).unwrap());
        let encoded = encode_base64_png(Arc::clone(&buffer)).await.unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        assert_eq!(decode(&bytes).unwrap(), *buffer);
    }
}
