//! Session request/response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

/// Pixel dimensions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Response returned after a successful upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Session identifier to pass to every subsequent call
    pub image_id: Uuid,
    /// Sanitized original filename, when one was supplied
    pub filename: Option<String>,
    pub dimensions: ImageDimensions,
    /// 1 for grayscale, 3 for color
    pub channels: u8,
    /// Base64-encoded PNG of the decoded image
    pub image: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Request to apply one operation to a session's current image
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessRequest {
    pub image_id: Uuid,
    /// Operation identifier, see `GET /operations`
    pub operation: String,
    /// Raw parameters; numbers may be sent as JSON numbers or numeric strings
    #[serde(default)]
    #[schema(value_type = Object)]
    pub params: Map<String, Value>,
}

/// Result of a successful `apply`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessResponse {
    pub image: String,
    pub operation: String,
    pub dimensions: ImageDimensions,
    pub channels: u8,
    /// Number of operations applied since the last reset
    pub history_depth: usize,
}

/// Request body carrying only a session identifier
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionRequest {
    pub image_id: Uuid,
}

/// Result of an undo; `undone` is false when the history was already empty
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UndoResponse {
    pub image: String,
    pub undone: bool,
    pub dimensions: ImageDimensions,
    pub channels: u8,
    pub history_depth: usize,
}

/// Result of a reset to the original image
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetResponse {
    pub image: String,
    pub dimensions: ImageDimensions,
    pub channels: u8,
    pub history_depth: usize,
}

/// Read-only view of a session
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub image_id: Uuid,
    pub filename: Option<String>,
    pub image: String,
    pub dimensions: ImageDimensions,
    pub channels: u8,
    pub history_depth: usize,
    pub uploaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_request_params_default_to_empty() {
        let req: ProcessRequest = serde_json::from_value(serde_json::json!({
            "image_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "operation": "grayscale"
        }))
        .unwrap();
        assert!(req.params.is_empty());
        assert_eq!(req.operation, "grayscale");
    }

    #[test]
    fn test_process_request_keeps_raw_values() {
        let req: ProcessRequest = serde_json::from_value(serde_json::json!({
            "image_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "operation": "threshold",
            "params": { "value": "127" }
        }))
        .unwrap();
        assert_eq!(req.params.get("value"), Some(&Value::from("127")));
    }
}
