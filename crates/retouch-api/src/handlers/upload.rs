use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use retouch_core::models::UploadResponse;
use retouch_core::AppError;
use retouch_processing::{decode, validator::sanitize_filename};

use crate::error::{ErrorResponse, HttpAppError};
use crate::services::encoding::{dimensions, encode_base64_png};
use crate::state::AppState;

/// Form field carrying the image. Any other file field is accepted as a
/// fallback when this one is absent.
const IMAGE_FIELD: &str = "image";

struct UploadedFile {
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

fn multipart_error(err: MultipartError, max: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { size: max + 1, max }
    } else {
        AppError::InvalidInput(format!("Malformed multipart body: {}", err.body_text()))
    }
}

async fn read_image_field(
    multipart: &mut Multipart,
    max: usize,
) -> Result<Option<UploadedFile>, AppError> {
    let mut fallback = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        let named = field.name() == Some(IMAGE_FIELD);
        if !named && (fallback.is_some() || field.file_name().is_none()) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| multipart_error(e, max))?;
        let file = UploadedFile {
            filename,
            content_type,
            data,
        };
        if named {
            return Ok(Some(file));
        }
        fallback = Some(file);
    }
    Ok(fallback)
}

/// Upload an image and open a new editing session
#[utoipa::path(
    post,
    path = "/upload",
    tag = "session",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Session created", body = UploadResponse),
        (status = 400, description = "Missing, unsupported or corrupt image", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 503, description = "Session limit reached", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let max = state.validator.max_file_size();
    let file = read_image_field(&mut multipart, max)
        .await?
        .ok_or_else(|| AppError::InvalidInput("No image file in request".to_string()))?;

    state.validator.validate(
        file.data.len(),
        file.filename.as_deref(),
        file.content_type.as_deref(),
    )?;

    let data = file.data;
    let buffer = tokio::task::spawn_blocking(move || decode(&data))
        .await
        .map_err(|e| AppError::Internal(format!("decode task failed: {}", e)))??;

    let filename = file.filename.as_deref().and_then(sanitize_filename);
    let session = state.sessions.create(buffer, filename).await?;
    let original = Arc::clone(session.original());

    tracing::info!(
        image_id = %session.id(),
        width = original.width(),
        height = original.height(),
        channels = original.channels(),
        "Image uploaded"
    );

    Ok(Json(UploadResponse {
        image_id: session.id(),
        filename: session.filename().map(str::to_string),
        dimensions: dimensions(&original),
        channels: original.channels(),
        image: encode_base64_png(original).await?,
        uploaded_at: session.uploaded_at(),
    }))
}
