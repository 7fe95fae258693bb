//! Session editing handlers: process, undo, reset, histogram, inspect, delete.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use retouch_core::models::{
    HistogramResponse, ProcessRequest, ProcessResponse, ResetResponse, SessionRequest,
    SessionResponse, UndoResponse,
};
use retouch_processing::compute_histogram;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::encoding::{dimensions, encode_base64_png};
use crate::state::AppState;

/// Apply one catalog operation to the session's current image
#[utoipa::path(
    post,
    path = "/process",
    tag = "session",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "Operation applied", body = ProcessResponse),
        (status = 400, description = "Unknown operation or invalid parameter", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "History full; undo or reset first", body = ErrorResponse),
        (status = 422, description = "Operation failed on this image", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(image_id = %request.image_id, operation = %request.operation)
)]
pub async fn process_image(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ProcessRequest>,
) -> Result<Json<ProcessResponse>, HttpAppError> {
    let snapshot = state
        .dispatcher
        .apply(request.image_id, &request.operation, &request.params)
        .await?;
    let image = Arc::clone(&snapshot.image);

    Ok(Json(ProcessResponse {
        dimensions: dimensions(&image),
        channels: image.channels(),
        image: encode_base64_png(image).await?,
        operation: request.operation,
        history_depth: snapshot.history_depth,
    }))
}

/// Revert the most recent operation
///
/// With an empty history this is a no-op that returns the current image and
/// `undone: false`.
#[utoipa::path(
    post,
    path = "/undo",
    tag = "session",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Previous image restored, or nothing to undo", body = UndoResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(image_id = %request.image_id))]
pub async fn undo(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SessionRequest>,
) -> Result<Json<UndoResponse>, HttpAppError> {
    let outcome = state.dispatcher.undo(request.image_id).await?;
    let snapshot = outcome.snapshot();
    let image = Arc::clone(&snapshot.image);

    Ok(Json(UndoResponse {
        undone: outcome.undone(),
        history_depth: snapshot.history_depth,
        dimensions: dimensions(&image),
        channels: image.channels(),
        image: encode_base64_png(image).await?,
    }))
}

/// Discard all operations and return to the uploaded image
#[utoipa::path(
    post,
    path = "/reset",
    tag = "session",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Original image restored", body = ResetResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(image_id = %request.image_id))]
pub async fn reset(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SessionRequest>,
) -> Result<Json<ResetResponse>, HttpAppError> {
    let snapshot = state.dispatcher.reset(request.image_id).await?;
    let image = snapshot.image;

    Ok(Json(ResetResponse {
        dimensions: dimensions(&image),
        channels: image.channels(),
        image: encode_base64_png(image).await?,
        history_depth: snapshot.history_depth,
    }))
}

/// Intensity histogram of the current image
#[utoipa::path(
    post,
    path = "/histogram",
    tag = "session",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "256-bin histogram per channel", body = HistogramResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(image_id = %request.image_id))]
pub async fn histogram(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SessionRequest>,
) -> Result<Json<HistogramResponse>, HttpAppError> {
    let snapshot = state.dispatcher.view(request.image_id).await?;
    Ok(Json(HistogramResponse {
        image_id: request.image_id,
        histogram: compute_histogram(&snapshot.image),
    }))
}

/// Current image and metadata of a session
#[utoipa::path(
    get,
    path = "/session/{id}",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session (image) ID")),
    responses(
        (status = 200, description = "Session state", body = SessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(image_id = %id))]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, HttpAppError> {
    let session = state.sessions.get(id).await?;
    let snapshot = session.snapshot();
    let image = snapshot.image;

    Ok(Json(SessionResponse {
        image_id: id,
        filename: session.filename().map(str::to_string),
        dimensions: dimensions(&image),
        channels: image.channels(),
        image: encode_base64_png(image).await?,
        history_depth: snapshot.history_depth,
        uploaded_at: session.uploaded_at(),
    }))
}

/// Close a session and free its images
#[utoipa::path(
    delete,
    path = "/session/{id}",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session (image) ID")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(image_id = %id))]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
