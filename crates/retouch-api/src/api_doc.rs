//! OpenAPI documentation, served at `/api/openapi.json` and browsable at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::setup::routes::health;
use retouch_core::models;
use retouch_processing::catalog;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Retouch API",
        version = "0.1.0",
        description = "Interactive image editing sessions: upload an image, apply catalog operations one at a time, undo them or reset to the original. Every image is returned as a base64 PNG."
    ),
    paths(
        handlers::upload::upload_image,
        handlers::session::process_image,
        handlers::session::undo,
        handlers::session::reset,
        handlers::session::histogram,
        handlers::session::get_session,
        handlers::session::delete_session,
        handlers::operations::list_operations,
        health::health_check,
    ),
    components(schemas(
        error::ErrorResponse,
        models::ImageDimensions,
        models::UploadResponse,
        models::ProcessRequest,
        models::ProcessResponse,
        models::SessionRequest,
        models::UndoResponse,
        models::ResetResponse,
        models::SessionResponse,
        models::HistogramData,
        models::HistogramResponse,
        catalog::OperationDescriptor,
        catalog::ParamDescriptor,
        catalog::ParamKind,
        catalog::Operation,
        health::HealthCheckResponse,
    )),
    tags(
        (name = "session", description = "Upload and edit images"),
        (name = "catalog", description = "Available operations and their parameters"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
