use std::sync::Arc;

use axum::{extract::State, Json};
use retouch_processing::catalog::OperationDescriptor;

use crate::state::AppState;

/// List every operation with its parameter schema
#[utoipa::path(
    get,
    path = "/operations",
    tag = "catalog",
    responses(
        (status = 200, description = "Operation catalog", body = [OperationDescriptor])
    )
)]
pub async fn list_operations(State(state): State<Arc<AppState>>) -> Json<Vec<OperationDescriptor>> {
    Json(state.catalog.describe())
}
