//! Export handler
//!
//! POST /api/process copies the input into the output directory under a
//! pattern-derived name.

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::{error::ApiResult, services::ExportRequest, AppState};

/// POST /api/process response
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub id: Uuid,
    pub output_filename: String,
}

/// POST /api/process
pub async fn process_output(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> ApiResult<Json<ExportResponse>> {
    let outcome = state.exporter.export(&state.store, &request).await?;

    Ok(Json(ExportResponse {
        id: outcome.id,
        output_filename: outcome.output_filename,
    }))
}

/// Build export routes
pub fn export_routes() -> Router<AppState> {
    Router::new().route("/api/process", post(process_output))
}
