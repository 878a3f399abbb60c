//! Library listing and deletion handlers
//!
//! Deleting a file also forgets it in the store; the store drops the entry
//! once neither file remains.

use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::files::{clear_directory, remove_if_present};
use crate::{
    error::{ApiError, ApiResult},
    models::LibraryEntry,
    AppState,
};

/// Deletion acknowledgement
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn new(status: &str) -> Json<Self> {
        Json(Self {
            status: status.to_string(),
        })
    }
}

/// GET /api/library
pub async fn get_library(State(state): State<AppState>) -> Json<Vec<LibraryEntry>> {
    Json(state.store.get_all().await)
}

async fn find_entry(state: &AppState, id: Uuid) -> ApiResult<LibraryEntry> {
    state
        .store
        .get_entry(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Entry not found: {}", id)))
}

/// DELETE /api/library/{id}/input
pub async fn delete_input(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    let entry = find_entry(&state, id).await?;

    if let Some(input) = &entry.input_path {
        remove_if_present(&state.config.input_dir.join(input)).await?;
        state.store.delete_input(id).await;
        info!(id = %id, file = %input, "Input file deleted");
    }

    Ok(StatusResponse::new("deleted"))
}

/// DELETE /api/library/{id}/output
pub async fn delete_output(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    let entry = find_entry(&state, id).await?;

    if let Some(output) = &entry.output_path {
        remove_if_present(&state.config.output_dir.join(output)).await?;
        state.store.delete_output(id).await;
        info!(id = %id, file = %output, "Output file deleted");
    }

    Ok(StatusResponse::new("deleted"))
}

/// DELETE /api/library
///
/// Wipes both data directories and every entry.
pub async fn clear_library(State(state): State<AppState>) -> Json<StatusResponse> {
    clear_directory(&state.config.output_dir).await;
    clear_directory(&state.config.input_dir).await;
    state.store.clear_all().await;

    StatusResponse::new("cleared")
}

/// Build library routes
pub fn library_routes() -> Router<AppState> {
    Router::new()
        .route("/api/library", get(get_library).delete(clear_library))
        .route("/api/library/:id/input", delete(delete_input))
        .route("/api/library/:id/output", delete(delete_output))
}
