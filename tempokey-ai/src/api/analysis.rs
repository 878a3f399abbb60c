//! Analysis handlers
//!
//! POST /api/analyze, POST /api/queue, GET /api/status

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiResult,
    models::{AnalysisResult, QueueStatus},
    services::reconcile,
    AppState,
};

/// POST /api/analyze request
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub filename: String,
}

/// POST /api/queue request
#[derive(Debug, Deserialize)]
pub struct QueueRequest {
    pub filenames: Vec<String>,
}

/// POST /api/queue response
#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub message: String,
}

/// POST /api/analyze
///
/// Analyzes immediately, waiting behind any batch item in progress. The
/// result is attached to the file's library entry when one exists.
pub async fn analyze_file(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalysisResult>> {
    let entry = state.store.get_entry_by_filename(&request.filename).await;

    let result = state.runner.process_file(&request.filename).await?;

    if let Some(entry) = entry {
        state.store.update_analysis(entry.id, result.clone()).await;
    }

    Ok(Json(result))
}

/// POST /api/queue
pub async fn add_to_queue(
    State(state): State<AppState>,
    Json(request): Json<QueueRequest>,
) -> Json<QueueResponse> {
    let count = request.filenames.len();
    state.runner.add_to_queue(request.filenames).await;

    Json(QueueResponse {
        message: format!("Added {} files to queue", count),
    })
}

/// GET /api/status
///
/// Also folds finished results into the library.
pub async fn get_status(State(state): State<AppState>) -> Json<QueueStatus> {
    let status = state.runner.get_status().await;
    reconcile(&state.store, &status.results).await;
    Json(status)
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analyze", post(analyze_file))
        .route("/api/queue", post(add_to_queue))
        .route("/api/status", get(get_status))
}
