//! tempokey-ai library interface
//!
//! Audio analysis service: accepts an uploaded track, estimates tempo and
//! key through an external analyzer, keeps the results in a durable library
//! and exports renamed copies. Exposes its services for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod library;
pub mod models;
pub mod services;

pub use crate::config::ServiceConfig;
pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::library::MetadataStore;
use crate::services::{Analyzer, EssentiaAnalyzer, Exporter, JobRunner};

/// Application state shared across handlers
///
/// Owns the service instances for the process lifetime. Constructed once at
/// startup; `shutdown` must be awaited before exit.
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration
    pub config: Arc<ServiceConfig>,
    /// Durable library metadata
    pub store: Arc<MetadataStore>,
    /// Exclusive analysis runner and batch queue
    pub runner: JobRunner,
    /// Renamed-copy export step
    pub exporter: Exporter,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Build services backed by the Essentia extractor
    pub async fn new(config: ServiceConfig) -> Self {
        let analyzer = EssentiaAnalyzer::new(config.analyzer_binary.clone());
        if !analyzer.is_available() {
            tracing::warn!(
                binary = %config.analyzer_binary,
                "Analyzer binary not runnable, analysis requests will fail"
            );
        }
        Self::with_analyzer(config, Arc::new(analyzer)).await
    }

    /// Build services around a specific analyzer
    pub async fn with_analyzer(config: ServiceConfig, analyzer: Arc<dyn Analyzer>) -> Self {
        let store = MetadataStore::open(config.library_path.clone()).await;
        let runner = JobRunner::new(config.input_dir.clone(), analyzer);
        let exporter = Exporter::new(config.input_dir.clone(), config.output_dir.clone());

        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            runner,
            exporter,
            startup_time: Utc::now(),
        }
    }

    /// Let the active queue drain finish, then write a final snapshot
    pub async fn shutdown(&self) {
        info!("Waiting for queued analysis to finish");
        self.runner.shutdown().await;
        self.store.save().await;
        info!("Services stopped");
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .merge(api::health_routes())
        .merge(api::library_routes())
        .merge(api::upload_routes().layer(DefaultBodyLimit::max(upload_limit)))
        .merge(api::analysis_routes())
        .merge(api::export_routes())
        .merge(api::file_routes(&state.config))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
