//! HTTP API handlers for tempokey-ai
//!
//! Thin layer over the library services: upload, analyze-now, batch queue,
//! status polling, export, deletions and static file access.

pub mod analysis;
pub mod export;
pub mod files;
pub mod health;
pub mod library;
pub mod upload;

pub use analysis::analysis_routes;
pub use export::export_routes;
pub use files::file_routes;
pub use health::health_routes;
pub use library::library_routes;
pub use upload::upload_routes;
