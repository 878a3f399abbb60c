//! Data directory housekeeping and static file access

use axum::Router;
use std::io::ErrorKind;
use std::path::Path;
use tower_http::services::ServeDir;
use tracing::warn;

use crate::{AppState, ServiceConfig};

/// Serve `/files/input/*` and `/files/output/*` from the data directories
pub fn file_routes(config: &ServiceConfig) -> Router<AppState> {
    Router::new()
        .nest_service("/files/input", ServeDir::new(&config.input_dir))
        .nest_service("/files/output", ServeDir::new(&config.output_dir))
}

/// Delete a file, treating an already-missing file as success
pub async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Empty a directory, keeping the directory itself
///
/// Failures on individual items are logged and skipped.
pub async fn clear_directory(dir: &Path) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to list directory for clearing");
            return;
        }
    };

    loop {
        let item = match entries.next_entry().await {
            Ok(Some(item)) => item,
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to read directory entry");
                break;
            }
        };

        let path = item.path();
        let removal = match item.file_type().await {
            Ok(kind) if kind.is_dir() => tokio::fs::remove_dir_all(&path).await,
            _ => tokio::fs::remove_file(&path).await,
        };
        if let Err(e) = removal {
            warn!(path = %path.display(), error = %e, "Failed to delete");
        }
    }
}
