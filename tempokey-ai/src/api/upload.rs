//! Upload handler
//!
//! Only one upload is active at a time: a new upload wipes the input
//! directory and drops every entry that was never exported.

use axum::{
    extract::{multipart::Field, Multipart, State},
    routing::post,
    Json, Router,
};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use super::files::{clear_directory, remove_if_present};
use crate::{
    error::{ApiError, ApiResult},
    models::LibraryEntry,
    AppState,
};

/// Reduce a client-supplied name to a bare file name
fn upload_file_name(raw: &str) -> Option<String> {
    let name = Path::new(raw).file_name()?.to_str()?;
    if name.trim().is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

async fn write_field(field: &mut Field<'_>, path: &Path) -> ApiResult<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Upload interrupted: {}", e)))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

/// POST /api/upload (multipart field `file`)
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<LibraryEntry>> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .and_then(upload_file_name)
            .ok_or_else(|| ApiError::BadRequest("Upload has no usable file name".to_string()))?;

        clear_directory(&state.config.input_dir).await;
        state.store.clear_inputs().await;

        let path = state.config.input_dir.join(&filename);
        let size = match write_field(&mut field, &path).await {
            Ok(size) => size,
            Err(e) => {
                if let Err(cleanup) = remove_if_present(&path).await {
                    warn!(path = %path.display(), error = %cleanup, "Failed to remove partial upload");
                }
                return Err(e);
            }
        };
        info!(filename = %filename, bytes = size, "Upload saved");

        let entry = state.store.add_entry(&filename).await;
        return Ok(Json(entry));
    }

    Err(ApiError::BadRequest("Missing multipart field 'file'".to_string()))
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/api/upload", post(upload_file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_file_name_strips_directories() {
        assert_eq!(upload_file_name("track.mp3").as_deref(), Some("track.mp3"));
        assert_eq!(upload_file_name("../../etc/track.mp3").as_deref(), Some("track.mp3"));
        assert_eq!(upload_file_name("..").as_deref(), None);
        assert_eq!(upload_file_name("").as_deref(), None);
    }
}
