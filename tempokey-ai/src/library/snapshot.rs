//! JSON snapshot persistence for the metadata store
//!
//! One document per library: an ordered array of entry records, rewritten in
//! full on every mutation.

use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

use crate::models::LibraryEntry;

/// Snapshot read/write errors
///
/// Never escapes the store: a corrupt snapshot resets the library to empty
/// and a failed write is logged while the in-memory state moves on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access library snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Library snapshot is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Read the snapshot
///
/// Returns `Ok(None)` when no snapshot exists yet.
pub async fn read_snapshot(path: &Path) -> Result<Option<Vec<LibraryEntry>>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let entries = serde_json::from_slice(&bytes)?;
    Ok(Some(entries))
}

/// Overwrite the snapshot with the full entry list
pub async fn write_snapshot(path: &Path, entries: &[LibraryEntry]) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(entries)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
