//! Metadata store
//!
//! Entries are kept in insertion order. Lookups by filename return the
//! earliest entry with that name; duplicates are tolerated.
//!
//! Every mutating call persists the full entry set before returning. A failed
//! write is logged and remembered for `/health`, but the in-memory mutation is
//! kept: the latest change may be lost if the process dies before the next
//! successful save.

use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::snapshot::{read_snapshot, write_snapshot};
use crate::models::{AnalysisResult, EntryStatus, LibraryEntry};

#[derive(Debug, Default)]
struct StoreState {
    entries: Vec<LibraryEntry>,
    last_persist_error: Option<String>,
}

/// Durable mapping from entry id to library entry
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl MetadataStore {
    /// Open the store at `path`, loading any existing snapshot
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self {
            path: path.into(),
            state: RwLock::new(StoreState::default()),
        };
        store.load().await;
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace in-memory entries with the persisted snapshot
    ///
    /// An absent or unreadable snapshot yields an empty library.
    pub async fn load(&self) {
        let entries = match read_snapshot(&self.path).await {
            Ok(Some(entries)) => {
                info!(path = %self.path.display(), count = entries.len(), "Library loaded");
                entries
            }
            Ok(None) => {
                info!(path = %self.path.display(), "No library snapshot, starting empty");
                Vec::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Library snapshot unusable, starting empty");
                Vec::new()
            }
        };

        self.state.write().await.entries = entries;
    }

    /// Persist the current entry set
    pub async fn save(&self) {
        let mut state = self.state.write().await;
        self.persist(&mut state).await;
    }

    async fn persist(&self, state: &mut StoreState) {
        match write_snapshot(&self.path, &state.entries).await {
            Ok(()) => {
                debug!(count = state.entries.len(), "Library saved");
                state.last_persist_error = None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to save library");
                state.last_persist_error = Some(e.to_string());
            }
        }
    }

    /// Most recent save failure, cleared by the next successful save
    pub async fn last_persist_error(&self) -> Option<String> {
        self.state.read().await.last_persist_error.clone()
    }

    /// Create an entry for a freshly uploaded file
    pub async fn add_entry(&self, filename: &str) -> LibraryEntry {
        let entry = LibraryEntry::new(filename.to_string());

        let mut state = self.state.write().await;
        state.entries.push(entry.clone());
        self.persist(&mut state).await;

        info!(id = %entry.id, filename = %entry.filename, "Library entry created");
        entry
    }

    pub async fn get_entry(&self, id: Uuid) -> Option<LibraryEntry> {
        self.state
            .read()
            .await
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// First entry (in insertion order) with the given filename
    pub async fn get_entry_by_filename(&self, filename: &str) -> Option<LibraryEntry> {
        self.state
            .read()
            .await
            .entries
            .iter()
            .find(|e| e.filename == filename)
            .cloned()
    }

    /// Attach an analysis result and mark the entry completed
    ///
    /// Returns false, without persisting, when the entry no longer exists.
    pub async fn update_analysis(&self, id: Uuid, result: AnalysisResult) -> bool {
        let mut state = self.state.write().await;
        let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) else {
            warn!(id = %id, "Analysis update for unknown library entry ignored");
            return false;
        };

        entry.analysis = Some(result);
        entry.status = EntryStatus::Completed;
        self.persist(&mut state).await;
        true
    }

    /// Record the exported file name
    pub async fn set_output(&self, id: Uuid, output_filename: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) else {
            warn!(id = %id, "Output update for unknown library entry ignored");
            return false;
        };

        entry.output_path = Some(output_filename.to_string());
        self.persist(&mut state).await;
        true
    }

    /// Forget the input file; removes the entry if no output remains
    pub async fn delete_input(&self, id: Uuid) -> bool {
        self.clear_path(id, |entry| entry.input_path = None).await
    }

    /// Forget the output file; removes the entry if no input remains
    pub async fn delete_output(&self, id: Uuid) -> bool {
        self.clear_path(id, |entry| entry.output_path = None).await
    }

    async fn clear_path(&self, id: Uuid, clear: impl FnOnce(&mut LibraryEntry)) -> bool {
        let mut state = self.state.write().await;
        let Some(index) = state.entries.iter().position(|e| e.id == id) else {
            return false;
        };

        clear(&mut state.entries[index]);
        Self::check_cleanup(&mut state.entries, index);
        self.persist(&mut state).await;
        true
    }

    /// Drop the entry at `index` once both of its paths are gone
    fn check_cleanup(entries: &mut Vec<LibraryEntry>, index: usize) {
        if entries[index].is_orphaned() {
            let removed = entries.remove(index);
            info!(id = %removed.id, filename = %removed.filename, "Library entry removed");
        }
    }

    /// The input directory was wiped
    ///
    /// Exported entries survive with their input cleared; entries never
    /// exported are dropped. Persists once.
    pub async fn clear_inputs(&self) {
        let mut state = self.state.write().await;
        let before = state.entries.len();

        state.entries.retain_mut(|entry| {
            entry.input_path = None;
            !entry.is_orphaned()
        });

        info!(
            retained = state.entries.len(),
            dropped = before - state.entries.len(),
            "Library inputs cleared"
        );
        self.persist(&mut state).await;
    }

    /// Remove every entry
    pub async fn clear_all(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        self.persist(&mut state).await;
        info!("Library cleared");
    }

    /// Copy of all entries in insertion order
    pub async fn get_all(&self) -> Vec<LibraryEntry> {
        self.state.read().await.entries.clone()
    }
}
