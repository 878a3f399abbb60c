//! Data models for tempokey-ai
//!
//! - Library entries persisted in the metadata store
//! - Analysis results produced by the analyzer
//! - Queue status snapshots reported by the job runner

pub mod analysis;
pub mod library_entry;
pub mod queue_status;

pub use analysis::AnalysisResult;
pub use library_entry::{EntryStatus, LibraryEntry};
pub use queue_status::QueueStatus;
