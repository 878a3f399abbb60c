//! Library entry lifecycle
//!
//! An entry lives while at least one of its files (the uploaded input or an
//! exported output) is still on disk. The metadata store removes it the
//! moment both paths are cleared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AnalysisResult;

/// Processing status of a library entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// File uploaded, no analysis yet
    Uploaded,
    /// Waiting in the batch queue
    Pending,
    /// Analysis in progress
    Processing,
    /// Analysis attached
    Completed,
    /// Analysis failed
    Error,
}

/// One uploaded track and everything derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// Unique entry identifier, assigned at creation
    pub id: Uuid,

    /// Original upload name
    pub filename: String,

    /// File name inside the input directory, while the upload still exists
    #[serde(default)]
    pub input_path: Option<String>,

    /// File name inside the output directory, once exported
    #[serde(default)]
    pub output_path: Option<String>,

    /// Analysis result, once a job has completed
    #[serde(default)]
    pub analysis: Option<AnalysisResult>,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Current status
    pub status: EntryStatus,
}

impl LibraryEntry {
    /// Create a freshly uploaded entry whose input file carries the upload name
    pub fn new(filename: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_path: Some(filename.clone()),
            filename,
            output_path: None,
            analysis: None,
            created_at: Utc::now(),
            status: EntryStatus::Uploaded,
        }
    }

    /// True when neither the input nor an output file is referenced
    pub fn is_orphaned(&self) -> bool {
        self.input_path.is_none() && self.output_path.is_none()
    }

    pub fn is_completed(&self) -> bool {
        self.status == EntryStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_is_uploaded_with_input() {
        let entry = LibraryEntry::new("track.mp3".to_string());
        assert_eq!(entry.status, EntryStatus::Uploaded);
        assert_eq!(entry.input_path.as_deref(), Some("track.mp3"));
        assert!(entry.output_path.is_none());
        assert!(!entry.is_orphaned());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&EntryStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }
}
