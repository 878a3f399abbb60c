//! Analyzer capability
//!
//! Tempo/key estimation is an expensive, blocking computation performed by
//! an external tool. The job runner only depends on this trait and always
//! calls it from a blocking worker thread.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::AnalysisResult;

/// Analysis failure for one file
#[derive(Debug, Clone, Error)]
#[error("Analysis failed for {}: {}", .path.display(), .cause)]
pub struct AnalysisError {
    /// File that was being analyzed
    pub path: PathBuf,
    /// What went wrong
    pub cause: String,
}

impl AnalysisError {
    pub fn new(path: &Path, cause: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            cause: cause.into(),
        }
    }
}

/// Blocking tempo/key analysis of an audio file
pub trait Analyzer: Send + Sync {
    fn analyze(&self, path: &Path) -> Result<AnalysisResult, AnalysisError>;
}
