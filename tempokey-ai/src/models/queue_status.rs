//! Point-in-time view of the batch queue

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::AnalysisResult;

/// Job runner status snapshot
///
/// Advisory only: it is read without taking the exclusion slot and may be
/// momentarily stale relative to the queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Items waiting to be processed
    pub queue_length: usize,
    /// A drain task is active
    pub is_processing: bool,
    /// Item currently being analyzed by the drain task
    pub current_file: Option<String>,
    /// Batch items analyzed successfully
    pub processed_count: usize,
    /// Batch items whose analysis failed
    pub failed_count: usize,
    /// Items ever enqueued
    pub total_count: usize,
    /// Results for this process lifetime, keyed by filename
    pub results: HashMap<String, AnalysisResult>,
}
