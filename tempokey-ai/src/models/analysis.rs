//! Analysis result attached to a library entry

use serde::{Deserialize, Serialize};

/// Sentinel used when a key has no Camelot equivalent
pub const UNKNOWN_CAMELOT: &str = "Unknown";

/// Tempo and key estimate for one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Beats per minute, rounded to one decimal
    pub bpm: f64,
    /// Tempo confidence (0.0-1.0)
    pub bpm_confidence: f64,
    /// Key and scale, e.g. "C Major"
    pub key_standard: String,
    /// Camelot notation, e.g. "8B", or "Unknown"
    pub key_camelot: String,
    /// Key confidence (0.0-1.0)
    pub key_confidence: f64,
    /// Duration in seconds
    pub duration: f64,
}
