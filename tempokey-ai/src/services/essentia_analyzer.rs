//! Essentia-backed analyzer
//!
//! Runs the Essentia music extractor command-line tool on a file and reads
//! tempo, key and duration from its JSON report.
//!
//! Usage of the tool: `essentia_streaming_extractor_music input.mp3 output.json`

use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use super::analyzer::{AnalysisError, Analyzer};
use super::camelot::{camelot_key, standard_key};
use crate::models::AnalysisResult;

/// Analyzer delegating to the Essentia extractor binary
#[derive(Debug, Clone)]
pub struct EssentiaAnalyzer {
    binary_path: String,
}

impl EssentiaAnalyzer {
    pub fn new(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Check whether the extractor can be launched
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary_path).arg("--version").output().is_ok()
    }
}

impl Analyzer for EssentiaAnalyzer {
    fn analyze(&self, audio_path: &Path) -> Result<AnalysisResult, AnalysisError> {
        if !audio_path.exists() {
            return Err(AnalysisError::new(audio_path, "audio file not found"));
        }

        let temp_output =
            std::env::temp_dir().join(format!("tempokey_{}.json", uuid::Uuid::new_v4()));

        tracing::debug!(
            audio_file = %audio_path.display(),
            output_file = %temp_output.display(),
            "Running Essentia analysis"
        );

        let output = Command::new(&self.binary_path)
            .arg(audio_path)
            .arg(&temp_output)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => AnalysisError::new(
                    audio_path,
                    format!("extractor binary not found: {}", self.binary_path),
                ),
                _ => AnalysisError::new(audio_path, format!("failed to run extractor: {}", e)),
            })?;

        if !output.status.success() {
            let _ = std::fs::remove_file(&temp_output);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AnalysisError::new(
                audio_path,
                format!("extractor exit code {:?}: {}", output.status.code(), stderr.trim()),
            ));
        }

        let report = std::fs::read_to_string(&temp_output);
        let _ = std::fs::remove_file(&temp_output);
        let report = report
            .map_err(|e| AnalysisError::new(audio_path, format!("extractor report unreadable: {}", e)))?;

        let json: Value = serde_json::from_str(&report)
            .map_err(|e| AnalysisError::new(audio_path, format!("extractor report malformed: {}", e)))?;

        let result = parse_report(&json).map_err(|cause| AnalysisError::new(audio_path, cause))?;

        tracing::info!(
            audio_file = %audio_path.display(),
            bpm = result.bpm,
            key = %result.key_standard,
            "Essentia analysis completed"
        );

        Ok(result)
    }
}

/// Read a descriptor that is either a plain number or an aggregate with a mean
fn scalar(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::Object(stats) => stats.get("mean").and_then(Value::as_f64),
        _ => None,
    }
}

/// Extract an analysis result from an extractor JSON report
///
/// Newer reports carry the key under `tonal.key_edma`; older ones use flat
/// `tonal.key_key`/`key_scale`/`key_strength` fields.
pub fn parse_report(json: &Value) -> Result<AnalysisResult, String> {
    let bpm = scalar(json.pointer("/rhythm/bpm"))
        .filter(|bpm| *bpm > 0.0)
        .ok_or("report has no tempo estimate")?;
    let bpm_confidence = scalar(json.pointer("/rhythm/bpm_histogram_first_peak_weight"))
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);

    let (key, scale, strength) = match json.pointer("/tonal/key_edma") {
        Some(edma) => (
            edma.get("key").and_then(Value::as_str),
            edma.get("scale").and_then(Value::as_str),
            scalar(edma.get("strength")),
        ),
        None => (
            json.pointer("/tonal/key_key").and_then(Value::as_str),
            json.pointer("/tonal/key_scale").and_then(Value::as_str),
            scalar(json.pointer("/tonal/key_strength")),
        ),
    };
    let (Some(key), Some(scale)) = (key, scale) else {
        return Err("report has no key estimate".to_string());
    };
    let key_standard = standard_key(key, scale);

    let duration = scalar(json.pointer("/metadata/audio_properties/length"))
        .unwrap_or(0.0)
        .max(0.0);

    Ok(AnalysisResult {
        bpm: (bpm * 10.0).round() / 10.0,
        bpm_confidence,
        key_camelot: camelot_key(&key_standard).to_string(),
        key_standard,
        key_confidence: strength.unwrap_or(0.0).clamp(0.0, 1.0),
        duration,
    })
}
