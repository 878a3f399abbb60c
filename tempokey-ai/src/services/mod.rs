//! Service modules for the analysis workflow
//!
//! - Analyzer capability and its Essentia-backed implementation
//! - Exclusive job runner (interactive analysis + batch queue)
//! - Reconciliation of job results into the metadata store
//! - Export step producing renamed copies

pub mod analyzer;
pub mod camelot;
pub mod essentia_analyzer;
pub mod exporter;
pub mod job_runner;
pub mod reconciler;

pub use analyzer::{AnalysisError, Analyzer};
pub use essentia_analyzer::EssentiaAnalyzer;
pub use exporter::{ExportError, ExportOutcome, ExportRequest, Exporter};
pub use job_runner::{JobError, JobRunner};
pub use reconciler::reconcile;
