//! Copies job results into the metadata store
//!
//! Results live in the job runner only for the process lifetime. Each status
//! poll folds them into the durable entries. The guard is the stored status:
//! an entry already marked completed is left alone, so replaying the same
//! results is a no-op.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::library::MetadataStore;
use crate::models::AnalysisResult;

/// Attach cached results to entries not yet completed
///
/// Results whose entry no longer exists are skipped. Returns the number of
/// entries updated.
pub async fn reconcile(store: &MetadataStore, results: &HashMap<String, AnalysisResult>) -> usize {
    let mut updated = 0;

    for (filename, result) in results {
        match store.get_entry_by_filename(filename).await {
            Some(entry) if entry.is_completed() => {}
            Some(entry) => {
                if store.update_analysis(entry.id, result.clone()).await {
                    info!(id = %entry.id, filename = %filename, "Analysis result reconciled into library");
                    updated += 1;
                }
            }
            None => {
                debug!(filename = %filename, "No library entry for cached result, skipping");
            }
        }
    }

    updated
}
