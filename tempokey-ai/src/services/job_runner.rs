//! Exclusive job runner
//!
//! All analysis work goes through one exclusion slot, whether it comes from an
//! interactive "analyze now" request or from the batch queue. The batch queue
//! is drained by at most one background task, which releases the slot between
//! items so interactive requests can interleave instead of waiting for the
//! whole batch.
//!
//! Lock order is always slot, then queue bookkeeping. The bookkeeping lock is
//! only held for short, non-blocking updates.

use std::collections::{HashMap, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::analyzer::{AnalysisError, Analyzer};
use crate::models::{AnalysisResult, QueueStatus};

/// Job execution errors
#[derive(Debug, Error)]
pub enum JobError {
    /// Input file absent from the input directory
    #[error("File not found: {0}")]
    NotFound(String),

    /// Analyzer failed
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<String>,
    current_file: Option<String>,
    is_processing: bool,
    processed_count: usize,
    failed_count: usize,
    total_count: usize,
    results: HashMap<String, AnalysisResult>,
    drain_task: Option<JoinHandle<()>>,
    #[cfg(test)]
    drains_started: usize,
}

struct RunnerInner {
    input_dir: PathBuf,
    analyzer: Arc<dyn Analyzer>,
    /// Single-permit exclusion slot shared by both entry points
    slot: Mutex<()>,
    queue: Mutex<QueueState>,
}

/// Serializes analysis jobs and drains the batch queue
#[derive(Clone)]
pub struct JobRunner {
    inner: Arc<RunnerInner>,
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("input_dir", &self.inner.input_dir)
            .finish_non_exhaustive()
    }
}

impl JobRunner {
    pub fn new(input_dir: impl Into<PathBuf>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                input_dir: input_dir.into(),
                analyzer,
                slot: Mutex::new(()),
                queue: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.inner.input_dir
    }

    /// Analyze one file now
    ///
    /// Waits for the exclusion slot, so it never overlaps a batch item. The
    /// result is also cached under `filename` for later reconciliation.
    pub async fn process_file(&self, filename: &str) -> Result<AnalysisResult, JobError> {
        let _slot = self.inner.slot.lock().await;
        debug!(filename = %filename, "Interactive analysis acquired slot");

        let result = self.inner.analyze(filename).await?;

        self.inner
            .queue
            .lock()
            .await
            .results
            .insert(filename.to_string(), result.clone());

        info!(filename = %filename, bpm = result.bpm, key = %result.key_standard, "Interactive analysis completed");
        Ok(result)
    }

    /// Append files to the batch queue, starting a drain if none is active
    pub async fn add_to_queue(&self, filenames: Vec<String>) {
        if filenames.is_empty() {
            return;
        }

        let mut queue = self.inner.queue.lock().await;
        queue.total_count += filenames.len();
        info!(added = filenames.len(), queue_length = queue.pending.len() + filenames.len(), "Files queued");
        queue.pending.extend(filenames);

        if !queue.is_processing {
            queue.is_processing = true;
            #[cfg(test)]
            {
                queue.drains_started += 1;
            }
            let inner = Arc::clone(&self.inner);
            queue.drain_task = Some(tokio::spawn(drain_queue(inner)));
        }
    }

    /// Point-in-time queue snapshot
    ///
    /// Does not wait for the exclusion slot, so it stays responsive while an
    /// analysis is running.
    pub async fn get_status(&self) -> QueueStatus {
        let queue = self.inner.queue.lock().await;
        QueueStatus {
            queue_length: queue.pending.len(),
            is_processing: queue.is_processing,
            current_file: queue.current_file.clone(),
            processed_count: queue.processed_count,
            failed_count: queue.failed_count,
            total_count: queue.total_count,
            results: queue.results.clone(),
        }
    }

    /// Wait for the active drain, if any, to finish the queue
    ///
    /// Items are never aborted once started.
    pub async fn shutdown(&self) {
        let task = self.inner.queue.lock().await.drain_task.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Queue drain task ended abnormally");
            }
        }
    }
}

impl RunnerInner {
    /// Resolve a bare file name inside the input directory
    fn input_file(&self, filename: &str) -> Option<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(self.input_dir.join(filename)),
            _ => None,
        }
    }

    /// Run the analyzer on a blocking worker. Caller holds the slot.
    async fn analyze(&self, filename: &str) -> Result<AnalysisResult, JobError> {
        let path = self
            .input_file(filename)
            .ok_or_else(|| JobError::NotFound(filename.to_string()))?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(JobError::NotFound(filename.to_string()));
        }

        let analyzer = Arc::clone(&self.analyzer);
        let task_path = path.clone();
        let outcome = tokio::task::spawn_blocking(move || analyzer.analyze(&task_path))
            .await
            .map_err(|e| AnalysisError::new(&path, format!("analysis task failed: {}", e)))?;

        Ok(outcome?)
    }
}

/// Background FIFO drain
///
/// Takes the slot per item and gives it back before the next one. A failed
/// item is counted and logged; the rest of the queue still runs.
async fn drain_queue(inner: Arc<RunnerInner>) {
    info!("Queue drain started");

    loop {
        let _slot = inner.slot.lock().await;

        let filename = {
            let mut queue = inner.queue.lock().await;
            match queue.pending.pop_front() {
                Some(filename) => {
                    queue.current_file = Some(filename.clone());
                    filename
                }
                None => {
                    queue.is_processing = false;
                    break;
                }
            }
        };

        let outcome = inner.analyze(&filename).await;

        let mut queue = inner.queue.lock().await;
        match outcome {
            Ok(result) => {
                queue.results.insert(filename.clone(), result);
                queue.processed_count += 1;
                info!(filename = %filename, processed = queue.processed_count, "Queued file processed");
            }
            Err(e) => {
                queue.failed_count += 1;
                warn!(filename = %filename, error = %e, "Queued file failed, continuing");
            }
        }
        queue.current_file = None;
    }

    info!("Queue drain finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Instrumented analyzer recording call order and overlap
    #[derive(Default)]
    struct StubAnalyzer {
        delay: Duration,
        fail: HashSet<String>,
        active: AtomicUsize,
        max_active: AtomicUsize,
        calls: std::sync::Mutex<Vec<String>>,
    }

    impl StubAnalyzer {
        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Analyzer for StubAnalyzer {
        fn analyze(&self, path: &Path) -> Result<AnalysisResult, AnalysisError> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(name.clone());

            std::thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.fail.contains(&name) {
                return Err(AnalysisError::new(path, "stub failure"));
            }
            Ok(AnalysisResult {
                bpm: 120.0,
                bpm_confidence: 0.9,
                key_standard: "C Major".to_string(),
                key_camelot: "8B".to_string(),
                key_confidence: 0.8,
                duration: 60.0,
            })
        }
    }

    fn touch(dir: &TempDir, names: &[&str]) {
        for name in names {
            std::fs::write(dir.path().join(name), b"fake audio").unwrap();
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_drain_reports_completed_batch() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["A.mp3", "B.mp3"]);
        let runner = JobRunner::new(dir.path(), Arc::new(StubAnalyzer::default()));

        runner.add_to_queue(names(&["A.mp3", "B.mp3"])).await;
        runner.shutdown().await;

        let status = runner.get_status().await;
        assert_eq!(status.processed_count, 2);
        assert_eq!(status.queue_length, 0);
        assert_eq!(status.total_count, 2);
        assert!(!status.is_processing);
        assert!(status.current_file.is_none());
        assert!(status.results.contains_key("A.mp3"));
        assert!(status.results.contains_key("B.mp3"));
    }

    #[tokio::test]
    async fn test_queue_is_fifo_across_enqueues() {
        let dir = TempDir::new().unwrap();
        let files = ["1.mp3", "2.mp3", "3.mp3", "4.mp3", "5.mp3"];
        touch(&dir, &files);
        let analyzer = Arc::new(StubAnalyzer::with_delay(Duration::from_millis(10)));
        let runner = JobRunner::new(dir.path(), analyzer.clone());

        runner.add_to_queue(names(&files[..2])).await;
        runner.add_to_queue(names(&files[2..])).await;
        runner.shutdown().await;

        assert_eq!(analyzer.calls(), names(&files));
        let status = runner.get_status().await;
        assert_eq!(status.processed_count + status.queue_length, status.total_count);
    }

    #[tokio::test]
    async fn test_failed_item_does_not_stop_batch() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["ok1.mp3", "bad.mp3", "ok2.mp3"]);
        let analyzer = StubAnalyzer {
            fail: HashSet::from(["bad.mp3".to_string()]),
            ..StubAnalyzer::default()
        };
        let runner = JobRunner::new(dir.path(), Arc::new(analyzer));

        runner
            .add_to_queue(names(&["ok1.mp3", "bad.mp3", "missing.mp3", "ok2.mp3"]))
            .await;
        runner.shutdown().await;

        let status = runner.get_status().await;
        assert_eq!(status.processed_count, 2);
        assert_eq!(status.failed_count, 2);
        assert_eq!(
            status.processed_count + status.failed_count + status.queue_length,
            status.total_count
        );
        assert!(!status.results.contains_key("bad.mp3"));
        assert!(!status.results.contains_key("missing.mp3"));
        assert!(status.results.contains_key("ok2.mp3"));
    }

    #[tokio::test]
    async fn test_drain_restarts_after_finishing() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["A.mp3", "B.mp3"]);
        let runner = JobRunner::new(dir.path(), Arc::new(StubAnalyzer::default()));

        runner.add_to_queue(names(&["A.mp3"])).await;
        runner.shutdown().await;
        assert!(!runner.get_status().await.is_processing);

        runner.add_to_queue(names(&["B.mp3"])).await;
        runner.shutdown().await;

        let status = runner.get_status().await;
        assert_eq!(status.processed_count, 2);
        assert_eq!(status.total_count, 2);
    }

    #[tokio::test]
    async fn test_enqueue_during_drain_extends_active_drain() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["A.mp3", "B.mp3", "C.mp3", "D.mp3"]);
        let analyzer = Arc::new(StubAnalyzer::with_delay(Duration::from_millis(50)));
        let runner = JobRunner::new(dir.path(), analyzer.clone());

        runner.add_to_queue(names(&["A.mp3"])).await;
        while analyzer.calls().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(runner.get_status().await.is_processing);

        runner.add_to_queue(names(&["B.mp3"])).await;
        runner.add_to_queue(names(&["C.mp3"])).await;
        assert_eq!(runner.inner.queue.lock().await.drains_started, 1);

        runner.shutdown().await;
        assert_eq!(analyzer.calls(), names(&["A.mp3", "B.mp3", "C.mp3"]));
        assert_eq!(runner.inner.queue.lock().await.drains_started, 1);

        runner.add_to_queue(names(&["D.mp3"])).await;
        runner.shutdown().await;
        assert_eq!(runner.inner.queue.lock().await.drains_started, 2);
        assert_eq!(runner.get_status().await.processed_count, 4);
    }

    #[tokio::test]
    async fn test_process_file_caches_result() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["track.mp3"]);
        let runner = JobRunner::new(dir.path(), Arc::new(StubAnalyzer::default()));

        let result = runner.process_file("track.mp3").await.unwrap();

        let status = runner.get_status().await;
        assert_eq!(status.results.get("track.mp3"), Some(&result));
        assert_eq!(status.processed_count, 0);
        assert_eq!(status.total_count, 0);
    }

    #[tokio::test]
    async fn test_process_file_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let analyzer = Arc::new(StubAnalyzer::default());
        let runner = JobRunner::new(dir.path(), analyzer.clone());

        let err = runner.process_file("absent.mp3").await.unwrap_err();
        assert!(matches!(err, JobError::NotFound(name) if name == "absent.mp3"));

        let err = runner.process_file("../escape.mp3").await.unwrap_err();
        assert!(matches!(err, JobError::NotFound(_)));
        assert!(analyzer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_process_file_propagates_analysis_error() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["bad.mp3"]);
        let analyzer = StubAnalyzer {
            fail: HashSet::from(["bad.mp3".to_string()]),
            ..StubAnalyzer::default()
        };
        let runner = JobRunner::new(dir.path(), Arc::new(analyzer));

        let err = runner.process_file("bad.mp3").await.unwrap_err();
        assert!(matches!(err, JobError::Analysis(e) if e.cause == "stub failure"));
        assert!(runner.get_status().await.results.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_two_analyses_overlap() {
        let dir = TempDir::new().unwrap();
        let batch = ["b1.mp3", "b2.mp3", "b3.mp3", "b4.mp3"];
        let interactive = ["i1.mp3", "i2.mp3", "i3.mp3"];
        touch(&dir, &batch);
        touch(&dir, &interactive);
        let analyzer = Arc::new(StubAnalyzer::with_delay(Duration::from_millis(20)));
        let runner = JobRunner::new(dir.path(), analyzer.clone());

        runner.add_to_queue(names(&batch)).await;
        let mut handles = Vec::new();
        for name in interactive {
            let runner = runner.clone();
            handles.push(tokio::spawn(async move { runner.process_file(name).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        runner.shutdown().await;

        assert_eq!(analyzer.calls().len(), batch.len() + interactive.len());
        assert_eq!(analyzer.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_interactive_request_interleaves_with_batch() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["b1.mp3", "b2.mp3", "b3.mp3", "now.mp3"]);
        let analyzer = Arc::new(StubAnalyzer::with_delay(Duration::from_millis(30)));
        let runner = JobRunner::new(dir.path(), analyzer.clone());

        runner.add_to_queue(names(&["b1.mp3", "b2.mp3", "b3.mp3"])).await;
        runner.process_file("now.mp3").await.unwrap();
        runner.shutdown().await;

        let calls = analyzer.calls();
        assert_eq!(calls.len(), 4);
        assert_ne!(calls.last().map(String::as_str), Some("now.mp3"));
    }

    #[tokio::test]
    async fn test_status_readable_while_analysis_runs() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["slow.mp3"]);
        let analyzer = Arc::new(StubAnalyzer::with_delay(Duration::from_millis(200)));
        let runner = JobRunner::new(dir.path(), analyzer);

        runner.add_to_queue(names(&["slow.mp3"])).await;
        let status = tokio::time::timeout(Duration::from_millis(100), runner.get_status())
            .await
            .expect("status must not wait for the running analysis");
        assert!(status.is_processing);

        runner.shutdown().await;
    }
}
