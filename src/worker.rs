//! Background worker for long-running transforms.
//!
//! Nonlinear/least-squares fitting can take long enough to stall the
//! event-loop thread, so background-registered transforms are computed on
//! a dedicated worker thread and their results marshalled back through a
//! crossbeam channel.
//!
//! A job carries the edge key and the edge generation at dispatch time.
//! When the engine polls results it discards any whose edge no longer
//! exists or whose generation is stale — the use-after-close guard.
//! `disable_transform`/`close_window` additionally set the job's cancel
//! token so a not-yet-started job is skipped outright.

use crate::error::Result;
use crate::graph::EdgeKey;
use crate::selection::Selection;
use crate::transforms::{TransformFn, TransformOutput, TransformParams};
use crate::types::{CurveId, PlotRef};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// A transform computation dispatched to the worker thread.
pub struct TransformJob {
    pub key: EdgeKey,
    pub derived: PlotRef,
    pub derived_curve: CurveId,
    pub generation: u64,
    pub selection: Selection,
    pub params: TransformParams,
    pub function: TransformFn,
    pub cancel: Arc<AtomicBool>,
}

/// Outcome of a worker job, tagged for staleness checks.
pub struct TransformJobResult {
    pub key: EdgeKey,
    pub derived: PlotRef,
    pub derived_curve: CurveId,
    pub generation: u64,
    pub outcome: Result<TransformOutput>,
}

/// Owns the worker thread and its channels.
pub struct TransformWorker {
    job_tx: Sender<TransformJob>,
    result_rx: Receiver<TransformJobResult>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TransformWorker {
    /// Spawn the worker thread.
    pub fn spawn() -> Self {
        let (job_tx, job_rx) = unbounded::<TransformJob>();
        let (result_tx, result_rx) = unbounded::<TransformJobResult>();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = std::thread::Builder::new()
            .name("plotlink-worker".to_string())
            .spawn(move || worker_loop(job_rx, result_tx, running_clone))
            .expect("failed to spawn transform worker thread");

        tracing::info!("transform worker thread started");
        Self {
            job_tx,
            result_rx,
            running,
            handle: Some(handle),
        }
    }

    /// Queue a job for background computation.
    pub fn submit(&self, job: TransformJob) {
        tracing::debug!(
            "dispatch '{}' gen {} for '{}'",
            job.key.kind,
            job.generation,
            job.key.source_plot
        );
        // A send failure means the worker already shut down; the caller's
        // pending bookkeeping is cleared by the lifecycle paths.
        let _ = self.job_tx.send(job);
    }

    /// Drain all finished results without blocking.
    pub fn try_results(&self) -> Vec<TransformJobResult> {
        self.result_rx.try_iter().collect()
    }

    /// Block until one result arrives or the timeout elapses. Test
    /// convenience; production callers poll from the event loop.
    pub fn recv_result_timeout(&self, timeout: Duration) -> Option<TransformJobResult> {
        self.result_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for TransformWorker {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        tracing::info!("transform worker thread stopped");
    }
}

fn worker_loop(
    job_rx: Receiver<TransformJob>,
    result_tx: Sender<TransformJobResult>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Relaxed) {
        let job = match job_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(job) => job,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if job.cancel.load(Ordering::Relaxed) {
            tracing::debug!("skipping cancelled job for '{}'", job.key.source_plot);
            continue;
        }
        let outcome = (job.function)(&job.selection, &job.params);
        let result = TransformJobResult {
            key: job.key,
            derived: job.derived,
            derived_curve: job.derived_curve,
            generation: job.generation,
            outcome,
        };
        if result_tx.send(result).is_err() {
            break;
        }
    }
}
