//! Background job queue: one FIFO, one worker, one job at a time.
//!
//! ```text
//! enqueue ──▶ [ unbounded mpsc ] ──▶ worker loop ──▶ Pipeline::run
//!                                         │
//!                                         └──▶ StatusTracker (watch cell)
//! ```
//!
//! The worker is a plain `while let Some(..) = rx.recv().await` loop. When
//! a run finishes, successfully or not, the loop immediately pulls the next
//! job; an empty channel parks the task until something is enqueued.
//!
//! The status cell only keeps the latest value, so a watcher can miss the
//! terminal status of a job that is followed straight away by another.
//! Callers that need every outcome use [`JobQueue::submit`], whose
//! [`JobHandle`] receives the job's own terminal status.

use crate::error::PipelineError;
use crate::process::Pipeline;
use crate::status::{JobStatus, StatusTracker};
use crate::types::Job;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tracing::{error, info, info_span, Instrument};

struct Admitted {
    job: Job,
    status: JobStatus,
    done: oneshot::Sender<JobStatus>,
}

/// Receipt for one admitted job.
#[derive(Debug)]
pub struct JobHandle {
    /// Run id, as returned by [`JobQueue::enqueue`].
    pub id: String,
    done: oneshot::Receiver<JobStatus>,
}

impl JobHandle {
    /// Wait for the job's terminal status (`completed` or `failed`).
    ///
    /// Fails only if the worker stopped before running the job.
    pub async fn finished(self) -> Result<JobStatus, PipelineError> {
        self.done.await.map_err(|_| {
            PipelineError::Internal(format!("job {} was dropped by the queue worker", self.id))
        })
    }
}

/// Handle to the queue and its worker task.
///
/// Must be created inside a tokio runtime.
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Admitted>,
    tracker: StatusTracker,
    pending: Arc<AtomicUsize>,
    worker: JoinHandle<()>,
}

impl JobQueue {
    /// Spawn the worker and return the queue handle.
    pub fn start(pipeline: Pipeline) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = StatusTracker::new();
        let pending = Arc::new(AtomicUsize::new(0));

        let worker = tokio::spawn(run_worker(
            pipeline,
            rx,
            tracker.clone(),
            Arc::clone(&pending),
        ));

        Self {
            tx,
            tracker,
            pending,
            worker,
        }
    }

    /// Admit a job and return its run id. Never waits for the worker.
    ///
    /// Fails only if the worker task has died.
    pub fn enqueue(&self, job: Job) -> Result<String, PipelineError> {
        self.submit(job).map(|handle| handle.id)
    }

    /// Admit a job like [`enqueue`](Self::enqueue) and return a handle that
    /// resolves to that job's terminal status.
    pub fn submit(&self, job: Job) -> Result<JobHandle, PipelineError> {
        let id = run_id(&job.newspaper_id, Utc::now().timestamp_millis());
        let status = JobStatus::queued(id.clone());
        let (done, rx) = oneshot::channel();

        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(Admitted { job, status, done }).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(PipelineError::Internal("job queue worker is not running".into()));
        }

        info!("Enqueued job {}", id);
        Ok(JobHandle { id, done: rx })
    }

    /// Status of the most recently started job, `None` before the first run.
    pub fn latest_status(&self) -> Option<JobStatus> {
        self.tracker.latest()
    }

    /// Stream of status snapshots; see [`StatusTracker::subscribe`].
    pub fn subscribe(&self) -> impl Stream<Item = JobStatus> + Send + Unpin + 'static {
        self.tracker.subscribe()
    }

    /// Jobs admitted but not yet picked up by the worker.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Stop admitting jobs, let the worker drain what was already admitted,
    /// and wait for it to exit.
    pub async fn shutdown(self) -> Result<(), PipelineError> {
        drop(self.tx);
        self.worker
            .await
            .map_err(|e| PipelineError::Internal(format!("Queue worker panicked: {}", e)))
    }
}

/// `<newspaper_id>-<unix millis>`.
pub fn run_id(newspaper_id: &str, millis: i64) -> String {
    format!("{}-{}", newspaper_id, millis)
}

async fn run_worker(
    pipeline: Pipeline,
    mut rx: mpsc::UnboundedReceiver<Admitted>,
    tracker: StatusTracker,
    pending: Arc<AtomicUsize>,
) {
    info!("Job queue worker started");

    while let Some(Admitted { job, status, done }) = rx.recv().await {
        pending.fetch_sub(1, Ordering::SeqCst);
        let span = info_span!("job", id = %status.id);

        let finished = async {
            let run = tracker.begin(&status);
            match pipeline.run(&job, &run).await {
                Ok(outcome) => {
                    info!("Job completed with {} articles", outcome.articles.len());
                    run.complete()
                }
                Err(e) => {
                    let failed = run.fail(&e);
                    error!("Job failed at {}%: {}", failed.progress, e);
                    failed
                }
            }
        }
        .instrument(span)
        .await;

        // The submitter may have dropped its handle.
        let _ = done.send(finished);
    }

    info!("Job queue worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_joins_newspaper_and_millis() {
        assert_eq!(run_id("np-42", 1_709_251_200_000), "np-42-1709251200000");
    }
}
