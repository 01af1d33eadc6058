//! Job status values and the single "latest status" cell.
//!
//! A run moves `queued → running → {completed | failed}`. While running, a
//! stage cursor advances through fixed checkpoints:
//!
//! ```text
//! Extracting (10%) ──▶ Summarizing (40%) ──▶ Rendering (70%) ──▶ Completed (100%)
//! ```
//!
//! [`JobStatus`] is never mutated in place once published. Every transition
//! builds a new value and swaps it into the [`StatusTracker`]'s watch cell,
//! so a poller reading concurrently sees either the previous or the next
//! status, never a half-written one.

use crate::error::{ErrorKind, PipelineError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

/// Stage cursor inside the `running` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extracting,
    Summarizing,
    Rendering,
}

impl Stage {
    /// Fixed progress checkpoint reported when the stage starts.
    pub fn progress(self) -> u8 {
        match self {
            Stage::Extracting => 10,
            Stage::Summarizing => 40,
            Stage::Rendering => 70,
        }
    }

    /// Human-readable message shown to status pollers.
    pub fn message(self) -> &'static str {
        match self {
            Stage::Extracting => "Extracting text",
            Stage::Summarizing => "Summarizing subjects",
            Stage::Rendering => "Generating briefs",
        }
    }
}

/// Progress and outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    /// `<newspaper_id>-<enqueue unix millis>`.
    pub id: String,
    pub state: JobState,
    /// 0–100, never decreases within a run.
    pub progress: u8,
    pub message: Option<String>,
    /// Failure family when `state == Failed`.
    pub error_kind: Option<ErrorKind>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    /// A freshly admitted run that has not started yet.
    pub fn queued(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: JobState::Queued,
            progress: 0,
            message: None,
            error_kind: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// The run has been picked up by the worker.
    pub fn started(&self) -> Self {
        Self {
            state: JobState::Running,
            progress: 0,
            message: None,
            error_kind: None,
            started_at: Some(Utc::now()),
            completed_at: None,
            ..self.clone()
        }
    }

    /// Advance the stage cursor. Progress only ever moves forward.
    pub fn at_stage(&self, stage: Stage) -> Self {
        Self {
            progress: self.progress.max(stage.progress()),
            message: Some(stage.message().to_string()),
            ..self.clone()
        }
    }

    pub fn completed(&self) -> Self {
        Self {
            state: JobState::Completed,
            progress: 100,
            message: Some("Completed".to_string()),
            completed_at: Some(Utc::now()),
            ..self.clone()
        }
    }

    /// Progress stays frozen at the last checkpoint reached.
    pub fn failed(&self, error: &PipelineError) -> Self {
        Self {
            state: JobState::Failed,
            message: Some(error.to_string()),
            error_kind: Some(error.kind()),
            completed_at: Some(Utc::now()),
            ..self.clone()
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Completed | JobState::Failed)
    }
}

/// Receives stage transitions from the pipeline.
///
/// The queue's worker reports into a [`StatusTracker`]; callers running the
/// pipeline directly can pass [`NoopProgress`].
pub trait ProgressReporter: Send + Sync {
    fn report_stage(&self, stage: Stage);
}

/// No-op reporter for direct pipeline runs and unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report_stage(&self, _stage: Stage) {}
}

/// Single-slot cell holding the most recently started run's status.
///
/// Only the worker writes; any number of readers poll or subscribe.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    tx: watch::Sender<Option<JobStatus>>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Latest status, or `None` if no run has ever started.
    pub fn latest(&self) -> Option<JobStatus> {
        self.tx.borrow().clone()
    }

    /// Replace the latest status with a new value.
    pub fn publish(&self, status: JobStatus) {
        self.tx.send_replace(Some(status));
    }

    /// Stream of status snapshots, starting with the current one.
    ///
    /// Intermediate values may be skipped if the consumer is slower than the
    /// worker; the most recent value is always delivered.
    pub fn subscribe(&self) -> impl Stream<Item = JobStatus> + Send + Unpin + 'static {
        WatchStream::new(self.tx.subscribe()).filter_map(|status| status)
    }

    /// Begin a run: the previous run's status is overwritten.
    pub fn begin(&self, queued: &JobStatus) -> RunProgress<'_> {
        let status = queued.started();
        self.publish(status.clone());
        RunProgress {
            tracker: self,
            current: std::sync::Mutex::new(status),
        }
    }
}

/// Status writer for the run currently executing.
pub struct RunProgress<'a> {
    tracker: &'a StatusTracker,
    current: std::sync::Mutex<JobStatus>,
}

impl RunProgress<'_> {
    fn transition(&self, f: impl FnOnce(&JobStatus) -> JobStatus) -> JobStatus {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = f(&current);
        *current = next.clone();
        self.tracker.publish(next.clone());
        next
    }

    pub fn complete(&self) -> JobStatus {
        self.transition(JobStatus::completed)
    }

    pub fn fail(&self, error: &PipelineError) -> JobStatus {
        self.transition(|s| s.failed(error))
    }
}

impl ProgressReporter for RunProgress<'_> {
    fn report_stage(&self, stage: Stage) {
        self.transition(|s| s.at_stage(stage));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_checkpoints_are_fixed() {
        assert_eq!(Stage::Extracting.progress(), 10);
        assert_eq!(Stage::Summarizing.progress(), 40);
        assert_eq!(Stage::Rendering.progress(), 70);
    }

    #[test]
    fn progress_never_decreases() {
        let s = JobStatus::queued("np-1-1").started().at_stage(Stage::Rendering);
        let back = s.at_stage(Stage::Extracting);
        assert_eq!(back.progress, 70);
    }

    #[test]
    fn completed_implies_full_progress() {
        let s = JobStatus::queued("np-1-1")
            .started()
            .at_stage(Stage::Summarizing)
            .completed();
        assert_eq!(s.state, JobState::Completed);
        assert_eq!(s.progress, 100);
        assert!(s.completed_at.unwrap() >= s.started_at.unwrap());
    }

    #[test]
    fn failed_freezes_progress() {
        let err = PipelineError::Internal("boom".into());
        let s = JobStatus::queued("np-1-1")
            .started()
            .at_stage(Stage::Summarizing)
            .failed(&err);
        assert_eq!(s.state, JobState::Failed);
        assert_eq!(s.progress, 40);
        assert_eq!(s.error_kind, Some(ErrorKind::Internal));
        assert!(s.message.unwrap().contains("boom"));
    }

    #[test]
    fn tracker_starts_empty_and_overwrites() {
        let tracker = StatusTracker::new();
        assert!(tracker.latest().is_none());

        let first = tracker.begin(&JobStatus::queued("a-1"));
        first.complete();
        assert_eq!(tracker.latest().unwrap().id, "a-1");

        let second = tracker.begin(&JobStatus::queued("b-2"));
        second.report_stage(Stage::Extracting);
        let latest = tracker.latest().unwrap();
        assert_eq!(latest.id, "b-2");
        assert_eq!(latest.state, JobState::Running);
        assert_eq!(latest.progress, 10);
    }

    #[test]
    fn status_serialises_for_pollers() {
        let s = JobStatus::queued("np-1-1").started().completed();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["state"], "completed");
        assert_eq!(json["progress"], 100);
        assert!(json.get("startedAt").is_some());
    }

    #[tokio::test]
    async fn subscribers_see_the_latest_value() {
        let tracker = StatusTracker::new();
        let mut updates = tracker.subscribe();
        let run = tracker.begin(&JobStatus::queued("np-9-9"));
        run.complete();
        let seen = updates.next().await.unwrap();
        assert_eq!(seen.id, "np-9-9");
        assert_eq!(seen.state, JobState::Completed);
    }
}
