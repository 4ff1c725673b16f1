//! Job progress broadcaster for real-time status in the presentation layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Phase of job processing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Queued,
    Processing,
    Uploading,
    Completed,
    Failed,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Queued => write!(f, "Queued"),
            JobPhase::Processing => write!(f, "Processing"),
            JobPhase::Uploading => write!(f, "Uploading"),
            JobPhase::Completed => write!(f, "Completed"),
            JobPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

/// Progress event for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    pub job_id: String,
    /// Batch the job was submitted with.
    pub batch_id: String,
    /// File name only; full paths stay out of UI events.
    pub filename: String,
    pub network_type: String,
    pub phase: JobPhase,
    pub status: JobStatus,
    /// Human-readable message describing current activity.
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Rows written (set on completion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_written: Option<u64>,
    /// Destination table (set on completion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobProgressEvent {
    pub fn new(job: &JobRef, phase: JobPhase, message: &str) -> Self {
        let status = match phase {
            JobPhase::Completed => JobStatus::Completed,
            JobPhase::Failed => JobStatus::Failed,
            _ => JobStatus::Processing,
        };

        Self {
            job_id: job.job_id.clone(),
            batch_id: job.batch_id.clone(),
            filename: job.filename.clone(),
            network_type: job.network_type.clone(),
            phase,
            status,
            message: message.to_string(),
            timestamp: Utc::now(),
            rows_written: None,
            table: None,
            error: None,
        }
    }

    pub fn completed(job: &JobRef, rows_written: u64, table: &str) -> Self {
        let mut event = Self::new(
            job,
            JobPhase::Completed,
            &format!("Successfully processed {}", job.filename),
        );
        event.rows_written = Some(rows_written);
        event.table = Some(table.to_string());
        event
    }

    pub fn failed(job: &JobRef, error: &str) -> Self {
        let mut event = Self::new(job, JobPhase::Failed, "Processing failed");
        event.error = Some(error.to_string());
        event
    }
}

/// Identifying fields copied into every event of one job.
#[derive(Debug, Clone)]
pub struct JobRef {
    pub job_id: String,
    pub batch_id: String,
    pub filename: String,
    pub network_type: String,
}

/// Broadcasts job progress events to any number of subscribers.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: JobProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    /// Announces a job as queued.
    pub fn announce_queued(&self, job: &JobRef) {
        self.send(JobProgressEvent::new(
            job,
            JobPhase::Queued,
            "Job queued for processing",
        ));
    }

    /// Tracker for the later phases of one job.
    pub fn tracker(&self, job: JobRef) -> JobProgressTracker {
        JobProgressTracker::new(job, Arc::clone(&self.sender))
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Tracks progress for a single job.
pub struct JobProgressTracker {
    job: JobRef,
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressTracker {
    pub fn new(job: JobRef, sender: Arc<broadcast::Sender<JobProgressEvent>>) -> Self {
        Self { job, sender }
    }

    pub fn update_phase(&self, phase: JobPhase, message: &str) {
        let _ = self
            .sender
            .send(JobProgressEvent::new(&self.job, phase, message));
    }

    pub fn completed(&self, rows_written: u64, table: &str) {
        let _ = self
            .sender
            .send(JobProgressEvent::completed(&self.job, rows_written, table));
    }

    pub fn failed(&self, error: &str) {
        let _ = self.sender.send(JobProgressEvent::failed(&self.job, error));
    }
}
