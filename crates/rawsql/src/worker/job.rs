use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::broadcast::job_progress::JobRef;
use crate::pipeline::collaborators::UploadReceipt;

/// One source file plus the network type it is ingested as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub file_path: PathBuf,
    pub network_type: String,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    pub fn new(file_path: impl Into<PathBuf>, network_type: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.into(),
            network_type: network_type.to_string(),
            submitted_at: Utc::now(),
        }
    }

    /// One job per path, all with the same network type, in input order.
    pub fn batch<I, P>(paths: I, network_type: &str) -> Vec<Job>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .map(|p| Job::new(p.as_ref(), network_type))
            .collect()
    }

    pub fn filename(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub(crate) fn progress_ref(&self, batch_id: &str) -> JobRef {
        JobRef {
            job_id: self.id.clone(),
            batch_id: batch_id.to_string(),
            filename: self.filename(),
            network_type: self.network_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Success,
    ProcessingFailed,
    UploadFailed,
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Success => write!(f, "Success"),
            JobOutcome::ProcessingFailed => write!(f, "Processing failed"),
            JobOutcome::UploadFailed => write!(f, "Upload failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub job: Job,
    pub outcome: JobOutcome,
    /// Error message when the job did not succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<UploadReceipt>,
    pub finished_at: DateTime<Utc>,
}

impl JobResult {
    pub fn success(job: Job, receipt: UploadReceipt) -> Self {
        Self {
            job,
            outcome: JobOutcome::Success,
            detail: None,
            receipt: Some(receipt),
            finished_at: Utc::now(),
        }
    }

    pub fn processing_failed(job: Job, detail: impl Into<String>) -> Self {
        Self::failure(job, JobOutcome::ProcessingFailed, detail.into())
    }

    pub fn upload_failed(job: Job, detail: impl Into<String>) -> Self {
        Self::failure(job, JobOutcome::UploadFailed, detail.into())
    }

    fn failure(job: Job, outcome: JobOutcome, detail: String) -> Self {
        Self {
            job,
            outcome,
            detail: Some(detail),
            receipt: None,
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == JobOutcome::Success
    }
}

/// Counts for one batch handle, reported once its worker exits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub batch_id: String,
    pub succeeded: usize,
    pub processing_failed: usize,
    pub upload_failed: usize,
    /// Jobs still queued when a cancel took effect; they produce no result.
    pub cancelled: usize,
}

impl BatchSummary {
    pub fn new(batch_id: &str) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, result: &JobResult) {
        match result.outcome {
            JobOutcome::Success => self.succeeded += 1,
            JobOutcome::ProcessingFailed => self.processing_failed += 1,
            JobOutcome::UploadFailed => self.upload_failed += 1,
        }
    }

    pub fn failed(&self) -> usize {
        self.processing_failed + self.upload_failed
    }

    /// Jobs that produced a result.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed()
    }
}

/// Marks the end of one submitted group of jobs on a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMark {
    /// 0 for the initial submission, then one per extension.
    pub sequence: usize,
    /// Jobs enqueued in this group.
    pub jobs: usize,
}

/// Items on a batch handle's event stream.
///
/// Each submitted group ends with `BatchEnd`. `Finished` is always the last
/// event of the handle; after a cancel it replaces the pending `BatchEnd`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum BatchEvent {
    Result(JobResult),
    BatchEnd(BatchMark),
    Finished(BatchSummary),
}

impl BatchEvent {
    pub fn is_finished(&self) -> bool {
        matches!(self, BatchEvent::Finished(_))
    }

    /// True for `BatchEnd` and `Finished`.
    pub fn ends_batch(&self) -> bool {
        !matches!(self, BatchEvent::Result(_))
    }
}
