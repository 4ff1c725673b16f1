use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info_span, warn};

use crate::broadcast::job_progress::JobPhase;
use crate::sanitize;
use crate::worker::job::{Job, JobOutcome, JobResult};

use super::collaborators::{Processor, Uploader};
use super::progress::{ProgressEvent, ProgressReporter};

/// Runs one job through process → upload.
///
/// Collaborator errors and panics are folded into the returned
/// [`JobResult`]; nothing escapes to the caller.
pub struct Pipeline {
    processor: Arc<dyn Processor>,
    uploader: Arc<dyn Uploader>,
}

impl Pipeline {
    pub fn new(processor: Arc<dyn Processor>, uploader: Arc<dyn Uploader>) -> Self {
        Self {
            processor,
            uploader,
        }
    }

    pub fn run(&self, job: Job, progress: &dyn ProgressReporter) -> JobResult {
        let filename = sanitize::redact_path(&job.file_path);
        let _pipeline_span = info_span!("pipeline",
            job_id = %job.id,
            filename = %filename,
            network_type = %job.network_type,
        )
        .entered();

        // Step 1: Transform the source file
        let data = {
            let _step = info_span!("process").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Processing,
                message: format!("Processing {}", filename),
            });

            let outcome = catch_unwind(AssertUnwindSafe(|| {
                self.processor.process(&job.file_path, &job.network_type)
            }));
            match outcome {
                Ok(Ok(data)) => data,
                Ok(Err(e)) => {
                    return fail(job, JobOutcome::ProcessingFailed, e.to_string(), progress)
                }
                Err(panic) => {
                    let detail = format!("Processor panicked: {}", panic_message(&*panic));
                    return fail(job, JobOutcome::ProcessingFailed, detail, progress);
                }
            }
        };
        debug!(rows = data.row_count(), "Processed {}", filename);

        // Step 2: Upload the result
        let receipt = {
            let _step = info_span!("upload").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Uploading,
                message: format!("Uploading {}", filename),
            });

            let outcome = catch_unwind(AssertUnwindSafe(|| {
                self.uploader.upload(&data, &job.network_type)
            }));
            match outcome {
                Ok(Ok(receipt)) => receipt,
                Ok(Err(e)) => return fail(job, JobOutcome::UploadFailed, e.to_string(), progress),
                Err(panic) => {
                    let detail = format!("Uploader panicked: {}", panic_message(&*panic));
                    return fail(job, JobOutcome::UploadFailed, detail, progress);
                }
            }
        };

        debug!(
            rows_written = receipt.rows_written,
            table = %receipt.table,
            "Uploaded {}",
            filename
        );
        progress.report(ProgressEvent::Completed {
            rows_written: receipt.rows_written,
            table: receipt.table.clone(),
        });

        JobResult::success(job, receipt)
    }
}

fn fail(
    job: Job,
    outcome: JobOutcome,
    detail: String,
    progress: &dyn ProgressReporter,
) -> JobResult {
    warn!("{} for {}: {}", outcome, sanitize::redact_path(&job.file_path), detail);
    progress.report(ProgressEvent::Failed {
        error: detail.clone(),
    });
    match outcome {
        JobOutcome::UploadFailed => JobResult::upload_failed(job, detail),
        _ => JobResult::processing_failed(job, detail),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
