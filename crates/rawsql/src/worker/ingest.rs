use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use log::{debug, error, info, warn};

use crate::broadcast::JobProgressBroadcaster;
use crate::error::OrchestratorError;
use crate::pipeline::progress::{BroadcastProgress, NoopProgress};
use crate::pipeline::Pipeline;
use crate::worker::job::{BatchEvent, BatchSummary};
use crate::worker::probe::WorkerProbe;
use crate::worker::queue::{Dequeued, JobQueue};

/// Drains one [`JobQueue`] on a dedicated thread.
///
/// Results are published on `events` in dequeue order, each one before the
/// next job is taken. The last event is always `BatchEvent::Finished`.
pub struct IngestionWorker {
    batch_id: String,
    queue: Arc<JobQueue>,
    pipeline: Arc<Pipeline>,
    events: Sender<BatchEvent>,
    cancel: Arc<AtomicBool>,
    probe: Arc<WorkerProbe>,
    progress: Option<JobProgressBroadcaster>,
}

impl IngestionWorker {
    pub fn new(
        batch_id: &str,
        queue: Arc<JobQueue>,
        pipeline: Arc<Pipeline>,
        events: Sender<BatchEvent>,
        cancel: Arc<AtomicBool>,
        probe: Arc<WorkerProbe>,
    ) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            queue,
            pipeline,
            events,
            cancel,
            probe,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<JobProgressBroadcaster>) -> Self {
        self.progress = progress;
        self
    }

    pub fn spawn(self) -> Result<JoinHandle<BatchSummary>, OrchestratorError> {
        let short_id: String = self.batch_id.chars().take(8).collect();
        thread::Builder::new()
            .name(format!("rawsql-ingest-{}", short_id))
            .spawn(move || self.run())
            .map_err(OrchestratorError::WorkerSpawn)
    }

    pub fn run(self) -> BatchSummary {
        let mut summary = BatchSummary::new(&self.batch_id);

        match self.queue.attach_worker() {
            Some(_lease) => {
                let _active = self.probe.enter();
                debug!("Worker for batch {} started", self.batch_id);
                self.process_queue(&mut summary);
            }
            None => warn!(
                "Batch {} already has a worker draining its queue",
                self.batch_id
            ),
        }

        // Lease and activity are released before Finished goes out.
        info!(
            "Batch {} finished: {} succeeded, {} failed, {} cancelled",
            self.batch_id,
            summary.succeeded,
            summary.failed(),
            summary.cancelled
        );
        self.finish(&summary);
        summary
    }

    fn process_queue(&self, summary: &mut BatchSummary) {
        loop {
            if self.cancelled() {
                self.discard_remaining(summary, 0);
                return;
            }

            let event = match self.queue.dequeue_blocking() {
                Dequeued::Closed => {
                    debug!("Job queue for batch {} closed", self.batch_id);
                    return;
                }
                // Cancel may have been raised while we were waiting.
                Dequeued::Job(_) if self.cancelled() => {
                    self.discard_remaining(summary, 1);
                    return;
                }
                Dequeued::BatchEnd(_) if self.cancelled() => {
                    self.discard_remaining(summary, 0);
                    return;
                }
                Dequeued::BatchEnd(mark) => {
                    debug!(
                        "Batch {} group {} done ({} jobs)",
                        self.batch_id, mark.sequence, mark.jobs
                    );
                    BatchEvent::BatchEnd(mark)
                }
                Dequeued::Job(job) => {
                    debug!("Worker for batch {} processing job {}", self.batch_id, job.id);
                    let result = match &self.progress {
                        Some(broadcaster) => {
                            let progress = BroadcastProgress::new(
                                broadcaster.tracker(job.progress_ref(&self.batch_id)),
                            );
                            self.pipeline.run(job, &progress)
                        }
                        None => self.pipeline.run(job, &NoopProgress),
                    };
                    summary.record(&result);
                    BatchEvent::Result(result)
                }
            };

            if let Err(e) = self.events.send(event) {
                error!(
                    "Worker for batch {} failed to send event: {}",
                    self.batch_id, e
                );
                summary.cancelled += self.queue.drain().len();
                return;
            }
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Counts `in_hand` plus every queued job as cancelled.
    fn discard_remaining(&self, summary: &mut BatchSummary, in_hand: usize) {
        summary.cancelled += in_hand + self.queue.drain().len();
        debug!("Worker for batch {} received cancel signal", self.batch_id);
    }

    fn finish(&self, summary: &BatchSummary) {
        // The handle may already be gone
        let _ = self.events.send(BatchEvent::Finished(summary.clone()));
    }
}
