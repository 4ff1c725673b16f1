use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::broadcast::JobProgressBroadcaster;
use crate::error::QueueError;
use crate::worker::job::{BatchEvent, BatchMark, BatchSummary, Job};
use crate::worker::probe::WorkerProbe;
use crate::worker::queue::JobQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownMode {
    /// Finish every job already enqueued.
    Drain,
    /// Finish the job in flight, discard the rest.
    Cancel,
}

/// A running batch: its queue, its worker thread and its event stream.
///
/// Dropping a handle whose worker is still running cancels it.
pub struct BatchHandle {
    id: String,
    queue: Arc<JobQueue>,
    events: Receiver<BatchEvent>,
    cancel: Arc<AtomicBool>,
    probe: Arc<WorkerProbe>,
    progress: Option<JobProgressBroadcaster>,
    worker: Option<JoinHandle<BatchSummary>>,
    summary: Option<BatchSummary>,
}

impl BatchHandle {
    pub(crate) fn new(
        id: String,
        queue: Arc<JobQueue>,
        events: Receiver<BatchEvent>,
        cancel: Arc<AtomicBool>,
        probe: Arc<WorkerProbe>,
        progress: Option<JobProgressBroadcaster>,
        worker: JoinHandle<BatchSummary>,
    ) -> Self {
        Self {
            id,
            queue,
            events,
            cancel,
            probe,
            progress,
            worker: Some(worker),
            summary: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Worker activation counters for this handle's queue.
    pub fn probe(&self) -> &WorkerProbe {
        &self.probe
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Entries waiting in the queue (jobs and group markers), not counting
    /// the job in flight.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_sealed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Blocks for the next event. `None` once the stream has ended.
    pub fn recv_event(&self) -> Option<BatchEvent> {
        self.events.recv().ok()
    }

    pub fn try_recv_event(&self) -> Option<BatchEvent> {
        self.events.try_recv().ok()
    }

    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<BatchEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Blocking iterator over the current group: its results, then the
    /// `BatchEnd` that closes it, or `Finished` if the handle stopped first.
    ///
    /// Call again to read the next group.
    pub fn events(&self) -> BatchEvents<'_> {
        BatchEvents {
            handle: self,
            done: false,
        }
    }

    /// Stops accepting jobs without waiting. The worker finishes what is
    /// queued and then ends the stream.
    pub fn seal(&self) -> bool {
        let sealed = self.queue.close();
        if sealed {
            debug!("Batch {} sealed", self.id);
        }
        sealed
    }

    /// Stops the batch and waits for its worker.
    ///
    /// Calling it again returns the same summary.
    pub fn shutdown(&mut self, mode: ShutdownMode) -> BatchSummary {
        if mode == ShutdownMode::Cancel {
            self.cancel.store(true, Ordering::Release);
        }
        self.queue.close();

        let Some(worker) = self.worker.take() else {
            return self
                .summary
                .clone()
                .unwrap_or_else(|| BatchSummary::new(&self.id));
        };

        info!("Shutting down batch {} ({:?})", self.id, mode);
        let summary = match worker.join() {
            Ok(summary) => summary,
            Err(e) => {
                error!("Worker for batch {} panicked: {:?}", self.id, e);
                BatchSummary::new(&self.id)
            }
        };
        self.summary = Some(summary.clone());
        summary
    }

    /// Enqueues `jobs` as one group. Queued progress goes out only for jobs
    /// that actually made it into the queue.
    pub(crate) fn enqueue(&self, jobs: Vec<Job>) -> Result<BatchMark, QueueError> {
        self.queue.enqueue_batch(jobs, |job| {
            if let Some(progress) = &self.progress {
                progress.announce_queued(&job.progress_ref(&self.id));
            }
        })
    }
}

impl fmt::Debug for BatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchHandle")
            .field("id", &self.id)
            .field("sealed", &self.is_sealed())
            .field("running", &self.is_running())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Drop for BatchHandle {
    fn drop(&mut self) {
        if self.worker.is_some() {
            debug!("Batch {} dropped while running, cancelling", self.id);
            self.shutdown(ShutdownMode::Cancel);
        }
    }
}

/// Iterator returned by [`BatchHandle::events`].
pub struct BatchEvents<'a> {
    handle: &'a BatchHandle,
    done: bool,
}

impl Iterator for BatchEvents<'_> {
    type Item = BatchEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let event = self.handle.recv_event();
        self.done = match &event {
            Some(event) => event.ends_batch(),
            None => true,
        };
        event
    }
}
