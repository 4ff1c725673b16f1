use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::warn;

use crate::error::QueueError;
use crate::worker::job::{BatchMark, Job};

enum Entry {
    Job(Job),
    End(BatchMark),
}

/// Result of a blocking dequeue.
#[derive(Debug)]
pub enum Dequeued {
    Job(Job),
    /// Every job of one submitted group has been handed out.
    BatchEnd(BatchMark),
    /// The queue is closed and every entry has been handed out.
    Closed,
}

/// Unbounded FIFO between the submitting caller and a single worker.
///
/// Closing drops the only sender, so a blocked `dequeue_blocking` wakes
/// once the remaining entries are taken.
pub struct JobQueue {
    sender: Mutex<Option<Sender<Entry>>>,
    receiver: Receiver<Entry>,
    /// Groups enqueued through `enqueue_batch`; guarded by the sender lock.
    groups: AtomicUsize,
    worker_attached: AtomicBool,
}

impl JobQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
            groups: AtomicUsize::new(0),
            worker_attached: AtomicBool::new(false),
        }
    }

    /// Never blocks. Fails once the queue has been closed.
    pub fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        let sender = self.lock_sender();
        match sender.as_ref() {
            Some(tx) => tx.send(Entry::Job(job)).map_err(|_| QueueError::Closed),
            None => Err(QueueError::Closed),
        }
    }

    /// Enqueues every job in order without an end marker.
    pub fn enqueue_all(&self, jobs: impl IntoIterator<Item = Job>) -> Result<usize, QueueError> {
        let sender = self.lock_sender();
        let tx = sender.as_ref().ok_or(QueueError::Closed)?;
        let mut count = 0;
        for job in jobs {
            tx.send(Entry::Job(job)).map_err(|_| QueueError::Closed)?;
            count += 1;
        }
        Ok(count)
    }

    /// Enqueues `jobs` as one group followed by its end marker.
    ///
    /// `on_queued` runs for each job just before it becomes visible to the
    /// worker. Nothing is enqueued and `on_queued` never runs if the queue
    /// is closed. Close cannot interleave with a group.
    pub fn enqueue_batch<F>(
        &self,
        jobs: Vec<Job>,
        mut on_queued: F,
    ) -> Result<BatchMark, QueueError>
    where
        F: FnMut(&Job),
    {
        let sender = self.lock_sender();
        let tx = sender.as_ref().ok_or(QueueError::Closed)?;

        let mark = BatchMark {
            sequence: self.groups.fetch_add(1, Ordering::Relaxed),
            jobs: jobs.len(),
        };
        for job in jobs {
            on_queued(&job);
            tx.send(Entry::Job(job)).map_err(|_| QueueError::Closed)?;
        }
        tx.send(Entry::End(mark)).map_err(|_| QueueError::Closed)?;
        Ok(mark)
    }

    /// Blocks until an entry is available or the queue is closed and empty.
    pub fn dequeue_blocking(&self) -> Dequeued {
        match self.receiver.recv() {
            Ok(Entry::Job(job)) => Dequeued::Job(job),
            Ok(Entry::End(mark)) => Dequeued::BatchEnd(mark),
            Err(_) => Dequeued::Closed,
        }
    }

    /// Removes everything queued and returns the jobs. End markers are
    /// discarded.
    pub fn drain(&self) -> Vec<Job> {
        self.receiver
            .try_iter()
            .filter_map(|entry| match entry {
                Entry::Job(job) => Some(job),
                Entry::End(_) => None,
            })
            .collect()
    }

    /// Stops accepting jobs. Returns false if the queue was already closed.
    pub fn close(&self) -> bool {
        self.lock_sender().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.lock_sender().is_none()
    }

    /// Queued entries, end markers included.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Claims the queue for one worker. Returns `None` while another worker
    /// holds the lease.
    pub fn attach_worker(&self) -> Option<WorkerLease<'_>> {
        self.worker_attached
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| WorkerLease { queue: self })
    }

    fn lock_sender(&self) -> MutexGuard<'_, Option<Sender<Entry>>> {
        match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Job queue sender lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive right to drain a [`JobQueue`]; released on drop.
pub struct WorkerLease<'a> {
    queue: &'a JobQueue,
}

impl WorkerLease<'_> {
    pub fn queue(&self) -> &JobQueue {
        self.queue
    }
}

impl Drop for WorkerLease<'_> {
    fn drop(&mut self) {
        self.queue.worker_attached.store(false, Ordering::Release);
    }
}
