use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts worker activations on one queue.
///
/// A worker holds an [`ActivityGuard`] for as long as it is draining, so
/// `peak()` is the largest number of workers ever draining at once.
#[derive(Debug, Default)]
pub struct WorkerProbe {
    active: AtomicUsize,
    peak: AtomicUsize,
    activations: AtomicUsize,
}

impl WorkerProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> ActivityGuard<'_> {
        let now = self.active.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        self.activations.fetch_add(1, Ordering::AcqRel);
        ActivityGuard { probe: self }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Total activations since creation.
    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::Acquire)
    }
}

pub struct ActivityGuard<'a> {
    probe: &'a WorkerProbe,
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.probe.active.fetch_sub(1, Ordering::AcqRel);
    }
}
