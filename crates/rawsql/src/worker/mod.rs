pub mod ingest;
pub mod job;
pub mod probe;
pub mod queue;

pub use ingest::IngestionWorker;
pub use job::{BatchEvent, BatchMark, BatchSummary, Job, JobOutcome, JobResult};
pub use probe::{ActivityGuard, WorkerProbe};
pub use queue::{Dequeued, JobQueue, WorkerLease};
