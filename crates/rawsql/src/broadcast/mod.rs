//! Broadcasting modules for real-time event streaming.
//!
//! The presentation layer subscribes to these to render progress and logs
//! without polling the orchestrator.

pub mod job_progress;
pub mod log_broadcaster;

pub use job_progress::{
    JobPhase, JobProgressBroadcaster, JobProgressEvent, JobProgressTracker, JobRef, JobStatus,
};
pub use log_broadcaster::{LogBroadcastLayer, LogBroadcaster, LogEvent};
