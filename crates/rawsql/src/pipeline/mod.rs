pub mod collaborators;
pub mod progress;
pub mod runner;

pub use collaborators::{ExportFormat, Exporter, ProcessedData, Processor, UploadReceipt, Uploader};
pub use progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::Pipeline;
