pub mod auth;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod sanitize;
pub mod secrets;
pub mod worker;

pub use auth::{
    AuthenticatedUser, AuthenticationService, CredentialStore, InMemoryCredentialStore, Role,
    Session, SessionRegistry, User,
};
pub use broadcast::{JobProgressBroadcaster, LogBroadcaster};
pub use config::{load_config, AppConfig};
pub use error::{
    AuthError, ConfigError, ExportError, OrchestratorError, ProcessError, QueueError, RawsqlError,
    Result, UploadError,
};
pub use logging::{init_logging, LoggingGuard};
pub use orchestrator::{BatchHandle, Orchestrator, ShutdownMode};
pub use pipeline::{ExportFormat, Exporter, ProcessedData, Processor, UploadReceipt, Uploader};
pub use secrets::{resolve_secret, SecretError};
pub use worker::{BatchEvent, BatchMark, BatchSummary, Job, JobOutcome, JobResult};
