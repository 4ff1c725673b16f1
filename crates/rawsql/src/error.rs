use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RawsqlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Orchestration error: {0}")]
    Orchestrator(#[from] OrchestratorError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid user '{username}': {reason}")]
    InvalidUser { username: String, reason: String },
}

/// Authentication and session errors.
///
/// Unknown users and wrong passwords both map to `InvalidCredentials`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Session expired")]
    SessionExpired,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Device is not authorized")]
    DeviceNotAuthorized,

    #[error("Password verifier error: {0}")]
    Verifier(String),

    #[error("Failed to generate session token: {0}")]
    TokenGeneration(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("Job queue is closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("A valid session is required")]
    SessionRequired,

    #[error("Job queue is closed")]
    QueueClosed,

    #[error("Failed to spawn ingestion worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Export failed: {0}")]
    ExportFailed(#[from] ExportError),
}

impl From<QueueError> for OrchestratorError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Closed => OrchestratorError::QueueClosed,
        }
    }
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transform failed: {0}")]
    Transform(String),
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Insert rejected: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No data available for export")]
    NoData,

    #[error("No exporter is configured")]
    Unavailable,

    #[error("Failed to write export to '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Export format error: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, RawsqlError>;
