//! Facade the presentation layer talks to: login, batch ingestion and export.

pub mod batch;

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crossbeam_channel::unbounded;
use log::{debug, error, info, warn};

use crate::auth::{
    local_device_id, AuthenticatedUser, AuthenticationService, CredentialStore,
    InMemoryCredentialStore, Session, SessionRegistry,
};
use crate::broadcast::JobProgressBroadcaster;
use crate::config::AppConfig;
use crate::error::{AuthError, ExportError, OrchestratorError, RawsqlError};
use crate::pipeline::collaborators::{ExportFormat, Exporter, ProcessedData, Processor, Uploader};
use crate::pipeline::Pipeline;
use crate::sanitize;
use crate::worker::ingest::IngestionWorker;
use crate::worker::job::{BatchMark, BatchSummary, Job};
use crate::worker::probe::WorkerProbe;
use crate::worker::queue::JobQueue;

pub use batch::{BatchEvents, BatchHandle, ShutdownMode};

pub struct Orchestrator {
    auth: Arc<AuthenticationService>,
    pipeline: Arc<Pipeline>,
    exporter: Option<Arc<dyn Exporter>>,
    progress: Option<JobProgressBroadcaster>,
}

impl Orchestrator {
    pub fn new(
        auth: Arc<AuthenticationService>,
        processor: Arc<dyn Processor>,
        uploader: Arc<dyn Uploader>,
    ) -> Self {
        Self {
            auth,
            pipeline: Arc::new(Pipeline::new(processor, uploader)),
            exporter: None,
            progress: None,
        }
    }

    /// Builds the credential store, session registry and progress
    /// broadcaster from `config`.
    pub fn from_config(
        config: &AppConfig,
        processor: Arc<dyn Processor>,
        uploader: Arc<dyn Uploader>,
    ) -> Result<Self, RawsqlError> {
        let store: Arc<dyn CredentialStore> =
            Arc::new(InMemoryCredentialStore::from_config(&config.credentials)?);
        let sessions = Arc::new(SessionRegistry::new(config.session.timeout()));
        let auth = Arc::new(AuthenticationService::new(store, sessions));

        info!(
            "Orchestrator configured: {} users, session timeout {}s",
            config.credentials.users.len(),
            config.session.timeout().num_seconds()
        );

        Ok(Self::new(auth, processor, uploader)
            .with_progress(JobProgressBroadcaster::new(config.ingestion.progress_capacity)))
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn with_progress(mut self, progress: JobProgressBroadcaster) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn auth(&self) -> &Arc<AuthenticationService> {
        &self.auth
    }

    pub fn progress(&self) -> Option<&JobProgressBroadcaster> {
        self.progress.as_ref()
    }

    /// Device check followed by credential check.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        device_id: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        if !self.auth.is_device_authorized(device_id) {
            warn!(
                "Login for {} refused: device {} is not authorized",
                username,
                sanitize::hash_str(device_id)
            );
            return Err(AuthError::DeviceNotAuthorized);
        }
        self.auth.authenticate(username, password)
    }

    /// [`login`](Self::login) from this machine.
    pub fn login_local(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        self.login(username, password, &local_device_id())
    }

    pub fn validate_session(&self, token: &str) -> bool {
        self.auth.validate_session(token)
    }

    pub fn end_session(&self, token: &str) -> bool {
        self.auth.end_session(token)
    }

    /// Enqueues `jobs` in order on a new queue and starts its worker.
    ///
    /// The handle's stream carries one result per job followed by a
    /// `BatchEnd` marker. The queue stays open for [`extend_batch`](Self::extend_batch).
    pub fn submit_batch(
        &self,
        token: &str,
        jobs: Vec<Job>,
    ) -> Result<BatchHandle, OrchestratorError> {
        let session = self.require_session(token)?;

        let batch_id = uuid::Uuid::new_v4().to_string();
        let queue = Arc::new(JobQueue::new());
        let cancel = Arc::new(AtomicBool::new(false));
        let probe = Arc::new(WorkerProbe::new());
        let (event_tx, event_rx) = unbounded();

        let worker = IngestionWorker::new(
            &batch_id,
            Arc::clone(&queue),
            Arc::clone(&self.pipeline),
            event_tx,
            Arc::clone(&cancel),
            Arc::clone(&probe),
        )
        .with_progress(self.progress.clone())
        .spawn()?;

        let handle = BatchHandle::new(
            batch_id,
            queue,
            event_rx,
            cancel,
            probe,
            self.progress.clone(),
            worker,
        );
        let mark = handle.enqueue(jobs)?;

        info!(
            "Starting file processing: {} files (batch {}, user {})",
            mark.jobs,
            handle.id(),
            session.username
        );
        Ok(handle)
    }

    /// Appends jobs to a running batch as a new group. They are drained by
    /// the same worker, after everything already queued, and end with their
    /// own `BatchEnd` marker.
    pub fn extend_batch(
        &self,
        token: &str,
        handle: &BatchHandle,
        jobs: Vec<Job>,
    ) -> Result<BatchMark, OrchestratorError> {
        self.require_session(token)?;
        let mark = handle.enqueue(jobs)?;
        debug!(
            "Added {} files to batch {} (group {})",
            mark.jobs,
            handle.id(),
            mark.sequence
        );
        Ok(mark)
    }

    pub fn shutdown(&self, handle: &mut BatchHandle, mode: ShutdownMode) -> BatchSummary {
        handle.shutdown(mode)
    }

    /// Writes `data` to `destination` through the configured exporter.
    pub fn export(
        &self,
        token: &str,
        data: &ProcessedData,
        format: ExportFormat,
        destination: &Path,
    ) -> Result<(), OrchestratorError> {
        self.require_session(token)?;
        info!("Starting data export ({})", format);

        let result = match &self.exporter {
            None => Err(ExportError::Unavailable),
            Some(_) if data.is_empty() => Err(ExportError::NoData),
            Some(exporter) => exporter.export(data, format, destination),
        };

        match result {
            Ok(()) => {
                info!(
                    "Data exported successfully to {}",
                    sanitize::redact_path(destination)
                );
                Ok(())
            }
            Err(e) => {
                error!("Export error: {}", e);
                Err(OrchestratorError::ExportFailed(e))
            }
        }
    }

    fn require_session(&self, token: &str) -> Result<Session, OrchestratorError> {
        self.auth.check_session(token).map_err(|e| {
            debug!(
                "Rejected session {}: {}",
                sanitize::redact_token(token),
                e
            );
            OrchestratorError::SessionRequired
        })
    }
}
