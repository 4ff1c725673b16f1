//! Test harness for isolated orchestrator tests.
//!
//! The `TestHarness` struct wires a complete orchestrator for testing:
//! - Temporary input directory for source files
//! - Demo credential store and a session registry on a manual clock
//! - Scripted processor and uploader the test can inspect afterwards

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use rawsql::auth::{AuthenticationService, InMemoryCredentialStore, SessionRegistry};
use rawsql::orchestrator::{BatchHandle, Orchestrator};
use rawsql::worker::{BatchEvent, BatchSummary, Job, JobResult};

use super::clock::ManualClock;
use super::fakes::{ScriptedProcessor, ScriptedUploader};

/// Upper bound on how long a test waits for any single batch event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Session lifetime used by the harness.
pub const SESSION_HOURS: i64 = 8;

/// Demo users hashed once per test binary.
pub fn demo_store() -> Arc<InMemoryCredentialStore> {
    static STORE: OnceLock<Arc<InMemoryCredentialStore>> = OnceLock::new();
    Arc::clone(STORE.get_or_init(|| {
        Arc::new(InMemoryCredentialStore::demo().expect("Failed to build demo store"))
    }))
}

pub struct TestHarness {
    /// Temporary directory holding input files.
    temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub clock: Arc<ManualClock>,
    pub sessions: Arc<SessionRegistry>,
    pub processor: Arc<ScriptedProcessor>,
    pub uploader: Arc<ScriptedUploader>,
    pub orchestrator: Orchestrator,
}

impl TestHarness {
    /// Harness whose collaborators succeed for every file.
    pub fn new() -> Self {
        Self::with_collaborators(ScriptedProcessor::new(), ScriptedUploader::new())
    }

    pub fn with_collaborators(processor: ScriptedProcessor, uploader: ScriptedUploader) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input_dir = temp_dir.path().join("input");
        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sessions = Arc::new(SessionRegistry::with_clock(
            chrono::Duration::hours(SESSION_HOURS),
            clock.clone(),
        ));
        let auth = Arc::new(AuthenticationService::new(demo_store(), Arc::clone(&sessions)));

        let processor = Arc::new(processor);
        let uploader = Arc::new(uploader);
        let orchestrator = Orchestrator::new(auth, processor.clone(), uploader.clone());

        Self {
            temp_dir,
            input_dir,
            clock,
            sessions,
            processor,
            uploader,
            orchestrator,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Logs in and returns the session token.
    pub fn login(&self, username: &str, password: &str) -> String {
        self.orchestrator
            .login(username, password, "test-device")
            .expect("Login failed")
            .session
            .token
    }

    pub fn login_admin(&self) -> String {
        self.login("admin", "admin123")
    }

    /// Writes a small CSV file into the input directory.
    pub fn write_input(&self, filename: &str) -> PathBuf {
        let path = self.input_dir.join(filename);
        std::fs::write(&path, "cell_id,rssi\n1,-71\n2,-80\n").expect("Failed to write input file");
        path
    }

    /// One job per file name, each backed by a file in the input directory.
    pub fn jobs(&self, filenames: &[&str], network_type: &str) -> Vec<Job> {
        let paths: Vec<PathBuf> = filenames.iter().map(|f| self.write_input(f)).collect();
        Job::batch(paths, network_type)
    }
}

/// Reads the handle's stream to the end, failing the test if it stalls.
/// Group markers are skipped.
pub fn collect_events(handle: &BatchHandle) -> (Vec<JobResult>, BatchSummary) {
    let mut results = Vec::new();
    loop {
        match handle.recv_event_timeout(EVENT_TIMEOUT) {
            Some(BatchEvent::Result(result)) => results.push(result),
            Some(BatchEvent::BatchEnd(_)) => {}
            Some(BatchEvent::Finished(summary)) => return (results, summary),
            None => panic!("batch event stream stalled or ended without Finished"),
        }
    }
}

/// Reads one submitted group: its results and the event that closed it.
pub fn collect_group(handle: &BatchHandle) -> (Vec<JobResult>, BatchEvent) {
    let mut results = Vec::new();
    loop {
        match handle.recv_event_timeout(EVENT_TIMEOUT) {
            Some(BatchEvent::Result(result)) => results.push(result),
            Some(end) => return (results, end),
            None => panic!("batch event stream stalled before the group ended"),
        }
    }
}

/// File names of `results`, in order.
pub fn filenames(results: &[JobResult]) -> Vec<String> {
    results.iter().map(|r| r.job.filename()).collect()
}
