//! Scripted collaborators.
//!
//! Behavior is keyed on the file name of each job, so a test describes a
//! batch by naming its files.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use rawsql::pipeline::{ExportFormat, Exporter, ProcessedData, Processor, UploadReceipt, Uploader};
use rawsql::{ExportError, ProcessError, UploadError};

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// A latch that holds collaborator calls until the test opens it.
#[derive(Default)]
pub struct Gate {
    state: Mutex<GateState>,
    cv: Condvar,
}

#[derive(Default)]
struct GateState {
    open: bool,
    waiting: usize,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn wait(&self) {
        let mut state = self.state.lock().unwrap();
        state.waiting += 1;
        self.cv.notify_all();
        while !state.open {
            state = self.cv.wait(state).unwrap();
        }
        state.waiting -= 1;
    }

    pub fn open(&self) {
        self.state.lock().unwrap().open = true;
        self.cv.notify_all();
    }

    /// Waits until some call is parked at the gate.
    pub fn wait_for_waiter(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        while state.waiting == 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self.cv.wait_timeout(state, deadline - now).unwrap().0;
        }
        true
    }
}

/// Processor whose outcome is chosen per file name.
#[derive(Default)]
pub struct ScriptedProcessor {
    failing: HashSet<String>,
    panicking: HashSet<String>,
    gated: HashSet<String>,
    gate: Option<Arc<Gate>>,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn panicking(mut self, name: &str) -> Self {
        self.panicking.insert(name.to_string());
        self
    }

    /// `name` blocks on `gate` before returning.
    pub fn gated(mut self, name: &str, gate: Arc<Gate>) -> Self {
        self.gated.insert(name.to_string());
        self.gate = Some(gate);
        self
    }

    /// File names processed so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Most calls ever in progress at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Processor for ScriptedProcessor {
    fn process(&self, path: &Path, network_type: &str) -> Result<ProcessedData, ProcessError> {
        let name = file_name(path);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(name.clone());

        // Give overlapping workers a chance to show up in `peak`.
        std::thread::sleep(Duration::from_millis(2));

        if self.gated.contains(&name) {
            if let Some(gate) = &self.gate {
                gate.wait();
            }
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(&name) {
            panic!("processor crashed on {}", name);
        }
        if self.failing.contains(&name) {
            return Err(ProcessError::Transform(format!("cannot parse {}", name)));
        }

        Ok(ProcessedData::new(path, vec!["network".to_string(), "file".to_string()])
            .with_rows(vec![vec![
                serde_json::json!(network_type),
                serde_json::json!(name),
            ]]))
    }
}

/// Uploader that rejects configured files and records the rest.
#[derive(Default)]
pub struct ScriptedUploader {
    rejecting: HashSet<String>,
    uploads: Mutex<Vec<String>>,
}

impl ScriptedUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, name: &str) -> Self {
        self.rejecting.insert(name.to_string());
        self
    }

    /// File names uploaded so far, in call order.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

impl Uploader for ScriptedUploader {
    fn upload(&self, data: &ProcessedData, network_type: &str) -> Result<UploadReceipt, UploadError> {
        let name = file_name(&data.source);
        if self.rejecting.contains(&name) {
            return Err(UploadError::Rejected(format!("{} violates constraint", name)));
        }
        self.uploads.lock().unwrap().push(name);
        Ok(UploadReceipt {
            rows_written: data.row_count() as u64,
            table: format!("raw_{}", network_type.to_lowercase()),
        })
    }
}

/// Exporter that writes JSON rows to disk, or fails for `Excel`.
#[derive(Default)]
pub struct JsonFileExporter;

impl Exporter for JsonFileExporter {
    fn export(
        &self,
        data: &ProcessedData,
        format: ExportFormat,
        destination: &Path,
    ) -> Result<(), ExportError> {
        if format == ExportFormat::Excel {
            return Err(ExportError::Format("Excel export is not available".to_string()));
        }
        let json = serde_json::to_vec_pretty(data)
            .map_err(|e| ExportError::Format(e.to_string()))?;
        std::fs::write(destination, json).map_err(|e| ExportError::WriteFile {
            path: destination.to_path_buf(),
            source: e,
        })
    }
}
