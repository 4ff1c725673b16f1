//! Interfaces to the external transform, database and export components.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ProcessError, UploadError};

/// Tabular result of transforming one source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedData {
    pub source: PathBuf,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ProcessedData {
    pub fn new(source: impl Into<PathBuf>, columns: Vec<String>) -> Self {
        Self {
            source: source.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(mut self, rows: Vec<Vec<serde_json::Value>>) -> Self {
        self.rows = rows;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// What the database reported after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub rows_written: u64,
    pub table: String,
}

pub trait Processor: Send + Sync {
    fn process(&self, path: &Path, network_type: &str) -> Result<ProcessedData, ProcessError>;
}

pub trait Uploader: Send + Sync {
    fn upload(&self, data: &ProcessedData, network_type: &str)
        -> Result<UploadReceipt, UploadError>;
}

pub trait Exporter: Send + Sync {
    fn export(
        &self,
        data: &ProcessedData,
        format: ExportFormat,
        destination: &Path,
    ) -> Result<(), ExportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Excel,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Excel => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "CSV"),
            ExportFormat::Json => write!(f, "JSON"),
            ExportFormat::Excel => write!(f, "Excel"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "excel" | "xlsx" | "xls" => Ok(ExportFormat::Excel),
            other => Err(ExportError::Format(format!(
                "Unknown export format '{}'",
                other
            ))),
        }
    }
}
