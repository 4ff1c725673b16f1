//! Process-wide logging setup.
//!
//! Library code logs through `log` and `tracing`; this installs a single
//! `tracing` subscriber that receives both.

use std::path::Path;
use std::sync::Arc;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::EnvFilter;

use crate::broadcast::{LogBroadcastLayer, LogBroadcaster};
use crate::config::LoggingConfig;
use crate::error::{RawsqlError, Result};

/// Keeps the background file writer alive. Drop it at exit to flush.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Builds the level filter: `RUST_LOG` when set, otherwise `default_level`.
pub fn env_filter(default_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| RawsqlError::Logging(format!("Invalid log level '{}': {}", default_level, e))),
    }
}

/// Installs the global subscriber: stdout (text or JSON), an optional daily
/// log file, and an optional broadcast layer for the presentation layer.
///
/// Fails if a global subscriber or `log` logger is already installed.
pub fn init_logging(
    config: &LoggingConfig,
    broadcaster: Option<Arc<LogBroadcaster>>,
) -> Result<LoggingGuard> {
    let filter = env_filter(&config.level)?;

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let (file_layer, file_guard) = match config.directory.as_deref() {
        Some(directory) => {
            let directory = Path::new(directory);
            std::fs::create_dir_all(directory).map_err(|e| {
                RawsqlError::Logging(format!(
                    "Failed to create log directory '{}': {}",
                    directory.display(),
                    e
                ))
            })?;
            let appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let broadcast_layer = broadcaster.map(LogBroadcastLayer::new);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .with(broadcast_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| RawsqlError::Logging(e.to_string()))?;
    tracing_log::LogTracer::init().map_err(|e| RawsqlError::Logging(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_env_filter_default_level() {
        std::env::remove_var("RUST_LOG");
        let filter = env_filter("debug").unwrap();
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    #[serial]
    fn test_env_filter_prefers_rust_log() {
        std::env::set_var("RUST_LOG", "rawsql=trace");
        let filter = env_filter("info").unwrap();
        assert_eq!(filter.to_string(), "rawsql=trace");
        std::env::remove_var("RUST_LOG");
    }

    #[test]
    #[serial]
    fn test_init_logging_writes_file_and_broadcasts() {
        std::env::remove_var("RUST_LOG");
        let dir = TempDir::new().unwrap();
        let config = LoggingConfig {
            level: "info".to_string(),
            json: false,
            directory: Some(dir.path().join("logs").to_string_lossy().to_string()),
            file_prefix: "app.log".to_string(),
        };
        let broadcaster = Arc::new(LogBroadcaster::new(16));
        let mut rx = broadcaster.subscribe();

        let guard = init_logging(&config, Some(Arc::clone(&broadcaster))).unwrap();
        log::info!("logging initialized");

        let event = rx.try_recv().unwrap();
        assert_eq!(event.level, "INFO");
        assert_eq!(event.message, "logging initialized");
        assert!(event.target.starts_with("rawsql"));

        drop(guard);
        let files: Vec<_> = std::fs::read_dir(dir.path().join("logs"))
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(files.len(), 1);

        // A second global subscriber is refused.
        assert!(init_logging(&config, None).is_err());
    }
}
