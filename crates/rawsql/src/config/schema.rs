use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::credentials::Role;
use crate::auth::session::DEFAULT_SESSION_TIMEOUT_SECS;

/// Longest accepted session lifetime (30 days).
pub const MAX_SESSION_TIMEOUT_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: String,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            session: SessionConfig::default(),
            credentials: CredentialsConfig::default(),
            ingestion: IngestionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_SESSION_TIMEOUT_SECS
}

impl SessionConfig {
    /// Session lifetime, clamped to [`MAX_SESSION_TIMEOUT_SECS`].
    pub fn timeout(&self) -> Duration {
        Duration::seconds(self.timeout_secs.min(MAX_SESSION_TIMEOUT_SECS) as i64)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// One operator account. Exactly one of the `password_hash*` fields is
/// expected; the first non-empty one wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash_env_var: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Capacity of the job progress broadcast channel.
    #[serde(default = "default_progress_capacity")]
    pub progress_capacity: usize,
}

fn default_progress_capacity() -> usize {
    100
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            progress_capacity: default_progress_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines on stdout instead of text.
    #[serde(default)]
    pub json: bool,
    /// Directory for daily log files. No file output when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "app.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}
