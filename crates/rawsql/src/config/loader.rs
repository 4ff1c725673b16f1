use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::schema::{AppConfig, MAX_SESSION_TIMEOUT_SECS};
use crate::error::ConfigError;
use crate::secrets::has_secret_source;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

/// File name looked up inside [`default_data_dir`].
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<AppConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: AppConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Per-user application directory, e.g. `~/.local/share/rawsql` on Linux.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("rawsql"))
}

pub fn default_config_path() -> Option<PathBuf> {
    default_data_dir().map(|d| d.join(DEFAULT_CONFIG_FILE))
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.session.timeout_secs == 0 || config.session.timeout_secs > MAX_SESSION_TIMEOUT_SECS
    {
        return Err(ConfigError::Validation {
            message: format!(
                "session.timeout_secs must be between 1 and {}",
                MAX_SESSION_TIMEOUT_SECS
            ),
        });
    }

    if config.ingestion.progress_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "ingestion.progress_capacity must be at least 1".to_string(),
        });
    }

    let mut usernames = HashSet::new();
    for user in &config.credentials.users {
        if !usernames.insert(user.username.as_str()) {
            return Err(ConfigError::InvalidUser {
                username: user.username.clone(),
                reason: "Duplicate username".to_string(),
            });
        }

        if !has_secret_source(
            user.password_hash.as_deref(),
            user.password_hash_file.as_deref(),
            user.password_hash_env_var.as_deref(),
        ) {
            return Err(ConfigError::InvalidUser {
                username: user.username.clone(),
                reason: "One of password_hash, password_hash_file or password_hash_env_var is required"
                    .to_string(),
            });
        }
    }

    Ok(())
}
