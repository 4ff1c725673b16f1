//! Builder patterns for creating test data programmatically.

#![allow(dead_code)]

use rawsql::auth::password::hash_password;
use rawsql::auth::Role;
use rawsql::config::{
    AppConfig, CredentialsConfig, IngestionConfig, LoggingConfig, SessionConfig, UserConfig,
};

/// Builder for creating `AppConfig` instances.
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.config.version = version.to_string();
        self
    }

    pub fn session_timeout_secs(mut self, secs: u64) -> Self {
        self.config.session = SessionConfig { timeout_secs: secs };
        self
    }

    pub fn progress_capacity(mut self, capacity: usize) -> Self {
        self.config.ingestion = IngestionConfig {
            progress_capacity: capacity,
        };
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    pub fn user(mut self, user: UserConfig) -> Self {
        self.config.credentials.users.push(user);
        self
    }

    pub fn users(mut self, users: Vec<UserConfig>) -> Self {
        self.config.credentials = CredentialsConfig { users };
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.config).expect("Failed to serialize config")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating `UserConfig` entries.
pub struct UserBuilder {
    user: UserConfig,
}

impl UserBuilder {
    pub fn new(username: &str, role: Role) -> Self {
        Self {
            user: UserConfig {
                username: username.to_string(),
                role,
                permissions: Vec::new(),
                password_hash: None,
                password_hash_file: None,
                password_hash_env_var: None,
            },
        }
    }

    /// Stores an argon2 verifier of `password` inline.
    pub fn password(mut self, password: &str) -> Self {
        self.user.password_hash = Some(hash_password(password).expect("Failed to hash password"));
        self
    }

    pub fn password_hash(mut self, hash: &str) -> Self {
        self.user.password_hash = Some(hash.to_string());
        self
    }

    pub fn password_hash_file(mut self, path: &str) -> Self {
        self.user.password_hash_file = Some(path.to_string());
        self
    }

    pub fn password_hash_env_var(mut self, var: &str) -> Self {
        self.user.password_hash_env_var = Some(var.to_string());
        self
    }

    pub fn permissions(mut self, permissions: &[&str]) -> Self {
        self.user.permissions = permissions.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn build(self) -> UserConfig {
        self.user
    }
}
