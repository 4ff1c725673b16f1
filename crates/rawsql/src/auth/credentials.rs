//! Local credential store.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::schema::CredentialsConfig;
use crate::error::{AuthError, ConfigError};
use crate::secrets::resolve_secret;

use super::password;

/// Role of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Administrator => write!(f, "administrator"),
            Role::User => write!(f, "user"),
        }
    }
}

/// A registered operator. Immutable once loaded.
#[derive(Debug)]
pub struct User {
    pub username: String,
    verifier: SecretString,
    pub role: Role,
    pub permissions: BTreeSet<String>,
}

impl User {
    /// Creates a user from an existing PHC verifier.
    pub fn new<I, S>(username: &str, verifier: SecretString, role: Role, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.to_string(),
            verifier,
            role,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a user by hashing a plaintext password.
    pub fn with_password<I, S>(
        username: &str,
        password: &str,
        role: Role,
        permissions: I,
    ) -> Result<Self, AuthError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let verifier = password::hash_password(password)?;
        Ok(Self::new(
            username,
            SecretString::from(verifier),
            role,
            permissions,
        ))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub(crate) fn verifier(&self) -> &str {
        self.verifier.expose_secret()
    }
}

/// Username lookup. Implementations must be safe to share across threads.
pub trait CredentialStore: Send + Sync {
    fn lookup(&self, username: &str) -> Option<Arc<User>>;
}

/// Credential store held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: HashMap<String, Arc<User>>,
}

impl InMemoryCredentialStore {
    /// Builds a store from users. A later duplicate username replaces an earlier one.
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        let users = users
            .into_iter()
            .map(|u| (u.username.clone(), Arc::new(u)))
            .collect();
        Self { users }
    }

    /// Builds a store from configuration, resolving each verifier from its
    /// configured source (inline, file or environment variable).
    pub fn from_config(config: &CredentialsConfig) -> Result<Self, ConfigError> {
        let mut users = Vec::with_capacity(config.users.len());

        for entry in &config.users {
            let verifier = resolve_secret(
                entry.password_hash.as_deref(),
                entry.password_hash_file.as_deref(),
                entry.password_hash_env_var.as_deref(),
            )
            .map_err(|e| ConfigError::InvalidUser {
                username: entry.username.clone(),
                reason: e.to_string(),
            })?;

            if !password::is_valid_verifier(verifier.expose_secret()) {
                return Err(ConfigError::InvalidUser {
                    username: entry.username.clone(),
                    reason: "password hash is not a valid PHC string".to_string(),
                });
            }

            users.push(User::new(
                &entry.username,
                verifier,
                entry.role,
                entry.permissions.iter().cloned(),
            ));
        }

        log::debug!("Loaded {} users into credential store", users.len());
        Ok(Self::new(users))
    }

    /// Seeds the two demo accounts: `admin` / `admin123` and `user` / `user123`.
    pub fn demo() -> Result<Self, AuthError> {
        Ok(Self::new([
            User::with_password(
                "admin",
                "admin123",
                Role::Administrator,
                ["read", "write", "admin"],
            )?,
            User::with_password("user", "user123", Role::User, ["read", "write"])?,
        ]))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Registered usernames, sorted.
    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.users.keys().cloned().collect();
        names.sort();
        names
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn lookup(&self, username: &str) -> Option<Arc<User>> {
        self.users.get(username).cloned()
    }
}
