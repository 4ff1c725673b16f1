use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;

use crate::error::AuthError;

use super::credentials::{CredentialStore, Role};
use super::device::{AllowAllDevices, DeviceAuthorizer};
use super::password;
use super::session::{Session, SessionRegistry};

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub session: Session,
    pub role: Role,
    pub permissions: BTreeSet<String>,
}

/// Verifies credentials and issues sessions.
pub struct AuthenticationService {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<SessionRegistry>,
    devices: Arc<dyn DeviceAuthorizer>,
}

impl AuthenticationService {
    pub fn new(credentials: Arc<dyn CredentialStore>, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            credentials,
            sessions,
            devices: Arc::new(AllowAllDevices),
        }
    }

    /// Replaces the default allow-all device policy.
    pub fn with_device_authorizer(mut self, devices: Arc<dyn DeviceAuthorizer>) -> Self {
        self.devices = devices;
        self
    }

    /// Checks a username/password pair and issues a session on success.
    ///
    /// Unknown users and wrong passwords fail the same way.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let user = match self.credentials.lookup(username) {
            Some(user) => user,
            None => {
                password::burn_verification(password);
                debug!("Authentication failed for {}", username);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !password::verify_password(password, user.verifier()) {
            debug!("Authentication failed for {}", username);
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.sessions.create(&user)?;
        info!("User {} logged in successfully", user.username);

        Ok(AuthenticatedUser {
            session,
            role: user.role,
            permissions: user.permissions.clone(),
        })
    }

    pub fn validate_session(&self, token: &str) -> bool {
        self.sessions.validate(token)
    }

    /// Like `validate_session`, but says why a token is rejected.
    pub fn check_session(&self, token: &str) -> Result<Session, AuthError> {
        self.sessions.lookup(token)
    }

    /// Removes the session if it is stored, expired or not. Returns true
    /// if one was removed.
    pub fn end_session(&self, token: &str) -> bool {
        match self.sessions.remove(token) {
            Some(session) => {
                info!("User {} logged out", session.username);
                true
            }
            None => false,
        }
    }

    pub fn is_device_authorized(&self, device_id: &str) -> bool {
        self.devices.is_authorized(device_id)
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }
}
