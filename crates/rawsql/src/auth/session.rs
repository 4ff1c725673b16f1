//! Session registry with lazy expiry.
//!
//! A session is valid while it is present in the registry and
//! `now <= expires_at`. Lookups that find an expired session remove it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
#[cfg(test)]
use std::sync::Mutex;

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::Serialize;

use crate::error::AuthError;
use crate::sanitize;

use super::credentials::{Role, User};

/// Default session lifetime: 8 hours.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 8 * 60 * 60;

/// Size of the random part of a session token, in bytes.
const TOKEN_BYTES: usize = 32;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = match self.now.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = match self.now.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *now = to;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// A time-bounded proof of authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub username: String,
    /// Copied from the user at issuance.
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// True strictly after `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Owns all live sessions.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self::with_clock(timeout, Arc::new(SystemClock))
    }

    pub fn with_clock(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout,
            clock,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issues a new session for `user`.
    pub fn create(&self, user: &User) -> Result<Session, AuthError> {
        let created_at = self.clock.now();
        let mut sessions = self.write_sessions();

        let token = loop {
            let candidate = generate_token()?;
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        let session = Session {
            token: token.clone(),
            username: user.username.clone(),
            role: user.role,
            created_at,
            expires_at: created_at + self.timeout,
        };
        sessions.insert(token, session.clone());

        debug!(
            "Session {} issued for {} (expires {})",
            sanitize::redact_token(&session.token),
            session.username,
            session.expires_at
        );
        Ok(session)
    }

    /// Returns the session for `token` if it is still valid.
    ///
    /// An expired session is removed and reported as `SessionExpired`; any
    /// later lookup of the same token reports `SessionNotFound`.
    pub fn lookup(&self, token: &str) -> Result<Session, AuthError> {
        let now = self.clock.now();

        {
            let sessions = self.read_sessions();
            match sessions.get(token) {
                None => return Err(AuthError::SessionNotFound),
                Some(session) if !session.is_expired_at(now) => return Ok(session.clone()),
                Some(_) => {}
            }
        }

        let mut sessions = self.write_sessions();
        match sessions.get(token) {
            Some(session) if session.is_expired_at(now) => {
                sessions.remove(token);
                debug!("Session {} expired, evicted", sanitize::redact_token(token));
                Err(AuthError::SessionExpired)
            }
            Some(session) => Ok(session.clone()),
            None => Err(AuthError::SessionNotFound),
        }
    }

    pub fn validate(&self, token: &str) -> bool {
        self.lookup(token).is_ok()
    }

    /// Removes a session, expired or not, and returns it.
    pub fn remove(&self, token: &str) -> Option<Session> {
        let removed = self.write_sessions().remove(token);
        if removed.is_some() {
            debug!("Session {} ended", sanitize::redact_token(token));
        }
        removed
    }

    /// Removes every expired session and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.write_sessions();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        before - sessions.len()
    }

    /// Number of stored sessions, expired ones not yet evicted included.
    pub fn len(&self) -> usize {
        self.read_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        match self.sessions.read() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Session registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        match self.sessions.write() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Session registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_SESSION_TIMEOUT_SECS as i64))
    }
}

/// 32 random bytes from the OS, base64url without padding.
fn generate_token() -> Result<String, AuthError> {
    let mut buf = [0u8; TOKEN_BYTES];
    getrandom::fill(&mut buf).map_err(|e| AuthError::TokenGeneration(e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}
