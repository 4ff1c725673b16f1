//! Helpers for sanitizing data before it enters tracing spans or log lines.
//!
//! Logs are meant to be shareable for debugging; these functions keep full
//! file paths and session tokens out of them.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Number of token characters kept by [`redact_token`].
const TOKEN_PREFIX_LEN: usize = 6;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Keeps a short prefix of a session token so log lines can be correlated
/// without exposing a usable token.
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(TOKEN_PREFIX_LEN).collect();
    format!("{}…", prefix)
}

/// Short deterministic hash of a path, for correlation without exposing it.
pub fn hash_path(path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Short deterministic hash of a string.
pub fn hash_str(value: &str) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
