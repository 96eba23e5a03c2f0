//! Username normalization and directory-input sanitization
//!
//! Usernames are normalized to trimmed lowercase everywhere (lookup, creation,
//! directory search), so `JDoe ` and `jdoe` address the same account. Values
//! destined for a directory search filter additionally pass a character
//! whitelist so filter metacharacters can never reach the directory server.

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters rejected from directory usernames: anything outside
/// letters, digits, dot, dash, underscore.
static DIRECTORY_FORBIDDEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static regex"));

/// Normalize a username for lookup and storage: trim and lowercase.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalize an email address: trim and lowercase.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Sanitize a username for use inside a directory search filter.
///
/// Returns `None` when nothing survives the whitelist; callers must treat
/// that as a denial without any directory round-trip.
pub fn sanitize_directory_username(raw: &str) -> Option<String> {
    let normalized = normalize_username(raw);
    let cleaned = DIRECTORY_FORBIDDEN.replace_all(&normalized, "").into_owned();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}
