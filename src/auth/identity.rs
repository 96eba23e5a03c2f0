//! Session identity and authorization checks
//!
//! An [`Identity`] is the runtime materialization of a user's effective
//! permission set, built exactly once per successful authentication and
//! immutable afterwards. Role or permission edits made while a user is
//! logged in take effect on their next authentication, not before.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::core::models::User;

/// Immutable capability set for one authenticated session
#[derive(Debug, Clone)]
pub struct Identity {
    user_id: Uuid,
    username: String,
    role: Option<String>,
    permissions: HashSet<String>,
    established_at: DateTime<Utc>,
}

impl Identity {
    /// Materialize an identity for a user with an already-resolved
    /// permission set
    pub(crate) fn establish(user: &User, permissions: HashSet<String>) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
            permissions,
            established_at: Utc::now(),
        }
    }

    /// Stable identifier of the authenticated user
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Username of the authenticated user
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Role the identity was built from, if any
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// When the identity was established
    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }

    /// Whether this session holds the named permission. Set membership
    /// only; no I/O.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// The full permission set
    pub fn permissions(&self) -> &HashSet<String> {
        &self.permissions
    }
}

/// Outcome of a permission check in request context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The identity holds the permission
    Granted,
    /// The identity lacks the permission; the caller decides the
    /// user-facing consequence
    Denied,
    /// No identity present; the caller should redirect to authentication
    /// instead of raising an authorization error
    Unauthenticated,
}

impl AccessDecision {
    /// Whether access was granted
    pub fn is_granted(self) -> bool {
        matches!(self, AccessDecision::Granted)
    }
}

/// Check a permission against an optional identity, failing closed when
/// none is present.
pub fn check_access(identity: Option<&Identity>, permission: &str) -> AccessDecision {
    match identity {
        None => AccessDecision::Unauthenticated,
        Some(identity) if identity.has_permission(permission) => AccessDecision::Granted,
        Some(_) => AccessDecision::Denied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_with(perms: &[&str]) -> Identity {
        let user = User::new("jdoe", "John Doe", "jdoe@example.com").with_role("operador");
        Identity::establish(&user, perms.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn test_has_permission_is_set_membership() {
        let identity = identity_with(&["manage_registros", "send_alerts"]);
        assert!(identity.has_permission("manage_registros"));
        assert!(!identity.has_permission("manage_config"));
    }

    #[test]
    fn test_check_access_fails_closed_without_identity() {
        assert_eq!(
            check_access(None, "manage_registros"),
            AccessDecision::Unauthenticated
        );
        assert!(!check_access(None, "manage_registros").is_granted());
    }

    #[test]
    fn test_check_access_denies_missing_permission() {
        let identity = identity_with(&["send_alerts"]);
        assert_eq!(
            check_access(Some(&identity), "manage_access"),
            AccessDecision::Denied
        );
        assert_eq!(
            check_access(Some(&identity), "send_alerts"),
            AccessDecision::Granted
        );
    }
}
