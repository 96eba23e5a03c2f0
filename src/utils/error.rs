//! Error handling for the authentication core
//!
//! Authentication and authorization *denials* are ordinary return values
//! (`AuthDecision`, `AccessDecision`) and never appear here. These types cover
//! infrastructure failures and data-integrity violations only.

use thiserror::Error;

/// Result type alias for the authentication core
pub type Result<T> = std::result::Result<T, AuthError>;

/// Main error type for the authentication core
#[derive(Error, Debug)]
pub enum AuthError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistence layer errors, surfaced by external `AuthStore`
    /// implementations; the in-memory store only raises integrity errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Directory (LDAP) infrastructure errors
    #[error("Directory error: {0}")]
    Directory(String),

    /// A directory call exceeded its configured timeout
    #[error("Directory operation timed out after {0:?}")]
    DirectoryTimeout(std::time::Duration),

    /// Password hashing / verification errors
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Data-integrity violations (protected records, cycles, duplicates)
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}

impl AuthError {
    /// Create a directory error
    pub fn directory(msg: impl Into<String>) -> Self {
        Self::Directory(msg.into())
    }
}

/// Violations of the structural invariants of the role/permission/user store.
///
/// Rejected synchronously at the point of the attempted mutation, distinct
/// from authentication/authorization denials.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// A role with the same name already exists
    #[error("role '{0}' already exists")]
    DuplicateRole(String),

    /// A permission with the same name already exists
    #[error("permission '{0}' already exists")]
    DuplicatePermission(String),

    /// A user with the same username already exists
    #[error("user '{0}' already exists")]
    DuplicateUser(String),

    /// A user with the same email already exists
    #[error("email '{0}' is already registered")]
    DuplicateEmail(String),

    /// Referenced role does not exist
    #[error("role '{0}' not found")]
    UnknownRole(String),

    /// Referenced permission does not exist
    #[error("permission '{0}' not found")]
    UnknownPermission(String),

    /// Referenced user does not exist
    #[error("user '{0}' not found")]
    UnknownUser(String),

    /// The reserved admin role cannot be deleted or deactivated
    #[error("the 'admin' role cannot be deleted or deactivated")]
    ProtectedRole,

    /// The reserved admin user cannot be deleted, blocked, or demoted
    #[error("the 'admin' user cannot be deleted, blocked, or reassigned")]
    ProtectedUser,

    /// A role referenced by users cannot be deleted
    #[error("role '{role}' is assigned to {users} user(s)")]
    RoleInUse {
        /// Role that was targeted for deletion
        role: String,
        /// Number of users still referencing it
        users: usize,
    },

    /// A role with child roles cannot be deleted
    #[error("role '{0}' has child roles")]
    RoleHasChildren(String),

    /// The requested parent assignment would create a cycle
    #[error("setting parent '{parent}' on role '{role}' would create a cycle")]
    CyclicHierarchy {
        /// Role being re-parented
        role: String,
        /// Requested parent
        parent: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_error_messages() {
        let err = IntegrityError::RoleInUse {
            role: "operador".to_string(),
            users: 3,
        };
        assert_eq!(err.to_string(), "role 'operador' is assigned to 3 user(s)");

        let err = IntegrityError::ProtectedRole;
        assert!(err.to_string().contains("admin"));
    }

    #[test]
    fn test_integrity_wraps_into_auth_error() {
        let err: AuthError = IntegrityError::DuplicateRole("gestor".to_string()).into();
        assert!(matches!(
            err,
            AuthError::Integrity(IntegrityError::DuplicateRole(_))
        ));
    }
}
