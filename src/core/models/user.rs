//! User and audit-history definitions
//!
//! Usernames and emails are stored trimmed and lowercased; every lookup uses
//! the same normalization. The reserved user [`User::ADMIN`] always resolves
//! to the admin role and can never be deleted, deactivated, or blocked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::models::request::RequestContext;
use crate::utils::sanitize::{normalize_email, normalize_username};

/// Account status gating authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Account may authenticate
    #[default]
    Active,
    /// Account disabled by an administrator
    Inactive,
    /// Account blocked (e.g. after abuse); still a plain deny on login
    Blocked,
}

impl UserStatus {
    /// Whether the account may authenticate
    pub fn is_active(self) -> bool {
        matches!(self, UserStatus::Active)
    }
}

/// A principal of the system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier
    pub id: Uuid,
    /// Unique username, stored lowercase
    pub username: String,
    /// Display name
    pub display_name: String,
    /// Unique email, stored lowercase
    pub email: String,
    /// Argon2 PHC hash; `None` for directory-authenticated accounts
    #[serde(default)]
    pub password_hash: Option<String>,
    /// Account status
    #[serde(default)]
    pub status: UserStatus,
    /// Assigned role name, if any
    #[serde(default)]
    pub role: Option<String>,
    /// Whether the current role was derived from directory group mapping
    #[serde(default)]
    pub role_from_directory: bool,
    /// Whether the account originated from the directory
    #[serde(default)]
    pub from_directory: bool,
    /// Timestamp of the last directory synchronization
    #[serde(default)]
    pub last_directory_sync: Option<DateTime<Utc>>,
    /// Timestamp of the last successful login
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    /// Number of successful logins
    #[serde(default)]
    pub login_count: u64,
    /// Phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// Department
    #[serde(default)]
    pub department: Option<String>,
    /// Job title
    #[serde(default)]
    pub title: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Principal that created the account
    #[serde(default)]
    pub created_by: Option<String>,
}

impl User {
    /// Username of the reserved administrator account
    pub const ADMIN: &'static str = "admin";

    /// Create a new active user; username and email are normalized
    pub fn new(
        username: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: normalize_username(&username.into()),
            display_name: display_name.into(),
            email: normalize_email(&email.into()),
            password_hash: None,
            status: UserStatus::Active,
            role: None,
            role_from_directory: false,
            from_directory: false,
            last_directory_sync: None,
            last_login: None,
            login_count: 0,
            phone: None,
            department: None,
            title: None,
            created_at: now,
            updated_at: now,
            created_by: None,
        }
    }

    /// Set the stored password hash
    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    /// Assign a role (manual assignment, not directory-derived)
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self.role_from_directory = false;
        self
    }

    /// Whether this is the reserved administrator account
    pub fn is_admin(&self) -> bool {
        self.username == Self::ADMIN
    }

    /// Whether the account may authenticate
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// The admin account can never be deleted
    pub fn can_be_deleted(&self) -> bool {
        !self.is_admin()
    }
}

/// Kind of change recorded in a [`UserHistoryEntry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// Account created
    Created,
    /// Profile fields updated
    Updated,
    /// Successful login
    Login,
    /// Role assignment changed
    RoleChanged,
    /// Status changed
    StatusChanged,
    /// Password reset
    PasswordReset,
    /// Account deleted
    Deleted,
}

/// Immutable audit record of a user change. Append-only; never updated,
/// removed only by cascading delete of the parent user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserHistoryEntry {
    /// Entry identifier
    pub id: Uuid,
    /// User the entry belongs to
    pub user_id: Uuid,
    /// What happened
    pub action: HistoryAction,
    /// Free-form JSON detail payload
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    /// Principal that performed the action
    pub actor: String,
    /// Originating network address
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Client descriptor (user agent)
    #[serde(default)]
    pub user_agent: Option<String>,
    /// When the change happened
    pub created_at: DateTime<Utc>,
}

impl UserHistoryEntry {
    /// Create a new history entry stamped with the request context
    pub fn new(
        user_id: Uuid,
        action: HistoryAction,
        actor: impl Into<String>,
        context: &RequestContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            action,
            details: None,
            actor: actor.into(),
            ip_address: context.ip_address.clone(),
            user_agent: context.user_agent.clone(),
            created_at: Utc::now(),
        }
    }

    /// Attach a JSON detail payload
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
