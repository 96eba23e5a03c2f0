//! Persistence seam for users, roles, permissions, and audit history
//!
//! The web application owns the real database; this crate only sees the
//! [`AuthStore`] trait. Implementations must provide the commit semantics the
//! trait documents — in particular [`AuthStore::apply_directory_sync`] and
//! [`AuthStore::record_login`] are single atomic commits. [`MemoryStore`] is
//! the in-process reference implementation used by tests and small
//! deployments.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::models::{Permission, Role, User, UserHistoryEntry};
use crate::utils::error::Result;

/// How a directory synchronization changes the user's role reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSync {
    /// Leave the current role untouched (manual assignments, admin)
    Keep,
    /// Replace the directory-derived role with this one
    Assign(String),
    /// Clear a previously directory-derived role that no longer maps
    Clear,
}

/// Field changes applied by one directory synchronization.
///
/// Applied together with `synced_at` in a single commit: the last-sync
/// timestamp is never updated without the corresponding data change.
#[derive(Debug, Clone)]
pub struct DirectorySyncUpdate {
    /// New display name, when the directory supplied one
    pub display_name: Option<String>,
    /// New email, when the directory supplied one
    pub email: Option<String>,
    /// New department
    pub department: Option<String>,
    /// New job title
    pub title: Option<String>,
    /// New phone number
    pub phone: Option<String>,
    /// Role change derived from group mapping
    pub role: RoleSync,
    /// New last-directory-sync timestamp
    pub synced_at: DateTime<Utc>,
}

/// Persistence operations required by the authentication core
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Look up a user by normalized username
    async fn find_user(&self, username: &str) -> Result<Option<User>>;

    /// Look up a user by id
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Create a user; fails on duplicate username or email
    async fn create_user(&self, user: User) -> Result<User>;

    /// Persist an updated user record
    async fn update_user(&self, user: User) -> Result<User>;

    /// Delete a user and, cascading, its history
    async fn delete_user(&self, id: Uuid) -> Result<()>;

    /// Stamp a successful login: increment the counter and set the
    /// last-login time in one commit
    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Number of users currently referencing a role
    async fn count_users_with_role(&self, role: &str) -> Result<usize>;

    /// Apply a directory synchronization atomically
    async fn apply_directory_sync(&self, id: Uuid, update: DirectorySyncUpdate) -> Result<User>;

    /// Look up a role by name
    async fn find_role(&self, name: &str) -> Result<Option<Role>>;

    /// All roles
    async fn list_roles(&self) -> Result<Vec<Role>>;

    /// Insert or replace a role
    async fn save_role(&self, role: Role) -> Result<Role>;

    /// Remove a role; integrity guards live in the service layer
    async fn delete_role(&self, name: &str) -> Result<()>;

    /// Look up a permission by name
    async fn find_permission(&self, name: &str) -> Result<Option<Permission>>;

    /// All permissions
    async fn list_permissions(&self) -> Result<Vec<Permission>>;

    /// Insert or replace a permission
    async fn save_permission(&self, permission: Permission) -> Result<Permission>;

    /// Append an immutable audit record
    async fn append_history(&self, entry: UserHistoryEntry) -> Result<()>;

    /// Audit records for one user, oldest first
    async fn history_for(&self, user_id: Uuid) -> Result<Vec<UserHistoryEntry>>;
}
