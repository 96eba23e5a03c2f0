//! In-memory reference implementation of [`AuthStore`]
//!
//! Backed by a single `RwLock`, so every trait method is one atomic commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthStore, DirectorySyncUpdate, RoleSync};
use crate::core::models::{Permission, Role, User, UserHistoryEntry};
use crate::utils::error::{IntegrityError, Result};
use crate::utils::sanitize::normalize_username;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    users_by_name: HashMap<String, Uuid>,
    roles: HashMap<String, Role>,
    permissions: HashMap<String, Permission>,
    history: Vec<UserHistoryEntry>,
}

/// In-memory store for tests and small single-process deployments
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        let id = inner.users_by_name.get(&normalize_username(username));
        Ok(id.and_then(|id| inner.users.get(id)).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn create_user(&self, user: User) -> Result<User> {
        let mut inner = self.inner.write().await;
        if inner.users_by_name.contains_key(&user.username) {
            return Err(IntegrityError::DuplicateUser(user.username.clone()).into());
        }
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(IntegrityError::DuplicateEmail(user.email.clone()).into());
        }
        inner.users_by_name.insert(user.username.clone(), user.id);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, mut user: User) -> Result<User> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user.id) {
            return Err(IntegrityError::UnknownUser(user.username.clone()).into());
        }
        user.updated_at = Utc::now();
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.remove(&id) else {
            return Err(IntegrityError::UnknownUser(id.to_string()).into());
        };
        inner.users_by_name.remove(&user.username);
        // Cascading delete of the audit trail
        inner.history.retain(|entry| entry.user_id != id);
        Ok(())
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Err(IntegrityError::UnknownUser(id.to_string()).into());
        };
        user.login_count += 1;
        user.last_login = Some(at);
        user.updated_at = at;
        Ok(())
    }

    async fn count_users_with_role(&self, role: &str) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .filter(|u| u.role.as_deref() == Some(role))
            .count())
    }

    async fn apply_directory_sync(&self, id: Uuid, update: DirectorySyncUpdate) -> Result<User> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Err(IntegrityError::UnknownUser(id.to_string()).into());
        };

        if let Some(display_name) = update.display_name {
            user.display_name = display_name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(department) = update.department {
            user.department = Some(department);
        }
        if let Some(title) = update.title {
            user.title = Some(title);
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone);
        }
        match update.role {
            RoleSync::Keep => {}
            RoleSync::Assign(role) => {
                user.role = Some(role);
                user.role_from_directory = true;
            }
            RoleSync::Clear => {
                user.role = None;
                user.role_from_directory = false;
            }
        }
        user.last_directory_sync = Some(update.synced_at);
        user.updated_at = update.synced_at;

        Ok(user.clone())
    }

    async fn find_role(&self, name: &str) -> Result<Option<Role>> {
        Ok(self.inner.read().await.roles.get(name).cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.inner.read().await.roles.values().cloned().collect())
    }

    async fn save_role(&self, mut role: Role) -> Result<Role> {
        let mut inner = self.inner.write().await;
        role.updated_at = Utc::now();
        inner.roles.insert(role.name.clone(), role.clone());
        Ok(role)
    }

    async fn delete_role(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.roles.remove(name).is_none() {
            return Err(IntegrityError::UnknownRole(name.to_string()).into());
        }
        Ok(())
    }

    async fn find_permission(&self, name: &str) -> Result<Option<Permission>> {
        Ok(self.inner.read().await.permissions.get(name).cloned())
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>> {
        Ok(self
            .inner
            .read()
            .await
            .permissions
            .values()
            .cloned()
            .collect())
    }

    async fn save_permission(&self, permission: Permission) -> Result<Permission> {
        let mut inner = self.inner.write().await;
        inner
            .permissions
            .insert(permission.name.clone(), permission.clone());
        Ok(permission)
    }

    async fn append_history(&self, entry: UserHistoryEntry) -> Result<()> {
        self.inner.write().await.history.push(entry);
        Ok(())
    }

    async fn history_for(&self, user_id: Uuid) -> Result<Vec<UserHistoryEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .history
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect())
    }
}
