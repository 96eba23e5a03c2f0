//! User account administration
//!
//! Create/update/delete operations with the reserved-admin guards: the
//! admin account always resolves to the admin role and can never be
//! deleted, deactivated, or blocked. Every change appends an immutable
//! history entry.

use std::sync::Arc;
use tracing::info;

use crate::core::models::{
    HistoryAction, RequestContext, Role, User, UserHistoryEntry, UserStatus,
};
use crate::storage::AuthStore;
use crate::utils::crypto::hash_password;
use crate::utils::error::{IntegrityError, Result};

/// Parameters for direct user creation
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login name (will be normalized)
    pub username: String,
    /// Display name
    pub display_name: String,
    /// Email address (will be normalized)
    pub email: String,
    /// Plaintext password, hashed before storage; `None` for
    /// directory-only accounts
    pub password: Option<String>,
    /// Initial role
    pub role: Option<String>,
}

/// Administrative operations over user accounts
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn AuthStore>,
}

impl UserService {
    /// Create the service
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    /// Create a user account; the password is hashed, never stored in
    /// plaintext
    pub async fn create_user(
        &self,
        new_user: NewUser,
        actor: &str,
        context: &RequestContext,
    ) -> Result<User> {
        if let Some(role) = &new_user.role {
            if self.store.find_role(role).await?.is_none() {
                return Err(IntegrityError::UnknownRole(role.clone()).into());
            }
        }

        let mut user = User::new(new_user.username, new_user.display_name, new_user.email);
        if let Some(password) = &new_user.password {
            user.password_hash = Some(hash_password(password)?);
        }
        user.role = new_user.role;
        user.created_by = Some(actor.to_string());

        let user = self.store.create_user(user).await?;
        self.store
            .append_history(UserHistoryEntry::new(
                user.id,
                HistoryAction::Created,
                actor,
                context,
            ))
            .await?;

        info!(username = %user.username, actor, "user created");
        Ok(user)
    }

    /// Change a user's role. Refused for the reserved admin account, whose
    /// role is pinned. Marks the role as manually assigned, so directory
    /// synchronization will no longer replace it.
    pub async fn set_role(
        &self,
        username: &str,
        role: Option<&str>,
        actor: &str,
        context: &RequestContext,
    ) -> Result<User> {
        let mut user = self.require_user(username).await?;
        if user.is_admin() {
            return Err(IntegrityError::ProtectedUser.into());
        }
        if let Some(role) = role {
            if self.store.find_role(role).await?.is_none() {
                return Err(IntegrityError::UnknownRole(role.to_string()).into());
            }
        }

        let previous = user.role.clone();
        user.role = role.map(str::to_string);
        user.role_from_directory = false;
        let user = self.store.update_user(user).await?;

        self.store
            .append_history(
                UserHistoryEntry::new(user.id, HistoryAction::RoleChanged, actor, context)
                    .with_details(serde_json::json!({
                        "from": previous,
                        "to": user.role,
                    })),
            )
            .await?;
        Ok(user)
    }

    /// Change account status. The reserved admin account can never leave
    /// the active state.
    pub async fn set_status(
        &self,
        username: &str,
        status: UserStatus,
        actor: &str,
        context: &RequestContext,
    ) -> Result<User> {
        let mut user = self.require_user(username).await?;
        if user.is_admin() && !status.is_active() {
            return Err(IntegrityError::ProtectedUser.into());
        }

        let previous = user.status;
        user.status = status;
        let user = self.store.update_user(user).await?;

        self.store
            .append_history(
                UserHistoryEntry::new(user.id, HistoryAction::StatusChanged, actor, context)
                    .with_details(serde_json::json!({
                        "from": previous,
                        "to": status,
                    })),
            )
            .await?;
        Ok(user)
    }

    /// Replace a user's password with a fresh hash
    pub async fn reset_password(
        &self,
        username: &str,
        new_password: &str,
        actor: &str,
        context: &RequestContext,
    ) -> Result<User> {
        let mut user = self.require_user(username).await?;
        user.password_hash = Some(hash_password(new_password)?);
        let user = self.store.update_user(user).await?;

        self.store
            .append_history(UserHistoryEntry::new(
                user.id,
                HistoryAction::PasswordReset,
                actor,
                context,
            ))
            .await?;

        info!(username = %user.username, actor, "password reset");
        Ok(user)
    }

    /// Delete a user and its history. Refused for the reserved admin
    /// account.
    pub async fn delete_user(&self, username: &str, actor: &str) -> Result<()> {
        let user = self.require_user(username).await?;
        if !user.can_be_deleted() {
            return Err(IntegrityError::ProtectedUser.into());
        }

        self.store.delete_user(user.id).await?;
        info!(username = %user.username, actor, "user deleted");
        Ok(())
    }

    /// Guarantee the reserved admin account exists, is active, and holds
    /// the admin role. Idempotent.
    pub async fn ensure_admin(&self, password: &str) -> Result<User> {
        match self.store.find_user(User::ADMIN).await? {
            Some(mut admin) => {
                // Self-heal any drift; the invariant wins over stored state.
                if admin.role.as_deref() != Some(Role::ADMIN) || !admin.is_active() {
                    admin.role = Some(Role::ADMIN.to_string());
                    admin.status = UserStatus::Active;
                    return self.store.update_user(admin).await;
                }
                Ok(admin)
            }
            None => {
                let mut admin = User::new(User::ADMIN, "Administrador", "admin@localhost")
                    .with_role(Role::ADMIN);
                admin.password_hash = Some(hash_password(password)?);
                admin.created_by = Some("system".to_string());
                let admin = self.store.create_user(admin).await?;
                info!("created reserved admin account");
                Ok(admin)
            }
        }
    }

    async fn require_user(&self, username: &str) -> Result<User> {
        self.store
            .find_user(username)
            .await?
            .ok_or_else(|| IntegrityError::UnknownUser(username.to_string()).into())
    }
}
