//! Directory-to-local synchronization
//!
//! After a successful directory authentication, the local account is
//! provisioned on first login and re-synchronized afterwards, throttled so
//! frequent logins do not hammer the store. Role mapping translates the
//! user's directory groups through the static group→role table; with the
//! single-role model, the mapped role with the highest priority wins.
//! Manually assigned roles and the reserved admin user are never touched.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use super::DirectoryProfile;
use crate::config::models::DirectoryConfig;
use crate::core::models::{HistoryAction, RequestContext, User, UserHistoryEntry};
use crate::storage::{AuthStore, DirectorySyncUpdate, RoleSync};
use crate::utils::error::Result;
use crate::utils::sanitize::normalize_email;

/// Principal recorded on history entries written by synchronization
const SYNC_ACTOR: &str = "directory-sync";

/// Keeps directory-sourced local accounts in step with the directory
pub struct DirectorySynchronizer {
    store: Arc<dyn AuthStore>,
    config: DirectoryConfig,
}

impl DirectorySynchronizer {
    /// Create a synchronizer over the given store
    pub fn new(store: Arc<dyn AuthStore>, config: DirectoryConfig) -> Self {
        Self { store, config }
    }

    /// Provision or refresh the local account for an authenticated
    /// directory user and return it.
    pub async fn sync(
        &self,
        profile: &DirectoryProfile,
        context: &RequestContext,
        now: DateTime<Utc>,
    ) -> Result<User> {
        match self.store.find_user(&profile.username).await? {
            None => self.provision(profile, context, now).await,
            Some(user) if user.from_directory => {
                if let Some(last) = user.last_directory_sync {
                    if now - last < self.config.sync_interval() {
                        debug!(username = %user.username, "directory sync within throttle, skipping");
                        return Ok(user);
                    }
                }
                self.resync(user, profile, context, now).await
            }
            // A local account that happens to share the name is never
            // overwritten by directory data.
            Some(user) => Ok(user),
        }
    }

    /// First login: create the local account from directory attributes,
    /// falling back to synthesized defaults where the directory is silent.
    async fn provision(
        &self,
        profile: &DirectoryProfile,
        context: &RequestContext,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let display_name = profile
            .display_name
            .clone()
            .unwrap_or_else(|| profile.username.clone());
        let email = profile.email.as_deref().map(normalize_email).unwrap_or_else(|| {
            format!("{}@{}", profile.username, self.config.default_email_domain)
        });

        let mut user = User::new(&profile.username, display_name, email);
        user.from_directory = true;
        user.department = profile.department.clone();
        user.title = profile.title.clone();
        user.phone = profile.phone.clone();
        user.created_by = Some(SYNC_ACTOR.to_string());
        user.last_directory_sync = Some(now);

        if let Some(role) = self.map_role(&profile.groups).await? {
            user.role = Some(role);
            user.role_from_directory = true;
        }

        let user = self.store.create_user(user).await?;
        self.store
            .append_history(
                UserHistoryEntry::new(user.id, HistoryAction::Created, SYNC_ACTOR, context)
                    .with_details(serde_json::json!({ "source": "directory" })),
            )
            .await?;

        info!(username = %user.username, role = ?user.role, "provisioned directory user");
        Ok(user)
    }

    /// Periodic refresh of directory-derived fields and role mapping
    async fn resync(
        &self,
        user: User,
        profile: &DirectoryProfile,
        context: &RequestContext,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let role = self.role_sync_for(&user, &profile.groups).await?;
        let role_changed = !matches!(role, RoleSync::Keep);

        let update = DirectorySyncUpdate {
            display_name: profile.display_name.clone(),
            email: profile.email.as_deref().map(normalize_email),
            department: profile.department.clone(),
            title: profile.title.clone(),
            phone: profile.phone.clone(),
            role,
            synced_at: now,
        };

        let updated = self.store.apply_directory_sync(user.id, update).await?;

        let action = if role_changed && updated.role != user.role {
            HistoryAction::RoleChanged
        } else {
            HistoryAction::Updated
        };
        self.store
            .append_history(
                UserHistoryEntry::new(updated.id, action, SYNC_ACTOR, context)
                    .with_details(serde_json::json!({ "source": "directory" })),
            )
            .await?;

        info!(username = %updated.username, "directory data synchronized");
        Ok(updated)
    }

    /// Decide how this sync treats the user's role reference
    async fn role_sync_for(&self, user: &User, groups: &[String]) -> Result<RoleSync> {
        // The reserved admin account keeps its role no matter what the
        // directory says.
        if user.is_admin() {
            return Ok(RoleSync::Keep);
        }
        // A manually assigned role is never replaced by group mapping.
        if user.role.is_some() && !user.role_from_directory {
            return Ok(RoleSync::Keep);
        }

        match self.map_role(groups).await? {
            Some(role) => Ok(RoleSync::Assign(role)),
            None if user.role_from_directory => Ok(RoleSync::Clear),
            None => Ok(RoleSync::Keep),
        }
    }

    /// Translate directory groups into a single local role: among all
    /// mapped candidates that exist, the highest priority wins.
    async fn map_role(&self, groups: &[String]) -> Result<Option<String>> {
        let mut best: Option<(i32, String)> = None;

        for group in groups {
            let Some(role_name) = self.config.group_role_map.get(group) else {
                continue;
            };
            let Some(role) = self.store.find_role(role_name).await? else {
                debug!(group = %group, role = %role_name, "mapped role does not exist locally");
                continue;
            };
            if !role.active {
                continue;
            }
            let candidate = (role.priority, role.name.clone());
            best = match best {
                Some(current) if current.0 >= candidate.0 => Some(current),
                _ => Some(candidate),
            };
        }

        Ok(best.map(|(_, name)| name))
    }
}
