//! Authentication and authorization core
//!
//! [`AuthSystem`] is the single entry point the route layer calls to attempt
//! a login. Credential verification strictly precedes identity
//! establishment, which strictly precedes any permission check. Denials are
//! ordinary values ([`AuthDecision::Denied`]), never errors; the deny reason
//! is deliberately generic so responses cannot be used for username
//! enumeration.

pub mod directory;
pub mod identity;
mod local;
pub mod rbac;
pub mod users;

pub use identity::{AccessDecision, Identity, check_access};
pub use rbac::{RbacService, RoleResolver};
pub use users::{NewUser, UserService};

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::models::{AuthConfig, AuthMode};
use crate::core::models::{HistoryAction, RequestContext, User, UserHistoryEntry};
use crate::storage::AuthStore;
use crate::utils::error::Result;
use crate::utils::sanitize::normalize_username;
use directory::{DirectoryAuthenticator, DirectoryConnector, DirectorySynchronizer};
use local::{CredentialCheck, LocalAuthenticator};

/// Why an authentication attempt was denied.
///
/// Generic by design: credential failures, unknown users, directory
/// failures, and non-admin status problems all collapse to
/// [`DenyReason::InvalidCredentials`]. Only the reserved admin account's
/// status denial is distinguishable, for operator-facing messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Wrong username or password (or anything indistinguishable from it)
    InvalidCredentials,
    /// The account is inactive or blocked
    AccountDisabled,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::InvalidCredentials => write!(f, "invalid username or password"),
            DenyReason::AccountDisabled => write!(f, "account is inactive or blocked"),
        }
    }
}

/// Outcome of an authentication attempt
#[derive(Debug, Clone)]
pub enum AuthDecision {
    /// Authenticated; the identity carries the session's permission set
    Granted(Identity),
    /// Denied; a normal outcome, not a fault
    Denied(DenyReason),
}

impl AuthDecision {
    /// Whether authentication succeeded
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthDecision::Granted(_))
    }

    /// The identity, if granted
    pub fn identity(self) -> Option<Identity> {
        match self {
            AuthDecision::Granted(identity) => Some(identity),
            AuthDecision::Denied(_) => None,
        }
    }
}

/// The authentication and authorization engine
pub struct AuthSystem {
    config: Arc<AuthConfig>,
    store: Arc<dyn AuthStore>,
    local: LocalAuthenticator,
    rbac: RbacService,
    users: UserService,
    directory: Option<(DirectoryAuthenticator, DirectorySynchronizer)>,
}

impl AuthSystem {
    /// Create a system with local authentication only
    pub fn new(config: AuthConfig, store: Arc<dyn AuthStore>) -> Self {
        let rbac = RbacService::new(store.clone(), config.max_role_depth);
        Self {
            config: Arc::new(config),
            store: store.clone(),
            local: LocalAuthenticator::new(store.clone()),
            rbac,
            users: UserService::new(store),
            directory: None,
        }
    }

    /// Create a system with a directory connector installed for
    /// directory-mode authentication
    pub fn with_directory(
        config: AuthConfig,
        store: Arc<dyn AuthStore>,
        connector: Arc<dyn DirectoryConnector>,
    ) -> Self {
        let mut system = Self::new(config, store.clone());
        let directory_config = system.config.directory.clone();
        let authenticator = DirectoryAuthenticator::new(directory_config.clone(), connector);
        let synchronizer = DirectorySynchronizer::new(store, directory_config);
        system.directory = Some((authenticator, synchronizer));
        system
    }

    /// Seed the stock RBAC catalog and guarantee the reserved admin
    /// account exists with the given password. Idempotent.
    pub async fn bootstrap(&self, admin_password: &str) -> Result<()> {
        self.rbac.bootstrap().await?;
        self.users.ensure_admin(admin_password).await?;
        Ok(())
    }

    /// Attempt a login.
    ///
    /// The reserved admin account always authenticates through the local
    /// path regardless of the configured mode; this is a deliberate
    /// security backstop. Directory mode never falls back to local
    /// authentication for other users.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        context: &RequestContext,
    ) -> Result<AuthDecision> {
        let username = normalize_username(username);
        if username.is_empty() || password.is_empty() {
            warn!("login attempt with empty credentials");
            return Ok(AuthDecision::Denied(DenyReason::InvalidCredentials));
        }

        if username == User::ADMIN {
            return self.local_flow(&username, password, context).await;
        }

        match self.config.mode {
            AuthMode::Local => self.local_flow(&username, password, context).await,
            AuthMode::Directory => self.directory_flow(&username, password, context).await,
        }
    }

    /// Materialize the identity for an authenticated user: their role's
    /// effective permission set, or the empty set when they have no role.
    pub async fn establish_identity(&self, user: &User) -> Result<Identity> {
        let permissions = match &user.role {
            Some(role) => self.rbac.effective_permissions(role).await?,
            None => HashSet::new(),
        };
        Ok(Identity::establish(user, permissions))
    }

    /// Resolved permission set of a role, inherited permissions included
    pub async fn effective_permissions(&self, role: &str) -> Result<HashSet<String>> {
        self.rbac.effective_permissions(role).await
    }

    /// Role and permission administration
    pub fn rbac(&self) -> &RbacService {
        &self.rbac
    }

    /// User account administration
    pub fn users(&self) -> &UserService {
        &self.users
    }

    /// The active configuration
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    async fn local_flow(
        &self,
        username: &str,
        password: &str,
        context: &RequestContext,
    ) -> Result<AuthDecision> {
        match self.local.verify(username, password).await? {
            CredentialCheck::Verified(user) => self.finalize_login(*user, context).await,
            CredentialCheck::Denied(reason) => Ok(AuthDecision::Denied(reason)),
        }
    }

    async fn directory_flow(
        &self,
        username: &str,
        password: &str,
        context: &RequestContext,
    ) -> Result<AuthDecision> {
        let Some((authenticator, synchronizer)) = &self.directory else {
            // Misconfiguration, not a reason to downgrade to local auth.
            error!("directory mode configured but no directory connector installed");
            return Ok(AuthDecision::Denied(DenyReason::InvalidCredentials));
        };

        let Some(profile) = authenticator.authenticate(username, password).await? else {
            return Ok(AuthDecision::Denied(DenyReason::InvalidCredentials));
        };

        let user = synchronizer.sync(&profile, context, Utc::now()).await?;
        if !user.is_active() {
            warn!(username, status = ?user.status, "directory-authenticated account is not active");
            return Ok(AuthDecision::Denied(DenyReason::InvalidCredentials));
        }

        self.finalize_login(user, context).await
    }

    /// Success path shared by both authenticators: stamp the login,
    /// append the audit entry, and establish the identity.
    async fn finalize_login(&self, user: User, context: &RequestContext) -> Result<AuthDecision> {
        self.store.record_login(user.id, Utc::now()).await?;
        self.store
            .append_history(UserHistoryEntry::new(
                user.id,
                HistoryAction::Login,
                user.username.clone(),
                context,
            ))
            .await?;

        let identity = self.establish_identity(&user).await?;
        info!(username = %user.username, role = ?user.role, "user authenticated");
        Ok(AuthDecision::Granted(identity))
    }
}

#[cfg(test)]
mod tests;
