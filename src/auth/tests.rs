//! End-to-end authentication flows through [`AuthSystem`]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::directory::{BindCredentials, DirectoryConnection, DirectoryConnector, DirectoryEntry};
use super::users::NewUser;
use super::{AuthDecision, AuthSystem, DenyReason};
use crate::config::models::{AuthConfig, AuthMode, DirectoryEndpoint};
use crate::core::models::{HistoryAction, RequestContext, User, UserStatus};
use crate::storage::{AuthStore, MemoryStore};
use crate::utils::error::Result;

const ADMIN_PASSWORD: &str = "correct horse battery staple";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn context() -> RequestContext {
    RequestContext::new()
        .with_peer("203.0.113.7")
        .with_user_agent("integration-test")
}

async fn local_system() -> (AuthSystem, Arc<MemoryStore>) {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let system = AuthSystem::new(AuthConfig::default(), store.clone());
    system.bootstrap(ADMIN_PASSWORD).await.unwrap();
    (system, store)
}

async fn create_jdoe(system: &AuthSystem, role: &str) -> User {
    system
        .users()
        .create_user(
            NewUser {
                username: "jdoe".to_string(),
                display_name: "John Doe".to_string(),
                email: "jdoe@example.com".to_string(),
                password: Some("hunter2hunter2".to_string()),
                role: Some(role.to_string()),
            },
            "admin",
            &context(),
        )
        .await
        .unwrap()
}

fn assert_denied(decision: AuthDecision, expected: DenyReason) {
    match decision {
        AuthDecision::Denied(reason) => assert_eq!(reason, expected),
        AuthDecision::Granted(_) => panic!("expected denial"),
    }
}

#[tokio::test]
async fn test_local_login_grants_role_permissions() {
    let (system, store) = local_system().await;
    let user = create_jdoe(&system, "operador").await;

    let decision = system
        .authenticate("jdoe", "hunter2hunter2", &context())
        .await
        .unwrap();
    let identity = decision.identity().expect("login should succeed");

    assert_eq!(identity.username(), "jdoe");
    assert_eq!(identity.role(), Some("operador"));
    assert!(identity.has_permission("manage_registros"));
    assert!(identity.has_permission("send_alerts"));
    assert!(!identity.has_permission("manage_access"));

    let stored = store.find_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.login_count, 1);
    assert!(stored.last_login.is_some());

    let history = store.history_for(user.id).await.unwrap();
    let login = history.last().unwrap();
    assert_eq!(login.action, HistoryAction::Login);
    assert_eq!(login.ip_address.as_deref(), Some("203.0.113.7"));
}

#[tokio::test]
async fn test_visualizador_has_no_management_permissions() {
    let (system, _store) = local_system().await;
    create_jdoe(&system, "visualizador").await;

    let identity = system
        .authenticate("jdoe", "hunter2hunter2", &context())
        .await
        .unwrap()
        .identity()
        .unwrap();

    assert!(!identity.has_permission("manage_config"));
    assert!(identity.permissions().is_empty());
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_identical() {
    let (system, _store) = local_system().await;
    create_jdoe(&system, "operador").await;

    let wrong = system
        .authenticate("jdoe", "not the password", &context())
        .await
        .unwrap();
    assert_denied(wrong, DenyReason::InvalidCredentials);

    let unknown = system
        .authenticate("nobody", "not the password", &context())
        .await
        .unwrap();
    assert_denied(unknown, DenyReason::InvalidCredentials);
}

#[tokio::test]
async fn test_empty_credentials_are_denied() {
    let (system, _store) = local_system().await;

    assert_denied(
        system.authenticate("", "x", &context()).await.unwrap(),
        DenyReason::InvalidCredentials,
    );
    assert_denied(
        system.authenticate("admin", "", &context()).await.unwrap(),
        DenyReason::InvalidCredentials,
    );
}

#[tokio::test]
async fn test_username_is_normalized_before_lookup() {
    let (system, _store) = local_system().await;
    create_jdoe(&system, "operador").await;

    let decision = system
        .authenticate("  JDoe ", "hunter2hunter2", &context())
        .await
        .unwrap();
    assert!(decision.is_granted());
}

#[tokio::test]
async fn test_blocked_user_gets_generic_denial() {
    let (system, _store) = local_system().await;
    create_jdoe(&system, "operador").await;
    system
        .users()
        .set_status("jdoe", UserStatus::Blocked, "admin", &context())
        .await
        .unwrap();

    let decision = system
        .authenticate("jdoe", "hunter2hunter2", &context())
        .await
        .unwrap();
    assert_denied(decision, DenyReason::InvalidCredentials);
}

#[tokio::test]
async fn test_inactive_user_gets_generic_denial() {
    let (system, _store) = local_system().await;
    create_jdoe(&system, "operador").await;
    system
        .users()
        .set_status("jdoe", UserStatus::Inactive, "admin", &context())
        .await
        .unwrap();

    let decision = system
        .authenticate("jdoe", "hunter2hunter2", &context())
        .await
        .unwrap();
    assert_denied(decision, DenyReason::InvalidCredentials);
}

#[tokio::test]
async fn test_admin_status_denial_is_distinguishable() {
    let (system, store) = local_system().await;

    // Simulate stored drift; the service layer refuses to do this.
    let mut admin = store.find_user(User::ADMIN).await.unwrap().unwrap();
    admin.status = UserStatus::Blocked;
    store.update_user(admin).await.unwrap();

    let decision = system
        .authenticate("admin", ADMIN_PASSWORD, &context())
        .await
        .unwrap();
    assert_denied(decision, DenyReason::AccountDisabled);
}

#[tokio::test]
async fn test_bootstrap_heals_admin_drift() {
    let (system, store) = local_system().await;

    let mut admin = store.find_user(User::ADMIN).await.unwrap().unwrap();
    admin.status = UserStatus::Inactive;
    admin.role = None;
    store.update_user(admin).await.unwrap();

    system.bootstrap(ADMIN_PASSWORD).await.unwrap();

    let healed = store.find_user(User::ADMIN).await.unwrap().unwrap();
    assert!(healed.is_active());
    assert_eq!(healed.role.as_deref(), Some("admin"));
}

#[tokio::test]
async fn test_admin_holds_every_stock_permission() {
    let (system, _store) = local_system().await;

    let identity = system
        .authenticate("admin", ADMIN_PASSWORD, &context())
        .await
        .unwrap()
        .identity()
        .unwrap();

    for permission in [
        "manage_access",
        "manage_registros",
        "manage_responsaveis",
        "manage_config",
        "send_alerts",
    ] {
        assert!(identity.has_permission(permission), "missing {permission}");
    }
}

#[tokio::test]
async fn test_identity_is_a_snapshot_of_login_time() {
    let (system, _store) = local_system().await;
    create_jdoe(&system, "visualizador").await;

    let identity = system
        .authenticate("jdoe", "hunter2hunter2", &context())
        .await
        .unwrap()
        .identity()
        .unwrap();
    assert!(!identity.has_permission("send_alerts"));

    system
        .rbac()
        .assign_permission("visualizador", "send_alerts")
        .await
        .unwrap();

    // The live identity is unchanged; the next login sees the grant.
    assert!(!identity.has_permission("send_alerts"));
    let fresh = system
        .authenticate("jdoe", "hunter2hunter2", &context())
        .await
        .unwrap()
        .identity()
        .unwrap();
    assert!(fresh.has_permission("send_alerts"));
}

// Minimal connector stub for directory-mode flows; the detailed protocol
// behavior is covered by the directory module's own tests.
struct SingleUserDirectory {
    username: String,
    password: String,
    groups: Vec<String>,
}

struct SingleUserConnection {
    entry: DirectoryEntry,
    username: String,
}

#[async_trait]
impl DirectoryConnection for SingleUserConnection {
    fn is_bound(&self) -> bool {
        true
    }

    async fn search(
        &self,
        _base: &str,
        filter: &str,
        _attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>> {
        if filter == format!("(sAMAccountName={})", self.username) {
            Ok(vec![self.entry.clone()])
        } else {
            Ok(Vec::new())
        }
    }
}

#[async_trait]
impl DirectoryConnector for SingleUserDirectory {
    async fn connect(
        &self,
        _endpoint: &DirectoryEndpoint,
        _credentials: &BindCredentials,
    ) -> Result<Arc<dyn DirectoryConnection>> {
        let mut attributes = HashMap::new();
        attributes.insert(
            "sAMAccountName".to_string(),
            vec![self.username.clone()],
        );
        attributes.insert(
            "mail".to_string(),
            vec![format!("{}@example.com", self.username)],
        );
        attributes.insert("displayName".to_string(), vec!["John Doe".to_string()]);
        attributes.insert("memberOf".to_string(), self.groups.clone());
        Ok(Arc::new(SingleUserConnection {
            entry: DirectoryEntry {
                dn: format!("cn={},ou=usuarios,dc=example,dc=com", self.username),
                attributes,
            },
            username: self.username.clone(),
        }))
    }

    async fn verify_credentials(
        &self,
        _endpoint: &DirectoryEndpoint,
        dn: &str,
        password: &str,
    ) -> Result<bool> {
        Ok(dn.contains(&format!("cn={}", self.username)) && password == self.password)
    }
}

async fn directory_system() -> (AuthSystem, Arc<MemoryStore>) {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let mut config = AuthConfig::default();
    config.mode = AuthMode::Directory;
    config.directory.group_role_map.insert(
        "cn=operadores,ou=grupos,dc=example,dc=com".to_string(),
        "operador".to_string(),
    );

    let connector = Arc::new(SingleUserDirectory {
        username: "jdoe".to_string(),
        password: "s3cret".to_string(),
        groups: vec!["cn=operadores,ou=grupos,dc=example,dc=com".to_string()],
    });

    let system = AuthSystem::with_directory(config, store.clone(), connector);
    system.bootstrap(ADMIN_PASSWORD).await.unwrap();
    (system, store)
}

#[tokio::test]
async fn test_directory_login_provisions_and_grants() {
    let (system, store) = directory_system().await;

    let identity = system
        .authenticate("jdoe", "s3cret", &context())
        .await
        .unwrap()
        .identity()
        .expect("directory login should succeed");

    assert_eq!(identity.role(), Some("operador"));
    assert!(identity.has_permission("manage_registros"));

    let user = store.find_user("jdoe").await.unwrap().unwrap();
    assert!(user.from_directory);
    assert!(user.password_hash.is_none());
    assert_eq!(user.login_count, 1);
}

#[tokio::test]
async fn test_directory_mode_rejects_wrong_password() {
    let (system, store) = directory_system().await;

    let decision = system.authenticate("jdoe", "wrong", &context()).await.unwrap();
    assert_denied(decision, DenyReason::InvalidCredentials);
    assert!(store.find_user("jdoe").await.unwrap().is_none());
}

#[tokio::test]
async fn test_admin_backstop_bypasses_directory() {
    let (system, _store) = directory_system().await;

    // The stub directory knows nothing about admin; the local path must
    // still handle it.
    let decision = system
        .authenticate("admin", ADMIN_PASSWORD, &context())
        .await
        .unwrap();
    assert!(decision.is_granted());

    // Wrong admin password still denies; the backstop is not a bypass.
    let decision = system.authenticate("admin", "wrong", &context()).await.unwrap();
    assert_denied(decision, DenyReason::InvalidCredentials);
}

#[tokio::test]
async fn test_non_active_directory_user_is_denied_after_sync() {
    let (system, _store) = directory_system().await;

    assert!(system
        .authenticate("jdoe", "s3cret", &context())
        .await
        .unwrap()
        .is_granted());

    for status in [UserStatus::Blocked, UserStatus::Inactive] {
        system
            .users()
            .set_status("jdoe", status, "admin", &context())
            .await
            .unwrap();

        let decision = system.authenticate("jdoe", "s3cret", &context()).await.unwrap();
        assert_denied(decision, DenyReason::InvalidCredentials);
    }
}

#[tokio::test]
async fn test_directory_mode_without_connector_denies() {
    let store = Arc::new(MemoryStore::new());
    let mut config = AuthConfig::default();
    config.mode = AuthMode::Directory;
    let system = AuthSystem::new(config, store);
    system.bootstrap(ADMIN_PASSWORD).await.unwrap();

    let decision = system.authenticate("jdoe", "s3cret", &context()).await.unwrap();
    assert_denied(decision, DenyReason::InvalidCredentials);
}

#[tokio::test]
async fn test_local_login_rejects_directory_only_account() {
    let (system, store) = local_system().await;
    let mut user = User::new("remote", "Remote User", "remote@example.com");
    user.from_directory = true;
    store.create_user(user).await.unwrap();

    let decision = system.authenticate("remote", "anything", &context()).await.unwrap();
    assert_denied(decision, DenyReason::InvalidCredentials);
}
