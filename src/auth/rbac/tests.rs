//! Role hierarchy and administration tests

use std::sync::Arc;

use super::service::RbacService;
use crate::core::models::{Permission, Role};
use crate::storage::{AuthStore, MemoryStore};
use crate::utils::error::{AuthError, IntegrityError};

const MAX_DEPTH: usize = 32;

async fn service_with_catalog() -> (RbacService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = RbacService::new(store.clone(), MAX_DEPTH);
    service.bootstrap().await.unwrap();
    (service, store)
}

fn assert_integrity(err: AuthError, expected: IntegrityError) {
    match err {
        AuthError::Integrity(actual) => assert_eq!(actual, expected),
        other => panic!("expected integrity error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bootstrap_is_idempotent() {
    let (service, store) = service_with_catalog().await;
    service.bootstrap().await.unwrap();

    assert_eq!(store.list_permissions().await.unwrap().len(), 5);
    assert_eq!(store.list_roles().await.unwrap().len(), 3);

    let admin = store.find_role(Role::ADMIN).await.unwrap().unwrap();
    assert_eq!(admin.permissions.len(), 5);
    assert_eq!(admin.priority, 10);
}

#[tokio::test]
async fn test_role_without_parent_resolves_to_own_permissions() {
    let (service, _store) = service_with_catalog().await;

    let perms = service.effective_permissions("operador").await.unwrap();
    assert_eq!(perms.len(), 3);
    assert!(perms.contains("manage_registros"));
    assert!(perms.contains("manage_responsaveis"));
    assert!(perms.contains("send_alerts"));
    assert!(!perms.contains("manage_access"));
}

#[tokio::test]
async fn test_unknown_role_resolves_to_empty_set() {
    let (service, _store) = service_with_catalog().await;
    let perms = service.effective_permissions("ghost").await.unwrap();
    assert!(perms.is_empty());
}

#[tokio::test]
async fn test_inheritance_unions_and_deduplicates() {
    let (service, store) = service_with_catalog().await;

    store
        .save_role(
            Role::new("r3", "base")
                .with_permission("send_alerts")
                .with_permission("manage_config"),
        )
        .await
        .unwrap();
    store
        .save_role(
            Role::new("r2", "middle")
                .with_parent("r3")
                .with_permission("manage_registros")
                .with_permission("send_alerts"),
        )
        .await
        .unwrap();
    store
        .save_role(
            Role::new("r1", "top")
                .with_parent("r2")
                .with_permission("manage_registros"),
        )
        .await
        .unwrap();

    let perms = service.effective_permissions("r1").await.unwrap();
    assert_eq!(perms.len(), 3);
    assert!(perms.contains("manage_registros"));
    assert!(perms.contains("send_alerts"));
    assert!(perms.contains("manage_config"));
}

#[tokio::test]
async fn test_child_role_inherits_operator_permissions() {
    let (service, _store) = service_with_catalog().await;

    service
        .create_role(
            Role::new("gestor", "Gestor de responsáveis")
                .with_parent("operador")
                .with_permission("manage_responsaveis"),
        )
        .await
        .unwrap();

    let perms = service.effective_permissions("gestor").await.unwrap();
    assert_eq!(perms.len(), 3);
    assert!(perms.contains("manage_registros"));
    assert!(perms.contains("manage_responsaveis"));
    assert!(perms.contains("send_alerts"));
}

#[tokio::test]
async fn test_cycle_in_stored_data_returns_accumulated_permissions() {
    let (service, store) = service_with_catalog().await;

    // Service-level validation would refuse this; write it straight to the
    // store to simulate corrupted data.
    store
        .save_role(Role::new("a", "a").with_parent("b").with_permission("send_alerts"))
        .await
        .unwrap();
    store
        .save_role(
            Role::new("b", "b")
                .with_parent("a")
                .with_permission("manage_registros"),
        )
        .await
        .unwrap();

    let perms = service.effective_permissions("a").await.unwrap();
    assert_eq!(perms.len(), 2);
}

#[tokio::test]
async fn test_create_role_rejects_duplicate_name() {
    let (service, _store) = service_with_catalog().await;

    let err = service
        .create_role(Role::new("operador", "again"))
        .await
        .unwrap_err();
    assert_integrity(err, IntegrityError::DuplicateRole("operador".to_string()));
}

#[tokio::test]
async fn test_create_role_rejects_unknown_parent() {
    let (service, _store) = service_with_catalog().await;

    let err = service
        .create_role(Role::new("orphan", "no such parent").with_parent("missing"))
        .await
        .unwrap_err();
    assert_integrity(err, IntegrityError::UnknownRole("missing".to_string()));
}

#[tokio::test]
async fn test_reparenting_into_a_cycle_is_refused() {
    let (service, _store) = service_with_catalog().await;

    service
        .create_role(Role::new("child", "child").with_parent("operador"))
        .await
        .unwrap();
    service
        .create_role(Role::new("grandchild", "grandchild").with_parent("child"))
        .await
        .unwrap();

    let err = service
        .set_role_parent("operador", Some("grandchild"))
        .await
        .unwrap_err();
    assert_integrity(
        err,
        IntegrityError::CyclicHierarchy {
            role: "operador".to_string(),
            parent: "grandchild".to_string(),
        },
    );

    // Self-parenting is the degenerate cycle.
    let err = service.set_role_parent("child", Some("child")).await.unwrap_err();
    assert_integrity(
        err,
        IntegrityError::CyclicHierarchy {
            role: "child".to_string(),
            parent: "child".to_string(),
        },
    );
}

#[tokio::test]
async fn test_admin_role_cannot_be_deleted() {
    let (service, store) = service_with_catalog().await;
    let err = service.delete_role(Role::ADMIN).await.unwrap_err();
    assert_integrity(err, IntegrityError::ProtectedRole);

    // The role store is unchanged by the refused attempt.
    let admin = store.find_role(Role::ADMIN).await.unwrap().unwrap();
    assert_eq!(admin.permissions.len(), 5);
    assert_eq!(store.list_roles().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_role_in_use_blocks_deletion_until_unlinked() {
    let (service, store) = service_with_catalog().await;

    let user = crate::core::models::User::new("maria", "Maria Silva", "maria@example.com")
        .with_role("visualizador");
    let user = store.create_user(user).await.unwrap();

    let err = service.delete_role("visualizador").await.unwrap_err();
    assert_integrity(
        err,
        IntegrityError::RoleInUse {
            role: "visualizador".to_string(),
            users: 1,
        },
    );

    let mut unlinked = user;
    unlinked.role = None;
    store.update_user(unlinked).await.unwrap();

    service.delete_role("visualizador").await.unwrap();
    assert!(store.find_role("visualizador").await.unwrap().is_none());
}

#[tokio::test]
async fn test_role_with_children_cannot_be_deleted() {
    let (service, _store) = service_with_catalog().await;

    service
        .create_role(Role::new("child", "child").with_parent("visualizador"))
        .await
        .unwrap();

    let err = service.delete_role("visualizador").await.unwrap_err();
    assert_integrity(err, IntegrityError::RoleHasChildren("visualizador".to_string()));
}

#[tokio::test]
async fn test_permission_assignment_is_idempotent() {
    let (service, _store) = service_with_catalog().await;

    let role = service
        .assign_permission("visualizador", "send_alerts")
        .await
        .unwrap();
    assert_eq!(role.permissions.len(), 1);

    let role = service
        .assign_permission("visualizador", "send_alerts")
        .await
        .unwrap();
    assert_eq!(role.permissions.len(), 1);

    let role = service
        .revoke_permission("visualizador", "send_alerts")
        .await
        .unwrap();
    assert!(role.permissions.is_empty());
}

#[tokio::test]
async fn test_assignment_requires_known_role_and_permission() {
    let (service, _store) = service_with_catalog().await;

    let err = service
        .assign_permission("ghost", "send_alerts")
        .await
        .unwrap_err();
    assert_integrity(err, IntegrityError::UnknownRole("ghost".to_string()));

    let err = service
        .assign_permission("operador", "fly")
        .await
        .unwrap_err();
    assert_integrity(err, IntegrityError::UnknownPermission("fly".to_string()));
}

#[tokio::test]
async fn test_create_permission_rejects_duplicate() {
    let (service, _store) = service_with_catalog().await;

    let err = service
        .create_permission(Permission::new("send_alerts", "again", "emails", "send"))
        .await
        .unwrap_err();
    assert_integrity(err, IntegrityError::DuplicatePermission("send_alerts".to_string()));
}

#[tokio::test]
async fn test_permission_edits_are_visible_on_next_resolution() {
    let (service, _store) = service_with_catalog().await;

    let before = service.effective_permissions("visualizador").await.unwrap();
    assert!(before.is_empty());

    service
        .assign_permission("visualizador", "manage_registros")
        .await
        .unwrap();

    let after = service.effective_permissions("visualizador").await.unwrap();
    assert!(after.contains("manage_registros"));
    // The earlier resolution is a plain value and does not change.
    assert!(before.is_empty());
}
