//! Role and permission administration
//!
//! Enforces the structural invariants of the role store: unique names, the
//! protected admin role, acyclic parent chains, and deletion guards. All
//! violations surface as [`IntegrityError`] values, distinct from
//! authentication or authorization denials.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};

use super::resolver::RoleResolver;
use crate::core::models::{Criticality, Permission, Role};
use crate::storage::AuthStore;
use crate::utils::error::{IntegrityError, Result};

/// Administrative operations over roles and permissions
#[derive(Clone)]
pub struct RbacService {
    store: Arc<dyn AuthStore>,
    resolver: RoleResolver,
    max_depth: usize,
}

impl RbacService {
    /// Create the service with the given hierarchy depth bound
    pub fn new(store: Arc<dyn AuthStore>, max_depth: usize) -> Self {
        let resolver = RoleResolver::new(store.clone(), max_depth);
        Self {
            store,
            resolver,
            max_depth,
        }
    }

    /// The hierarchy resolver backing this service
    pub fn resolver(&self) -> &RoleResolver {
        &self.resolver
    }

    /// Effective permission set of a role, inherited permissions included.
    /// Used by the administrative UI to preview a role's resolved
    /// capability set.
    pub async fn effective_permissions(&self, role_name: &str) -> Result<HashSet<String>> {
        self.resolver.effective_permissions(role_name).await
    }

    /// Seed the stock permission catalog and roles, and guarantee the
    /// reserved admin role exists with every stock permission. Idempotent;
    /// existing records are left untouched.
    pub async fn bootstrap(&self) -> Result<()> {
        info!("Bootstrapping RBAC catalog");

        let stock_permissions = [
            Permission::new(
                "manage_access",
                "Gerenciar usuários e perfis",
                "usuarios",
                "manage",
            )
            .with_category("sistema")
            .with_criticality(Criticality::Critical),
            Permission::new(
                "manage_registros",
                "Gerenciar registros de certificados",
                "registros",
                "manage",
            )
            .with_category("dados")
            .with_criticality(Criticality::High),
            Permission::new(
                "manage_responsaveis",
                "Gerenciar responsáveis",
                "responsaveis",
                "manage",
            )
            .with_category("dados"),
            Permission::new(
                "manage_config",
                "Gerenciar configurações do sistema",
                "configuracoes",
                "manage",
            )
            .with_category("sistema")
            .with_criticality(Criticality::Critical),
            Permission::new("send_alerts", "Enviar alertas por email", "emails", "send")
                .with_category("comunicacao"),
        ];

        let mut all_names = Vec::new();
        for permission in stock_permissions {
            all_names.push(permission.name.clone());
            if self.store.find_permission(&permission.name).await?.is_none() {
                self.store.save_permission(permission).await?;
            }
        }

        if self.store.find_role(Role::ADMIN).await?.is_none() {
            let mut admin = Role::new(Role::ADMIN, "Administrador do sistema").with_priority(10);
            admin.color = "#dc3545".to_string();
            admin.icon = "bi-shield-fill".to_string();
            admin.permissions = all_names.iter().cloned().collect();
            admin.created_by = Some("system".to_string());
            self.store.save_role(admin).await?;
        }

        if self.store.find_role("operador").await?.is_none() {
            let mut operador = Role::new("operador", "Operador do sistema").with_priority(5);
            operador.color = "#0d6efd".to_string();
            operador.icon = "bi-gear".to_string();
            operador.permissions = ["manage_registros", "manage_responsaveis", "send_alerts"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            operador.created_by = Some("system".to_string());
            self.store.save_role(operador).await?;
        }

        if self.store.find_role("visualizador").await?.is_none() {
            let mut visualizador =
                Role::new("visualizador", "Visualizador de dados").with_priority(1);
            visualizador.icon = "bi-eye".to_string();
            visualizador.created_by = Some("system".to_string());
            self.store.save_role(visualizador).await?;
        }

        Ok(())
    }

    /// Create a permission; the name must be unique
    pub async fn create_permission(&self, permission: Permission) -> Result<Permission> {
        if self.store.find_permission(&permission.name).await?.is_some() {
            return Err(IntegrityError::DuplicatePermission(permission.name).into());
        }
        self.store.save_permission(permission).await
    }

    /// Create a role; the name must be unique and any parent must exist
    /// and not form a cycle
    pub async fn create_role(&self, role: Role) -> Result<Role> {
        if self.store.find_role(&role.name).await?.is_some() {
            return Err(IntegrityError::DuplicateRole(role.name).into());
        }
        if let Some(parent) = &role.parent {
            self.check_parent(&role.name, parent).await?;
        }
        info!(role = %role.name, "creating role");
        self.store.save_role(role).await
    }

    /// Change or clear a role's parent, preserving acyclicity
    pub async fn set_role_parent(&self, name: &str, parent: Option<&str>) -> Result<Role> {
        let mut role = self
            .store
            .find_role(name)
            .await?
            .ok_or_else(|| IntegrityError::UnknownRole(name.to_string()))?;

        if let Some(parent) = parent {
            self.check_parent(name, parent).await?;
        }
        role.parent = parent.map(|p| p.to_string());
        self.store.save_role(role).await
    }

    /// Delete a role.
    ///
    /// Refused for the reserved admin role, for roles still referenced by
    /// users, and for roles with child roles.
    pub async fn delete_role(&self, name: &str) -> Result<()> {
        if name == Role::ADMIN {
            return Err(IntegrityError::ProtectedRole.into());
        }
        if self.store.find_role(name).await?.is_none() {
            return Err(IntegrityError::UnknownRole(name.to_string()).into());
        }

        let users = self.store.count_users_with_role(name).await?;
        if users > 0 {
            return Err(IntegrityError::RoleInUse {
                role: name.to_string(),
                users,
            }
            .into());
        }

        let has_children = self
            .store
            .list_roles()
            .await?
            .iter()
            .any(|role| role.parent.as_deref() == Some(name));
        if has_children {
            return Err(IntegrityError::RoleHasChildren(name.to_string()).into());
        }

        info!(role = %name, "deleting role");
        self.store.delete_role(name).await
    }

    /// Assign a permission to a role. Idempotent: assigning an already
    /// granted permission is a no-op.
    pub async fn assign_permission(&self, role_name: &str, permission: &str) -> Result<Role> {
        let mut role = self
            .store
            .find_role(role_name)
            .await?
            .ok_or_else(|| IntegrityError::UnknownRole(role_name.to_string()))?;
        if self.store.find_permission(permission).await?.is_none() {
            return Err(IntegrityError::UnknownPermission(permission.to_string()).into());
        }

        if role.permissions.insert(permission.to_string()) {
            role = self.store.save_role(role).await?;
        }
        Ok(role)
    }

    /// Remove a permission from a role
    pub async fn revoke_permission(&self, role_name: &str, permission: &str) -> Result<Role> {
        let mut role = self
            .store
            .find_role(role_name)
            .await?
            .ok_or_else(|| IntegrityError::UnknownRole(role_name.to_string()))?;

        if role.permissions.remove(permission) {
            role = self.store.save_role(role).await?;
        }
        Ok(role)
    }

    /// Verify that `parent` exists and that parenting `role` under it keeps
    /// the hierarchy acyclic (a role may never become its own ancestor).
    async fn check_parent(&self, role: &str, parent: &str) -> Result<()> {
        if self.store.find_role(parent).await?.is_none() {
            return Err(IntegrityError::UnknownRole(parent.to_string()).into());
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut current = Some(parent.to_string());
        while let Some(name) = current.take() {
            if name == role {
                error!(role = %role, parent = %parent, "rejected cyclic role parent");
                return Err(IntegrityError::CyclicHierarchy {
                    role: role.to_string(),
                    parent: parent.to_string(),
                }
                .into());
            }
            if !visited.insert(name.clone()) || visited.len() > self.max_depth {
                break;
            }
            current = self
                .store
                .find_role(&name)
                .await?
                .and_then(|r| r.parent.clone());
        }
        Ok(())
    }
}
