//! Role hierarchy resolution
//!
//! Computes the effective permission set of a role: its own permissions plus
//! everything reachable through the parent chain. Creation-time validation
//! keeps the hierarchy acyclic, but traversal still carries a visited-set
//! guard and a hard depth bound; a detected cycle is a logged configuration
//! anomaly, not a crash, and resolution returns what accumulated so far.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, warn};

use crate::storage::AuthStore;
use crate::utils::error::Result;

/// Resolves effective permission sets over the role store. Pure read.
#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn AuthStore>,
    max_depth: usize,
}

impl RoleResolver {
    /// Create a resolver with the given traversal depth bound
    pub fn new(store: Arc<dyn AuthStore>, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    /// Union of the role's own permissions and all inherited ones,
    /// deduplicated by permission name. An unknown role resolves to the
    /// empty set.
    pub async fn effective_permissions(&self, role_name: &str) -> Result<HashSet<String>> {
        let mut permissions = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = Some(role_name.to_string());

        while let Some(name) = current.take() {
            if !visited.insert(name.clone()) {
                error!(role = %role_name, at = %name, "cycle detected in role hierarchy");
                break;
            }
            if visited.len() > self.max_depth {
                error!(
                    role = %role_name,
                    max_depth = self.max_depth,
                    "role hierarchy exceeds depth bound"
                );
                break;
            }

            let Some(role) = self.store.find_role(&name).await? else {
                if visited.len() > 1 {
                    // A dangling parent reference is worth flagging; an
                    // unknown top-level role is a normal empty resolution.
                    warn!(role = %role_name, missing = %name, "parent role not found");
                }
                break;
            };

            permissions.extend(role.permissions.iter().cloned());
            current = role.parent.clone();
        }

        Ok(permissions)
    }
}
