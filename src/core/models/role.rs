//! Role and permission definitions
//!
//! A [`Permission`] is an atomic named capability; a [`Role`] is a named
//! bundle of permissions that may inherit from a single parent role. The
//! reserved role [`Role::ADMIN`] always exists, is always active, and can
//! never be deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Criticality tier of a permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    /// Routine capability
    Low,
    /// Default tier
    #[default]
    Medium,
    /// Capability touching sensitive data
    High,
    /// Capability controlling the system itself
    Critical,
}

/// Atomic named capability gating one feature or action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    /// Unique name, immutable once referenced by role assignments
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Free-form grouping
    #[serde(default = "default_category")]
    pub category: String,
    /// Criticality tier
    #[serde(default)]
    pub criticality: Criticality,
    /// Resource this permission protects
    pub resource: String,
    /// Action this permission allows
    pub action: String,
    /// Whether the permission is active
    #[serde(default = "default_true")]
    pub active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Permission {
    /// Create a new active permission with default category and criticality
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: default_category(),
            criticality: Criticality::default(),
            resource: resource.into(),
            action: action.into(),
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the criticality tier
    pub fn with_criticality(mut self, criticality: Criticality) -> Self {
        self.criticality = criticality;
        self
    }
}

/// Named bundle of permissions assignable to a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Unique name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Whether the role is active
    #[serde(default = "default_true")]
    pub active: bool,
    /// Display color (presentation only, irrelevant to authorization)
    #[serde(default = "default_color")]
    pub color: String,
    /// Display icon (presentation only)
    #[serde(default = "default_icon")]
    pub icon: String,
    /// Ordering hint used as a tie-break in role mapping
    #[serde(default)]
    pub priority: i32,
    /// Optional parent role; the parent chain must stay acyclic
    #[serde(default)]
    pub parent: Option<String>,
    /// Directly assigned permission names (set semantics, duplicates impossible)
    #[serde(default)]
    pub permissions: HashSet<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Principal that created the role
    #[serde(default)]
    pub created_by: Option<String>,
}

impl Role {
    /// Name of the reserved administrator role
    pub const ADMIN: &'static str = "admin";

    /// Create a new active role with no permissions
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: description.into(),
            active: true,
            color: default_color(),
            icon: default_icon(),
            priority: 0,
            parent: None,
            permissions: HashSet::new(),
            created_at: now,
            updated_at: now,
            created_by: None,
        }
    }

    /// Set the parent role
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the priority ordering hint
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a directly assigned permission
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// Whether this is the reserved administrator role
    pub fn is_admin(&self) -> bool {
        self.name == Self::ADMIN
    }
}

fn default_category() -> String {
    "geral".to_string()
}

fn default_color() -> String {
    "#6c757d".to_string()
}

fn default_icon() -> String {
    "bi-person".to_string()
}

fn default_true() -> bool {
    true
}
