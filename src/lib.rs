//! # certwatch-auth
//!
//! Authentication and authorization core for the certificate expiration
//! tracker: local and directory (LDAP/AD) login, hierarchical role-based
//! access control, and directory-to-local account synchronization.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use certwatch_auth::{AuthSystem, check_access, AccessDecision};
//! use certwatch_auth::config::models::AuthConfig;
//! use certwatch_auth::core::models::RequestContext;
//! use certwatch_auth::storage::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let system = AuthSystem::new(AuthConfig::default(), Arc::new(MemoryStore::new()));
//!     system.bootstrap("change-me-on-first-login").await?;
//!
//!     let context = RequestContext::new().with_peer("203.0.113.7");
//!     let decision = system.authenticate("admin", "change-me-on-first-login", &context).await?;
//!     let identity = decision.identity().expect("login failed");
//!
//!     assert!(check_access(Some(&identity), "manage_config").is_granted());
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod core;
pub mod storage;
pub mod utils;

// Re-export main types
pub use auth::{
    AccessDecision, AuthDecision, AuthSystem, DenyReason, Identity, NewUser, RbacService,
    RoleResolver, UserService, check_access,
};
pub use config::Config;
pub use storage::{AuthStore, MemoryStore};
pub use utils::error::{AuthError, IntegrityError, Result};
