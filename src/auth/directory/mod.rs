//! Directory (LDAP/AD) authentication
//!
//! Verifies credentials against an external directory server: sanitize the
//! username, search the user subtree through a cached connection, check the
//! account-disabled flag, then prove the password with a fresh bind on a
//! separate connection. Every infrastructure failure is logged in detail
//! and collapses to a generic denial; directory mode never silently falls
//! back to local authentication.

pub mod cache;
pub mod client;
pub mod sync;


pub use cache::ConnectionCache;
pub use client::{BindCredentials, DirectoryConnection, DirectoryConnector, DirectoryEntry};
pub use sync::DirectorySynchronizer;

use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::models::DirectoryConfig;
use crate::utils::error::Result;
use crate::utils::sanitize::sanitize_directory_username;

/// Active Directory `userAccountControl` flag marking a disabled account
const ACCOUNT_DISABLE: u32 = 0x0002;

/// Attributes fetched from the directory for one authenticated user
#[derive(Debug, Clone)]
pub struct DirectoryProfile {
    /// Sanitized username the entry was resolved from
    pub username: String,
    /// Distinguished name of the entry
    pub dn: String,
    /// Display name, if the directory exposes one
    pub display_name: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Department
    pub department: Option<String>,
    /// Job title
    pub title: Option<String>,
    /// Phone number
    pub phone: Option<String>,
    /// Group DNs the user is a member of
    pub groups: Vec<String>,
}

/// Authenticates credentials against the configured directory server
pub struct DirectoryAuthenticator {
    config: DirectoryConfig,
    connector: Arc<dyn DirectoryConnector>,
    cache: ConnectionCache,
}

impl DirectoryAuthenticator {
    /// Create an authenticator with its own connection cache
    pub fn new(config: DirectoryConfig, connector: Arc<dyn DirectoryConnector>) -> Self {
        let cache = ConnectionCache::new(connector.clone(), &config);
        Self {
            config,
            connector,
            cache,
        }
    }

    /// Verify credentials against the directory.
    ///
    /// `Ok(Some(profile))` means the bind succeeded; `Ok(None)` is a denial
    /// (wrong credentials, unknown or ambiguous entry, disabled account, or
    /// any infrastructure failure, which is logged but not surfaced).
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<DirectoryProfile>> {
        if username.trim().is_empty() || password.is_empty() {
            warn!("directory login attempt with empty credentials");
            return Ok(None);
        }

        let Some(username) = sanitize_directory_username(username) else {
            warn!("directory username empty after sanitization");
            return Ok(None);
        };

        let endpoint = self.config.endpoint();
        let conn = match self.cache.get(&endpoint).await {
            Ok(conn) => conn,
            Err(e) => {
                error!(endpoint = %endpoint, error = %e, "failed to obtain directory connection");
                return Ok(None);
            }
        };

        let attrs = &self.config.attributes;
        let filter = format!("({}={})", attrs.username, username);
        let search = timeout(
            self.config.timeout(),
            conn.search(
                &self.config.search_base(),
                &filter,
                &attrs.search_list(),
            ),
        )
        .await;

        let entries = match search {
            Err(_) => {
                error!(username, "directory search timed out");
                // The connection's state is indeterminate; do not return it
                // to the cache.
                self.cache.discard(&endpoint).await;
                return Ok(None);
            }
            Ok(Err(e)) => {
                error!(username, error = %e, "directory search failed");
                self.cache.discard(&endpoint).await;
                return Ok(None);
            }
            Ok(Ok(entries)) => entries,
        };

        if entries.len() != 1 {
            // Zero matches or ambiguity: never guess among entries.
            warn!(username, matches = entries.len(), "directory user not uniquely resolved");
            return Ok(None);
        }
        let entry = &entries[0];

        if let Some(raw) = entry.first(&attrs.account_control) {
            match raw.parse::<u32>() {
                Ok(flags) if flags & ACCOUNT_DISABLE != 0 => {
                    warn!(username, "directory account is disabled");
                    return Ok(None);
                }
                Ok(_) => {}
                Err(_) => {
                    // Present but unreadable: the account state is unknown,
                    // so fail closed.
                    warn!(username, value = raw, "unreadable account control attribute");
                    return Ok(None);
                }
            }
        }

        // Credential proof: fresh bind with the resolved DN on a dedicated
        // connection, never the shared search connection.
        let bound = match timeout(
            self.config.timeout(),
            self.connector
                .verify_credentials(&endpoint, &entry.dn, password),
        )
        .await
        {
            Err(_) => {
                error!(username, "directory bind timed out");
                return Ok(None);
            }
            Ok(Err(e)) => {
                error!(username, error = %e, "directory bind failed");
                return Ok(None);
            }
            Ok(Ok(bound)) => bound,
        };

        if !bound {
            warn!(username, "directory rejected credentials");
            return Ok(None);
        }

        info!(username, "directory authentication succeeded");
        debug!(username, dn = %entry.dn, "resolved directory entry");

        Ok(Some(DirectoryProfile {
            username,
            dn: entry.dn.clone(),
            display_name: entry.first(&attrs.display_name).map(str::to_string),
            email: entry.first(&attrs.email).map(str::to_string),
            department: entry.first(&attrs.department).map(str::to_string),
            title: entry.first(&attrs.title).map(str::to_string),
            phone: entry.first(&attrs.phone).map(str::to_string),
            groups: entry.values(&attrs.groups),
        }))
    }
}
