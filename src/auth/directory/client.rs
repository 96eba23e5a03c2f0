//! Directory protocol client seam
//!
//! The actual LDAP/AD wire client is an external collaborator; the core only
//! needs connection establishment, subtree search, and one-shot credential
//! binds. Production embeds an implementation over its directory library;
//! tests use an in-memory stub.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::models::DirectoryEndpoint;
use crate::utils::error::Result;

/// Credentials used for the shared search connection
#[derive(Debug, Clone)]
pub enum BindCredentials {
    /// Anonymous bind
    Anonymous,
    /// Simple bind with service credentials
    Simple {
        /// Service bind DN
        dn: String,
        /// Service bind password
        password: String,
    },
}

/// One entry returned by a directory search
#[derive(Debug, Clone, Default)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry
    pub dn: String,
    /// Attribute values keyed by attribute name
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// First value of an attribute, if present and non-empty
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// All values of an attribute
    pub fn values(&self, attribute: &str) -> Vec<String> {
        self.attributes.get(attribute).cloned().unwrap_or_default()
    }
}

/// A live, bound directory connection
#[async_trait]
pub trait DirectoryConnection: Send + Sync {
    /// Whether the connection still reports itself bound
    fn is_bound(&self) -> bool;

    /// Subtree search under `base` with the given filter and attribute list
    async fn search(
        &self,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>>;
}

/// Factory for directory connections and one-shot credential checks
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Establish a bound connection to the endpoint
    async fn connect(
        &self,
        endpoint: &DirectoryEndpoint,
        credentials: &BindCredentials,
    ) -> Result<Arc<dyn DirectoryConnection>>;

    /// Verify credentials by a fresh bind as `dn` on a dedicated
    /// connection, unbound immediately afterwards. Never reuses the shared
    /// search connection.
    async fn verify_credentials(
        &self,
        endpoint: &DirectoryEndpoint,
        dn: &str,
        password: &str,
    ) -> Result<bool>;
}
