//! Directory (LDAP/AD) configuration
//!
//! Directory attribute names vary across directory products, so every name
//! used in search or mapping lives here and is resolved once at startup;
//! none are hard-coded in the traversal logic.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::utils::error::{AuthError, Result};

/// A directory endpoint (server + port), the key of the connection cache
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryEndpoint {
    /// Host name or address, without scheme
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl DirectoryEndpoint {
    /// Cache key for this endpoint
    pub fn key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for DirectoryEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Directory attribute names, resolved once from configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryAttributes {
    /// Attribute holding the login name
    #[serde(default = "default_username_attr")]
    pub username: String,
    /// Attribute holding the email address
    #[serde(default = "default_email_attr")]
    pub email: String,
    /// Attribute holding the display name
    #[serde(default = "default_name_attr")]
    pub display_name: String,
    /// Attribute listing group memberships
    #[serde(default = "default_group_attr")]
    pub groups: String,
    /// Attribute holding the department
    #[serde(default = "default_department_attr")]
    pub department: String,
    /// Attribute holding the job title
    #[serde(default = "default_title_attr")]
    pub title: String,
    /// Attribute holding the phone number
    #[serde(default = "default_phone_attr")]
    pub phone: String,
    /// Attribute carrying the account-control bitmask (AD); optional in
    /// other directory products
    #[serde(default = "default_account_control_attr")]
    pub account_control: String,
}

impl Default for DirectoryAttributes {
    fn default() -> Self {
        Self {
            username: default_username_attr(),
            email: default_email_attr(),
            display_name: default_name_attr(),
            groups: default_group_attr(),
            department: default_department_attr(),
            title: default_title_attr(),
            phone: default_phone_attr(),
            account_control: default_account_control_attr(),
        }
    }
}

impl DirectoryAttributes {
    /// Full attribute list requested on the user search
    pub fn search_list(&self) -> Vec<String> {
        vec![
            self.username.clone(),
            self.email.clone(),
            self.display_name.clone(),
            self.groups.clone(),
            self.department.clone(),
            self.title.clone(),
            self.phone.clone(),
            self.account_control.clone(),
        ]
    }
}

/// Directory server and synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Server host; an `ldap://` / `ldaps://` prefix is tolerated and stripped
    #[serde(default = "default_server")]
    pub server: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Search base DN
    #[serde(default = "default_base_dn")]
    pub base_dn: String,
    /// User subtree, prepended to the base DN for user searches
    #[serde(default = "default_user_dn")]
    pub user_dn: String,
    /// Optional service bind DN; anonymous bind when absent
    #[serde(default)]
    pub bind_dn: Option<String>,
    /// Service bind password
    #[serde(default)]
    pub bind_password: Option<String>,
    /// Attribute names
    #[serde(default)]
    pub attributes: DirectoryAttributes,
    /// Timeout for each directory call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// TTL of cached connections, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Maximum number of cached connections
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Total connect attempts before giving up
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    /// Delay between connect attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Minimum interval between directory re-synchronizations of one user,
    /// in seconds
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// Domain used to synthesize an email when the directory has none
    #[serde(default = "default_email_domain")]
    pub default_email_domain: String,
    /// Static mapping of directory group DN to local role name
    #[serde(default)]
    pub group_role_map: HashMap<String, String>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            base_dn: default_base_dn(),
            user_dn: default_user_dn(),
            bind_dn: None,
            bind_password: None,
            attributes: DirectoryAttributes::default(),
            timeout_secs: default_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            connect_attempts: default_connect_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            sync_interval_secs: default_sync_interval_secs(),
            default_email_domain: default_email_domain(),
            group_role_map: HashMap::new(),
        }
    }
}

impl DirectoryConfig {
    /// Load directory settings from `LDAP_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(server) = std::env::var("LDAP_SERVER") {
            config.server = server;
        }
        if let Ok(port) = std::env::var("LDAP_PORT") {
            config.port = port
                .parse()
                .map_err(|_| AuthError::Config(format!("Invalid LDAP_PORT: {}", port)))?;
        }
        if let Ok(base_dn) = std::env::var("LDAP_BASE_DN") {
            config.base_dn = base_dn;
        }
        if let Ok(user_dn) = std::env::var("LDAP_USER_DN") {
            config.user_dn = user_dn;
        }
        if let Ok(bind_dn) = std::env::var("LDAP_BIND_DN") {
            if !bind_dn.is_empty() {
                config.bind_dn = Some(bind_dn);
            }
        }
        if let Ok(bind_password) = std::env::var("LDAP_BIND_PASSWORD") {
            if !bind_password.is_empty() {
                config.bind_password = Some(bind_password);
            }
        }
        if let Ok(attr) = std::env::var("LDAP_USER_ATTR") {
            config.attributes.username = attr;
        }
        if let Ok(attr) = std::env::var("LDAP_EMAIL_ATTR") {
            config.attributes.email = attr;
        }
        if let Ok(attr) = std::env::var("LDAP_NAME_ATTR") {
            config.attributes.display_name = attr;
        }
        if let Ok(attr) = std::env::var("LDAP_GROUP_ATTR") {
            config.attributes.groups = attr;
        }
        if let Ok(timeout) = std::env::var("LDAP_TIMEOUT") {
            config.timeout_secs = timeout
                .parse()
                .map_err(|_| AuthError::Config(format!("Invalid LDAP_TIMEOUT: {}", timeout)))?;
        }

        Ok(config)
    }

    /// The endpoint this configuration points at, scheme stripped
    pub fn endpoint(&self) -> DirectoryEndpoint {
        let host = self
            .server
            .strip_prefix("ldaps://")
            .or_else(|| self.server.strip_prefix("ldap://"))
            .unwrap_or(&self.server);
        DirectoryEndpoint {
            host: host.to_string(),
            port: self.port,
        }
    }

    /// Search base for user entries: `<user_dn>,<base_dn>`
    pub fn search_base(&self) -> String {
        format!("{},{}", self.user_dn, self.base_dn)
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Cached-connection TTL
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Delay between connect attempts
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Synchronization throttle interval
    pub fn sync_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.sync_interval_secs as i64)
    }
}

fn default_server() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    389
}

fn default_base_dn() -> String {
    "dc=example,dc=com".to_string()
}

fn default_user_dn() -> String {
    "ou=usuarios".to_string()
}

fn default_username_attr() -> String {
    "sAMAccountName".to_string()
}

fn default_email_attr() -> String {
    "mail".to_string()
}

fn default_name_attr() -> String {
    "displayName".to_string()
}

fn default_group_attr() -> String {
    "memberOf".to_string()
}

fn default_department_attr() -> String {
    "department".to_string()
}

fn default_title_attr() -> String {
    "title".to_string()
}

fn default_phone_attr() -> String {
    "telephoneNumber".to_string()
}

fn default_account_control_attr() -> String {
    "userAccountControl".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_capacity() -> u64 {
    16
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_sync_interval_secs() -> u64 {
    3600
}

fn default_email_domain() -> String {
    "example.com".to_string()
}
