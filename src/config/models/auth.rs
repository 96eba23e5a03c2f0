//! Authentication configuration

use serde::{Deserialize, Serialize};

use super::directory::DirectoryConfig;
use crate::utils::error::{AuthError, Result};

/// Which authenticator handles inbound login attempts.
///
/// The reserved admin account always authenticates locally regardless of the
/// configured mode; that rule is a deliberate security backstop, not a
/// fallback. There is never a silent downgrade from directory to local mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Verify credentials against stored salted hashes
    #[default]
    Local,
    /// Verify credentials against the external directory (LDAP/AD)
    Directory,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Active authentication mode
    #[serde(default)]
    pub mode: AuthMode,
    /// Hard bound on role-hierarchy traversal depth
    #[serde(default = "default_max_role_depth")]
    pub max_role_depth: usize,
    /// Directory (LDAP/AD) settings
    #[serde(default)]
    pub directory: DirectoryConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            max_role_depth: default_max_role_depth(),
            directory: DirectoryConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Load authentication configuration from environment variables.
    ///
    /// `CERTWATCH_AUTH_MODE` selects the mode (`local` or `directory`);
    /// directory settings come from the `LDAP_*` variables.
    pub fn from_env() -> Result<Self> {
        let mode = match std::env::var("CERTWATCH_AUTH_MODE") {
            Ok(value) => match value.to_lowercase().as_str() {
                "local" => AuthMode::Local,
                "directory" | "ldap" => AuthMode::Directory,
                other => {
                    return Err(AuthError::Config(format!(
                        "Unknown auth mode '{}' (expected 'local' or 'directory')",
                        other
                    )));
                }
            },
            Err(_) => AuthMode::default(),
        };

        Ok(Self {
            mode,
            max_role_depth: default_max_role_depth(),
            directory: DirectoryConfig::from_env()?,
        })
    }
}

fn default_max_role_depth() -> usize {
    32
}
