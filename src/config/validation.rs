//! Configuration validation

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::models::{AuthConfig, DirectoryConfig};
use crate::utils::error::{AuthError, Result};

/// Validate a configuration section before use
pub trait Validate {
    /// Return an error describing the first invalid field found
    fn validate(&self) -> Result<()>;
}

static SERVER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(ldaps?://)?[\w.-]+$").expect("static regex"));

impl Validate for AuthConfig {
    fn validate(&self) -> Result<()> {
        if self.max_role_depth == 0 {
            return Err(AuthError::Config(
                "max_role_depth must be at least 1".to_string(),
            ));
        }
        self.directory.validate()
    }
}

impl Validate for DirectoryConfig {
    fn validate(&self) -> Result<()> {
        if !SERVER_RE.is_match(&self.server) {
            return Err(AuthError::Config(format!(
                "Invalid directory server '{}'",
                self.server
            )));
        }
        if self.port == 0 {
            return Err(AuthError::Config(
                "directory port must be non-zero".to_string(),
            ));
        }
        if self.base_dn.trim().is_empty() {
            return Err(AuthError::Config("base_dn must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(AuthError::Config(
                "directory timeout must be non-zero".to_string(),
            ));
        }
        if self.connect_attempts == 0 {
            return Err(AuthError::Config(
                "connect_attempts must be at least 1".to_string(),
            ));
        }
        for (group, role) in &self.group_role_map {
            if role.trim().is_empty() {
                return Err(AuthError::Config(format!(
                    "group_role_map entry '{}' maps to an empty role name",
                    group
                )));
            }
        }
        Ok(())
    }
}
