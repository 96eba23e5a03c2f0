//! Local credential verification against stored salted hashes
//!
//! Every failure path (unknown user, wrong password, inactive or blocked
//! account, missing hash) collapses to one generic denial so the response
//! never reveals which check failed. The specific cause is logged
//! server-side. The reserved admin account is the one exception: its
//! account-status denial is distinguishable so the operator-facing message
//! can say "inactive or blocked" instead of "invalid credentials".

use std::sync::Arc;
use tracing::{debug, warn};

use super::DenyReason;
use crate::core::models::User;
use crate::storage::AuthStore;
use crate::utils::crypto::verify_password;
use crate::utils::error::Result;

/// Outcome of credential verification, before identity establishment
pub(crate) enum CredentialCheck {
    /// Credentials verified; the login may proceed
    Verified(Box<User>),
    /// Denied; the reason is generic by design
    Denied(DenyReason),
}

/// Verifies username/password pairs against the local store
#[derive(Clone)]
pub(crate) struct LocalAuthenticator {
    store: Arc<dyn AuthStore>,
}

impl LocalAuthenticator {
    pub(crate) fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    /// Verify a pre-normalized username and password.
    pub(crate) async fn verify(&self, username: &str, password: &str) -> Result<CredentialCheck> {
        let Some(user) = self.store.find_user(username).await? else {
            warn!(username, "login attempt for unknown user");
            return Ok(CredentialCheck::Denied(DenyReason::InvalidCredentials));
        };

        if !user.is_active() {
            warn!(username, status = ?user.status, "login attempt for non-active account");
            // Only the admin account's status denial is distinguishable.
            let reason = if user.is_admin() {
                DenyReason::AccountDisabled
            } else {
                DenyReason::InvalidCredentials
            };
            return Ok(CredentialCheck::Denied(reason));
        }

        let Some(hash) = user.password_hash.as_deref() else {
            // Directory-provisioned accounts carry no local hash.
            warn!(username, "local login attempt for account without password");
            return Ok(CredentialCheck::Denied(DenyReason::InvalidCredentials));
        };

        match verify_password(password, hash) {
            Ok(true) => {
                debug!(username, "local credentials verified");
                Ok(CredentialCheck::Verified(Box::new(user)))
            }
            Ok(false) => {
                warn!(username, "wrong password");
                Ok(CredentialCheck::Denied(DenyReason::InvalidCredentials))
            }
            Err(e) => {
                // A malformed stored hash is an operator problem, but the
                // caller still only sees a generic denial.
                warn!(username, error = %e, "password verification failed");
                Ok(CredentialCheck::Denied(DenyReason::InvalidCredentials))
            }
        }
    }
}
