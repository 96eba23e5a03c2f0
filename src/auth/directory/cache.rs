//! Directory connection cache
//!
//! At most one live, bound search connection per endpoint key. Entries
//! expire after a TTL and are evicted early when the connection no longer
//! reports itself bound. Creation is serialized per key, so concurrent
//! callers never race to open duplicate connections to the same endpoint,
//! and unrelated endpoints never contend with each other.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::client::{BindCredentials, DirectoryConnection, DirectoryConnector};
use crate::config::models::{DirectoryConfig, DirectoryEndpoint};
use crate::utils::error::{AuthError, Result};

/// Bounded, TTL-based cache of bound directory connections
pub struct ConnectionCache {
    connector: Arc<dyn DirectoryConnector>,
    credentials: BindCredentials,
    connect_timeout: Duration,
    connect_attempts: u32,
    retry_delay: Duration,
    connections: moka::future::Cache<String, Arc<dyn DirectoryConnection>>,
}

impl ConnectionCache {
    /// Create a cache sized and timed from the directory configuration
    pub fn new(connector: Arc<dyn DirectoryConnector>, config: &DirectoryConfig) -> Self {
        let credentials = match (&config.bind_dn, &config.bind_password) {
            (Some(dn), Some(password)) => BindCredentials::Simple {
                dn: dn.clone(),
                password: password.clone(),
            },
            _ => BindCredentials::Anonymous,
        };

        let connections = moka::future::Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl())
            .build();

        Self {
            connector,
            credentials,
            connect_timeout: config.timeout(),
            connect_attempts: config.connect_attempts,
            retry_delay: config.retry_delay(),
            connections,
        }
    }

    /// Return the cached connection for the endpoint, establishing one if
    /// absent, expired, or no longer bound.
    pub async fn get(&self, endpoint: &DirectoryEndpoint) -> Result<Arc<dyn DirectoryConnection>> {
        let key = endpoint.key();

        let conn = self
            .connections
            .try_get_with(key.clone(), self.establish(endpoint))
            .await
            .map_err(unwrap_shared)?;

        if conn.is_bound() {
            return Ok(conn);
        }

        // Stale entry: evict and build a fresh connection.
        debug!(endpoint = %endpoint, "evicting unbound cached connection");
        self.connections.invalidate(&key).await;
        self.connections
            .try_get_with(key, self.establish(endpoint))
            .await
            .map_err(unwrap_shared)
    }

    /// Drop the cached connection for an endpoint, e.g. after a timeout
    /// left it in an indeterminate state.
    pub async fn discard(&self, endpoint: &DirectoryEndpoint) {
        self.connections.invalidate(&endpoint.key()).await;
    }

    /// Establish a bound connection, retrying transient failures a bounded
    /// number of times with a short delay.
    async fn establish(&self, endpoint: &DirectoryEndpoint) -> Result<Arc<dyn DirectoryConnection>> {
        let mut last_error = AuthError::directory("no connect attempt made");

        for attempt in 1..=self.connect_attempts {
            match timeout(
                self.connect_timeout,
                self.connector.connect(endpoint, &self.credentials),
            )
            .await
            {
                Ok(Ok(conn)) if conn.is_bound() => {
                    debug!(endpoint = %endpoint, attempt, "directory connection established");
                    return Ok(conn);
                }
                Ok(Ok(_)) => {
                    last_error = AuthError::directory(format!(
                        "connection to {} did not bind",
                        endpoint
                    ));
                }
                Ok(Err(e)) => last_error = e,
                Err(_) => last_error = AuthError::DirectoryTimeout(self.connect_timeout),
            }

            if attempt < self.connect_attempts {
                warn!(
                    endpoint = %endpoint,
                    attempt,
                    error = %last_error,
                    "directory connect failed, retrying"
                );
                sleep(self.retry_delay).await;
            }
        }

        Err(last_error)
    }
}

/// moka shares one error among concurrent waiters; detach it into an owned
/// error for our `Result`.
fn unwrap_shared(shared: Arc<AuthError>) -> AuthError {
    match Arc::try_unwrap(shared) {
        Ok(err) => err,
        Err(shared) => AuthError::directory(shared.to_string()),
    }
}
