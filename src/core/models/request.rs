//! Per-request context carried into audit records

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context describing the inbound request that triggered an operation.
/// Built by the route layer; the core only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Request identifier for log correlation
    pub request_id: Uuid,
    /// Originating network address, if known
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Client descriptor (user agent), if known
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Create an empty context with a fresh request id
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            ip_address: None,
            user_agent: None,
        }
    }

    /// Set the peer address
    pub fn with_peer(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Set the client descriptor
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
