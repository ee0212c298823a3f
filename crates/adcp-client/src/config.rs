//! Client configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ClientError;

/// Header carrying the dry-run flag.
pub const DRY_RUN_HEADER: &str = "X-Dry-Run";

/// Header correlating every request of one test session.
pub const SESSION_HEADER: &str = "X-Test-Session-ID";

/// Wire transport spoken by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// MCP JSON-RPC over streamable HTTP
    Mcp,
    /// A2A JSON-RPC over HTTP
    A2a,
}

impl Protocol {
    /// Guess the transport from the agent URL: a path ending in `/mcp` is MCP,
    /// anything else is treated as A2A.
    pub fn detect(agent_url: &str) -> Self {
        let path = agent_url
            .split(['?', '#'])
            .next()
            .unwrap_or(agent_url)
            .trim_end_matches('/');
        if path.ends_with("/mcp") {
            Protocol::Mcp
        } else {
            Protocol::A2a
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Mcp => "mcp",
            Protocol::A2a => "a2a",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mcp" => Ok(Protocol::Mcp),
            "a2a" => Ok(Protocol::A2a),
            other => Err(ClientError::Config(format!("unknown protocol: {}", other))),
        }
    }
}

/// Construction-time options honoured by every transport.
#[derive(Clone)]
pub struct ClientOptions {
    /// Transport; `None` means detect from the URL
    pub protocol: Option<Protocol>,
    /// Ask the agent to simulate mutations
    pub dry_run: bool,
    /// Session correlation id sent with each request
    pub session_id: Option<String>,
    /// Bearer credential
    pub auth_token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            protocol: None,
            dry_run: true,
            session_id: None,
            auth_token: None,
            timeout: Duration::from_secs(60),
            user_agent: format!("adcp-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientOptions {
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the transport for an agent URL.
    pub fn protocol_for(&self, agent_url: &str) -> Protocol {
        self.protocol.unwrap_or_else(|| Protocol::detect(agent_url))
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("protocol", &self.protocol)
            .field("dry_run", &self.dry_run)
            .field("session_id", &self.session_id)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
