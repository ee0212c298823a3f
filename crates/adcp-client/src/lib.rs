//! AdCP Client - task execution against AdCP agents
//!
//! Provides the uniform seam the conformance harness drives:
//! - `TaskExecutor`: introspection plus "execute named operation"
//! - Typed operation markers and lenient response payloads
//! - MCP and A2A transports over HTTP
//! - In-memory fakes for tests

pub mod config;
pub mod error;
pub mod fakes;
pub mod operations;
pub mod task;
pub mod transport;
pub mod types;

// Re-export key types
pub use config::{ClientOptions, Protocol, DRY_RUN_HEADER, SESSION_HEADER};
pub use error::{ClientError, Result};
pub use task::{AgentInfo, Operation, TaskExecutor, TaskExecutorExt, TaskResult, ToolInfo};
pub use transport::{connect, A2aClient, ClientFactory, HttpClientFactory, McpClient};
