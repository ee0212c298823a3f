//! Task execution abstraction
//!
//! `TaskExecutor` is the single seam between the harness and an agent: one
//! introspection call and one uniform "execute a named operation" call. The
//! wire transport behind it is invisible to callers.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;

use crate::error::{ClientError, Result};

/// A single operation advertised by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ToolInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// Result of capability introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub tools: Vec<ToolInfo>,
}

impl AgentInfo {
    /// Operation names in advertised order.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }
}

/// Outcome of one task execution as reported by the agent.
///
/// `Failure` is a normal, expected value: adversarial probes rely on it.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult<T> {
    Success(T),
    Failure { error: String },
}

impl<T> TaskResult<T> {
    pub fn failure(error: impl Into<String>) -> Self {
        TaskResult::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            TaskResult::Success(data) => Some(data),
            TaskResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TaskResult::Success(_) => None,
            TaskResult::Failure { error } => Some(error),
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            TaskResult::Success(data) => Some(data),
            TaskResult::Failure { .. } => None,
        }
    }
}

impl TaskResult<Value> {
    /// Decode a success payload into an operation's typed response.
    pub fn decode<T: DeserializeOwned>(self, operation: &str) -> Result<TaskResult<T>> {
        match self {
            TaskResult::Success(value) => serde_json::from_value(value)
                .map(TaskResult::Success)
                .map_err(|source| ClientError::Decode {
                    operation: operation.to_string(),
                    source,
                }),
            TaskResult::Failure { error } => Ok(TaskResult::Failure { error }),
        }
    }
}

/// Executes protocol operations against one agent.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Capability introspection.
    async fn get_agent_info(&self) -> Result<AgentInfo>;

    /// Invoke a named operation with raw params.
    ///
    /// Returns `Err` only for transport or envelope problems; an agent-side
    /// rejection is `Ok(TaskResult::Failure { .. })`.
    async fn execute_task(&self, operation: &str, params: Value) -> Result<TaskResult<Value>>;
}

/// A protocol operation with a typed response payload.
pub trait Operation {
    const NAME: &'static str;
    type Response: DeserializeOwned + Send;
}

/// Typed convenience layer over [`TaskExecutor`].
pub trait TaskExecutorExt: TaskExecutor {
    fn call<Op: Operation>(
        &self,
        params: Value,
    ) -> impl Future<Output = Result<TaskResult<Op::Response>>> + Send {
        async move { self.execute_task(Op::NAME, params).await?.decode(Op::NAME) }
    }
}

impl<E: TaskExecutor + ?Sized> TaskExecutorExt for E {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        count: u32,
    }

    #[test]
    fn test_decode_success() {
        let raw: TaskResult<Value> = TaskResult::Success(json!({ "count": 3 }));
        let typed: TaskResult<Payload> = raw.decode("count_things").expect("decode");
        assert_eq!(typed.data(), Some(&Payload { count: 3 }));
    }

    #[test]
    fn test_decode_failure_passes_through() {
        let raw: TaskResult<Value> = TaskResult::failure("nope");
        let typed: TaskResult<Payload> = raw.decode("count_things").expect("decode");
        assert_eq!(typed.error(), Some("nope"));
        assert!(!typed.is_success());
    }

    #[test]
    fn test_decode_shape_mismatch() {
        let raw: TaskResult<Value> = TaskResult::Success(json!({ "count": "three" }));
        let err = raw.decode::<Payload>("count_things").unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[test]
    fn test_tool_names_preserve_order() {
        let info = AgentInfo {
            name: "agent".to_string(),
            tools: vec![ToolInfo::named("b"), ToolInfo::named("a")],
        };
        assert_eq!(info.tool_names(), vec!["b", "a"]);
    }
}
