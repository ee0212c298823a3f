//! In-memory fakes for the task execution seam (testing only)
//!
//! `ScriptedAgent` answers each operation with a closure over the request
//! params and records every call, so tests can drive scenarios without a
//! network. `ScriptedAgentFactory` hands out clones of one scripted agent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ClientOptions;
use crate::error::{ClientError, Result};
use crate::task::{AgentInfo, TaskExecutor, TaskResult, ToolInfo};
use crate::transport::ClientFactory;

type Handler = Arc<dyn Fn(&Value) -> Result<TaskResult<Value>> + Send + Sync>;

/// One recorded `execute_task` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: String,
    pub params: Value,
}

/// Scriptable in-memory agent.
///
/// Clones share the handler table and the call log.
#[derive(Clone, Default)]
pub struct ScriptedAgent {
    name: String,
    tools: Vec<String>,
    handlers: HashMap<String, Handler>,
    introspection_error: Option<String>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedAgent {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Advertise an operation answered by `handler`.
    pub fn with_tool<F>(mut self, operation: &str, handler: F) -> Self
    where
        F: Fn(&Value) -> TaskResult<Value> + Send + Sync + 'static,
    {
        self.advertise(operation);
        self.handlers
            .insert(operation.to_string(), Arc::new(move |params: &Value| Ok(handler(params))));
        self
    }

    /// Advertise an operation that always succeeds with `payload`.
    pub fn with_success(self, operation: &str, payload: Value) -> Self {
        self.with_tool(operation, move |_| TaskResult::Success(payload.clone()))
    }

    /// Advertise an operation that always reports `error`.
    pub fn with_failure(self, operation: &str, error: &str) -> Self {
        let error = error.to_string();
        self.with_tool(operation, move |_| TaskResult::failure(error.clone()))
    }

    /// Advertise an operation whose calls raise a transport error.
    pub fn with_transport_error(mut self, operation: &str, message: &str) -> Self {
        self.advertise(operation);
        let message = message.to_string();
        self.handlers.insert(
            operation.to_string(),
            Arc::new(move |_: &Value| Err(ClientError::Transport(message.clone()))),
        );
        self
    }

    /// Make introspection fail with a transport error.
    pub fn with_introspection_error(mut self, message: &str) -> Self {
        self.introspection_error = Some(message.to_string());
        self
    }

    fn advertise(&mut self, operation: &str) {
        if !self.tools.iter().any(|t| t == operation) {
            self.tools.push(operation.to_string());
        }
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Params of every call to `operation`, in order.
    pub fn calls_to(&self, operation: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation)
            .map(|c| c.params.clone())
            .collect()
    }
}

#[async_trait]
impl TaskExecutor for ScriptedAgent {
    async fn get_agent_info(&self) -> Result<AgentInfo> {
        if let Some(message) = &self.introspection_error {
            return Err(ClientError::Transport(message.clone()));
        }
        Ok(AgentInfo {
            name: self.name.clone(),
            tools: self.tools.iter().map(ToolInfo::named).collect(),
        })
    }

    async fn execute_task(&self, operation: &str, params: Value) -> Result<TaskResult<Value>> {
        self.calls.lock().unwrap().push(RecordedCall {
            operation: operation.to_string(),
            params: params.clone(),
        });
        match self.handlers.get(operation) {
            Some(handler) => handler(&params),
            None => Ok(TaskResult::failure(format!("Unknown tool: {}", operation))),
        }
    }
}

/// Factory that hands out clones of one scripted agent and counts connections.
pub struct ScriptedAgentFactory {
    agent: ScriptedAgent,
    connections: AtomicUsize,
    last_options: Mutex<Option<ClientOptions>>,
}

impl ScriptedAgentFactory {
    pub fn new(agent: ScriptedAgent) -> Self {
        Self {
            agent,
            connections: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        }
    }

    pub fn agent(&self) -> &ScriptedAgent {
        &self.agent
    }

    /// Number of clients created so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Options passed to the most recent `connect`.
    pub fn last_options(&self) -> Option<ClientOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

impl ClientFactory for ScriptedAgentFactory {
    fn connect(&self, _agent_url: &str, options: &ClientOptions) -> Result<Arc<dyn TaskExecutor>> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());
        Ok(Arc::new(self.agent.clone()))
    }
}
