//! MCP transport
//!
//! JSON-RPC over streamable HTTP. An `initialize` handshake runs lazily before
//! the first request; a server-issued `Mcp-Session-Id` is echoed afterwards.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{build_http_client, parse_rpc_reply, read_json_body, JsonRpcRequest, RpcReply};
use crate::config::ClientOptions;
use crate::error::{ClientError, Result};
use crate::task::{AgentInfo, TaskExecutor, TaskResult, ToolInfo};

const MCP_PROTOCOL_VERSION: &str = "2025-03-26";
const MCP_SESSION_HEADER: &str = "mcp-session-id";

/// Client for an agent exposing its operations as MCP tools.
pub struct McpClient {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
    /// Server session id (if any) plus the advertised server name.
    handshake: OnceCell<Handshake>,
}

#[derive(Debug, Clone)]
struct Handshake {
    session_id: Option<String>,
    server_name: Option<String>,
}

impl McpClient {
    pub fn new(endpoint: &str, options: &ClientOptions) -> Result<Self> {
        Ok(McpClient {
            endpoint: endpoint.to_string(),
            http: build_http_client(options)?,
            next_id: AtomicU64::new(1),
            handshake: OnceCell::new(),
        })
    }

    async fn handshake(&self) -> Result<&Handshake> {
        self.handshake
            .get_or_try_init(|| async {
                let params = json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "adcp-client",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                });
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let response = self
                    .http
                    .post(&self.endpoint)
                    .json(&JsonRpcRequest::call(id, "initialize", params))
                    .send()
                    .await?;
                let session_id = response
                    .headers()
                    .get(MCP_SESSION_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let body = read_json_body(response).await?;
                let server_name = match parse_rpc_reply(body)? {
                    RpcReply::Result(result) => result
                        .pointer("/serverInfo/name")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    RpcReply::Error(message) => {
                        return Err(ClientError::Protocol(format!(
                            "initialize rejected: {}",
                            message
                        )))
                    }
                };

                let handshake = Handshake {
                    session_id,
                    server_name,
                };
                let mut notify = self
                    .http
                    .post(&self.endpoint)
                    .json(&JsonRpcRequest::notification("notifications/initialized"));
                if let Some(sid) = &handshake.session_id {
                    notify = notify.header(MCP_SESSION_HEADER, sid);
                }
                if let Err(e) = notify.send().await {
                    warn!(error = %e, "MCP initialized notification failed");
                }
                debug!(endpoint = %self.endpoint, session = ?handshake.session_id, "MCP handshake complete");
                Ok(handshake)
            })
            .await
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<RpcReply> {
        let handshake = self.handshake().await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&JsonRpcRequest::call(id, method, params));
        if let Some(sid) = &handshake.session_id {
            request = request.header(MCP_SESSION_HEADER, sid);
        }
        let body = read_json_body(request.send().await?).await?;
        parse_rpc_reply(body)
    }
}

/// Map a `tools/call` result onto a task result.
fn tool_call_outcome(result: Value) -> Result<TaskResult<Value>> {
    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let structured = result
        .get("structuredContent")
        .filter(|v| !v.is_null())
        .cloned();
    let text = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|parts| {
            parts
                .iter()
                .find(|p| p.get("type").and_then(Value::as_str) == Some("text"))
        })
        .and_then(|p| p.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if is_error {
        let message = structured
            .as_ref()
            .and_then(error_message)
            .or(text)
            .unwrap_or_else(|| "tool call reported an error".to_string());
        return Ok(TaskResult::Failure { error: message });
    }

    if let Some(payload) = structured {
        return Ok(TaskResult::Success(payload));
    }
    match text {
        Some(text) => match serde_json::from_str::<Value>(&text) {
            Ok(payload) => Ok(TaskResult::Success(payload)),
            Err(_) => Err(ClientError::Protocol(format!(
                "tool result text is not JSON: {}",
                super::truncate(&text, 200)
            ))),
        },
        None => Err(ClientError::Protocol(
            "tool result has neither structuredContent nor text content".to_string(),
        )),
    }
}

/// Pull a human-readable message out of an error payload.
pub(crate) fn error_message(payload: &Value) -> Option<String> {
    if let Some(s) = payload.get("error").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    if let Some(s) = payload.pointer("/error/message").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    payload
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errs| errs.first())
        .and_then(|e| e.get("message").and_then(Value::as_str).or_else(|| e.as_str()))
        .map(str::to_string)
}

#[async_trait]
impl TaskExecutor for McpClient {
    async fn get_agent_info(&self) -> Result<AgentInfo> {
        let result = match self.rpc("tools/list", json!({})).await? {
            RpcReply::Result(result) => result,
            RpcReply::Error(message) => {
                return Err(ClientError::Protocol(format!("tools/list failed: {}", message)))
            }
        };
        let tools: Vec<ToolInfo> = match result.get("tools") {
            Some(tools) => serde_json::from_value(tools.clone())?,
            None => {
                return Err(ClientError::Protocol(
                    "tools/list result has no tools array".to_string(),
                ))
            }
        };
        let name = self
            .handshake()
            .await?
            .server_name
            .clone()
            .unwrap_or_else(|| self.endpoint.clone());
        Ok(AgentInfo { name, tools })
    }

    async fn execute_task(&self, operation: &str, params: Value) -> Result<TaskResult<Value>> {
        debug!(operation = %operation, "MCP tools/call");
        let call = json!({ "name": operation, "arguments": params });
        match self.rpc("tools/call", call).await? {
            RpcReply::Result(result) => tool_call_outcome(result),
            RpcReply::Error(message) => Ok(TaskResult::Failure { error: message }),
        }
    }
}
