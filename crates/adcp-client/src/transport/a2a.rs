//! A2A transport
//!
//! Introspection reads the agent card; each operation is sent as a
//! `message/send` whose single data part names the skill and its input.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::mcp::error_message;
use super::{build_http_client, parse_rpc_reply, read_json_body, JsonRpcRequest, RpcReply};
use crate::config::ClientOptions;
use crate::error::{ClientError, Result};
use crate::task::{AgentInfo, TaskExecutor, TaskResult, ToolInfo};

const AGENT_CARD_PATHS: [&str; 2] = ["/.well-known/agent-card.json", "/.well-known/agent.json"];

/// Client for an agent exposing its operations as A2A skills.
pub struct A2aClient {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
    message_prefix: String,
}

#[derive(Debug, Deserialize)]
struct AgentCard {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    skills: Vec<AgentSkill>,
}

#[derive(Debug, Deserialize)]
struct AgentSkill {
    id: String,
    #[serde(default)]
    description: Option<String>,
}

impl A2aClient {
    pub fn new(endpoint: &str, options: &ClientOptions) -> Result<Self> {
        Ok(A2aClient {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: build_http_client(options)?,
            next_id: AtomicU64::new(1),
            message_prefix: options
                .session_id
                .clone()
                .unwrap_or_else(|| "adcp-client".to_string()),
        })
    }

    async fn fetch_agent_card(&self) -> Result<AgentCard> {
        let mut last_err = None;
        for path in AGENT_CARD_PATHS {
            let url = format!("{}{}", self.endpoint, path);
            match self.http.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    let body = read_json_body(response).await?;
                    return Ok(serde_json::from_value(body)?);
                }
                Ok(response) => {
                    last_err = Some(ClientError::Http {
                        status: response.status().as_u16(),
                        body: format!("no agent card at {}", url),
                    });
                }
                Err(e) => last_err = Some(e.into()),
            }
        }
        Err(last_err
            .unwrap_or_else(|| ClientError::Protocol("agent card lookup failed".to_string())))
    }
}

/// First `data` part in a list of A2A parts.
fn first_data_part(parts: &Value) -> Option<Value> {
    parts.as_array()?.iter().find_map(|part| {
        let kind = part.get("kind").or_else(|| part.get("type"));
        if kind.and_then(Value::as_str) == Some("data") {
            part.get("data").cloned()
        } else {
            None
        }
    })
}

fn first_text_part(parts: &Value) -> Option<String> {
    parts.as_array()?.iter().find_map(|part| {
        part.get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

/// Map a `message/send` result (task or message) onto a task result.
fn send_outcome(result: Value) -> Result<TaskResult<Value>> {
    let state = result
        .pointer("/status/state")
        .and_then(Value::as_str)
        .unwrap_or("completed");

    let payload = result
        .get("artifacts")
        .and_then(Value::as_array)
        .and_then(|artifacts| {
            artifacts
                .iter()
                .find_map(|a| a.get("parts").and_then(first_data_part))
        })
        .or_else(|| result.get("parts").and_then(first_data_part));

    if matches!(state, "failed" | "rejected" | "canceled") {
        let message = payload
            .as_ref()
            .and_then(error_message)
            .or_else(|| {
                result
                    .pointer("/status/message/parts")
                    .and_then(first_text_part)
            })
            .unwrap_or_else(|| format!("task {}", state));
        return Ok(TaskResult::Failure { error: message });
    }

    match payload {
        Some(data) => Ok(TaskResult::Success(data)),
        None => Err(ClientError::Protocol(format!(
            "A2A response in state {} carried no data part",
            state
        ))),
    }
}

#[async_trait]
impl TaskExecutor for A2aClient {
    async fn get_agent_info(&self) -> Result<AgentInfo> {
        let card = self.fetch_agent_card().await?;
        Ok(AgentInfo {
            name: card.name.unwrap_or_else(|| self.endpoint.clone()),
            tools: card
                .skills
                .into_iter()
                .map(|s| ToolInfo {
                    name: s.id,
                    description: s.description,
                })
                .collect(),
        })
    }

    async fn execute_task(&self, operation: &str, params: Value) -> Result<TaskResult<Value>> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!(operation = %operation, id = id, "A2A message/send");
        let send = json!({
            "message": {
                "messageId": format!("{}-{}", self.message_prefix, id),
                "role": "user",
                "kind": "message",
                "parts": [{
                    "kind": "data",
                    "data": { "skill": operation, "input": params },
                }],
            }
        });
        let body = read_json_body(
            self.http
                .post(&self.endpoint)
                .json(&JsonRpcRequest::call(id, "message/send", send))
                .send()
                .await?,
        )
        .await?;
        match parse_rpc_reply(body)? {
            RpcReply::Result(result) => send_outcome(result),
            RpcReply::Error(message) => Ok(TaskResult::Failure { error: message }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_task_artifact_payload() {
        let outcome = send_outcome(json!({
            "kind": "task",
            "status": { "state": "completed" },
            "artifacts": [{ "parts": [
                { "kind": "text", "text": "done" },
                { "kind": "data", "data": { "media_buy_id": "mb-9" } }
            ]}]
        }))
        .expect("outcome");
        assert_eq!(outcome.data().unwrap()["media_buy_id"], "mb-9");
    }

    #[test]
    fn test_direct_message_payload() {
        let outcome = send_outcome(json!({
            "kind": "message",
            "parts": [{ "kind": "data", "data": { "signals": [] } }]
        }))
        .expect("outcome");
        assert!(outcome.is_success());
    }

    #[test]
    fn test_failed_task_is_failure() {
        let outcome = send_outcome(json!({
            "kind": "task",
            "status": {
                "state": "failed",
                "message": { "parts": [{ "kind": "text", "text": "end_time before start_time" }] }
            }
        }))
        .expect("outcome");
        assert_eq!(outcome.error(), Some("end_time before start_time"));
    }

    #[test]
    fn test_missing_data_part_is_protocol_error() {
        let err = send_outcome(json!({
            "kind": "task",
            "status": { "state": "completed" },
            "artifacts": [{ "parts": [{ "kind": "text", "text": "ok" }] }]
        }))
        .unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }
}
