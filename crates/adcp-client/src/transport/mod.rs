//! Wire transports
//!
//! Both transports are JSON-RPC 2.0 over HTTP POST; they differ in method
//! names and in where the operation payload lives in the envelope.
//! Request headers (bearer credential, dry-run flag, session id) are
//! installed once as client defaults so every request carries them.

pub mod a2a;
pub mod mcp;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::config::{ClientOptions, Protocol, DRY_RUN_HEADER, SESSION_HEADER};
use crate::error::{ClientError, Result};
use crate::task::TaskExecutor;

pub use a2a::A2aClient;
pub use mcp::McpClient;

/// Builds an isolated client for one agent.
///
/// The harness asks for a fresh client per scenario so connection and
/// session state never leak between scenarios.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, agent_url: &str, options: &ClientOptions) -> Result<Arc<dyn TaskExecutor>>;
}

/// Factory producing real HTTP clients for the detected or hinted transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn connect(&self, agent_url: &str, options: &ClientOptions) -> Result<Arc<dyn TaskExecutor>> {
        connect(agent_url, options)
    }
}

/// Create a client for `agent_url` speaking the resolved protocol.
pub fn connect(agent_url: &str, options: &ClientOptions) -> Result<Arc<dyn TaskExecutor>> {
    let protocol = options.protocol_for(agent_url);
    debug!(agent_url = %agent_url, protocol = %protocol, "Connecting to agent");
    Ok(match protocol {
        Protocol::Mcp => Arc::new(McpClient::new(agent_url, options)?),
        Protocol::A2a => Arc::new(A2aClient::new(agent_url, options)?),
    })
}

/// Build a reqwest client with the per-session default headers.
pub(crate) fn build_http_client(options: &ClientOptions) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/event-stream"),
    );
    headers.insert(
        header_name(DRY_RUN_HEADER)?,
        HeaderValue::from_static(if options.dry_run { "true" } else { "false" }),
    );
    if let Some(session_id) = &options.session_id {
        headers.insert(
            header_name(SESSION_HEADER)?,
            header_value(SESSION_HEADER, session_id)?,
        );
    }
    if let Some(token) = &options.auth_token {
        let mut value = header_value("Authorization", &format!("Bearer {}", token))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    reqwest::Client::builder()
        .user_agent(options.user_agent.clone())
        .default_headers(headers)
        .timeout(options.timeout)
        .build()
        .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ClientError::Config(format!("invalid header name {}", name)))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ClientError::Config(format!("invalid value for header {}", name)))
}

/// JSON-RPC request envelope.
#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    params: Value,
}

impl<'a> JsonRpcRequest<'a> {
    pub(crate) fn call(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params,
        }
    }

    pub(crate) fn notification(method: &'a str) -> Self {
        Self {
            jsonrpc: "2.0",
            id: None,
            method,
            params: json!({}),
        }
    }
}

/// Decoded JSON-RPC response: either a result or an error message.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RpcReply {
    Result(Value),
    Error(String),
}

/// Extract result/error from a JSON-RPC response body.
pub(crate) fn parse_rpc_reply(body: Value) -> Result<RpcReply> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Ok(RpcReply::Error(message));
    }
    match body.get("result") {
        Some(result) => Ok(RpcReply::Result(result.clone())),
        None => Err(ClientError::Protocol(
            "JSON-RPC response carries neither result nor error".to_string(),
        )),
    }
}

/// Read a response body that may be plain JSON or a server-sent event
/// stream; for SSE the last `data:` line holding JSON wins.
///
/// A non-2xx response whose body is a JSON-RPC error envelope is returned
/// as-is so the agent's rejection reaches [`parse_rpc_reply`]; any other
/// non-2xx response is an HTTP error.
pub(crate) async fn read_json_body(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let is_sse = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("text/event-stream"))
        .unwrap_or(false);
    let text = response.text().await?;

    if !status.is_success() {
        return match decode_body(&text, is_sse) {
            Ok(body) if is_rpc_error(&body) => Ok(body),
            _ => Err(ClientError::Http {
                status: status.as_u16(),
                body: truncate(&text, 512),
            }),
        };
    }
    decode_body(&text, is_sse)
}

fn decode_body(text: &str, is_sse: bool) -> Result<Value> {
    if is_sse {
        text.lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .filter_map(|data| serde_json::from_str::<Value>(data.trim()).ok())
            .last()
            .ok_or_else(|| ClientError::Protocol("event stream carried no JSON data".to_string()))
    } else {
        Ok(serde_json::from_str(text)?)
    }
}

fn is_rpc_error(body: &Value) -> bool {
    body.get("error").is_some_and(|e| !e.is_null())
}

pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rpc_result() {
        let reply = parse_rpc_reply(json!({ "jsonrpc": "2.0", "id": 1, "result": { "ok": true } }))
            .expect("parse");
        assert_eq!(reply, RpcReply::Result(json!({ "ok": true })));
    }

    #[test]
    fn test_parse_rpc_error() {
        let reply = parse_rpc_reply(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "Invalid params" }
        }))
        .expect("parse");
        assert_eq!(reply, RpcReply::Error("Invalid params".to_string()));
    }

    #[test]
    fn test_parse_rpc_missing_both() {
        assert!(parse_rpc_reply(json!({ "jsonrpc": "2.0", "id": 1 })).is_err());
    }

    #[test]
    fn test_rpc_error_envelope_detection() {
        let envelope = decode_body(
            r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32602,"message":"bad"}}"#,
            false,
        )
        .expect("decode");
        assert!(is_rpc_error(&envelope));
        assert!(!is_rpc_error(&json!({ "jsonrpc": "2.0", "id": 2, "error": null })));
        assert!(decode_body("Bad Gateway", false).is_err());
    }

    #[test]
    fn test_decode_sse_takes_last_json_event() {
        let body = decode_body("event: message\ndata: {\"a\":1}\ndata: {\"a\":2}\n", true)
            .expect("decode");
        assert_eq!(body, json!({ "a": 2 }));
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let s = "ééééé";
        let t = truncate(s, 3);
        assert!(t.starts_with('é'));
        assert!(t.ends_with('…'));
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_notification_has_no_id() {
        let body = serde_json::to_value(JsonRpcRequest::notification("notifications/initialized"))
            .expect("serialize");
        assert!(body.get("id").is_none());
        assert_eq!(body["method"], "notifications/initialized");
    }

    #[test]
    fn test_build_http_client_rejects_bad_token() {
        let opts = ClientOptions::default().with_auth_token("bad\ntoken");
        assert!(matches!(build_http_client(&opts), Err(ClientError::Config(_))));
    }
}
