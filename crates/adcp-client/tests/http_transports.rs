//! Integration tests for the MCP and A2A transports against a mock HTTP agent.

use adcp_client::operations::GetProducts;
use adcp_client::{connect, ClientError, ClientOptions, Protocol, TaskExecutor, TaskExecutorExt};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_mcp_initialize(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({ "method": "initialize" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("mcp-session-id", "sess-42")
                .set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": {
                        "protocolVersion": "2025-03-26",
                        "serverInfo": { "name": "Mock Sales Agent", "version": "1.0" },
                        "capabilities": { "tools": {} }
                    }
                })),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({ "method": "notifications/initialized" })))
        .respond_with(ResponseTemplate::new(202))
        .mount(server)
        .await;
}

/// Test: MCP introspection lists tools and uses the server name
#[tokio::test]
async fn test_mcp_tools_list() {
    let server = MockServer::start().await;
    mount_mcp_initialize(&server).await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({ "method": "tools/list" })))
        .and(header("mcp-session-id", "sess-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": { "tools": [
                { "name": "get_products", "description": "Discover products" },
                { "name": "create_media_buy" }
            ]}
        })))
        .mount(&server)
        .await;

    let url = format!("{}/mcp", server.uri());
    let client = connect(&url, &ClientOptions::default()).expect("connect");
    let info = client.get_agent_info().await.expect("agent info");

    assert_eq!(info.name, "Mock Sales Agent");
    assert_eq!(info.tool_names(), vec!["get_products", "create_media_buy"]);
}

/// Test: MCP tool calls carry dry-run, session and bearer headers
#[tokio::test]
async fn test_mcp_call_sends_headers_and_decodes() {
    let server = MockServer::start().await;
    mount_mcp_initialize(&server).await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({
            "method": "tools/call",
            "params": { "name": "get_products" }
        })))
        .and(header("x-dry-run", "true"))
        .and(header("x-test-session-id", "session-abc"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {
                "content": [{ "type": "text", "text": "1 product" }],
                "structuredContent": {
                    "products": [{ "product_id": "p1", "name": "Homepage takeover" }]
                }
            }
        })))
        .mount(&server)
        .await;

    let options = ClientOptions::default()
        .with_protocol(Protocol::Mcp)
        .with_session_id("session-abc")
        .with_auth_token("tok-123");
    let client = connect(&format!("{}/mcp", server.uri()), &options).expect("connect");
    let result = client
        .call::<GetProducts>(json!({ "brief": "sports fans" }))
        .await
        .expect("call");

    let products = result.into_data().expect("success").products;
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].product_id, "p1");
}

/// Test: MCP isError results surface as task failures, not client errors
#[tokio::test]
async fn test_mcp_tool_error_is_failure() {
    let server = MockServer::start().await;
    mount_mcp_initialize(&server).await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({ "method": "tools/call" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {
                "isError": true,
                "content": [{ "type": "text", "text": "budget must be positive" }]
            }
        })))
        .mount(&server)
        .await;

    let client = connect(&format!("{}/mcp", server.uri()), &ClientOptions::default())
        .expect("connect");
    let result = client
        .execute_task("create_media_buy", json!({ "budget": -500 }))
        .await
        .expect("execute");

    assert_eq!(result.error(), Some("budget must be positive"));
}

/// Test: HTTP 500 from the agent is a client error
#[tokio::test]
async fn test_mcp_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = connect(&format!("{}/mcp", server.uri()), &ClientOptions::default())
        .expect("connect");
    let err = client.get_agent_info().await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

/// Test: A2A introspection reads skills from the agent card
#[tokio::test]
async fn test_a2a_agent_card() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a2a/.well-known/agent-card.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Mock Signals Agent",
            "skills": [
                { "id": "get_signals", "description": "Find audiences" },
                { "id": "activate_signal" }
            ]
        })))
        .mount(&server)
        .await;

    let client = connect(&format!("{}/a2a", server.uri()), &ClientOptions::default())
        .expect("connect");
    let info = client.get_agent_info().await.expect("agent info");

    assert_eq!(info.name, "Mock Signals Agent");
    assert_eq!(info.tool_names(), vec!["get_signals", "activate_signal"]);
}

/// Test: A2A message/send payloads come from the task artifact data part
#[tokio::test]
async fn test_a2a_message_send() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/a2a"))
        .and(body_partial_json(json!({
            "method": "message/send",
            "params": { "message": { "parts": [{ "kind": "data", "data": { "skill": "get_products" } }] } }
        })))
        .and(header("x-dry-run", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "kind": "task",
                "id": "task-1",
                "status": { "state": "completed" },
                "artifacts": [{ "parts": [
                    { "kind": "data", "data": { "products": [{ "product_id": "p9" }] } }
                ]}]
            }
        })))
        .mount(&server)
        .await;

    let options = ClientOptions::default().with_dry_run(false);
    let client = connect(&format!("{}/a2a", server.uri()), &options).expect("connect");
    let result = client
        .call::<GetProducts>(json!({ "brief": "news" }))
        .await
        .expect("call");

    assert_eq!(result.into_data().expect("success").products[0].product_id, "p9");
}

/// Test: A2A JSON-RPC errors surface as task failures
#[tokio::test]
async fn test_a2a_rpc_error_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/a2a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "unknown skill" }
        })))
        .mount(&server)
        .await;

    let client = connect(&format!("{}/a2a", server.uri()), &ClientOptions::default())
        .expect("connect");
    let result = client
        .execute_task("nonexistent_operation", json!({}))
        .await
        .expect("execute");
    assert_eq!(result.error(), Some("unknown skill"));
}

/// Test: a JSON-RPC error envelope sent with HTTP 400 is the agent
/// rejecting the call, not a transport failure
#[tokio::test]
async fn test_mcp_rpc_error_with_400_is_failure() {
    let server = MockServer::start().await;
    mount_mcp_initialize(&server).await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({ "method": "tools/call" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "error": { "code": -32602, "message": "budget must be positive" }
        })))
        .mount(&server)
        .await;

    let client = connect(&format!("{}/mcp", server.uri()), &ClientOptions::default())
        .expect("connect");
    let result = client
        .execute_task("create_media_buy", json!({ "packages": [{ "budget": -500 }] }))
        .await
        .expect("rejection is a task result");

    assert_eq!(result.error(), Some("budget must be positive"));
}

/// Test: a non-JSON 4xx body stays an HTTP error
#[tokio::test]
async fn test_mcp_plain_400_is_http_error() {
    let server = MockServer::start().await;
    mount_mcp_initialize(&server).await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({ "method": "tools/call" })))
        .respond_with(ResponseTemplate::new(400).set_body_string("Bad Request"))
        .mount(&server)
        .await;

    let client = connect(&format!("{}/mcp", server.uri()), &ClientOptions::default())
        .expect("connect");
    let err = client
        .execute_task("create_media_buy", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Http { status: 400, .. }), "{:?}", err);
}

/// Test: A2A JSON-RPC error envelopes on a 4xx response are task failures
#[tokio::test]
async fn test_a2a_rpc_error_with_400_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/a2a"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "end_time must be after start_time" }
        })))
        .mount(&server)
        .await;

    let client = connect(&format!("{}/a2a", server.uri()), &ClientOptions::default())
        .expect("connect");
    let result = client
        .execute_task("create_media_buy", json!({}))
        .await
        .expect("rejection is a task result");
    assert_eq!(result.error(), Some("end_time must be after start_time"));
}

/// Test: A2A 5xx with a non-JSON body is an HTTP error
#[tokio::test]
async fn test_a2a_plain_503_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/a2a"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let client = connect(&format!("{}/a2a", server.uri()), &ClientOptions::default())
        .expect("connect");
    let err = client
        .execute_task("get_products", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Http { status: 503, .. }), "{:?}", err);
}
