// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Integration tests for the connection registry against scripted servers.
//!
//! Each fake server is a shell one-liner that emits canned JSON-RPC response
//! lines on stdout (handshake, tool list, then tool-call replies in order)
//! and stays alive reading stdin until the client closes it.

#![cfg(unix)]

use serde_json::json;

use toolbridge::mcp::{ConnectionRegistry, McpError, ServerConfig, ToolRouter};

fn scripted_server(responses: &[serde_json::Value]) -> ServerConfig {
    let lines = responses
        .iter()
        .map(|r| format!("'{}'", r))
        .collect::<Vec<_>>()
        .join(" ");
    let script = format!("printf '%s\\n' {}; cat >/dev/null", lines);
    ServerConfig::new("sh").with_args(["-c", &script])
}

fn initialize_response() -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": {
            "protocolVersion": "2024-11-05",
            "serverInfo": { "name": "fake-server", "version": "1.0.0" },
            "capabilities": { "tools": {} }
        }
    })
}

fn tools_response(tools: &[(&str, &str)]) -> serde_json::Value {
    let tools: Vec<_> = tools
        .iter()
        .map(|(name, description)| {
            json!({
                "name": name,
                "description": description,
                "inputSchema": {
                    "type": "object",
                    "properties": { "a": { "type": "number" }, "b": { "type": "number" } }
                }
            })
        })
        .collect();
    json!({ "jsonrpc": "2.0", "id": 2, "result": { "tools": tools } })
}

fn text_result(id: u64, text: &str, is_error: bool) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "content": [ { "type": "text", "text": text } ],
            "isError": is_error
        }
    })
}

#[tokio::test]
async fn connect_discovers_tools() {
    let registry = ConnectionRegistry::new();
    let config = scripted_server(&[
        initialize_response(),
        tools_response(&[("add", "Add two numbers"), ("sub", "Subtract")]),
    ]);

    let tools = registry.connect("calc", config).await.unwrap();

    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0].name, "add");
    assert_eq!(tools[0].server, "calc");
    assert_eq!(tools[1].name, "sub");

    assert!(registry.is_connected("calc").await);
    assert_eq!(registry.connected_names().await, vec!["calc".to_string()]);
    assert_eq!(registry.tools_for("calc").await.len(), 2);

    registry.disconnect_all().await;
}

#[tokio::test]
async fn call_tool_end_to_end() {
    let registry = ConnectionRegistry::new();
    let config = scripted_server(&[
        initialize_response(),
        tools_response(&[("add", "Add two numbers")]),
        text_result(3, "4", false),
    ]);

    registry.connect("calc", config).await.unwrap();

    let text = registry
        .call_tool("calc", "add", json!({"a": 2, "b": 2}))
        .await
        .unwrap();
    assert_eq!(text, "4");

    registry.disconnect_all().await;
}

#[tokio::test]
async fn tool_error_result_is_surfaced() {
    let registry = ConnectionRegistry::new();
    let config = scripted_server(&[
        initialize_response(),
        tools_response(&[("add", "Add two numbers")]),
        text_result(3, "division by zero", true),
    ]);

    registry.connect("calc", config).await.unwrap();

    let err = registry
        .call_tool("calc", "add", json!({}))
        .await
        .unwrap_err();
    match err {
        McpError::ToolCallFailed { tool, message } => {
            assert_eq!(tool, "add");
            assert!(message.contains("division by zero"));
        }
        other => panic!("unexpected error: {other}"),
    }

    registry.disconnect_all().await;
}

#[tokio::test]
async fn protocol_error_is_surfaced() {
    let registry = ConnectionRegistry::new();
    let config = scripted_server(&[
        initialize_response(),
        tools_response(&[("add", "Add two numbers")]),
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "error": { "code": -32602, "message": "invalid params" }
        }),
    ]);

    registry.connect("calc", config).await.unwrap();

    let err = registry
        .call_tool("calc", "add", json!({}))
        .await
        .unwrap_err();
    match err {
        McpError::Protocol { code, message } => {
            assert_eq!(code, -32602);
            assert!(message.contains("invalid params"));
        }
        other => panic!("unexpected error: {other}"),
    }

    registry.disconnect_all().await;
}

#[tokio::test]
async fn server_notifications_are_skipped() {
    let registry = ConnectionRegistry::new();
    let notification = json!({
        "jsonrpc": "2.0",
        "method": "notifications/message",
        "params": { "level": "info", "data": "starting up" }
    });
    let config = scripted_server(&[
        notification.clone(),
        initialize_response(),
        tools_response(&[("add", "Add two numbers")]),
        notification,
        text_result(3, "4", false),
    ]);

    let tools = registry.connect("calc", config).await.unwrap();
    assert_eq!(tools.len(), 1);

    let text = registry
        .call_tool("calc", "add", json!({"a": 2, "b": 2}))
        .await
        .unwrap();
    assert_eq!(text, "4");

    registry.disconnect_all().await;
}

#[tokio::test]
async fn concurrent_same_name_connects_leave_one_connection() {
    let registry = ConnectionRegistry::new();

    let first = scripted_server(&[
        initialize_response(),
        tools_response(&[("add", "Add two numbers")]),
        text_result(3, "4", false),
    ]);
    let second = scripted_server(&[
        initialize_response(),
        tools_response(&[("add", "Add two numbers")]),
        text_result(3, "4", false),
    ]);

    let (a, b) = tokio::join!(
        registry.connect("calc", first),
        registry.connect("calc", second),
    );
    assert!(a.is_ok());
    assert!(b.is_ok());

    // Exactly one connection survives, and it is fully usable; the other
    // process has been torn down.
    assert_eq!(registry.connected_names().await, vec!["calc".to_string()]);
    assert_eq!(registry.tools_for("calc").await.len(), 1);
    let text = registry
        .call_tool("calc", "add", json!({"a": 2, "b": 2}))
        .await
        .unwrap();
    assert_eq!(text, "4");

    registry.disconnect_all().await;
}

#[tokio::test]
async fn all_tools_preserves_connection_order() {
    let registry = ConnectionRegistry::new();

    let a = scripted_server(&[
        initialize_response(),
        tools_response(&[("read_file", "Read a file"), ("write_file", "Write a file")]),
    ]);
    let b = scripted_server(&[
        initialize_response(),
        tools_response(&[("search", "Search the web")]),
    ]);

    registry.connect("files", a).await.unwrap();
    registry.connect("web", b).await.unwrap();

    let all = registry.all_tools().await;
    let names: Vec<_> = all.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["read_file", "write_file", "search"]);

    registry.disconnect("files").await;
    assert!(!registry.is_connected("files").await);

    let remaining = registry.all_tools().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "search");
    assert_eq!(remaining[0].server, "web");

    registry.disconnect_all().await;
}

#[tokio::test]
async fn reconnect_replaces_previous_connection() {
    let registry = ConnectionRegistry::new();

    let first = scripted_server(&[
        initialize_response(),
        tools_response(&[("old_tool", "Original tool")]),
    ]);
    let second = scripted_server(&[
        initialize_response(),
        tools_response(&[("new_tool", "Replacement tool")]),
    ]);

    registry.connect("calc", first).await.unwrap();
    registry.connect("calc", second).await.unwrap();

    assert_eq!(registry.connected_names().await, vec!["calc".to_string()]);
    let tools = registry.tools_for("calc").await;
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "new_tool");

    registry.disconnect_all().await;
}

#[tokio::test]
async fn failed_connect_leaves_others_intact() {
    let registry = ConnectionRegistry::new();

    let good = scripted_server(&[
        initialize_response(),
        tools_response(&[("add", "Add two numbers")]),
    ]);
    registry.connect("calc", good).await.unwrap();

    let err = registry
        .connect("ghost", ServerConfig::new("definitely-not-a-real-command-xyz"))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::ConnectionFailed { .. }));

    assert!(registry.is_connected("calc").await);
    assert!(!registry.is_connected("ghost").await);
    assert_eq!(registry.all_tools().await.len(), 1);

    registry.disconnect_all().await;
}

#[tokio::test]
async fn handshake_timeout_fails_the_connect() {
    let registry = ConnectionRegistry::new();
    // Server that never answers the handshake.
    let config = ServerConfig::new("sh")
        .with_args(["-c", "cat >/dev/null"])
        .with_startup_timeout(1);

    let err = registry.connect("silent", config).await.unwrap_err();
    assert!(matches!(err, McpError::ConnectionTimeout { .. }));
    assert!(!registry.is_connected("silent").await);
}

#[tokio::test]
async fn disconnect_all_clears_every_entry() {
    let registry = ConnectionRegistry::new();

    for name in ["one", "two", "three"] {
        let config = scripted_server(&[
            initialize_response(),
            tools_response(&[("noop", "Does nothing")]),
        ]);
        registry.connect(name, config).await.unwrap();
    }
    assert_eq!(registry.connected_names().await.len(), 3);

    registry.disconnect_all().await;
    assert!(registry.connected_names().await.is_empty());
    assert!(registry.all_tools().await.is_empty());
}
