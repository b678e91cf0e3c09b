// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end test of the tool-use loop: a scripted model driving a real
//! subprocess tool server through the service facade.

#![cfg(unix)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use toolbridge::mcp::ServerConfig;
use toolbridge::{ChatService, Message, Provider, ProviderError};

struct ScriptedProvider {
    responses: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(responses: &[&str]) -> Self {
        let mut responses: Vec<String> = responses.iter().map(|s| s.to_string()).collect();
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(&self, _messages: &[Message]) -> Result<String, ProviderError> {
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| ProviderError::api_message("script exhausted"))
    }

    async fn stream_complete(
        &self,
        messages: &[Message],
        _on_text: Box<dyn for<'a> Fn(&'a str) + Send + Sync>,
    ) -> Result<String, ProviderError> {
        self.complete(messages).await
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "test-model"
    }
}

fn calc_server() -> ServerConfig {
    let responses = [
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "protocolVersion": "2024-11-05",
                "serverInfo": { "name": "calc", "version": "1.0.0" },
                "capabilities": { "tools": {} }
            }
        }),
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": {
                "tools": [{
                    "name": "add",
                    "description": "Add two numbers",
                    "inputSchema": {
                        "type": "object",
                        "properties": { "a": { "type": "number" }, "b": { "type": "number" } }
                    }
                }]
            }
        }),
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {
                "content": [ { "type": "text", "text": "4" } ],
                "isError": false
            }
        }),
    ];
    let lines = responses
        .iter()
        .map(|r| format!("'{}'", r))
        .collect::<Vec<_>>()
        .join(" ");
    ServerConfig::new("sh").with_args([
        "-c",
        &format!("printf '%s\\n' {}; cat >/dev/null", lines),
    ])
}

#[tokio::test]
async fn loop_executes_tool_and_answers() {
    let provider = ScriptedProvider::new(&[
        r#"<tool_call>{"name": "add", "arguments": {"a": 2, "b": 2}}</tool_call>"#,
        "2 + 2 = 4.",
    ]);
    let service = ChatService::new(Arc::new(provider));

    let tools = service.connect("calc", calc_server()).await.unwrap();
    assert_eq!(tools.len(), 1);

    let outcome = service.handle_message(&[], "what is 2+2?").await.unwrap();

    assert_eq!(outcome.final_text, "2 + 2 = 4.");
    assert_eq!(outcome.tool_results.len(), 1);
    assert_eq!(outcome.tool_results[0].tool, "add");
    assert_eq!(outcome.tool_results[0].result, "4");
    assert_eq!(outcome.iterations, 2);

    service.shutdown().await;
    assert!(service.list_connected().await.is_empty());
}

#[tokio::test]
async fn plain_question_skips_tools() {
    let provider = ScriptedProvider::new(&["Paris is the capital of France."]);
    let service = ChatService::new(Arc::new(provider));

    let tools = service.connect("calc", calc_server()).await.unwrap();
    assert_eq!(tools.len(), 1);

    let outcome = service
        .handle_message(&[], "what is the capital of France?")
        .await
        .unwrap();

    assert_eq!(outcome.final_text, "Paris is the capital of France.");
    assert!(outcome.tool_results.is_empty());
    assert_eq!(outcome.iterations, 1);

    service.shutdown().await;
}
