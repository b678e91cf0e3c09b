// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool-use orchestration loop.
//!
//! The [`Orchestrator`] mediates between a [`Provider`] and a [`ToolRouter`]:
//! it asks the model for a completion, executes any tool call the reply
//! contains, feeds the result back as a synthetic user turn, and repeats
//! until the model answers in plain text or the iteration cap is hit.
//!
//! Only provider failures abort the loop. A request for an unknown tool or a
//! failed tool execution becomes a corrective turn the model can recover
//! from on its next completion.

pub mod types;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::mcp::{McpToolInfo, ToolRouter};
use crate::prompt::{build_tool_prompt, parse_tool_call};
use crate::types::{Message, SharedProvider};

pub use types::{LoopOutcome, OrchestratorConfig, ToolInvocation, DEFAULT_MAX_ITERATIONS};

/// Drives the complete/parse/execute/feed-back cycle for one user message.
pub struct Orchestrator {
    provider: SharedProvider,
    router: Arc<dyn ToolRouter>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator over the given provider and tool router.
    pub fn new(provider: SharedProvider, router: Arc<dyn ToolRouter>) -> Self {
        Self {
            provider,
            router,
            config: OrchestratorConfig::default(),
        }
    }

    /// Override the default loop configuration.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the loop for one user message.
    ///
    /// `history` is the prior conversation (without system prompt); `tools`
    /// is the snapshot of currently-available tools, used both for the
    /// system prompt and for resolving tool names to owning servers.
    ///
    /// Synthetic turns added during the loop live only in the transcript
    /// built here; the caller's history is untouched.
    pub async fn run(
        &self,
        history: &[Message],
        user_message: &str,
        tools: &[McpToolInfo],
    ) -> Result<LoopOutcome, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(build_tool_prompt(tools)));
        messages.extend_from_slice(history);
        messages.push(Message::user(user_message));

        let mut tool_results = Vec::new();
        let mut last_response = String::new();
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            iterations += 1;
            debug!(iteration = iterations, "requesting completion");

            let response = self.provider.complete(&messages).await?;
            last_response = response.clone();

            let call = match parse_tool_call(&response) {
                Some(call) => call,
                None => {
                    info!(iterations, tools_used = tool_results.len(), "loop finished");
                    return Ok(LoopOutcome {
                        final_text: response,
                        tool_results,
                        iterations,
                    });
                }
            };

            let owner = tools.iter().find(|t| t.name == call.name);
            let Some(tool) = owner else {
                warn!(tool = %call.name, "model requested unknown tool");
                let available = tools
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                messages.push(Message::assistant(&response));
                messages.push(Message::user(format!(
                    "Error: Tool \"{}\" not found. Available tools: {}",
                    call.name, available
                )));
                continue;
            };

            info!(tool = %call.name, server = %tool.server, "executing tool call");
            let arguments = serde_json::Value::Object(call.arguments.clone());
            match self.router.call_tool(&tool.server, &call.name, arguments).await {
                Ok(result) => {
                    tool_results.push(ToolInvocation {
                        tool: call.name.clone(),
                        result: result.clone(),
                    });
                    messages.push(Message::assistant(&response));
                    messages.push(Message::user(format!(
                        "Tool result for {}:\n{}",
                        call.name, result
                    )));
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "tool call failed");
                    messages.push(Message::assistant(&response));
                    messages.push(Message::user(format!(
                        "Tool error for {}: {}",
                        call.name, e
                    )));
                }
            }
        }

        // Iteration cap reached mid-cycle; the last model text stands in as
        // the answer.
        warn!(iterations, "iteration cap reached before a final answer");
        Ok(LoopOutcome {
            final_text: last_response,
            tool_results,
            iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::ProviderError;
    use crate::mcp::McpError;
    use crate::types::Provider;

    struct ScriptedProvider {
        responses: Mutex<Vec<String>>,
        transcripts: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedProvider {
        fn new(responses: &[&str]) -> Self {
            let mut responses: Vec<String> =
                responses.iter().map(|s| s.to_string()).collect();
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                transcripts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
            self.transcripts.lock().unwrap().push(messages.to_vec());
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

    struct StaticRouter {
        responses: std::collections::HashMap<String, Result<String, String>>,
        calls: Mutex<Vec<(String, String, serde_json::Value)>>,
    }

    impl StaticRouter {
        fn new() -> Self {
            Self {
                responses: std::collections::HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_tool(mut self, tool: &str, result: Result<&str, &str>) -> Self {
            self.responses.insert(
                tool.to_string(),
                result.map(|s| s.to_string()).map_err(|s| s.to_string()),
            );
            self
        }
    }

    #[async_trait]
    impl ToolRouter for StaticRouter {
        async fn call_tool(
            &self,
            server: &str,
            tool: &str,
            arguments: serde_json::Value,
        ) -> Result<String, McpError> {
            self.calls
                .lock()
                .unwrap()
                .push((server.to_string(), tool.to_string(), arguments));
            match self.responses.get(tool) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(message)) => Err(McpError::tool_failed(tool, message.clone())),
                None => Err(McpError::ServerNotConnected(server.to_string())),
            }
        }
    }

    fn tool(name: &str, server: &str) -> McpToolInfo {
        McpToolInfo {
            name: name.to_string(),
            description: Some(format!("The {} tool", name)),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
            server: server.to_string(),
        }
    }

    fn orchestrator(provider: ScriptedProvider, router: StaticRouter) -> Orchestrator {
        Orchestrator::new(Arc::new(provider), Arc::new(router))
    }

    #[tokio::test]
    async fn test_plain_answer_short_circuits() {
        let orchestrator = orchestrator(
            ScriptedProvider::new(&["The answer is 4."]),
            StaticRouter::new(),
        );

        let outcome = orchestrator
            .run(&[], "what is 2+2?", &[])
            .await
            .unwrap();

        assert_eq!(outcome.final_text, "The answer is 4.");
        assert!(outcome.tool_results.is_empty());
        assert_eq!(outcome.iterations, 1);
    }

    #[tokio::test]
    async fn test_single_tool_round_trip() {
        let provider = ScriptedProvider::new(&[
            r#"<tool_call>{"name": "add", "arguments": {"a": 2, "b": 2}}</tool_call>"#,
            "2 + 2 = 4.",
        ]);
        let router = StaticRouter::new().with_tool("add", Ok("4"));
        let orchestrator = orchestrator(provider, router);

        let tools = [tool("add", "calc")];
        let outcome = orchestrator.run(&[], "what is 2+2?", &tools).await.unwrap();

        assert_eq!(outcome.final_text, "2 + 2 = 4.");
        assert_eq!(
            outcome.tool_results,
            vec![ToolInvocation {
                tool: "add".to_string(),
                result: "4".to_string(),
            }]
        );
        assert_eq!(outcome.iterations, 2);
    }

    #[tokio::test]
    async fn test_result_turn_is_fed_back() {
        let provider = Arc::new(ScriptedProvider::new(&[
            r#"<tool_call>{"name": "add", "arguments": {}}</tool_call>"#,
            "Done.",
        ]));
        let router = StaticRouter::new().with_tool("add", Ok("4"));
        let orchestrator =
            Orchestrator::new(Arc::clone(&provider) as SharedProvider, Arc::new(router));

        let tools = [tool("add", "calc")];
        orchestrator.run(&[], "add it", &tools).await.unwrap();

        let transcripts = provider.transcripts.lock().unwrap();
        assert_eq!(transcripts.len(), 2);
        let last = transcripts[1].last().unwrap();
        assert_eq!(last.content, "Tool result for add:\n4");
    }

    #[tokio::test]
    async fn test_unknown_tool_gets_corrective_turn() {
        let provider = Arc::new(ScriptedProvider::new(&[
            r#"<tool_call>{"name": "frobnicate", "arguments": {}}</tool_call>"#,
            "I don't have that tool.",
        ]));
        let router = StaticRouter::new().with_tool("add", Ok("4"));
        let orchestrator =
            Orchestrator::new(Arc::clone(&provider) as SharedProvider, Arc::new(router));

        let tools = [tool("add", "calc"), tool("search", "web")];
        let outcome = orchestrator.run(&[], "frobnicate!", &tools).await.unwrap();

        assert_eq!(outcome.final_text, "I don't have that tool.");
        assert!(outcome.tool_results.is_empty());

        let transcripts = provider.transcripts.lock().unwrap();
        let corrective = transcripts[1].last().unwrap();
        assert_eq!(
            corrective.content,
            "Error: Tool \"frobnicate\" not found. Available tools: add, search"
        );
    }

    #[tokio::test]
    async fn test_tool_failure_gets_error_turn() {
        let provider = Arc::new(ScriptedProvider::new(&[
            r#"<tool_call>{"name": "add", "arguments": {}}</tool_call>"#,
            "Sorry, that failed.",
        ]));
        let router = StaticRouter::new().with_tool("add", Err("division by zero"));
        let orchestrator =
            Orchestrator::new(Arc::clone(&provider) as SharedProvider, Arc::new(router));

        let tools = [tool("add", "calc")];
        let outcome = orchestrator.run(&[], "add it", &tools).await.unwrap();

        assert_eq!(outcome.final_text, "Sorry, that failed.");
        assert!(outcome.tool_results.is_empty());

        let transcripts = provider.transcripts.lock().unwrap();
        let corrective = transcripts[1].last().unwrap();
        assert!(corrective.content.starts_with("Tool error for add: "));
        assert!(corrective.content.contains("division by zero"));
    }

    #[tokio::test]
    async fn test_iteration_cap() {
        let call = r#"<tool_call>{"name": "add", "arguments": {}}</tool_call>"#;
        let provider = ScriptedProvider::new(&[call, call, call, call, call]);
        let router = StaticRouter::new().with_tool("add", Ok("4"));
        let orchestrator = orchestrator(provider, router);

        let tools = [tool("add", "calc")];
        let outcome = orchestrator.run(&[], "loop forever", &tools).await.unwrap();

        assert_eq!(outcome.iterations, 5);
        assert_eq!(outcome.tool_results.len(), 5);
        assert_eq!(outcome.final_text, call);
    }

    #[tokio::test]
    async fn test_unknown_tool_on_every_iteration_exhausts_cap() {
        let call = r#"<tool_call>{"name": "frobnicate", "arguments": {}}</tool_call>"#;
        let provider = ScriptedProvider::new(&[call, call, call, call, call]);
        let router = StaticRouter::new().with_tool("add", Ok("4"));
        let orchestrator = orchestrator(provider, router);

        let tools = [tool("add", "calc")];
        let outcome = orchestrator.run(&[], "frobnicate!", &tools).await.unwrap();

        assert_eq!(outcome.iterations, 5);
        assert!(outcome.tool_results.is_empty());
        // Still-marker-containing text is handed back as plain text.
        assert_eq!(outcome.final_text, call);
    }

    #[tokio::test]
    async fn test_custom_iteration_cap() {
        let call = r#"<tool_call>{"name": "add", "arguments": {}}</tool_call>"#;
        let provider = ScriptedProvider::new(&[call, call]);
        let router = StaticRouter::new().with_tool("add", Ok("4"));
        let orchestrator = orchestrator(provider, router)
            .with_config(OrchestratorConfig::default().with_max_iterations(2));

        let tools = [tool("add", "calc")];
        let outcome = orchestrator.run(&[], "loop", &tools).await.unwrap();

        assert_eq!(outcome.iterations, 2);
    }

    #[tokio::test]
    async fn test_provider_error_is_fatal() {
        let provider = ScriptedProvider::new(&[]);
        let orchestrator = orchestrator(provider, StaticRouter::new());

        let err = orchestrator.run(&[], "hello", &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[tokio::test]
    async fn test_history_is_preserved_in_transcript() {
        let provider = Arc::new(ScriptedProvider::new(&["Hi again."]));
        let orchestrator = Orchestrator::new(
            Arc::clone(&provider) as SharedProvider,
            Arc::new(StaticRouter::new()),
        );

        let history = [Message::user("hello"), Message::assistant("hi")];
        orchestrator.run(&history, "hello again", &[]).await.unwrap();

        let transcripts = provider.transcripts.lock().unwrap();
        let sent = &transcripts[0];
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[1].content, "hello");
        assert_eq!(sent[2].content, "hi");
        assert_eq!(sent[3].content, "hello again");
    }
}
