// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! High-level chat service.
//!
//! [`ChatService`] is the host-facing facade: it owns the connection registry
//! and the orchestrator, so an embedding application deals with one handle
//! for server lifecycle and message handling.

use std::sync::Arc;

use tracing::info;

use crate::agent::{LoopOutcome, Orchestrator, OrchestratorConfig};
use crate::error::AgentError;
use crate::mcp::{ConnectionRegistry, McpConfig, McpError, McpToolInfo, ServerConfig};
use crate::types::{Message, SharedProvider};

/// Facade over the registry and the tool-use loop.
pub struct ChatService {
    registry: Arc<ConnectionRegistry>,
    orchestrator: Orchestrator,
}

impl ChatService {
    /// Create a service over the given provider.
    pub fn new(provider: SharedProvider) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let router: Arc<dyn crate::mcp::ToolRouter> = registry.clone();
        let orchestrator = Orchestrator::new(provider, router);
        Self {
            registry,
            orchestrator,
        }
    }

    /// Override the orchestrator configuration.
    pub fn with_orchestrator_config(mut self, config: OrchestratorConfig) -> Self {
        self.orchestrator = self.orchestrator.with_config(config);
        self
    }

    /// Connect a tool server under `name`, returning its discovered tools.
    pub async fn connect(
        &self,
        name: &str,
        config: ServerConfig,
    ) -> Result<Vec<McpToolInfo>, McpError> {
        self.registry.connect(name, config).await
    }

    /// Connect every server in a configuration bundle.
    ///
    /// Per-server results are reported individually; one server failing to
    /// start does not abort the rest.
    pub async fn connect_bundle(
        &self,
        config: McpConfig,
    ) -> Vec<(String, Result<Vec<McpToolInfo>, McpError>)> {
        self.registry.connect_all(config.servers).await
    }

    /// Disconnect the named server. No-op if not connected.
    pub async fn disconnect(&self, name: &str) {
        self.registry.disconnect(name).await;
    }

    /// Names of currently connected servers.
    pub async fn list_connected(&self) -> Vec<String> {
        self.registry.connected_names().await
    }

    /// All tools across connected servers.
    pub async fn available_tools(&self) -> Vec<McpToolInfo> {
        self.registry.all_tools().await
    }

    /// Handle one user message, running the tool-use loop against the
    /// current tool snapshot.
    pub async fn handle_message(
        &self,
        history: &[Message],
        user_message: &str,
    ) -> Result<LoopOutcome, AgentError> {
        let tools = self.registry.all_tools().await;
        self.orchestrator.run(history, user_message, &tools).await
    }

    /// Tear down every connection. Call at host shutdown.
    pub async fn shutdown(&self) {
        info!("shutting down chat service");
        self.registry.disconnect_all().await;
    }
}
