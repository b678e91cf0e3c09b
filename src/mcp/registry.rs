// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Connection registry and tool invocation routing.
//!
//! The registry is the single source of truth for "what tools exist right
//! now" and the only shared mutable structure in the crate. It exclusively
//! owns every [`McpClient`]; callers address connections by name so a stale
//! process handle can never escape a disconnect.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::client::McpClient;
use super::config::ServerConfig;
use super::error::McpError;
use super::types::McpToolInfo;

/// Routes a tool invocation to the process that owns it.
///
/// The orchestrator depends on this seam rather than on the registry
/// directly, so the loop can be exercised without live subprocesses.
#[async_trait]
pub trait ToolRouter: Send + Sync {
    /// Invoke `tool` on `server`, normalizing the reply to plain text.
    ///
    /// No retry policy lives here; recovery belongs to the orchestrator's
    /// error-turn-and-continue strategy.
    async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: serde_json::Value,
    ) -> Result<String, McpError>;
}

struct ConnectionEntry {
    client: Arc<Mutex<McpClient>>,
    /// Snapshot taken at connect time; tools never change while a
    /// connection is live, so reads need not contend with in-flight calls.
    tools: Vec<McpToolInfo>,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<String, ConnectionEntry>,
    /// Connection-creation order, for stable `all_tools` output.
    order: Vec<String>,
}

/// Concurrency-safe table of named tool-server connections.
///
/// Create one at host startup, share it via [`Arc`], and tear it down with
/// [`Self::disconnect_all`] at shutdown. An entry becomes visible only after
/// its tool list is fully populated, and is pruned the instant its
/// disconnect begins.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect to a tool server under `name`, replacing any existing
    /// connection with that name.
    ///
    /// The old connection (if any) is fully torn down before the new process
    /// is spawned. On failure nothing is stored and the error carries the
    /// underlying cause; other connections are unaffected.
    pub async fn connect(
        &self,
        name: &str,
        config: ServerConfig,
    ) -> Result<Vec<McpToolInfo>, McpError> {
        config.validate()?;

        // Reconnect under an existing name: old connection goes through
        // Closing -> Closed first.
        self.disconnect(name).await;

        let mut client = McpClient::new(name, config);
        client.connect().await?;
        let tools = client.tools().to_vec();

        let entry = ConnectionEntry {
            client: Arc::new(Mutex::new(client)),
            tools: tools.clone(),
        };

        let displaced = {
            let mut inner = self.inner.write().await;
            let displaced = inner.connections.insert(name.to_string(), entry);
            if !inner.order.iter().any(|n| n == name) {
                inner.order.push(name.to_string());
            }
            displaced
        };

        // A concurrent connect for the same name raced us; exactly one
        // connection may survive, so the displaced one is torn down.
        if let Some(loser) = displaced {
            warn!(server = %name, "replacing connection established concurrently");
            loser.client.lock().await.disconnect().await;
        }

        info!(server = %name, tools = tools.len(), "connected to MCP server");
        Ok(tools)
    }

    /// Connect every server in a validated bundle.
    ///
    /// Failures are reported per server and do not affect the others.
    pub async fn connect_all(
        &self,
        servers: impl IntoIterator<Item = (String, ServerConfig)>,
    ) -> Vec<(String, Result<Vec<McpToolInfo>, McpError>)> {
        let mut results = Vec::new();
        for (name, config) in servers {
            let result = self.connect(&name, config).await;
            results.push((name, result));
        }
        results
    }

    /// Disconnect the named server. No-op if the name is not present.
    ///
    /// Idempotent and best-effort: the entry is removed first, then teardown
    /// errors are logged rather than raised, so the name never resolves to a
    /// usable connection once this returns.
    pub async fn disconnect(&self, name: &str) {
        let entry = {
            let mut inner = self.inner.write().await;
            inner.order.retain(|n| n != name);
            inner.connections.remove(name)
        };

        if let Some(entry) = entry {
            entry.client.lock().await.disconnect().await;
            info!(server = %name, "disconnected from MCP server");
        }
    }

    /// Disconnect every current entry; used during process-wide teardown.
    ///
    /// Teardowns proceed independently and concurrently; one entry's failure
    /// never blocks the others.
    pub async fn disconnect_all(&self) {
        let entries: Vec<(String, ConnectionEntry)> = {
            let mut inner = self.inner.write().await;
            inner.order.clear();
            inner.connections.drain().collect()
        };

        let mut set = JoinSet::new();
        for (name, entry) in entries {
            set.spawn(async move {
                entry.client.lock().await.disconnect().await;
                info!(server = %name, "disconnected from MCP server");
            });
        }
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "disconnect task failed");
            }
        }
    }

    /// Check whether `name` has a live connection.
    pub async fn is_connected(&self, name: &str) -> bool {
        self.inner.read().await.connections.contains_key(name)
    }

    /// Tools advertised by the named server; empty if absent.
    pub async fn tools_for(&self, name: &str) -> Vec<McpToolInfo> {
        let inner = self.inner.read().await;
        inner
            .connections
            .get(name)
            .map(|e| e.tools.clone())
            .unwrap_or_default()
    }

    /// All tools across live connections, in connection-creation order and
    /// tool-list order within a connection.
    pub async fn all_tools(&self) -> Vec<McpToolInfo> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|name| inner.connections.get(name))
            .flat_map(|e| e.tools.iter().cloned())
            .collect()
    }

    /// Names of currently connected servers, in connection-creation order.
    pub async fn connected_names(&self) -> Vec<String> {
        self.inner.read().await.order.clone()
    }
}

#[async_trait]
impl ToolRouter for ConnectionRegistry {
    async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: serde_json::Value,
    ) -> Result<String, McpError> {
        let client = {
            let inner = self.inner.read().await;
            inner
                .connections
                .get(server)
                .map(|e| Arc::clone(&e.client))
                .ok_or_else(|| McpError::ServerNotConnected(server.to_string()))?
        };

        let result = client.lock().await.call_tool(tool, arguments).await?;
        if result.is_error {
            return Err(McpError::tool_failed(tool, result.as_text()));
        }
        Ok(result.as_text())
    }
}
