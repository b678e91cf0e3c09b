// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Client for a single MCP server subprocess.
//!
//! Spawns the server as a child process and speaks newline-delimited JSON-RPC
//! over its stdin/stdout: an `initialize` handshake, a `tools/list` request,
//! then arbitrary `tools/call` requests until teardown.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use super::config::ServerConfig;
use super::error::McpError;
use super::types::{ConnectionState, McpContent, McpToolInfo, McpToolResult, ServerInfo};

const PROTOCOL_VERSION: &str = "2024-11-05";

/// Client for a single MCP server connection.
///
/// Owns the child process and its stdio session. Held exclusively by the
/// [`super::registry::ConnectionRegistry`]; callers go through the registry
/// by name so a closed process handle can never be reused.
pub struct McpClient {
    /// Server name.
    name: String,

    /// Server configuration.
    config: ServerConfig,

    /// Connection state.
    state: ConnectionState,

    /// Child process handle.
    process: Option<Child>,

    /// Write half of the session.
    stdin: Option<ChildStdin>,

    /// Read half of the session. Buffered once at spawn so no response
    /// bytes are lost between requests.
    stdout: Option<BufReader<ChildStdout>>,

    /// Server info (after initialization).
    server_info: Option<ServerInfo>,

    /// Tools advertised by the server (after initialization).
    tools: Vec<McpToolInfo>,

    /// Request ID counter.
    request_id: u64,
}

impl McpClient {
    /// Create a new client. The connection is not opened until [`Self::connect`].
    pub fn new(name: impl Into<String>, config: ServerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: ConnectionState::Connecting,
            process: None,
            stdin: None,
            stdout: None,
            server_info: None,
            tools: Vec::new(),
            request_id: 0,
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get server info (if available).
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// Get the tools advertised by this server.
    pub fn tools(&self) -> &[McpToolInfo] {
        &self.tools
    }

    /// Check if the client is ready for tool calls.
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    fn next_request_id(&mut self) -> u64 {
        self.request_id += 1;
        self.request_id
    }

    /// Spawn the process, perform the handshake, and fetch the tool list.
    ///
    /// On any failure the client transitions to `Failed` and the half-started
    /// process is released before the error is returned.
    pub async fn connect(&mut self) -> Result<(), McpError> {
        if self.state == ConnectionState::Ready {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;

        match self.connect_inner().await {
            Ok(()) => {
                self.state = ConnectionState::Ready;
                debug!(server = %self.name, tools = self.tools.len(), "MCP server ready");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Failed;
                self.release_process().await;
                self.tools.clear();
                Err(e)
            }
        }
    }

    async fn connect_inner(&mut self) -> Result<(), McpError> {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            // merged over the inherited environment, child keys win
            .envs(&self.config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| McpError::connection_failed(&self.name, e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::connection_failed(&self.name, "Failed to get stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::connection_failed(&self.name, "Failed to get stdout"))?;

        self.process = Some(child);
        self.stdin = Some(stdin);
        self.stdout = Some(BufReader::new(stdout));

        let timeout_secs = self.config.startup_timeout_sec;
        let timeout = Duration::from_secs(timeout_secs);

        // Initialize handshake
        let init_result = tokio::time::timeout(timeout, self.send_initialize())
            .await
            .map_err(|_| McpError::ConnectionTimeout {
                server: self.name.clone(),
                timeout_secs,
            })??;
        self.server_info = Some(init_result);

        // Tool discovery
        tokio::time::timeout(timeout, self.fetch_tools())
            .await
            .map_err(|_| McpError::ConnectionTimeout {
                server: self.name.clone(),
                timeout_secs,
            })??;

        Ok(())
    }

    /// Send a JSON-RPC request and wait for the next response line.
    async fn request(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        let request_id = self.next_request_id();

        let mut request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": request_id,
            "method": method,
        });
        if let Some(params) = params {
            request["params"] = params;
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| McpError::NotReady(self.name.clone()))?;

        let request_str = serde_json::to_string(&request)?;
        stdin
            .write_all(format!("{}\n", request_str).as_bytes())
            .await?;
        stdin.flush().await?;

        let stdout = self
            .stdout
            .as_mut()
            .ok_or_else(|| McpError::NotReady(self.name.clone()))?;

        let mut line = String::new();
        let response: serde_json::Value = loop {
            line.clear();
            let n = stdout.read_line(&mut line).await?;
            if n == 0 {
                return Err(McpError::InvalidResponse(format!(
                    "server '{}' closed its stdout",
                    self.name
                )));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let value: serde_json::Value = serde_json::from_str(trimmed)?;

            // Servers may emit notifications at any time; only the message
            // answering this request id is the response.
            match value.get("id").and_then(|v| v.as_u64()) {
                Some(id) if id == request_id => break value,
                _ => {
                    debug!(server = %self.name, "skipping non-response message");
                    continue;
                }
            }
        };

        if let Some(error) = response.get("error") {
            let code = error.get("code").and_then(|v| v.as_i64()).unwrap_or(-1) as i32;
            let message = error
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");
            return Err(McpError::protocol(code, message));
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| McpError::InvalidResponse(format!("missing result for '{}'", method)))
    }

    /// Send a JSON-RPC notification (no response expected).
    async fn notify(&mut self, method: &str) -> Result<(), McpError> {
        let notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
        });

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| McpError::NotReady(self.name.clone()))?;

        let notification_str = serde_json::to_string(&notification)?;
        stdin
            .write_all(format!("{}\n", notification_str).as_bytes())
            .await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn send_initialize(&mut self) -> Result<ServerInfo, McpError> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "clientInfo": {
                "name": "toolbridge",
                "version": crate::VERSION
            }
        });

        let result = self.request("initialize", Some(params)).await?;

        let server_info = ServerInfo {
            name: result
                .get("serverInfo")
                .and_then(|s| s.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            version: result
                .get("serverInfo")
                .and_then(|s| s.get("version"))
                .and_then(|v| v.as_str())
                .unwrap_or("0.0.0")
                .to_string(),
            protocol_version: result
                .get("protocolVersion")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        };

        self.notify("notifications/initialized").await?;

        Ok(server_info)
    }

    async fn fetch_tools(&mut self) -> Result<(), McpError> {
        let result = self.request("tools/list", None).await?;

        let tools = result
            .get("tools")
            .and_then(|t| t.as_array())
            .cloned()
            .unwrap_or_default();

        self.tools = tools
            .into_iter()
            .filter_map(|t| {
                let name = t.get("name")?.as_str()?.to_string();
                Some(McpToolInfo {
                    name,
                    description: t
                        .get("description")
                        .and_then(|d| d.as_str())
                        .map(|s| s.to_string()),
                    input_schema: t
                        .get("inputSchema")
                        .cloned()
                        .unwrap_or(serde_json::json!({})),
                    server: self.name.clone(),
                })
            })
            .collect();

        Ok(())
    }

    /// Call a tool on this server.
    pub async fn call_tool(
        &mut self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<McpToolResult, McpError> {
        if !self.is_ready() {
            return Err(McpError::NotReady(self.name.clone()));
        }

        let timeout_secs = self.config.tool_timeout_sec;
        let timeout = Duration::from_secs(timeout_secs);

        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments
        });

        let result = tokio::time::timeout(timeout, self.request("tools/call", Some(params)))
            .await
            .map_err(|_| McpError::ToolCallTimeout {
                tool: tool_name.to_string(),
                timeout_secs,
            })?
            .map_err(|e| match e {
                McpError::Protocol { .. } => e,
                other => McpError::tool_failed(tool_name, other.to_string()),
            })?;

        let is_error = result
            .get("isError")
            .and_then(|e| e.as_bool())
            .unwrap_or(false);

        // Recognized shape: a sequence of content parts. Anything else is
        // kept wholesale and serialized as JSON when rendered.
        let content = match result.get("content").and_then(|c| c.as_array()) {
            Some(parts) => parts.iter().cloned().map(McpContent::from_value).collect(),
            None => vec![McpContent::Opaque(result.clone())],
        };

        Ok(McpToolResult { content, is_error })
    }

    /// Close the session and release the process.
    ///
    /// Best-effort: close errors are logged, never raised, so registry
    /// bookkeeping can always complete.
    pub async fn disconnect(&mut self) {
        self.state = ConnectionState::Closing;

        // Dropping stdin closes the session; the server is expected to exit.
        self.stdin = None;
        self.stdout = None;
        self.release_process().await;

        self.tools.clear();
        self.state = ConnectionState::Closed;
        debug!(server = %self.name, "MCP server disconnected");
    }

    async fn release_process(&mut self) {
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.kill().await {
                warn!(server = %self.name, error = %e, "failed to kill MCP server process");
            }
        }
    }
}
