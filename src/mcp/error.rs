// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! MCP error types.

use thiserror::Error;

/// Errors that can occur during MCP operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// Caller referenced a server name with no live connection.
    #[error("MCP server not connected: {0}")]
    ServerNotConnected(String),

    /// Spawn or handshake failure. Fatal to that one connect call only.
    #[error("Failed to connect to MCP server '{server}': {message}")]
    ConnectionFailed { server: String, message: String },

    /// Handshake did not complete in time.
    #[error("Connection to MCP server '{server}' timed out after {timeout_secs}s")]
    ConnectionTimeout { server: String, timeout_secs: u64 },

    /// The remote tool raised, or the transport failed mid-call.
    #[error("Tool call '{tool}' failed: {message}")]
    ToolCallFailed { tool: String, message: String },

    /// Tool call did not complete in time. Treated like any execution failure.
    #[error("Tool call '{tool}' timed out after {timeout_secs}s")]
    ToolCallTimeout { tool: String, timeout_secs: u64 },

    /// Invalid response from server.
    #[error("Invalid response from MCP server: {0}")]
    InvalidResponse(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server is not ready for requests.
    #[error("MCP server '{0}' is not ready")]
    NotReady(String),

    /// Protocol error (JSON-RPC).
    #[error("Protocol error: code={code}, message={message}")]
    Protocol { code: i32, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Create a connection failed error.
    pub fn connection_failed(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a tool call failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolCallFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a protocol error.
    pub fn protocol(code: i32, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }
}
