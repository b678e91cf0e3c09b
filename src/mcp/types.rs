// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! MCP types for tool and content handling.

use serde::{Deserialize, Serialize};

/// Information about an MCP tool, as advertised by its owning server.
///
/// `name` is unique per connection, not globally: the same tool name may
/// appear under two different `server` values without conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolInfo {
    /// Tool name.
    pub name: String,

    /// Tool description.
    pub description: Option<String>,

    /// JSON Schema for tool input.
    pub input_schema: serde_json::Value,

    /// Server this tool belongs to.
    pub server: String,
}

/// A single content part of a tool reply.
///
/// Servers return a sequence of typed parts; anything without a textual field
/// is kept opaque and rendered as JSON when normalized to text.
#[derive(Debug, Clone, PartialEq)]
pub enum McpContent {
    /// Plain text content.
    Text(String),

    /// Unrecognized content shape, preserved verbatim.
    Opaque(serde_json::Value),
}

impl McpContent {
    /// Classify a raw content part: textual field wins, everything else is opaque.
    pub fn from_value(value: serde_json::Value) -> Self {
        match value.get("text").and_then(|t| t.as_str()) {
            Some(text) => Self::Text(text.to_string()),
            None => Self::Opaque(value),
        }
    }

    /// Render this part as text.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Opaque(value) => value.to_string(),
        }
    }
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct McpToolResult {
    /// Result content parts, in received order.
    pub content: Vec<McpContent>,

    /// Whether the server flagged this result as an error.
    pub is_error: bool,
}

impl McpToolResult {
    /// Create a successful text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::Text(text.into())],
            is_error: false,
        }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::Text(message.into())],
            is_error: true,
        }
    }

    /// Normalize the reply to text: parts joined with newlines in received order.
    pub fn as_text(&self) -> String {
        self.content
            .iter()
            .map(McpContent::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Server information reported during initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,

    /// Server version.
    pub version: String,

    /// Protocol version supported.
    #[serde(default)]
    pub protocol_version: Option<String>,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            version: "0.0.0".to_string(),
            protocol_version: None,
        }
    }
}

/// Connection state for an MCP server.
///
/// `Connecting → Ready → Closing → Closed`, with `Failed` terminal and
/// reachable only from `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Spawn and handshake in progress.
    Connecting,

    /// Fully initialized and ready for tool calls.
    Ready,

    /// Teardown in progress.
    Closing,

    /// Process released, session gone.
    Closed,

    /// Spawn or handshake failed.
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Ready => write!(f, "ready"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
