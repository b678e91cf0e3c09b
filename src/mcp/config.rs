// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! MCP server configuration.
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "filesystem": {
//!       "command": "npx",
//!       "args": ["-y", "@modelcontextprotocol/server-filesystem", "/path"],
//!       "env": { "NODE_ENV": "production" }
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::error::McpError;

fn default_startup_timeout() -> u64 {
    30
}

fn default_tool_timeout() -> u64 {
    300
}

/// How to launch one tool server. Immutable once validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Executable or command string.
    pub command: String,

    /// Ordered command arguments.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables, merged over the inherited environment.
    /// Child-specified keys win on conflict.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Handshake timeout in seconds.
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_sec: u64,

    /// Tool call timeout in seconds.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_sec: u64,
}

impl ServerConfig {
    /// Create a configuration for the given command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            startup_timeout_sec: default_startup_timeout(),
            tool_timeout_sec: default_tool_timeout(),
        }
    }

    /// Add command arguments.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Set environment variables.
    pub fn with_env(
        mut self,
        env: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.env = env.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Set the handshake timeout.
    pub fn with_startup_timeout(mut self, secs: u64) -> Self {
        self.startup_timeout_sec = secs;
        self
    }

    /// Set the tool call timeout.
    pub fn with_tool_timeout(mut self, secs: u64) -> Self {
        self.tool_timeout_sec = secs;
        self
    }

    /// Check the configuration shape before it reaches the registry.
    pub fn validate(&self) -> Result<(), McpError> {
        if self.command.trim().is_empty() {
            return Err(McpError::Config(
                "server config requires a non-empty 'command'".to_string(),
            ));
        }
        Ok(())
    }
}

/// A named bundle of server configurations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfig {
    /// Map of server name to server configuration.
    #[serde(rename = "mcpServers", default)]
    pub servers: HashMap<String, ServerConfig>,
}

impl McpConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a configuration bundle from JSON.
    pub fn from_json(json: &str) -> Result<Self, McpError> {
        let config: Self = serde_json::from_str(json)?;
        for (name, server) in &config.servers {
            server
                .validate()
                .map_err(|e| McpError::Config(format!("server '{}': {}", name, e)))?;
        }
        Ok(config)
    }

    /// Load and validate a configuration bundle from a file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, McpError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| McpError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_json(&content)
    }

    /// Add a server configuration.
    pub fn add_server(&mut self, name: impl Into<String>, config: ServerConfig) {
        self.servers.insert(name.into(), config);
    }

    /// Remove a server configuration.
    pub fn remove_server(&mut self, name: &str) -> Option<ServerConfig> {
        self.servers.remove(name)
    }
}
