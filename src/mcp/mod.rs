// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Model Context Protocol (MCP) support.
//!
//! This module implements MCP client functionality for connecting to external
//! tool servers over stdio and routing tool invocations to them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 ConnectionRegistry                  │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐    │
//! │  │ McpClient  │  │ McpClient  │  │ McpClient  │    │
//! │  │ (server1)  │  │ (server2)  │  │ (server3)  │    │
//! │  └─────┬──────┘  └─────┬──────┘  └─────┬──────┘    │
//! └────────┼───────────────┼───────────────┼───────────┘
//!          │               │               │
//!    child process   child process   child process
//!    (JSON-RPC over stdio)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use toolbridge::mcp::{ConnectionRegistry, McpConfig, ServerConfig};
//!
//! let registry = ConnectionRegistry::new();
//!
//! // Connect a server and discover its tools
//! let tools = registry
//!     .connect("filesystem", ServerConfig::new("npx").with_args(["-y", "server-fs"]))
//!     .await?;
//!
//! // Route a tool invocation
//! let text = registry.call_tool("filesystem", "read_file", input).await?;
//!
//! // Teardown at shutdown
//! registry.disconnect_all().await;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use client::McpClient;
pub use config::{McpConfig, ServerConfig};
pub use error::McpError;
pub use registry::{ConnectionRegistry, ToolRouter};
pub use types::*;
