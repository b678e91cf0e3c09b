// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Toolbridge - connection management and tool-use orchestration for
//! LLM chat applications.
//!
//! Toolbridge connects a chat frontend to external tool servers speaking the
//! Model Context Protocol (MCP) over stdio, and runs the bounded loop that
//! lets a plain-text model call those tools through prompt markers.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Core type definitions (Message, ToolCall, the Provider trait)
//! - [`error`] - Error types and result aliases
//! - [`mcp`] - MCP client, server configuration, and the connection registry
//! - [`prompt`] - Tool prompt construction and tool-call extraction
//! - [`agent`] - The tool-use orchestration loop
//! - [`providers`] - AI provider implementations (OpenAI-compatible APIs)
//! - [`service`] - High-level facade tying registry and loop together
//! - [`telemetry`] - Tracing and logging infrastructure
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toolbridge::providers::create_provider_from_env;
//! use toolbridge::mcp::ServerConfig;
//! use toolbridge::service::ChatService;
//!
//! let provider: Arc<dyn toolbridge::Provider> = create_provider_from_env()?.into();
//! let service = ChatService::new(provider);
//!
//! service
//!     .connect("calc", ServerConfig::new("calc-server"))
//!     .await?;
//!
//! let outcome = service.handle_message(&[], "what is 2+2?").await?;
//! println!("{}", outcome.final_text);
//!
//! service.shutdown().await;
//! ```

pub mod agent;
pub mod error;
pub mod mcp;
pub mod prompt;
pub mod providers;
pub mod service;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at crate root
pub use agent::{LoopOutcome, Orchestrator, OrchestratorConfig, ToolInvocation};
pub use error::{AgentError, ProviderError, Result};
pub use mcp::{ConnectionRegistry, McpConfig, McpError, McpToolInfo, ServerConfig, ToolRouter};
pub use prompt::{build_tool_prompt, parse_tool_call};
pub use providers::{create_provider, create_provider_from_env, OpenAIProvider, ProviderType};
pub use service::ChatService;
pub use types::{BoxedProvider, Message, Provider, ProviderConfig, Role, SharedProvider, ToolCall};

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
