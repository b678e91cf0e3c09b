// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core types for toolbridge.
//!
//! This module defines the fundamental data structures used throughout the
//! crate: conversation messages, the tool call parsed from model output, and
//! the provider abstraction for model inference.

use serde::{Deserialize, Serialize};

use async_trait::async_trait;

use crate::error::ProviderError;

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A message in a conversation.
///
/// The orchestrator's working conversation is an ordered, append-only sequence
/// of these; persistence belongs to the host, not this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

// ============================================================================
// Tool Call
// ============================================================================

/// A tool request parsed from model output.
///
/// Transient: exists only for the duration of one loop iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name the model asked for.
    pub name: String,
    /// Argument mapping to forward to the tool.
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl ToolCall {
    /// Create a tool call with the given name and arguments.
    pub fn new(name: impl Into<String>, arguments: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for an AI provider instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL for the API endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model identifier to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Request timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ProviderConfig {
    /// Create a new provider config with just an API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Create a new provider config with API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            model: Some(model.into()),
            ..Default::default()
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set the max tokens.
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Trait that all AI providers must implement.
///
/// This is the model-inference interface the orchestrator consumes: an ordered
/// list of messages in, text out. Tool use is negotiated entirely through
/// prompt text (see [`crate::prompt`]), so providers need no function-calling
/// support of their own.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send a chat completion request and return the model's full reply text.
    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError>;

    /// Send a streaming chat completion request.
    ///
    /// `on_text` is invoked for each text fragment as it arrives; the returned
    /// string is the concatenation of all fragments and equals what
    /// [`Provider::complete`] would have produced.
    async fn stream_complete(
        &self,
        messages: &[Message],
        on_text: Box<dyn for<'a> Fn(&'a str) + Send + Sync>,
    ) -> Result<String, ProviderError>;

    /// Get the name of this provider for display purposes.
    fn name(&self) -> &str;

    /// Get the current model being used.
    fn model(&self) -> &str;
}

/// A boxed provider for dynamic dispatch.
pub type BoxedProvider = Box<dyn Provider>;

/// Arc-wrapped provider for shared ownership.
pub type SharedProvider = std::sync::Arc<dyn Provider>;
