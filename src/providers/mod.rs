// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! AI provider implementations.
//!
//! Every backend this crate talks to speaks the OpenAI Chat Completions
//! dialect, so a single [`OpenAIProvider`] covers OpenAI, Cerebras, Ollama,
//! and anything else with a compatible endpoint.
//!
//! # Quick Start
//!
//! Just set an environment variable and go:
//!
//! ```bash
//! # For Cerebras
//! export CEREBRAS_API_KEY=your-key
//!
//! # For OpenAI
//! export OPENAI_API_KEY=your-key
//!
//! # For Ollama (no key needed, just have it running)
//! ```
//!
//! Then in code:
//!
//! ```rust,ignore
//! use toolbridge::providers::create_provider_from_env;
//!
//! let provider = create_provider_from_env()?;
//! let reply = provider.complete(&messages).await?;
//! ```

pub mod openai;

pub use openai::OpenAIProvider;

use crate::error::ProviderError;
use crate::types::{BoxedProvider, ProviderConfig};

/// Supported provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// OpenAI GPT models
    OpenAI,
    /// Cerebras inference API
    Cerebras,
    /// Ollama local models
    Ollama,
    /// Any OpenAI-compatible API
    OpenAICompatible,
}

impl ProviderType {
    /// Get the default model for this provider.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o",
            Self::Cerebras => "llama-3.3-70b",
            Self::Ollama => "llama3.2",
            Self::OpenAICompatible => "gpt-4o",
        }
    }

    /// Get the default base URL for this provider.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAI => openai::OPENAI_BASE_URL,
            Self::Cerebras => openai::CEREBRAS_BASE_URL,
            Self::Ollama => openai::OLLAMA_BASE_URL,
            Self::OpenAICompatible => openai::OPENAI_BASE_URL,
        }
    }

    /// Check if this provider requires an API key.
    pub fn requires_api_key(&self) -> bool {
        match self {
            Self::OpenAI | Self::Cerebras => true,
            Self::Ollama | Self::OpenAICompatible => false,
        }
    }
}

/// Error type for parsing a provider type from a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProviderTypeError;

impl std::fmt::Display for ParseProviderTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid provider type")
    }
}

impl std::error::Error for ParseProviderTypeError {}

impl std::str::FromStr for ProviderType {
    type Err = ParseProviderTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "gpt" => Ok(Self::OpenAI),
            "cerebras" => Ok(Self::Cerebras),
            "ollama" => Ok(Self::Ollama),
            "openai-compatible" | "openai_compatible" => Ok(Self::OpenAICompatible),
            _ => Err(ParseProviderTypeError),
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI => write!(f, "OpenAI"),
            Self::Cerebras => write!(f, "Cerebras"),
            Self::Ollama => write!(f, "Ollama"),
            Self::OpenAICompatible => write!(f, "OpenAI-Compatible"),
        }
    }
}

/// Create a provider instance from type and configuration.
///
/// # Errors
///
/// Returns an error if required configuration is missing (e.g., API key for
/// OpenAI/Cerebras, base_url for OpenAI-Compatible).
pub fn create_provider(
    provider_type: ProviderType,
    config: ProviderConfig,
) -> Result<BoxedProvider, ProviderError> {
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| provider_type.default_model().to_string());

    let api_key = if provider_type.requires_api_key() {
        let key = config.api_key.clone().ok_or_else(|| {
            ProviderError::NotConfigured(format!("API key required for {}", provider_type))
        })?;
        Some(key)
    } else {
        config.api_key.clone()
    };

    let base_url = match (&config.base_url, provider_type) {
        (Some(url), _) => url.clone(),
        (None, ProviderType::OpenAICompatible) => {
            return Err(ProviderError::NotConfigured(
                "base_url required for OpenAI-Compatible".to_string(),
            ))
        }
        (None, _) => provider_type.default_base_url().to_string(),
    };

    Ok(Box::new(OpenAIProvider::new(api_key, model, base_url, config)?))
}

/// Create a provider from environment variables with smart defaults.
///
/// # Detection Order
///
/// 1. Check `TOOLBRIDGE_PROVIDER` env var for explicit provider selection
/// 2. Check `CEREBRAS_API_KEY` → use Cerebras
/// 3. Check `OPENAI_API_KEY` → use OpenAI
/// 4. Default to Ollama (works if it is running locally)
///
/// # Environment Variables
///
/// | Variable | Description |
/// |----------|-------------|
/// | `TOOLBRIDGE_PROVIDER` | Override provider: `cerebras`, `openai`, `ollama` |
/// | `TOOLBRIDGE_MODEL` | Override default model |
/// | `CEREBRAS_API_KEY` | Cerebras API key |
/// | `OPENAI_API_KEY` | OpenAI API key |
/// | `OPENAI_BASE_URL` | Custom OpenAI-compatible base URL |
/// | `OLLAMA_BASE_URL` | Custom Ollama URL (default: localhost:11434) |
pub fn create_provider_from_env() -> Result<BoxedProvider, ProviderError> {
    let provider_type = std::env::var("TOOLBRIDGE_PROVIDER")
        .ok()
        .and_then(|p| p.parse().ok());

    let provider_type = provider_type.unwrap_or_else(|| {
        if std::env::var("CEREBRAS_API_KEY").is_ok() {
            ProviderType::Cerebras
        } else if std::env::var("OPENAI_API_KEY").is_ok() {
            ProviderType::OpenAI
        } else {
            ProviderType::Ollama
        }
    });

    let model = std::env::var("TOOLBRIDGE_MODEL")
        .unwrap_or_else(|_| provider_type.default_model().to_string());

    let config = match provider_type {
        ProviderType::Cerebras => {
            let api_key = std::env::var("CEREBRAS_API_KEY").map_err(|_| {
                ProviderError::NotConfigured(
                    "CEREBRAS_API_KEY not set. Set it or use TOOLBRIDGE_PROVIDER=ollama for local models.".to_string(),
                )
            })?;
            ProviderConfig {
                api_key: Some(api_key),
                model: Some(model),
                ..Default::default()
            }
        }
        ProviderType::OpenAI => {
            let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
                ProviderError::NotConfigured(
                    "OPENAI_API_KEY not set. Set it or use TOOLBRIDGE_PROVIDER=ollama for local models.".to_string(),
                )
            })?;
            ProviderConfig {
                api_key: Some(api_key),
                model: Some(model),
                base_url: std::env::var("OPENAI_BASE_URL").ok(),
                ..Default::default()
            }
        }
        ProviderType::Ollama => ProviderConfig {
            model: Some(model),
            base_url: std::env::var("OLLAMA_BASE_URL").ok(),
            ..Default::default()
        },
        ProviderType::OpenAICompatible => {
            let base_url = std::env::var("OPENAI_BASE_URL").map_err(|_| {
                ProviderError::NotConfigured(
                    "OPENAI_BASE_URL required for OpenAI-Compatible provider".to_string(),
                )
            })?;
            ProviderConfig {
                api_key: std::env::var("OPENAI_API_KEY").ok(),
                model: Some(model),
                base_url: Some(base_url),
                ..Default::default()
            }
        }
    };

    create_provider(provider_type, config)
}

/// Convenience function to create a Cerebras provider.
pub fn cerebras(
    api_key: impl Into<String>,
    model: impl Into<String>,
) -> Result<BoxedProvider, ProviderError> {
    create_provider(ProviderType::Cerebras, ProviderConfig::new(api_key, model))
}

/// Convenience function to create an OpenAI provider.
pub fn openai_provider(
    api_key: impl Into<String>,
    model: impl Into<String>,
) -> Result<BoxedProvider, ProviderError> {
    create_provider(ProviderType::OpenAI, ProviderConfig::new(api_key, model))
}

/// Convenience function to create an Ollama provider.
///
/// No API key needed, just have Ollama running locally.
pub fn ollama(model: impl Into<String>) -> Result<BoxedProvider, ProviderError> {
    let config = ProviderConfig {
        model: Some(model.into()),
        ..Default::default()
    };
    create_provider(ProviderType::Ollama, config)
}
