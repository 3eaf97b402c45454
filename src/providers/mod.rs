// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Completion service bindings
//!
//! Every backend implements [`CompletionService`]. [`Provider`] is the
//! closed set of bindings the command line can select from configuration.

pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::config::AiConfig;
use crate::{NomnomError, Result};

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.2";

/// What the user message of a request carries
#[derive(Debug, Clone, PartialEq)]
pub enum UserContent {
    Text(String),
    /// Base64 encoded image without a data-URL header
    Image { base64: String, media_type: String },
}

/// One completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub content: UserContent,
    pub model: String,
    pub timeout: Duration,
}

/// A text or vision completion backend
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Send one request and return the raw response text
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Configured provider name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    DeepSeek,
    Ollama,
    OpenRouter,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenRouter => "openrouter",
        };
        f.write_str(name)
    }
}

/// The provider bindings, selected once at startup
pub enum Provider {
    DeepSeek(OpenAiClient),
    Ollama(OllamaClient),
    OpenRouter(OpenAiClient),
}

impl Provider {
    /// Build the configured provider, reading credentials from the
    /// environment when the config has none
    pub fn from_config(ai: &AiConfig) -> Result<Self> {
        Self::from_config_with(ai, |var| std::env::var(var).ok())
    }

    /// As [`Provider::from_config`] with an explicit environment lookup
    pub fn from_config_with(ai: &AiConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider = match ai.provider {
            ProviderKind::DeepSeek => {
                let key = resolve_api_key(ai.api_key.as_deref(), "DEEPSEEK_API_KEY", &env)?;
                let base = ai.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL);
                Provider::DeepSeek(OpenAiClient::new(base, Some(key), ai.max_tokens, ai.temperature)?)
            }
            ProviderKind::OpenRouter => {
                if ai.model.trim().is_empty() {
                    return Err(NomnomError::Config(
                        "ai.model is required for the openrouter provider".into(),
                    ));
                }
                let key = resolve_api_key(ai.api_key.as_deref(), "OPENROUTER_API_KEY", &env)?;
                let base = ai.base_url.as_deref().unwrap_or(OPENROUTER_BASE_URL);
                Provider::OpenRouter(OpenAiClient::new(base, Some(key), ai.max_tokens, ai.temperature)?)
            }
            ProviderKind::Ollama => {
                let base = ai
                    .base_url
                    .clone()
                    .or_else(|| env("OLLAMA_HOST"))
                    .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string());
                Provider::Ollama(OllamaClient::new(&base, ai.temperature)?)
            }
        };

        info!("Using {} provider with model {}", ai.provider, default_model(ai));
        Ok(provider)
    }
}

/// Model name for a config, falling back to the provider's default
pub fn default_model(ai: &AiConfig) -> String {
    if !ai.model.trim().is_empty() {
        return ai.model.trim().to_string();
    }
    match ai.provider {
        ProviderKind::DeepSeek => DEEPSEEK_DEFAULT_MODEL.to_string(),
        ProviderKind::Ollama => OLLAMA_DEFAULT_MODEL.to_string(),
        ProviderKind::OpenRouter => String::new(),
    }
}

fn resolve_api_key(
    explicit: Option<&str>,
    env_var: &str,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<String> {
    explicit
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| env(env_var).filter(|k| !k.trim().is_empty()))
        .ok_or_else(|| {
            NomnomError::Credentials(format!("set ai.api_key in the config or {}", env_var))
        })
}

#[async_trait]
impl CompletionService for Provider {
    fn name(&self) -> &'static str {
        match self {
            Provider::DeepSeek(_) => "deepseek",
            Provider::Ollama(_) => "ollama",
            Provider::OpenRouter(_) => "openrouter",
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        match self {
            Provider::DeepSeek(client) | Provider::OpenRouter(client) => client.complete(request).await,
            Provider::Ollama(client) => client.complete(request).await,
        }
    }
}
