// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Ollama API client for local AI inference

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{CompletionRequest, CompletionService, UserContent};
use crate::{NomnomError, Result};

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<&'a str>>,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(base_url: &str, temperature: f32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        // Normalize URL
        let base_url = base_url
            .trim_end_matches('/')
            .replace("/api/generate", "")
            .replace("/api/chat", "");

        Ok(Self {
            client,
            base_url,
            temperature,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                NomnomError::Completion(format!(
                    "Cannot connect to Ollama at {}: {}",
                    self.base_url, e
                ))
            })?;

        Ok(())
    }

    /// List available models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await?;
        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// True if `model` is installed. A bare name matches any of its tags.
    pub async fn has_model(&self, model: &str) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(model_installed(&models, model))
    }

    fn chat_body<'a>(&self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        let user = match &request.content {
            UserContent::Text(text) => ChatMessage {
                role: "user",
                content: text,
                images: None,
            },
            // text alongside the image confuses most vision models
            UserContent::Image { base64, .. } => ChatMessage {
                role: "user",
                content: "",
                images: Some(vec![base64.as_str()]),
            },
        };

        ChatRequest {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                    images: None,
                },
                user,
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        }
    }
}

fn model_installed(installed: &[String], model: &str) -> bool {
    installed.iter().any(|name| {
        if name == model {
            return true;
        }
        !model.contains(':')
            && name
                .strip_prefix(model)
                .is_some_and(|tag| tag.starts_with(':'))
    })
}

#[async_trait]
impl CompletionService for OllamaClient {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        debug!("Sending request to Ollama: model={}", request.model);

        let response = self
            .client
            .post(&url)
            .timeout(request.timeout)
            .json(&self.chat_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NomnomError::Completion(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let result: ChatResponse = response.json().await?;
        Ok(result.message.content)
    }
}
