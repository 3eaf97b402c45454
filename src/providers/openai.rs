// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Client for OpenAI-compatible chat completion APIs (DeepSeek, OpenRouter)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{CompletionRequest, CompletionService, UserContent};
use crate::{NomnomError, Result};

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: Option<String>, max_tokens: u32, temperature: f32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        let base_url = base_url
            .trim_end_matches('/')
            .trim_end_matches("/chat/completions")
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key,
            max_tokens,
            temperature,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_body<'a>(&self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        let user = match &request.content {
            UserContent::Text(text) => json!({ "role": "user", "content": text }),
            UserContent::Image { base64, media_type } => json!({
                "role": "user",
                "content": [{
                    "type": "image_url",
                    "image_url": { "url": format!("data:{};base64,{}", media_type, base64) }
                }]
            }),
        };

        ChatRequest {
            model: &request.model,
            messages: vec![
                json!({ "role": "system", "content": request.system_prompt }),
                user,
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Sending chat completion to {}: model={}", self.base_url, request.model);

        let mut builder = self
            .client
            .post(&url)
            .timeout(request.timeout)
            .json(&self.chat_body(request));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NomnomError::Completion(format!(
                "{} returned status {}: {}",
                self.base_url,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let result: ChatResponse = response.json().await?;
        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| NomnomError::Completion("response contained no choices".to_string()))
    }
}
