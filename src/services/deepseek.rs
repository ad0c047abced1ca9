use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::config::Settings;

#[derive(Debug, Clone)]
pub(crate) struct DeepSeekClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl DeepSeekClient {
    pub(crate) fn from_settings(settings: &Settings, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(timeout)
            .build()
            .context("Failed to build DeepSeek HTTP client")?;

        let deepseek = settings.deepseek();
        Ok(Self {
            client,
            api_key: deepseek.api_key.clone(),
            base_url: deepseek.base_url.trim_end_matches('/').to_string(),
            model: deepseek.model.clone(),
            temperature: deepseek.temperature,
            max_tokens: deepseek.max_tokens,
        })
    }

    /// Single user-turn chat completion. `Ok(None)` when the reply has no content.
    pub(crate) async fn complete(&self, prompt: &str) -> Result<Option<String>> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to call DeepSeek API")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("DeepSeek API error (status {}): {}", status, truncate(&text, 500));
        }

        let parsed: ChatResponse =
            response.json().await.context("Failed to parse DeepSeek response")?;
        Ok(first_choice_content(parsed))
    }
}

fn first_choice_content(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
