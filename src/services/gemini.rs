use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::core::config::Settings;

/// Minimal client for the `generateContent` endpoint.
#[derive(Debug, Clone)]
pub(crate) struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub(crate) fn from_settings(settings: &Settings, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(timeout)
            .build()
            .context("Failed to build Gemini HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.gemini().api_key.clone(),
            base_url: settings.gemini().base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends one single-turn request. `Ok(None)` means the call succeeded but
    /// the model produced no text.
    pub(crate) async fn generate(
        &self,
        model: &str,
        parts: Vec<Value>,
        temperature: Option<f64>,
    ) -> Result<Option<String>> {
        let mut payload = json!({
            "contents": [{ "role": "user", "parts": parts }]
        });
        if let Some(temperature) = temperature {
            payload["generationConfig"] = json!({ "temperature": temperature });
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to call Gemini API")?;

        let status = response.status();
        let raw_body = response.text().await.context("Failed to read Gemini response")?;

        if !status.is_success() {
            let parsed = serde_json::from_str::<Value>(&raw_body).unwrap_or(Value::Null);
            return Err(anyhow::anyhow!(
                "Gemini API error (status {}): {}",
                status,
                extract_error_message(&parsed, &raw_body)
            ));
        }

        parse_generate_response(&raw_body)
    }
}

/// Parses a successful response body. Malformed bodies are errors; valid JSON
/// without candidate text is `Ok(None)`.
pub(crate) fn parse_generate_response(raw_body: &str) -> Result<Option<String>> {
    let parsed = serde_json::from_str::<Value>(raw_body).context("Failed to parse Gemini response")?;
    Ok(extract_candidate_text(&parsed))
}

/// Joins the text parts of the first candidate.
pub(crate) fn extract_candidate_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")
        .and_then(|candidates| candidates.get(0))
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)?;

    let text = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");

    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn extract_error_message(parsed: &Value, raw_body: &str) -> String {
    parsed
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| raw_body.chars().take(500).collect())
}
