use std::fmt;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::core::metrics;
use crate::services::deepseek::DeepSeekClient;
use crate::services::gemini::GeminiClient;
use crate::services::prompt::GradingPrompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum BackendId {
    Gemini,
    DeepSeek,
}

impl BackendId {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            BackendId::Gemini => "gemini",
            BackendId::DeepSeek => "deepseek",
        }
    }

    pub(crate) fn display_name(self) -> &'static str {
        match self {
            BackendId::Gemini => "Gemini",
            BackendId::DeepSeek => "DeepSeek",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub(crate) trait GradingBackend: Send + Sync {
    fn id(&self) -> BackendId;

    /// One single-turn completion for the prompt. Empty completions are errors.
    async fn grade(&self, prompt: &GradingPrompt) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GradingOutcome {
    Report(String),
    Failed(String),
}

impl GradingOutcome {
    pub(crate) fn is_report(&self) -> bool {
        matches!(self, GradingOutcome::Report(_))
    }

    /// Text placed in the backend's response field.
    pub(crate) fn response_text(&self, backend: BackendId) -> String {
        match self {
            GradingOutcome::Report(report) => report.clone(),
            GradingOutcome::Failed(reason) => {
                format!("({} grading failed: {})", backend.display_name(), reason)
            }
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            GradingOutcome::Report(report) => json!({ "status": "ok", "report": report }),
            GradingOutcome::Failed(reason) => json!({ "status": "failed", "error": reason }),
        }
    }
}

/// Both backends' outcomes, labelled by backend. Never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GradingOutcomes {
    pub(crate) gemini: GradingOutcome,
    pub(crate) deepseek: GradingOutcome,
}

impl GradingOutcomes {
    pub(crate) fn to_json(&self) -> serde_json::Value {
        json!({
            "gemini": self.gemini.to_json(),
            "deepseek": self.deepseek.to_json(),
        })
    }
}

/// Runs both backends concurrently on the same prompt and waits for both.
/// A failure or timeout in one never affects the other.
pub(crate) async fn grade_both(
    prompt: &GradingPrompt,
    vision: &dyn GradingBackend,
    reasoning: &dyn GradingBackend,
    timeout: Duration,
) -> GradingOutcomes {
    let (gemini, deepseek) =
        tokio::join!(grade_one(vision, prompt, timeout), grade_one(reasoning, prompt, timeout));

    GradingOutcomes { gemini, deepseek }
}

async fn grade_one(
    backend: &dyn GradingBackend,
    prompt: &GradingPrompt,
    timeout: Duration,
) -> GradingOutcome {
    let id = backend.id();
    let started = Instant::now();

    let outcome = match tokio::time::timeout(timeout, backend.grade(prompt)).await {
        Ok(Ok(report)) => GradingOutcome::Report(report),
        Ok(Err(err)) => GradingOutcome::Failed(format!("{err:#}")),
        Err(_) => GradingOutcome::Failed(format!("timed out after {}s", timeout.as_secs())),
    };

    let elapsed = started.elapsed();
    match &outcome {
        GradingOutcome::Report(report) => {
            tracing::info!(
                backend = %id,
                duration_seconds = elapsed.as_secs_f64(),
                report_chars = report.chars().count(),
                "Grading backend completed"
            );
            metrics::record_backend_call(id.as_str(), "success", elapsed);
        }
        GradingOutcome::Failed(reason) => {
            tracing::warn!(
                backend = %id,
                duration_seconds = elapsed.as_secs_f64(),
                error = %reason,
                "Grading backend failed"
            );
            metrics::record_backend_call(id.as_str(), "failed", elapsed);
        }
    }

    outcome
}

#[derive(Debug, Clone)]
pub(crate) struct GeminiGradingBackend {
    client: GeminiClient,
    model: String,
    temperature: f64,
}

impl GeminiGradingBackend {
    pub(crate) fn new(client: GeminiClient, model: String, temperature: f64) -> Self {
        Self { client, model, temperature }
    }
}

#[async_trait]
impl GradingBackend for GeminiGradingBackend {
    fn id(&self) -> BackendId {
        BackendId::Gemini
    }

    async fn grade(&self, prompt: &GradingPrompt) -> Result<String> {
        let parts = vec![json!({ "text": prompt.as_str() })];
        self.client
            .generate(&self.model, parts, Some(self.temperature))
            .await?
            .ok_or_else(|| anyhow::anyhow!("Gemini returned an empty completion"))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DeepSeekGradingBackend {
    client: DeepSeekClient,
}

impl DeepSeekGradingBackend {
    pub(crate) fn new(client: DeepSeekClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GradingBackend for DeepSeekGradingBackend {
    fn id(&self) -> BackendId {
        BackendId::DeepSeek
    }

    async fn grade(&self, prompt: &GradingPrompt) -> Result<String> {
        self.client
            .complete(prompt.as_str())
            .await?
            .ok_or_else(|| anyhow::anyhow!("DeepSeek returned an empty completion"))
    }
}
