use axum::{extract::State, http::StatusCode, response::Html, response::IntoResponse, Json};
use std::collections::HashMap;
use std::time::Duration;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::schemas::HealthResponse;

const INDEX_HTML: &str = include_str!("assets/index.html");
const DB_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Authoring page. The photo limit is filled in from settings.
pub(crate) async fn root(State(state): State<AppState>) -> Html<String> {
    let max_images = state.pipeline().config().max_images;
    Html(INDEX_HTML.replace("__MAX_IMAGES__", &max_images.to_string()))
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut status = "healthy";
    let mut components = HashMap::new();

    let ping = tokio::time::timeout(DB_HEALTH_TIMEOUT, sqlx::query("SELECT 1").execute(state.db()));
    match ping.await {
        Ok(Ok(_)) => {
            components.insert("database".to_string(), "healthy".to_string());
        }
        Ok(Err(err)) => {
            components.insert("database".to_string(), format!("unhealthy: {err}"));
            status = "unhealthy";
        }
        Err(_) => {
            components.insert("database".to_string(), "unhealthy: timed out".to_string());
            status = "unhealthy";
        }
    }

    let mut component = |name: &str, ok: bool, missing: &str| {
        let value = if ok { "configured".to_string() } else { missing.to_string() };
        components.insert(name.to_string(), value);
        if !ok && status == "healthy" {
            status = "degraded";
        }
    };
    component("storage", state.pipeline().storage_configured(), "not configured");
    component("gemini", !state.settings().gemini().api_key.is_empty(), "missing api key");
    component("deepseek", !state.settings().deepseek().api_key.is_empty(), "missing api key");

    Json(HealthResponse {
        service: "essay-grader".to_string(),
        status: status.to_string(),
        components,
    })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
