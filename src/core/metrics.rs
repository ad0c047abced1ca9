use std::sync::OnceLock;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_grade_request(outcome: &'static str) {
    metrics::counter!("grade_requests_total", "outcome" => outcome).increment(1);
}

pub(crate) fn record_ocr(elapsed: Duration, status: &'static str) {
    metrics::histogram!("ocr_duration_seconds", "status" => status).record(elapsed.as_secs_f64());
}

pub(crate) fn record_backend_call(backend: &'static str, status: &'static str, elapsed: Duration) {
    metrics::counter!(
        "grading_backend_calls_total",
        "backend" => backend,
        "status" => status
    )
    .increment(1);
    metrics::histogram!("grading_backend_duration_seconds", "backend" => backend)
        .record(elapsed.as_secs_f64());
}

pub(crate) fn record_submission(status: &'static str) {
    metrics::counter!("submission_records_total", "status" => status).increment(1);
}
