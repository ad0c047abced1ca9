pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::pipeline::GradingPipeline;
use crate::services::recorder::PgSubmissionRecorder;
use crate::services::storage::{ImageStore, StorageService};
use crate::tasks::background::BackgroundTasks;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let store = StorageService::from_settings(&settings).await?;
    if store.is_none() {
        tracing::warn!("S3 storage is not configured; grading requests will be refused");
    }
    let store = store.map(|service| Arc::new(service) as Arc<dyn ImageStore>);

    let background = BackgroundTasks::new();
    let recorder = Arc::new(PgSubmissionRecorder::new(db_pool.clone()));
    let pipeline = GradingPipeline::from_settings(&settings, store, recorder, background.clone())?;

    let state = AppState::new(settings, db_pool, pipeline, background);
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        max_images = state.pipeline().config().max_images,
        "Essay grader listening"
    );

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            core::shutdown::shutdown_signal().await;
        })
        .await;

    let drain_timeout =
        Duration::from_secs(state.settings().grading().record_drain_timeout_seconds);
    let abandoned = state.background().drain(drain_timeout).await;
    if abandoned > 0 {
        tracing::warn!(abandoned, "Submission records abandoned at shutdown");
    }
    state.db().close().await;
    tracing::info!("Database pool closed");

    result?;

    Ok(())
}
