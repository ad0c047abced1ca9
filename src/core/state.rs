use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::pipeline::GradingPipeline;
use crate::tasks::background::BackgroundTasks;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    pipeline: GradingPipeline,
    background: BackgroundTasks,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        pipeline: GradingPipeline,
        background: BackgroundTasks,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, pipeline, background }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn pipeline(&self) -> &GradingPipeline {
        &self.inner.pipeline
    }

    pub(crate) fn background(&self) -> &BackgroundTasks {
        &self.inner.background
    }
}
