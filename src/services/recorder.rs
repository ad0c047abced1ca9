use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::repositories;
use crate::services::grading::GradingOutcomes;
use crate::services::rubric::EssayType;

/// Audit entry for one answered request. Write-only from the service's side.
#[derive(Debug, Clone)]
pub(crate) struct SubmissionRecord {
    pub(crate) id: Uuid,
    pub(crate) recorded_at: OffsetDateTime,
    pub(crate) topic: String,
    pub(crate) essay_type: EssayType,
    pub(crate) image_keys: Vec<String>,
    pub(crate) ocr_text: String,
    pub(crate) outcomes: GradingOutcomes,
    pub(crate) duration_ms: i64,
}

#[async_trait]
pub(crate) trait SubmissionRecorder: Send + Sync {
    async fn record(&self, entry: SubmissionRecord) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub(crate) struct PgSubmissionRecorder {
    pool: PgPool,
}

impl PgSubmissionRecorder {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionRecorder for PgSubmissionRecorder {
    async fn record(&self, entry: SubmissionRecord) -> anyhow::Result<()> {
        repositories::essays::insert(&self.pool, &entry).await?;
        Ok(())
    }
}
