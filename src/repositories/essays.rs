use sqlx::PgPool;

use crate::core::time::to_primitive_utc;
use crate::services::recorder::SubmissionRecord;

pub(crate) async fn insert(pool: &PgPool, record: &SubmissionRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO essay_submissions (
            id, created_at, topic, essay_type, image_keys, ocr_text, grade_results, duration_ms
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
    )
    .bind(record.id)
    .bind(to_primitive_utc(record.recorded_at))
    .bind(&record.topic)
    .bind(record.essay_type.as_str())
    .bind(sqlx::types::Json(&record.image_keys))
    .bind(&record.ocr_text)
    .bind(sqlx::types::Json(record.outcomes.to_json()))
    .bind(record.duration_ms)
    .execute(pool)
    .await?;
    Ok(())
}
