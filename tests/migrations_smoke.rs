use sqlx::Row;

fn database_url() -> Option<String> {
    dotenvy::dotenv().ok();

    std::env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty())
}

#[tokio::test]
async fn migrations_create_submission_table() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        eprintln!("DATABASE_URL is not set; skipping migrations smoke test");
        return Ok(());
    };

    let pool =
        sqlx::postgres::PgPoolOptions::new().max_connections(1).connect(&database_url).await?;

    let migrations_dir =
        std::env::var("GRADER_MIGRATIONS_DIR").unwrap_or_else(|_| "migrations".to_string());
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(&migrations_dir)).await?;
    migrator.run(&pool).await?;

    let row = sqlx::query("SELECT to_regclass('essay_submissions')::text").fetch_one(&pool).await?;
    let regclass: Option<String> = row.try_get(0)?;
    assert!(regclass.is_some(), "expected essay_submissions to exist after migrations");

    let id = uuid::Uuid::new_v4();
    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO essay_submissions (
            id, created_at, topic, essay_type, image_keys, ocr_text, grade_results, duration_ms
        ) VALUES ($1, NOW() AT TIME ZONE 'UTC', 'topic', 'application-letter',
                  '[\"essays/1_00000000-0000-0000-0000-000000000001_0_a.jpg\"]'::jsonb, 'Dear Peter',
                  '{\"gemini\": {\"status\": \"ok\"}}'::jsonb, 1200)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let row = sqlx::query("SELECT grade_results->'gemini'->>'status' FROM essay_submissions WHERE id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    let status: Option<String> = row.try_get(0)?;
    assert_eq!(status.as_deref(), Some("ok"));
    tx.rollback().await?;

    Ok(())
}
