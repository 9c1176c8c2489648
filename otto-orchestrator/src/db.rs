use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create pipelines table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipelines (
            id UUID PRIMARY KEY,
            project_id VARCHAR(255) NOT NULL,
            name VARCHAR(255) NOT NULL,
            content TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create webhook bindings table. `seq` keeps insertion order for
    // first-match lookups; bindings are never deleted.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS webhook_bindings (
            id UUID PRIMARY KEY,
            seq BIGSERIAL NOT NULL,
            pipeline_id UUID NOT NULL,
            project_id VARCHAR(255) NOT NULL,
            github_repo_id BIGINT NOT NULL,
            github_repo_name VARCHAR(255) NOT NULL,
            trigger_branch VARCHAR(255) NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL,
            last_triggered_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create runs table. Runs outlive their pipeline, so no foreign key.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_runs (
            id UUID PRIMARY KEY,
            pipeline_id UUID NOT NULL,
            run_number INTEGER NOT NULL,
            trigger VARCHAR(20) NOT NULL,
            trigger_by VARCHAR(255) NOT NULL,
            status VARCHAR(20) NOT NULL,
            started_at TIMESTAMPTZ NOT NULL,
            completed_at TIMESTAMPTZ,
            duration_secs BIGINT,
            webhook_data JSONB,
            pipeline_snapshot TEXT NOT NULL,
            logs_url TEXT,
            result_message TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            UNIQUE (pipeline_id, run_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create logs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS run_logs (
            id BIGSERIAL PRIMARY KEY,
            run_id UUID NOT NULL REFERENCES pipeline_runs(id) ON DELETE CASCADE,
            timestamp TIMESTAMPTZ NOT NULL,
            level VARCHAR(10) NOT NULL,
            message TEXT NOT NULL,
            source VARCHAR(255)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for better query performance
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_bindings_lookup ON webhook_bindings(github_repo_id, trigger_branch) WHERE is_active",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_bindings_project_id ON webhook_bindings(project_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_runs_pipeline_started ON pipeline_runs(pipeline_id, started_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_run_logs_run_id ON run_logs(run_id, timestamp)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
