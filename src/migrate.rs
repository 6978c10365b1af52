use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // One row per ingested filename. Re-ingesting a filename replaces the
    // row and all of its blocks.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            filename TEXT PRIMARY KEY,
            role TEXT,
            vendor TEXT NOT NULL DEFAULT 'unknown',
            os_family TEXT NOT NULL DEFAULT 'unknown',
            hostname TEXT NOT NULL DEFAULT 'unknown',
            content_hash TEXT NOT NULL,
            block_count INTEGER NOT NULL,
            ingested_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Parsed configuration blocks, post-redaction.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blocks (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            role TEXT,
            parent_line TEXT NOT NULL,
            header_type TEXT NOT NULL,
            full_text TEXT NOT NULL,
            line_start INTEGER NOT NULL,
            line_end INTEGER NOT NULL,
            has_secret INTEGER NOT NULL DEFAULT 0,
            tags_json TEXT NOT NULL DEFAULT '{}',
            FOREIGN KEY (filename) REFERENCES files(filename)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // FTS5 virtual table over block text
    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='blocks_fts'",
    )
    .fetch_one(&pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE blocks_fts USING fts5(
                block_id UNINDEXED,
                filename UNINDEXED,
                full_text
            )
            "#,
        )
        .execute(&pool)
        .await?;
    }

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_blocks_filename ON blocks(filename)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_blocks_role ON blocks(role)")
        .execute(&pool)
        .await?;

    pool.close().await;
    Ok(())
}
