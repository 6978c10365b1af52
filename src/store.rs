//! Chunk store: persistence and retrieval of parsed blocks.
//!
//! The comparison and question-answering paths depend only on the
//! [`ChunkStore`] trait; [`SqliteStore`] is the shipped implementation,
//! backed by SQLite with an FTS5 keyword index. The store is an explicit
//! handle the caller passes around, never process-global state.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{ConfigBlock, FileMetadata, FileRecord, TaggedBlock};

/// Retrieval and indexing contract for stored configuration blocks.
///
/// `retrieve` returns at most `k` blocks and makes no completeness
/// guarantee; callers that need every block of a file use
/// [`blocks_for_file`](ChunkStore::blocks_for_file) instead.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Replace the stored blocks for `meta.filename` with `blocks`.
    async fn index_file(
        &self,
        meta: &FileMetadata,
        role: Option<&str>,
        content_hash: &str,
        blocks: &[TaggedBlock],
    ) -> Result<()>;

    /// Top-`k` blocks for a free-text query, optionally scoped by role
    /// and/or source filename.
    async fn retrieve(
        &self,
        query: &str,
        role: Option<&str>,
        source: Option<&str>,
        k: i64,
    ) -> Result<Vec<TaggedBlock>>;

    /// Every stored block for one filename, in source order, optionally
    /// restricted to a role.
    async fn blocks_for_file(&self, role: Option<&str>, source: &str) -> Result<Vec<TaggedBlock>>;

    /// Content hash recorded at ingest time, if the file is known.
    async fn content_hash(&self, filename: &str) -> Result<Option<String>>;

    /// All ingested files, most recently ingested first.
    async fn list_files(&self) -> Result<Vec<FileRecord>>;
}

/// Reduce a free-text request to an FTS5 MATCH expression.
///
/// Natural-language prompts carry punctuation (quotes, dots, slashes) that
/// FTS5 rejects as query syntax, so only bare alphanumeric terms survive,
/// deduplicated and joined with OR. Returns `None` when nothing survives.
pub fn sanitize_match_query(query: &str) -> Option<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in query.split(|c: char| !c.is_ascii_alphanumeric()) {
        if term.is_empty() {
            continue;
        }
        let term = term.to_lowercase();
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

const BLOCK_COLUMNS: &str = "b.filename, b.role, b.parent_line, b.header_type, b.full_text, \
                             b.line_start, b.line_end, b.has_secret, b.tags_json";

/// SQLite-backed store over the `files`/`blocks`/`blocks_fts` tables.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn row_to_block(row: &SqliteRow) -> TaggedBlock {
        let full_text: String = row.get("full_text");
        let body_lines: Vec<String> = full_text.lines().skip(1).map(|s| s.to_string()).collect();
        let tags_json: String = row.get("tags_json");
        let tags: BTreeMap<String, String> = serde_json::from_str(&tags_json).unwrap_or_default();
        let line_start: i64 = row.get("line_start");
        let line_end: i64 = row.get("line_end");

        TaggedBlock {
            block: ConfigBlock {
                parent_line: row.get("parent_line"),
                header_type: row.get("header_type"),
                body_lines,
                full_text,
                line_start: line_start as usize,
                line_end: line_end as usize,
                has_secret: row.get("has_secret"),
            },
            role: row.get("role"),
            source_file: row.get("filename"),
            tags,
        }
    }
}

#[async_trait]
impl ChunkStore for SqliteStore {
    async fn index_file(
        &self,
        meta: &FileMetadata,
        role: Option<&str>,
        content_hash: &str,
        blocks: &[TaggedBlock],
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        // Old blocks and FTS entries go first so the file row can be
        // replaced without tripping the foreign key.
        sqlx::query("DELETE FROM blocks_fts WHERE filename = ?")
            .bind(&meta.filename)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM blocks WHERE filename = ?")
            .bind(&meta.filename)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO files (filename, role, vendor, os_family, hostname, content_hash, block_count, ingested_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(filename) DO UPDATE SET
                role = excluded.role,
                vendor = excluded.vendor,
                os_family = excluded.os_family,
                hostname = excluded.hostname,
                content_hash = excluded.content_hash,
                block_count = excluded.block_count,
                ingested_at = excluded.ingested_at
            "#,
        )
        .bind(&meta.filename)
        .bind(role)
        .bind(&meta.vendor)
        .bind(&meta.os_family)
        .bind(&meta.hostname)
        .bind(content_hash)
        .bind(blocks.len() as i64)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for tagged in blocks {
            let id = Uuid::new_v4().to_string();
            let tags_json = serde_json::to_string(&tagged.tags)?;
            sqlx::query(
                r#"
                INSERT INTO blocks (id, filename, role, parent_line, header_type, full_text, line_start, line_end, has_secret, tags_json)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(&meta.filename)
            .bind(tagged.role.as_deref())
            .bind(&tagged.block.parent_line)
            .bind(&tagged.block.header_type)
            .bind(&tagged.block.full_text)
            .bind(tagged.block.line_start as i64)
            .bind(tagged.block.line_end as i64)
            .bind(tagged.block.has_secret)
            .bind(&tags_json)
            .execute(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO blocks_fts (block_id, filename, full_text) VALUES (?, ?, ?)")
                .bind(&id)
                .bind(&meta.filename)
                .bind(&tagged.block.full_text)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn retrieve(
        &self,
        query: &str,
        role: Option<&str>,
        source: Option<&str>,
        k: i64,
    ) -> Result<Vec<TaggedBlock>> {
        let rows = match sanitize_match_query(query) {
            Some(match_query) => {
                let sql = format!(
                    r#"
                    SELECT {BLOCK_COLUMNS}
                    FROM blocks_fts
                    JOIN blocks b ON b.id = blocks_fts.block_id
                    WHERE blocks_fts MATCH ?
                      AND (? IS NULL OR b.role = ?)
                      AND (? IS NULL OR b.filename = ?)
                    ORDER BY rank, b.filename, b.line_start
                    LIMIT ?
                    "#
                );
                sqlx::query(&sql)
                    .bind(&match_query)
                    .bind(role)
                    .bind(role)
                    .bind(source)
                    .bind(source)
                    .bind(k)
                    .fetch_all(&self.pool)
                    .await?
            }
            // No usable terms: fall back to a deterministic source-order
            // slice instead of failing the request.
            None => {
                let sql = format!(
                    r#"
                    SELECT {BLOCK_COLUMNS}
                    FROM blocks b
                    WHERE (? IS NULL OR b.role = ?)
                      AND (? IS NULL OR b.filename = ?)
                    ORDER BY b.filename, b.line_start
                    LIMIT ?
                    "#
                );
                sqlx::query(&sql)
                    .bind(role)
                    .bind(role)
                    .bind(source)
                    .bind(source)
                    .bind(k)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.iter().map(Self::row_to_block).collect())
    }

    async fn blocks_for_file(&self, role: Option<&str>, source: &str) -> Result<Vec<TaggedBlock>> {
        let sql = format!(
            r#"
            SELECT {BLOCK_COLUMNS}
            FROM blocks b
            WHERE b.filename = ?
              AND (? IS NULL OR b.role = ?)
            ORDER BY b.line_start
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(source)
            .bind(role)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(Self::row_to_block).collect())
    }

    async fn content_hash(&self, filename: &str) -> Result<Option<String>> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT content_hash FROM files WHERE filename = ?")
                .bind(filename)
                .fetch_optional(&self.pool)
                .await?;
        Ok(hash)
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT filename, role, vendor, os_family, hostname, content_hash, block_count, ingested_at
            FROM files
            ORDER BY ingested_at DESC, filename ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| FileRecord {
                filename: row.get("filename"),
                role: row.get("role"),
                vendor: row.get("vendor"),
                os_family: row.get("os_family"),
                hostname: row.get("hostname"),
                block_count: row.get("block_count"),
                content_hash: row.get("content_hash"),
                ingested_at: row.get("ingested_at"),
            })
            .collect())
    }
}
