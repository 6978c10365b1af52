//! Single-file block inspection.
//!
//! Prints every stored block of one ingested file in citation form:
//! a `**filename** (Line start-end)` header over the redacted block text.
//! Line numbers are the zero-based source indexes recorded at parse time.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::db;
use crate::store::{ChunkStore, SqliteStore};

pub async fn run_show(config: &Config, filename: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    if store.content_hash(filename).await?.is_none() {
        store.close().await;
        bail!("file not found: {}", filename);
    }

    let blocks = store.blocks_for_file(None, filename).await?;
    let record = store
        .list_files()
        .await?
        .into_iter()
        .find(|f| f.filename == filename);

    println!("--- {} ---", filename);
    if let Some(rec) = record {
        println!("role:      {}", rec.role.as_deref().unwrap_or("-"));
        println!("vendor:    {}", rec.vendor);
        println!("os_family: {}", rec.os_family);
        println!("hostname:  {}", rec.hostname);
        println!("hash:      {}", rec.content_hash);
        println!("ingested:  {}", format_ts_iso(rec.ingested_at));
    }
    println!("blocks:    {}", blocks.len());
    println!();

    for tagged in &blocks {
        let redacted = if tagged.block.has_secret {
            " [redacted]"
        } else {
            ""
        };
        println!(
            "**{}** (Line {}-{}){}",
            tagged.source_file, tagged.block.line_start, tagged.block.line_end, redacted
        );
        println!("```");
        println!("{}", tagged.block.full_text);
        println!("```");
        println!();
    }

    store.close().await;
    Ok(())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
