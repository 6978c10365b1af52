//! Ingested file listing.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store::{ChunkStore, SqliteStore};

pub async fn run_files(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let files = store.list_files().await?;

    if files.is_empty() {
        println!("No files ingested.");
        store.close().await;
        return Ok(());
    }

    println!(
        "{:<28} {:<10} {:<10} {:<16} {:>6}  {:<14} {}",
        "FILENAME", "ROLE", "VENDOR", "HOSTNAME", "BLOCKS", "HASH", "INGESTED"
    );
    for file in &files {
        println!(
            "{:<28} {:<10} {:<10} {:<16} {:>6}  {:<14} {}",
            file.filename,
            file.role.as_deref().unwrap_or("-"),
            file.vendor,
            file.hostname,
            file.block_count,
            short_hash(&file.content_hash),
            format_ts_iso(file.ingested_at),
        );
    }

    store.close().await;
    Ok(())
}

fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(12)]
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
