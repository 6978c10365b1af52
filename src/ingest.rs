//! Ingestion pipeline orchestration.
//!
//! Coordinates the full ingest flow: file discovery → text extraction →
//! redaction → block parsing → metadata detection → storage. Per-file
//! failures are logged and skipped so one unreadable capture does not
//! abort a directory run.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::db;
use crate::extract::extract_text;
use crate::metadata::detect_metadata;
use crate::models::TaggedBlock;
use crate::parser::parse_blocks;
use crate::redact::Redactor;
use crate::store::{ChunkStore, SqliteStore};

/// Stored filenames keep only alphanumerics, dots, underscores and
/// hyphens; everything else becomes an underscore. Filenames are the
/// primary key for re-ingest replacement, so they must be stable.
pub fn clean_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Parse one `--tag key=value` argument.
pub fn parse_tag(spec: &str) -> Result<(String, String)> {
    let Some((key, value)) = spec.split_once('=') else {
        bail!("Invalid tag '{}': expected key=value", spec);
    };
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        bail!("Invalid tag '{}': expected key=value", spec);
    }
    Ok((key.to_string(), value.to_string()))
}

pub async fn run_ingest(
    config: &Config,
    path: &Path,
    role: Option<&str>,
    extra_tags: &[(String, String)],
    dry_run: bool,
) -> Result<()> {
    if !path.exists() {
        bail!("Path does not exist: {}", path.display());
    }

    let candidates = if path.is_dir() {
        scan_directory(config, path)?
    } else {
        vec![path.to_path_buf()]
    };

    let redactor = Redactor::with_extra_rules(&config.redaction.extra_rules);

    if dry_run {
        println!("ingest {} (dry-run)", path.display());
        println!("  files found: {}", candidates.len());
        let mut total_blocks = 0usize;
        for file in &candidates {
            if let Ok(bytes) = std::fs::read(file) {
                if let Ok(text) = extract_text(&bytes, file) {
                    total_blocks += parse_blocks(&text, &redactor).len();
                }
            }
        }
        println!("  estimated blocks: {}", total_blocks);
        return Ok(());
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let mut files_ingested = 0u64;
    let mut blocks_written = 0u64;
    let mut blocks_redacted = 0u64;
    let mut files_skipped = 0u64;

    for file in &candidates {
        let bytes = match std::fs::read(file) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "skipping unreadable file");
                files_skipped += 1;
                continue;
            }
        };

        let text = match extract_text(&bytes, file) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "skipping file");
                files_skipped += 1;
                continue;
            }
        };

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let content_hash = format!("{:x}", hasher.finalize());

        let basename = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let filename = clean_filename(&basename);

        let meta = detect_metadata(&text, &filename);
        let blocks = parse_blocks(&text, &redactor);

        let tagged: Vec<TaggedBlock> = blocks
            .into_iter()
            .map(|block| {
                let mut tags = std::collections::BTreeMap::new();
                tags.insert("vendor".to_string(), meta.vendor.clone());
                tags.insert("os_family".to_string(), meta.os_family.clone());
                tags.insert("hostname".to_string(), meta.hostname.clone());
                // Caller-supplied tags win over inferred ones.
                for (key, value) in extra_tags {
                    tags.insert(key.clone(), value.clone());
                }
                TaggedBlock {
                    block,
                    role: role.map(|r| r.to_string()),
                    source_file: filename.clone(),
                    tags,
                }
            })
            .collect();

        blocks_written += tagged.len() as u64;
        blocks_redacted += tagged.iter().filter(|t| t.block.has_secret).count() as u64;

        store.index_file(&meta, role, &content_hash, &tagged).await?;
        files_ingested += 1;
    }

    println!("ingest {}", path.display());
    println!("  files found: {}", candidates.len());
    println!("  files ingested: {}", files_ingested);
    println!("  blocks written: {}", blocks_written);
    println!("  blocks with redactions: {}", blocks_redacted);
    if files_skipped > 0 {
        println!("  files skipped: {}", files_skipped);
    }
    println!("ok");

    store.close().await;
    Ok(())
}

fn scan_directory(config: &Config, root: &Path) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(&config.ingest.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string()];
    default_excludes.extend(config.ingest.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.ingest.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    // Sort for deterministic ordering
    files.sort();

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
