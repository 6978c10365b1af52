//! Comparison and question-answering orchestration.
//!
//! Both entry points return a [`ChatResponse`] envelope rather than an
//! error: collaborator failures (store, generator) fold into the envelope
//! with an `Error generating response: ...` result, empty sources, and a
//! latency of `0.0`, so callers always have a renderable response.

use std::time::Instant;

use anyhow::{bail, Result};

use crate::compare::{build_diff_bundle, compare_blocks, render_quick_table};
use crate::config::Config;
use crate::db;
use crate::models::{ChatResponse, CompareMode, TaggedBlock};
use crate::narrative::{create_generator, NarrativeGenerator};
use crate::store::{ChunkStore, SqliteStore};

/// Model label for responses produced without consulting the generator.
pub const DETERMINISTIC_MODEL: &str = "deterministic";

/// Conventional role labels for the two comparison sides.
pub const ROLE_GOLDEN: &str = "golden";
pub const ROLE_CANDIDATE: &str = "candidate";

/// Parameters for one comparison run.
#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub query: String,
    pub mode: CompareMode,
    /// Restrict the golden side to one ingested filename.
    pub golden: Option<String>,
    /// Restrict the candidate side to one ingested filename.
    pub candidate: Option<String>,
    /// Per-side retrieval depth; falls back to `retrieval.compare_k`.
    pub k: Option<i64>,
    /// Bypass ranked retrieval and align every stored block of both files.
    pub exhaustive: bool,
}

impl Default for CompareRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            mode: CompareMode::Quick,
            golden: None,
            candidate: None,
            k: None,
            exhaustive: false,
        }
    }
}

struct CompareOutcome {
    result: String,
    sources: Vec<TaggedBlock>,
    /// True when the generator was never consulted.
    deterministic: bool,
}

pub async fn run_compare(
    config: &Config,
    store: &dyn ChunkStore,
    generator: &dyn NarrativeGenerator,
    req: &CompareRequest,
) -> ChatResponse {
    let start = Instant::now();
    let fallback_model = match req.mode {
        CompareMode::Quick => DETERMINISTIC_MODEL.to_string(),
        CompareMode::Deep => generator.model_name().to_string(),
    };

    match compare_inner(config, store, generator, req).await {
        Ok(outcome) => {
            let model = if outcome.deterministic {
                DETERMINISTIC_MODEL.to_string()
            } else {
                generator.model_name().to_string()
            };
            ChatResponse {
                result: outcome.result,
                source_documents: outcome.sources,
                model,
                latency: round_latency(start.elapsed().as_secs_f64()),
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "comparison failed");
            error_envelope(&e, &fallback_model)
        }
    }
}

async fn compare_inner(
    config: &Config,
    store: &dyn ChunkStore,
    generator: &dyn NarrativeGenerator,
    req: &CompareRequest,
) -> Result<CompareOutcome> {
    // Identity pre-check: byte-identical files need no alignment and no
    // generator, whatever the requested mode.
    if let (Some(golden), Some(candidate)) = (&req.golden, &req.candidate) {
        let golden_hash = store.content_hash(golden).await?;
        let candidate_hash = store.content_hash(candidate).await?;
        if let (Some(g), Some(c)) = (golden_hash, candidate_hash) {
            if g == c {
                let short = &g[..g.len().min(12)];
                let result = format!(
                    "\u{2705} '{}' is byte-identical to '{}' (content hash {}). All features match.",
                    candidate, golden, short
                );
                return Ok(CompareOutcome {
                    result,
                    sources: Vec::new(),
                    deterministic: true,
                });
            }
        }
    }

    let (golden_blocks, candidate_blocks) = if req.exhaustive {
        let (Some(golden), Some(candidate)) = (&req.golden, &req.candidate) else {
            bail!("Exhaustive comparison requires explicit golden and candidate filenames");
        };
        (
            store.blocks_for_file(Some(ROLE_GOLDEN), golden).await?,
            store.blocks_for_file(Some(ROLE_CANDIDATE), candidate).await?,
        )
    } else {
        let k = req.k.unwrap_or(config.retrieval.compare_k);
        (
            store
                .retrieve(&req.query, Some(ROLE_GOLDEN), req.golden.as_deref(), k)
                .await?,
            store
                .retrieve(&req.query, Some(ROLE_CANDIDATE), req.candidate.as_deref(), k)
                .await?,
        )
    };

    let rows = compare_blocks(&golden_blocks, &candidate_blocks, &req.query);

    let mut sources = golden_blocks;
    sources.extend(candidate_blocks);

    match req.mode {
        CompareMode::Quick => Ok(CompareOutcome {
            result: render_quick_table(&rows),
            sources,
            deterministic: true,
        }),
        CompareMode::Deep => {
            let bundle = build_diff_bundle(&rows);
            let narrative = generator.summarize_diff(&req.query, &bundle).await?;
            if narrative.trim().is_empty() {
                bail!("Narrative generator returned an empty analysis");
            }
            Ok(CompareOutcome {
                result: narrative,
                sources,
                deterministic: false,
            })
        }
    }
}

pub async fn run_ask(
    config: &Config,
    store: &dyn ChunkStore,
    generator: &dyn NarrativeGenerator,
    query: &str,
    k: Option<i64>,
) -> ChatResponse {
    let start = Instant::now();

    match ask_inner(config, store, generator, query, k).await {
        Ok((result, sources)) => ChatResponse {
            result,
            source_documents: sources,
            model: generator.model_name().to_string(),
            latency: round_latency(start.elapsed().as_secs_f64()),
        },
        Err(e) => {
            tracing::error!(error = %e, "question answering failed");
            error_envelope(&e, generator.model_name())
        }
    }
}

async fn ask_inner(
    config: &Config,
    store: &dyn ChunkStore,
    generator: &dyn NarrativeGenerator,
    query: &str,
    k: Option<i64>,
) -> Result<(String, Vec<TaggedBlock>)> {
    let k = k.unwrap_or(config.retrieval.answer_k);
    let blocks = store.retrieve(query, None, None, k).await?;
    let context = build_context(&blocks);
    let answer = generator.answer(&context, query).await?;
    Ok((answer, blocks))
}

/// Each block carries its source attribution so answers can cite files
/// and line ranges.
pub fn build_context(blocks: &[TaggedBlock]) -> String {
    blocks
        .iter()
        .map(|b| {
            format!(
                "[{} lines {}-{}]\n{}",
                b.source_file, b.block.line_start, b.block.line_end, b.block.full_text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// CLI entry point — runs a comparison and prints the envelope.
pub async fn run_compare_cli(config: &Config, req: &CompareRequest) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let generator = create_generator(&config.narrative)?;

    let response = run_compare(config, &store, generator.as_ref(), req).await;

    println!("{}", response.result);
    println!();
    println!(
        "\u{23f1}\u{fe0f} {}s | Model: {}",
        response.latency, response.model
    );

    store.close().await;
    Ok(())
}

/// CLI entry point — answers a question and prints the envelope with its
/// source citations.
pub async fn run_ask_cli(config: &Config, query: &str, k: Option<i64>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let generator = create_generator(&config.narrative)?;

    let response = run_ask(config, &store, generator.as_ref(), query, k).await;

    println!("{}", response.result);
    if !response.source_documents.is_empty() {
        println!();
        println!("--- Sources ({}) ---", response.source_documents.len());
        for doc in &response.source_documents {
            println!(
                "**{}** (Line {}-{})",
                doc.source_file, doc.block.line_start, doc.block.line_end
            );
        }
    }
    println!();
    println!(
        "\u{23f1}\u{fe0f} {}s | Model: {}",
        response.latency, response.model
    );

    store.close().await;
    Ok(())
}

fn error_envelope(err: &anyhow::Error, model: &str) -> ChatResponse {
    ChatResponse {
        result: format!("Error generating response: {}", err),
        source_documents: Vec::new(),
        model: model.to_string(),
        latency: 0.0,
    }
}

fn round_latency(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}
