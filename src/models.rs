//! Core data models used throughout the audit harness.
//!
//! These types represent the configuration blocks, file metadata, and
//! comparison results that flow through the ingestion and comparison
//! pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One indentation-delimited stanza of a device configuration.
///
/// A block is an unindented header line plus every indented line beneath it,
/// with blank lines and `!` comment lines removed and secrets masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigBlock {
    /// The unindented header line, post-redaction.
    pub parent_line: String,
    /// First whitespace-separated token of the header, or `"global"` when
    /// the header has no tokens.
    pub header_type: String,
    /// Indented lines belonging to this block, post-redaction, original
    /// leading whitespace intact.
    pub body_lines: Vec<String>,
    /// Header plus body joined with `\n`.
    pub full_text: String,
    /// Zero-based source index of the header line.
    pub line_start: usize,
    /// Zero-based source index of the last line stored in the block
    /// (inclusive).
    pub line_end: usize,
    /// True when any line of the block was changed by redaction.
    pub has_secret: bool,
}

/// File-level facts inferred from the first lines of a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub vendor: String,
    pub os_family: String,
    pub hostname: String,
    pub filename: String,
}

impl FileMetadata {
    /// All fields `"unknown"` except the filename.
    pub fn unknown(filename: &str) -> Self {
        FileMetadata {
            vendor: "unknown".to_string(),
            os_family: "unknown".to_string(),
            hostname: "unknown".to_string(),
            filename: filename.to_string(),
        }
    }
}

/// A config block paired with the tags it was ingested under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedBlock {
    pub block: ConfigBlock,
    /// Comparison role (`"golden"`, `"candidate"`). Absent for plain
    /// question-answering corpora.
    pub role: Option<String>,
    pub source_file: String,
    /// Additional tags (vendor, hostname, ...), ordered for stable output.
    pub tags: BTreeMap<String, String>,
}

/// Classification of one aligned header in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowStatus {
    /// Present on both sides with identical full text.
    Match,
    /// Present on both sides with differing full text.
    Diff,
    /// Present only on the golden side.
    Missing,
    /// Present only on the candidate side.
    Extra,
}

impl RowStatus {
    /// Status cell as rendered in the quick-mode table.
    pub fn label(&self) -> &'static str {
        match self {
            RowStatus::Match => "\u{2705} MATCH",
            RowStatus::Diff => "\u{26a0}\u{fe0f} DIFF",
            RowStatus::Missing => "\u{274c} MISSING",
            RowStatus::Extra => "\u{2795} EXTRA",
        }
    }
}

/// One comparison verdict for a single aligned header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    /// The `parent_line` both sides were aligned on.
    pub key: String,
    pub status: RowStatus,
    pub golden: Option<TaggedBlock>,
    pub candidate: Option<TaggedBlock>,
}

/// How a comparison result is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// Deterministic Markdown table, no generative collaborator.
    Quick,
    /// Narrative analysis produced from the structured diff.
    Deep,
}

impl CompareMode {
    pub fn parse(s: &str) -> Option<CompareMode> {
        match s.to_ascii_lowercase().as_str() {
            "quick" => Some(CompareMode::Quick),
            "deep" => Some(CompareMode::Deep),
            _ => None,
        }
    }
}

/// Uniform response envelope for `ask` and `compare`.
///
/// Failures of external collaborators are reported through this same shape
/// with an explanatory `result`, empty sources, and zero latency.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub result: String,
    pub source_documents: Vec<TaggedBlock>,
    pub model: String,
    /// Wall-clock seconds, rounded to two decimals.
    pub latency: f64,
}

/// A stored file as listed by `nca files` and `GET /files`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub filename: String,
    pub role: Option<String>,
    pub vendor: String,
    pub os_family: String,
    pub hostname: String,
    pub block_count: i64,
    pub content_hash: String,
    /// Unix timestamp of the last (re-)ingestion.
    pub ingested_at: i64,
}
