//! Deterministic comparison engine.
//!
//! Aligns golden and candidate blocks by header identity, classifies every
//! aligned key as match/diff/missing/extra, applies the query-derived focus
//! filter, and renders either the quick-mode table or the structured bundle
//! handed to the narrative generator. Everything here is pure and
//! synchronous: the same inputs always produce the same output, byte for
//! byte.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::models::{ComparisonRow, RowStatus, TaggedBlock};

// ============ Focus filter ============

/// Query-derived restriction on which feature categories are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusFilter {
    pub vlan: bool,
    pub interface: bool,
    pub route: bool,
    pub acl: bool,
    pub qos: bool,
    /// Hostname rows are noise in a scoped comparison; they survive only
    /// when the query asks for them.
    pub hostname: bool,
}

impl FocusFilter {
    /// Derive the filter from a free-text request by case-insensitive
    /// keyword checks.
    pub fn from_query(query: &str) -> Self {
        let q = query.to_lowercase();
        FocusFilter {
            vlan: q.contains("vlan"),
            interface: q.contains("interface"),
            route: q.contains("route") || q.contains("ospf"),
            acl: q.contains("acl") || q.contains("security"),
            qos: q.contains("qos"),
            hostname: q.contains("hostname"),
        }
    }

    /// True when at least one feature category was requested. The hostname
    /// flag alone does not scope the comparison.
    pub fn is_active(&self) -> bool {
        self.vlan || self.interface || self.route || self.acl || self.qos
    }

    /// Whether a row with this alignment key and header type survives.
    ///
    /// Category membership is by `header_type` for vlan/interface/route and
    /// by key substring for ACL and QoS stanzas, whose headers vary more.
    pub fn keeps(&self, key: &str, header_type: &str) -> bool {
        if !self.is_active() {
            return true;
        }
        if header_type == "hostname" {
            return self.hostname;
        }
        let key_lc = key.to_lowercase();
        (self.vlan && header_type == "vlan")
            || (self.interface && header_type == "interface")
            || (self.route && (header_type == "router" || key_lc.contains("route")))
            || (self.acl && (key_lc.contains("access-list") || key_lc.contains("acl")))
            || (self.qos
                && (key_lc.contains("policy-map")
                    || key_lc.contains("class-map")
                    || key_lc.contains("qos")))
    }
}

// ============ Alignment and classification ============

/// Collapse one side's blocks into a `parent_line`-keyed map.
///
/// Header identity is the alignment key, so several blocks with the same
/// header collapse to one; the last-seen block wins. That collapsing is a
/// semantic property of the comparison, not an accident, and tests pin it.
pub fn align_blocks(blocks: &[TaggedBlock]) -> BTreeMap<String, TaggedBlock> {
    let mut map = BTreeMap::new();
    for block in blocks {
        map.insert(block.block.parent_line.clone(), block.clone());
    }
    map
}

/// Classify every key in the union of the two aligned maps.
///
/// Precedence per key: present on both sides with equal `full_text` (exact
/// string equality, no normalization) is a match; both present otherwise is
/// a diff; golden-only is missing; candidate-only is extra. Rows come back
/// sorted by key, exactly one row per key.
pub fn classify(
    golden: &BTreeMap<String, TaggedBlock>,
    candidate: &BTreeMap<String, TaggedBlock>,
) -> Vec<ComparisonRow> {
    let keys: BTreeSet<&String> = golden.keys().chain(candidate.keys()).collect();

    keys.into_iter()
        .map(|key| {
            let g = golden.get(key);
            let c = candidate.get(key);
            let status = match (g, c) {
                (Some(gb), Some(cb)) => {
                    if gb.block.full_text == cb.block.full_text {
                        RowStatus::Match
                    } else {
                        RowStatus::Diff
                    }
                }
                (Some(_), None) => RowStatus::Missing,
                _ => RowStatus::Extra,
            };
            ComparisonRow {
                key: key.clone(),
                status,
                golden: g.cloned(),
                candidate: c.cloned(),
            }
        })
        .collect()
}

/// Drop rows outside the focus. No-op when the filter is inactive.
pub fn apply_filter(rows: Vec<ComparisonRow>, filter: &FocusFilter) -> Vec<ComparisonRow> {
    rows.into_iter()
        .filter(|row| {
            let header_type = row
                .golden
                .as_ref()
                .or(row.candidate.as_ref())
                .map(|b| b.block.header_type.as_str())
                .unwrap_or("global");
            filter.keeps(&row.key, header_type)
        })
        .collect()
}

/// Align, classify, and filter: the full engine run for one request.
///
/// Empty input on either side is not an error; every key on the non-empty
/// side degrades to missing or extra as appropriate.
pub fn compare_blocks(
    golden: &[TaggedBlock],
    candidate: &[TaggedBlock],
    query: &str,
) -> Vec<ComparisonRow> {
    let filter = FocusFilter::from_query(query);
    let rows = classify(&align_blocks(golden), &align_blocks(candidate));
    apply_filter(rows, &filter)
}

// ============ Quick-mode rendering ============

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " / ")
}

/// Render the quick-mode comparison table.
///
/// One row per surviving [`ComparisonRow`], cells pipe-escaped and
/// newline-folded, absent sides shown as `NOT FOUND`. Independent of any
/// generative component.
pub fn render_quick_table(rows: &[ComparisonRow]) -> String {
    let mut out = String::new();
    out.push_str("| Feature (Parent Line) | Golden Config | Candidate Config | Status |\n");
    out.push_str("|---|---|---|---|\n");
    for row in rows {
        let golden = row
            .golden
            .as_ref()
            .map(|b| b.block.full_text.as_str())
            .unwrap_or("NOT FOUND");
        let candidate = row
            .candidate
            .as_ref()
            .map(|b| b.block.full_text.as_str())
            .unwrap_or("NOT FOUND");
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            escape_cell(&row.key),
            escape_cell(golden),
            escape_cell(candidate),
            row.status.label(),
        ));
    }
    out
}

// ============ Narrative bundle ============

/// One entry of the structured difference bundle.
#[derive(Debug, Clone, Serialize)]
pub struct DiffEntry {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub golden: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
}

/// Structured payload handed to the narrative generator in deep mode.
///
/// The engine's contract ends at producing this bundle; narrative prose is
/// the collaborator's business and is passed through opaque.
#[derive(Debug, Clone, Serialize)]
pub struct DiffBundle {
    pub differences: Vec<DiffEntry>,
    pub missing: Vec<DiffEntry>,
    pub extra: Vec<DiffEntry>,
    pub match_count: usize,
}

impl DiffBundle {
    /// No differences, nothing missing, nothing extra.
    pub fn is_clean(&self) -> bool {
        self.differences.is_empty() && self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Group classified rows into the deep-mode buckets.
pub fn build_diff_bundle(rows: &[ComparisonRow]) -> DiffBundle {
    let mut bundle = DiffBundle {
        differences: Vec::new(),
        missing: Vec::new(),
        extra: Vec::new(),
        match_count: 0,
    };
    for row in rows {
        let entry = DiffEntry {
            key: row.key.clone(),
            golden: row.golden.as_ref().map(|b| b.block.full_text.clone()),
            candidate: row.candidate.as_ref().map(|b| b.block.full_text.clone()),
        };
        match row.status {
            RowStatus::Match => bundle.match_count += 1,
            RowStatus::Diff => bundle.differences.push(entry),
            RowStatus::Missing => bundle.missing.push(entry),
            RowStatus::Extra => bundle.extra.push(entry),
        }
    }
    bundle
}
