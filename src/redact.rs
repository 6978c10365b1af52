//! Secret masking for configuration lines.
//!
//! An ordered list of pattern/replacement rules rewrites credential material
//! before a line is stored, indexed, or displayed. Rules apply sequentially
//! to the same line, so a line can be rewritten by more than one rule.

use regex::Regex;
use serde::Deserialize;

/// Built-in masking rules, applied in order.
///
/// Covers weakly encoded (type 7) and hashed (type 5) passwords, SNMP
/// community strings, and shared authentication keys.
const BUILTIN_RULES: &[(&str, &str)] = &[
    (r"(password|secret) 7 [a-zA-Z0-9]+", "$1 7 [REDACTED]"),
    (r"(password|secret) 5 [a-zA-Z0-9$]+", "$1 5 [REDACTED]"),
    (r"(snmp-server community) [a-zA-Z0-9]+", "$1 [REDACTED]"),
    (r"(key) [a-zA-Z0-9]+", "$1 [REDACTED]"),
    // Never fires in practice: the generic key rule above already rewrote
    // `key 7 <token>` by the time this one runs. Kept so the published rule
    // order stays stable for anyone extending it.
    (r"(key 7) [a-zA-Z0-9]+", "$1 [REDACTED]"),
];

/// A pattern/replacement pair as written in the `[redaction]` config section.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    pub pattern: String,
    pub replacement: String,
}

/// Applies the masking rules to individual lines.
#[derive(Debug)]
pub struct Redactor {
    rules: Vec<(Regex, String)>,
}

impl Redactor {
    /// Redactor with only the built-in rules.
    pub fn new() -> Self {
        Self::with_extra_rules(&[])
    }

    /// Built-in rules followed by caller-supplied extras.
    ///
    /// A rule whose pattern does not compile is skipped with a warning; a
    /// bad rule never aborts ingestion.
    pub fn with_extra_rules(extra: &[RuleSpec]) -> Self {
        let mut rules = Vec::new();
        for (pattern, replacement) in BUILTIN_RULES {
            match Regex::new(pattern) {
                Ok(re) => rules.push((re, (*replacement).to_string())),
                Err(e) => tracing::warn!(rule = %pattern, error = %e, "skipping redaction rule"),
            }
        }
        for spec in extra {
            match Regex::new(&spec.pattern) {
                Ok(re) => rules.push((re, spec.replacement.clone())),
                Err(e) => {
                    tracing::warn!(rule = %spec.pattern, error = %e, "skipping redaction rule")
                }
            }
        }
        Redactor { rules }
    }

    /// Mask secrets in a single line.
    ///
    /// Returns the masked line and whether any rule changed it. Leading
    /// whitespace is left untouched so indentation detection downstream
    /// still works.
    pub fn redact_line(&self, line: &str) -> (String, bool) {
        let mut current = line.to_string();
        let mut matched = false;
        for (re, replacement) in &self.rules {
            let next = re.replace_all(&current, replacement.as_str());
            if next != current {
                current = next.into_owned();
                matched = true;
            }
        }
        (current, matched)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}
