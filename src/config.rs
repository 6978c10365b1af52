use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::redact::RuleSpec;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub narrative: NarrativeConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub redaction: RedactionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Per-side retrieval bound for comparison requests.
    #[serde(default = "default_compare_k")]
    pub compare_k: i64,
    /// Retrieval bound for plain question answering.
    #[serde(default = "default_answer_k")]
    pub answer_k: i64,
}

fn default_compare_k() -> i64 {
    50
}
fn default_answer_k() -> i64 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct NarrativeConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            keep_alive: default_keep_alive(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl NarrativeConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "llama3.2:3b".to_string()
}
fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_temperature() -> f64 {
    0.1
}
fn default_keep_alive() -> String {
    "5m".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.cfg".to_string(),
        "**/*.txt".to_string(),
        "**/*.log".to_string(),
        "**/*.pdf".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedactionConfig {
    #[serde(default)]
    pub extra_rules: Vec<RuleSpec>,
}

/// Commented starter configuration written by `nca init` when no config
/// file exists yet.
const STARTER_CONFIG: &str = r#"# netconfig-audit configuration

[db]
path = "./data/nca.sqlite"

[retrieval]
# Per-side retrieval depth for compare; context depth for ask.
compare_k = 50
answer_k = 20

[server]
bind = "127.0.0.1:8787"

[narrative]
# Set to "ollama" to enable deep compare and ask.
provider = "disabled"
model = "llama3.2:3b"
base_url = "http://localhost:11434"

[ingest]
include_globs = ["**/*.cfg", "**/*.txt", "**/*.log", "**/*.pdf"]
exclude_globs = []
follow_symlinks = false

# Additional redaction rules, applied after the built-in ones.
# [redaction]
# extra_rules = [
#   { pattern = '(wpa-passphrase) \S+', replacement = "$1 [REDACTED]" },
# ]
"#;

/// Write the starter configuration to `path`, creating parent directories.
/// Refuses to overwrite an existing file.
pub fn write_starter_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Config file already exists: {}", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, STARTER_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate retrieval
    if config.retrieval.compare_k < 1 {
        anyhow::bail!("retrieval.compare_k must be >= 1");
    }
    if config.retrieval.answer_k < 1 {
        anyhow::bail!("retrieval.answer_k must be >= 1");
    }

    // Validate narrative
    match config.narrative.provider.as_str() {
        "disabled" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown narrative provider: '{}'. Must be disabled or ollama.",
            other
        ),
    }
    if config.narrative.is_enabled() && config.narrative.model.trim().is_empty() {
        anyhow::bail!(
            "narrative.model must be specified when provider is '{}'",
            config.narrative.provider
        );
    }
    if !(0.0..=2.0).contains(&config.narrative.temperature) {
        anyhow::bail!("narrative.temperature must be in [0.0, 2.0]");
    }

    // Validate ingest
    if config.ingest.include_globs.is_empty() {
        anyhow::bail!("ingest.include_globs must not be empty");
    }

    Ok(config)
}
