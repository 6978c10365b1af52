//! Narrative generator abstraction and implementations.
//!
//! Defines the [`NarrativeGenerator`] trait and concrete implementations:
//! - **[`DisabledGenerator`]** — returns errors; used when no generator is configured.
//! - **[`OllamaGenerator`]** — calls a local Ollama server with retry and backoff.
//!
//! The generator never sees raw configuration files. Question answering
//! receives retrieved blocks as context; deep comparison receives the
//! already-computed diff findings as JSON. Both prompt templates live here.
//!
//! # Retry Strategy
//!
//! The Ollama generator uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::compare::DiffBundle;
use crate::config::NarrativeConfig;

/// Prompt for free-form question answering over retrieved blocks.
const ANSWER_TEMPLATE: &str = "\
You are a Senior Network Engineer assistant. You answer questions STRICTLY based on the provided network configuration blocks.
You are deterministic and precise.

CONTEXT:
{context}

USER QUERY:
{question}

INSTRUCTIONS:
1. Answer the query using ONLY the information in the CONTEXT.
2. If the answer is not in the context, state: \"Not found in the provided configuration.\"
3. Cite the exact configuration lines, section names, or file names for every fact.
4. Do not speculate or use outside knowledge.
5. Format the output as clean Markdown.

ANSWER:
";

/// Prompt for narrating pre-computed comparison findings.
const DIFF_TEMPLATE: &str = "\
You are a Senior Network Engineer reviewing a configuration audit. A deterministic
comparison has already aligned the golden and candidate configurations block by
block; its findings appear below as JSON.

AUDIT REQUEST:
{query}

FINDINGS:
{findings}

INSTRUCTIONS:
1. Describe each difference, citing the exact configuration lines from the findings.
2. List blocks missing from the candidate, then blocks extra in the candidate.
3. Note security implications for findings that touch ACLs, authentication, or management access.
4. End with concrete remediation recommendations.
5. Use ONLY the findings above. Do not speculate about configuration not shown.
6. Format the output as clean Markdown.

ANALYSIS:
";

pub fn render_answer_prompt(context: &str, question: &str) -> String {
    ANSWER_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

pub fn render_diff_prompt(query: &str, findings: &str) -> String {
    DIFF_TEMPLATE
        .replace("{query}", query)
        .replace("{findings}", findings)
}

/// Trait for narrative generators.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Returns the model identifier (e.g. `"llama3.2:3b"`).
    fn model_name(&self) -> &str;

    /// Answer a question from retrieved block context.
    async fn answer(&self, context: &str, question: &str) -> Result<String>;

    /// Narrate a pre-computed diff bundle.
    async fn summarize_diff(&self, query: &str, bundle: &DiffBundle) -> Result<String>;
}

// ============ Disabled Generator ============

/// A no-op generator that always returns errors.
///
/// Used when `narrative.provider = "disabled"` in the configuration.
/// Quick comparison stays fully available; only deep mode and `ask` fail.
pub struct DisabledGenerator;

#[async_trait]
impl NarrativeGenerator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn answer(&self, _context: &str, _question: &str) -> Result<String> {
        bail!("Narrative generator is disabled")
    }

    async fn summarize_diff(&self, _query: &str, _bundle: &DiffBundle) -> Result<String> {
        bail!("Narrative generator is disabled")
    }
}

// ============ Ollama Generator ============

/// Generator backed by a local Ollama server.
///
/// Calls `POST {base_url}/api/generate` with `stream: false`. Temperature
/// defaults low so repeated audits of the same configs stay close to
/// deterministic, and `keep_alive` holds the model warm between requests.
pub struct OllamaGenerator {
    model: String,
    base_url: String,
    temperature: f64,
    keep_alive: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OllamaGenerator {
    pub fn new(config: &NarrativeConfig) -> Self {
        Self {
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            keep_alive: config.keep_alive.clone(),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "keep_alive": self.keep_alive,
            "options": { "temperature": self.temperature },
        });

        let url = format!("{}/api/generate", self.base_url);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client.post(&url).json(&body).send().await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_generate_response(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("Ollama API error {}: {}", status, body_text));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Ollama API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
    }
}

#[async_trait]
impl NarrativeGenerator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn answer(&self, context: &str, question: &str) -> Result<String> {
        let prompt = render_answer_prompt(context, question);
        self.generate(&prompt).await
    }

    async fn summarize_diff(&self, query: &str, bundle: &DiffBundle) -> Result<String> {
        let findings = serde_json::to_string_pretty(bundle)?;
        let prompt = render_diff_prompt(query, &findings);
        self.generate(&prompt).await
    }
}

/// Parse the Ollama generate API response JSON.
fn parse_generate_response(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
}

/// Create the appropriate [`NarrativeGenerator`] based on configuration.
///
/// | Config Value | Generator |
/// |-------------|-----------|
/// | `"disabled"` | [`DisabledGenerator`] |
/// | `"ollama"` | [`OllamaGenerator`] |
pub fn create_generator(config: &NarrativeConfig) -> Result<Box<dyn NarrativeGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "ollama" => Ok(Box::new(OllamaGenerator::new(config))),
        other => bail!("Unknown narrative provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_prompt_fills_placeholders() {
        let prompt = render_answer_prompt("vlan 10\n name Sales", "What VLANs exist?");
        assert!(prompt.contains("vlan 10\n name Sales"));
        assert!(prompt.contains("What VLANs exist?"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn test_diff_prompt_fills_placeholders() {
        let prompt = render_diff_prompt("Compare the core switches", "{\"differences\": []}");
        assert!(prompt.contains("Compare the core switches"));
        assert!(prompt.contains("{\"differences\": []}"));
        assert!(!prompt.contains("{findings}"));
    }

    #[test]
    fn test_parse_generate_response() {
        let json = serde_json::json!({ "model": "llama3.2:3b", "response": "ok", "done": true });
        assert_eq!(parse_generate_response(&json).unwrap(), "ok");
    }

    #[test]
    fn test_parse_generate_response_missing_field() {
        let json = serde_json::json!({ "done": true });
        assert!(parse_generate_response(&json).is_err());
    }

    #[test]
    fn test_create_generator_disabled() {
        let config = NarrativeConfig::default();
        let generator = create_generator(&config).unwrap();
        assert_eq!(generator.model_name(), "disabled");
    }

    #[test]
    fn test_create_generator_unknown() {
        let config = NarrativeConfig {
            provider: "gpt".to_string(),
            ..NarrativeConfig::default()
        };
        assert!(create_generator(&config).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = NarrativeConfig {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434/".to_string(),
            ..NarrativeConfig::default()
        };
        let generator = OllamaGenerator::new(&config);
        assert_eq!(generator.base_url, "http://localhost:11434");
    }
}
