//! Integration tests for the JSON HTTP API.
//!
//! These tests start the real server on a free port, seed the database
//! through the real ingestion pipeline, and drive the endpoints with an
//! HTTP client.

use netconfig_audit::config::Config;
use netconfig_audit::ingest::run_ingest;
use netconfig_audit::migrate;
use netconfig_audit::server::run_server;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

// ─── Fixtures ───────────────────────────────────────────────────────

const GOLDEN_CFG: &str = "\
Current configuration : 1024 bytes
!
hostname CORE-SW1
!
vlan 10
 name Sales
!
vlan 20
 name Engineering
!
interface GigabitEthernet1/0/1
 description Uplink to WAN
 switchport mode trunk
!
";

const CANDIDATE_CFG: &str = "\
Current configuration : 1040 bytes
!
hostname CORE-SW1
!
vlan 10
 name Sales-Department
!
interface GigabitEthernet1/0/1
 description Uplink to WAN
 switchport mode trunk
!
vlan 30
 name Guest
!
";

// ─── Helpers ────────────────────────────────────────────────────────

fn test_config_with_port(tmp: &TempDir, port: u16) -> Config {
    let db_path = tmp.path().join("nca.sqlite");
    let config_content = format!(
        r#"
[db]
path = "{}"

[retrieval]
compare_k = 50
answer_k = 20

[server]
bind = "127.0.0.1:{}"
"#,
        db_path.display(),
        port
    );
    toml::from_str(&config_content).unwrap()
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

/// Migrate, ingest both fixture captures under their roles, and start the
/// server in the background.
async fn seed_and_start(tmp: &TempDir, cfg: &Config, port: u16) {
    migrate::run_migrations(cfg).await.unwrap();

    let golden = tmp.path().join("golden.cfg");
    let candidate = tmp.path().join("candidate.cfg");
    fs::write(&golden, GOLDEN_CFG).unwrap();
    fs::write(&candidate, CANDIDATE_CFG).unwrap();
    run_ingest(cfg, &golden, Some("golden"), &[], false)
        .await
        .unwrap();
    run_ingest(cfg, &candidate, Some("candidate"), &[], false)
        .await
        .unwrap();

    let cfg_clone = cfg.clone();
    tokio::spawn(async move {
        run_server(&cfg_clone).await.ok();
    });
    wait_for_server(port).await;
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_and_files_endpoints() {
    let port = find_free_port();
    let tmp = TempDir::new().unwrap();
    let cfg = test_config_with_port(&tmp, port);
    seed_and_start(&tmp, &cfg, port).await;

    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());

    let resp = client
        .get(format!("http://127.0.0.1:{}/files", port))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2, "both captures should be listed: {}", body);
    assert!(files
        .iter()
        .any(|f| f["filename"] == "golden.cfg" && f["role"] == "golden"));
    assert!(files.iter().all(|f| f["vendor"] == "cisco"));
    assert!(files.iter().all(|f| f["hostname"] == "CORE-SW1"));
}

#[tokio::test]
async fn test_compare_endpoint_renders_quick_table() {
    let port = find_free_port();
    let tmp = TempDir::new().unwrap();
    let cfg = test_config_with_port(&tmp, port);
    seed_and_start(&tmp, &cfg, port).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://127.0.0.1:{}/compare", port))
        .json(&json!({
            "query": "Focus on VLANs and interfaces.",
            "golden": "golden.cfg",
            "candidate": "candidate.cfg",
            "exhaustive": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["model"], "deterministic");
    assert!(body["latency"].is_number());

    let result = body["result"].as_str().unwrap();
    assert!(result.contains("| Feature (Parent Line) | Golden Config | Candidate Config | Status |"));
    assert!(result.contains("DIFF"), "vlan 10 should differ: {}", result);
    assert!(result.contains("MISSING"), "vlan 20 should be missing: {}", result);
    assert!(result.contains("EXTRA"), "vlan 30 should be extra: {}", result);

    let sources = body["source_documents"].as_array().unwrap();
    assert!(!sources.is_empty(), "aligned blocks should be cited");
    assert!(sources
        .iter()
        .any(|s| s["source_file"] == "golden.cfg" && s["role"] == "golden"));
}

#[tokio::test]
async fn test_compare_endpoint_identity_short_circuit() {
    let port = find_free_port();
    let tmp = TempDir::new().unwrap();
    let cfg = test_config_with_port(&tmp, port);
    migrate::run_migrations(&cfg).await.unwrap();

    // Two filenames, identical bytes
    let twin_a = tmp.path().join("twin-a.cfg");
    let twin_b = tmp.path().join("twin-b.cfg");
    fs::write(&twin_a, GOLDEN_CFG).unwrap();
    fs::write(&twin_b, GOLDEN_CFG).unwrap();
    run_ingest(&cfg, &twin_a, Some("golden"), &[], false)
        .await
        .unwrap();
    run_ingest(&cfg, &twin_b, Some("candidate"), &[], false)
        .await
        .unwrap();

    let cfg_clone = cfg.clone();
    tokio::spawn(async move {
        run_server(&cfg_clone).await.ok();
    });
    wait_for_server(port).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://127.0.0.1:{}/compare", port))
        .json(&json!({
            "query": "Compare 'twin-b.cfg' against 'twin-a.cfg'",
            "golden": "twin-a.cfg",
            "candidate": "twin-b.cfg",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["model"], "deterministic");
    let result = body["result"].as_str().unwrap();
    assert!(
        result.contains("byte-identical"),
        "identical files should short-circuit: {}",
        result
    );
    assert_eq!(body["source_documents"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_ask_endpoint_disabled_generator_envelope() {
    let port = find_free_port();
    let tmp = TempDir::new().unwrap();
    let cfg = test_config_with_port(&tmp, port);
    seed_and_start(&tmp, &cfg, port).await;

    // No narrative section in the config: the provider defaults to
    // "disabled" and the failure folds into the 200 envelope.
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://127.0.0.1:{}/ask", port))
        .json(&json!({ "query": "What VLANs are configured?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["result"],
        "Error generating response: Narrative generator is disabled"
    );
    assert_eq!(body["model"], "disabled");
    assert_eq!(body["latency"], 0.0);
    assert_eq!(body["source_documents"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_request_validation_errors() {
    let port = find_free_port();
    let tmp = TempDir::new().unwrap();
    let cfg = test_config_with_port(&tmp, port);
    seed_and_start(&tmp, &cfg, port).await;

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{}", port);

    // Missing query
    let resp = client
        .post(format!("{}/compare", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(body["error"]["message"], "query must not be empty");

    // Unknown mode
    let resp = client
        .post(format!("{}/compare", base))
        .json(&json!({ "query": "compare", "mode": "verbose" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "mode must be quick or deep");

    // Non-positive k
    let resp = client
        .post(format!("{}/ask", base))
        .json(&json!({ "query": "vlans", "k": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "k must be >= 1");

    // Whitespace-only query
    let resp = client
        .post(format!("{}/ask", base))
        .json(&json!({ "query": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "query must not be empty");
}
