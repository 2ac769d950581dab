// crates/research-providers/tests/providers.rs
// ============================================================================
// Module: Provider Tests
// Description: Tests for provider payloads, gating, and fixtures.
// ============================================================================
//! ## Overview
//! Validates deterministic payload hashing, seed-list parsing in both modes,
//! fixture-backed mock mode, gate refusal without credentials, and the 429
//! retry path of the live search transport.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Mutex;
use std::time::Duration;

use research_config::EngineConfig;
use research_config::ExternalGate;
use research_config::ProviderCredentials;
use research_core::DEFAULT_HASH_ALGORITHM;
use research_core::EngineError;
use research_core::hash_canonical_json;
use research_core::identifiers::RunId;
use research_core::identifiers::TenantId;
use research_core::interfaces::DiscoveryProvider;
use research_core::interfaces::ProviderContext;
use research_providers::DeterministicProvider;
use research_providers::ProviderRegistry;
use research_providers::SearchTransport;
use research_providers::SeedListProvider;
use research_providers::WebSearchProvider;
use serde_json::Value;
use serde_json::json;

/// Context used across the tests.
fn ctx() -> ProviderContext {
    ProviderContext {
        tenant_id: TenantId::new("tenant-a"),
        run_id: RunId::new(7),
    }
}

/// Builds a config from key/value pairs.
fn config_from(pairs: &[(&str, &str)]) -> EngineConfig {
    EngineConfig::from_lookup(|key| {
        pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v).to_string())
    })
    .unwrap()
}

// ============================================================================
// SECTION: Deterministic Provider
// ============================================================================

/// Tests two calls hash to one payload digest.
#[test]
fn test_deterministic_payload_is_hash_stable() {
    let provider = DeterministicProvider::new();
    let first = provider.run(&ctx(), &json!({})).unwrap().payload.unwrap();
    let second = provider.run(&ctx(), &json!({})).unwrap().payload.unwrap();
    let hash_a = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &first).unwrap();
    let hash_b = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &second).unwrap();
    assert_eq!(hash_a, hash_b);
    assert_eq!(first.companies.len(), 2);
}

// ============================================================================
// SECTION: Seed List Provider
// ============================================================================

/// Tests paste mode normalizes URLs and sorts companies.
#[test]
fn test_seed_list_paste_mode() {
    let provider = SeedListProvider::new();
    let request = json!({
        "mode": "paste",
        "items": [
            {"name": "Zeta Industrial", "website_url": "HTTPS://Zeta.example.com/about?utm=1"},
            {"name": "Atlas Robotics", "website_url": "atlas.example.com"}
        ],
        "source_label": "Analyst list"
    });
    let result = provider.run(&ctx(), &request).unwrap();
    let payload = result.payload.unwrap();
    let names: Vec<&str> = payload.companies.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Atlas Robotics", "Zeta Industrial"]);
    assert_eq!(
        payload.companies[1].website_url.as_deref(),
        Some("https://zeta.example.com/about")
    );
    assert_eq!(payload.companies[0].evidence[0].label.as_deref(), Some("Analyst list"));
}

/// Tests csv mode reads the column set and builds evidence.
#[test]
fn test_seed_list_csv_mode() {
    let provider = SeedListProvider::new();
    let csv = "name,url,hq_country,description\n\
               Helio Labs,https://helio.example.com,SE,Thin-film solar\n\
               ,https://skipped.example.com,,missing name\n\
               Atlas Robotics,atlas.example.com,DE,Warehouse automation\n";
    let request = json!({ "mode": "csv", "csv_text": csv });
    let result = provider.run(&ctx(), &request).unwrap();
    let payload = result.payload.unwrap();
    assert_eq!(payload.companies.len(), 2);
    assert_eq!(payload.companies[0].name, "Atlas Robotics");
    assert_eq!(payload.companies[1].hq_country.as_deref(), Some("SE"));
    assert_eq!(payload.companies[1].evidence[0].snippet.as_deref(), Some("Thin-film solar"));
}

// ============================================================================
// SECTION: Gating and Fixtures
// ============================================================================

/// Tests mock mode serves the fixture file.
#[test]
fn test_search_mock_mode_uses_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let fixture_dir = dir.path().join("web_search");
    std::fs::create_dir_all(&fixture_dir).unwrap();
    std::fs::write(
        fixture_dir.join("default.json"),
        serde_json::to_string(&json!({
            "items": [
                {"title": "Helio Labs", "link": "https://helio.example.com", "snippet": "solar"},
                {"title": "Atlas Robotics", "link": "https://atlas.example.com", "snippet": "robots"}
            ]
        }))
        .unwrap(),
    )
    .unwrap();

    let config = config_from(&[
        ("MOCK_EXTERNAL_PROVIDERS", "on"),
        ("PROVIDER_FIXTURES_ROOT", dir.path().to_str().unwrap()),
    ]);
    let registry = ProviderRegistry::with_builtin_providers(&config);
    let result = registry
        .run("web_search", &ctx(), &json!({"query": "industrial automation"}))
        .unwrap();
    let payload = result.payload.unwrap();
    assert_eq!(payload.companies.len(), 2);
    assert_eq!(payload.companies[0].name, "Atlas Robotics");
    let envelope = result.envelope.unwrap();
    assert_eq!(envelope["source"], json!("fixture"));
}

/// Tests mock mode with a missing fixture fails closed.
#[test]
fn test_search_mock_mode_missing_fixture_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_from(&[
        ("MOCK_EXTERNAL_PROVIDERS", "on"),
        ("PROVIDER_FIXTURES_ROOT", dir.path().to_str().unwrap()),
    ]);
    let registry = ProviderRegistry::with_builtin_providers(&config);
    let err = registry.run("web_search", &ctx(), &json!({"query": "x"})).unwrap_err();
    assert!(matches!(err, EngineError::ExternalProviderConfig { .. }));
}

/// Tests live mode without credentials is refused by the gate.
#[test]
fn test_live_mode_without_credentials_is_refused() {
    let config = config_from(&[
        ("MOCK_EXTERNAL_PROVIDERS", "off"),
        ("EXTERNAL_DISCOVERY_ENABLED", "on"),
    ]);
    let registry = ProviderRegistry::with_builtin_providers(&config);
    let err = registry.run("web_search", &ctx(), &json!({"query": "x"})).unwrap_err();
    match err {
        EngineError::ExternalProviderConfig { missing, .. } => {
            assert_eq!(missing, vec!["SEARCH_API_CX".to_string(), "SEARCH_API_KEY".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Tests unknown provider keys are rejected with the known set.
#[test]
fn test_registry_rejects_unknown_key() {
    let config = config_from(&[("MOCK_EXTERNAL_PROVIDERS", "on")]);
    let registry = ProviderRegistry::with_builtin_providers(&config);
    let err = registry.run("nonexistent", &ctx(), &json!({})).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

// ============================================================================
// SECTION: Live Retry Path
// ============================================================================

/// Transport returning 429 once, then a result page.
struct RateLimitedTransport {
    /// Remaining 429 responses to serve.
    remaining_429: Mutex<u32>,
}

impl SearchTransport for RateLimitedTransport {
    fn get(
        &self,
        _endpoint: &str,
        _query: &[(String, String)],
        _timeout: Duration,
    ) -> Result<(u16, Value, Option<u64>), EngineError> {
        let mut remaining = self.remaining_429.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Ok((429, json!({"error": {"message": "rate limited"}}), Some(0)));
        }
        Ok((
            200,
            json!({"items": [{"title": "Helio Labs", "link": "https://helio.example.com"}]}),
            None,
        ))
    }
}

/// Tests the live path retries a 429 and then succeeds.
#[test]
fn test_live_mode_retries_rate_limit() {
    let config = config_from(&[
        ("MOCK_EXTERNAL_PROVIDERS", "off"),
        ("EXTERNAL_DISCOVERY_ENABLED", "on"),
        ("SEARCH_API_KEY", "key"),
        ("SEARCH_API_CX", "cx"),
    ]);
    let gate = ExternalGate::new(&config);
    let credentials = ProviderCredentials {
        api_key: Some("key".to_string()),
        engine_id: Some("cx".to_string()),
        model: None,
    };
    let provider = WebSearchProvider::with_transport(
        gate,
        credentials,
        Box::new(RateLimitedTransport {
            remaining_429: Mutex::new(1),
        }),
        |_| {},
        5_000,
    );
    let result = provider.run(&ctx(), &json!({"query": "solar"})).unwrap();
    let payload = result.payload.unwrap();
    assert_eq!(payload.companies.len(), 1);
    assert_eq!(payload.companies[0].name, "Helio Labs");
}
