// crates/research-config/tests/gate.rs
// ============================================================================
// Module: External Gate Tests
// Description: Tests for config parsing and gate decisions.
// ============================================================================
//! ## Overview
//! Validates flag parsing, fixture routing under mock mode, and structured
//! refusal with sorted missing-variable lists.

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

use research_config::EngineConfig;
use research_config::ExternalGate;
use research_config::GateMode;
use research_core::EngineError;

/// Builds a config from a static key/value list.
fn config_from(pairs: &[(&str, &str)]) -> EngineConfig {
    EngineConfig::from_lookup(|key| {
        pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v).to_string())
    })
    .unwrap()
}

// ============================================================================
// SECTION: Config Parsing
// ============================================================================

/// Tests flag spellings and numeric caps parse.
#[test]
fn test_config_parses_flags_and_caps() {
    let config = config_from(&[
        ("MOCK_EXTERNAL_PROVIDERS", "off"),
        ("EXTERNAL_DISCOVERY_ENABLED", "on"),
        ("EXPORT_PACK_MAX_ZIP_BYTES", "1024"),
    ]);
    assert!(!config.mock_external_providers);
    assert!(config.external_discovery_enabled);
    assert_eq!(config.export_pack_max_zip_bytes, 1024);
}

/// Tests invalid flags are rejected.
#[test]
fn test_config_rejects_bad_flag() {
    let result = EngineConfig::from_lookup(|key| {
        (key == "MOCK_EXTERNAL_PROVIDERS").then(|| "maybe".to_string())
    });
    assert!(result.is_err());
}

// ============================================================================
// SECTION: Gate Decisions
// ============================================================================

/// Tests mock mode routes to the provider fixture.
#[test]
fn test_mock_mode_serves_fixture() {
    let config = config_from(&[
        ("MOCK_EXTERNAL_PROVIDERS", "on"),
        ("PROVIDER_FIXTURES_ROOT", "/tmp/fixtures"),
    ]);
    let gate = ExternalGate::new(&config);
    match gate.can_call_external("web_search", &[("SEARCH_API_KEY", None)]).unwrap() {
        GateMode::Mock { fixture_path } => {
            assert!(fixture_path.ends_with("web_search/default.json"));
        }
        GateMode::Live => panic!("mock mode must not go live"),
    }
}

/// Tests disabled discovery refuses with the controlling variable named.
#[test]
fn test_disabled_discovery_is_refused() {
    let config = config_from(&[("MOCK_EXTERNAL_PROVIDERS", "off")]);
    let gate = ExternalGate::new(&config);
    let err = gate.can_call_external("web_search", &[]).unwrap_err();
    match err {
        EngineError::ExternalProviderConfig { missing, .. } => {
            assert_eq!(missing, vec!["EXTERNAL_DISCOVERY_ENABLED".to_string()]);
        }
        other => panic!("unexpected error kind: {other}"),
    }
}

/// Tests missing credentials are listed sorted.
#[test]
fn test_missing_credentials_listed_sorted() {
    let config = config_from(&[
        ("MOCK_EXTERNAL_PROVIDERS", "off"),
        ("EXTERNAL_DISCOVERY_ENABLED", "on"),
    ]);
    let gate = ExternalGate::new(&config);
    let err = gate
        .can_call_external(
            "web_search",
            &[("SEARCH_API_KEY", None), ("SEARCH_API_CX", None)],
        )
        .unwrap_err();
    match err {
        EngineError::ExternalProviderConfig { missing, .. } => {
            assert_eq!(
                missing,
                vec!["SEARCH_API_CX".to_string(), "SEARCH_API_KEY".to_string()]
            );
        }
        other => panic!("unexpected error kind: {other}"),
    }
}

/// Tests full credentials go live.
#[test]
fn test_live_mode_with_credentials() {
    let config = config_from(&[
        ("MOCK_EXTERNAL_PROVIDERS", "off"),
        ("EXTERNAL_DISCOVERY_ENABLED", "on"),
    ]);
    let gate = ExternalGate::new(&config);
    let mode = gate
        .can_call_external("web_search", &[("SEARCH_API_KEY", Some("k")), ("SEARCH_API_CX", Some("cx"))])
        .unwrap();
    assert_eq!(mode, GateMode::Live);
}
