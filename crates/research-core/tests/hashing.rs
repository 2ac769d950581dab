// crates/research-core/tests/hashing.rs
// ============================================================================
// Module: Canonical Hashing Tests
// Description: Tests for RFC 8785 hashing and payload ordering.
// ============================================================================
//! ## Overview
//! Validates hash stability across key order, params hashing, and the
//! canonical company ordering applied before payload hashing.

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

use research_core::DEFAULT_HASH_ALGORITHM;
use research_core::DiscoveryCompany;
use research_core::DiscoveryPayload;
use research_core::content_hash_of_text;
use research_core::hash_canonical_json;
use research_core::params_hash;
use serde_json::json;

/// Builds a company entry with only a name.
fn company(name: &str) -> DiscoveryCompany {
    DiscoveryCompany {
        name: name.to_string(),
        website_url: None,
        hq_country: None,
        hq_city: None,
        sector: None,
        subsector: None,
        description: None,
        confidence: None,
        evidence: Vec::new(),
    }
}

// ============================================================================
// SECTION: Canonical Hashing
// ============================================================================

/// Tests canonical json hashing ignores key order.
#[test]
fn test_canonical_json_hash_is_stable() {
    let value_a = json!({"b": 1, "a": 2});
    let value_b = json!({"a": 2, "b": 1});
    let hash_a = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &value_a).unwrap();
    let hash_b = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &value_b).unwrap();
    assert_eq!(hash_a, hash_b);
}

/// Tests params hashing matches across equivalent literals.
#[test]
fn test_params_hash_matches_equivalent_params() {
    let first = params_hash(&json!({"max_urls": 10, "force": false})).unwrap();
    let second = params_hash(&json!({"force": false, "max_urls": 10})).unwrap();
    assert_eq!(first.hex(), second.hex());
}

/// Tests text content hashing is the plain sha-256 of the bytes.
#[test]
fn test_content_hash_of_text() {
    let digest = content_hash_of_text("hello\n");
    assert_eq!(digest.hex().len(), 64);
    assert_eq!(digest, content_hash_of_text("hello\n"));
    assert_ne!(digest, content_hash_of_text("hello"));
}

// ============================================================================
// SECTION: Payload Ordering
// ============================================================================

/// Tests provider payloads hash identically regardless of input order.
#[test]
fn test_sorted_payloads_hash_identically() {
    let mut first = DiscoveryPayload::new("seed_list", None);
    first.companies = vec![company("Zeta"), company("alpha"), company("Midline")];
    first.sort_companies();

    let mut second = DiscoveryPayload::new("seed_list", None);
    second.companies = vec![company("Midline"), company("Zeta"), company("alpha")];
    second.sort_companies();

    let hash_a = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &first).unwrap();
    let hash_b = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &second).unwrap();
    assert_eq!(hash_a, hash_b);

    let names: Vec<&str> = first.companies.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "Midline", "Zeta"]);
}

/// Tests payload validation rejects schema violations.
#[test]
fn test_payload_validation() {
    let mut payload = DiscoveryPayload::new("seed_list", None);
    payload.companies = vec![company("Acme")];
    payload.validate().unwrap();

    payload.companies[0].confidence = Some(1.2);
    assert!(payload.validate().is_err());

    payload.companies[0].confidence = Some(0.8);
    payload.schema_version = "company_discovery_v0".to_string();
    assert!(payload.validate().is_err());
}
