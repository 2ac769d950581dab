// crates/research-core/tests/urlnorm.rs
// ============================================================================
// Module: URL Canonicalizer Tests
// Description: Tests for deterministic URL normalization.
// ============================================================================
//! ## Overview
//! Validates that equivalent URLs collapse onto one canonical key and that
//! invalid inputs are rejected.

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

use proptest::prelude::*;
use research_core::UrlNormError;
use research_core::canonical_host;
use research_core::canonicalize;

// ============================================================================
// SECTION: Canonical Forms
// ============================================================================

/// Tests scheme and host lowercase with query and fragment dropped.
#[test]
fn test_lowercases_and_drops_query_and_fragment() {
    let normalized = canonicalize("HTTPS://Example.COM/Path?utm=1#frag", "http").unwrap();
    assert_eq!(normalized, "https://example.com/Path");
}

/// Tests default ports are removed for both schemes.
#[test]
fn test_drops_default_ports() {
    assert_eq!(canonicalize("http://example.com:80/a", "http").unwrap(), "http://example.com/a");
    assert_eq!(
        canonicalize("https://example.com:443/a", "http").unwrap(),
        "https://example.com/a"
    );
    assert_eq!(
        canonicalize("http://example.com:8080/a", "http").unwrap(),
        "http://example.com:8080/a"
    );
}

/// Tests bare hosts gain the default scheme.
#[test]
fn test_infers_default_scheme_for_bare_host() {
    assert_eq!(canonicalize("example.com/path", "http").unwrap(), "http://example.com/path");
    assert_eq!(canonicalize("example.com", "https").unwrap(), "https://example.com/");
}

/// Tests duplicate slashes collapse and trailing slashes strip except root.
#[test]
fn test_normalizes_paths() {
    assert_eq!(canonicalize("http://example.com//a//b/", "http").unwrap(), "http://example.com/a/b");
    assert_eq!(canonicalize("http://example.com/", "http").unwrap(), "http://example.com/");
    assert_eq!(canonicalize("http://example.com", "http").unwrap(), "http://example.com/");
}

/// Tests rejection of blank input.
#[test]
fn test_rejects_empty_input() {
    assert_eq!(canonicalize("", "http"), Err(UrlNormError::EmptyUrl));
    assert_eq!(canonicalize("   ", "http"), Err(UrlNormError::EmptyUrl));
}

/// Tests canonical host extraction.
#[test]
fn test_canonical_host() {
    assert_eq!(canonical_host("HTTPS://Example.COM/x"), Some("example.com".to_string()));
    assert_eq!(canonical_host("example.com/x"), Some("example.com".to_string()));
    assert_eq!(canonical_host(""), None);
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    /// Case, default ports, trailing slashes, and queries never change the key.
    #[test]
    fn prop_cosmetic_variants_share_one_key(
        host in "[a-z][a-z0-9]{1,10}\\.(com|org|io)",
        path in "(/[a-z0-9]{1,8}){0,3}",
        query in "[a-z]{0,8}",
    ) {
        let base = format!("http://{host}{path}");
        let canonical = canonicalize(&base, "http").unwrap();

        let upper = format!("HTTP://{}{path}", host.to_uppercase());
        prop_assert_eq!(canonicalize(&upper, "http").unwrap(), canonical.clone());

        let with_port = format!("http://{host}:80{path}");
        prop_assert_eq!(canonicalize(&with_port, "http").unwrap(), canonical.clone());

        let with_query = format!("http://{host}{path}?q={query}");
        prop_assert_eq!(canonicalize(&with_query, "http").unwrap(), canonical.clone());

        let trailing = format!("http://{host}{path}/");
        prop_assert_eq!(canonicalize(&trailing, "http").unwrap(), canonical);
    }

    /// Canonicalization is idempotent.
    #[test]
    fn prop_canonicalize_is_idempotent(
        host in "[a-z][a-z0-9]{1,10}\\.com",
        path in "(/[a-zA-Z0-9]{1,8}){0,3}",
    ) {
        let once = canonicalize(&format!("{host}{path}"), "http").unwrap();
        let twice = canonicalize(&once, "http").unwrap();
        prop_assert_eq!(once, twice);
    }
}
