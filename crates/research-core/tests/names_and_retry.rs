// crates/research-core/tests/names_and_retry.rs
// ============================================================================
// Module: Normalization and Retry Tests
// Description: Tests for name keys and backoff schedules.
// ============================================================================
//! ## Overview
//! Validates company/person/email normalization and the deterministic
//! jitter-free backoff ladder.

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

use research_core::RetryDecision;
use research_core::RetryPolicy;
use research_core::Timestamp;
use research_core::normalize_company_name;
use research_core::normalize_email;
use research_core::normalize_person_name;

// ============================================================================
// SECTION: Name Normalization
// ============================================================================

/// Tests legal suffixes strip and whitespace collapses.
#[test]
fn test_company_suffixes_strip() {
    assert_eq!(normalize_company_name("Helio Labs Ltd."), "helio labs");
    assert_eq!(normalize_company_name("Atlas  Robotics  GmbH"), "atlas robotics");
    assert_eq!(normalize_company_name("Northwind Holdings Limited"), "northwind");
    assert_eq!(normalize_company_name("Plain Name"), "plain name");
}

/// Tests stacked suffixes strip iteratively.
#[test]
fn test_company_suffixes_strip_iteratively() {
    assert_eq!(normalize_company_name("Acme Group Ltd"), "acme");
}

/// Tests person names reduce to alphanumeric word sequences.
#[test]
fn test_person_names_normalize() {
    assert_eq!(normalize_person_name("  Anna-Maria  O'Brien "), "anna maria o brien");
    assert_eq!(normalize_person_name("JOSÉ núñez"), "jos n ez");
}

/// Tests email normalization trims and lowercases.
#[test]
fn test_email_normalizes() {
    assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
}

// ============================================================================
// SECTION: Backoff
// ============================================================================

/// Tests the jitter-free ladder doubles up to the cap.
#[test]
fn test_backoff_ladder() {
    let policy = RetryPolicy {
        max_attempts: 5,
        base_delay_ms: 1_000,
        factor: 2.0,
        max_delay_ms: 6_000,
        jitter_fraction: 0.2,
    }
    .without_jitter();

    assert_eq!(policy.delay_ms(1), 1_000);
    assert_eq!(policy.delay_ms(2), 2_000);
    assert_eq!(policy.delay_ms(3), 4_000);
    assert_eq!(policy.delay_ms(4), 6_000);
}

/// Tests the decision schedule and exhaustion boundary.
#[test]
fn test_backoff_decisions() {
    let policy = RetryPolicy::default().without_jitter();
    let now = Timestamp::from_unix_millis(50_000);

    match policy.on_failure(1, now) {
        RetryDecision::RetryAt(at) => assert_eq!(at, now.plus_millis(1_000)),
        RetryDecision::Exhausted => panic!("first failure must schedule a retry"),
    }
    assert_eq!(policy.on_failure(5, now), RetryDecision::Exhausted);
    assert_eq!(policy.on_failure(9, now), RetryDecision::Exhausted);
}
