// crates/research-core/tests/identity.rs
// ============================================================================
// Module: Identity Forest Tests
// Description: Tests for union-find executive identity resolution.
// ============================================================================
//! ## Overview
//! Validates deterministic canonical selection, keep-separate enforcement,
//! and component verification promotion.

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

use std::collections::BTreeMap;

use research_core::ExecutiveId;
use research_core::IdentityError;
use research_core::IdentityForest;
use research_core::Timestamp;
use research_core::VerificationStatus;

/// Builds a forest with four executives created at increasing times.
fn forest() -> IdentityForest {
    let mut forest = IdentityForest::new();
    for n in 1..=4 {
        forest.insert(ExecutiveId::new(n), Timestamp::from_unix_millis(1_000 * n));
    }
    forest
}

// ============================================================================
// SECTION: Canonical Selection
// ============================================================================

/// Tests singleton components resolve to themselves.
#[test]
fn test_singletons_are_their_own_canonical() {
    let mut forest = forest();
    assert_eq!(forest.canonical_of(ExecutiveId::new(3)).unwrap(), ExecutiveId::new(3));
}

/// Tests the canonical is the earliest created member, lowest id on ties.
#[test]
fn test_canonical_is_earliest_then_lowest() {
    let mut forest = forest();
    forest.mark_same(ExecutiveId::new(3), ExecutiveId::new(2)).unwrap();
    forest.mark_same(ExecutiveId::new(3), ExecutiveId::new(4)).unwrap();
    assert_eq!(forest.canonical_of(ExecutiveId::new(4)).unwrap(), ExecutiveId::new(2));

    let mut tied = IdentityForest::new();
    tied.insert(ExecutiveId::new(7), Timestamp::from_unix_millis(5));
    tied.insert(ExecutiveId::new(6), Timestamp::from_unix_millis(5));
    tied.mark_same(ExecutiveId::new(7), ExecutiveId::new(6)).unwrap();
    assert_eq!(tied.canonical_of(ExecutiveId::new(7)).unwrap(), ExecutiveId::new(6));
}

/// Tests the resolution map covers every member deterministically.
#[test]
fn test_resolution_map_lists_every_member() {
    let mut forest = forest();
    forest.mark_same(ExecutiveId::new(1), ExecutiveId::new(2)).unwrap();
    let map = forest.resolution_map();
    assert_eq!(map.len(), 4);
    assert_eq!(map[0], (ExecutiveId::new(1), ExecutiveId::new(1)));
    assert_eq!(map[1], (ExecutiveId::new(2), ExecutiveId::new(1)));
    assert_eq!(map[2], (ExecutiveId::new(3), ExecutiveId::new(3)));
}

// ============================================================================
// SECTION: Negative Edges
// ============================================================================

/// Tests keep-separate blocks later unions across components.
#[test]
fn test_keep_separate_blocks_union() {
    let mut forest = forest();
    forest.keep_separate(ExecutiveId::new(1), ExecutiveId::new(2)).unwrap();
    let err = forest.mark_same(ExecutiveId::new(2), ExecutiveId::new(1)).unwrap_err();
    assert!(matches!(err, IdentityError::SeparationViolated { .. }));
}

/// Tests keep-separate applies transitively through merged members.
#[test]
fn test_keep_separate_applies_to_whole_component() {
    let mut forest = forest();
    forest.mark_same(ExecutiveId::new(1), ExecutiveId::new(2)).unwrap();
    forest.keep_separate(ExecutiveId::new(2), ExecutiveId::new(3)).unwrap();
    let err = forest.mark_same(ExecutiveId::new(1), ExecutiveId::new(3)).unwrap_err();
    assert!(matches!(err, IdentityError::SeparationViolated { .. }));
}

/// Tests keep-separate within one component is rejected.
#[test]
fn test_keep_separate_inside_component_is_conflict() {
    let mut forest = forest();
    forest.mark_same(ExecutiveId::new(1), ExecutiveId::new(2)).unwrap();
    let err = forest.keep_separate(ExecutiveId::new(1), ExecutiveId::new(2)).unwrap_err();
    assert!(matches!(err, IdentityError::SeparationViolated { .. }));
}

// ============================================================================
// SECTION: Verification Promotion
// ============================================================================

/// Tests the component presents the maximum member verification.
#[test]
fn test_component_verification_is_member_maximum() {
    let mut forest = forest();
    forest.mark_same(ExecutiveId::new(1), ExecutiveId::new(2)).unwrap();
    let mut statuses = BTreeMap::new();
    statuses.insert(ExecutiveId::new(1), VerificationStatus::Unverified);
    statuses.insert(ExecutiveId::new(2), VerificationStatus::Verified);
    statuses.insert(ExecutiveId::new(3), VerificationStatus::Partial);

    let resolved = forest.component_verification(&statuses);
    assert_eq!(resolved[&ExecutiveId::new(1)], VerificationStatus::Verified);
    assert_eq!(resolved[&ExecutiveId::new(2)], VerificationStatus::Verified);
    assert_eq!(resolved[&ExecutiveId::new(3)], VerificationStatus::Partial);
}

/// Tests downgrade detection on the status ordering.
#[test]
fn test_verification_downgrade_detection() {
    assert!(VerificationStatus::Verified.is_downgrade_to(VerificationStatus::Partial));
    assert!(VerificationStatus::Partial.is_downgrade_to(VerificationStatus::Unverified));
    assert!(!VerificationStatus::Partial.is_downgrade_to(VerificationStatus::Verified));
    assert!(!VerificationStatus::Verified.is_downgrade_to(VerificationStatus::Verified));
}
