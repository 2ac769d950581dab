// crates/research-orchestrator/tests/engine.rs
// ============================================================================
// Module: Engine Scenario Tests
// Description: Discovery idempotency, fetch retries, dedupe, and merges.
// ============================================================================
//! ## Overview
//! End-to-end scenarios over in-memory state: provider idempotency through
//! the enrichment ledger, per-source retry budgets with event accounting,
//! canonical content dedupe, the executive review gate, dual-engine
//! compare/merge, canonical promotion, and verification monotonicity.

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

mod common;

use common::Harness;
use common::Route;
use common::empty_config;
use research_core::DecisionType;
use research_core::DiscoveredBy;
use research_core::EngineError;
use research_core::ResearchStore;
use research_core::ReviewStatus;
use research_core::SourceStatus;
use research_core::VerificationStatus;
use research_core::identifiers::ProspectId;
use research_core::interfaces::NewMergeDecision;
use research_orchestrator::AcquireExtractParams;
use research_orchestrator::ExecDiscoveryMode;
use research_orchestrator::ExecDiscoveryPayload;
use serde_json::json;

// ============================================================================
// SECTION: Discovery Idempotency
// ============================================================================

/// Tests a repeated provider run is skipped with identical hashes and ids.
#[test]
fn test_discovery_repeat_is_skipped_with_same_hash() {
    let harness = Harness::new();
    let tenant = harness.tenant();
    let run_id = harness.create_run(empty_config());

    let first = harness
        .orchestrator
        .run_discovery_provider(&tenant, run_id, "deterministic", &json!({}), false)
        .unwrap();
    assert!(!first.enrichment.skipped);
    assert_eq!(first.companies_added, 2);

    let second = harness
        .orchestrator
        .run_discovery_provider(&tenant, run_id, "deterministic", &json!({}), false)
        .unwrap();
    assert!(second.enrichment.skipped);
    assert_eq!(second.enrichment.reason.as_deref(), Some("duplicate_hash"));
    assert_eq!(second.enrichment.enrichment_id, first.enrichment.enrichment_id);
    assert_eq!(second.enrichment.source_document_id, first.enrichment.source_document_id);
    assert_eq!(second.enrichment.content_hash, first.enrichment.content_hash);
    assert_eq!(second.companies_added, 0);

    // Force still reuses on an exact content-hash match.
    let forced = harness
        .orchestrator
        .run_discovery_provider(&tenant, run_id, "deterministic", &json!({}), true)
        .unwrap();
    assert!(forced.enrichment.skipped);
    assert_eq!(forced.enrichment.content_hash, first.enrichment.content_hash);
}

// ============================================================================
// SECTION: Fetch Retry Budget
// ============================================================================

/// Tests the good/bad URL pair: one fetch, three failures, then silence.
#[test]
fn test_fetch_retry_budget_and_event_accounting() {
    let harness = Harness::new();
    let tenant = harness.tenant();
    let run_id = harness.create_run(empty_config());
    harness.fetcher.route(
        "https://example.com/",
        Route::Ok {
            body: "Helio Labs\nAtlas Robotics\n".to_string(),
            final_url: None,
            mime: "text/plain",
            redirects: 0,
        },
    );
    harness.fetcher.route("https://httpstat.us/404", Route::Status(404));

    let good = harness.add_url_source(run_id, "https://example.com/", 3);
    let bad = harness.add_url_source(run_id, "https://httpstat.us/404", 3);
    let params = AcquireExtractParams {
        max_urls: 10,
        force: false,
    };

    // Three passes with the clock fast-forwarded over each backoff window.
    for _ in 0..3 {
        harness.orchestrator.acquire_extract(&tenant, run_id, &params, None).unwrap();
        harness.clock.advance_millis(600_000);
    }

    let good_row = harness.orchestrator.store().get_source(&tenant, good).unwrap();
    assert_eq!(good_row.status, SourceStatus::Processed);
    assert_eq!(good_row.attempt_count, 0);

    let bad_row = harness.orchestrator.store().get_source(&tenant, bad).unwrap();
    assert_eq!(bad_row.status, SourceStatus::Failed);
    assert_eq!(bad_row.attempt_count, 3);
    assert_eq!(bad_row.next_retry_at, None);
    assert_eq!(bad_row.http_status_code, Some(404));

    let store = harness.orchestrator.store();
    assert_eq!(store.count_events(&tenant, run_id, "fetch_failed").unwrap(), 3);
    assert_eq!(store.count_events(&tenant, run_id, "retry_exhausted").unwrap(), 1);

    // Fast-forwarding further does not resurrect the spent source.
    harness.clock.advance_millis(100_000_000);
    harness.orchestrator.acquire_extract(&tenant, run_id, &params, None).unwrap();
    assert_eq!(store.count_events(&tenant, run_id, "fetch_failed").unwrap(), 3);
    assert_eq!(store.count_events(&tenant, run_id, "retry_exhausted").unwrap(), 1);
}

// ============================================================================
// SECTION: Canonical Dedupe
// ============================================================================

/// Tests identical content behind two URLs lands one canonical row.
#[test]
fn test_canonical_source_dedupe() {
    let harness = Harness::new();
    let tenant = harness.tenant();
    let run_id = harness.create_run(empty_config());
    let body = "Shared Company List\nHelio Labs\n";
    harness.fetcher.route(
        "http://127.0.0.1/canonical",
        Route::Ok {
            body: body.to_string(),
            final_url: None,
            mime: "text/plain",
            redirects: 0,
        },
    );
    harness.fetcher.route(
        "http://127.0.0.1/redirect?utm=1",
        Route::Ok {
            body: body.to_string(),
            final_url: Some("http://127.0.0.1/canonical".to_string()),
            mime: "text/plain",
            redirects: 1,
        },
    );

    let canonical = harness.add_url_source(run_id, "http://127.0.0.1/canonical", 3);
    let duplicate = harness.add_url_source(run_id, "http://127.0.0.1/redirect?utm=1", 3);
    harness
        .orchestrator
        .acquire_extract(
            &tenant,
            run_id,
            &AcquireExtractParams {
                max_urls: 10,
                force: false,
            },
            None,
        )
        .unwrap();

    let store = harness.orchestrator.store();
    let canonical_row = store.get_source(&tenant, canonical).unwrap();
    assert!(canonical_row.content_hash.is_some());
    assert_eq!(canonical_row.canonical_source_id, Some(canonical));
    assert_eq!(
        canonical_row.http_final_url.as_deref(),
        Some("http://127.0.0.1/canonical")
    );

    let duplicate_row = store.get_source(&tenant, duplicate).unwrap();
    assert_eq!(duplicate_row.status, SourceStatus::Processed);
    assert_eq!(duplicate_row.content_hash, None);
    assert_eq!(duplicate_row.canonical_source_id, Some(canonical));
    assert!(duplicate_row.fetch_info.deduped);
}

// ============================================================================
// SECTION: Executive Pipeline
// ============================================================================

/// Seeds an accepted prospect with executive search enabled.
fn accepted_prospect(harness: &Harness, run_id: research_core::identifiers::RunId) -> ProspectId {
    let tenant = harness.tenant();
    let _ = harness.add_text_source(run_id, "Helio Labs Ltd\n");
    harness
        .orchestrator
        .acquire_extract(
            &tenant,
            run_id,
            &AcquireExtractParams {
                max_urls: 10,
                force: false,
            },
            None,
        )
        .unwrap();
    let prospect = harness
        .orchestrator
        .store()
        .list_prospects(&tenant, run_id)
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
    harness
        .orchestrator
        .update_prospect_review(&tenant, prospect.id, ReviewStatus::Accepted, true)
        .unwrap();
    prospect.id
}

/// Builds a dual-engine payload with two executives per side.
fn dual_engine_payload(prospect_id: ProspectId) -> ExecDiscoveryPayload {
    serde_json::from_value(json!({
        "companies": [{
            "prospect_id": prospect_id,
            "internal": [
                {"name": "Jane Roe", "title": "CEO"},
                {"name": "Alan Turing", "title": "CTO"}
            ],
            "external": [
                {"name": "Jane A Roe", "linkedin_url": "https://linkedin.example.com/janeroe"},
                {"name": "Grace Hopper", "title": "VP Engineering"}
            ]
        }]
    }))
    .unwrap()
}

/// Tests the review gate rejects ineligible prospects without side effects.
#[test]
fn test_exec_discovery_review_gate() {
    let harness = Harness::new();
    let tenant = harness.tenant();
    let run_id = harness.create_run(empty_config());
    let _ = harness.add_text_source(run_id, "Helio Labs Ltd\n");
    harness
        .orchestrator
        .acquire_extract(
            &tenant,
            run_id,
            &AcquireExtractParams {
                max_urls: 10,
                force: false,
            },
            None,
        )
        .unwrap();
    let prospect = harness
        .orchestrator
        .store()
        .list_prospects(&tenant, run_id)
        .unwrap()
        .into_iter()
        .next()
        .unwrap();

    // Not accepted: the payload is rejected and nothing is written.
    let err = harness
        .orchestrator
        .run_executive_discovery(
            &tenant,
            run_id,
            &dual_engine_payload(prospect.id),
            ExecDiscoveryMode::Both,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(harness.orchestrator.store().list_executives(&tenant, run_id).unwrap().is_empty());

    // Enabling the gate without acceptance is a conflict.
    let err = harness
        .orchestrator
        .update_prospect_review(&tenant, prospect.id, ReviewStatus::Hold, true)
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

/// Tests dual-engine discovery, compare, merge decisions, and promotion.
#[test]
fn test_dual_engine_merge_and_canonical_promotion() {
    let harness = Harness::new();
    let tenant = harness.tenant();
    let run_id = harness.create_run(empty_config());
    let prospect_id = accepted_prospect(&harness, run_id);

    let report = harness
        .orchestrator
        .run_executive_discovery(
            &tenant,
            run_id,
            &dual_engine_payload(prospect_id),
            ExecDiscoveryMode::Both,
        )
        .unwrap();
    assert_eq!(report.internal_added, 2);
    assert_eq!(report.external_added, 2);
    assert_eq!(report.overlap, 0);

    let executives = harness.orchestrator.store().list_executives(&tenant, run_id).unwrap();
    let by_name = |name: &str| {
        executives
            .iter()
            .find(|e| e.name_raw == name)
            .map(|e| e.id)
            .unwrap()
    };
    let jane_internal = by_name("Jane Roe");
    let jane_external = by_name("Jane A Roe");
    let alan = by_name("Alan Turing");
    let grace = by_name("Grace Hopper");

    // One same-person decision, one separation.
    harness
        .orchestrator
        .record_merge_decision(
            &tenant,
            run_id,
            &NewMergeDecision {
                prospect_id,
                left_executive_id: jane_internal,
                right_executive_id: jane_external,
                decision_type: DecisionType::MarkSame,
                evidence: json!([]),
                created_by: Some("tester".to_string()),
                note: None,
            },
        )
        .unwrap();
    harness
        .orchestrator
        .record_merge_decision(
            &tenant,
            run_id,
            &NewMergeDecision {
                prospect_id,
                left_executive_id: alan,
                right_executive_id: grace,
                decision_type: DecisionType::KeepSeparate,
                evidence: json!([]),
                created_by: Some("tester".to_string()),
                note: Some("different people".to_string()),
            },
        )
        .unwrap();

    // A later mark-same across the separated pair is refused.
    let err = harness
        .orchestrator
        .record_merge_decision(
            &tenant,
            run_id,
            &NewMergeDecision {
                prospect_id,
                left_executive_id: grace,
                right_executive_id: alan,
                decision_type: DecisionType::MarkSame,
                evidence: json!([]),
                created_by: None,
                note: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let compare = harness
        .orchestrator
        .compare_executives(&tenant, run_id, prospect_id)
        .unwrap();
    assert_eq!(compare.matched_or_both, 1);
    assert_eq!(compare.internal_only, 1);
    assert_eq!(compare.external_only, 1);

    // Promoting the non-canonical member resolves to the canonical.
    let first = harness
        .orchestrator
        .promote_executive(&tenant, jane_external, "shortlisted")
        .unwrap();
    assert_eq!(first.promoted_count, 1);
    assert_eq!(first.reused_count, 0);
    assert_eq!(first.results[0].resolved_to_canonical, jane_internal);

    let repeat = harness
        .orchestrator
        .promote_executive(&tenant, jane_internal, "shortlisted")
        .unwrap();
    assert_eq!(repeat.promoted_count, 0);
    assert_eq!(repeat.reused_count, 1);
    assert_eq!(repeat.results[0].ids, first.results[0].ids);

    // Component members share the promoted ATS identity.
    let store = harness.orchestrator.store();
    let internal_row = store.get_executive(&tenant, jane_internal).unwrap();
    let external_row = store.get_executive(&tenant, jane_external).unwrap();
    assert_eq!(internal_row.candidate_id, external_row.candidate_id);
    assert!(internal_row.candidate_id.is_some());
}

/// Tests overlap attribution when both engines report one name.
#[test]
fn test_overlap_marks_both() {
    let harness = Harness::new();
    let tenant = harness.tenant();
    let run_id = harness.create_run(empty_config());
    let prospect_id = accepted_prospect(&harness, run_id);

    let payload: ExecDiscoveryPayload = serde_json::from_value(json!({
        "companies": [{
            "prospect_id": prospect_id,
            "internal": [{"name": "Jane Roe"}],
            "external": [{"name": "jane roe", "email": "jane@example.com"}]
        }]
    }))
    .unwrap();
    let report = harness
        .orchestrator
        .run_executive_discovery(&tenant, run_id, &payload, ExecDiscoveryMode::Both)
        .unwrap();
    assert_eq!(report.internal_added, 1);
    assert_eq!(report.external_added, 0);
    assert_eq!(report.overlap, 1);

    let executives = harness.orchestrator.store().list_executives(&tenant, run_id).unwrap();
    assert_eq!(executives.len(), 1);
    assert_eq!(executives[0].discovered_by, DiscoveredBy::Both);
}

// ============================================================================
// SECTION: Verification Monotonicity
// ============================================================================

/// Tests verification never moves backward.
#[test]
fn test_verification_downgrade_is_refused() {
    let harness = Harness::new();
    let tenant = harness.tenant();
    let run_id = harness.create_run(empty_config());
    let prospect_id = accepted_prospect(&harness, run_id);
    let payload: ExecDiscoveryPayload = serde_json::from_value(json!({
        "companies": [{
            "prospect_id": prospect_id,
            "internal": [{"name": "Jane Roe"}],
            "external": []
        }]
    }))
    .unwrap();
    harness
        .orchestrator
        .run_executive_discovery(&tenant, run_id, &payload, ExecDiscoveryMode::Both)
        .unwrap();
    let executive =
        harness.orchestrator.store().list_executives(&tenant, run_id).unwrap()[0].id;

    harness
        .orchestrator
        .update_executive_verification(&tenant, executive, VerificationStatus::Verified)
        .unwrap();
    let err = harness
        .orchestrator
        .update_executive_verification(&tenant, executive, VerificationStatus::Partial)
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let row = harness.orchestrator.store().get_executive(&tenant, executive).unwrap();
    assert_eq!(row.verification_status, VerificationStatus::Verified);
}
