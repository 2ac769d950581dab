// crates/research-store-sqlite/tests/documents.rs
// ============================================================================
// Module: Source Document and Ledger Tests
// Description: Tests for content dedupe, fetch retries, and enrichment TTL.
// ============================================================================
//! ## Overview
//! Validates the canonical/duplicate source protocol, the fetchable-source
//! selector, and enrichment ledger lookups under TTL and hash keys.

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

use research_core::FetchInfo;
use research_core::MandateId;
use research_core::NewSource;
use research_core::ResearchStore;
use research_core::RunSpec;
use research_core::SourceStatus;
use research_core::SourceType;
use research_core::Timestamp;
use research_core::content_hash_of_text;
use research_core::identifiers::RunId;
use research_core::identifiers::TenantId;
use research_core::interfaces::NewEnrichment;
use research_core::interfaces::SourceFetchUpdate;
use research_store_sqlite::SqliteStore;
use serde_json::json;

/// The tenant under test.
fn tenant() -> TenantId {
    TenantId::new("tenant-a")
}

/// Shorthand timestamp constructor.
const fn at(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

/// Creates a run for source tests.
fn make_run(store: &SqliteStore) -> RunId {
    let spec = RunSpec {
        mandate_id: MandateId::new("mandate-1"),
        name: "doc run".to_string(),
        description: None,
        sector: "industrial".to_string(),
        region_scope: Vec::new(),
        config: json!({}),
        created_by: None,
    };
    store.create_run(&tenant(), &spec, at(1_000)).unwrap().id
}

/// Registers a URL source.
fn add_url(store: &SqliteStore, run_id: RunId, url: &str) -> research_core::SourceDocumentRecord {
    let new = NewSource {
        source_type: SourceType::Url,
        title: None,
        url: Some(url.to_string()),
        provider: None,
        content_text: None,
        content_bytes: None,
        mime_type: None,
        max_attempts: 3,
    };
    store.add_source(&tenant(), run_id, &new, at(2_000)).unwrap()
}

/// Builds a fetched-content update for plain text.
fn fetched(text: &str, final_url: &str) -> SourceFetchUpdate {
    SourceFetchUpdate {
        content_text: Some(text.to_string()),
        content_bytes: None,
        content_hash: content_hash_of_text(text).hex().to_string(),
        mime_type: Some("text/html".to_string()),
        http_final_url: Some(final_url.to_string()),
        url_normalized: Some(final_url.to_string()),
        http_status_code: Some(200),
        http_headers: BTreeMap::new(),
        fetch_info: FetchInfo::default(),
    }
}

// ============================================================================
// SECTION: Canonical Dedupe
// ============================================================================

/// Tests identical content produces one canonical row and one duplicate.
#[test]
fn test_content_hash_dedupe_protocol() {
    let store = SqliteStore::open_in_memory().unwrap();
    let run_id = make_run(&store);
    let canonical = add_url(&store, run_id, "http://127.0.0.1/canonical");
    let duplicate = add_url(&store, run_id, "http://127.0.0.1/redirect?utm=1");

    let update = fetched("shared body", "http://127.0.0.1/canonical");
    store.save_source_fetched(&tenant(), canonical.id, &update, at(3_000)).unwrap();

    let existing = store
        .find_source_by_hash(&tenant(), run_id, &update.content_hash)
        .unwrap()
        .unwrap();
    assert_eq!(existing, canonical.id);

    store.mark_source_duplicate(&tenant(), duplicate.id, canonical.id, at(3_100)).unwrap();

    let canonical_row = store.get_source(&tenant(), canonical.id).unwrap();
    assert_eq!(canonical_row.status, SourceStatus::Fetched);
    assert_eq!(canonical_row.canonical_source_id, Some(canonical.id));
    assert!(canonical_row.content_hash.is_some());

    let duplicate_row = store.get_source(&tenant(), duplicate.id).unwrap();
    assert_eq!(duplicate_row.status, SourceStatus::Processed);
    assert_eq!(duplicate_row.content_hash, None);
    assert_eq!(duplicate_row.canonical_source_id, Some(canonical.id));
    assert!(duplicate_row.fetch_info.deduped);
}

// ============================================================================
// SECTION: Fetch Retry Selection
// ============================================================================

/// Tests failed sources stay selectable until the attempt budget is spent.
#[test]
fn test_fetchable_selection_respects_attempts_and_retry_time() {
    let store = SqliteStore::open_in_memory().unwrap();
    let run_id = make_run(&store);
    let source = add_url(&store, run_id, "https://httpstat.us/404");

    // New rows are selectable.
    let pending = store.list_fetchable_sources(&tenant(), run_id, at(2_500), 10).unwrap();
    assert_eq!(pending.len(), 1);

    // First two failures schedule retries.
    store
        .mark_source_fetch_failed(&tenant(), source.id, Some(503), "upstream", Some(at(5_000)), at(3_000))
        .unwrap();
    assert!(store.list_fetchable_sources(&tenant(), run_id, at(4_999), 10).unwrap().is_empty());
    assert_eq!(store.list_fetchable_sources(&tenant(), run_id, at(5_000), 10).unwrap().len(), 1);

    store
        .mark_source_fetch_failed(&tenant(), source.id, Some(503), "upstream", Some(at(9_000)), at(6_000))
        .unwrap();

    // Terminal failure: attempts spent, retry cleared.
    store
        .mark_source_fetch_failed(&tenant(), source.id, Some(404), "not found", None, at(10_000))
        .unwrap();
    let row = store.get_source(&tenant(), source.id).unwrap();
    assert_eq!(row.status, SourceStatus::Failed);
    assert_eq!(row.attempt_count, 3);
    assert_eq!(row.next_retry_at, None);
    assert_eq!(row.http_status_code, Some(404));

    // Fast-forwarding the clock does not resurrect a spent source.
    assert!(store.list_fetchable_sources(&tenant(), run_id, at(100_000_000), 10).unwrap().is_empty());
}

// ============================================================================
// SECTION: Enrichment Ledger
// ============================================================================

/// Tests TTL and exact-hash ledger lookups.
#[test]
fn test_enrichment_lookup_modes() {
    let store = SqliteStore::open_in_memory().unwrap();
    let run_id = make_run(&store);
    let envelope = add_url(&store, run_id, "http://provider.local/envelope");
    store
        .save_source_fetched(
            &tenant(),
            envelope.id,
            &fetched("{\"companies\":[]}", "http://provider.local/envelope"),
            at(3_000),
        )
        .unwrap();

    let new = NewEnrichment {
        provider: "seed_list".to_string(),
        purpose: "company_discovery".to_string(),
        target_type: "run".to_string(),
        target_id: run_id.get(),
        input_scope_hash: "scope-1".to_string(),
        content_hash: "hash-1".to_string(),
        source_document_id: envelope.id,
    };
    let record = store.insert_enrichment(&tenant(), run_id, &new, at(4_000)).unwrap();

    let hit = store
        .find_enrichment_in_ttl(
            &tenant(),
            run_id,
            "seed_list",
            "company_discovery",
            "run",
            run_id.get(),
            "scope-1",
            10_000,
            at(9_000),
        )
        .unwrap()
        .unwrap();
    assert_eq!(hit.id, record.id);

    // Outside the TTL the scope lookup misses, but the hash lookup still hits.
    assert!(
        store
            .find_enrichment_in_ttl(
                &tenant(),
                run_id,
                "seed_list",
                "company_discovery",
                "run",
                run_id.get(),
                "scope-1",
                10_000,
                at(20_000),
            )
            .unwrap()
            .is_none()
    );
    let by_hash = store
        .find_enrichment_by_hash(
            &tenant(),
            run_id,
            "seed_list",
            "company_discovery",
            "run",
            run_id.get(),
            "scope-1",
            "hash-1",
        )
        .unwrap()
        .unwrap();
    assert_eq!(by_hash.id, record.id);
}
