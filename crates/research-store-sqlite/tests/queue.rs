// crates/research-store-sqlite/tests/queue.rs
// ============================================================================
// Module: Durable Queue Tests
// Description: Tests for enqueue idempotency, claiming, and lease recovery.
// ============================================================================
//! ## Overview
//! Validates the at-least-once queue: params-hash reuse, exactly-one-claimer
//! under concurrency, stale-lease reclamation, retry caps, and cancellation.

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

use std::sync::Arc;
use std::sync::Barrier;
use std::thread;

use research_core::JobStatus;
use research_core::JobType;
use research_core::MandateId;
use research_core::ResearchStore;
use research_core::RetryPolicy;
use research_core::ReuseReason;
use research_core::RunSpec;
use research_core::Timestamp;
use research_core::identifiers::RunId;
use research_core::identifiers::TenantId;
use research_core::identifiers::WorkerId;
use research_core::interfaces::CancelJobOutcome;
use research_core::interfaces::JobFailOutcome;
use research_store_sqlite::SqliteStore;
use serde_json::json;

/// Stale-lease threshold used across the tests (ms).
const STALE_AFTER_MS: i64 = 60_000;

/// Creates a store with one planned run and returns its id.
fn store_with_run(store: &SqliteStore) -> RunId {
    let spec = RunSpec {
        mandate_id: MandateId::new("mandate-1"),
        name: "queue run".to_string(),
        description: None,
        sector: "fintech".to_string(),
        region_scope: vec!["SE".to_string()],
        config: json!({}),
        created_by: None,
    };
    let run = store.create_run(&tenant(), &spec, at(1_000)).unwrap();
    run.id
}

/// The tenant under test.
fn tenant() -> TenantId {
    TenantId::new("tenant-a")
}

/// Shorthand timestamp constructor.
const fn at(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

// ============================================================================
// SECTION: Enqueue Idempotency
// ============================================================================

/// Tests an identical enqueue reuses the in-flight job.
#[test]
fn test_enqueue_reuses_inflight_job() {
    let store = SqliteStore::open_in_memory().unwrap();
    let run_id = store_with_run(&store);
    let params = json!({"max_urls": 10, "force": false});

    let first = store
        .enqueue_job(&tenant(), run_id, JobType::AcquireExtract, &params, 3, 3_600_000, at(2_000))
        .unwrap();
    assert!(first.reused.is_none());

    let second = store
        .enqueue_job(&tenant(), run_id, JobType::AcquireExtract, &params, 3, 3_600_000, at(3_000))
        .unwrap();
    assert_eq!(second.job_id, first.job_id);
    assert_eq!(second.params_hash, first.params_hash);
    assert_eq!(second.reused, Some(ReuseReason::Inflight));
}

/// Tests an enqueue after success within the TTL reuses the succeeded job.
#[test]
fn test_enqueue_reuses_succeeded_job_within_ttl() {
    let store = SqliteStore::open_in_memory().unwrap();
    let run_id = store_with_run(&store);
    let params = json!({"max_urls": 10, "force": false});

    let first = store
        .enqueue_job(&tenant(), run_id, JobType::AcquireExtract, &params, 3, 3_600_000, at(2_000))
        .unwrap();
    let claimed = store
        .claim_next_job(&WorkerId::new("w1"), JobType::AcquireExtract, STALE_AFTER_MS, at(2_500))
        .unwrap()
        .unwrap();
    store.complete_job(claimed.id, None, at(3_000)).unwrap();

    let reused = store
        .enqueue_job(&tenant(), run_id, JobType::AcquireExtract, &params, 3, 3_600_000, at(4_000))
        .unwrap();
    assert_eq!(reused.job_id, first.job_id);
    assert_eq!(reused.reused, Some(ReuseReason::DuplicateSucceeded));

    let fresh = store
        .enqueue_job(
            &tenant(),
            run_id,
            JobType::AcquireExtract,
            &params,
            3,
            3_600_000,
            at(3_000 + 3_600_001),
        )
        .unwrap();
    assert!(fresh.reused.is_none());
    assert_ne!(fresh.job_id, first.job_id);
}

// ============================================================================
// SECTION: Claim Exclusivity
// ============================================================================

/// Tests two workers racing for one job; exactly one wins.
#[test]
fn test_two_workers_claim_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.db");
    let store = SqliteStore::open(&path).unwrap();
    let run_id = store_with_run(&store);
    store
        .enqueue_job(&tenant(), run_id, JobType::AcquireExtract, &json!({}), 3, 0, at(2_000))
        .unwrap();
    drop(store);

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for worker in ["w1", "w2"] {
        let barrier = Arc::clone(&barrier);
        let path = path.clone();
        handles.push(thread::spawn(move || {
            let store = SqliteStore::open(&path).unwrap();
            barrier.wait();
            store
                .claim_next_job(&WorkerId::new(worker), JobType::AcquireExtract, STALE_AFTER_MS, at(3_000))
                .unwrap()
        }));
    }
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_some()).count();
    assert_eq!(winners, 1);
}

/// Tests claiming respects next_retry_at.
#[test]
fn test_claim_waits_for_retry_time() {
    let store = SqliteStore::open_in_memory().unwrap();
    let run_id = store_with_run(&store);
    store
        .enqueue_job(&tenant(), run_id, JobType::AcquireExtract, &json!({}), 3, 0, at(2_000))
        .unwrap();
    let policy = RetryPolicy::default().without_jitter();

    let claimed = store
        .claim_next_job(&WorkerId::new("w1"), JobType::AcquireExtract, STALE_AFTER_MS, at(2_100))
        .unwrap()
        .unwrap();
    let outcome = store.fail_job(claimed.id, &json!({"error": "boom"}), &policy, at(2_200)).unwrap();
    let JobFailOutcome::Requeued(retry_at) = outcome else {
        panic!("first failure must requeue");
    };

    assert!(
        store
            .claim_next_job(
                &WorkerId::new("w1"),
                JobType::AcquireExtract,
                STALE_AFTER_MS,
                retry_at.minus_millis(1),
            )
            .unwrap()
            .is_none()
    );
    assert!(
        store
            .claim_next_job(&WorkerId::new("w1"), JobType::AcquireExtract, STALE_AFTER_MS, retry_at)
            .unwrap()
            .is_some()
    );
}

// ============================================================================
// SECTION: Lease Reclamation
// ============================================================================

/// Tests a stale running lease is reclaimed with the attempt counter bumped.
#[test]
fn test_stale_lease_is_reclaimed() {
    let store = SqliteStore::open_in_memory().unwrap();
    let run_id = store_with_run(&store);
    store
        .enqueue_job(&tenant(), run_id, JobType::AcquireExtract, &json!({}), 3, 0, at(2_000))
        .unwrap();

    let first = store
        .claim_next_job(&WorkerId::new("w1"), JobType::AcquireExtract, STALE_AFTER_MS, at(10_000))
        .unwrap()
        .unwrap();
    assert_eq!(first.attempt_count, 1);

    // Within the lease window the job is invisible.
    assert!(
        store
            .claim_next_job(
                &WorkerId::new("w2"),
                JobType::AcquireExtract,
                STALE_AFTER_MS,
                at(10_000 + STALE_AFTER_MS - 1),
            )
            .unwrap()
            .is_none()
    );

    let reclaimed = store
        .claim_next_job(
            &WorkerId::new("w2"),
            JobType::AcquireExtract,
            STALE_AFTER_MS,
            at(10_000 + STALE_AFTER_MS),
        )
        .unwrap()
        .unwrap();
    assert_eq!(reclaimed.id, first.id);
    assert_eq!(reclaimed.attempt_count, 2);
    assert_eq!(reclaimed.locked_by, Some(WorkerId::new("w2")));

    store.complete_job(reclaimed.id, None, at(20_000)).unwrap();
    let done = store.get_job(&tenant(), reclaimed.id).unwrap();
    assert_eq!(done.status, JobStatus::Succeeded);
}

// ============================================================================
// SECTION: Retry Cap and Cancellation
// ============================================================================

/// Tests the attempt budget terminates retries.
#[test]
fn test_retry_cap_fails_terminally() {
    let store = SqliteStore::open_in_memory().unwrap();
    let run_id = store_with_run(&store);
    store
        .enqueue_job(&tenant(), run_id, JobType::AcquireExtract, &json!({}), 2, 0, at(2_000))
        .unwrap();
    let policy = RetryPolicy::default().without_jitter();
    let worker = WorkerId::new("w1");

    let mut now = at(3_000);
    let first = store
        .claim_next_job(&worker, JobType::AcquireExtract, STALE_AFTER_MS, now)
        .unwrap()
        .unwrap();
    let outcome = store.fail_job(first.id, &json!({"attempt": 1}), &policy, now).unwrap();
    assert!(matches!(outcome, JobFailOutcome::Requeued(_)));

    now = at(3_000 + 120_000);
    let second = store
        .claim_next_job(&worker, JobType::AcquireExtract, STALE_AFTER_MS, now)
        .unwrap()
        .unwrap();
    assert_eq!(second.attempt_count, 2);
    let outcome = store.fail_job(second.id, &json!({"attempt": 2}), &policy, now).unwrap();
    assert_eq!(outcome, JobFailOutcome::Failed);

    // Terminal rows are never reclaimed, even far past the lease window.
    assert!(
        store
            .claim_next_job(&worker, JobType::AcquireExtract, STALE_AFTER_MS, at(100_000_000))
            .unwrap()
            .is_none()
    );

    let job = store.get_job(&tenant(), second.id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_json, Some(json!({"attempt": 2})));
}

/// Tests cancel semantics across job states.
#[test]
fn test_cancel_states() {
    let store = SqliteStore::open_in_memory().unwrap();
    let run_id = store_with_run(&store);
    let queued = store
        .enqueue_job(&tenant(), run_id, JobType::AcquireExtract, &json!({}), 3, 0, at(2_000))
        .unwrap();

    // Queued cancels immediately.
    assert_eq!(
        store.cancel_job(&tenant(), queued.job_id, at(2_500)).unwrap(),
        CancelJobOutcome::Cancelled
    );
    // Terminal cancel is a noop.
    assert_eq!(
        store.cancel_job(&tenant(), queued.job_id, at(2_600)).unwrap(),
        CancelJobOutcome::NoopTerminal
    );

    // Running cancels cooperatively.
    let second = store
        .enqueue_job(&tenant(), run_id, JobType::AcquireExtract, &json!({"n": 2}), 3, 0, at(3_000))
        .unwrap();
    let claimed = store
        .claim_next_job(&WorkerId::new("w1"), JobType::AcquireExtract, STALE_AFTER_MS, at(3_100))
        .unwrap()
        .unwrap();
    assert_eq!(claimed.id, second.job_id);
    assert_eq!(
        store.cancel_job(&tenant(), second.job_id, at(3_200)).unwrap(),
        CancelJobOutcome::CancelRequested
    );
    assert!(store.job_cancel_requested(second.job_id).unwrap());

    // The worker acknowledges and the job lands in cancelled.
    store.acknowledge_cancel(second.job_id, at(3_300)).unwrap();
    let job = store.get_job(&tenant(), second.job_id).unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);

    // Retry re-queues a cancelled job with attempts reset.
    store.retry_job(&tenant(), second.job_id, true, at(3_400)).unwrap();
    let job = store.get_job(&tenant(), second.job_id).unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.attempt_count, 0);
    assert!(!job.cancel_requested);
}

/// Tests cross-tenant reads are refused.
#[test]
fn test_cross_tenant_job_access_is_not_found() {
    let store = SqliteStore::open_in_memory().unwrap();
    let run_id = store_with_run(&store);
    let queued = store
        .enqueue_job(&tenant(), run_id, JobType::AcquireExtract, &json!({}), 3, 0, at(2_000))
        .unwrap();
    let other = TenantId::new("tenant-b");
    assert!(store.get_job(&other, queued.job_id).is_err());
    assert!(store.cancel_job(&other, queued.job_id, at(2_500)).is_err());
}
