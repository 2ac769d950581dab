// crates/research-orchestrator/tests/plan.rs
// ============================================================================
// Module: Run Plan Tests
// Description: Worker-driven plan execution, retries, and cancellation.
// ============================================================================
//! ## Overview
//! Drives full runs through the worker loop: the happy path to `succeeded`,
//! step retry exhaustion to `failed`, cooperative cancellation, idempotent
//! enqueueing, and tenant isolation of the operation surface.

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
use research_core::EngineError;
use research_core::JobType;
use research_core::ResearchStore;
use research_core::ReuseReason;
use research_core::RunStatus;
use research_core::StepKey;
use research_core::StepStatus;
use research_core::identifiers::TenantId;
use research_core::identifiers::WorkerId;
use research_orchestrator::AcquireExtractParams;
use research_orchestrator::CancelRunOutcome;
use research_orchestrator::Worker;
use serde_json::json;

// ============================================================================
// SECTION: Happy Path
// ============================================================================

/// Tests a seeded run drives to succeeded through the worker.
#[test]
fn test_run_plan_succeeds_through_worker() {
    let harness = Harness::new();
    let tenant = harness.tenant();
    harness.fetcher.route(
        "https://example.com/list",
        Route::Ok {
            body: "Helio Labs\nAtlas Robotics\nNorthwind Analytics\n".to_string(),
            final_url: None,
            mime: "text/plain",
            redirects: 0,
        },
    );
    let run_id = harness.create_run(json!({
        "seed_urls": ["https://example.com/list"],
        "providers": [{"provider": "deterministic", "request": {}}]
    }));

    let outcome = harness.orchestrator.start_run(&tenant, run_id).unwrap();
    assert!(outcome.reused.is_none());

    let worker = Worker::new(&harness.orchestrator, WorkerId::new("w1"));
    let processed = worker.run_until_idle().unwrap();
    assert!(processed >= 1);

    let run = harness.orchestrator.store().get_run(&tenant, run_id).unwrap();
    assert_eq!(run.status, RunStatus::Succeeded);
    assert!(run.summary.is_some());

    let steps = harness.orchestrator.store().list_steps(&tenant, run_id).unwrap();
    for step in &steps {
        assert!(
            matches!(step.status, StepStatus::Succeeded | StepStatus::Skipped),
            "step {} ended {}",
            step.step_key,
            step.status
        );
    }
    // Exec discovery skips without eligible prospects; fetch succeeds.
    let exec_step = steps.iter().find(|s| s.step_key == StepKey::ExecDiscovery).unwrap();
    assert_eq!(exec_step.status, StepStatus::Skipped);

    let prospects = harness.orchestrator.store().list_prospects(&tenant, run_id).unwrap();
    assert!(prospects.len() >= 3);

    // A second start is a conflict; the job status view reflects success.
    let err = harness.orchestrator.start_run(&tenant, run_id).unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
    let status = harness.orchestrator.get_job_status(&tenant, outcome.job_id).unwrap();
    assert_eq!(status.status, "succeeded");
}

// ============================================================================
// SECTION: Retry Exhaustion
// ============================================================================

/// Tests a permanently failing plan lands the run in failed.
#[test]
fn test_run_plan_fails_after_step_attempts() {
    let harness = Harness::new();
    let tenant = harness.tenant();
    // A provider spec with an unknown key makes enrich_companies fail
    // deterministically on every attempt.
    let run_id = harness.create_run(json!({
        "providers": [{"provider": "no_such_provider", "request": {}}]
    }));
    harness.orchestrator.start_run(&tenant, run_id).unwrap();

    let worker = Worker::new(&harness.orchestrator, WorkerId::new("w1"));
    // Drive job cycles across backoff windows until terminal.
    for _ in 0..12 {
        worker.run_until_idle().unwrap();
        harness.clock.advance_millis(600_000);
        let run = harness.orchestrator.store().get_run(&tenant, run_id).unwrap();
        if run.status.is_terminal() {
            break;
        }
    }

    let run = harness.orchestrator.store().get_run(&tenant, run_id).unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.last_error.is_some());

    // Earlier steps kept their success; the failing step is terminal.
    let steps = harness.orchestrator.store().list_steps(&tenant, run_id).unwrap();
    let enrich = steps.iter().find(|s| s.step_key == StepKey::EnrichCompanies).unwrap();
    assert_eq!(enrich.status, StepStatus::Failed);
    assert_eq!(enrich.next_retry_at, None);

    // Retry re-queues the failed step and the root job.
    let retry = harness.orchestrator.retry_run(&tenant, run_id).unwrap();
    assert!(retry.reused.is_none());
    let steps = harness.orchestrator.store().list_steps(&tenant, run_id).unwrap();
    let enrich = steps.iter().find(|s| s.step_key == StepKey::EnrichCompanies).unwrap();
    assert_eq!(enrich.status, StepStatus::Pending);
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Tests cancel semantics across run states.
#[test]
fn test_cancel_run_states() {
    let harness = Harness::new();
    let tenant = harness.tenant();

    // Unknown run.
    assert_eq!(
        harness.orchestrator.cancel_run(&tenant, research_core::identifiers::RunId::new(999)).unwrap(),
        CancelRunOutcome::NotFound
    );

    // Planned run without a job cancels directly.
    let planned = harness.create_run(empty_config());
    assert_eq!(
        harness.orchestrator.cancel_run(&tenant, planned).unwrap(),
        CancelRunOutcome::NoActiveJob
    );
    let run = harness.orchestrator.store().get_run(&tenant, planned).unwrap();
    assert_eq!(run.status, RunStatus::Cancelled);
    for step in harness.orchestrator.store().list_steps(&tenant, planned).unwrap() {
        assert_eq!(step.status, StepStatus::Skipped);
    }

    // Terminal runs are a noop.
    assert_eq!(
        harness.orchestrator.cancel_run(&tenant, planned).unwrap(),
        CancelRunOutcome::NoopTerminal
    );

    // A queued run cancels its queued job immediately.
    let queued = harness.create_run(empty_config());
    harness.orchestrator.start_run(&tenant, queued).unwrap();
    assert_eq!(
        harness.orchestrator.cancel_run(&tenant, queued).unwrap(),
        CancelRunOutcome::Ok
    );
    let run = harness.orchestrator.store().get_run(&tenant, queued).unwrap();
    assert_eq!(run.status, RunStatus::Cancelled);

    // Cancellation left nothing claimable.
    let worker = Worker::new(&harness.orchestrator, WorkerId::new("w1"));
    assert_eq!(worker.run_until_idle().unwrap(), 0);
}

// ============================================================================
// SECTION: Enqueue Idempotency
// ============================================================================

/// Tests acquire-extract enqueue reuse through the orchestrator surface.
#[test]
fn test_enqueue_acquire_extract_reuses() {
    let harness = Harness::new();
    let tenant = harness.tenant();
    let run_id = harness.create_run(empty_config());
    let params = AcquireExtractParams {
        max_urls: 5,
        force: false,
    };

    let first = harness.orchestrator.enqueue_acquire_extract(&tenant, run_id, &params).unwrap();
    let second = harness.orchestrator.enqueue_acquire_extract(&tenant, run_id, &params).unwrap();
    assert_eq!(second.job_id, first.job_id);
    assert_eq!(second.reused, Some(ReuseReason::Inflight));
    assert_eq!(second.params_hash, first.params_hash);

    // The worker executes it exactly once.
    let worker = Worker::new(&harness.orchestrator, WorkerId::new("w1"));
    assert_eq!(worker.run_until_idle().unwrap(), 1);
    let status = harness.orchestrator.get_job_status(&tenant, first.job_id).unwrap();
    assert_eq!(status.status, "succeeded");
    assert!(status.progress_json.is_some());

    // A repeat after success reuses the succeeded job within the TTL.
    let third = harness.orchestrator.enqueue_acquire_extract(&tenant, run_id, &params).unwrap();
    assert_eq!(third.reused, Some(ReuseReason::DuplicateSucceeded));
}

// ============================================================================
// SECTION: Tenant Isolation
// ============================================================================

/// Tests foreign-tenant ids are refused across the surface.
#[test]
fn test_tenant_isolation() {
    let harness = Harness::new();
    let tenant = harness.tenant();
    let other = TenantId::new("tenant-b");
    let run_id = harness.create_run(empty_config());
    harness.orchestrator.start_run(&tenant, run_id).unwrap();

    assert!(matches!(
        harness.orchestrator.start_run(&other, run_id),
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        harness.orchestrator.list_run_events(&other, run_id),
        Err(EngineError::NotFound(_))
    ));
    assert_eq!(
        harness.orchestrator.cancel_run(&other, run_id).unwrap(),
        CancelRunOutcome::NotFound
    );
    let job = harness
        .orchestrator
        .store()
        .active_job_for_run(&tenant, run_id, JobType::RunPlan)
        .unwrap()
        .unwrap();
    assert!(harness.orchestrator.get_job_status(&other, job.id).is_err());
}
