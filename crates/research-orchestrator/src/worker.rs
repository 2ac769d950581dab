// crates/research-orchestrator/src/worker.rs
// ============================================================================
// Module: Worker Runtime
// Description: Claim, execute, and acknowledge loop over the durable queue.
// Purpose: Drive jobs with cooperative cancellation and crash tolerance.
// Dependencies: research-core
// ============================================================================

//! ## Overview
//! A worker is a synchronous loop: claim the oldest eligible job, execute it
//! through the orchestrator, acknowledge the outcome, repeat. Two workers
//! never execute the same job, because the claim is atomic. A crashed worker
//! leaves a running row whose stale lease the next claimer reclaims with the
//! attempt counter bumped. Cancellation is cooperative: handlers observe the
//! flag at checkpoints between sources and steps, and the worker acknowledges
//! by moving the job to cancelled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use research_core::EngineError;
use research_core::JobRecord;
use research_core::JobType;
use research_core::identifiers::WorkerId;
use research_core::interfaces::Clock;
use research_core::interfaces::ContentFetcher;
use research_core::interfaces::ResearchStore;
use serde_json::json;

use crate::acquire::AcquireExtractParams;
use crate::service::Orchestrator;

// ============================================================================
// SECTION: Worker
// ============================================================================

/// Job types a worker drains, in claim order.
const CLAIM_ORDER: [JobType; 2] = [JobType::RunPlan, JobType::AcquireExtract];

/// A synchronous queue worker.
pub struct Worker<'a, S, F, C> {
    /// The orchestrator executing claimed jobs.
    orchestrator: &'a Orchestrator<S, F, C>,
    /// Lease identity of this worker.
    worker_id: WorkerId,
    /// Idle poll interval.
    poll_interval: Duration,
}

impl<'a, S, F, C> Worker<'a, S, F, C>
where
    S: ResearchStore,
    F: ContentFetcher,
    C: Clock,
{
    /// Creates a worker bound to an orchestrator.
    #[must_use]
    pub fn new(orchestrator: &'a Orchestrator<S, F, C>, worker_id: WorkerId) -> Self {
        let poll_interval =
            Duration::from_millis(orchestrator.config().worker_poll_interval_ms);
        Self {
            orchestrator,
            worker_id,
            poll_interval,
        }
    }

    /// Claims and executes a single job when one is available.
    ///
    /// Returns true when a job was processed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on store failure.
    pub fn run_once(&self) -> Result<bool, EngineError> {
        for job_type in CLAIM_ORDER {
            let claimed = self.orchestrator.claim_next_job(&self.worker_id, job_type)?;
            if let Some(job) = claimed {
                self.execute(&job)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Runs until the queue is drained.
    ///
    /// Returns the number of jobs processed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on store failure.
    pub fn run_until_idle(&self) -> Result<u32, EngineError> {
        let mut processed = 0u32;
        while self.run_once()? {
            processed += 1;
        }
        Ok(processed)
    }

    /// Polls until the stop flag is raised.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on store failure.
    pub fn run_forever(&self, stop: &AtomicBool) -> Result<(), EngineError> {
        while !stop.load(Ordering::SeqCst) {
            if !self.run_once()? {
                std::thread::sleep(self.poll_interval);
            }
        }
        Ok(())
    }

    /// Executes one claimed job and acknowledges the outcome.
    fn execute(&self, job: &JobRecord) -> Result<(), EngineError> {
        match job.job_type {
            JobType::RunPlan => self.orchestrator.execute_run_plan_job(job),
            JobType::AcquireExtract => self.execute_acquire_extract(job),
        }
    }

    /// Executes an acquire+extract job.
    fn execute_acquire_extract(&self, job: &JobRecord) -> Result<(), EngineError> {
        let params: AcquireExtractParams =
            serde_json::from_value(job.params_json.clone()).unwrap_or_default();
        let outcome = self.orchestrator.acquire_extract(
            &job.tenant_id,
            job.run_id,
            &params,
            Some(job.id),
        );
        let store = self.orchestrator.store();
        let now = self.orchestrator.now();
        match outcome {
            Ok(report) => {
                if store.job_cancel_requested(job.id)? {
                    store.acknowledge_cancel(job.id, now)?;
                    return Ok(());
                }
                let progress = serde_json::to_value(&report)
                    .map_err(|err| EngineError::Store(err.to_string()))?;
                store.complete_job(job.id, Some(&progress), now)?;
                Ok(())
            }
            Err(err) => {
                store.fail_job(
                    job.id,
                    &json!({ "error": err.to_string(), "code": err.code() }),
                    &self.orchestrator.config().retry,
                    now,
                )?;
                Ok(())
            }
        }
    }
}
