// crates/research-orchestrator/src/steps.rs
// ============================================================================
// Module: Run Step Machine Driver
// Description: Ordered step execution with retries and cancellation.
// Purpose: Drive a run's plan from a claimed run_plan job.
// Dependencies: research-core
// ============================================================================

//! ## Overview
//! The driver walks a run's plan strictly in step order: a step executes
//! only when every earlier step allows advance. Step failures consume a
//! bounded attempt and schedule a backoff retry through a new job cycle; at
//! the attempt cap the run fails with the step's error. Cancellation is
//! checked between steps, never mid-I/O: the current step is marked skipped
//! and earlier successes stand. Step handlers are idempotent: their inputs
//! are hashed into the step record, and a succeeded step never re-executes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use research_core::EngineError;
use research_core::JobRecord;
use research_core::RunStatus;
use research_core::RunStepRecord;
use research_core::SourceType;
use research_core::StepKey;
use research_core::StepStatus;
use research_core::Timestamp;
use research_core::hash_canonical_json;
use research_core::identifiers::RunId;
use research_core::identifiers::TenantId;
use research_core::interfaces::Clock;
use research_core::interfaces::ContentFetcher;
use research_core::interfaces::ResearchStore;
use research_core::DEFAULT_HASH_ALGORITHM;
use research_core::NewSource;
use serde_json::Value;
use serde_json::json;

use crate::acquire::AcquireExtractParams;
use crate::service::Orchestrator;

// ============================================================================
// SECTION: Driver
// ============================================================================

impl<S, F, C> Orchestrator<S, F, C>
where
    S: ResearchStore,
    F: ContentFetcher,
    C: Clock,
{
    /// Executes a claimed `run_plan` job: drives the step machine.
    ///
    /// Returns `Ok(())` after completing or terminally failing the job; the
    /// queue handles re-cycles for retryable step failures.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] only on store failure.
    pub fn execute_run_plan_job(&self, job: &JobRecord) -> Result<(), EngineError> {
        let tenant = job.tenant_id.clone();
        let run_id = job.run_id;
        let now = self.clock.now();
        self.store.set_run_status(&tenant, run_id, RunStatus::Running, None, now)?;

        loop {
            if self.store.job_cancel_requested(job.id)? {
                let now = self.clock.now();
                self.cancel_current_step(&tenant, run_id, now)?;
                self.store.set_run_status(&tenant, run_id, RunStatus::Cancelled, None, now)?;
                self.store.acknowledge_cancel(job.id, now)?;
                return Ok(());
            }

            let now = self.clock.now();
            let steps = self.store.list_steps(&tenant, run_id)?;
            let Some(step) = next_executable_step(&steps, now) else {
                return self.conclude_plan(&tenant, run_id, job, &steps);
            };

            // The input hash keys step idempotency: a succeeded step with
            // this hash never re-enters, and handlers behind it are
            // content-addressed so crash re-entry produces no new effects.
            let input_hash = hash_canonical_json(
                DEFAULT_HASH_ALGORITHM,
                &json!({ "step_key": step.step_key, "params": job.params_json }),
            )?
            .hex()
            .to_string();
            let input = json!({
                "step_key": step.step_key,
                "params": job.params_json,
                "input_hash": input_hash,
            });
            self.store.step_mark_running(&tenant, step.id, &input, now)?;

            match self.execute_step(&tenant, run_id, step.step_key, job) {
                Ok(StepOutcome::Succeeded(output)) => {
                    self.store.step_mark_succeeded(
                        &tenant,
                        step.id,
                        &output,
                        self.clock.now(),
                    )?;
                }
                Ok(StepOutcome::Skipped(reason)) => {
                    self.store.step_mark_skipped(&tenant, step.id, &reason, self.clock.now())?;
                }
                Err(err) => {
                    return self.handle_step_failure(&tenant, run_id, job, step, &err);
                }
            }
        }
    }

    /// Concludes a plan with no executable step left.
    fn conclude_plan(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        job: &JobRecord,
        steps: &[RunStepRecord],
    ) -> Result<(), EngineError> {
        let now = self.clock.now();
        let all_done = steps.iter().all(|step| step.status.allows_advance());
        if all_done {
            self.store.set_run_status(tenant, run_id, RunStatus::Succeeded, None, now)?;
            self.store.complete_job(job.id, Some(&json!({ "steps": steps.len() })), now)?;
            return Ok(());
        }

        // A step is waiting on its retry window: fail this cycle so the
        // queue re-delivers after backoff.
        let waiting = steps
            .iter()
            .find(|step| step.status == StepStatus::Failed && step.next_retry_at.is_some());
        if let Some(step) = waiting {
            let error = json!({
                "step_key": step.step_key,
                "error": step.last_error,
                "next_retry_at": step.next_retry_at,
            });
            let outcome = self.store.fail_job(job.id, &error, &self.config.retry, now)?;
            if outcome == research_core::interfaces::JobFailOutcome::Failed {
                let message =
                    step.last_error.clone().unwrap_or_else(|| "job attempts exhausted".to_string());
                self.store.set_run_status(tenant, run_id, RunStatus::Failed, Some(&message), now)?;
            }
            return Ok(());
        }

        // A step exhausted its attempts: the run fails terminally and the
        // job completes (no further cycles would help).
        let exhausted = steps.iter().find(|step| step.status == StepStatus::Failed);
        let message = exhausted
            .and_then(|step| step.last_error.clone())
            .unwrap_or_else(|| "step failed".to_string());
        self.store.set_run_status(tenant, run_id, RunStatus::Failed, Some(&message), now)?;
        self.store
            .complete_job(job.id, Some(&json!({ "run_failed": true, "error": message })), now)?;
        Ok(())
    }

    /// Applies failure bookkeeping for one step attempt.
    fn handle_step_failure(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        job: &JobRecord,
        step: &RunStepRecord,
        err: &EngineError,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();
        let attempt = step.attempt_count + 1;
        let message = err.to_string();

        if attempt >= step.max_attempts || !err.is_retriable() {
            self.store.step_mark_failed(tenant, step.id, &message, None, now)?;
            self.store.set_run_status(tenant, run_id, RunStatus::Failed, Some(&message), now)?;
            self.store.complete_job(
                job.id,
                Some(&json!({ "run_failed": true, "step": step.step_key, "error": message })),
                now,
            )?;
            return Ok(());
        }

        let retry_at = self.config.retry.next_retry_time(attempt, now);
        self.store.step_mark_failed(tenant, step.id, &message, Some(retry_at), now)?;
        let outcome = self.store.fail_job(
            job.id,
            &json!({ "step": step.step_key, "error": message }),
            &self.config.retry,
            now,
        )?;
        if outcome == research_core::interfaces::JobFailOutcome::Failed {
            self.store.set_run_status(tenant, run_id, RunStatus::Failed, Some(&message), now)?;
        }
        Ok(())
    }

    /// Marks the currently running step of a run as skipped.
    fn cancel_current_step(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        now: Timestamp,
    ) -> Result<(), EngineError> {
        for step in self.store.list_steps(tenant, run_id)? {
            if matches!(step.status, StepStatus::Running | StepStatus::Pending) {
                self.store.step_mark_skipped(tenant, step.id, "cancelled", now)?;
            }
        }
        Ok(())
    }

    /// Executes one step handler.
    fn execute_step(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        key: StepKey,
        job: &JobRecord,
    ) -> Result<StepOutcome, EngineError> {
        match key {
            StepKey::AcquireUrls => self.step_acquire_urls(tenant, run_id),
            StepKey::FetchUrlSources => {
                let report = self.fetch_sources(
                    tenant,
                    run_id,
                    &AcquireExtractParams::default(),
                    Some(job.id),
                )?;
                Ok(StepOutcome::Succeeded(json!({
                    "selected": report.selected,
                    "fetched": report.fetched,
                    "deduped": report.deduped,
                    "failed": report.failed,
                })))
            }
            StepKey::ExtractSources => {
                let report = self.extract_sources(tenant, run_id, Some(job.id))?;
                Ok(StepOutcome::Succeeded(json!({
                    "processed": report.processed,
                    "prospects_added": report.prospects_added,
                    "prospects_merged": report.prospects_merged,
                })))
            }
            StepKey::DedupeProspects => self.step_dedupe_prospects(tenant, run_id),
            StepKey::EnrichCompanies => self.step_enrich_companies(tenant, run_id),
            StepKey::ExecDiscovery => self.step_exec_discovery(tenant, run_id),
            StepKey::Finalize => self.step_finalize(tenant, run_id),
        }
    }

    /// Seeds URL sources from the run configuration.
    fn step_acquire_urls(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<StepOutcome, EngineError> {
        let run = self.store.get_run(tenant, run_id)?;
        let seeds: Vec<String> = run
            .config
            .get("seed_urls")
            .and_then(Value::as_array)
            .map(|urls| {
                urls.iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let existing: Vec<Option<String>> = self
            .store
            .list_sources(tenant, run_id)?
            .into_iter()
            .map(|source| source.url)
            .collect();
        let mut added = 0u32;
        for seed in seeds {
            if existing.iter().any(|url| url.as_deref() == Some(seed.as_str())) {
                continue;
            }
            self.add_source(
                tenant,
                run_id,
                &NewSource {
                    source_type: SourceType::Url,
                    title: None,
                    url: Some(seed),
                    provider: None,
                    content_text: None,
                    content_bytes: None,
                    mime_type: None,
                    max_attempts: 0,
                },
            )?;
            added += 1;
        }
        Ok(StepOutcome::Succeeded(json!({ "seeded": added })))
    }

    /// Collapses prospects sharing a canonical website host.
    fn step_dedupe_prospects(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<StepOutcome, EngineError> {
        let prospects = self.store.list_prospects(tenant, run_id)?;
        let mut merged = 0u32;
        let mut seen_hosts: Vec<(String, research_core::identifiers::ProspectId)> = Vec::new();

        for prospect in &prospects {
            let Some(host) =
                prospect.website_url.as_deref().and_then(research_core::canonical_host)
            else {
                continue;
            };
            let canonical =
                seen_hosts.iter().find(|(seen, _)| *seen == host).map(|(_, id)| *id);
            if let Some(canonical_id) = canonical {
                self.store.merge_into_prospect(
                    tenant,
                    canonical_id,
                    prospect.evidence_score,
                    prospect.discovered_by,
                )?;
                self.store.rewrite_prospect_references(tenant, prospect.id, canonical_id)?;
                self.store.delete_prospect(tenant, prospect.id)?;
                merged += 1;
            } else {
                seen_hosts.push((host, prospect.id));
            }
        }

        let now = self.clock.now();
        self.store.record_event(
            tenant,
            run_id,
            "dedupe",
            "ok",
            None,
            Some(&json!({ "host_merges": merged })),
            None,
            now,
        )?;
        Ok(StepOutcome::Succeeded(json!({
            "prospects": prospects.len(),
            "host_merges": merged,
        })))
    }

    /// Runs the providers named in the run configuration.
    fn step_enrich_companies(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<StepOutcome, EngineError> {
        let run = self.store.get_run(tenant, run_id)?;
        let Some(provider_specs) = run.config.get("providers").and_then(Value::as_array).cloned()
        else {
            return Ok(StepOutcome::Skipped("no providers configured".to_string()));
        };

        let mut ran = 0u32;
        let mut skipped = 0u32;
        for spec in provider_specs {
            let Some(key) = spec.get("provider").and_then(Value::as_str) else {
                continue;
            };
            let request = spec.get("request").cloned().unwrap_or_else(|| json!({}));
            let outcome = self.run_discovery_provider(tenant, run_id, key, &request, false)?;
            if outcome.enrichment.skipped {
                skipped += 1;
            } else {
                ran += 1;
            }
        }
        Ok(StepOutcome::Succeeded(json!({ "providers_ran": ran, "providers_skipped": skipped })))
    }

    /// Checks executive-discovery eligibility.
    fn step_exec_discovery(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<StepOutcome, EngineError> {
        let eligible = self
            .store
            .list_prospects(tenant, run_id)?
            .into_iter()
            .filter(|prospect| {
                prospect.review_status == research_core::ReviewStatus::Accepted
                    && prospect.exec_search_enabled
            })
            .count();
        if eligible == 0 {
            return Ok(StepOutcome::Skipped("no eligible prospects".to_string()));
        }
        Ok(StepOutcome::Succeeded(json!({ "eligible_prospects": eligible })))
    }

    /// Writes the run summary.
    fn step_finalize(&self, tenant: &TenantId, run_id: RunId) -> Result<StepOutcome, EngineError> {
        let prospects = self.store.list_prospects(tenant, run_id)?;
        let executives = self.store.list_executives(tenant, run_id)?;
        let sources = self.store.list_sources(tenant, run_id)?;
        let summary = format!(
            "{} prospects, {} executives, {} sources",
            prospects.len(),
            executives.len(),
            sources.len()
        );
        self.store.set_run_summary(tenant, run_id, &summary)?;
        Ok(StepOutcome::Succeeded(json!({ "summary": summary })))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Result of one step handler.
enum StepOutcome {
    /// The step finished with an output snapshot.
    Succeeded(Value),
    /// The step does not apply to this run.
    Skipped(String),
}

/// Picks the next step eligible to execute.
///
/// A step executes only when every earlier step allows advance. Failed steps
/// with a due retry re-execute; failed steps waiting on backoff (or spent)
/// block the plan.
fn next_executable_step(steps: &[RunStepRecord], now: Timestamp) -> Option<&RunStepRecord> {
    for step in steps {
        match step.status {
            StepStatus::Succeeded | StepStatus::Skipped => {}
            StepStatus::Pending | StepStatus::Running => return Some(step),
            StepStatus::Failed => {
                let due = step.next_retry_at.is_some_and(|at| at <= now)
                    && step.attempt_count < step.max_attempts;
                return due.then_some(step);
            }
        }
    }
    None
}
