// crates/research-orchestrator/src/service.rs
// ============================================================================
// Module: Orchestrator Service
// Description: Run lifecycle, sources, jobs, and discovery operations.
// Purpose: Expose the operation contract used by external collaborators.
// Dependencies: research-config, research-core, research-providers
// ============================================================================

//! ## Overview
//! Operation semantics live here: run creation plants the step plan, start
//! enqueues the root job, cancellation is cooperative on running jobs and
//! immediate on queued ones, enqueue reuses jobs by params hash, and
//! discovery flows through the enrichment ledger so identical canonical
//! requests never spend provider credit twice. Every operation takes the
//! tenant first and refuses foreign ids.

// ============================================================================
// SECTION: Imports
// ============================================================================

use research_config::EngineConfig;
use research_core::DiscoveredBy;
use research_core::EngineError;
use research_core::EnrichmentOutcome;
use research_core::JobRecord;
use research_core::JobType;
use research_core::NewProspect;
use research_core::NewSource;
use research_core::ProviderResult;
use research_core::ReviewStatus;
use research_core::RunRecord;
use research_core::RunSpec;
use research_core::RunStatus;
use research_core::SourceDocumentRecord;
use research_core::SourceType;
use research_core::Timestamp;
use research_core::canonical_host;
use research_core::default_step_plan;
use research_core::hash_canonical_json;
use research_core::identifiers::JobId;
use research_core::identifiers::ProspectId;
use research_core::identifiers::RunId;
use research_core::identifiers::SourceId;
use research_core::identifiers::TenantId;
use research_core::identifiers::WorkerId;
use research_core::interfaces::CancelJobOutcome;
use research_core::interfaces::Clock;
use research_core::interfaces::ContentFetcher;
use research_core::interfaces::EnqueueOutcome;
use research_core::interfaces::EventRecord;
use research_core::interfaces::NewEnrichment;
use research_core::interfaces::NewEvidence;
use research_core::interfaces::ProviderContext;
use research_core::interfaces::ResearchStore;
use research_core::interfaces::SourceFetchUpdate;
use research_core::normalize_company_name;
use research_core::DEFAULT_HASH_ALGORITHM;
use research_providers::ProviderRegistry;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Operation Results
// ============================================================================

/// Result of a cancel-run call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelRunOutcome {
    /// The run does not exist in the tenant scope.
    NotFound,
    /// The run was already terminal; nothing changed.
    NoopTerminal,
    /// No active job existed; the run was cancelled directly.
    NoActiveJob,
    /// Cancellation was applied (immediately or cooperatively).
    Ok,
}

/// Wire view of a job, as exposed to the outer surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    /// Job identifier.
    pub id: JobId,
    /// Lifecycle status.
    pub status: String,
    /// Attempts consumed.
    pub attempt_count: u32,
    /// Attempt budget.
    pub max_attempts: u32,
    /// Canonical params hash.
    pub params_hash: String,
    /// Worker-reported progress.
    pub progress_json: Option<Value>,
    /// Terminal error detail.
    pub error_json: Option<Value>,
    /// First lease time.
    pub started_at: Option<Timestamp>,
    /// Terminal transition time.
    pub finished_at: Option<Timestamp>,
}

impl JobStatusView {
    /// Projects a job record into the wire view.
    #[must_use]
    pub fn from_record(job: &JobRecord) -> Self {
        Self {
            id: job.id,
            status: job.status.as_str().to_string(),
            attempt_count: job.attempt_count,
            max_attempts: job.max_attempts,
            params_hash: job.params_hash.clone(),
            progress_json: job.progress_json.clone(),
            error_json: job.error_json.clone(),
            started_at: job.started_at,
            finished_at: job.finished_at,
        }
    }
}

/// Result of running a discovery provider through the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRunOutcome {
    /// Ledger outcome, including skip information.
    pub enrichment: EnrichmentOutcome,
    /// Provider key that ran.
    pub provider: String,
    /// Model used, when reported.
    pub model: Option<String>,
    /// Companies newly created from the payload.
    pub companies_added: u32,
    /// Companies merged into existing prospects.
    pub companies_merged: u32,
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// The research engine service binding all adapters.
pub struct Orchestrator<S, F, C> {
    /// Durable store.
    pub(crate) store: S,
    /// Content fetcher for URL sources.
    pub(crate) fetcher: F,
    /// Time authority.
    pub(crate) clock: C,
    /// Immutable engine configuration.
    pub(crate) config: EngineConfig,
    /// Discovery provider registry.
    pub(crate) registry: ProviderRegistry,
}

impl<S, F, C> Orchestrator<S, F, C>
where
    S: ResearchStore,
    F: ContentFetcher,
    C: Clock,
{
    /// Creates the orchestrator.
    #[must_use]
    pub fn new(store: S, fetcher: F, clock: C, config: EngineConfig) -> Self {
        let registry = ProviderRegistry::with_builtin_providers(&config);
        Self {
            store,
            fetcher,
            clock,
            config,
            registry,
        }
    }

    /// Creates the orchestrator with a custom provider registry.
    #[must_use]
    pub fn with_registry(
        store: S,
        fetcher: F,
        clock: C,
        config: EngineConfig,
        registry: ProviderRegistry,
    ) -> Self {
        Self {
            store,
            fetcher,
            clock,
            config,
            registry,
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the underlying store, for read-side surfaces.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the current time from the injected clock.
    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // run lifecycle
    // ------------------------------------------------------------------

    /// Creates a run with its step plan, in `planned` status.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an empty name, mandate, or
    /// sector.
    pub fn create_run(&self, tenant: &TenantId, spec: &RunSpec) -> Result<RunRecord, EngineError> {
        if spec.name.trim().is_empty() {
            return Err(EngineError::Validation("run name is required".to_string()));
        }
        if spec.mandate_id.as_str().trim().is_empty() {
            return Err(EngineError::Validation("mandate is required".to_string()));
        }
        if spec.sector.trim().is_empty() {
            return Err(EngineError::Validation("sector is required".to_string()));
        }
        let now = self.clock.now();
        let run = self.store.create_run(tenant, spec, now)?;
        self.store.insert_step_plan(
            tenant,
            run.id,
            &default_step_plan(),
            self.config.retry.max_attempts,
            now,
        )?;
        Ok(run)
    }

    /// Transitions a planned run to queued and enqueues the root job.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Conflict`] unless the run is `planned`.
    pub fn start_run(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<EnqueueOutcome, EngineError> {
        let run = self.store.get_run(tenant, run_id)?;
        if run.status != RunStatus::Planned {
            return Err(EngineError::Conflict(format!(
                "run {run_id} is {}; only planned runs start",
                run.status
            )));
        }
        let now = self.clock.now();
        self.store.set_run_status(tenant, run_id, RunStatus::Queued, None, now)?;
        let outcome = self.store.enqueue_job(
            tenant,
            run_id,
            JobType::RunPlan,
            &json!({ "run_id": run_id.get() }),
            self.config.retry.max_attempts,
            self.config.job_reuse_ttl_ms,
            now,
        )?;
        Ok(outcome)
    }

    /// Cancels a run: cooperative on running jobs, immediate otherwise.
    ///
    /// Always safe to call; terminal runs are a noop.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] only on store failure.
    pub fn cancel_run(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<CancelRunOutcome, EngineError> {
        let run = match self.store.get_run(tenant, run_id) {
            Ok(run) => run,
            Err(research_core::interfaces::StoreError::NotFound(_)) => {
                return Ok(CancelRunOutcome::NotFound);
            }
            Err(err) => return Err(err.into()),
        };
        if run.status.is_terminal() {
            return Ok(CancelRunOutcome::NoopTerminal);
        }

        let now = self.clock.now();
        let mut active = self.store.active_job_for_run(tenant, run_id, JobType::RunPlan)?;
        if active.is_none() {
            active = self.store.active_job_for_run(tenant, run_id, JobType::AcquireExtract)?;
        }
        let Some(job) = active else {
            self.cancel_pending_steps(tenant, run_id, now)?;
            self.store.set_run_status(tenant, run_id, RunStatus::Cancelled, None, now)?;
            return Ok(CancelRunOutcome::NoActiveJob);
        };

        match self.store.cancel_job(tenant, job.id, now)? {
            CancelJobOutcome::Cancelled => {
                self.cancel_pending_steps(tenant, run_id, now)?;
                self.store.set_run_status(tenant, run_id, RunStatus::Cancelled, None, now)?;
            }
            CancelJobOutcome::CancelRequested | CancelJobOutcome::NoopTerminal => {}
        }
        Ok(CancelRunOutcome::Ok)
    }

    /// Re-queues failed steps and the root job of a failed or cancelled run.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Conflict`] unless the run is failed or
    /// cancelled.
    pub fn retry_run(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<EnqueueOutcome, EngineError> {
        let run = self.store.get_run(tenant, run_id)?;
        if !matches!(run.status, RunStatus::Failed | RunStatus::Cancelled) {
            return Err(EngineError::Conflict(format!(
                "run {run_id} is {}; only failed or cancelled runs retry",
                run.status
            )));
        }
        let now = self.clock.now();
        self.store.reset_failed_steps(tenant, run_id, now)?;
        self.store.set_run_status(tenant, run_id, RunStatus::Queued, None, now)?;
        if let Some(job) = self.store.active_job_for_run(tenant, run_id, JobType::RunPlan)? {
            return Ok(EnqueueOutcome {
                job_id: job.id,
                params_hash: job.params_hash,
                reused: Some(research_core::ReuseReason::Inflight),
            });
        }
        // A fresh attempt counter: the retry is a new execution budget.
        let outcome = self.store.enqueue_job(
            tenant,
            run_id,
            JobType::RunPlan,
            &json!({ "run_id": run_id.get(), "retry_of": run.finished_at }),
            self.config.retry.max_attempts,
            0,
            now,
        )?;
        Ok(outcome)
    }

    /// Marks remaining pending/running steps of a run as skipped.
    fn cancel_pending_steps(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        now: Timestamp,
    ) -> Result<(), EngineError> {
        for step in self.store.list_steps(tenant, run_id)? {
            if matches!(
                step.status,
                research_core::StepStatus::Pending | research_core::StepStatus::Running
            ) {
                self.store.step_mark_skipped(tenant, step.id, "cancelled", now)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // sources
    // ------------------------------------------------------------------

    /// Registers a source document for acquisition.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when the source shape does not
    /// match its type.
    pub fn add_source(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        source: &NewSource,
    ) -> Result<SourceDocumentRecord, EngineError> {
        self.store.get_run(tenant, run_id)?;
        match source.source_type {
            SourceType::Url => {
                if source.url.as_deref().is_none_or(|url| url.trim().is_empty()) {
                    return Err(EngineError::Validation("url sources require a url".to_string()));
                }
            }
            SourceType::Text => {
                if source.content_text.as_deref().is_none_or(str::is_empty) {
                    return Err(EngineError::Validation(
                        "text sources require content_text".to_string(),
                    ));
                }
            }
            SourceType::Pdf => {
                if source.content_bytes.as_deref().is_none_or(<[u8]>::is_empty) {
                    return Err(EngineError::Validation(
                        "pdf sources require content_bytes".to_string(),
                    ));
                }
            }
            SourceType::ProviderJson | SourceType::LlmJson => {
                if source.content_text.as_deref().is_none_or(str::is_empty) {
                    return Err(EngineError::Validation(
                        "envelope sources require content_text".to_string(),
                    ));
                }
            }
        }
        let mut source = source.clone();
        if source.max_attempts == 0 {
            source.max_attempts = self.config.fetch_retry.max_attempts;
        }
        let record = self.store.add_source(tenant, run_id, &source, self.clock.now())?;
        Ok(record)
    }

    // ------------------------------------------------------------------
    // jobs
    // ------------------------------------------------------------------

    /// Enqueues an acquire+extract job with params-hash idempotency.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on store failure or a conflicting active job.
    pub fn enqueue_acquire_extract(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        params: &crate::acquire::AcquireExtractParams,
    ) -> Result<EnqueueOutcome, EngineError> {
        self.store.get_run(tenant, run_id)?;
        let canonical = params.canonical(&self.config);
        let outcome = self.store.enqueue_job(
            tenant,
            run_id,
            JobType::AcquireExtract,
            &canonical,
            self.config.retry.max_attempts,
            self.config.job_reuse_ttl_ms,
            self.clock.now(),
        )?;
        Ok(outcome)
    }

    /// Claims the next job of a type for a worker.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on store failure.
    pub fn claim_next_job(
        &self,
        worker: &WorkerId,
        job_type: JobType,
    ) -> Result<Option<JobRecord>, EngineError> {
        let job = self.store.claim_next_job(
            worker,
            job_type,
            self.config.stale_lease_after_ms,
            self.clock.now(),
        )?;
        Ok(job)
    }

    /// Returns the wire view of a job.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] when absent in the tenant scope.
    pub fn get_job_status(
        &self,
        tenant: &TenantId,
        job_id: JobId,
    ) -> Result<JobStatusView, EngineError> {
        let job = self.store.get_job(tenant, job_id)?;
        Ok(JobStatusView::from_record(&job))
    }

    /// Lists the audit events of a run.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on store failure.
    pub fn list_run_events(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<EventRecord>, EngineError> {
        self.store.get_run(tenant, run_id)?;
        Ok(self.store.list_events(tenant, run_id)?)
    }

    // ------------------------------------------------------------------
    // review
    // ------------------------------------------------------------------

    /// Updates the review state of a prospect.
    ///
    /// The executive-search gate can only be enabled on accepted prospects;
    /// any transition away from accepted force-disables it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Conflict`] when enabling the gate without
    /// acceptance.
    pub fn update_prospect_review(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
        review_status: ReviewStatus,
        exec_search_enabled: bool,
    ) -> Result<(), EngineError> {
        if exec_search_enabled && review_status != ReviewStatus::Accepted {
            return Err(EngineError::Conflict(
                "exec search requires an accepted prospect".to_string(),
            ));
        }
        let enabled = exec_search_enabled && review_status == ReviewStatus::Accepted;
        self.store.set_prospect_review(tenant, prospect_id, review_status, enabled)?;
        Ok(())
    }

    /// Records a typed metric on a prospect.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an empty metric key or an
    /// out-of-range confidence.
    #[allow(clippy::too_many_arguments, reason = "Metric rows carry exactly these fields.")]
    pub fn record_company_metric(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        prospect_id: ProspectId,
        metric_key: &str,
        value: &research_core::MetricValue,
        as_of_year: Option<i32>,
        confidence: Option<f64>,
        source_document_id: Option<SourceId>,
    ) -> Result<i64, EngineError> {
        if metric_key.trim().is_empty() {
            return Err(EngineError::Validation("metric key is required".to_string()));
        }
        if let Some(confidence) = confidence
            && !(0.0..=1.0).contains(&confidence)
        {
            return Err(EngineError::Validation(format!(
                "confidence {confidence} out of range"
            )));
        }
        let prospect = self.store.get_prospect(tenant, prospect_id)?;
        if prospect.run_id != run_id {
            return Err(EngineError::NotFound(format!(
                "prospect {prospect_id} in run {run_id}"
            )));
        }
        let id = self.store.record_metric(
            tenant,
            run_id,
            prospect_id,
            metric_key,
            value,
            as_of_year,
            confidence,
            source_document_id,
            self.clock.now(),
        )?;
        Ok(id)
    }

    // ------------------------------------------------------------------
    // discovery
    // ------------------------------------------------------------------

    /// Runs a discovery provider through the enrichment ledger.
    ///
    /// Identical canonical requests within the TTL are skipped with
    /// `reason = duplicate_hash` and the original ids; `force` bypasses the
    /// TTL but still reuses on an exact content-hash match.
    ///
    /// # Errors
    ///
    /// Returns gate and validation errors unchanged;
    /// [`EngineError::Upstream`] when the provider reported a failure.
    pub fn run_discovery_provider(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        provider_key: &str,
        request: &Value,
        force: bool,
    ) -> Result<DiscoveryRunOutcome, EngineError> {
        self.store.get_run(tenant, run_id)?;
        let ctx = ProviderContext {
            tenant_id: tenant.clone(),
            run_id,
        };
        let result = self.registry.run(provider_key, &ctx, request)?;
        let now = self.clock.now();

        if let Some(error) = &result.error {
            self.store.record_event(
                tenant,
                run_id,
                "enrich",
                "failed",
                Some(request),
                result.envelope.as_ref(),
                error.get("message").and_then(Value::as_str),
                now,
            )?;
            return Err(EngineError::Upstream {
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("provider error")
                    .to_string(),
                status_code: error
                    .get("status_code")
                    .and_then(Value::as_u64)
                    .and_then(|code| u16::try_from(code).ok()),
            });
        }
        let Some(payload) = &result.payload else {
            return Err(EngineError::Upstream {
                message: "provider returned no payload".to_string(),
                status_code: None,
            });
        };
        payload.validate().map_err(|err| EngineError::Validation(err.to_string()))?;

        let scope_source = result
            .raw_input_meta
            .as_ref()
            .and_then(|meta| meta.get("normalized_params").cloned())
            .unwrap_or_else(|| request.clone());
        let input_scope_hash =
            hash_canonical_json(DEFAULT_HASH_ALGORITHM, &scope_source)?.hex().to_string();
        let content_hash =
            hash_canonical_json(DEFAULT_HASH_ALGORITHM, payload)?.hex().to_string();

        let purpose = "company_discovery";
        let target_type = "run";
        let existing = if force {
            self.store.find_enrichment_by_hash(
                tenant,
                run_id,
                provider_key,
                purpose,
                target_type,
                run_id.get(),
                &input_scope_hash,
                &content_hash,
            )?
        } else {
            self.store
                .find_enrichment_in_ttl(
                    tenant,
                    run_id,
                    provider_key,
                    purpose,
                    target_type,
                    run_id.get(),
                    &input_scope_hash,
                    self.config.enrichment_ttl_ms,
                    now,
                )?
                .filter(|record| record.content_hash == content_hash)
        };
        if let Some(record) = existing {
            return Ok(DiscoveryRunOutcome {
                enrichment: EnrichmentOutcome {
                    enrichment_id: record.id,
                    source_document_id: record.source_document_id,
                    content_hash: record.content_hash,
                    skipped: true,
                    reason: Some("duplicate_hash".to_string()),
                },
                provider: result.provider,
                model: result.model,
                companies_added: 0,
                companies_merged: 0,
            });
        }

        let source_id = self.store_envelope(tenant, run_id, &result, &content_hash, now)?;
        let enrichment = self.store.insert_enrichment(
            tenant,
            run_id,
            &NewEnrichment {
                provider: provider_key.to_string(),
                purpose: purpose.to_string(),
                target_type: target_type.to_string(),
                target_id: run_id.get(),
                input_scope_hash,
                content_hash: content_hash.clone(),
                source_document_id: source_id,
            },
            now,
        )?;

        let attribution = match provider_key {
            "web_search" | "llm_research" => DiscoveredBy::External,
            _ => DiscoveredBy::Internal,
        };
        let (added, merged) =
            self.apply_companies(tenant, run_id, &result, source_id, attribution, now)?;
        // The payload is the extract; the envelope source is done once the
        // companies are applied.
        self.store.mark_source_processed(
            tenant,
            source_id,
            &json!({
                "method": "provider_payload",
                "companies_added": added,
                "companies_merged": merged,
            }),
            now,
        )?;

        self.store.record_event(
            tenant,
            run_id,
            "enrich",
            "ok",
            Some(&scope_source),
            Some(&json!({
                "provider": provider_key,
                "content_hash": content_hash,
                "companies_added": added,
                "companies_merged": merged,
            })),
            None,
            now,
        )?;

        Ok(DiscoveryRunOutcome {
            enrichment: EnrichmentOutcome {
                enrichment_id: enrichment.id,
                source_document_id: source_id,
                content_hash,
                skipped: false,
                reason: None,
            },
            provider: result.provider,
            model: result.model,
            companies_added: added,
            companies_merged: merged,
        })
    }

    /// Stores a provider envelope as a content-addressed source document.
    fn store_envelope(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        result: &ProviderResult,
        content_hash: &str,
        now: Timestamp,
    ) -> Result<SourceId, EngineError> {
        // Content-addressed write: an identical envelope converges on the
        // existing canonical row.
        if let Some(existing) = self.store.find_source_by_hash(tenant, run_id, content_hash)? {
            return Ok(existing);
        }
        let source_type = result
            .source_type
            .as_deref()
            .and_then(SourceType::parse)
            .unwrap_or(SourceType::ProviderJson);
        let envelope_text = serde_json::to_string(&json!({
            "payload": result.payload,
            "envelope": result.envelope,
            "raw_input_meta": result.raw_input_meta,
        }))
        .map_err(|err| EngineError::Store(err.to_string()))?;

        let record = self.store.add_source(
            tenant,
            run_id,
            &NewSource {
                source_type,
                title: Some(format!("{} envelope", result.provider)),
                url: None,
                provider: Some(result.provider.clone()),
                content_text: Some(envelope_text.clone()),
                content_bytes: None,
                mime_type: Some("application/json".to_string()),
                max_attempts: 1,
            },
            now,
        )?;
        self.store.save_source_fetched(
            tenant,
            record.id,
            &SourceFetchUpdate {
                content_text: Some(envelope_text),
                content_bytes: None,
                content_hash: content_hash.to_string(),
                mime_type: Some("application/json".to_string()),
                http_final_url: None,
                url_normalized: None,
                http_status_code: None,
                http_headers: std::collections::BTreeMap::new(),
                fetch_info: research_core::FetchInfo {
                    deduped: false,
                    extraction_method: Some("provider_payload".to_string()),
                    not_modified: false,
                    redirects: 0,
                },
            },
            now,
        )?;
        Ok(record.id)
    }

    /// Merges payload companies into the run's prospect set.
    fn apply_companies(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        result: &ProviderResult,
        source_id: SourceId,
        attribution: DiscoveredBy,
        now: Timestamp,
    ) -> Result<(u32, u32), EngineError> {
        let Some(payload) = &result.payload else {
            return Ok((0, 0));
        };
        let mut added = 0u32;
        let mut merged = 0u32;
        let limit = usize::try_from(self.config.max_company_count).unwrap_or(usize::MAX);

        for company in payload.companies.iter().take(limit) {
            let name_normalized = normalize_company_name(&company.name);
            if name_normalized.is_empty() {
                continue;
            }
            let host = company.website_url.as_deref().and_then(canonical_host);

            let mut existing =
                self.store.find_prospect_by_name(tenant, run_id, &name_normalized)?;
            if existing.is_none()
                && let Some(host) = &host
            {
                existing = self.store.find_prospect_by_host(tenant, run_id, host)?;
            }

            let confidence = company.confidence.unwrap_or(0.5);
            let prospect_id = if let Some(existing) = existing {
                self.store.merge_into_prospect(tenant, existing.id, confidence, attribution)?;
                merged += 1;
                existing.id
            } else {
                let created = self.store.create_prospect(
                    tenant,
                    run_id,
                    &NewProspect {
                        name_raw: company.name.clone(),
                        name_normalized,
                        website_url: company.website_url.clone(),
                        hq_country: company.hq_country.clone(),
                        hq_city: company.hq_city.clone(),
                        sector: company
                            .sector
                            .clone()
                            .unwrap_or_else(|| "unclassified".to_string()),
                        subsector: company.subsector.clone(),
                        description: company.description.clone(),
                        relevance_score: confidence,
                        evidence_score: confidence,
                        confidence,
                        discovered_by: attribution,
                    },
                    now,
                )?;
                added += 1;
                created.id
            };

            if company.evidence.is_empty() {
                self.store.add_prospect_evidence(
                    tenant,
                    prospect_id,
                    &NewEvidence {
                        source_type: "provider".to_string(),
                        source_name: result.provider.clone(),
                        source_url: company.website_url.clone(),
                        source_document_id: Some(source_id),
                        source_content_hash: None,
                        raw_snippet: company.description.clone(),
                        evidence_weight: confidence,
                    },
                    now,
                )?;
            }
            for evidence in &company.evidence {
                self.store.add_prospect_evidence(
                    tenant,
                    prospect_id,
                    &NewEvidence {
                        source_type: evidence
                            .kind
                            .clone()
                            .unwrap_or_else(|| "provider".to_string()),
                        source_name: evidence
                            .label
                            .clone()
                            .unwrap_or_else(|| result.provider.clone()),
                        source_url: Some(evidence.url.clone()),
                        source_document_id: Some(source_id),
                        source_content_hash: None,
                        raw_snippet: evidence.snippet.clone(),
                        evidence_weight: confidence,
                    },
                    now,
                )?;
            }
        }
        Ok((added, merged))
    }
}
