// crates/research-core/src/interfaces/mod.rs
// ============================================================================
// Module: Research Engine Interfaces
// Description: Backend-agnostic contracts for storage, fetch, and discovery.
// Purpose: Define the surfaces the orchestrator composes adapters through.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Interfaces define how the research engine integrates with storage, the
//! network, discovery providers, and the wall clock without embedding
//! backend-specific details. Implementations must be deterministic where the
//! contract says so and fail closed on missing or invalid data. The core
//! never reads wall-clock time; every mutation takes explicit timestamps
//! produced by the host through [`Clock`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::discovery::ProviderResult;
use crate::core::enrichment::EnrichmentRecord;
use crate::core::error::EngineError;
use crate::core::executive::DecisionType;
use crate::core::executive::ExecutiveRecord;
use crate::core::executive::ExecutiveEvidenceRecord;
use crate::core::executive::MergeDecisionRecord;
use crate::core::executive::NewExecutive;
use crate::core::executive::PromotionIds;
use crate::core::executive::VerificationStatus;
use crate::core::export::ExportPackRecord;
use crate::core::identifiers::DecisionId;
use crate::core::identifiers::ExecutiveId;
use crate::core::identifiers::JobId;
use crate::core::identifiers::PackId;
use crate::core::identifiers::ProspectId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::SourceId;
use crate::core::identifiers::StepId;
use crate::core::identifiers::TenantId;
use crate::core::identifiers::WorkerId;
use crate::core::job::JobRecord;
use crate::core::job::JobType;
use crate::core::job::ReuseReason;
use crate::core::prospect::DiscoveredBy;
use crate::core::prospect::MetricValue;
use crate::core::prospect::NewProspect;
use crate::core::prospect::ProspectEvidenceRecord;
use crate::core::prospect::ProspectMetricRecord;
use crate::core::prospect::ProspectRecord;
use crate::core::prospect::ReviewStatus;
use crate::core::retry::RetryPolicy;
use crate::core::run::RunRecord;
use crate::core::run::RunSpec;
use crate::core::run::RunStatus;
use crate::core::run::RunStepRecord;
use crate::core::run::StepKey;
use crate::core::source::FetchInfo;
use crate::core::source::NewSource;
use crate::core::source::SourceDocumentRecord;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Host-supplied time source.
///
/// The engine takes every timestamp from one injected clock so retries,
/// leases, and TTL checks have a single authority and tests can fast-forward
/// instead of sleeping.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

impl<T: Clock> Clock for std::sync::Arc<T> {
    fn now(&self) -> Timestamp {
        T::now(self)
    }
}

// ============================================================================
// SECTION: Store Error
// ============================================================================

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced id absent within the tenant scope.
    #[error("not found: {0}")]
    NotFound(String),
    /// A uniqueness or state invariant was violated.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Retriable contention (busy database, lease race).
    #[error("busy: {0}")]
    Busy(String),
    /// Stored data failed validation on read.
    #[error("corrupt row: {0}")]
    Corrupt(String),
    /// Backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Busy(msg) => Self::Transient(msg),
            StoreError::Corrupt(msg) | StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}

// ============================================================================
// SECTION: Store Contract Types
// ============================================================================

/// Result of an enqueue call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueOutcome {
    /// Job satisfying the request (new or reused).
    pub job_id: JobId,
    /// Canonical params hash of the request.
    pub params_hash: String,
    /// Present when an existing job was reused.
    pub reused: Option<ReuseReason>,
}

/// Result of failing a job attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFailOutcome {
    /// Attempts remain; the job is queued again no earlier than the time.
    Requeued(Timestamp),
    /// The attempt budget is spent; the job is terminally failed.
    Failed,
}

/// Result of a cancel call on a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelJobOutcome {
    /// The job was already terminal; nothing changed.
    NoopTerminal,
    /// The queued job was cancelled immediately.
    Cancelled,
    /// The running job was asked to stop cooperatively.
    CancelRequested,
}

/// Acquisition result applied to a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFetchUpdate {
    /// Extracted or supplied text content.
    pub content_text: Option<String>,
    /// Raw bytes for binary artifacts.
    pub content_bytes: Option<Vec<u8>>,
    /// SHA-256 content hash of the normalized content.
    pub content_hash: String,
    /// MIME type of the acquired content.
    pub mime_type: Option<String>,
    /// Final URL after redirects.
    pub http_final_url: Option<String>,
    /// Canonicalized form of the final URL.
    pub url_normalized: Option<String>,
    /// HTTP status code observed.
    pub http_status_code: Option<u16>,
    /// Captured response header subset (lowercased names).
    pub http_headers: BTreeMap<String, String>,
    /// Acquisition metadata.
    pub fetch_info: FetchInfo,
}

/// Specification for one evidence link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvidence {
    /// Source classification, e.g. `document`, `provider`.
    pub source_type: String,
    /// Human-readable source name.
    pub source_name: String,
    /// Source URL, when any.
    pub source_url: Option<String>,
    /// Source document reference, when any.
    pub source_document_id: Option<SourceId>,
    /// Content hash of the source document at link time.
    pub source_content_hash: Option<String>,
    /// Snippet where the entity appeared.
    pub raw_snippet: Option<String>,
    /// Weight of this evidence in `[0, 1]`.
    pub evidence_weight: f64,
}

/// Specification for one merge decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMergeDecision {
    /// Company prospect the decision is scoped to.
    pub prospect_id: ProspectId,
    /// Left executive of the pair.
    pub left_executive_id: ExecutiveId,
    /// Right executive of the pair.
    pub right_executive_id: ExecutiveId,
    /// Kind of decision.
    pub decision_type: DecisionType,
    /// Evidence references supporting the decision.
    pub evidence: Value,
    /// Identifier of the deciding user.
    pub created_by: Option<String>,
    /// Free-form note.
    pub note: Option<String>,
}

/// Persisted research audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event row identifier.
    pub id: i64,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning run.
    pub run_id: RunId,
    /// Event kind, e.g. `fetch_failed`, `retry_exhausted`.
    pub event_type: String,
    /// Outcome status: `ok` or `failed`.
    pub status: String,
    /// Input snapshot.
    pub input_json: Option<Value>,
    /// Output snapshot.
    pub output_json: Option<Value>,
    /// Error message, when failed.
    pub error_message: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
}

/// New enrichment ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEnrichment {
    /// Provider key that produced the payload.
    pub provider: String,
    /// Purpose of the call.
    pub purpose: String,
    /// Target entity type.
    pub target_type: String,
    /// Target entity id.
    pub target_id: i64,
    /// Hash of the canonicalized request scope.
    pub input_scope_hash: String,
    /// Hash of the canonicalized payload.
    pub content_hash: String,
    /// Source document holding the payload envelope.
    pub source_document_id: SourceId,
}

// ============================================================================
// SECTION: Research Store
// ============================================================================

/// Durable, tenant-scoped persistence contract for the research engine.
///
/// Every read rejects ids outside the tenant scope with
/// [`StoreError::NotFound`]. Implementations must make [`Self::claim_next_job`]
/// atomic: two concurrent claimers never receive the same job.
pub trait ResearchStore {
    // ------------------------------------------------------------------
    // runs
    // ------------------------------------------------------------------

    /// Creates a run in `planned` status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn create_run(
        &self,
        tenant: &TenantId,
        spec: &RunSpec,
        now: Timestamp,
    ) -> Result<RunRecord, StoreError>;

    /// Loads a run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn get_run(&self, tenant: &TenantId, run_id: RunId) -> Result<RunRecord, StoreError>;

    /// Lists runs for a tenant, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_runs(&self, tenant: &TenantId) -> Result<Vec<RunRecord>, StoreError>;

    /// Sets the run status, maintaining started/finished timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn set_run_status(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        status: RunStatus,
        last_error: Option<&str>,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Writes the run summary.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn set_run_summary(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        summary: &str,
    ) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // steps
    // ------------------------------------------------------------------

    /// Inserts the ordered step plan for a run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the run already has a plan.
    fn insert_step_plan(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        plan: &[StepKey],
        max_attempts: u32,
        now: Timestamp,
    ) -> Result<Vec<RunStepRecord>, StoreError>;

    /// Lists the steps of a run in plan order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_steps(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<RunStepRecord>, StoreError>;

    /// Marks a step running and increments its attempt counter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn step_mark_running(
        &self,
        tenant: &TenantId,
        step_id: StepId,
        input_json: &Value,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Marks a step succeeded with its output snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn step_mark_succeeded(
        &self,
        tenant: &TenantId,
        step_id: StepId,
        output_json: &Value,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Marks a step failed, optionally scheduling a retry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn step_mark_failed(
        &self,
        tenant: &TenantId,
        step_id: StepId,
        error: &str,
        next_retry_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Marks a step skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn step_mark_skipped(
        &self,
        tenant: &TenantId,
        step_id: StepId,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Re-queues failed steps (and steps skipped by cancellation) of a run
    /// for an explicit retry.
    ///
    /// Returns the number of steps reset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn reset_failed_steps(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        now: Timestamp,
    ) -> Result<u32, StoreError>;

    // ------------------------------------------------------------------
    // jobs
    // ------------------------------------------------------------------

    /// Enqueues a job, reusing an existing one on a params-hash hit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    #[allow(clippy::too_many_arguments, reason = "Enqueue carries the full idempotency key.")]
    fn enqueue_job(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        job_type: JobType,
        params: &Value,
        max_attempts: u32,
        reuse_ttl_ms: i64,
        now: Timestamp,
    ) -> Result<EnqueueOutcome, StoreError>;

    /// Atomically claims the oldest eligible job for a worker.
    ///
    /// Eligible rows are queued with `next_retry_at` due, or running with a
    /// lease older than `stale_after_ms`. Claiming increments the attempt
    /// counter and takes the lease.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn claim_next_job(
        &self,
        worker: &WorkerId,
        job_type: JobType,
        stale_after_ms: i64,
        now: Timestamp,
    ) -> Result<Option<JobRecord>, StoreError>;

    /// Loads a job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn get_job(&self, tenant: &TenantId, job_id: JobId) -> Result<JobRecord, StoreError>;

    /// Returns the active (queued or running) job of a run and type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn active_job_for_run(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        job_type: JobType,
    ) -> Result<Option<JobRecord>, StoreError>;

    /// Marks a job succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the job is absent.
    fn complete_job(
        &self,
        job_id: JobId,
        progress: Option<&Value>,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Fails a job attempt: re-queues under backoff or fails terminally.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the job is absent.
    fn fail_job(
        &self,
        job_id: JobId,
        error: &Value,
        policy: &RetryPolicy,
        now: Timestamp,
    ) -> Result<JobFailOutcome, StoreError>;

    /// Cancels a job: immediate when queued, cooperative when running.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn cancel_job(
        &self,
        tenant: &TenantId,
        job_id: JobId,
        now: Timestamp,
    ) -> Result<CancelJobOutcome, StoreError>;

    /// Re-queues a failed or cancelled job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the job is not failed or
    /// cancelled.
    fn retry_job(
        &self,
        tenant: &TenantId,
        job_id: JobId,
        reset_attempts: bool,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Returns true when cooperative cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the job is absent.
    fn job_cancel_requested(&self, job_id: JobId) -> Result<bool, StoreError>;

    /// Marks a running job cancelled after its worker observed the
    /// cooperative flag and stopped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the job is absent.
    fn acknowledge_cancel(&self, job_id: JobId, now: Timestamp) -> Result<(), StoreError>;

    /// Writes worker progress onto a running job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the job is absent.
    fn set_job_progress(
        &self,
        job_id: JobId,
        progress: &Value,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // source documents
    // ------------------------------------------------------------------

    /// Registers a source document in `new` status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn add_source(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        source: &NewSource,
        now: Timestamp,
    ) -> Result<SourceDocumentRecord, StoreError>;

    /// Loads a source document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn get_source(
        &self,
        tenant: &TenantId,
        source_id: SourceId,
    ) -> Result<SourceDocumentRecord, StoreError>;

    /// Lists the source documents of a run ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_sources(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<SourceDocumentRecord>, StoreError>;

    /// Lists sources eligible for acquisition, ordered by id.
    ///
    /// Eligible rows are `new`, or `failed` with attempts remaining and
    /// `next_retry_at` due.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_fetchable_sources(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<SourceDocumentRecord>, StoreError>;

    /// Finds the canonical source row holding a content hash within a run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn find_source_by_hash(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        content_hash: &str,
    ) -> Result<Option<SourceId>, StoreError>;

    /// Applies an acquisition result: content, hash, and fetch metadata.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn save_source_fetched(
        &self,
        tenant: &TenantId,
        source_id: SourceId,
        update: &SourceFetchUpdate,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Marks a source as a processed duplicate of a canonical row.
    ///
    /// Clears the content hash and records `fetch_info.deduped = true`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn mark_source_duplicate(
        &self,
        tenant: &TenantId,
        source_id: SourceId,
        canonical_id: SourceId,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Marks a source processed with an extraction summary.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn mark_source_processed(
        &self,
        tenant: &TenantId,
        source_id: SourceId,
        summary: &Value,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Records a failed acquisition attempt.
    ///
    /// Increments the attempt counter; a null `next_retry_at` makes the
    /// failure terminal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn mark_source_fetch_failed(
        &self,
        tenant: &TenantId,
        source_id: SourceId,
        http_status_code: Option<u16>,
        error: &str,
        next_retry_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // prospects
    // ------------------------------------------------------------------

    /// Creates a company prospect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when a canonical row already exists
    /// for the normalized name within the run.
    fn create_prospect(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        prospect: &NewProspect,
        now: Timestamp,
    ) -> Result<ProspectRecord, StoreError>;

    /// Loads a prospect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn get_prospect(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
    ) -> Result<ProspectRecord, StoreError>;

    /// Lists the prospects of a run ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_prospects(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<ProspectRecord>, StoreError>;

    /// Finds a prospect by normalized name within a run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn find_prospect_by_name(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        name_normalized: &str,
    ) -> Result<Option<ProspectRecord>, StoreError>;

    /// Finds a prospect by canonical website host within a run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn find_prospect_by_host(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        host: &str,
    ) -> Result<Option<ProspectRecord>, StoreError>;

    /// Applies merge effects to a canonical prospect: monotonic evidence
    /// score and combined discovery attribution. Manual fields are never
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn merge_into_prospect(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
        evidence_score: f64,
        discovered_by: DiscoveredBy,
    ) -> Result<(), StoreError>;

    /// Rewrites every reference to a duplicate prospect (evidence, metrics,
    /// executives) onto the canonical prospect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when either prospect is absent.
    fn rewrite_prospect_references(
        &self,
        tenant: &TenantId,
        from: ProspectId,
        to: ProspectId,
    ) -> Result<(), StoreError>;

    /// Deletes a duplicate prospect row after its references were rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the prospect is absent.
    fn delete_prospect(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
    ) -> Result<(), StoreError>;

    /// Sets the review status and executive-search gate of a prospect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn set_prospect_review(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
        review_status: ReviewStatus,
        exec_search_enabled: bool,
    ) -> Result<(), StoreError>;

    /// Links evidence to a prospect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the prospect is absent.
    fn add_prospect_evidence(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
        evidence: &NewEvidence,
        now: Timestamp,
    ) -> Result<i64, StoreError>;

    /// Lists prospect evidence for a run ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_prospect_evidence(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<ProspectEvidenceRecord>, StoreError>;

    /// Records a typed metric for a prospect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the prospect is absent.
    #[allow(clippy::too_many_arguments, reason = "Metric rows carry exactly these fields.")]
    fn record_metric(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        prospect_id: ProspectId,
        metric_key: &str,
        value: &MetricValue,
        as_of_year: Option<i32>,
        confidence: Option<f64>,
        source_document_id: Option<SourceId>,
        now: Timestamp,
    ) -> Result<i64, StoreError>;

    /// Lists the metrics of a run ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_metrics(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<ProspectMetricRecord>, StoreError>;

    // ------------------------------------------------------------------
    // executives
    // ------------------------------------------------------------------

    /// Creates an executive prospect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the company prospect is absent.
    fn create_executive(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        executive: &NewExecutive,
        now: Timestamp,
    ) -> Result<ExecutiveRecord, StoreError>;

    /// Loads an executive.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn get_executive(
        &self,
        tenant: &TenantId,
        executive_id: ExecutiveId,
    ) -> Result<ExecutiveRecord, StoreError>;

    /// Lists the executives of a run ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_executives(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<ExecutiveRecord>, StoreError>;

    /// Lists the executives of one company prospect ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_executives_for_prospect(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
    ) -> Result<Vec<ExecutiveRecord>, StoreError>;

    /// Finds an executive by normalized name within a company prospect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn find_executive_by_name(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
        name_normalized: &str,
    ) -> Result<Option<ExecutiveRecord>, StoreError>;

    /// Sets the discovery attribution of an executive.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn set_executive_discovered_by(
        &self,
        tenant: &TenantId,
        executive_id: ExecutiveId,
        discovered_by: DiscoveredBy,
    ) -> Result<(), StoreError>;

    /// Writes the verification status of an executive.
    ///
    /// Monotonicity is enforced by the orchestrator before calling.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn set_executive_verification(
        &self,
        tenant: &TenantId,
        executive_id: ExecutiveId,
        status: VerificationStatus,
    ) -> Result<(), StoreError>;

    /// Links evidence to an executive.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the executive is absent.
    fn add_executive_evidence(
        &self,
        tenant: &TenantId,
        executive_id: ExecutiveId,
        evidence: &NewEvidence,
        now: Timestamp,
    ) -> Result<i64, StoreError>;

    /// Lists executive evidence for a run ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_executive_evidence(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<ExecutiveEvidenceRecord>, StoreError>;

    /// Records a merge decision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when a referenced executive is
    /// absent.
    fn record_merge_decision(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        decision: &NewMergeDecision,
        now: Timestamp,
    ) -> Result<MergeDecisionRecord, StoreError>;

    /// Lists the merge decisions of a run ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_merge_decisions(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<MergeDecisionRecord>, StoreError>;

    /// Loads one merge decision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn get_merge_decision(
        &self,
        tenant: &TenantId,
        decision_id: DecisionId,
    ) -> Result<MergeDecisionRecord, StoreError>;

    /// Returns the ATS ids for a canonical executive, creating them when
    /// absent. The boolean is true when the ids were created by this call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the executive is absent.
    fn upsert_promotion(
        &self,
        tenant: &TenantId,
        canonical_executive_id: ExecutiveId,
        now: Timestamp,
    ) -> Result<(PromotionIds, bool), StoreError>;

    /// Copies promoted ATS ids onto an executive row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn set_executive_ats_ids(
        &self,
        tenant: &TenantId,
        executive_id: ExecutiveId,
        ids: &PromotionIds,
    ) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // enrichment ledger
    // ------------------------------------------------------------------

    /// Finds an enrichment record for the scope key created within the TTL.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    #[allow(clippy::too_many_arguments, reason = "The ledger key spans provider, purpose, target, and scope hash.")]
    fn find_enrichment_in_ttl(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        provider: &str,
        purpose: &str,
        target_type: &str,
        target_id: i64,
        input_scope_hash: &str,
        ttl_ms: i64,
        now: Timestamp,
    ) -> Result<Option<EnrichmentRecord>, StoreError>;

    /// Finds an enrichment record for the scope key with an exact payload
    /// content hash, regardless of age.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    #[allow(clippy::too_many_arguments, reason = "The ledger key spans provider, purpose, target, and scope hash.")]
    fn find_enrichment_by_hash(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        provider: &str,
        purpose: &str,
        target_type: &str,
        target_id: i64,
        input_scope_hash: &str,
        content_hash: &str,
    ) -> Result<Option<EnrichmentRecord>, StoreError>;

    /// Inserts an enrichment ledger row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn insert_enrichment(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        enrichment: &NewEnrichment,
        now: Timestamp,
    ) -> Result<EnrichmentRecord, StoreError>;

    // ------------------------------------------------------------------
    // export packs
    // ------------------------------------------------------------------

    /// Appends an export pack registry row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn insert_export_pack(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        storage_pointer: &str,
        sha256: &str,
        size_bytes: u64,
        now: Timestamp,
    ) -> Result<ExportPackRecord, StoreError>;

    /// Finalizes the storage pointer of a freshly inserted pack row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the pack is absent.
    fn set_export_pack_pointer(
        &self,
        tenant: &TenantId,
        pack_id: PackId,
        storage_pointer: &str,
    ) -> Result<(), StoreError>;

    /// Lists export packs for a run by `(created_at desc, id desc)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_export_packs(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<ExportPackRecord>, StoreError>;

    /// Loads an export pack registry row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when absent in the tenant scope.
    fn get_export_pack(
        &self,
        tenant: &TenantId,
        pack_id: PackId,
    ) -> Result<ExportPackRecord, StoreError>;

    // ------------------------------------------------------------------
    // audit events
    // ------------------------------------------------------------------

    /// Records an audit event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    #[allow(clippy::too_many_arguments, reason = "Audit rows carry exactly these fields.")]
    fn record_event(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        event_type: &str,
        status: &str,
        input_json: Option<&Value>,
        output_json: Option<&Value>,
        error_message: Option<&str>,
        now: Timestamp,
    ) -> Result<i64, StoreError>;

    /// Lists the audit events of a run ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn list_events(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<EventRecord>, StoreError>;

    /// Counts the audit events of a run with the given type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    fn count_events(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        event_type: &str,
    ) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Content Fetcher
// ============================================================================

/// One acquisition request for a URL source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// URL to fetch.
    pub url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size in bytes.
    pub max_bytes: usize,
    /// Maximum redirects to follow.
    pub max_redirects: u32,
    /// `If-None-Match` value from a previous response.
    pub etag: Option<String>,
    /// `If-Modified-Since` value from a previous response.
    pub last_modified: Option<String>,
    /// Whether to consult robots.txt for the host before fetching.
    pub respect_robots: bool,
}

/// Successful acquisition result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Final URL after redirects.
    pub final_url: String,
    /// Count of redirects followed.
    pub redirects: u32,
    /// True when the server answered 304 to a conditional request.
    pub not_modified: bool,
    /// Response body; empty on 304.
    pub body: Vec<u8>,
    /// Captured response header subset (lowercased names).
    pub headers: BTreeMap<String, String>,
}

/// Acquisition failures, classified for the retry policy.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL failed validation before any request was made.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// robots.txt disallows fetching this URL.
    #[error("blocked by robots policy: {0}")]
    RobotsDisallowed(String),
    /// Network-level failure; retriable.
    #[error("network error: {0}")]
    Network(String),
    /// HTTP error status from the origin.
    #[error("http status {status}")]
    Status {
        /// The received status code.
        status: u16,
        /// Captured response header subset.
        headers: BTreeMap<String, String>,
        /// True when the retry policy applies (5xx, 408, 429).
        retriable: bool,
        /// Parsed `Retry-After` delay in milliseconds, when present.
        retry_after_ms: Option<i64>,
    },
    /// Response exceeded the configured size cap.
    #[error("response exceeds {max_bytes} bytes")]
    TooLarge {
        /// The configured cap.
        max_bytes: usize,
    },
}

impl FetchError {
    /// Returns true when the retry policy applies to this failure.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { retriable, .. } => *retriable,
            Self::InvalidUrl(_) | Self::RobotsDisallowed(_) | Self::TooLarge { .. } => false,
        }
    }
}

/// Backend-agnostic content fetcher.
pub trait ContentFetcher {
    /// Performs one acquisition attempt.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] classified for the retry policy.
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

impl<T: ContentFetcher> ContentFetcher for std::sync::Arc<T> {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        T::fetch(self, request)
    }
}

// ============================================================================
// SECTION: Discovery Provider
// ============================================================================

/// Context passed to discovery providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderContext {
    /// Tenant the call is scoped to.
    pub tenant_id: TenantId,
    /// Run the call is scoped to.
    pub run_id: RunId,
}

/// Backend-agnostic discovery provider.
///
/// Implementations never read the environment directly; gating and
/// credentials flow through the engine configuration at construction time.
pub trait DiscoveryProvider {
    /// Returns the stable provider key.
    fn key(&self) -> &str;

    /// Returns the provider contract version.
    fn version(&self) -> &str;

    /// Runs the provider for a request.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ExternalProviderConfig`] when the external
    /// gate refuses the call, and [`EngineError::Validation`] for malformed
    /// requests. Upstream failures are reported inside the result envelope.
    fn run(&self, ctx: &ProviderContext, request: &Value) -> Result<ProviderResult, EngineError>;
}
