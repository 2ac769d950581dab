// crates/research-core/src/core/run.rs
// ============================================================================
// Module: Run and Step Model
// Description: Research run lifecycle and ordered step plan records.
// Purpose: Provide the state-machine types driven by the orchestrator.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A run is one company-research exercise for a mandate. Its plan is a fixed,
//! ordered list of steps; a step advances only when every earlier step is
//! succeeded or skipped, and steps retry under bounded backoff. Terminal run
//! statuses are absorbing: the only transition out of `failed` is an explicit
//! retry, which re-queues the failed steps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::MandateId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::StepId;
use crate::core::identifiers::TenantId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Run Status
// ============================================================================

/// Lifecycle status of a research run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created; steps planned but nothing enqueued.
    Planned,
    /// Root job enqueued; waiting for a worker.
    Queued,
    /// A worker is executing the step plan.
    Running,
    /// Every step finished in succeeded or skipped.
    Succeeded,
    /// A step exhausted its attempts.
    Failed,
    /// Cancelled by request.
    Cancelled,
}

impl RunStatus {
    /// Returns true for absorbing statuses.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Returns the stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "planned" => Some(Self::Planned),
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Run Spec and Record
// ============================================================================

/// Caller-supplied specification for a new run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    /// Mandate the run is scoped to.
    pub mandate_id: MandateId,
    /// Display name of the run.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Sector under research.
    pub sector: String,
    /// ISO country codes bounding the search, when any.
    pub region_scope: Vec<String>,
    /// Ranking / discovery configuration carried opaquely.
    pub config: Value,
    /// Identifier of the creating user, when known.
    pub created_by: Option<String>,
}

/// Persisted research run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run identifier.
    pub id: RunId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Mandate the run serves.
    pub mandate_id: MandateId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Sector under research.
    pub sector: String,
    /// ISO country codes bounding the search.
    pub region_scope: Vec<String>,
    /// Ranking / discovery configuration.
    pub config: Value,
    /// Lifecycle status.
    pub status: RunStatus,
    /// Result summary written by the finalize step.
    pub summary: Option<String>,
    /// Last step error surfaced at run level.
    pub last_error: Option<String>,
    /// Identifier of the creating user.
    pub created_by: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Time the first worker entered the plan.
    pub started_at: Option<Timestamp>,
    /// Time the run reached a terminal status.
    pub finished_at: Option<Timestamp>,
}

// ============================================================================
// SECTION: Step Plan
// ============================================================================

/// Fixed step keys of the research plan, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKey {
    /// Register run-configured and provider-discovered URLs as sources.
    AcquireUrls,
    /// Fetch every pending URL source.
    FetchUrlSources,
    /// Extract company candidates from fetched sources.
    ExtractSources,
    /// Merge duplicate prospects and attach evidence.
    DedupeProspects,
    /// Run enrichment providers for accepted discovery modes.
    EnrichCompanies,
    /// Run executive discovery for eligible prospects.
    ExecDiscovery,
    /// Write the run summary and close out.
    Finalize,
}

impl StepKey {
    /// Returns the stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AcquireUrls => "acquire_urls",
            Self::FetchUrlSources => "fetch_url_sources",
            Self::ExtractSources => "extract_sources",
            Self::DedupeProspects => "dedupe_prospects",
            Self::EnrichCompanies => "enrich_companies",
            Self::ExecDiscovery => "exec_discovery",
            Self::Finalize => "finalize",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "acquire_urls" => Some(Self::AcquireUrls),
            "fetch_url_sources" => Some(Self::FetchUrlSources),
            "extract_sources" => Some(Self::ExtractSources),
            "dedupe_prospects" => Some(Self::DedupeProspects),
            "enrich_companies" => Some(Self::EnrichCompanies),
            "exec_discovery" => Some(Self::ExecDiscovery),
            "finalize" => Some(Self::Finalize),
            _ => None,
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the default ordered step plan for a new run.
#[must_use]
pub const fn default_step_plan() -> [StepKey; 7] {
    [
        StepKey::AcquireUrls,
        StepKey::FetchUrlSources,
        StepKey::ExtractSources,
        StepKey::DedupeProspects,
        StepKey::EnrichCompanies,
        StepKey::ExecDiscovery,
        StepKey::Finalize,
    ]
}

// ============================================================================
// SECTION: Step Status and Record
// ============================================================================

/// Lifecycle status of one run step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet entered.
    Pending,
    /// Currently executing.
    Running,
    /// Completed.
    Succeeded,
    /// Failed; retried until attempts are spent.
    Failed,
    /// Will never execute (cancelled run or disabled step).
    Skipped,
}

impl StepStatus {
    /// Returns the stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Returns true when a later step may advance past this one.
    #[must_use]
    pub const fn allows_advance(self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted run step.
///
/// # Invariants
/// - `(tenant_id, run_id, step_key)` is unique.
/// - Steps execute strictly in `step_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStepRecord {
    /// Step identifier.
    pub id: StepId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning run.
    pub run_id: RunId,
    /// Plan key of the step.
    pub step_key: StepKey,
    /// Execution order within the run.
    pub step_order: i64,
    /// Lifecycle status.
    pub status: StepStatus,
    /// Attempts consumed so far.
    pub attempt_count: u32,
    /// Attempt budget.
    pub max_attempts: u32,
    /// Earliest next retry time when failed.
    pub next_retry_at: Option<Timestamp>,
    /// Input snapshot, including the idempotency `input_hash`.
    pub input_json: Option<Value>,
    /// Output snapshot of the last successful execution.
    pub output_json: Option<Value>,
    /// Last error message.
    pub last_error: Option<String>,
    /// Time the step first entered running.
    pub started_at: Option<Timestamp>,
    /// Time the step reached succeeded, skipped, or terminal failure.
    pub finished_at: Option<Timestamp>,
}
