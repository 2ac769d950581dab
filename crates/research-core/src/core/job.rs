// crates/research-core/src/core/job.rs
// ============================================================================
// Module: Durable Job Model
// Description: Queue entry types with lease and idempotency fields.
// Purpose: Provide the at-least-once work item driven by workers.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A job is one durable unit of work for a run. The queue provides
//! at-least-once delivery; effects become exactly-once through the
//! `params_hash` reuse check at enqueue time and content hashing inside the
//! steps a job drives. A running job is leased to a worker via
//! `locked_at`/`locked_by`; leases older than the stale threshold are
//! reclaimed by the next claimer with the attempt counter incremented.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::JobId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::TenantId;
use crate::core::identifiers::WorkerId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Job Type
// ============================================================================

/// Kinds of durable work the queue carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Drive the full run step plan.
    RunPlan,
    /// Fetch and extract sources for a run without advancing the plan.
    AcquireExtract,
}

impl JobType {
    /// Returns the stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunPlan => "run_plan",
            Self::AcquireExtract => "acquire_extract",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "run_plan" => Some(Self::RunPlan),
            "acquire_extract" => Some(Self::AcquireExtract),
            _ => None,
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Job Status
// ============================================================================

/// Lifecycle status of a durable job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be claimed.
    Queued,
    /// Leased to a worker.
    Running,
    /// Completed.
    Succeeded,
    /// Attempts exhausted.
    Failed,
    /// Cancelled before or during execution.
    Cancelled,
}

impl JobStatus {
    /// Returns true for absorbing statuses.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Returns the stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
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
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Reuse Reason
// ============================================================================

/// Why an enqueue call returned an existing job instead of inserting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReuseReason {
    /// A job with the same params hash is queued or running.
    Inflight,
    /// A job with the same params hash succeeded within the reuse TTL.
    DuplicateSucceeded,
}

impl ReuseReason {
    /// Returns the stable string form used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inflight => "inflight",
            Self::DuplicateSucceeded => "duplicate_succeeded",
        }
    }
}

// ============================================================================
// SECTION: Job Record
// ============================================================================

/// Persisted durable job.
///
/// # Invariants
/// - At most one `(tenant_id, run_id, job_type)` row is queued or running.
/// - `params_hash` is the SHA-256 of the RFC 8785 canonical params JSON.
/// - Lease reclamation never touches a terminal row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job identifier.
    pub id: JobId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning run.
    pub run_id: RunId,
    /// Kind of work.
    pub job_type: JobType,
    /// Idempotency key over canonical params.
    pub params_hash: String,
    /// Canonicalized parameters.
    pub params_json: Value,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Attempts consumed so far.
    pub attempt_count: u32,
    /// Attempt budget.
    pub max_attempts: u32,
    /// Earliest next claim time while queued for retry.
    pub next_retry_at: Option<Timestamp>,
    /// Lease start time while running.
    pub locked_at: Option<Timestamp>,
    /// Lease holder while running.
    pub locked_by: Option<WorkerId>,
    /// Cooperative cancellation flag observed by workers.
    pub cancel_requested: bool,
    /// Worker-reported progress.
    pub progress_json: Option<Value>,
    /// Terminal error detail.
    pub error_json: Option<Value>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last transition time; monotonic per row.
    pub updated_at: Timestamp,
    /// Time the first lease was taken.
    pub started_at: Option<Timestamp>,
    /// Time the job reached a terminal status.
    pub finished_at: Option<Timestamp>,
}
