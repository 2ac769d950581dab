// crates/research-core/src/core/enrichment.rs
// ============================================================================
// Module: Enrichment Ledger Model
// Description: Content-hash keyed record of provider outputs.
// Purpose: Provide the TTL/hash idempotency key for provider calls.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every provider call lands in the enrichment ledger keyed by
//! `(tenant, run, provider, purpose, target, input_scope_hash)`. A repeat
//! call whose canonical payload hashes to an existing in-TTL record is
//! skipped and returns the original source document and enrichment ids, so
//! `force = false` re-runs never spend provider credit. `force = true`
//! bypasses the TTL but still reuses on an exact content-hash match.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::EnrichmentId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::SourceId;
use crate::core::identifiers::TenantId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Outcome status of an enrichment call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// Provider ran and the payload was stored.
    Stored,
    /// Provider returned an error envelope.
    Failed,
}

impl EnrichmentStatus {
    /// Returns the stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Failed => "failed",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stored" => Some(Self::Stored),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for EnrichmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Persisted enrichment ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    /// Ledger row identifier.
    pub id: EnrichmentId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning run.
    pub run_id: RunId,
    /// Provider key that produced the payload.
    pub provider: String,
    /// Purpose of the call, e.g. `company_discovery`.
    pub purpose: String,
    /// Target entity type, e.g. `run`, `prospect`.
    pub target_type: String,
    /// Target entity id within the tenant scope.
    pub target_id: i64,
    /// Hash of the canonicalized request scope.
    pub input_scope_hash: String,
    /// Hash of the canonicalized payload.
    pub content_hash: String,
    /// Outcome status.
    pub status: EnrichmentStatus,
    /// Source document holding the payload envelope.
    pub source_document_id: SourceId,
    /// Creation time; the TTL anchor.
    pub created_at: Timestamp,
}

/// Result of running a provider through the enrichment ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentOutcome {
    /// Ledger row satisfied by the call.
    pub enrichment_id: EnrichmentId,
    /// Source document holding the payload.
    pub source_document_id: SourceId,
    /// Canonical payload content hash.
    pub content_hash: String,
    /// True when an existing record satisfied the call.
    pub skipped: bool,
    /// Skip explanation; `duplicate_hash` on a hash hit.
    pub reason: Option<String>,
}
