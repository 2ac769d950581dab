// crates/research-core/src/core/executive.rs
// ============================================================================
// Module: Executive Prospect Model
// Description: Executive candidates, merge decisions, and promotion contract.
// Purpose: Represent the dual-engine executive pipeline records.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Executives are person candidates inside a company prospect, discovered by
//! the internal and external engines. User merge decisions connect them into
//! identity components; promotion to the ATS always resolves through the
//! component canonical so every member shares one candidate/contact/assignment
//! triple. Verification only ever moves forward.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::DecisionId;
use crate::core::identifiers::ExecutiveId;
use crate::core::identifiers::ProspectId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::SourceId;
use crate::core::identifiers::TenantId;
use crate::core::prospect::DiscoveredBy;
use crate::core::prospect::ReviewStatus;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Verification Status
// ============================================================================

/// Verification state of an executive; strictly monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// No verification performed.
    Unverified,
    /// Some fields verified.
    Partial,
    /// Fully verified.
    Verified,
}

impl VerificationStatus {
    /// Returns the stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Partial => "partial",
            Self::Verified => "verified",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unverified" => Some(Self::Unverified),
            "partial" => Some(Self::Partial),
            "verified" => Some(Self::Verified),
            _ => None,
        }
    }

    /// Returns true when moving from `self` to `next` is a downgrade.
    #[must_use]
    pub fn is_downgrade_to(self, next: Self) -> bool {
        next < self
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Engine Side
// ============================================================================

/// Which executive-discovery engine produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineSide {
    /// Internal extraction engine.
    Internal,
    /// External provider engine.
    External,
}

impl EngineSide {
    /// Returns the stable string form used in payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
        }
    }

    /// Returns the discovery attribution for this side.
    #[must_use]
    pub const fn attribution(self) -> DiscoveredBy {
        match self {
            Self::Internal => DiscoveredBy::Internal,
            Self::External => DiscoveredBy::External,
        }
    }
}

// ============================================================================
// SECTION: Executive Records
// ============================================================================

/// Specification for creating an executive prospect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExecutive {
    /// Company prospect the executive belongs to.
    pub prospect_id: ProspectId,
    /// Raw name as discovered.
    pub name_raw: String,
    /// Normalized person-name key.
    pub name_normalized: String,
    /// Job title, when known.
    pub title: Option<String>,
    /// Profile URL, when known.
    pub profile_url: Option<String>,
    /// LinkedIn URL; preferred over generic profiles.
    pub linkedin_url: Option<String>,
    /// Email, when known.
    pub email: Option<String>,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Engine that produced the record.
    pub engine: EngineSide,
    /// Human-readable source label.
    pub source_label: Option<String>,
    /// Source document the record came from.
    pub source_document_id: Option<SourceId>,
}

/// Persisted executive prospect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveRecord {
    /// Executive identifier.
    pub id: ExecutiveId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning run.
    pub run_id: RunId,
    /// Company prospect the executive belongs to.
    pub prospect_id: ProspectId,
    /// Raw name as discovered.
    pub name_raw: String,
    /// Normalized person-name key.
    pub name_normalized: String,
    /// Job title.
    pub title: Option<String>,
    /// Profile URL.
    pub profile_url: Option<String>,
    /// LinkedIn URL; preferred.
    pub linkedin_url: Option<String>,
    /// Email.
    pub email: Option<String>,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Which engine(s) discovered the executive.
    pub discovered_by: DiscoveredBy,
    /// Review state.
    pub review_status: ReviewStatus,
    /// Verification state; monotonic.
    pub verification_status: VerificationStatus,
    /// Human-readable source label.
    pub source_label: Option<String>,
    /// Source document the record came from.
    pub source_document_id: Option<SourceId>,
    /// ATS candidate id; populated only after canonical promotion.
    pub candidate_id: Option<String>,
    /// ATS contact id; populated only after canonical promotion.
    pub contact_id: Option<String>,
    /// ATS assignment id; populated only after canonical promotion.
    pub assignment_id: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Executive Evidence
// ============================================================================

/// Provenance record linking an executive to a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveEvidenceRecord {
    /// Evidence row identifier.
    pub id: i64,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Executive the evidence supports.
    pub executive_id: ExecutiveId,
    /// Source classification.
    pub source_type: String,
    /// Human-readable source name.
    pub source_name: String,
    /// Source URL, when any.
    pub source_url: Option<String>,
    /// Source document reference, when any.
    pub source_document_id: Option<SourceId>,
    /// Content hash of the source document at link time.
    pub source_content_hash: Option<String>,
    /// Snippet where the executive appeared.
    pub raw_snippet: Option<String>,
    /// Weight of this evidence in `[0, 1]`.
    pub evidence_weight: f64,
    /// Creation time.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Merge Decisions
// ============================================================================

/// Kind of user merge decision between two executives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    /// The two records are the same person.
    MarkSame,
    /// The two records must never be merged.
    KeepSeparate,
}

impl DecisionType {
    /// Returns the stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MarkSame => "mark_same",
            Self::KeepSeparate => "keep_separate",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mark_same" => Some(Self::MarkSame),
            "keep_separate" => Some(Self::KeepSeparate),
            _ => None,
        }
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted merge decision; induces edges in the identity forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeDecisionRecord {
    /// Decision identifier.
    pub id: DecisionId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning run.
    pub run_id: RunId,
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
    /// Creation time.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Promotion Contract
// ============================================================================

/// ATS identifiers assigned to a canonical executive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionIds {
    /// ATS candidate id.
    pub candidate_id: String,
    /// ATS contact id.
    pub contact_id: String,
    /// ATS assignment id.
    pub assignment_id: String,
}

/// Result of promoting one executive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionOutcome {
    /// Executive id the caller asked to promote.
    pub requested_id: ExecutiveId,
    /// Canonical executive the request resolved to.
    pub resolved_to_canonical: ExecutiveId,
    /// Assigned ATS identifiers.
    pub ids: PromotionIds,
    /// True when the ids already existed.
    pub reused: bool,
    /// Reuse explanation when `reused` is true.
    pub reuse_reason: Option<String>,
}
