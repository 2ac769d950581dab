// crates/research-core/src/core/prospect.rs
// ============================================================================
// Module: Company Prospect Model
// Description: Normalized company candidates with evidence and metrics.
// Purpose: Represent run-scoped companies behind the review gate.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A prospect is one candidate company discovered for a run. Prospects are
//! canonical per normalized name within a run; merges add evidence to the
//! canonical row and raise its evidence score monotonically without touching
//! manual fields. Executive search on a prospect is gated on explicit
//! acceptance during review.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::MandateId;
use crate::core::identifiers::ProspectId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::SourceId;
use crate::core::identifiers::TenantId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Review Status
// ============================================================================

/// Review state of a prospect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Not yet reviewed.
    New,
    /// Accepted for downstream work.
    Accepted,
    /// Parked for later.
    Hold,
    /// Rejected.
    Rejected,
}

impl ReviewStatus {
    /// Returns the stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Accepted => "accepted",
            Self::Hold => "hold",
            Self::Rejected => "rejected",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(Self::New),
            "accepted" => Some(Self::Accepted),
            "hold" => Some(Self::Hold),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Discovery Attribution
// ============================================================================

/// Which engine(s) discovered an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveredBy {
    /// Internal extraction pipeline only.
    Internal,
    /// External provider only.
    External,
    /// Both engines independently.
    Both,
}

impl DiscoveredBy {
    /// Returns the stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::Both => "both",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "internal" => Some(Self::Internal),
            "external" => Some(Self::External),
            "both" => Some(Self::Both),
        _ => None,
        }
    }

    /// Combines an existing attribution with a newly observed engine.
    #[must_use]
    pub const fn combined_with(self, other: Self) -> Self {
        match (self, other) {
            (Self::Internal, Self::Internal) => Self::Internal,
            (Self::External, Self::External) => Self::External,
            _ => Self::Both,
        }
    }
}

impl fmt::Display for DiscoveredBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Prospect Records
// ============================================================================

/// Specification for creating a prospect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProspect {
    /// Raw name as discovered.
    pub name_raw: String,
    /// Canonical dedupe key.
    pub name_normalized: String,
    /// Canonicalized website URL, when known.
    pub website_url: Option<String>,
    /// ISO country of the headquarters.
    pub hq_country: Option<String>,
    /// Headquarters city.
    pub hq_city: Option<String>,
    /// Sector classification.
    pub sector: String,
    /// Subsector classification.
    pub subsector: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Relevance score in `[0, 1]`.
    pub relevance_score: f64,
    /// Evidence score in `[0, 1]`.
    pub evidence_score: f64,
    /// Enrichment confidence in `[0, 1]`.
    pub confidence: f64,
    /// Which engine discovered the prospect.
    pub discovered_by: DiscoveredBy,
}

/// Persisted company prospect.
///
/// # Invariants
/// - `(tenant_id, run_id, name_normalized)` has at most one canonical row.
/// - `exec_search_enabled` implies `review_status == Accepted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProspectRecord {
    /// Prospect identifier.
    pub id: ProspectId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning run.
    pub run_id: RunId,
    /// Mandate denormalized from the run.
    pub mandate_id: MandateId,
    /// Raw name as discovered.
    pub name_raw: String,
    /// Canonical dedupe key.
    pub name_normalized: String,
    /// Canonicalized website URL.
    pub website_url: Option<String>,
    /// ISO country of the headquarters.
    pub hq_country: Option<String>,
    /// Headquarters city.
    pub hq_city: Option<String>,
    /// Sector classification.
    pub sector: String,
    /// Subsector classification.
    pub subsector: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Employee count band, when enriched.
    pub employees_band: Option<String>,
    /// Revenue band in USD, when enriched.
    pub revenue_band_usd: Option<String>,
    /// Relevance score in `[0, 1]`.
    pub relevance_score: f64,
    /// Evidence score in `[0, 1]`; raised monotonically by merges.
    pub evidence_score: f64,
    /// Enrichment confidence in `[0, 1]`.
    pub confidence: f64,
    /// Which engine(s) discovered the prospect.
    pub discovered_by: DiscoveredBy,
    /// Review state.
    pub review_status: ReviewStatus,
    /// Executive search gate; requires acceptance.
    pub exec_search_enabled: bool,
    /// Manual priority override; never written by the engine.
    pub manual_priority: Option<i64>,
    /// Manual notes; never written by the engine.
    pub manual_notes: Option<String>,
    /// Pinned rows sort first; never written by the engine.
    pub is_pinned: bool,
    /// Verification state label.
    pub verification_status: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Evidence
// ============================================================================

/// Provenance record linking a prospect to a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProspectEvidenceRecord {
    /// Evidence row identifier.
    pub id: i64,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Prospect the evidence supports.
    pub prospect_id: ProspectId,
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
    /// Snippet where the prospect appeared.
    pub raw_snippet: Option<String>,
    /// Weight of this evidence in `[0, 1]`.
    pub evidence_weight: f64,
    /// Creation time.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Metrics
// ============================================================================

/// Typed metric value; exactly one variant per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "value_type", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    /// Numeric value with optional currency and unit.
    Number {
        /// The numeric value.
        amount: f64,
        /// ISO currency code for financial metrics.
        currency: Option<String>,
        /// Unit of measurement for physical metrics.
        unit: Option<String>,
    },
    /// Text value.
    Text(String),
    /// Boolean value.
    Bool(bool),
    /// Opaque JSON value.
    Json(Value),
}

/// Persisted prospect metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProspectMetricRecord {
    /// Metric row identifier.
    pub id: i64,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning run.
    pub run_id: RunId,
    /// Prospect the metric describes.
    pub prospect_id: ProspectId,
    /// Metric key, e.g. `total_assets`.
    pub metric_key: String,
    /// Typed value.
    pub value: MetricValue,
    /// Year the value refers to.
    pub as_of_year: Option<i32>,
    /// Confidence in `[0, 1]`.
    pub confidence: Option<f64>,
    /// Source document reference.
    pub source_document_id: Option<SourceId>,
    /// Creation time.
    pub created_at: Timestamp,
}
