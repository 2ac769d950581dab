// crates/research-core/src/core/discovery.rs
// ============================================================================
// Module: Discovery Payload Schema
// Description: The company_discovery_v1 payload and provider result types.
// Purpose: Give every discovery provider one validated output contract.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every discovery provider (deterministic, seed list, web search, LLM)
//! emits the same `company_discovery_v1` payload: a provider/model header, a
//! run context, and a company list with per-company evidence. Payloads are
//! canonicalized before hashing: companies sort case-insensitively by name,
//! so identical inputs always hash identically regardless of provider-side
//! ordering. The engine treats the payload as opaque evidence beyond this
//! schema; provenance is recorded, correctness of third-party claims is not
//! adjudicated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Schema Version
// ============================================================================

/// Stable schema identifier carried in every payload.
pub const DISCOVERY_SCHEMA_VERSION: &str = "company_discovery_v1";

// ============================================================================
// SECTION: Payload Types
// ============================================================================

/// One evidence entry supporting a discovered company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryEvidence {
    /// Source URL of the evidence.
    pub url: String,
    /// Human-readable label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Evidence kind, e.g. `homepage`, `press_release`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Snippet where the company appeared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// One discovered company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryCompany {
    /// Company name as reported by the provider.
    pub name: String,
    /// Website URL, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    /// ISO country of the headquarters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hq_country: Option<String>,
    /// Headquarters city.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hq_city: Option<String>,
    /// Sector classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Subsector classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsector: Option<String>,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Provider confidence in `[0, 1]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Supporting evidence entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<DiscoveryEvidence>,
}

/// Context echoed back by a provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiscoveryRunContext {
    /// Query text the provider answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Geographic scope echoed back.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geo: Vec<String>,
    /// Industry scope echoed back.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub industry: Vec<String>,
    /// Free-form notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The `company_discovery_v1` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryPayload {
    /// Schema identifier; always [`DISCOVERY_SCHEMA_VERSION`].
    pub schema_version: String,
    /// Provider key that produced the payload.
    pub provider: String,
    /// Model identifier, when the provider has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Context echoed back by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_context: Option<DiscoveryRunContext>,
    /// Discovered companies.
    #[serde(default)]
    pub companies: Vec<DiscoveryCompany>,
}

impl DiscoveryPayload {
    /// Creates a payload with the current schema version.
    #[must_use]
    pub fn new(provider: impl Into<String>, model: Option<String>) -> Self {
        Self {
            schema_version: DISCOVERY_SCHEMA_VERSION.to_string(),
            provider: provider.into(),
            model,
            run_context: None,
            companies: Vec::new(),
        }
    }

    /// Sorts the company list case-insensitively by name.
    ///
    /// Canonical ordering is applied before hashing so identical inputs hash
    /// identically regardless of provider-side ordering.
    pub fn sort_companies(&mut self) {
        self.companies
            .sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    }

    /// Validates the payload schema.
    ///
    /// # Errors
    ///
    /// Returns a [`PayloadError`] naming the first violation.
    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.schema_version != DISCOVERY_SCHEMA_VERSION {
            return Err(PayloadError::UnsupportedSchema(self.schema_version.clone()));
        }
        if self.provider.trim().is_empty() {
            return Err(PayloadError::MissingProvider);
        }
        for company in &self.companies {
            if company.name.trim().is_empty() {
                return Err(PayloadError::UnnamedCompany);
            }
            if let Some(confidence) = company.confidence
                && !(0.0..=1.0).contains(&confidence)
            {
                return Err(PayloadError::ConfidenceOutOfRange {
                    company: company.name.clone(),
                    confidence,
                });
            }
            for evidence in &company.evidence {
                if evidence.url.trim().is_empty() {
                    return Err(PayloadError::EvidenceWithoutUrl {
                        company: company.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Payload Errors
// ============================================================================

/// Schema violations in a discovery payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayloadError {
    /// The schema version is not `company_discovery_v1`.
    #[error("unsupported payload schema: {0}")]
    UnsupportedSchema(String),
    /// The provider key was empty.
    #[error("payload provider is missing")]
    MissingProvider,
    /// A company entry had an empty name.
    #[error("payload contains an unnamed company")]
    UnnamedCompany,
    /// A confidence value was outside `[0, 1]`.
    #[error("confidence {confidence} out of range for company {company}")]
    ConfidenceOutOfRange {
        /// Company carrying the bad value.
        company: String,
        /// The out-of-range confidence.
        confidence: f64,
    },
    /// An evidence entry had no URL.
    #[error("evidence without url for company {company}")]
    EvidenceWithoutUrl {
        /// Company carrying the bad evidence.
        company: String,
    },
}

// ============================================================================
// SECTION: Provider Result
// ============================================================================

/// Structured result returned by a discovery provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    /// Validated payload; absent when the provider errored.
    pub payload: Option<DiscoveryPayload>,
    /// Provider key.
    pub provider: String,
    /// Model identifier, when the provider has one.
    pub model: Option<String>,
    /// Provider contract version.
    pub version: String,
    /// Source-document type the envelope should be stored under.
    pub source_type: Option<String>,
    /// Raw request text, for provenance.
    pub raw_input_text: Option<String>,
    /// Raw request metadata, for provenance.
    pub raw_input_meta: Option<Value>,
    /// Full request/response envelope, for provenance.
    pub envelope: Option<Value>,
    /// Provider error, when the call failed.
    pub error: Option<Value>,
}
