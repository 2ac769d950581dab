// crates/research-core/src/core/mod.rs
// ============================================================================
// Module: Research Core Types
// Description: Canonical research-engine schema and run-state structures.
// Purpose: Provide stable, serializable types for runs, jobs, and evidence.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Research core types define the tenant-scoped entities a research run owns:
//! the run itself, its ordered step plan, durable queue jobs, acquired source
//! documents, company prospects, executive prospects, evidence links,
//! enrichment ledger rows, and export-pack registry rows. These types are the
//! canonical source of truth for any derived surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod discovery;
pub mod enrichment;
pub mod error;
pub mod executive;
pub mod export;
pub mod hashing;
pub mod identifiers;
pub mod identity;
pub mod job;
pub mod names;
pub mod prospect;
pub mod retry;
pub mod run;
pub mod source;
pub mod time;
pub mod urlnorm;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use discovery::DiscoveryCompany;
pub use discovery::DiscoveryEvidence;
pub use discovery::DiscoveryPayload;
pub use discovery::DiscoveryRunContext;
pub use discovery::PayloadError;
pub use discovery::ProviderResult;
pub use enrichment::EnrichmentOutcome;
pub use enrichment::EnrichmentRecord;
pub use enrichment::EnrichmentStatus;
pub use error::EngineError;
pub use error::ErrorEnvelope;
pub use error::ErrorEnvelopeBody;
pub use executive::DecisionType;
pub use executive::EngineSide;
pub use executive::ExecutiveEvidenceRecord;
pub use executive::ExecutiveRecord;
pub use executive::MergeDecisionRecord;
pub use executive::NewExecutive;
pub use executive::PromotionIds;
pub use executive::PromotionOutcome;
pub use executive::VerificationStatus;
pub use export::ExportPackRecord;
pub use export::StoragePointerError;
pub use export::validate_storage_pointer;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::canonical_json_bytes;
pub use hashing::content_hash_of_text;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use hashing::params_hash;
pub use identifiers::DecisionId;
pub use identifiers::EnrichmentId;
pub use identifiers::ExecutiveId;
pub use identifiers::JobId;
pub use identifiers::MandateId;
pub use identifiers::PackId;
pub use identifiers::ProspectId;
pub use identifiers::RunId;
pub use identifiers::SourceId;
pub use identifiers::StepId;
pub use identifiers::TenantId;
pub use identifiers::WorkerId;
pub use identity::IdentityError;
pub use identity::IdentityForest;
pub use job::JobRecord;
pub use job::JobStatus;
pub use job::JobType;
pub use job::ReuseReason;
pub use names::normalize_company_name;
pub use names::normalize_email;
pub use names::normalize_person_name;
pub use prospect::DiscoveredBy;
pub use prospect::MetricValue;
pub use prospect::NewProspect;
pub use prospect::ProspectEvidenceRecord;
pub use prospect::ProspectMetricRecord;
pub use prospect::ProspectRecord;
pub use prospect::ReviewStatus;
pub use retry::RetryDecision;
pub use retry::RetryPolicy;
pub use run::RunRecord;
pub use run::RunSpec;
pub use run::RunStatus;
pub use run::RunStepRecord;
pub use run::StepKey;
pub use run::StepStatus;
pub use run::default_step_plan;
pub use source::FetchInfo;
pub use source::NewSource;
pub use source::SourceDocumentRecord;
pub use source::SourceStatus;
pub use source::SourceType;
pub use time::Timestamp;
pub use urlnorm::UrlNormError;
pub use urlnorm::canonical_host;
pub use urlnorm::canonicalize;
