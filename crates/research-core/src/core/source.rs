// crates/research-core/src/core/source.rs
// ============================================================================
// Module: Source Document Model
// Description: Acquired artifact records with content-hash dedupe protocol.
// Purpose: Represent URLs, PDFs, text, and provider envelopes uniformly.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A source document is one acquired artifact in a run: a fetched URL, an
//! uploaded PDF, pasted text, or an opaque provider/LLM JSON envelope.
//! Within a run, canonical rows are unique per content hash; a later fetch
//! landing on the same bytes becomes a duplicate row with a null content
//! hash pointing at the canonical, marked processed with
//! `fetch_info.deduped = true`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::RunId;
use crate::core::identifiers::SourceId;
use crate::core::identifiers::TenantId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Source Type
// ============================================================================

/// Kind of artifact a source document holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// A URL to fetch.
    Url,
    /// An uploaded PDF document.
    Pdf,
    /// Caller-pasted plain text.
    Text,
    /// A discovery-provider JSON envelope.
    ProviderJson,
    /// An external LLM JSON envelope.
    LlmJson,
}

impl SourceType {
    /// Returns the stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Pdf => "pdf",
            Self::Text => "text",
            Self::ProviderJson => "provider_json",
            Self::LlmJson => "llm_json",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "url" => Some(Self::Url),
            "pdf" => Some(Self::Pdf),
            "text" => Some(Self::Text),
            "provider_json" => Some(Self::ProviderJson),
            "llm_json" => Some(Self::LlmJson),
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Source Status
// ============================================================================

/// Processing status of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Registered, nothing acquired yet.
    New,
    /// Content acquired and hashed.
    Fetched,
    /// Extraction finished (or dedupe short-circuited it).
    Processed,
    /// Acquisition failed terminally.
    Failed,
}

impl SourceStatus {
    /// Returns the stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Fetched => "fetched",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    /// Parses the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(Self::New),
            "fetched" => Some(Self::Fetched),
            "processed" => Some(Self::Processed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Fetch Info
// ============================================================================

/// Acquisition metadata stored under `meta.fetch_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FetchInfo {
    /// True when the row was short-circuited as a content duplicate.
    #[serde(default)]
    pub deduped: bool,
    /// Extraction method chosen for the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<String>,
    /// True when a conditional request returned 304 and content was reused.
    #[serde(default)]
    pub not_modified: bool,
    /// Count of redirects followed.
    #[serde(default)]
    pub redirects: u32,
}

// ============================================================================
// SECTION: Source Records
// ============================================================================

/// Caller-supplied specification for a new source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSource {
    /// Kind of artifact.
    pub source_type: SourceType,
    /// Display title, when known.
    pub title: Option<String>,
    /// Raw URL as supplied for url sources.
    pub url: Option<String>,
    /// Provider key for provider_json / llm_json sources.
    pub provider: Option<String>,
    /// Inline text content for text sources.
    pub content_text: Option<String>,
    /// Inline binary content for pdf sources.
    pub content_bytes: Option<Vec<u8>>,
    /// MIME type, when known up front.
    pub mime_type: Option<String>,
    /// Attempt budget for acquisition.
    pub max_attempts: u32,
}

/// Persisted source document.
///
/// # Invariants
/// - Within `(tenant_id, run_id)`, canonical `content_hash` values are unique.
/// - A duplicate row has a null `content_hash` and `canonical_source_id`
///   different from its own id, and is always `processed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocumentRecord {
    /// Source identifier.
    pub id: SourceId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning run.
    pub run_id: RunId,
    /// Kind of artifact.
    pub source_type: SourceType,
    /// Display title.
    pub title: Option<String>,
    /// Raw URL as supplied.
    pub url: Option<String>,
    /// Canonicalized form of the final URL after redirects.
    pub url_normalized: Option<String>,
    /// Final URL reported by the fetcher.
    pub http_final_url: Option<String>,
    /// MIME type of the acquired content.
    pub mime_type: Option<String>,
    /// Extracted or supplied text content.
    pub content_text: Option<String>,
    /// Raw bytes for binary artifacts.
    pub content_bytes: Option<Vec<u8>>,
    /// SHA-256 content hash; null on duplicate rows.
    pub content_hash: Option<String>,
    /// Provider key for envelope sources.
    pub provider: Option<String>,
    /// Last HTTP status code observed.
    pub http_status_code: Option<u16>,
    /// Last HTTP error message observed.
    pub http_error_message: Option<String>,
    /// Captured response header subset (lowercased names).
    pub http_headers: BTreeMap<String, String>,
    /// Processing status.
    pub status: SourceStatus,
    /// Fetch attempts consumed so far.
    pub attempt_count: u32,
    /// Fetch attempt budget.
    pub max_attempts: u32,
    /// Earliest next fetch retry time.
    pub next_retry_at: Option<Timestamp>,
    /// Canonical row for duplicates; self for canonical rows.
    pub canonical_source_id: Option<SourceId>,
    /// Acquisition metadata.
    pub fetch_info: FetchInfo,
    /// Extraction / processing summary.
    pub processed_summary: Option<Value>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Time content was acquired.
    pub fetched_at: Option<Timestamp>,
}
