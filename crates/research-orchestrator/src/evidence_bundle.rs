// crates/research-orchestrator/src/evidence_bundle.rs
// ============================================================================
// Module: Evidence Bundle Builder
// Description: Deterministic ZIP of raw evidence documents with a manifest.
// Purpose: Ship a run's acquired sources for offline review and audit.
// Dependencies: research-core, serde_json, zip
// ============================================================================

//! ## Overview
//! The bundle packs every source document carrying content, fetched pages
//! and pasted text and PDFs and provider/LLM envelopes alike, under stable file
//! names sorted alphabetically, plus `MANIFEST.json` listing per-file name,
//! content type, size, and SHA-256, and a `MANIFEST.sha256` side file over
//! the manifest bytes. Builds are bit-identical across calls and bounded by
//! the configured size cap.

// ============================================================================
// SECTION: Imports
// ============================================================================

use research_core::EngineError;
use research_core::SourceDocumentRecord;
use research_core::hash_bytes;
use research_core::identifiers::RunId;
use research_core::identifiers::TenantId;
use research_core::interfaces::Clock;
use research_core::interfaces::ContentFetcher;
use research_core::interfaces::ResearchStore;
use research_core::DEFAULT_HASH_ALGORITHM;
use serde_json::json;

use crate::export::write_deterministic_zip;
use crate::service::Orchestrator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Stable error code for oversized bundles.
pub const EVIDENCE_ZIP_TOO_LARGE: &str = "EVIDENCE_ZIP_TOO_LARGE";

// ============================================================================
// SECTION: Operations
// ============================================================================

impl<S, F, C> Orchestrator<S, F, C>
where
    S: ResearchStore,
    F: ContentFetcher,
    C: Clock,
{
    /// Builds the evidence bundle bytes for a run.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LimitExceeded`] with code
    /// [`EVIDENCE_ZIP_TOO_LARGE`] when the archive exceeds the cap.
    pub fn build_evidence_bundle(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<u8>, EngineError> {
        self.store.get_run(tenant, run_id)?;
        let sources = self.store.list_sources(tenant, run_id)?;

        let mut files: Vec<(String, Vec<u8>)> = Vec::new();
        for source in &sources {
            let Some(bytes) = document_bytes(source) else {
                continue;
            };
            files.push((file_name_for(source), bytes));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let manifest_entries: Vec<_> = files
            .iter()
            .map(|(name, bytes)| {
                json!({
                    "file_name": name,
                    "content_type": content_type_for(name),
                    "size_bytes": bytes.len(),
                    "sha256": hash_bytes(DEFAULT_HASH_ALGORITHM, bytes).hex(),
                })
            })
            .collect();
        let manifest = serde_json::to_vec_pretty(&json!({ "files": manifest_entries }))
            .map_err(|err| EngineError::Io(err.to_string()))?;
        let manifest_digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &manifest);
        let side_file = format!("SHA256(MANIFEST.json)={}\n", manifest_digest.hex());

        let mut entries = files;
        entries.push(("MANIFEST.json".to_string(), manifest));
        entries.push(("MANIFEST.sha256".to_string(), side_file.into_bytes()));

        let bytes = write_deterministic_zip(entries)?;
        let cap = self.config.evidence_bundle_max_zip_bytes;
        if bytes.len() as u64 > cap {
            return Err(EngineError::LimitExceeded {
                code: EVIDENCE_ZIP_TOO_LARGE.to_string(),
                message: format!("evidence bundle exceeds {cap} bytes"),
                details: json!({ "max_zip_bytes": cap }),
            });
        }
        Ok(bytes)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the raw bytes of a document, when it carries content.
fn document_bytes(source: &SourceDocumentRecord) -> Option<Vec<u8>> {
    if let Some(bytes) = &source.content_bytes {
        return Some(bytes.clone());
    }
    source.content_text.as_ref().map(|text| text.clone().into_bytes())
}

/// Builds the stable bundle file name for a source.
fn file_name_for(source: &SourceDocumentRecord) -> String {
    let extension = match source.source_type {
        research_core::SourceType::Pdf => "pdf",
        research_core::SourceType::ProviderJson | research_core::SourceType::LlmJson => "json",
        research_core::SourceType::Url => "html",
        research_core::SourceType::Text => "txt",
    };
    format!("source_{:08}.{extension}", source.id.get())
}

/// Maps a bundle file name onto its manifest content type.
fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".pdf") {
        "application/pdf"
    } else if name.ends_with(".json") {
        "application/json"
    } else if name.ends_with(".html") {
        "text/html"
    } else {
        "text/plain"
    }
}
