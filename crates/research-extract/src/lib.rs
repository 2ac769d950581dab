// crates/research-extract/src/lib.rs
// ============================================================================
// Module: Research Extract Library
// Description: Structural extraction of company candidates from documents.
// Purpose: Turn acquired content into (name, snippet) candidates.
// Dependencies: pdf-extract, research-core, scraper
// ============================================================================

//! ## Overview
//! Extraction dispatches on MIME type and host: Wikipedia-like pages use a
//! structural ladder (wikitables, then keyword-matched section lists, then
//! main-content lists), generic HTML prefers table first-columns and list
//! items, PDFs reduce to deterministic plain text, and provider/LLM JSON
//! envelopes are only schema-validated and projected; the payload is the
//! extract. Empty input is never an error; it produces zero candidates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod html;
pub mod normalize;
pub mod payload;
pub mod pdf;
pub mod text;
pub mod wikipedia;

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Common Types
// ============================================================================

/// One extracted company candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedCandidate {
    /// Candidate company name as it appeared.
    pub name: String,
    /// Snippet of surrounding context.
    pub snippet: String,
}

/// Result of extracting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Strategy that produced the candidates.
    pub method: String,
    /// Accepted candidates, in document order.
    pub candidates: Vec<ExtractedCandidate>,
    /// Count of raw candidates rejected by the filters.
    pub rejected: usize,
}

impl Extraction {
    /// Returns an empty extraction for a method.
    #[must_use]
    pub fn empty(method: &str) -> Self {
        Self {
            method: method.to_string(),
            candidates: Vec::new(),
            rejected: 0,
        }
    }
}

/// Errors raised by extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// PDF text extraction failed.
    #[error("pdf extraction failed: {0}")]
    Pdf(String),
    /// Provider payload failed schema validation.
    #[error(transparent)]
    Payload(#[from] research_core::PayloadError),
    /// Provider payload was not valid JSON for the schema.
    #[error("payload deserialization failed: {0}")]
    PayloadShape(String),
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Extracts document text into line-oriented content for candidate scanning.
///
/// HTML dispatches by host: Wikipedia-like hosts use the structural ladder,
/// everything else the generic strategy. Non-HTML text passes through
/// normalization unchanged.
#[must_use]
pub fn content_text_for(mime_type: &str, host: Option<&str>, raw: &str) -> (String, String) {
    if mime_type.contains("html") {
        if host.is_some_and(|host| host.ends_with("wikipedia.org")) {
            let items = wikipedia::extract_structured(raw);
            if items.items.is_empty() {
                (html::extract_text(raw), "wikipedia_text_fallback".to_string())
            } else {
                (items.items.join("\n"), format!("wikipedia_{}", items.strategy))
            }
        } else {
            (html::extract_text(raw), "generic_html".to_string())
        }
    } else {
        (normalize::normalize_text(raw), "plain_text".to_string())
    }
}
