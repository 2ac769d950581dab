// crates/research-extract/src/pdf.rs
// ============================================================================
// Module: PDF Text Extraction
// Description: Deterministic plain-text extraction for PDF sources.
// Purpose: Reduce uploaded PDFs to normalized line-oriented text.
// Dependencies: crate::normalize, pdf-extract
// ============================================================================

//! ## Overview
//! PDFs reduce to plain text in one pass and then go through the same line
//! normalization as every other source, so a PDF and a paste of its text
//! produce the same content hash. Extraction failures surface as errors;
//! an empty (but valid) document yields empty text, not an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::ExtractError;
use crate::normalize::normalize_text;

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Extracts normalized plain text from PDF bytes.
///
/// # Errors
///
/// Returns [`ExtractError::Pdf`] when the document cannot be parsed.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|err| ExtractError::Pdf(err.to_string()))?;
    Ok(normalize_text(&text))
}
