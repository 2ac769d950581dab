// crates/research-extract/src/text.rs
// ============================================================================
// Module: Line-Based Candidate Extraction
// Description: Deterministic company-name scanning over normalized text.
// Purpose: Turn line-oriented content into filtered candidates.
// Dependencies: crate::normalize, research-core
// ============================================================================

//! ## Overview
//! Text sources are scanned line by line: bullets and numbering are
//! stripped, then each cleaned line is accepted as a company name unless a
//! filter rejects it: too short or long, no letters, financial-value
//! tokens, sentence-like lines, or known non-company phrases. A final
//! garbage guard discards the whole result when most accepted names are
//! short single words, which indicates scraped navigation noise.

// ============================================================================
// SECTION: Imports
// ============================================================================

use research_core::normalize_company_name;

use crate::ExtractedCandidate;
use crate::Extraction;
use crate::normalize::collapse_whitespace;
use crate::normalize::normalize_text;

// ============================================================================
// SECTION: Filters
// ============================================================================

/// Phrases that mark a short line as non-company commentary.
const NON_COMPANY_PHRASES: &[&str] = &[
    "top nbfc",
    "sample list",
    "notes",
    "company list",
    "here are",
    "interesting",
    "sample",
    "following",
    "these are",
];

/// Maximum accepted candidate length.
const MAX_NAME_LEN: usize = 150;
/// Minimum accepted candidate length.
const MIN_NAME_LEN: usize = 3;
/// Snippet length cap.
const MAX_SNIPPET_LEN: usize = 500;

/// Strips leading bullets and list numbering from a line.
fn strip_listing_markers(line: &str) -> String {
    let mut rest = line.trim_start_matches(['-', '*', '•']).trim_start();
    // Numbering like "1. " or "23) ".
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let after = &rest[digits..];
        if let Some(stripped) = after.strip_prefix('.').or_else(|| after.strip_prefix(')')) {
            rest = stripped.trim_start();
        }
    }
    collapse_whitespace(rest)
}

/// Returns true for financial-value tokens like `$ 1,2B` or `3.4M €`.
fn is_financial_value(line: &str) -> bool {
    let trimmed = line.trim();
    let without_currency = trimmed.trim_matches(['$', '€', '£', '¥']).trim();
    let without_magnitude = without_currency
        .trim_end_matches(['B', 'M', 'K', 'b', 'm', 'k'])
        .trim();
    !without_magnitude.is_empty()
        && without_magnitude.chars().all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | ','))
}

/// Returns true when a cleaned line is rejected by the filters.
fn is_rejected(cleaned: &str) -> bool {
    if cleaned.len() < MIN_NAME_LEN || cleaned.len() > MAX_NAME_LEN {
        return true;
    }
    if !cleaned.chars().any(|ch| ch.is_alphabetic()) {
        return true;
    }
    if cleaned.ends_with('.') && cleaned.split_whitespace().count() > 6 {
        return true;
    }
    if is_financial_value(cleaned) {
        return true;
    }
    let lower = cleaned.to_lowercase();
    if cleaned.len() < 60 && NON_COMPANY_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return true;
    }
    false
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Extracts company candidates from line-oriented text.
#[must_use]
pub fn extract_candidates(content: &str, method: &str) -> Extraction {
    if content.is_empty() {
        return Extraction::empty(method);
    }
    let normalized = normalize_text(content);
    let lines: Vec<&str> = normalized.split('\n').collect();

    let mut seen: Vec<String> = Vec::new();
    let mut candidates = Vec::new();
    let mut rejected = 0usize;

    for (index, line) in lines.iter().enumerate() {
        let cleaned = strip_listing_markers(line.trim());
        if cleaned.is_empty() {
            continue;
        }
        if is_rejected(&cleaned) {
            rejected += 1;
            continue;
        }

        let normalized_name = normalize_company_name(&cleaned);
        if normalized_name.is_empty() || seen.contains(&normalized_name) {
            continue;
        }
        seen.push(normalized_name);

        let mut snippet = cleaned.clone();
        if let Some(next) = lines.get(index + 1).map(|next| next.trim())
            && !next.is_empty()
        {
            snippet.push_str(" | ");
            snippet.push_str(&next.chars().take(100).collect::<String>());
        }
        let snippet: String = snippet.chars().take(MAX_SNIPPET_LEN).collect();
        candidates.push(ExtractedCandidate {
            name: cleaned,
            snippet,
        });
    }

    // Garbage guard: mostly short single words means navigation noise.
    if !candidates.is_empty() {
        let short_single = candidates
            .iter()
            .filter(|c| !c.name.contains(' ') && c.name.len() < 15)
            .count();
        if short_single * 10 > candidates.len() * 7 {
            return Extraction {
                method: method.to_string(),
                candidates: Vec::new(),
                rejected: rejected + candidates.len(),
            };
        }
    }

    Extraction {
        method: method.to_string(),
        candidates,
        rejected,
    }
}
