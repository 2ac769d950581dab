// crates/research-core/src/core/names.rs
// ============================================================================
// Module: Name Normalization
// Description: Canonical normalization for company, person, and email keys.
// Purpose: Provide the pure keys used by prospect and executive dedupe.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Dedupe within a run keys on normalized forms rather than raw strings:
//! company names are lowercased with common legal suffixes stripped, person
//! names are reduced to alphanumeric word sequences, and emails are trimmed
//! and lowercased. Normalization is deterministic and loss-tolerant; the raw
//! value is always preserved on the record.

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Legal-entity suffixes stripped from company names, longest first.
const COMPANY_SUFFIXES: &[&str] = &[
    " corporation",
    " holdings",
    " limited",
    " group",
    " corp",
    " gmbh",
    " saog",
    " inc",
    " llc",
    " ltd",
    " plc",
    " ag",
    " sa",
];

// ============================================================================
// SECTION: Company Names
// ============================================================================

/// Normalizes a company name for deduplication.
///
/// Lowercases, strips trailing punctuation and common legal suffixes, and
/// collapses internal whitespace.
#[must_use]
pub fn normalize_company_name(name: &str) -> String {
    let mut normalized = name.to_lowercase();
    loop {
        let before = normalized.len();
        while normalized.ends_with('.') || normalized.ends_with(',') {
            normalized.pop();
        }
        normalized.truncate(normalized.trim_end().len());
        for suffix in COMPANY_SUFFIXES {
            if let Some(stripped) = normalized.strip_suffix(suffix) {
                normalized = stripped.to_string();
                break;
            }
        }
        if normalized.len() == before {
            break;
        }
    }
    collapse_whitespace(&normalized)
}

// ============================================================================
// SECTION: People and Emails
// ============================================================================

/// Normalizes a person name into a lowercase alphanumeric word sequence.
#[must_use]
pub fn normalize_person_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() {
            current.push(ch);
        } else if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.join(" ")
}

/// Normalizes an email for matching: trimmed and lowercased.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Collapses runs of whitespace into single spaces and trims the ends.
fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
