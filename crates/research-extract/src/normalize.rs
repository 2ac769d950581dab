// crates/research-extract/src/normalize.rs
// ============================================================================
// Module: Text Normalization
// Description: Line-ending and whitespace normalization for extraction.
// Purpose: Make content hashing and line scanning stable across platforms.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Fetched and pasted content arrives with Windows, Mac, or mixed line
//! endings. Everything is normalized to `\n` with per-line trailing
//! whitespace stripped before hashing or scanning, so the same document
//! always hashes identically regardless of where it was produced.

/// Normalizes line endings to `\n` and strips trailing whitespace per line.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = unified.split('\n').map(str::trim_end).collect();
    lines.join("\n")
}

/// Collapses internal whitespace runs into single spaces and trims.
#[must_use]
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
