// crates/research-extract/tests/extract.rs
// ============================================================================
// Module: Extraction Tests
// Description: Tests for structural, text, and payload extraction.
// ============================================================================
//! ## Overview
//! Validates the Wikipedia ladder, the generic HTML strategy, line-based
//! candidate filters, and provider payload projection.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use research_extract::content_text_for;
use research_extract::payload::project_payload;
use research_extract::text::extract_candidates;
use research_extract::wikipedia::extract_structured;
use serde_json::json;

/// A small Wikipedia-like page with a wikitable, chrome, and a nav list.
const WIKI_PAGE: &str = r#"
<html><body>
<div id="mw-content-text">
  <p>Intro paragraph before any section.</p>
  <ul><li>Lead list ignored (before first h2)</li></ul>
  <h2>Largest banks</h2>
  <table class="wikitable">
    <tr><th>Name</th><th>Assets</th></tr>
    <tr><td>First National Bank[1]</td><td>$12B</td></tr>
    <tr><td>Harbor Trust</td><td>$9B</td></tr>
  </table>
  <div class="navbox"><ul><li>Navigation item</li></ul></div>
</div>
</body></html>
"#;

/// A Wikipedia-like page with only a keyword section list.
const WIKI_SECTION_PAGE: &str = r#"
<html><body>
<div id="mw-content-text">
  <h2>Commercial banks</h2>
  <ul>
    <li>Coastal Savings[2]</li>
    <li>Meridian Capital</li>
  </ul>
  <h2>See also</h2>
  <ul class="reflist"><li>Reference entry</li></ul>
</div>
</body></html>
"#;

// ============================================================================
// SECTION: Wikipedia Ladder
// ============================================================================

/// Tests wikitable rows win and reference markers strip.
#[test]
fn test_wikitable_strategy() {
    let result = extract_structured(WIKI_PAGE);
    assert_eq!(result.strategy, "wikitable");
    assert_eq!(result.items, vec!["First National Bank", "Harbor Trust"]);
}

/// Tests section lists are used when no wikitable exists.
#[test]
fn test_section_list_strategy() {
    let result = extract_structured(WIKI_SECTION_PAGE);
    assert_eq!(result.strategy, "section-list");
    assert_eq!(result.items, vec!["Coastal Savings", "Meridian Capital"]);
}

/// Tests a page without main content yields nothing.
#[test]
fn test_missing_main_content() {
    let result = extract_structured("<html><body><ul><li>Acme</li></ul></body></html>");
    assert!(result.items.is_empty());
}

/// Tests host dispatch picks the structural path for Wikipedia.
#[test]
fn test_dispatch_by_host() {
    let (text, method) = content_text_for("text/html", Some("en.wikipedia.org"), WIKI_PAGE);
    assert_eq!(method, "wikipedia_wikitable");
    assert!(text.contains("Harbor Trust"));

    let (_, method) = content_text_for("text/html", Some("example.com"), WIKI_PAGE);
    assert_eq!(method, "generic_html");
}

// ============================================================================
// SECTION: Text Candidates
// ============================================================================

/// Tests bullets, numbering, and filters over pasted text.
#[test]
fn test_text_candidates_filtering() {
    let content = "Top NBFCs (sample list)\n- Helio Labs Ltd\n1. Atlas Robotics GmbH\n$45M\nHere are some companies\nNorthwind Analytics\n";
    let extraction = extract_candidates(content, "manual_text");
    let names: Vec<&str> = extraction.candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Helio Labs Ltd", "Atlas Robotics GmbH", "Northwind Analytics"]);
    assert!(extraction.rejected >= 3);
}

/// Tests duplicate normalized names collapse to the first occurrence.
#[test]
fn test_text_candidates_dedupe_normalized() {
    let extraction = extract_candidates("Helio Labs Ltd\nHelio Labs\n", "manual_text");
    assert_eq!(extraction.candidates.len(), 1);
}

/// Tests the short-single-word garbage guard empties the result.
#[test]
fn test_garbage_guard() {
    let extraction = extract_candidates("Home\nAbout\nNews\nJobs\nTeam\n", "manual_text");
    assert!(extraction.candidates.is_empty());
}

/// Tests empty input yields zero candidates without error.
#[test]
fn test_empty_input() {
    assert!(extract_candidates("", "manual_text").candidates.is_empty());
}

// ============================================================================
// SECTION: Payload Projection
// ============================================================================

/// Tests payload validation and candidate projection.
#[test]
fn test_payload_projection() {
    let envelope = json!({
        "schema_version": "company_discovery_v1",
        "provider": "seed_list",
        "companies": [
            {"name": "Atlas Manufacturing", "evidence": [
                {"url": "https://atlas.example.com/about", "snippet": "Composites maker"}
            ]},
            {"name": "Northwind Analytics", "description": "Grid forecasting"}
        ]
    });
    let (payload, extraction) = project_payload(&envelope).unwrap();
    assert_eq!(payload.companies.len(), 2);
    assert_eq!(extraction.candidates[0].snippet, "Composites maker");
    assert_eq!(extraction.candidates[1].snippet, "Grid forecasting");
}

/// Tests schema violations are rejected.
#[test]
fn test_payload_rejects_bad_schema() {
    let envelope = json!({
        "schema_version": "company_discovery_v1",
        "provider": "seed_list",
        "companies": [{"name": "", "confidence": 0.4}]
    });
    assert!(project_payload(&envelope).is_err());
}
