// crates/research-extract/src/html.rs
// ============================================================================
// Module: Generic HTML Extraction
// Description: Structure-first text extraction for arbitrary sites.
// Purpose: Prefer tables and lists, fall back to content-bearing elements.
// Dependencies: crate::normalize, scraper
// ============================================================================

//! ## Overview
//! The generic strategy reads structure before prose: first-column table
//! cells and list items become candidate lines; when a page has neither, the
//! text of content-bearing elements (headings, paragraphs, cells) is used.
//! Script, style, and chrome elements never contribute because extraction
//! only visits content selectors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use scraper::ElementRef;
use scraper::Html;
use scraper::Selector;

use crate::normalize::collapse_whitespace;
use crate::normalize::normalize_text;

// ============================================================================
// SECTION: Selectors
// ============================================================================

/// Parses a selector literal, returning none on the (impossible) parse error.
fn sel(selector: &str) -> Option<Selector> {
    Selector::parse(selector).ok()
}

/// Returns the collapsed text of an element.
fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Extracts line-oriented text from arbitrary HTML.
///
/// Structured content (table first columns, list items) wins when present;
/// otherwise the text of content-bearing elements is joined line by line.
#[must_use]
pub fn extract_text(raw_html: &str) -> String {
    let document = Html::parse_document(raw_html);
    let mut lines: Vec<String> = Vec::new();

    if let Some(row_selector) = sel("table tr")
        && let Some(cell_selector) = sel("td, th")
    {
        for row in document.select(&row_selector) {
            if let Some(first_cell) = row.select(&cell_selector).next() {
                let text = element_text(first_cell);
                if !text.is_empty() {
                    lines.push(text);
                }
            }
        }
    }

    if let Some(item_selector) = sel("ul li, ol li") {
        for item in document.select(&item_selector) {
            let text = element_text(item);
            if !text.is_empty() {
                lines.push(text);
            }
        }
    }

    if lines.is_empty()
        && let Some(content_selector) = sel("h1, h2, h3, h4, p, td, th, li")
    {
        for element in document.select(&content_selector) {
            let text = element_text(element);
            if !text.is_empty() {
                lines.push(text);
            }
        }
    }

    normalize_text(&lines.join("\n"))
}
