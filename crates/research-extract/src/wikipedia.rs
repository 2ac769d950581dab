// crates/research-extract/src/wikipedia.rs
// ============================================================================
// Module: Wikipedia Structural Extraction
// Description: Structure-targeted candidate harvesting for Wikipedia pages.
// Purpose: Read wikitables and section lists inside the main content only.
// Dependencies: crate::normalize, scraper
// ============================================================================

//! ## Overview
//! Wikipedia pages are extracted with a three-rung ladder inside
//! `#mw-content-text`, ignoring everything before the first `h2`:
//! 1. wikitable rows: the first cell of each data row;
//! 2. lists following `h2`/`h3` headers whose text names companies or
//!    institutions, skipping navbox/sidebar/reference/toc lists;
//! 3. any remaining main-content list after the first `h2`.
//! Candidates pass boilerplate filters before acceptance; reference markers
//! like `[1]` are stripped from cell text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use scraper::ElementRef;
use scraper::Html;
use scraper::Selector;

use crate::normalize::collapse_whitespace;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header keywords that mark a section as listing companies.
const SECTION_KEYWORDS: &[&str] = &[
    "bank",
    "banks",
    "financial institution",
    "commercial bank",
    "company",
    "companies",
    "corporation",
];

/// Ancestor classes that mark a list as navigation chrome.
const CHROME_CLASSES: &[&str] = &["navbox", "sidebar", "reflist", "toc"];

/// Boilerplate fragments that disqualify a candidate.
const BOILERPLATE: &[&str] = &[
    "http",
    "list of",
    "company information from",
    "retrieved from",
    "wikipedia",
    "see also",
    "main article",
    "external links",
    "references",
    "citation needed",
];

/// Maximum accepted candidate length.
const MAX_CANDIDATE_LEN: usize = 120;

// ============================================================================
// SECTION: Result
// ============================================================================

/// Structured extraction result with the winning strategy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredItems {
    /// Strategy rung that produced the items.
    pub strategy: String,
    /// Accepted candidate lines, in document order.
    pub items: Vec<String>,
    /// Count of raw candidates the filters rejected.
    pub rejected: usize,
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Extracts candidate lines from a Wikipedia-like page.
#[must_use]
pub fn extract_structured(raw_html: &str) -> StructuredItems {
    let document = Html::parse_document(raw_html);
    let Some(main_selector) = Selector::parse("#mw-content-text").ok() else {
        return StructuredItems {
            strategy: "none".to_string(),
            items: Vec::new(),
            rejected: 0,
        };
    };
    let Some(main) = document.select(&main_selector).next() else {
        return StructuredItems {
            strategy: "none".to_string(),
            items: Vec::new(),
            rejected: 0,
        };
    };

    // One document-order walk collects the structural elements after the
    // first h2.
    let mut seen_h2 = false;
    let mut wikitables: Vec<ElementRef<'_>> = Vec::new();
    let mut headers: Vec<ElementRef<'_>> = Vec::new();
    let mut lists: Vec<ElementRef<'_>> = Vec::new();
    for node in main.descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        match element.value().name() {
            "h2" => {
                seen_h2 = true;
                headers.push(element);
            }
            "h3" => headers.push(element),
            "table" if seen_h2 && has_class(element, "wikitable") => wikitables.push(element),
            "ul" if seen_h2 && !inside_chrome(element) => lists.push(element),
            _ => {}
        }
    }

    let mut candidates: Vec<String> = Vec::new();
    let mut strategy = "none";

    if !wikitables.is_empty() {
        strategy = "wikitable";
        if let Ok(row_selector) = Selector::parse("tr")
            && let Ok(cell_selector) = Selector::parse("td, th")
        {
            for table in &wikitables {
                for row in table.select(&row_selector).skip(1) {
                    if let Some(cell) = row.select(&cell_selector).next() {
                        let text = strip_reference_markers(&element_text(cell));
                        if !text.is_empty() {
                            candidates.push(text);
                        }
                    }
                }
            }
        }
    }

    if candidates.is_empty() && !headers.is_empty() {
        strategy = "section-list";
        for header in &headers {
            let header_text = element_text(*header).to_lowercase();
            if !SECTION_KEYWORDS.iter().any(|keyword| header_text.contains(keyword)) {
                continue;
            }
            for sibling in header.next_siblings() {
                let Some(element) = ElementRef::wrap(sibling) else {
                    continue;
                };
                let name = element.value().name();
                if matches!(name, "h2" | "h3") {
                    break;
                }
                if name == "ul" && !inside_chrome(element) {
                    collect_list_items(element, &mut candidates);
                }
            }
        }
    }

    if candidates.is_empty() && !lists.is_empty() {
        strategy = "fallback";
        for list in &lists {
            collect_list_items(*list, &mut candidates);
        }
    }

    // Filter with rejection tracking.
    let mut items = Vec::new();
    let mut rejected = 0usize;
    for candidate in candidates {
        if accept_candidate(&candidate) {
            items.push(candidate);
        } else {
            rejected += 1;
        }
    }

    StructuredItems {
        strategy: strategy.to_string(),
        items,
        rejected,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the collapsed text of an element.
fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Returns true when an element carries the given class.
fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element
        .value()
        .attr("class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}

/// Returns true when the element or an ancestor is navigation chrome.
fn inside_chrome(element: ElementRef<'_>) -> bool {
    for node in element.ancestors() {
        let Some(ancestor) = ElementRef::wrap(node) else {
            continue;
        };
        if let Some(classes) = ancestor.value().attr("class") {
            let lowered = classes.to_lowercase();
            if CHROME_CLASSES.iter().any(|chrome| lowered.contains(chrome)) {
                return true;
            }
        }
        if let Some(id) = ancestor.value().attr("id")
            && matches!(id, "toc" | "references" | "External_links" | "See_also")
        {
            return true;
        }
    }
    has_class(element, "navbox") || has_class(element, "sidebar")
}

/// Collects the direct list items of a `ul` element.
fn collect_list_items(list: ElementRef<'_>, out: &mut Vec<String>) {
    for child in list.children() {
        let Some(item) = ElementRef::wrap(child) else {
            continue;
        };
        if item.value().name() != "li" {
            continue;
        }
        let text = strip_reference_markers(&element_text(item));
        if !text.is_empty() {
            out.push(text);
        }
    }
}

/// Strips inline reference markers like `[1]` or `[citation needed]`.
fn strip_reference_markers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    collapse_whitespace(&out)
}

/// Applies the candidate filters.
fn accept_candidate(candidate: &str) -> bool {
    if candidate.is_empty() || candidate.len() > MAX_CANDIDATE_LEN {
        return false;
    }
    if !candidate.chars().any(char::is_alphabetic) {
        return false;
    }
    let lower = candidate.to_lowercase();
    if BOILERPLATE.iter().any(|pattern| lower.contains(pattern)) {
        return false;
    }
    if candidate.ends_with('.') && candidate.split_whitespace().count() > 8 {
        return false;
    }
    if candidate.starts_with("==") || candidate.starts_with('#') || candidate.starts_with('*') {
        return false;
    }
    !candidate.ends_with(':')
}
