// crates/research-core/src/core/urlnorm.rs
// ============================================================================
// Module: URL Canonicalizer
// Description: Deterministic URL normalization for dedupe keys.
// Purpose: Map equivalent URLs onto one canonical string within a run.
// Dependencies: thiserror, url
// ============================================================================

//! ## Overview
//! Source documents and prospect websites are deduplicated on a canonical URL
//! form: lowercase scheme and host, no query or fragment, no default ports,
//! collapsed slashes, and no trailing slash except for the root path. The
//! canonicalizer is a pure function; two URLs that differ only in these
//! cosmetic dimensions always produce the same key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by URL canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlNormError {
    /// The input was empty or whitespace-only.
    #[error("empty_url")]
    EmptyUrl,
    /// The input had no usable host after normalization.
    #[error("invalid_host")]
    InvalidHost,
}

// ============================================================================
// SECTION: Canonicalization
// ============================================================================

/// Returns a normalized, deterministic URL for deduping.
///
/// Rules:
/// - add `default_scheme` when the input has no scheme;
/// - lowercase scheme and host;
/// - drop query, params, and fragment;
/// - remove default ports (80 for http, 443 for https);
/// - collapse duplicate slashes and strip the trailing slash except for root.
///
/// # Errors
///
/// Returns [`UrlNormError::EmptyUrl`] for blank input and
/// [`UrlNormError::InvalidHost`] when no host can be derived.
pub fn canonicalize(raw_url: &str, default_scheme: &str) -> Result<String, UrlNormError> {
    let trimmed = raw_url.trim();
    if trimmed.is_empty() {
        return Err(UrlNormError::EmptyUrl);
    }

    let parsed = parse_with_default_scheme(trimmed, default_scheme)?;

    let scheme = parsed.scheme().to_ascii_lowercase();
    let host = parsed
        .host_str()
        .map(str::to_ascii_lowercase)
        .filter(|host| !host.is_empty())
        .ok_or(UrlNormError::InvalidHost)?;

    let mut netloc = host;
    if let Some(port) = parsed.port()
        && !is_default_port(&scheme, port)
    {
        netloc.push(':');
        netloc.push_str(&port.to_string());
    }

    let path = normalize_path(parsed.path());
    Ok(format!("{scheme}://{netloc}{path}"))
}

/// Returns the lowercase canonical host of a URL, when one exists.
#[must_use]
pub fn canonical_host(raw_url: &str) -> Option<String> {
    let trimmed = raw_url.trim();
    if trimmed.is_empty() {
        return None;
    }
    parse_with_default_scheme(trimmed, "http")
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a URL, inferring `default_scheme` for bare-host inputs.
fn parse_with_default_scheme(input: &str, default_scheme: &str) -> Result<Url, UrlNormError> {
    match Url::parse(input) {
        Ok(url) if url.has_host() => Ok(url),
        // Inputs like `example.com/path` parse as scheme-only or fail; retry
        // with the default scheme prefixed.
        _ => Url::parse(&format!("{default_scheme}://{input}")).map_err(|_| UrlNormError::InvalidHost),
    }
}

/// Returns true when the port is the scheme default.
const fn is_default_port(scheme: &str, port: u16) -> bool {
    matches!((scheme.as_bytes(), port), (b"http", 80) | (b"https", 443))
}

/// Collapses duplicate slashes and strips the trailing slash except for root.
fn normalize_path(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len().max(1));
    let mut last_was_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if !last_was_slash {
                collapsed.push('/');
            }
            last_was_slash = true;
        } else {
            collapsed.push(ch);
            last_was_slash = false;
        }
    }
    if collapsed.is_empty() {
        collapsed.push('/');
    }
    if collapsed.len() > 1 {
        while collapsed.len() > 1 && collapsed.ends_with('/') {
            collapsed.pop();
        }
    }
    collapsed
}
