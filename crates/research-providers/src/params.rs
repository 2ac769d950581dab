// crates/research-providers/src/params.rs
// ============================================================================
// Module: Canonical Provider Parameters
// Description: Request normalization and scope hashing for providers.
// Purpose: Make identical requests hash identically across call sites.
// Dependencies: research-core, serde_json
// ============================================================================

//! ## Overview
//! Provider requests normalize before anything else: numeric ranges clamp,
//! absent optionals drop out, and the result serializes through RFC 8785, so
//! the `input_scope_hash` of two equivalent requests is always equal. The
//! same canonical value is embedded in envelopes for provenance.

// ============================================================================
// SECTION: Imports
// ============================================================================

use research_core::HashError;
use research_core::hash_canonical_json;
use research_core::DEFAULT_HASH_ALGORITHM;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Clamps
// ============================================================================

/// Default result count for search requests.
pub const DEFAULT_NUM_RESULTS: u32 = 3;
/// Maximum result count for search requests.
pub const MAX_NUM_RESULTS: u32 = 10;
/// Default company count for LLM requests.
pub const DEFAULT_MAX_COMPANIES: u32 = 8;
/// Maximum company count for LLM requests.
pub const MAX_MAX_COMPANIES: u32 = 25;

/// Clamps a requested count into `[1, max]`, applying a default when absent.
#[must_use]
pub fn clamp_count(requested: Option<u32>, default: u32, max: u32) -> u32 {
    requested.unwrap_or(default).clamp(1, max)
}

// ============================================================================
// SECTION: Canonical Values
// ============================================================================

/// Builds a canonical params object from present fields only.
///
/// Entries with null values are dropped; the map serializes with sorted keys
/// under RFC 8785.
#[must_use]
pub fn canonical_object(fields: &[(&str, Value)]) -> Value {
    let mut map = Map::new();
    for (key, value) in fields {
        if !value.is_null() {
            map.insert((*key).to_string(), value.clone());
        }
    }
    Value::Object(map)
}

/// Hashes canonical params into the enrichment scope hash.
///
/// # Errors
///
/// Returns [`HashError`] when canonicalization fails.
pub fn scope_hash(canonical: &Value) -> Result<String, HashError> {
    Ok(hash_canonical_json(DEFAULT_HASH_ALGORITHM, canonical)?.hex().to_string())
}
