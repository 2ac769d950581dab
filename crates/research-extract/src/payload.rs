// crates/research-extract/src/payload.rs
// ============================================================================
// Module: Provider Payload Projection
// Description: Schema validation and evidence projection for JSON envelopes.
// Purpose: Treat provider/LLM payloads as the extract, not as raw text.
// Dependencies: research-core, serde_json
// ============================================================================

//! ## Overview
//! For provider_json and llm_json sources the payload itself is the extract:
//! no scraping happens. The envelope is deserialized into the
//! `company_discovery_v1` schema, validated, and projected into one candidate
//! per company, with the best evidence snippet attached. Anything beyond
//! the schema is treated as opaque provenance.

// ============================================================================
// SECTION: Imports
// ============================================================================

use research_core::DiscoveryCompany;
use research_core::DiscoveryPayload;
use serde_json::Value;

use crate::ExtractError;
use crate::ExtractedCandidate;
use crate::Extraction;

// ============================================================================
// SECTION: Projection
// ============================================================================

/// Validates a payload envelope and projects its companies into candidates.
///
/// # Errors
///
/// Returns [`ExtractError::PayloadShape`] for non-schema JSON and
/// [`ExtractError::Payload`] for schema violations.
pub fn project_payload(envelope: &Value) -> Result<(DiscoveryPayload, Extraction), ExtractError> {
    let payload: DiscoveryPayload = serde_json::from_value(envelope.clone())
        .map_err(|err| ExtractError::PayloadShape(err.to_string()))?;
    payload.validate()?;

    let candidates = payload
        .companies
        .iter()
        .map(|company| ExtractedCandidate {
            name: company.name.clone(),
            snippet: snippet_for(company),
        })
        .collect();
    Ok((
        payload,
        Extraction {
            method: "provider_payload".to_string(),
            candidates,
            rejected: 0,
        },
    ))
}

/// Picks the best snippet for a company entry.
fn snippet_for(company: &DiscoveryCompany) -> String {
    company
        .evidence
        .iter()
        .find_map(|evidence| evidence.snippet.clone())
        .or_else(|| company.description.clone())
        .unwrap_or_else(|| company.name.clone())
}
