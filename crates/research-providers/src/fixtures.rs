// crates/research-providers/src/fixtures.rs
// ============================================================================
// Module: Provider Fixtures
// Description: Deterministic fixture loading for mock mode.
// Purpose: Serve recorded provider responses instead of external calls.
// Dependencies: research-core, serde_json
// ============================================================================

//! ## Overview
//! In mock mode the gate hands each provider a fixture path. The fixture is
//! plain JSON (a recorded upstream response), and a missing or unreadable
//! fixture is a configuration error naming the expected path, never a silent
//! empty result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use research_core::EngineError;
use serde_json::Value;

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads a provider fixture, failing closed when absent.
///
/// # Errors
///
/// Returns [`EngineError::ExternalProviderConfig`] when the fixture is
/// missing or unreadable.
pub fn load_fixture(provider: &str, path: &Path) -> Result<Value, EngineError> {
    let raw = std::fs::read_to_string(path).map_err(|err| EngineError::ExternalProviderConfig {
        provider: provider.to_string(),
        message: format!("mock mode enabled but fixture missing at {}: {err}", path.display()),
        missing: Vec::new(),
    })?;
    serde_json::from_str(&raw).map_err(|err| EngineError::ExternalProviderConfig {
        provider: provider.to_string(),
        message: format!("fixture at {} is not valid json: {err}", path.display()),
        missing: Vec::new(),
    })
}
