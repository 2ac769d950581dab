// crates/research-config/src/gate.rs
// ============================================================================
// Module: External Call Gate
// Description: Single point of truth for outbound provider calls.
// Purpose: Decide mock / live / refused per provider with structured errors.
// Dependencies: crate::config, research-core
// ============================================================================

//! ## Overview
//! Every provider that could reach the outside world asks the gate first.
//! With mocking enabled the gate returns the fixture path to serve. Otherwise
//! external discovery must be enabled and every required credential present;
//! any gap produces an `ExternalProviderConfig` error listing the missing
//! environment variables, sorted. Callers never bypass the gate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use research_core::EngineError;

use crate::config::ENV_EXTERNAL_DISCOVERY_ENABLED;
use crate::config::EngineConfig;

// ============================================================================
// SECTION: Gate Mode
// ============================================================================

/// How an external call may proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateMode {
    /// Serve the fixture at the given path instead of calling out.
    Mock {
        /// Fixture file for the provider.
        fixture_path: PathBuf,
    },
    /// Call the live endpoint.
    Live,
}

// ============================================================================
// SECTION: External Gate
// ============================================================================

/// The single authority on outbound provider calls.
#[derive(Debug, Clone)]
pub struct ExternalGate {
    /// Serve fixtures instead of calling providers.
    mock_external_providers: bool,
    /// Allow real external discovery calls.
    external_discovery_enabled: bool,
    /// Root directory for provider fixtures.
    fixtures_root: PathBuf,
}

impl ExternalGate {
    /// Builds the gate from the engine configuration.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            mock_external_providers: config.mock_external_providers,
            external_discovery_enabled: config.external_discovery_enabled,
            fixtures_root: config.provider_fixtures_root.clone(),
        }
    }

    /// Returns true when fixtures are being served.
    #[must_use]
    pub const fn is_mocked(&self) -> bool {
        self.mock_external_providers
    }

    /// Decides whether `provider` may call the outside world.
    ///
    /// `required` lists `(env_key, configured_value)` pairs the provider
    /// needs in live mode.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ExternalProviderConfig`] when external
    /// discovery is disabled or credentials are missing.
    pub fn can_call_external(
        &self,
        provider: &str,
        required: &[(&str, Option<&str>)],
    ) -> Result<GateMode, EngineError> {
        if self.mock_external_providers {
            return Ok(GateMode::Mock {
                fixture_path: self.fixture_path(provider),
            });
        }

        if !self.external_discovery_enabled {
            return Err(EngineError::ExternalProviderConfig {
                provider: provider.to_string(),
                message: "external discovery disabled".to_string(),
                missing: vec![ENV_EXTERNAL_DISCOVERY_ENABLED.to_string()],
            });
        }

        let mut missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| value.is_none_or(str::is_empty))
            .map(|(key, _)| (*key).to_string())
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(EngineError::ExternalProviderConfig {
                provider: provider.to_string(),
                message: "missing required environment variables".to_string(),
                missing,
            });
        }

        Ok(GateMode::Live)
    }

    /// Returns the fixture path for a provider.
    #[must_use]
    pub fn fixture_path(&self, provider: &str) -> PathBuf {
        self.fixtures_root.join(provider).join("default.json")
    }
}
