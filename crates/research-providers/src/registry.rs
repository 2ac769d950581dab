// crates/research-providers/src/registry.rs
// ============================================================================
// Module: Provider Registry
// Description: Initialization-time table of discovery providers.
// Purpose: Route provider calls by key; no dynamic loading.
// Dependencies: research-config, research-core
// ============================================================================

//! ## Overview
//! The registry is built once at startup from the engine configuration and
//! routes `run_discovery_provider` calls by provider key. The provider set
//! is closed: deterministic, seed list, web search, and LLM research. An
//! unknown key is a validation error naming the known keys.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use research_config::EngineConfig;
use research_config::ExternalGate;
use research_core::EngineError;
use research_core::ProviderResult;
use research_core::interfaces::DiscoveryProvider;
use research_core::interfaces::ProviderContext;
use serde_json::Value;

use crate::deterministic::DeterministicProvider;
use crate::llm::LlmProvider;
use crate::search::WebSearchProvider;
use crate::seed_list::SeedListProvider;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Discovery provider registry keyed by provider key.
pub struct ProviderRegistry {
    /// Provider implementations.
    providers: BTreeMap<String, Box<dyn DiscoveryProvider + Send + Sync>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }

    /// Builds the registry with the built-in provider set.
    #[must_use]
    pub fn with_builtin_providers(config: &EngineConfig) -> Self {
        let gate = ExternalGate::new(config);
        let mut registry = Self::new();
        registry.register(DeterministicProvider::new());
        registry.register(SeedListProvider::new());
        registry.register(WebSearchProvider::new(
            gate.clone(),
            config.search_credentials.clone(),
            config.provider_timeout_ms,
        ));
        registry.register(LlmProvider::new(
            gate,
            config.llm_credentials.clone(),
            config.provider_timeout_ms,
        ));
        registry
    }

    /// Registers a provider under its own key.
    pub fn register(&mut self, provider: impl DiscoveryProvider + Send + Sync + 'static) {
        self.providers.insert(provider.key().to_string(), Box::new(provider));
    }

    /// Returns the registered provider keys with their versions.
    #[must_use]
    pub fn list(&self) -> BTreeMap<String, String> {
        self.providers
            .iter()
            .map(|(key, provider)| (key.clone(), provider.version().to_string()))
            .collect()
    }

    /// Runs a provider by key.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for unknown keys; provider errors
    /// propagate unchanged.
    pub fn run(
        &self,
        provider_key: &str,
        ctx: &ProviderContext,
        request: &Value,
    ) -> Result<ProviderResult, EngineError> {
        let provider = self.providers.get(provider_key).ok_or_else(|| {
            let known: Vec<&str> = self.providers.keys().map(String::as_str).collect();
            EngineError::Validation(format!(
                "unknown provider {provider_key}; known providers: {}",
                known.join(", ")
            ))
        })?;
        provider.run(ctx, request)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
