// crates/research-config/src/config.rs
// ============================================================================
// Module: Engine Configuration
// Description: Immutable environment-derived configuration struct.
// Purpose: Centralize limits, credentials, and tunables for the engine.
// Dependencies: research-core, serde
// ============================================================================

//! ## Overview
//! Configuration is enumerated and explicit: external gating flags, provider
//! credentials, storage roots, size caps, fetch limits, worker cadence, and
//! retry parameters. Values come from the environment through
//! [`EngineConfig::from_env`]; tests construct configs directly or through
//! [`EngineConfig::from_lookup`] with a scripted lookup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use research_core::RetryPolicy;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Environment Keys
// ============================================================================

/// Flag enabling deterministic fixtures instead of external calls.
pub const ENV_MOCK_EXTERNAL_PROVIDERS: &str = "MOCK_EXTERNAL_PROVIDERS";
/// Flag enabling real external discovery calls.
pub const ENV_EXTERNAL_DISCOVERY_ENABLED: &str = "EXTERNAL_DISCOVERY_ENABLED";
/// Root directory for provider fixture files.
pub const ENV_PROVIDER_FIXTURES_ROOT: &str = "PROVIDER_FIXTURES_ROOT";
/// Root directory for export pack storage.
pub const ENV_EXPORT_PACK_STORAGE_ROOT: &str = "EXPORT_PACK_STORAGE_ROOT";
/// Size cap for export pack archives.
pub const ENV_EXPORT_PACK_MAX_ZIP_BYTES: &str = "EXPORT_PACK_MAX_ZIP_BYTES";
/// Size cap for evidence bundle archives.
pub const ENV_EVIDENCE_BUNDLE_MAX_ZIP_BYTES: &str = "EVIDENCE_BUNDLE_MAX_ZIP_BYTES";
/// Web-search provider API key.
pub const ENV_SEARCH_API_KEY: &str = "SEARCH_API_KEY";
/// Web-search provider engine identifier.
pub const ENV_SEARCH_API_CX: &str = "SEARCH_API_CX";
/// LLM provider API key.
pub const ENV_LLM_API_KEY: &str = "LLM_API_KEY";
/// LLM provider model override.
pub const ENV_LLM_MODEL: &str = "LLM_MODEL";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A value failed to parse.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Environment key that failed.
        key: String,
        /// Offending value.
        value: String,
    },
}

// ============================================================================
// SECTION: Provider Credentials
// ============================================================================

/// Credentials for one external provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderCredentials {
    /// API key, when configured.
    pub api_key: Option<String>,
    /// Secondary identifier (search engine id), when configured.
    pub engine_id: Option<String>,
    /// Model override, when configured.
    pub model: Option<String>,
}

// ============================================================================
// SECTION: Engine Config
// ============================================================================

/// Immutable engine configuration, constructed once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Serve deterministic fixtures instead of calling providers.
    pub mock_external_providers: bool,
    /// Allow real external discovery calls.
    pub external_discovery_enabled: bool,
    /// Root directory for provider fixture files.
    pub provider_fixtures_root: PathBuf,
    /// Root directory for export pack storage.
    pub export_pack_storage_root: PathBuf,
    /// Size cap for export pack archives, in bytes.
    pub export_pack_max_zip_bytes: u64,
    /// Size cap for evidence bundle archives, in bytes.
    pub evidence_bundle_max_zip_bytes: u64,
    /// Web-search provider credentials.
    pub search_credentials: ProviderCredentials,
    /// LLM provider credentials.
    pub llm_credentials: ProviderCredentials,
    /// Default company count requested from discovery providers.
    pub default_company_count: u32,
    /// Hard cap on companies accepted per discovery payload.
    pub max_company_count: u32,
    /// Hard cap on executives accepted per company payload.
    pub max_executive_count: u32,
    /// Per-fetch timeout in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Per-provider timeout in milliseconds.
    pub provider_timeout_ms: u64,
    /// Maximum fetched response size in bytes.
    pub fetch_max_bytes: usize,
    /// Maximum redirects followed per fetch.
    pub fetch_max_redirects: u32,
    /// Worker poll interval in milliseconds.
    pub worker_poll_interval_ms: u64,
    /// Lease age after which a running job may be reclaimed, in milliseconds.
    pub stale_lease_after_ms: i64,
    /// Enqueue reuse window for succeeded jobs, in milliseconds.
    pub job_reuse_ttl_ms: i64,
    /// Enrichment ledger TTL, in milliseconds.
    pub enrichment_ttl_ms: i64,
    /// Retry policy for jobs and steps.
    pub retry: RetryPolicy,
    /// Retry policy for source fetches.
    pub fetch_retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mock_external_providers: true,
            external_discovery_enabled: false,
            provider_fixtures_root: PathBuf::from("fixtures/providers"),
            export_pack_storage_root: PathBuf::from("storage"),
            export_pack_max_zip_bytes: 64 * 1024 * 1024,
            evidence_bundle_max_zip_bytes: 256 * 1024 * 1024,
            search_credentials: ProviderCredentials::default(),
            llm_credentials: ProviderCredentials::default(),
            default_company_count: 8,
            max_company_count: 25,
            max_executive_count: 25,
            fetch_timeout_ms: 30_000,
            provider_timeout_ms: 60_000,
            fetch_max_bytes: 2 * 1024 * 1024,
            fetch_max_redirects: 5,
            worker_poll_interval_ms: 1_000,
            stale_lease_after_ms: 1_800_000,
            job_reuse_ttl_ms: 3_600_000,
            enrichment_ttl_ms: 24 * 3_600_000,
            retry: RetryPolicy::default(),
            fetch_retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Builds the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparseable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: BTreeMap<String, String> = std::env::vars().collect();
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Builds the configuration from an arbitrary lookup.
    ///
    /// Unset keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparseable values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_MOCK_EXTERNAL_PROVIDERS) {
            config.mock_external_providers = parse_flag(ENV_MOCK_EXTERNAL_PROVIDERS, &value)?;
        }
        if let Some(value) = lookup(ENV_EXTERNAL_DISCOVERY_ENABLED) {
            config.external_discovery_enabled = parse_flag(ENV_EXTERNAL_DISCOVERY_ENABLED, &value)?;
        }
        if let Some(value) = lookup(ENV_PROVIDER_FIXTURES_ROOT) {
            config.provider_fixtures_root = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_EXPORT_PACK_STORAGE_ROOT) {
            config.export_pack_storage_root = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_EXPORT_PACK_MAX_ZIP_BYTES) {
            config.export_pack_max_zip_bytes =
                parse_number(ENV_EXPORT_PACK_MAX_ZIP_BYTES, &value)?;
        }
        if let Some(value) = lookup(ENV_EVIDENCE_BUNDLE_MAX_ZIP_BYTES) {
            config.evidence_bundle_max_zip_bytes =
                parse_number(ENV_EVIDENCE_BUNDLE_MAX_ZIP_BYTES, &value)?;
        }
        config.search_credentials = ProviderCredentials {
            api_key: lookup(ENV_SEARCH_API_KEY).filter(|v| !v.is_empty()),
            engine_id: lookup(ENV_SEARCH_API_CX).filter(|v| !v.is_empty()),
            model: None,
        };
        config.llm_credentials = ProviderCredentials {
            api_key: lookup(ENV_LLM_API_KEY).filter(|v| !v.is_empty()),
            engine_id: None,
            model: lookup(ENV_LLM_MODEL).filter(|v| !v.is_empty()),
        };

        Ok(config)
    }
}

// ============================================================================
// SECTION: Parsing Helpers
// ============================================================================

/// Parses an on/off flag.
fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parses an unsigned numeric value.
fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
