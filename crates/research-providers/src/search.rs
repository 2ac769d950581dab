// crates/research-providers/src/search.rs
// ============================================================================
// Module: Web Search Provider
// Description: Search-API backed discovery with mock-first fixtures.
// Purpose: Turn search results into the common payload behind the gate.
// Dependencies: research-config, research-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The web-search provider normalizes its request (query, clamped result
//! count, optional country/language/site filter), asks the gate whether it
//! may call out, and either serves the recorded fixture or issues a live API
//! call with bounded 429 retries honoring `Retry-After`. The full
//! request/response envelope (minus credentials) is preserved for
//! provenance, and result items project into companies sorted by name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use research_config::ExternalGate;
use research_config::GateMode;
use research_config::ProviderCredentials;
use research_config::config::ENV_SEARCH_API_CX;
use research_config::config::ENV_SEARCH_API_KEY;
use research_core::DiscoveryCompany;
use research_core::DiscoveryEvidence;
use research_core::DiscoveryPayload;
use research_core::DiscoveryRunContext;
use research_core::EngineError;
use research_core::ProviderResult;
use research_core::interfaces::DiscoveryProvider;
use research_core::interfaces::ProviderContext;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::params::DEFAULT_NUM_RESULTS;
use crate::params::MAX_NUM_RESULTS;
use crate::params::canonical_object;
use crate::params::clamp_count;
use crate::fixtures::load_fixture;

// ============================================================================
// SECTION: Request Schema
// ============================================================================

/// Web-search provider request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SearchRequest {
    /// Query text.
    #[serde(default)]
    pub query: String,
    /// Requested result count; clamped to `[1, 10]`.
    #[serde(default)]
    pub num_results: Option<u32>,
    /// Country filter.
    #[serde(default)]
    pub country: Option<String>,
    /// Language filter.
    #[serde(default)]
    pub language: Option<String>,
    /// Restrict results to one site.
    #[serde(default)]
    pub site_filter: Option<String>,
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// HTTP transport for the live search API, injectable for tests.
pub trait SearchTransport: Send + Sync {
    /// Issues one GET returning `(status, body, retry_after_seconds)`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Upstream`] on network failure.
    fn get(
        &self,
        endpoint: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<(u16, Value, Option<u64>), EngineError>;
}

/// Default transport on blocking reqwest.
pub struct HttpSearchTransport;

impl SearchTransport for HttpSearchTransport {
    fn get(
        &self,
        endpoint: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<(u16, Value, Option<u64>), EngineError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EngineError::Upstream {
                message: format!("search client build failed: {err}"),
                status_code: None,
            })?;
        let response =
            client.get(endpoint).query(query).send().map_err(|err| EngineError::Upstream {
                message: format!("search request failed: {err}"),
                status_code: None,
            })?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok());
        let body = response
            .json()
            .unwrap_or_else(|err| json!({ "text": err.to_string() }));
        Ok((status, body, retry_after))
    }
}

// ============================================================================
// SECTION: Provider
// ============================================================================

/// Stable provider key.
pub const KEY: &str = "web_search";
/// Model label carried in payloads.
const MODEL: &str = "web_search_v1";
/// Live API endpoint.
const ENDPOINT: &str = "https://search.example-api.com/v1";
/// Live-call attempt budget for 429 responses.
const RATE_LIMIT_ATTEMPTS: u32 = 3;

/// Search-API backed discovery provider.
pub struct WebSearchProvider {
    /// External-call gate.
    gate: ExternalGate,
    /// Credentials for live mode.
    credentials: ProviderCredentials,
    /// Live transport.
    transport: Box<dyn SearchTransport>,
    /// Sleep hook for 429 backoff; injectable for tests.
    sleeper: fn(Duration),
    /// Per-call timeout.
    timeout: Duration,
}

impl WebSearchProvider {
    /// Creates the provider with the default transport.
    #[must_use]
    pub fn new(gate: ExternalGate, credentials: ProviderCredentials, timeout_ms: u64) -> Self {
        Self::with_transport(
            gate,
            credentials,
            Box::new(HttpSearchTransport),
            std::thread::sleep,
            timeout_ms,
        )
    }

    /// Creates the provider with an injected transport and sleeper.
    #[must_use]
    pub fn with_transport(
        gate: ExternalGate,
        credentials: ProviderCredentials,
        transport: Box<dyn SearchTransport>,
        sleeper: fn(Duration),
        timeout_ms: u64,
    ) -> Self {
        Self {
            gate,
            credentials,
            transport,
            sleeper,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Issues the live call with bounded 429 retries.
    fn fetch_with_retry(
        &self,
        query: &[(String, String)],
    ) -> Result<(u16, Value, Option<u64>), EngineError> {
        let mut last = self.transport.get(ENDPOINT, query, self.timeout)?;
        for _ in 1..RATE_LIMIT_ATTEMPTS {
            if last.0 != 429 {
                break;
            }
            let wait = last.2.unwrap_or(1);
            (self.sleeper)(Duration::from_secs(wait));
            last = self.transport.get(ENDPOINT, query, self.timeout)?;
        }
        Ok(last)
    }

    /// Projects API result items into sorted companies.
    fn build_companies(payload: &Value, canonical: &Value) -> Vec<DiscoveryCompany> {
        let items = payload.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
        let max_items = canonical
            .get("num_results")
            .and_then(Value::as_u64)
            .map_or(items.len(), |n| usize::try_from(n).unwrap_or(items.len()));
        let country = canonical.get("country").and_then(Value::as_str).map(ToString::to_string);

        let mut companies = Vec::new();
        for (index, item) in items.iter().take(max_items).enumerate() {
            let title = item
                .get("title")
                .or_else(|| item.get("link"))
                .and_then(Value::as_str)
                .unwrap_or("Unnamed company")
                .trim()
                .to_string();
            let Some(url) = item
                .get("link")
                .or_else(|| item.get("formattedUrl"))
                .and_then(Value::as_str)
                .map(|url| url.trim().to_string())
            else {
                continue;
            };
            let description = item
                .get("snippet")
                .or_else(|| item.get("htmlSnippet"))
                .and_then(Value::as_str)
                .map(ToString::to_string);
            let confidence = (0.9 - 0.05 * index as f64).max(0.6);
            companies.push(DiscoveryCompany {
                name: title.clone(),
                website_url: Some(url.clone()),
                hq_country: country.clone(),
                hq_city: None,
                sector: None,
                subsector: None,
                description: description.clone(),
                confidence: Some(confidence),
                evidence: vec![DiscoveryEvidence {
                    url,
                    label: Some(title),
                    kind: Some("homepage".to_string()),
                    snippet: description,
                }],
            });
        }
        companies
    }
}

impl DiscoveryProvider for WebSearchProvider {
    fn key(&self) -> &str {
        KEY
    }

    fn version(&self) -> &str {
        "1"
    }

    fn run(&self, ctx: &ProviderContext, request: &Value) -> Result<ProviderResult, EngineError> {
        let request: SearchRequest = serde_json::from_value(request.clone())
            .map_err(|err| EngineError::Validation(format!("search request: {err}")))?;
        if request.query.trim().is_empty() {
            return Err(EngineError::Validation("search query is required".to_string()));
        }

        let num_results = clamp_count(request.num_results, DEFAULT_NUM_RESULTS, MAX_NUM_RESULTS);
        let canonical = canonical_object(&[
            ("query", json!(request.query)),
            ("num_results", json!(num_results)),
            ("country", json!(request.country)),
            ("language", json!(request.language)),
            ("site_filter", json!(request.site_filter)),
        ]);

        let mode = self.gate.can_call_external(
            KEY,
            &[
                (ENV_SEARCH_API_KEY, self.credentials.api_key.as_deref()),
                (ENV_SEARCH_API_CX, self.credentials.engine_id.as_deref()),
            ],
        )?;

        let mut public_params: Vec<(String, String)> =
            vec![("q".to_string(), request.query.clone()), ("num".to_string(), num_results.to_string())];
        if let Some(country) = &request.country {
            public_params.push(("gl".to_string(), country.clone()));
        }
        if let Some(language) = &request.language {
            public_params.push(("lr".to_string(), format!("lang_{language}")));
        }
        if let Some(site) = &request.site_filter {
            public_params.push(("siteSearch".to_string(), site.clone()));
        }

        let (status, response_payload, source_kind) = match mode {
            GateMode::Mock { fixture_path } => {
                (200, load_fixture(KEY, &fixture_path)?, "fixture")
            }
            GateMode::Live => {
                let mut query = public_params.clone();
                if let Some(key) = &self.credentials.api_key {
                    query.push(("key".to_string(), key.clone()));
                }
                if let Some(cx) = &self.credentials.engine_id {
                    query.push(("cx".to_string(), cx.clone()));
                }
                let (status, body, _) = self.fetch_with_retry(&query)?;
                (status, body, "api")
            }
        };

        let envelope = json!({
            "provider_key": KEY,
            "normalized_params": canonical,
            "request": { "endpoint": ENDPOINT, "params": public_params },
            "response": response_payload,
            "response_status": status,
            "source": source_kind,
        });

        if status != 200 {
            let message = response_payload
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("upstream_error")
                .to_string();
            return Ok(ProviderResult {
                payload: None,
                provider: KEY.to_string(),
                model: Some(MODEL.to_string()),
                version: "1".to_string(),
                source_type: Some("provider_json".to_string()),
                raw_input_text: None,
                raw_input_meta: Some(json!({ "normalized_params": canonical })),
                envelope: Some(envelope),
                error: Some(json!({
                    "code": "upstream_error",
                    "message": message,
                    "status_code": status,
                })),
            });
        }

        let companies = Self::build_companies(&response_payload, &canonical);
        let mut payload = DiscoveryPayload::new(KEY, Some(MODEL.to_string()));
        payload.run_context = Some(DiscoveryRunContext {
            query: Some(request.query.clone()),
            geo: request.country.clone().into_iter().collect(),
            industry: Vec::new(),
            notes: Some(format!("tenant:{}|run:{}", ctx.tenant_id, ctx.run_id)),
        });
        payload.companies = companies;
        payload.sort_companies();

        Ok(ProviderResult {
            payload: Some(payload),
            provider: KEY.to_string(),
            model: Some(MODEL.to_string()),
            version: "1".to_string(),
            source_type: Some("provider_json".to_string()),
            raw_input_text: None,
            raw_input_meta: Some(json!({ "normalized_params": canonical })),
            envelope: Some(envelope),
            error: None,
        })
    }
}
