// crates/research-providers/src/llm.rs
// ============================================================================
// Module: LLM Research Provider
// Description: External LLM discovery with mock-first fixtures.
// Purpose: Ask a chat-completion endpoint for structured company lists.
// Dependencies: research-config, research-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The LLM provider builds a deterministic JSON-only prompt from canonical
//! params (query, industry, region, clamped company count), asks the gate
//! for mock or live mode, and parses the chat-completion response: either a
//! direct payload object or JSON inside `choices[0].message.content`. The
//! payload is treated as opaque evidence: companies are projected and
//! sorted, the full envelope is preserved, and nothing is re-verified.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use research_config::ExternalGate;
use research_config::GateMode;
use research_config::ProviderCredentials;
use research_config::config::ENV_LLM_API_KEY;
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

use crate::fixtures::load_fixture;
use crate::params::DEFAULT_MAX_COMPANIES;
use crate::params::MAX_MAX_COMPANIES;
use crate::params::canonical_object;
use crate::params::clamp_count;

// ============================================================================
// SECTION: Request Schema
// ============================================================================

/// LLM provider request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LlmRequest {
    /// Query text.
    #[serde(default)]
    pub query: String,
    /// Industry scope.
    #[serde(default)]
    pub industry: Option<String>,
    /// Region scope.
    #[serde(default)]
    pub region: Option<String>,
    /// Requested company count; clamped to `[1, 25]`.
    #[serde(default)]
    pub max_companies: Option<u32>,
    /// Caller correlation id echoed in canonical params.
    #[serde(default)]
    pub request_id: Option<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// HTTP transport for the live chat endpoint, injectable for tests.
pub trait LlmTransport: Send + Sync {
    /// Issues one POST returning `(status, body)`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Upstream`] on network failure.
    fn post(
        &self,
        endpoint: &str,
        body: &Value,
        bearer_token: &str,
        timeout: Duration,
    ) -> Result<(u16, Value), EngineError>;
}

/// Default transport on blocking reqwest.
pub struct HttpLlmTransport;

impl LlmTransport for HttpLlmTransport {
    fn post(
        &self,
        endpoint: &str,
        body: &Value,
        bearer_token: &str,
        timeout: Duration,
    ) -> Result<(u16, Value), EngineError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EngineError::Upstream {
                message: format!("llm client build failed: {err}"),
                status_code: None,
            })?;
        let response = client
            .post(endpoint)
            .bearer_auth(bearer_token)
            .json(body)
            .send()
            .map_err(|err| EngineError::Upstream {
                message: format!("llm request failed: {err}"),
                status_code: None,
            })?;
        let status = response.status().as_u16();
        let body = response
            .json()
            .unwrap_or_else(|err| json!({ "text": err.to_string() }));
        Ok((status, body))
    }
}

// ============================================================================
// SECTION: Provider
// ============================================================================

/// Stable provider key.
pub const KEY: &str = "llm_research";
/// Default model when none is configured.
const DEFAULT_MODEL: &str = "research-lm-1";
/// Live chat-completion endpoint.
const ENDPOINT: &str = "https://llm.example-api.com/v1/chat/completions";

/// External LLM discovery provider.
pub struct LlmProvider {
    /// External-call gate.
    gate: ExternalGate,
    /// Credentials and model override for live mode.
    credentials: ProviderCredentials,
    /// Live transport.
    transport: Box<dyn LlmTransport>,
    /// Per-call timeout.
    timeout: Duration,
}

impl LlmProvider {
    /// Creates the provider with the default transport.
    #[must_use]
    pub fn new(gate: ExternalGate, credentials: ProviderCredentials, timeout_ms: u64) -> Self {
        Self::with_transport(gate, credentials, Box::new(HttpLlmTransport), timeout_ms)
    }

    /// Creates the provider with an injected transport.
    #[must_use]
    pub fn with_transport(
        gate: ExternalGate,
        credentials: ProviderCredentials,
        transport: Box<dyn LlmTransport>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            gate,
            credentials,
            transport,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Returns the configured model name.
    fn model(&self) -> String {
        self.credentials.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    /// Builds the deterministic JSON-only prompt.
    fn build_prompt(canonical: &Value) -> String {
        let query = canonical.get("query").and_then(Value::as_str).unwrap_or_default();
        let mut scope = Vec::new();
        if let Some(industry) = canonical.get("industry").and_then(Value::as_str) {
            scope.push(format!("industry={industry}"));
        }
        if let Some(region) = canonical.get("region").and_then(Value::as_str) {
            scope.push(format!("region={region}"));
        }
        format!(
            "Return a JSON object with keys provider, model, run_context, companies. companies \
             is an array of objects: name, website_url, hq_country, hq_city, sector, subsector, \
             description, confidence, evidence[]. Each evidence entry should have url, label, \
             kind (homepage|press_release|other), snippet. Query: {query}. {}",
            scope.join(", ")
        )
        .trim()
        .to_string()
    }

    /// Builds the chat-completion request body.
    fn build_request_body(&self, canonical: &Value) -> Value {
        json!({
            "model": self.model(),
            "temperature": 0,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a deterministic research assistant. Return ONLY JSON \
                                with provider, model, run_context, companies.",
                },
                { "role": "user", "content": Self::build_prompt(canonical) },
            ],
            "response_format": { "type": "json_object" },
        })
    }

    /// Unwraps a chat response into the payload object.
    fn parse_response(payload: &Value) -> Value {
        if let Some(choices) = payload.get("choices").and_then(Value::as_array)
            && let Some(content) = choices
                .first()
                .and_then(|choice| choice.get("message"))
                .and_then(|message| message.get("content"))
                .and_then(Value::as_str)
        {
            return serde_json::from_str(content)
                .unwrap_or_else(|_| json!({ "content": content }));
        }
        payload.clone()
    }

    /// Projects the parsed payload into sorted companies.
    fn build_companies(parsed: &Value, limit: usize) -> Vec<DiscoveryCompany> {
        let entries = parsed.get("companies").and_then(Value::as_array).cloned().unwrap_or_default();
        let mut companies = Vec::new();
        for entry in entries.iter().take(limit) {
            let Some(name) = entry
                .get("name")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())
            else {
                continue;
            };
            let mut evidence = Vec::new();
            for item in entry.get("evidence").and_then(Value::as_array).into_iter().flatten() {
                let Some(url) = item.get("url").and_then(Value::as_str) else {
                    continue;
                };
                evidence.push(DiscoveryEvidence {
                    url: url.to_string(),
                    label: item
                        .get("label")
                        .or_else(|| item.get("kind"))
                        .and_then(Value::as_str)
                        .map(ToString::to_string)
                        .or_else(|| Some("evidence".to_string())),
                    kind: item
                        .get("kind")
                        .and_then(Value::as_str)
                        .map(ToString::to_string)
                        .or_else(|| Some("homepage".to_string())),
                    snippet: item.get("snippet").and_then(Value::as_str).map(ToString::to_string),
                });
            }
            let text = |key: &str| {
                entry.get(key).and_then(Value::as_str).map(ToString::to_string)
            };
            companies.push(DiscoveryCompany {
                name: name.to_string(),
                website_url: text("website_url").or_else(|| text("url")),
                hq_country: text("hq_country").or_else(|| text("country")),
                hq_city: text("hq_city"),
                sector: text("sector"),
                subsector: text("subsector"),
                description: text("description"),
                confidence: entry.get("confidence").and_then(Value::as_f64),
                evidence,
            });
        }
        companies
    }
}

impl DiscoveryProvider for LlmProvider {
    fn key(&self) -> &str {
        KEY
    }

    fn version(&self) -> &str {
        "1"
    }

    fn run(&self, ctx: &ProviderContext, request: &Value) -> Result<ProviderResult, EngineError> {
        let request: LlmRequest = serde_json::from_value(request.clone())
            .map_err(|err| EngineError::Validation(format!("llm request: {err}")))?;
        let max_companies =
            clamp_count(request.max_companies, DEFAULT_MAX_COMPANIES, MAX_MAX_COMPANIES);
        let canonical = canonical_object(&[
            ("query", json!(request.query)),
            ("industry", json!(request.industry)),
            ("region", json!(request.region)),
            ("max_companies", json!(max_companies)),
            ("request_id", json!(request.request_id)),
            ("notes", json!(request.notes)),
        ]);

        let mode = self
            .gate
            .can_call_external(KEY, &[(ENV_LLM_API_KEY, self.credentials.api_key.as_deref())])?;
        let model = self.model();
        let request_body = self.build_request_body(&canonical);

        let (status, response_payload, source_kind) = match mode {
            GateMode::Mock { fixture_path } => (200, load_fixture(KEY, &fixture_path)?, "fixture"),
            GateMode::Live => {
                let token = self.credentials.api_key.clone().unwrap_or_default();
                let (status, body) =
                    self.transport.post(ENDPOINT, &request_body, &token, self.timeout)?;
                (status, body, "api")
            }
        };

        let raw_input_text = serde_json::to_string(&request_body)
            .map_err(|err| EngineError::Validation(err.to_string()))?;
        let envelope = json!({
            "provider_key": KEY,
            "normalized_params": canonical,
            "request": { "endpoint": ENDPOINT, "body": request_body },
            "response": response_payload,
            "response_status": status,
            "source": source_kind,
        });

        if status != 200 {
            return Ok(ProviderResult {
                payload: None,
                provider: KEY.to_string(),
                model: Some(model),
                version: "1".to_string(),
                source_type: Some("llm_json".to_string()),
                raw_input_text: Some(raw_input_text),
                raw_input_meta: Some(json!({ "normalized_params": canonical })),
                envelope: Some(envelope),
                error: Some(json!({
                    "code": "upstream_error",
                    "message": "llm endpoint returned non-200",
                    "status_code": status,
                })),
            });
        }

        let parsed = Self::parse_response(&response_payload);
        let companies =
            Self::build_companies(&parsed, usize::try_from(max_companies).unwrap_or(usize::MAX));

        let mut payload = DiscoveryPayload::new(KEY, Some(model.clone()));
        payload.run_context = Some(DiscoveryRunContext {
            query: Some(request.query.clone()),
            geo: request.region.clone().into_iter().collect(),
            industry: request.industry.clone().into_iter().collect(),
            notes: Some(format!("tenant:{}|run:{}", ctx.tenant_id, ctx.run_id)),
        });
        payload.companies = companies;
        payload.sort_companies();

        Ok(ProviderResult {
            payload: Some(payload),
            provider: KEY.to_string(),
            model: Some(model),
            version: "1".to_string(),
            source_type: Some("llm_json".to_string()),
            raw_input_text: Some(raw_input_text),
            raw_input_meta: Some(json!({ "normalized_params": canonical })),
            envelope: Some(envelope),
            error: None,
        })
    }
}
