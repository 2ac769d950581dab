// crates/research-providers/src/deterministic.rs
// ============================================================================
// Module: Deterministic Provider
// Description: Fixed-output provider for idempotency proofs and smoke runs.
// Purpose: Emit a stable payload independent of inputs.
// Dependencies: research-core
// ============================================================================

//! ## Overview
//! The deterministic provider returns the same two companies on every call,
//! regardless of request or environment. It exists so the enrichment ledger,
//! hashing, and dedupe paths can be exercised end to end without any
//! external dependency: two calls always produce one content hash.

// ============================================================================
// SECTION: Imports
// ============================================================================

use research_core::DiscoveryCompany;
use research_core::DiscoveryEvidence;
use research_core::DiscoveryPayload;
use research_core::DiscoveryRunContext;
use research_core::EngineError;
use research_core::ProviderResult;
use research_core::interfaces::DiscoveryProvider;
use research_core::interfaces::ProviderContext;
use serde_json::Value;

// ============================================================================
// SECTION: Provider
// ============================================================================

/// Stable provider key.
pub const KEY: &str = "deterministic";
/// Model label carried in payloads.
const MODEL: &str = "deterministic_v1";

/// Provider emitting a fixed, proof-friendly payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicProvider;

impl DeterministicProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DiscoveryProvider for DeterministicProvider {
    fn key(&self) -> &str {
        KEY
    }

    fn version(&self) -> &str {
        "1"
    }

    fn run(&self, _ctx: &ProviderContext, _request: &Value) -> Result<ProviderResult, EngineError> {
        let companies = vec![
            DiscoveryCompany {
                name: "Atlas Manufacturing".to_string(),
                website_url: Some("https://atlas.example.com".to_string()),
                hq_country: Some("US".to_string()),
                hq_city: Some("Austin".to_string()),
                sector: Some("Industrial".to_string()),
                subsector: Some("Advanced Materials".to_string()),
                description: Some(
                    "Specializes in lightweight composites for aerospace and EV OEMs.".to_string(),
                ),
                confidence: Some(0.91),
                evidence: vec![
                    DiscoveryEvidence {
                        url: "https://atlas.example.com/about".to_string(),
                        label: Some("About page".to_string()),
                        kind: Some("homepage".to_string()),
                        snippet: Some(
                            "Atlas manufactures carbon composites for electric aviation and \
                             automotive OEMs."
                                .to_string(),
                        ),
                    },
                    DiscoveryEvidence {
                        url: "https://news.example.com/atlas-seriesb".to_string(),
                        label: Some("Series B announcement".to_string()),
                        kind: Some("press_release".to_string()),
                        snippet: Some(
                            "Raised $45M to scale aerospace-grade composite production lines in \
                             Texas."
                                .to_string(),
                        ),
                    },
                ],
            },
            DiscoveryCompany {
                name: "Northwind Analytics".to_string(),
                website_url: Some("https://northwind.example.com".to_string()),
                hq_country: Some("SE".to_string()),
                hq_city: Some("Stockholm".to_string()),
                sector: Some("Software".to_string()),
                subsector: Some("Energy Analytics".to_string()),
                description: Some(
                    "Grid forecasting and renewables optimization platform for utilities."
                        .to_string(),
                ),
                confidence: Some(0.88),
                evidence: vec![DiscoveryEvidence {
                    url: "https://northwind.example.com/case-studies/ev-grid".to_string(),
                    label: Some("Case study".to_string()),
                    kind: Some("homepage".to_string()),
                    snippet: Some(
                        "Improved EV charging load prediction accuracy by 22% for a Nordic \
                         utility."
                            .to_string(),
                    ),
                }],
            },
        ];

        let mut payload = DiscoveryPayload::new(KEY, Some(MODEL.to_string()));
        payload.run_context = Some(DiscoveryRunContext {
            query: Some("deterministic_discovery".to_string()),
            geo: Vec::new(),
            industry: Vec::new(),
            notes: None,
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
            raw_input_meta: None,
            envelope: None,
            error: None,
        })
    }
}
