// crates/research-orchestrator/tests/common/mod.rs
// ============================================================================
// Module: Orchestrator Test Harness
// Description: Shared fixtures: scripted fetcher, manual clock, store.
// ============================================================================
//! ## Overview
//! One harness per test: in-memory SQLite, a manually advanced clock, a
//! scripted fetcher routing by URL, and mock-mode configuration.

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only helpers; each test binary uses a subset."
)]

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use research_config::EngineConfig;
use research_core::MandateId;
use research_core::NewSource;
use research_core::RunSpec;
use research_core::SourceType;
use research_core::Timestamp;
use research_core::identifiers::RunId;
use research_core::identifiers::SourceId;
use research_core::identifiers::TenantId;
use research_core::interfaces::ContentFetcher;
use research_core::interfaces::FetchError;
use research_core::interfaces::FetchRequest;
use research_core::interfaces::FetchResponse;
use research_orchestrator::ManualClock;
use research_orchestrator::Orchestrator;
use research_store_sqlite::SqliteStore;
use serde_json::Value;
use serde_json::json;

/// One scripted route.
#[derive(Debug, Clone)]
pub enum Route {
    /// Serve a body with an optional redirect target as the final URL.
    Ok {
        /// Response body.
        body: String,
        /// Final URL after redirects; defaults to the requested URL.
        final_url: Option<String>,
        /// Content type served.
        mime: &'static str,
        /// Redirect count reported.
        redirects: u32,
    },
    /// Fail with an HTTP status.
    Status(u16),
    /// Fail with a network error.
    Network,
}

/// Fetcher answering from a scripted route table.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    /// Routes by exact URL.
    routes: Mutex<HashMap<String, Route>>,
}

impl ScriptedFetcher {
    /// Creates an empty fetcher; unrouted URLs answer 404.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route.
    pub fn route(&self, url: &str, route: Route) {
        self.routes.lock().unwrap().insert(url.to_string(), route);
    }
}

impl ContentFetcher for ScriptedFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let route = self.routes.lock().unwrap().get(&request.url).cloned();
        match route {
            Some(Route::Ok {
                body,
                final_url,
                mime,
                redirects,
            }) => {
                let mut headers = BTreeMap::new();
                headers.insert("content-type".to_string(), mime.to_string());
                Ok(FetchResponse {
                    status: 200,
                    final_url: final_url.unwrap_or_else(|| request.url.clone()),
                    redirects,
                    not_modified: false,
                    body: body.into_bytes(),
                    headers,
                })
            }
            Some(Route::Status(status)) => Err(FetchError::Status {
                status,
                headers: BTreeMap::new(),
                retriable: status >= 500 || status == 408 || status == 429,
                retry_after_ms: None,
            }),
            Some(Route::Network) => Err(FetchError::Network("connection refused".to_string())),
            None => Err(FetchError::Status {
                status: 404,
                headers: BTreeMap::new(),
                retriable: false,
                retry_after_ms: None,
            }),
        }
    }
}

/// The full test harness.
pub struct Harness {
    /// Orchestrator under test.
    pub orchestrator: Orchestrator<SqliteStore, Arc<ScriptedFetcher>, Arc<ManualClock>>,
    /// Handle for routing fetches.
    pub fetcher: Arc<ScriptedFetcher>,
    /// Handle for advancing time.
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// Builds a harness with mock providers and no-jitter retries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Builds a harness with a customized configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let config = EngineConfig {
            retry: config.retry.without_jitter(),
            fetch_retry: config.fetch_retry.without_jitter(),
            ..config
        };
        let clock = Arc::new(ManualClock::starting_at(Timestamp::from_unix_millis(1_000_000)));
        let fetcher = Arc::new(ScriptedFetcher::new());
        let store = SqliteStore::open_in_memory().unwrap();
        let orchestrator =
            Orchestrator::new(store, Arc::clone(&fetcher), Arc::clone(&clock), config);
        Self {
            orchestrator,
            fetcher,
            clock,
        }
    }

    /// The tenant under test.
    #[must_use]
    pub fn tenant(&self) -> TenantId {
        TenantId::new("tenant-a")
    }

    /// Creates a run with the given extra configuration.
    #[must_use]
    pub fn create_run(&self, config: Value) -> RunId {
        let spec = RunSpec {
            mandate_id: MandateId::new("mandate-1"),
            name: "test run".to_string(),
            description: None,
            sector: "industrial".to_string(),
            region_scope: vec!["SE".to_string()],
            config,
            created_by: Some("tester".to_string()),
        };
        self.orchestrator.create_run(&self.tenant(), &spec).unwrap().id
    }

    /// Adds a URL source with the given attempt budget.
    #[must_use]
    pub fn add_url_source(&self, run_id: RunId, url: &str, max_attempts: u32) -> SourceId {
        self.orchestrator
            .add_source(
                &self.tenant(),
                run_id,
                &NewSource {
                    source_type: SourceType::Url,
                    title: Some(url.to_string()),
                    url: Some(url.to_string()),
                    provider: None,
                    content_text: None,
                    content_bytes: None,
                    mime_type: None,
                    max_attempts,
                },
            )
            .unwrap()
            .id
    }

    /// Adds a pasted-text source.
    #[must_use]
    pub fn add_text_source(&self, run_id: RunId, text: &str) -> SourceId {
        self.orchestrator
            .add_source(
                &self.tenant(),
                run_id,
                &NewSource {
                    source_type: SourceType::Text,
                    title: Some("pasted".to_string()),
                    url: None,
                    provider: None,
                    content_text: Some(text.to_string()),
                    content_bytes: None,
                    mime_type: Some("text/plain".to_string()),
                    max_attempts: 1,
                },
            )
            .unwrap()
            .id
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for an empty run config.
#[must_use]
pub fn empty_config() -> Value {
    json!({})
}
