// crates/research-fetch/src/fetcher.rs
// ============================================================================
// Module: HTTP Fetcher
// Description: Bounded blocking acquisition with redirects and conditionals.
// Purpose: Implement ContentFetcher for URL sources.
// Dependencies: research-core, reqwest, url
// ============================================================================

//! ## Overview
//! One call performs one attempt: validate the scheme, consult the cached
//! robots policy for the host, walk redirects manually up to the cap while
//! recording the final URL, honor conditional headers, and read the body
//! under the size cap. Failures are classified so the orchestrator can apply
//! the retry policy: network errors and 5xx/408/429 are retriable, other 4xx
//! are terminal, and `Retry-After` is surfaced in milliseconds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;

use research_core::interfaces::ContentFetcher;
use research_core::interfaces::FetchError;
use research_core::interfaces::FetchRequest;
use research_core::interfaces::FetchResponse;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use url::Url;

use crate::robots::RobotsPolicy;

// ============================================================================
// SECTION: Header Capture
// ============================================================================

/// Response headers captured onto source documents, lowercased.
const CAPTURED_HEADERS: &[&str] =
    &["content-type", "content-length", "etag", "last-modified", "retry-after"];

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// User agent sent on every request and matched against robots groups.
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "research-engine/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Fetcher
// ============================================================================

/// Blocking HTTP fetcher with per-host robots caching.
pub struct HttpFetcher {
    /// Fetcher configuration.
    config: FetcherConfig,
    /// HTTP client; redirects are walked manually.
    client: Client,
    /// Robots policies cached per host.
    robots_cache: Mutex<HashMap<String, RobotsPolicy>>,
}

impl HttpFetcher {
    /// Creates a new fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] when the HTTP client cannot be built.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| FetchError::Network(format!("client build failed: {err}")))?;
        Ok(Self {
            config,
            client,
            robots_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Looks up (or fetches) the robots policy for a host.
    fn robots_for(&self, url: &Url, timeout: Duration) -> RobotsPolicy {
        let Some(host) = url.host_str() else {
            return RobotsPolicy::allow_all();
        };
        let key = format!("{}://{host}", url.scheme());
        if let Ok(cache) = self.robots_cache.lock()
            && let Some(policy) = cache.get(&key)
        {
            return policy.clone();
        }

        let robots_url = format!("{key}/robots.txt");
        let policy = self
            .client
            .get(&robots_url)
            .timeout(timeout)
            .send()
            .ok()
            .filter(|response| response.status().is_success())
            .and_then(|response| response.text().ok())
            .map_or_else(RobotsPolicy::allow_all, |text| {
                RobotsPolicy::parse(&text, &self.config.user_agent)
            });
        if let Ok(mut cache) = self.robots_cache.lock() {
            cache.insert(key, policy.clone());
        }
        policy
    }
}

impl ContentFetcher for HttpFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let mut url = Url::parse(&request.url)
            .map_err(|err| FetchError::InvalidUrl(format!("{}: {err}", request.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!("unsupported scheme: {}", url.scheme())));
        }
        let timeout = Duration::from_millis(request.timeout_ms);

        if request.respect_robots {
            let policy = self.robots_for(&url, timeout);
            if !policy.is_allowed(url.path()) {
                return Err(FetchError::RobotsDisallowed(url.to_string()));
            }
        }

        let mut redirects = 0u32;
        loop {
            let mut builder = self.client.get(url.clone()).timeout(timeout);
            if let Some(etag) = &request.etag {
                builder = builder.header("If-None-Match", etag);
            }
            if let Some(last_modified) = &request.last_modified {
                builder = builder.header("If-Modified-Since", last_modified);
            }

            let response = builder
                .send()
                .map_err(|err| FetchError::Network(err.to_string()))?;
            let status = response.status();
            let headers = capture_headers(response.headers());

            if status.is_redirection() {
                if redirects >= request.max_redirects {
                    return Err(FetchError::Status {
                        status: status.as_u16(),
                        headers,
                        retriable: false,
                        retry_after_ms: None,
                    });
                }
                let Some(location) = response
                    .headers()
                    .get("location")
                    .and_then(|value| value.to_str().ok())
                else {
                    return Err(FetchError::Network("redirect without location".to_string()));
                };
                url = url
                    .join(location)
                    .map_err(|err| FetchError::InvalidUrl(format!("{location}: {err}")))?;
                redirects += 1;
                continue;
            }

            if status.as_u16() == 304 {
                return Ok(FetchResponse {
                    status: 304,
                    final_url: url.to_string(),
                    redirects,
                    not_modified: true,
                    body: Vec::new(),
                    headers,
                });
            }

            if !status.is_success() {
                let code = status.as_u16();
                let retriable = status.is_server_error() || code == 408 || code == 429;
                let retry_after_ms = headers
                    .get("retry-after")
                    .and_then(|value| value.trim().parse::<i64>().ok())
                    .map(|seconds| seconds.saturating_mul(1_000));
                return Err(FetchError::Status {
                    status: code,
                    headers,
                    retriable,
                    retry_after_ms,
                });
            }

            let declared = response.content_length();
            if let Some(expected) = declared
                && expected > request.max_bytes as u64
            {
                return Err(FetchError::TooLarge {
                    max_bytes: request.max_bytes,
                });
            }
            let mut body = Vec::new();
            let limit = request.max_bytes as u64 + 1;
            response
                .take(limit)
                .read_to_end(&mut body)
                .map_err(|err| FetchError::Network(err.to_string()))?;
            if body.len() > request.max_bytes {
                return Err(FetchError::TooLarge {
                    max_bytes: request.max_bytes,
                });
            }

            return Ok(FetchResponse {
                status: status.as_u16(),
                final_url: url.to_string(),
                redirects,
                not_modified: false,
                body,
                headers,
            });
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Captures the persisted header subset, lowercased.
fn capture_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    let mut captured = BTreeMap::new();
    for name in CAPTURED_HEADERS {
        if let Some(value) = headers.get(*name)
            && let Ok(value) = value.to_str()
        {
            captured.insert((*name).to_string(), value.to_string());
        }
    }
    captured
}
