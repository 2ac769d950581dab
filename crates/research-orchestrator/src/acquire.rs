// crates/research-orchestrator/src/acquire.rs
// ============================================================================
// Module: Acquire and Extract Pipeline
// Description: Fetch, dedupe, and extract sources into prospects.
// Purpose: The synchronous entry point driven by acquire_extract jobs.
// Dependencies: research-core, research-extract
// ============================================================================

//! ## Overview
//! The pipeline runs in two passes over a run's sources, in id order. The
//! fetch pass acquires content (HTTP for URLs, local for text and PDF),
//! computes the content hash, and either lands a canonical row or a
//! deduplicated pointer at an existing one. The extract pass scans fetched
//! text for company candidates and merges them into the prospect set with
//! evidence attached. Every fetch attempt emits audit events; failures
//! consume a per-source attempt and schedule a backoff retry until the
//! budget is spent, at which point `retry_exhausted` is recorded and the
//! source never fetches again. Re-running the pipeline with unchanged inputs
//! produces no new effects.

// ============================================================================
// SECTION: Imports
// ============================================================================

use research_config::EngineConfig;
use research_core::EngineError;
use research_core::FetchInfo;
use research_core::NewProspect;
use research_core::SourceDocumentRecord;
use research_core::SourceStatus;
use research_core::SourceType;
use research_core::Timestamp;
use research_core::canonical_host;
use research_core::canonicalize;
use research_core::content_hash_of_text;
use research_core::identifiers::JobId;
use research_core::identifiers::RunId;
use research_core::identifiers::SourceId;
use research_core::identifiers::TenantId;
use research_core::interfaces::Clock;
use research_core::interfaces::ContentFetcher;
use research_core::interfaces::FetchError;
use research_core::interfaces::FetchRequest;
use research_core::interfaces::NewEvidence;
use research_core::interfaces::ResearchStore;
use research_core::interfaces::SourceFetchUpdate;
use research_core::normalize_company_name;
use research_core::DiscoveredBy;
use research_extract::content_text_for;
use research_extract::pdf::extract_pdf_text;
use research_extract::normalize::normalize_text;
use research_extract::text::extract_candidates;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::service::Orchestrator;

// ============================================================================
// SECTION: Parameters and Report
// ============================================================================

/// Parameters of one acquire+extract invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AcquireExtractParams {
    /// Maximum URL sources to fetch this call; zero means the default.
    #[serde(default)]
    pub max_urls: u32,
    /// Re-select already acquired sources.
    #[serde(default)]
    pub force: bool,
}

impl AcquireExtractParams {
    /// Returns the canonical params JSON used for the job params hash.
    #[must_use]
    pub fn canonical(&self, config: &EngineConfig) -> Value {
        let max_urls = if self.max_urls == 0 {
            config.default_company_count.max(1)
        } else {
            self.max_urls
        };
        json!({ "max_urls": max_urls, "force": self.force })
    }
}

/// Counters of the fetch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FetchReport {
    /// Sources selected for acquisition.
    pub selected: u32,
    /// Sources newly fetched (or reused via 304).
    pub fetched: u32,
    /// Sources deduplicated against canonical content.
    pub deduped: u32,
    /// Sources whose attempt failed.
    pub failed: u32,
    /// Force flag echoed back.
    pub force: bool,
}

/// Counters of the extract pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractReport {
    /// Sources processed into candidates.
    pub processed: u32,
    /// Prospects newly created.
    pub prospects_added: u32,
    /// Candidates merged into existing prospects.
    pub prospects_merged: u32,
}

/// Combined report of one acquire+extract call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireExtractReport {
    /// Fetch pass counters.
    pub fetch: FetchReport,
    /// Extract pass counters.
    pub extract: ExtractReport,
    /// Ids of sources now acquired or processed, sorted.
    pub source_ids_touched: Vec<SourceId>,
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

impl<S, F, C> Orchestrator<S, F, C>
where
    S: ResearchStore,
    F: ContentFetcher,
    C: Clock,
{
    /// Runs the acquire+extract pipeline synchronously.
    ///
    /// Idempotent for `force = false`: a repeat call selects nothing new and
    /// reports the same touched set.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on store failure; per-source fetch failures
    /// are recorded, not raised.
    pub fn acquire_extract(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        params: &AcquireExtractParams,
        job_id: Option<JobId>,
    ) -> Result<AcquireExtractReport, EngineError> {
        self.store.get_run(tenant, run_id)?;
        let fetch = self.fetch_sources(tenant, run_id, params, job_id)?;
        let extract = self.extract_sources(tenant, run_id, job_id)?;

        let mut touched: Vec<SourceId> = self
            .store
            .list_sources(tenant, run_id)?
            .into_iter()
            .filter(|source| {
                matches!(source.status, SourceStatus::Fetched | SourceStatus::Processed)
            })
            .map(|source| source.id)
            .collect();
        touched.sort_unstable();

        Ok(AcquireExtractReport {
            fetch,
            extract,
            source_ids_touched: touched,
        })
    }

    /// Fetch pass: acquire content for eligible sources.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on store failure.
    pub fn fetch_sources(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        params: &AcquireExtractParams,
        job_id: Option<JobId>,
    ) -> Result<FetchReport, EngineError> {
        let limit = if params.max_urls == 0 {
            self.config.default_company_count.max(1)
        } else {
            params.max_urls
        };
        let now = self.clock.now();
        let mut selected = if params.force {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            self.store
                .list_sources(tenant, run_id)?
                .into_iter()
                .filter(|source| {
                    source.status != SourceStatus::Failed
                        || (source.attempt_count < source.max_attempts
                            && source.next_retry_at.is_some_and(|at| at <= now))
                })
                .filter(|source| !source.fetch_info.deduped)
                .take(limit)
                .collect()
        } else {
            self.store.list_fetchable_sources(tenant, run_id, now, limit)?
        };
        selected.sort_by_key(|source| source.id);

        let mut report = FetchReport {
            selected: u32::try_from(selected.len()).unwrap_or(u32::MAX),
            force: params.force,
            ..FetchReport::default()
        };

        for source in selected {
            if self.job_cancelled(job_id)? {
                break;
            }
            match self.fetch_one(tenant, run_id, &source) {
                Ok(FetchOneOutcome::Fetched) => report.fetched += 1,
                Ok(FetchOneOutcome::Deduped) => {
                    report.fetched += 1;
                    report.deduped += 1;
                }
                Ok(FetchOneOutcome::Failed) => report.failed += 1,
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    /// Returns true when the driving job requested cancellation.
    fn job_cancelled(&self, job_id: Option<JobId>) -> Result<bool, EngineError> {
        let Some(job_id) = job_id else {
            return Ok(false);
        };
        Ok(self.store.job_cancel_requested(job_id)?)
    }

    /// Acquires one source document.
    fn fetch_one(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        source: &SourceDocumentRecord,
    ) -> Result<FetchOneOutcome, EngineError> {
        let now = self.clock.now();
        self.store.record_event(
            tenant,
            run_id,
            "fetch_started",
            "ok",
            Some(&json!({ "source_id": source.id, "source_type": source.source_type })),
            None,
            None,
            now,
        )?;

        let acquired = match source.source_type {
            SourceType::Url => self.acquire_url(source),
            SourceType::Text | SourceType::ProviderJson | SourceType::LlmJson => {
                Ok(AcquiredContent {
                    text: normalize_text(source.content_text.as_deref().unwrap_or_default()),
                    mime_type: source
                        .mime_type
                        .clone()
                        .unwrap_or_else(|| "text/plain".to_string()),
                    final_url: None,
                    method: "manual_text".to_string(),
                    http_status: None,
                    headers: std::collections::BTreeMap::new(),
                    redirects: 0,
                    not_modified: false,
                })
            }
            SourceType::Pdf => source
                .content_bytes
                .as_deref()
                .map_or_else(
                    || Err(FetchFailure::terminal("pdf source has no bytes")),
                    |bytes| {
                        extract_pdf_text(bytes)
                            .map(|text| AcquiredContent {
                                text,
                                mime_type: "application/pdf".to_string(),
                                final_url: None,
                                method: "pdf_text".to_string(),
                                http_status: None,
                                headers: std::collections::BTreeMap::new(),
                                redirects: 0,
                                not_modified: false,
                            })
                            .map_err(|err| FetchFailure::terminal(&err.to_string()))
                    },
                ),
        };

        match acquired {
            Ok(content) => self.finish_fetch(tenant, run_id, source, content),
            Err(failure) => self.fail_fetch(tenant, run_id, source, &failure),
        }
    }

    /// Acquires a URL source over HTTP.
    fn acquire_url(&self, source: &SourceDocumentRecord) -> Result<AcquiredContent, FetchFailure> {
        let url = source.url.clone().ok_or_else(|| FetchFailure::terminal("url missing"))?;
        let request = FetchRequest {
            url,
            timeout_ms: self.config.fetch_timeout_ms,
            max_bytes: self.config.fetch_max_bytes,
            max_redirects: self.config.fetch_max_redirects,
            etag: source.http_headers.get("etag").cloned(),
            last_modified: source.http_headers.get("last-modified").cloned(),
            respect_robots: true,
        };
        let response = self.fetcher.fetch(&request).map_err(FetchFailure::from_fetch)?;

        let mime_type = response
            .headers
            .get("content-type")
            .map_or("text/html", |value| value.split(';').next().unwrap_or("text/html"))
            .to_string();
        let host = canonical_host(&response.final_url);
        let (text, method) = if response.not_modified {
            (
                source.content_text.clone().unwrap_or_default(),
                "conditional_reuse".to_string(),
            )
        } else {
            let body = String::from_utf8_lossy(&response.body);
            content_text_for(&mime_type, host.as_deref(), &body)
        };

        Ok(AcquiredContent {
            text,
            mime_type,
            final_url: Some(response.final_url),
            method,
            http_status: Some(response.status),
            headers: response.headers,
            redirects: response.redirects,
            not_modified: response.not_modified,
        })
    }

    /// Lands acquired content: canonical write or dedupe pointer.
    fn finish_fetch(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        source: &SourceDocumentRecord,
        content: AcquiredContent,
    ) -> Result<FetchOneOutcome, EngineError> {
        let now = self.clock.now();
        let content_hash = if content.not_modified {
            source
                .content_hash
                .clone()
                .unwrap_or_else(|| content_hash_of_text(&content.text).hex().to_string())
        } else {
            content_hash_of_text(&content.text).hex().to_string()
        };

        let existing = self.store.find_source_by_hash(tenant, run_id, &content_hash)?;
        if let Some(canonical_id) = existing
            && canonical_id != source.id
        {
            self.store.mark_source_duplicate(tenant, source.id, canonical_id, now)?;
            self.store.record_event(
                tenant,
                run_id,
                "fetch_succeeded",
                "ok",
                Some(&json!({ "source_id": source.id })),
                Some(&json!({ "deduped": true, "canonical_source_id": canonical_id })),
                None,
                now,
            )?;
            return Ok(FetchOneOutcome::Deduped);
        }

        let url_normalized = content
            .final_url
            .as_deref()
            .and_then(|url| canonicalize(url, "http").ok());
        self.store.save_source_fetched(
            tenant,
            source.id,
            &SourceFetchUpdate {
                content_text: Some(content.text),
                content_bytes: source.content_bytes.clone(),
                content_hash: content_hash.clone(),
                mime_type: Some(content.mime_type),
                http_final_url: content.final_url,
                url_normalized,
                http_status_code: content.http_status,
                http_headers: content.headers,
                fetch_info: FetchInfo {
                    deduped: false,
                    extraction_method: Some(content.method),
                    not_modified: content.not_modified,
                    redirects: content.redirects,
                },
            },
            now,
        )?;
        self.store.record_event(
            tenant,
            run_id,
            "fetch_succeeded",
            "ok",
            Some(&json!({ "source_id": source.id })),
            Some(&json!({ "content_hash": content_hash })),
            None,
            now,
        )?;
        Ok(FetchOneOutcome::Fetched)
    }

    /// Records a failed attempt and schedules or exhausts the retry budget.
    fn fail_fetch(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        source: &SourceDocumentRecord,
        failure: &FetchFailure,
    ) -> Result<FetchOneOutcome, EngineError> {
        let now = self.clock.now();
        let attempt = source.attempt_count + 1;
        let exhausted = attempt >= source.max_attempts;

        let next_retry_at = if exhausted {
            None
        } else if let Some(retry_after_ms) = failure.retry_after_ms {
            Some(now.plus_millis(retry_after_ms))
        } else {
            Some(self.config.fetch_retry.next_retry_time(attempt, now))
        };

        self.store.mark_source_fetch_failed(
            tenant,
            source.id,
            failure.http_status,
            &failure.message,
            next_retry_at,
            now,
        )?;
        self.store.record_event(
            tenant,
            run_id,
            "fetch_failed",
            "failed",
            Some(&json!({ "source_id": source.id, "attempt": attempt })),
            Some(&json!({
                "http_status": failure.http_status,
                "retriable": failure.retriable,
            })),
            Some(&failure.message),
            now,
        )?;
        if exhausted {
            self.store.record_event(
                tenant,
                run_id,
                "retry_exhausted",
                "failed",
                Some(&json!({ "source_id": source.id, "attempts": attempt })),
                None,
                Some(&failure.message),
                now,
            )?;
        } else {
            self.store.record_event(
                tenant,
                run_id,
                "retry_scheduled",
                "ok",
                Some(&json!({ "source_id": source.id, "attempt": attempt })),
                Some(&json!({ "next_retry_at": next_retry_at })),
                None,
                now,
            )?;
        }
        Ok(FetchOneOutcome::Failed)
    }

    /// Extract pass: scan fetched sources into prospects.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on store failure.
    pub fn extract_sources(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        job_id: Option<JobId>,
    ) -> Result<ExtractReport, EngineError> {
        let mut report = ExtractReport::default();
        let sources = self.store.list_sources(tenant, run_id)?;

        for source in sources {
            if source.status != SourceStatus::Fetched {
                continue;
            }
            if self.job_cancelled(job_id)? {
                break;
            }
            let now = self.clock.now();

            let extraction = match source.source_type {
                SourceType::ProviderJson | SourceType::LlmJson => {
                    self.extract_envelope(&source)
                }
                _ => {
                    let content = source.content_text.clone().unwrap_or_default();
                    let method = source
                        .fetch_info
                        .extraction_method
                        .clone()
                        .unwrap_or_else(|| "plain_text".to_string());
                    Ok(extract_candidates(&content, &method))
                }
            };

            let extraction = match extraction {
                Ok(extraction) => extraction,
                Err(err) => {
                    self.store.record_event(
                        tenant,
                        run_id,
                        "extract",
                        "failed",
                        Some(&json!({ "source_id": source.id })),
                        None,
                        Some(&err.to_string()),
                        now,
                    )?;
                    continue;
                }
            };

            let (added, merged) =
                self.merge_candidates(tenant, run_id, &source, &extraction, now)?;
            report.processed += 1;
            report.prospects_added += added;
            report.prospects_merged += merged;

            self.store.mark_source_processed(
                tenant,
                source.id,
                &json!({
                    "method": extraction.method,
                    "candidates": extraction.candidates.len(),
                    "rejected": extraction.rejected,
                    "prospects_added": added,
                    "prospects_merged": merged,
                }),
                now,
            )?;
            self.store.record_event(
                tenant,
                run_id,
                "extract",
                "ok",
                Some(&json!({ "source_id": source.id })),
                Some(&json!({
                    "method": extraction.method,
                    "candidates": extraction.candidates.len(),
                })),
                None,
                now,
            )?;
        }
        Ok(report)
    }

    /// Validates and projects a stored provider envelope.
    fn extract_envelope(
        &self,
        source: &SourceDocumentRecord,
    ) -> Result<research_extract::Extraction, EngineError> {
        let text = source.content_text.as_deref().unwrap_or("{}");
        let envelope: Value = serde_json::from_str(text)
            .map_err(|err| EngineError::Validation(format!("envelope json: {err}")))?;
        let payload = envelope.get("payload").cloned().unwrap_or(envelope);
        let (_, extraction) = research_extract::payload::project_payload(&payload)
            .map_err(|err| EngineError::Validation(err.to_string()))?;
        Ok(extraction)
    }

    /// Merges extracted candidates into the prospect set with evidence.
    fn merge_candidates(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        source: &SourceDocumentRecord,
        extraction: &research_extract::Extraction,
        now: Timestamp,
    ) -> Result<(u32, u32), EngineError> {
        let mut added = 0u32;
        let mut merged = 0u32;
        for candidate in &extraction.candidates {
            let name_normalized = normalize_company_name(&candidate.name);
            if name_normalized.is_empty() {
                continue;
            }
            let existing = self.store.find_prospect_by_name(tenant, run_id, &name_normalized)?;
            let prospect_id = if let Some(existing) = existing {
                self.store.merge_into_prospect(
                    tenant,
                    existing.id,
                    0.5,
                    DiscoveredBy::Internal,
                )?;
                merged += 1;
                existing.id
            } else {
                let created = self.store.create_prospect(
                    tenant,
                    run_id,
                    &NewProspect {
                        name_raw: candidate.name.clone(),
                        name_normalized,
                        website_url: None,
                        hq_country: None,
                        hq_city: None,
                        sector: "unclassified".to_string(),
                        subsector: None,
                        description: None,
                        relevance_score: 0.5,
                        evidence_score: 0.5,
                        confidence: 0.5,
                        discovered_by: DiscoveredBy::Internal,
                    },
                    now,
                )?;
                added += 1;
                created.id
            };
            self.store.add_prospect_evidence(
                tenant,
                prospect_id,
                &NewEvidence {
                    source_type: "document".to_string(),
                    source_name: source
                        .title
                        .clone()
                        .unwrap_or_else(|| source.source_type.as_str().to_string()),
                    source_url: source.url.clone(),
                    source_document_id: Some(source.id),
                    source_content_hash: source.content_hash.clone(),
                    raw_snippet: Some(candidate.snippet.clone()),
                    evidence_weight: 0.5,
                },
                now,
            )?;
        }
        if added > 0 || merged > 0 {
            self.store.record_event(
                tenant,
                run_id,
                "dedupe",
                "ok",
                Some(&json!({ "source_id": source.id })),
                Some(&json!({ "new_companies": added, "existing_companies": merged })),
                None,
                now,
            )?;
        }
        Ok((added, merged))
    }
}

// ============================================================================
// SECTION: Internal Types
// ============================================================================

/// Result of fetching one source.
enum FetchOneOutcome {
    /// Content acquired on a canonical row.
    Fetched,
    /// Content matched an existing canonical row.
    Deduped,
    /// The attempt failed.
    Failed,
}

/// Content acquired for one source.
struct AcquiredContent {
    /// Extracted line-oriented text.
    text: String,
    /// MIME type of the artifact.
    mime_type: String,
    /// Final URL after redirects.
    final_url: Option<String>,
    /// Extraction method chosen.
    method: String,
    /// HTTP status observed.
    http_status: Option<u16>,
    /// Captured header subset.
    headers: std::collections::BTreeMap<String, String>,
    /// Redirect count.
    redirects: u32,
    /// True when a conditional request answered 304.
    not_modified: bool,
}

/// Normalized fetch failure carried to the retry bookkeeping.
struct FetchFailure {
    /// Human-readable message.
    message: String,
    /// HTTP status when one was received.
    http_status: Option<u16>,
    /// Whether the fetcher classified the failure as retriable.
    retriable: bool,
    /// Upstream-requested retry delay.
    retry_after_ms: Option<i64>,
}

impl FetchFailure {
    /// Builds a terminal (non-HTTP) failure.
    fn terminal(message: &str) -> Self {
        Self {
            message: message.to_string(),
            http_status: None,
            retriable: false,
            retry_after_ms: None,
        }
    }

    /// Converts a fetcher error.
    fn from_fetch(err: FetchError) -> Self {
        let retriable = err.is_retriable();
        match err {
            FetchError::Status {
                status,
                retry_after_ms,
                ..
            } => Self {
                message: format!("http status {status}"),
                http_status: Some(status),
                retriable,
                retry_after_ms,
            },
            other => Self {
                message: other.to_string(),
                http_status: None,
                retriable,
                retry_after_ms: None,
            },
        }
    }
}
