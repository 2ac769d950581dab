// crates/research-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Research Store
// Description: Durable ResearchStore backed by SQLite WAL.
// Purpose: Persist the full research data model and the durable job queue.
// Dependencies: research-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! One SQLite database holds every tenant-scoped entity: runs, steps, jobs,
//! source documents, prospects, executives, evidence, metrics, merge
//! decisions, enrichment ledger rows, export packs, and audit events. The
//! queue claim path runs inside an immediate transaction: SQLite serializes
//! writers, so the single-statement claim UPDATE is the equivalent of a
//! row-locked skip-locked pop, and exactly one claimer wins a job. All
//! timestamps are caller-supplied unix milliseconds; the store never reads
//! the wall clock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::MutexGuard;

use research_core::DiscoveredBy;
use research_core::EnrichmentRecord;
use research_core::EnrichmentStatus;
use research_core::ExecutiveEvidenceRecord;
use research_core::ExecutiveRecord;
use research_core::ExportPackRecord;
use research_core::FetchInfo;
use research_core::JobRecord;
use research_core::JobStatus;
use research_core::JobType;
use research_core::MergeDecisionRecord;
use research_core::MetricValue;
use research_core::NewExecutive;
use research_core::NewProspect;
use research_core::NewSource;
use research_core::PromotionIds;
use research_core::ProspectEvidenceRecord;
use research_core::ProspectMetricRecord;
use research_core::ProspectRecord;
use research_core::ResearchStore;
use research_core::RetryPolicy;
use research_core::ReuseReason;
use research_core::ReviewStatus;
use research_core::RunRecord;
use research_core::RunSpec;
use research_core::RunStatus;
use research_core::RunStepRecord;
use research_core::SourceDocumentRecord;
use research_core::SourceStatus;
use research_core::SourceType;
use research_core::StepKey;
use research_core::StepStatus;
use research_core::Timestamp;
use research_core::VerificationStatus;
use research_core::canonical_host;
use research_core::identifiers::DecisionId;
use research_core::identifiers::EnrichmentId;
use research_core::identifiers::ExecutiveId;
use research_core::identifiers::JobId;
use research_core::identifiers::PackId;
use research_core::identifiers::ProspectId;
use research_core::identifiers::RunId;
use research_core::identifiers::SourceId;
use research_core::identifiers::StepId;
use research_core::identifiers::TenantId;
use research_core::identifiers::WorkerId;
use research_core::interfaces::CancelJobOutcome;
use research_core::interfaces::EnqueueOutcome;
use research_core::interfaces::EventRecord;
use research_core::interfaces::JobFailOutcome;
use research_core::interfaces::NewEnrichment;
use research_core::interfaces::NewEvidence;
use research_core::interfaces::NewMergeDecision;
use research_core::interfaces::SourceFetchUpdate;
use research_core::interfaces::StoreError;
use research_core::params_hash;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use rusqlite::types::Type;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version recorded in `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;
/// Busy timeout applied to every connection (ms).
const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Full schema, applied idempotently on open.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS runs (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id     TEXT NOT NULL,
    mandate_id    TEXT NOT NULL,
    name          TEXT NOT NULL,
    description   TEXT,
    sector        TEXT NOT NULL,
    region_scope  TEXT NOT NULL,
    config        TEXT NOT NULL,
    status        TEXT NOT NULL,
    summary       TEXT,
    last_error    TEXT,
    created_by    TEXT,
    created_at    INTEGER NOT NULL,
    started_at    INTEGER,
    finished_at   INTEGER
);
CREATE INDEX IF NOT EXISTS idx_runs_tenant ON runs(tenant_id, id);

CREATE TABLE IF NOT EXISTS run_steps (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id     TEXT NOT NULL,
    run_id        INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    step_key      TEXT NOT NULL,
    step_order    INTEGER NOT NULL,
    status        TEXT NOT NULL,
    attempt_count INTEGER NOT NULL DEFAULT 0,
    max_attempts  INTEGER NOT NULL,
    next_retry_at INTEGER,
    input_json    TEXT,
    output_json   TEXT,
    last_error    TEXT,
    started_at    INTEGER,
    finished_at   INTEGER,
    UNIQUE (tenant_id, run_id, step_key)
);
CREATE INDEX IF NOT EXISTS idx_run_steps_order ON run_steps(tenant_id, run_id, step_order);

CREATE TABLE IF NOT EXISTS jobs (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id        TEXT NOT NULL,
    run_id           INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    job_type         TEXT NOT NULL,
    params_hash      TEXT NOT NULL,
    params_json      TEXT NOT NULL,
    status           TEXT NOT NULL,
    attempt_count    INTEGER NOT NULL DEFAULT 0,
    max_attempts     INTEGER NOT NULL,
    next_retry_at    INTEGER,
    locked_at        INTEGER,
    locked_by        TEXT,
    cancel_requested INTEGER NOT NULL DEFAULT 0,
    progress_json    TEXT,
    error_json       TEXT,
    created_at       INTEGER NOT NULL,
    updated_at       INTEGER NOT NULL,
    started_at       INTEGER,
    finished_at      INTEGER
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_jobs_active
    ON jobs(tenant_id, run_id, job_type)
    WHERE status IN ('queued', 'running');
CREATE INDEX IF NOT EXISTS idx_jobs_claim ON jobs(job_type, status, next_retry_at, id);

CREATE TABLE IF NOT EXISTS source_documents (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id           TEXT NOT NULL,
    run_id              INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    source_type         TEXT NOT NULL,
    title               TEXT,
    url                 TEXT,
    url_normalized      TEXT,
    http_final_url      TEXT,
    mime_type           TEXT,
    content_text        TEXT,
    content_bytes       BLOB,
    content_hash        TEXT,
    provider            TEXT,
    http_status_code    INTEGER,
    http_error_message  TEXT,
    http_headers        TEXT NOT NULL DEFAULT '{}',
    status              TEXT NOT NULL,
    attempt_count       INTEGER NOT NULL DEFAULT 0,
    max_attempts        INTEGER NOT NULL,
    next_retry_at       INTEGER,
    canonical_source_id INTEGER,
    fetch_info          TEXT NOT NULL DEFAULT '{}',
    processed_summary   TEXT,
    created_at          INTEGER NOT NULL,
    fetched_at          INTEGER
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_source_documents_hash
    ON source_documents(tenant_id, run_id, content_hash)
    WHERE content_hash IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_source_documents_run ON source_documents(tenant_id, run_id, id);
CREATE INDEX IF NOT EXISTS idx_source_documents_status
    ON source_documents(tenant_id, run_id, status, next_retry_at);

CREATE TABLE IF NOT EXISTS prospects (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id           TEXT NOT NULL,
    run_id              INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    mandate_id          TEXT NOT NULL,
    name_raw            TEXT NOT NULL,
    name_normalized     TEXT NOT NULL,
    website_url         TEXT,
    website_host        TEXT,
    hq_country          TEXT,
    hq_city             TEXT,
    sector              TEXT NOT NULL,
    subsector           TEXT,
    description         TEXT,
    employees_band      TEXT,
    revenue_band_usd    TEXT,
    relevance_score     REAL NOT NULL DEFAULT 0,
    evidence_score      REAL NOT NULL DEFAULT 0,
    confidence          REAL NOT NULL DEFAULT 0,
    discovered_by       TEXT NOT NULL,
    review_status       TEXT NOT NULL,
    exec_search_enabled INTEGER NOT NULL DEFAULT 0,
    manual_priority     INTEGER,
    manual_notes        TEXT,
    is_pinned           INTEGER NOT NULL DEFAULT 0,
    verification_status TEXT,
    created_at          INTEGER NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_prospects_name
    ON prospects(tenant_id, run_id, name_normalized);
CREATE INDEX IF NOT EXISTS idx_prospects_host ON prospects(tenant_id, run_id, website_host);

CREATE TABLE IF NOT EXISTS prospect_evidence (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id           TEXT NOT NULL,
    prospect_id         INTEGER NOT NULL REFERENCES prospects(id) ON DELETE CASCADE,
    source_type         TEXT NOT NULL,
    source_name         TEXT NOT NULL,
    source_url          TEXT,
    source_document_id  INTEGER,
    source_content_hash TEXT,
    raw_snippet         TEXT,
    evidence_weight     REAL NOT NULL DEFAULT 0.5,
    created_at          INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_prospect_evidence_prospect
    ON prospect_evidence(tenant_id, prospect_id);

CREATE TABLE IF NOT EXISTS prospect_metrics (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id          TEXT NOT NULL,
    run_id             INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    prospect_id        INTEGER NOT NULL REFERENCES prospects(id) ON DELETE CASCADE,
    metric_key         TEXT NOT NULL,
    value_json         TEXT NOT NULL,
    as_of_year         INTEGER,
    confidence         REAL,
    source_document_id INTEGER,
    created_at         INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_prospect_metrics_run ON prospect_metrics(tenant_id, run_id, id);

CREATE TABLE IF NOT EXISTS executives (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id           TEXT NOT NULL,
    run_id              INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    prospect_id         INTEGER NOT NULL REFERENCES prospects(id) ON DELETE CASCADE,
    name_raw            TEXT NOT NULL,
    name_normalized     TEXT NOT NULL,
    title               TEXT,
    profile_url         TEXT,
    linkedin_url        TEXT,
    email               TEXT,
    confidence          REAL NOT NULL DEFAULT 0,
    discovered_by       TEXT NOT NULL,
    review_status       TEXT NOT NULL,
    verification_status TEXT NOT NULL,
    source_label        TEXT,
    source_document_id  INTEGER,
    candidate_id        TEXT,
    contact_id          TEXT,
    assignment_id       TEXT,
    created_at          INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_executives_run ON executives(tenant_id, run_id, id);
CREATE INDEX IF NOT EXISTS idx_executives_prospect
    ON executives(tenant_id, prospect_id, name_normalized);

CREATE TABLE IF NOT EXISTS executive_evidence (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id           TEXT NOT NULL,
    executive_id        INTEGER NOT NULL REFERENCES executives(id) ON DELETE CASCADE,
    source_type         TEXT NOT NULL,
    source_name         TEXT NOT NULL,
    source_url          TEXT,
    source_document_id  INTEGER,
    source_content_hash TEXT,
    raw_snippet         TEXT,
    evidence_weight     REAL NOT NULL DEFAULT 0.5,
    created_at          INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_executive_evidence_executive
    ON executive_evidence(tenant_id, executive_id);

CREATE TABLE IF NOT EXISTS merge_decisions (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id          TEXT NOT NULL,
    run_id             INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    prospect_id        INTEGER NOT NULL REFERENCES prospects(id) ON DELETE CASCADE,
    left_executive_id  INTEGER NOT NULL REFERENCES executives(id) ON DELETE CASCADE,
    right_executive_id INTEGER NOT NULL REFERENCES executives(id) ON DELETE CASCADE,
    decision_type      TEXT NOT NULL,
    evidence           TEXT NOT NULL DEFAULT 'null',
    created_by         TEXT,
    note               TEXT,
    created_at         INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_merge_decisions_run ON merge_decisions(tenant_id, run_id, id);

CREATE TABLE IF NOT EXISTS ats_promotions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id     TEXT NOT NULL,
    executive_id  INTEGER NOT NULL REFERENCES executives(id) ON DELETE CASCADE,
    candidate_id  TEXT NOT NULL,
    contact_id    TEXT NOT NULL,
    assignment_id TEXT NOT NULL,
    created_at    INTEGER NOT NULL,
    UNIQUE (tenant_id, executive_id)
);

CREATE TABLE IF NOT EXISTS enrichment_records (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id          TEXT NOT NULL,
    run_id             INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    provider           TEXT NOT NULL,
    purpose            TEXT NOT NULL,
    target_type        TEXT NOT NULL,
    target_id          INTEGER NOT NULL,
    input_scope_hash   TEXT NOT NULL,
    content_hash       TEXT NOT NULL,
    status             TEXT NOT NULL,
    source_document_id INTEGER NOT NULL REFERENCES source_documents(id) ON DELETE CASCADE,
    created_at         INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_enrichment_scope
    ON enrichment_records(tenant_id, run_id, provider, purpose, target_type, target_id,
                          input_scope_hash, id);

CREATE TABLE IF NOT EXISTS export_packs (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id       TEXT NOT NULL,
    run_id          INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    storage_pointer TEXT NOT NULL,
    sha256          TEXT NOT NULL,
    size_bytes      INTEGER NOT NULL,
    created_at      INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_export_packs_run
    ON export_packs(tenant_id, run_id, created_at DESC, id DESC);

CREATE TABLE IF NOT EXISTS research_events (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id     TEXT NOT NULL,
    run_id        INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    event_type    TEXT NOT NULL,
    status        TEXT NOT NULL,
    input_json    TEXT,
    output_json   TEXT,
    error_message TEXT,
    created_at    INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_research_events_run
    ON research_events(tenant_id, run_id, event_type, id);
";

/// Column list for run rows.
const RUN_COLUMNS: &str = "id, tenant_id, mandate_id, name, description, sector, region_scope, \
                           config, status, summary, last_error, created_by, created_at, \
                           started_at, finished_at";
/// Column list for step rows.
const STEP_COLUMNS: &str = "id, tenant_id, run_id, step_key, step_order, status, attempt_count, \
                            max_attempts, next_retry_at, input_json, output_json, last_error, \
                            started_at, finished_at";
/// Column list for job rows.
const JOB_COLUMNS: &str = "id, tenant_id, run_id, job_type, params_hash, params_json, status, \
                           attempt_count, max_attempts, next_retry_at, locked_at, locked_by, \
                           cancel_requested, progress_json, error_json, created_at, updated_at, \
                           started_at, finished_at";
/// Column list for source rows.
const SOURCE_COLUMNS: &str = "id, tenant_id, run_id, source_type, title, url, url_normalized, \
                              http_final_url, mime_type, content_text, content_bytes, \
                              content_hash, provider, http_status_code, http_error_message, \
                              http_headers, status, attempt_count, max_attempts, next_retry_at, \
                              canonical_source_id, fetch_info, processed_summary, created_at, \
                              fetched_at";
/// Column list for prospect rows.
const PROSPECT_COLUMNS: &str = "id, tenant_id, run_id, mandate_id, name_raw, name_normalized, \
                                website_url, hq_country, hq_city, sector, subsector, description, \
                                employees_band, revenue_band_usd, relevance_score, evidence_score, \
                                confidence, discovered_by, review_status, exec_search_enabled, \
                                manual_priority, manual_notes, is_pinned, verification_status, \
                                created_at";
/// Column list for executive rows.
const EXECUTIVE_COLUMNS: &str = "id, tenant_id, run_id, prospect_id, name_raw, name_normalized, \
                                 title, profile_url, linkedin_url, email, confidence, \
                                 discovered_by, review_status, verification_status, source_label, \
                                 source_document_id, candidate_id, contact_id, assignment_id, \
                                 created_at";
/// Column list for merge decision rows.
const DECISION_COLUMNS: &str = "id, tenant_id, run_id, prospect_id, left_executive_id, \
                                right_executive_id, decision_type, evidence, created_by, note, \
                                created_at";
/// Column list for enrichment rows.
const ENRICHMENT_COLUMNS: &str = "id, tenant_id, run_id, provider, purpose, target_type, \
                                  target_id, input_scope_hash, content_hash, status, \
                                  source_document_id, created_at";
/// Column list for export pack rows.
const PACK_COLUMNS: &str = "id, tenant_id, run_id, storage_pointer, sha256, size_bytes, created_at";
/// Column list for event rows.
const EVENT_COLUMNS: &str =
    "id, tenant_id, run_id, event_type, status, input_json, output_json, error_message, created_at";

// ============================================================================
// SECTION: Open Errors
// ============================================================================

/// Errors raised while opening or migrating the store.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// The database could not be opened.
    #[error("failed to open store: {0}")]
    Open(String),
    /// Schema migration failed.
    #[error("failed to migrate store: {0}")]
    Migrate(String),
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable research store on one SQLite connection.
pub struct SqliteStore {
    /// Serialized connection handle.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (and migrates) a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// migrated.
    pub fn open(path: &Path) -> Result<Self, SqliteStoreError> {
        let conn =
            Connection::open(path).map_err(|err| SqliteStoreError::Open(err.to_string()))?;
        Self::initialize(conn)
    }

    /// Opens an in-memory store, for tests and tooling.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// migrated.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let conn =
            Connection::open_in_memory().map_err(|err| SqliteStoreError::Open(err.to_string()))?;
        Self::initialize(conn)
    }

    /// Applies pragmas and the schema.
    fn initialize(conn: Connection) -> Result<Self, SqliteStoreError> {
        conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))
            .map_err(|err| SqliteStoreError::Open(err.to_string()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|err| SqliteStoreError::Open(err.to_string()))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|err| SqliteStoreError::Open(err.to_string()))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|err| SqliteStoreError::Migrate(err.to_string()))?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|err| SqliteStoreError::Migrate(err.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Locks the connection, mapping poison to a backend error.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Backend("store mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Error Mapping
// ============================================================================

/// Maps a rusqlite error onto the store error taxonomy.
fn db_err(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound("row absent".to_string()),
        rusqlite::Error::FromSqlConversionFailure(..) => StoreError::Corrupt(err.to_string()),
        rusqlite::Error::SqliteFailure(inner, _) => match inner.code {
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                StoreError::Busy(err.to_string())
            }
            rusqlite::ErrorCode::ConstraintViolation => StoreError::Conflict(err.to_string()),
            _ => StoreError::Backend(err.to_string()),
        },
        _ => StoreError::Backend(err.to_string()),
    }
}

/// Builds a conversion failure for a corrupt stored value.
fn corrupt(index: usize, message: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, message.to_string().into())
}

// ============================================================================
// SECTION: JSON Helpers
// ============================================================================

/// Serializes a JSON value to column text.
fn json_text(value: &Value) -> String {
    value.to_string()
}

/// Parses JSON column text.
fn parse_json(index: usize, text: &str) -> rusqlite::Result<Value> {
    serde_json::from_str(text).map_err(|_| corrupt(index, "invalid json column"))
}

/// Parses an optional JSON column.
fn parse_opt_json(index: usize, text: Option<String>) -> rusqlite::Result<Option<Value>> {
    text.map(|text| parse_json(index, &text)).transpose()
}

// ============================================================================
// SECTION: Row Mappers
// ============================================================================

/// Maps a run row.
fn map_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let region_text: String = row.get(6)?;
    let config_text: String = row.get(7)?;
    let status_text: String = row.get(8)?;
    Ok(RunRecord {
        id: RunId::new(row.get(0)?),
        tenant_id: TenantId::new(row.get::<_, String>(1)?),
        mandate_id: research_core::MandateId::new(row.get::<_, String>(2)?),
        name: row.get(3)?,
        description: row.get(4)?,
        sector: row.get(5)?,
        region_scope: serde_json::from_str(&region_text)
            .map_err(|_| corrupt(6, "invalid region scope"))?,
        config: parse_json(7, &config_text)?,
        status: RunStatus::parse(&status_text).ok_or_else(|| corrupt(8, "unknown run status"))?,
        summary: row.get(9)?,
        last_error: row.get(10)?,
        created_by: row.get(11)?,
        created_at: Timestamp::from_unix_millis(row.get(12)?),
        started_at: row.get::<_, Option<i64>>(13)?.map(Timestamp::from_unix_millis),
        finished_at: row.get::<_, Option<i64>>(14)?.map(Timestamp::from_unix_millis),
    })
}

/// Maps a step row.
fn map_step(row: &Row<'_>) -> rusqlite::Result<RunStepRecord> {
    let key_text: String = row.get(3)?;
    let status_text: String = row.get(5)?;
    Ok(RunStepRecord {
        id: StepId::new(row.get(0)?),
        tenant_id: TenantId::new(row.get::<_, String>(1)?),
        run_id: RunId::new(row.get(2)?),
        step_key: StepKey::parse(&key_text).ok_or_else(|| corrupt(3, "unknown step key"))?,
        step_order: row.get(4)?,
        status: StepStatus::parse(&status_text)
            .ok_or_else(|| corrupt(5, "unknown step status"))?,
        attempt_count: row.get(6)?,
        max_attempts: row.get(7)?,
        next_retry_at: row.get::<_, Option<i64>>(8)?.map(Timestamp::from_unix_millis),
        input_json: parse_opt_json(9, row.get(9)?)?,
        output_json: parse_opt_json(10, row.get(10)?)?,
        last_error: row.get(11)?,
        started_at: row.get::<_, Option<i64>>(12)?.map(Timestamp::from_unix_millis),
        finished_at: row.get::<_, Option<i64>>(13)?.map(Timestamp::from_unix_millis),
    })
}

/// Maps a job row.
fn map_job(row: &Row<'_>) -> rusqlite::Result<JobRecord> {
    let type_text: String = row.get(3)?;
    let params_text: String = row.get(5)?;
    let status_text: String = row.get(6)?;
    Ok(JobRecord {
        id: JobId::new(row.get(0)?),
        tenant_id: TenantId::new(row.get::<_, String>(1)?),
        run_id: RunId::new(row.get(2)?),
        job_type: JobType::parse(&type_text).ok_or_else(|| corrupt(3, "unknown job type"))?,
        params_hash: row.get(4)?,
        params_json: parse_json(5, &params_text)?,
        status: JobStatus::parse(&status_text).ok_or_else(|| corrupt(6, "unknown job status"))?,
        attempt_count: row.get(7)?,
        max_attempts: row.get(8)?,
        next_retry_at: row.get::<_, Option<i64>>(9)?.map(Timestamp::from_unix_millis),
        locked_at: row.get::<_, Option<i64>>(10)?.map(Timestamp::from_unix_millis),
        locked_by: row.get::<_, Option<String>>(11)?.map(WorkerId::new),
        cancel_requested: row.get(12)?,
        progress_json: parse_opt_json(13, row.get(13)?)?,
        error_json: parse_opt_json(14, row.get(14)?)?,
        created_at: Timestamp::from_unix_millis(row.get(15)?),
        updated_at: Timestamp::from_unix_millis(row.get(16)?),
        started_at: row.get::<_, Option<i64>>(17)?.map(Timestamp::from_unix_millis),
        finished_at: row.get::<_, Option<i64>>(18)?.map(Timestamp::from_unix_millis),
    })
}

/// Maps a source document row.
fn map_source(row: &Row<'_>) -> rusqlite::Result<SourceDocumentRecord> {
    let type_text: String = row.get(3)?;
    let headers_text: String = row.get(15)?;
    let status_text: String = row.get(16)?;
    let fetch_info_text: String = row.get(21)?;
    let headers: BTreeMap<String, String> =
        serde_json::from_str(&headers_text).map_err(|_| corrupt(15, "invalid header map"))?;
    let fetch_info: FetchInfo =
        serde_json::from_str(&fetch_info_text).map_err(|_| corrupt(21, "invalid fetch info"))?;
    Ok(SourceDocumentRecord {
        id: SourceId::new(row.get(0)?),
        tenant_id: TenantId::new(row.get::<_, String>(1)?),
        run_id: RunId::new(row.get(2)?),
        source_type: SourceType::parse(&type_text)
            .ok_or_else(|| corrupt(3, "unknown source type"))?,
        title: row.get(4)?,
        url: row.get(5)?,
        url_normalized: row.get(6)?,
        http_final_url: row.get(7)?,
        mime_type: row.get(8)?,
        content_text: row.get(9)?,
        content_bytes: row.get(10)?,
        content_hash: row.get(11)?,
        provider: row.get(12)?,
        http_status_code: row.get(13)?,
        http_error_message: row.get(14)?,
        http_headers: headers,
        status: SourceStatus::parse(&status_text)
            .ok_or_else(|| corrupt(16, "unknown source status"))?,
        attempt_count: row.get(17)?,
        max_attempts: row.get(18)?,
        next_retry_at: row.get::<_, Option<i64>>(19)?.map(Timestamp::from_unix_millis),
        canonical_source_id: row.get::<_, Option<i64>>(20)?.map(SourceId::new),
        fetch_info,
        processed_summary: parse_opt_json(22, row.get(22)?)?,
        created_at: Timestamp::from_unix_millis(row.get(23)?),
        fetched_at: row.get::<_, Option<i64>>(24)?.map(Timestamp::from_unix_millis),
    })
}

/// Maps a prospect row.
fn map_prospect(row: &Row<'_>) -> rusqlite::Result<ProspectRecord> {
    let discovered_text: String = row.get(17)?;
    let review_text: String = row.get(18)?;
    Ok(ProspectRecord {
        id: ProspectId::new(row.get(0)?),
        tenant_id: TenantId::new(row.get::<_, String>(1)?),
        run_id: RunId::new(row.get(2)?),
        mandate_id: research_core::MandateId::new(row.get::<_, String>(3)?),
        name_raw: row.get(4)?,
        name_normalized: row.get(5)?,
        website_url: row.get(6)?,
        hq_country: row.get(7)?,
        hq_city: row.get(8)?,
        sector: row.get(9)?,
        subsector: row.get(10)?,
        description: row.get(11)?,
        employees_band: row.get(12)?,
        revenue_band_usd: row.get(13)?,
        relevance_score: row.get(14)?,
        evidence_score: row.get(15)?,
        confidence: row.get(16)?,
        discovered_by: DiscoveredBy::parse(&discovered_text)
            .ok_or_else(|| corrupt(17, "unknown discovery attribution"))?,
        review_status: ReviewStatus::parse(&review_text)
            .ok_or_else(|| corrupt(18, "unknown review status"))?,
        exec_search_enabled: row.get(19)?,
        manual_priority: row.get(20)?,
        manual_notes: row.get(21)?,
        is_pinned: row.get(22)?,
        verification_status: row.get(23)?,
        created_at: Timestamp::from_unix_millis(row.get(24)?),
    })
}

/// Maps an executive row.
fn map_executive(row: &Row<'_>) -> rusqlite::Result<ExecutiveRecord> {
    let discovered_text: String = row.get(11)?;
    let review_text: String = row.get(12)?;
    let verification_text: String = row.get(13)?;
    Ok(ExecutiveRecord {
        id: ExecutiveId::new(row.get(0)?),
        tenant_id: TenantId::new(row.get::<_, String>(1)?),
        run_id: RunId::new(row.get(2)?),
        prospect_id: ProspectId::new(row.get(3)?),
        name_raw: row.get(4)?,
        name_normalized: row.get(5)?,
        title: row.get(6)?,
        profile_url: row.get(7)?,
        linkedin_url: row.get(8)?,
        email: row.get(9)?,
        confidence: row.get(10)?,
        discovered_by: DiscoveredBy::parse(&discovered_text)
            .ok_or_else(|| corrupt(11, "unknown discovery attribution"))?,
        review_status: ReviewStatus::parse(&review_text)
            .ok_or_else(|| corrupt(12, "unknown review status"))?,
        verification_status: VerificationStatus::parse(&verification_text)
            .ok_or_else(|| corrupt(13, "unknown verification status"))?,
        source_label: row.get(14)?,
        source_document_id: row.get::<_, Option<i64>>(15)?.map(SourceId::new),
        candidate_id: row.get(16)?,
        contact_id: row.get(17)?,
        assignment_id: row.get(18)?,
        created_at: Timestamp::from_unix_millis(row.get(19)?),
    })
}

/// Maps a merge decision row.
fn map_decision(row: &Row<'_>) -> rusqlite::Result<MergeDecisionRecord> {
    let type_text: String = row.get(6)?;
    let evidence_text: String = row.get(7)?;
    Ok(MergeDecisionRecord {
        id: DecisionId::new(row.get(0)?),
        tenant_id: TenantId::new(row.get::<_, String>(1)?),
        run_id: RunId::new(row.get(2)?),
        prospect_id: ProspectId::new(row.get(3)?),
        left_executive_id: ExecutiveId::new(row.get(4)?),
        right_executive_id: ExecutiveId::new(row.get(5)?),
        decision_type: research_core::DecisionType::parse(&type_text)
            .ok_or_else(|| corrupt(6, "unknown decision type"))?,
        evidence: parse_json(7, &evidence_text)?,
        created_by: row.get(8)?,
        note: row.get(9)?,
        created_at: Timestamp::from_unix_millis(row.get(10)?),
    })
}

/// Maps an enrichment row.
fn map_enrichment(row: &Row<'_>) -> rusqlite::Result<EnrichmentRecord> {
    let status_text: String = row.get(9)?;
    Ok(EnrichmentRecord {
        id: EnrichmentId::new(row.get(0)?),
        tenant_id: TenantId::new(row.get::<_, String>(1)?),
        run_id: RunId::new(row.get(2)?),
        provider: row.get(3)?,
        purpose: row.get(4)?,
        target_type: row.get(5)?,
        target_id: row.get(6)?,
        input_scope_hash: row.get(7)?,
        content_hash: row.get(8)?,
        status: EnrichmentStatus::parse(&status_text)
            .ok_or_else(|| corrupt(9, "unknown enrichment status"))?,
        source_document_id: SourceId::new(row.get(10)?),
        created_at: Timestamp::from_unix_millis(row.get(11)?),
    })
}

/// Maps an export pack row.
fn map_pack(row: &Row<'_>) -> rusqlite::Result<ExportPackRecord> {
    let size: i64 = row.get(5)?;
    Ok(ExportPackRecord {
        id: PackId::new(row.get(0)?),
        tenant_id: TenantId::new(row.get::<_, String>(1)?),
        run_id: RunId::new(row.get(2)?),
        storage_pointer: row.get(3)?,
        sha256: row.get(4)?,
        size_bytes: u64::try_from(size).map_err(|_| corrupt(5, "negative pack size"))?,
        created_at: Timestamp::from_unix_millis(row.get(6)?),
    })
}

/// Maps an audit event row.
fn map_event(row: &Row<'_>) -> rusqlite::Result<EventRecord> {
    Ok(EventRecord {
        id: row.get(0)?,
        tenant_id: TenantId::new(row.get::<_, String>(1)?),
        run_id: RunId::new(row.get(2)?),
        event_type: row.get(3)?,
        status: row.get(4)?,
        input_json: parse_opt_json(5, row.get(5)?)?,
        output_json: parse_opt_json(6, row.get(6)?)?,
        error_message: row.get(7)?,
        created_at: Timestamp::from_unix_millis(row.get(8)?),
    })
}

/// Maps a prospect or executive evidence row with the owning entity id.
fn map_evidence_common(
    row: &Row<'_>,
    owner_id: i64,
) -> rusqlite::Result<(i64, TenantId, EvidenceColumns)> {
    Ok((
        owner_id,
        TenantId::new(row.get::<_, String>(1)?),
        EvidenceColumns {
            id: row.get(0)?,
            source_type: row.get(2)?,
            source_name: row.get(3)?,
            source_url: row.get(4)?,
            source_document_id: row.get::<_, Option<i64>>(5)?.map(SourceId::new),
            source_content_hash: row.get(6)?,
            raw_snippet: row.get(7)?,
            evidence_weight: row.get(8)?,
            created_at: Timestamp::from_unix_millis(row.get(9)?),
        },
    ))
}

/// Shared evidence column bundle.
struct EvidenceColumns {
    /// Evidence row identifier.
    id: i64,
    /// Source classification.
    source_type: String,
    /// Human-readable source name.
    source_name: String,
    /// Source URL.
    source_url: Option<String>,
    /// Source document reference.
    source_document_id: Option<SourceId>,
    /// Content hash at link time.
    source_content_hash: Option<String>,
    /// Snippet where the entity appeared.
    raw_snippet: Option<String>,
    /// Evidence weight.
    evidence_weight: f64,
    /// Creation time.
    created_at: Timestamp,
}

// ============================================================================
// SECTION: ResearchStore Implementation
// ============================================================================

impl ResearchStore for SqliteStore {
    fn create_run(
        &self,
        tenant: &TenantId,
        spec: &RunSpec,
        now: Timestamp,
    ) -> Result<RunRecord, StoreError> {
        let conn = self.lock()?;
        let region = serde_json::to_string(&spec.region_scope)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        conn.execute(
            "INSERT INTO runs (tenant_id, mandate_id, name, description, sector, region_scope, \
             config, status, created_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                tenant.as_str(),
                spec.mandate_id.as_str(),
                spec.name,
                spec.description,
                spec.sector,
                region,
                json_text(&spec.config),
                RunStatus::Planned.as_str(),
                spec.created_by,
                now.as_unix_millis(),
            ],
        )
        .map_err(db_err)?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = ?1"),
            params![id],
            map_run,
        )
        .map_err(db_err)
    }

    fn get_run(&self, tenant: &TenantId, run_id: RunId) -> Result<RunRecord, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {RUN_COLUMNS} FROM runs WHERE tenant_id = ?1 AND id = ?2"),
            params![tenant.as_str(), run_id.get()],
            map_run,
        )
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| StoreError::NotFound(format!("run {run_id}")))
    }

    fn list_runs(&self, tenant: &TenantId) -> Result<Vec<RunRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM runs WHERE tenant_id = ?1 ORDER BY id DESC"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![tenant.as_str()], map_run)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn set_run_status(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        status: RunStatus,
        last_error: Option<&str>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let finished = status.is_terminal().then(|| now.as_unix_millis());
        let changed = conn
            .execute(
                "UPDATE runs SET status = ?1, \
                 last_error = COALESCE(?2, last_error), \
                 started_at = CASE WHEN ?3 = 'running' AND started_at IS NULL \
                                   THEN ?4 ELSE started_at END, \
                 finished_at = COALESCE(?5, finished_at) \
                 WHERE tenant_id = ?6 AND id = ?7",
                params![
                    status.as_str(),
                    last_error,
                    status.as_str(),
                    now.as_unix_millis(),
                    finished,
                    tenant.as_str(),
                    run_id.get(),
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("run {run_id}")));
        }
        Ok(())
    }

    fn set_run_summary(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        summary: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE runs SET summary = ?1 WHERE tenant_id = ?2 AND id = ?3",
                params![summary, tenant.as_str(), run_id.get()],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("run {run_id}")));
        }
        Ok(())
    }

    fn insert_step_plan(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        plan: &[StepKey],
        max_attempts: u32,
        now: Timestamp,
    ) -> Result<Vec<RunStepRecord>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;
        let mut order: i64 = 0;
        for key in plan {
            tx.execute(
                "INSERT INTO run_steps (tenant_id, run_id, step_key, step_order, status, \
                 max_attempts, started_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)",
                params![
                    tenant.as_str(),
                    run_id.get(),
                    key.as_str(),
                    order,
                    StepStatus::Pending.as_str(),
                    max_attempts,
                ],
            )
            .map_err(db_err)?;
            order += 1;
        }
        let _ = now;
        let steps = {
            let mut stmt = tx
                .prepare(&format!(
                    "SELECT {STEP_COLUMNS} FROM run_steps \
                     WHERE tenant_id = ?1 AND run_id = ?2 ORDER BY step_order"
                ))
                .map_err(db_err)?;
            stmt.query_map(params![tenant.as_str(), run_id.get()], map_step)
                .map_err(db_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_err)?
        };
        tx.commit().map_err(db_err)?;
        Ok(steps)
    }

    fn list_steps(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<RunStepRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {STEP_COLUMNS} FROM run_steps \
                 WHERE tenant_id = ?1 AND run_id = ?2 ORDER BY step_order"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![tenant.as_str(), run_id.get()], map_step)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn step_mark_running(
        &self,
        tenant: &TenantId,
        step_id: StepId,
        input_json: &Value,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE run_steps SET status = 'running', attempt_count = attempt_count + 1, \
                 input_json = ?1, started_at = COALESCE(started_at, ?2) \
                 WHERE tenant_id = ?3 AND id = ?4",
                params![json_text(input_json), now.as_unix_millis(), tenant.as_str(), step_id.get()],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("step {step_id}")));
        }
        Ok(())
    }

    fn step_mark_succeeded(
        &self,
        tenant: &TenantId,
        step_id: StepId,
        output_json: &Value,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE run_steps SET status = 'succeeded', output_json = ?1, last_error = NULL, \
                 next_retry_at = NULL, finished_at = ?2 WHERE tenant_id = ?3 AND id = ?4",
                params![
                    json_text(output_json),
                    now.as_unix_millis(),
                    tenant.as_str(),
                    step_id.get()
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("step {step_id}")));
        }
        Ok(())
    }

    fn step_mark_failed(
        &self,
        tenant: &TenantId,
        step_id: StepId,
        error: &str,
        next_retry_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let finished = next_retry_at.is_none().then(|| now.as_unix_millis());
        let changed = conn
            .execute(
                "UPDATE run_steps SET status = 'failed', last_error = ?1, next_retry_at = ?2, \
                 finished_at = ?3 WHERE tenant_id = ?4 AND id = ?5",
                params![
                    error,
                    next_retry_at.map(Timestamp::as_unix_millis),
                    finished,
                    tenant.as_str(),
                    step_id.get()
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("step {step_id}")));
        }
        Ok(())
    }

    fn step_mark_skipped(
        &self,
        tenant: &TenantId,
        step_id: StepId,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE run_steps SET status = 'skipped', last_error = ?1, next_retry_at = NULL, \
                 finished_at = ?2 WHERE tenant_id = ?3 AND id = ?4",
                params![reason, now.as_unix_millis(), tenant.as_str(), step_id.get()],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("step {step_id}")));
        }
        Ok(())
    }

    fn reset_failed_steps(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        now: Timestamp,
    ) -> Result<u32, StoreError> {
        let conn = self.lock()?;
        let _ = now;
        let changed = conn
            .execute(
                "UPDATE run_steps SET status = 'pending', next_retry_at = NULL, \
                 finished_at = NULL, last_error = NULL \
                 WHERE tenant_id = ?1 AND run_id = ?2 AND (status = 'failed' \
                   OR (status = 'skipped' AND last_error = 'cancelled'))",
                params![tenant.as_str(), run_id.get()],
            )
            .map_err(db_err)?;
        Ok(u32::try_from(changed).unwrap_or(u32::MAX))
    }

    fn enqueue_job(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        job_type: JobType,
        params: &Value,
        max_attempts: u32,
        reuse_ttl_ms: i64,
        now: Timestamp,
    ) -> Result<EnqueueOutcome, StoreError> {
        let hash = params_hash(params)
            .map_err(|err| StoreError::Backend(err.to_string()))?
            .hex()
            .to_string();

        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let active: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, params_hash FROM jobs \
                 WHERE tenant_id = ?1 AND run_id = ?2 AND job_type = ?3 \
                   AND status IN ('queued', 'running') \
                 ORDER BY id DESC LIMIT 1",
                params![tenant.as_str(), run_id.get(), job_type.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(db_err)?;
        if let Some((id, existing_hash)) = active {
            if existing_hash == hash {
                tx.commit().map_err(db_err)?;
                return Ok(EnqueueOutcome {
                    job_id: JobId::new(id),
                    params_hash: hash,
                    reused: Some(ReuseReason::Inflight),
                });
            }
            return Err(StoreError::Conflict(format!(
                "run {run_id} already has an active {job_type} job with different params"
            )));
        }

        let reused: Option<i64> = tx
            .query_row(
                "SELECT id FROM jobs \
                 WHERE tenant_id = ?1 AND run_id = ?2 AND job_type = ?3 \
                   AND status = 'succeeded' AND params_hash = ?4 AND finished_at >= ?5 \
                 ORDER BY id DESC LIMIT 1",
                params![
                    tenant.as_str(),
                    run_id.get(),
                    job_type.as_str(),
                    hash,
                    now.as_unix_millis().saturating_sub(reuse_ttl_ms),
                ],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if let Some(id) = reused {
            tx.commit().map_err(db_err)?;
            return Ok(EnqueueOutcome {
                job_id: JobId::new(id),
                params_hash: hash,
                reused: Some(ReuseReason::DuplicateSucceeded),
            });
        }

        tx.execute(
            "INSERT INTO jobs (tenant_id, run_id, job_type, params_hash, params_json, status, \
             max_attempts, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 'queued', ?6, ?7, ?7)",
            params![
                tenant.as_str(),
                run_id.get(),
                job_type.as_str(),
                hash,
                json_text(params),
                max_attempts,
                now.as_unix_millis(),
            ],
        )
        .map_err(db_err)?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(db_err)?;
        Ok(EnqueueOutcome {
            job_id: JobId::new(id),
            params_hash: hash,
            reused: None,
        })
    }

    fn claim_next_job(
        &self,
        worker: &WorkerId,
        job_type: JobType,
        stale_after_ms: i64,
        now: Timestamp,
    ) -> Result<Option<JobRecord>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let stale_cutoff = now.as_unix_millis().saturating_sub(stale_after_ms);
        let candidate: Option<i64> = tx
            .query_row(
                "SELECT id FROM jobs WHERE job_type = ?1 AND ( \
                   (status = 'queued' AND (next_retry_at IS NULL OR next_retry_at <= ?2)) \
                   OR (status = 'running' AND locked_at IS NOT NULL AND locked_at <= ?3) \
                 ) ORDER BY id LIMIT 1",
                params![job_type.as_str(), now.as_unix_millis(), stale_cutoff],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        let Some(id) = candidate else {
            tx.commit().map_err(db_err)?;
            return Ok(None);
        };

        tx.execute(
            "UPDATE jobs SET status = 'running', locked_at = ?1, locked_by = ?2, \
             attempt_count = attempt_count + 1, updated_at = ?1, \
             started_at = COALESCE(started_at, ?1) WHERE id = ?3",
            params![now.as_unix_millis(), worker.as_str(), id],
        )
        .map_err(db_err)?;

        let job = tx
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                params![id],
                map_job,
            )
            .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(Some(job))
    }

    fn get_job(&self, tenant: &TenantId, job_id: JobId) -> Result<JobRecord, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE tenant_id = ?1 AND id = ?2"),
            params![tenant.as_str(), job_id.get()],
            map_job,
        )
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| StoreError::NotFound(format!("job {job_id}")))
    }

    fn active_job_for_run(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        job_type: JobType,
    ) -> Result<Option<JobRecord>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT {JOB_COLUMNS} FROM jobs \
                 WHERE tenant_id = ?1 AND run_id = ?2 AND job_type = ?3 \
                   AND status IN ('queued', 'running') ORDER BY id DESC LIMIT 1"
            ),
            params![tenant.as_str(), run_id.get(), job_type.as_str()],
            map_job,
        )
        .optional()
        .map_err(db_err)
    }

    fn complete_job(
        &self,
        job_id: JobId,
        progress: Option<&Value>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE jobs SET status = 'succeeded', \
                 progress_json = COALESCE(?1, progress_json), locked_at = NULL, \
                 locked_by = NULL, updated_at = ?2, finished_at = ?2 WHERE id = ?3",
                params![progress.map(json_text), now.as_unix_millis(), job_id.get()],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("job {job_id}")));
        }
        Ok(())
    }

    fn fail_job(
        &self,
        job_id: JobId,
        error: &Value,
        policy: &RetryPolicy,
        now: Timestamp,
    ) -> Result<JobFailOutcome, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;
        let (attempts, max_attempts): (u32, u32) = tx
            .query_row(
                "SELECT attempt_count, max_attempts FROM jobs WHERE id = ?1",
                params![job_id.get()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("job {job_id}")))?;

        let outcome = if attempts >= max_attempts {
            tx.execute(
                "UPDATE jobs SET status = 'failed', error_json = ?1, locked_at = NULL, \
                 locked_by = NULL, next_retry_at = NULL, updated_at = ?2, finished_at = ?2 \
                 WHERE id = ?3",
                params![json_text(error), now.as_unix_millis(), job_id.get()],
            )
            .map_err(db_err)?;
            JobFailOutcome::Failed
        } else {
            let retry_at = policy.next_retry_time(attempts, now);
            tx.execute(
                "UPDATE jobs SET status = 'queued', error_json = ?1, locked_at = NULL, \
                 locked_by = NULL, next_retry_at = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    json_text(error),
                    retry_at.as_unix_millis(),
                    now.as_unix_millis(),
                    job_id.get()
                ],
            )
            .map_err(db_err)?;
            JobFailOutcome::Requeued(retry_at)
        };
        tx.commit().map_err(db_err)?;
        Ok(outcome)
    }

    fn cancel_job(
        &self,
        tenant: &TenantId,
        job_id: JobId,
        now: Timestamp,
    ) -> Result<CancelJobOutcome, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;
        let status_text: String = tx
            .query_row(
                "SELECT status FROM jobs WHERE tenant_id = ?1 AND id = ?2",
                params![tenant.as_str(), job_id.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("job {job_id}")))?;
        let status = JobStatus::parse(&status_text)
            .ok_or_else(|| StoreError::Corrupt("unknown job status".to_string()))?;

        let outcome = match status {
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled => {
                CancelJobOutcome::NoopTerminal
            }
            JobStatus::Queued => {
                tx.execute(
                    "UPDATE jobs SET status = 'cancelled', updated_at = ?1, finished_at = ?1, \
                     next_retry_at = NULL WHERE id = ?2",
                    params![now.as_unix_millis(), job_id.get()],
                )
                .map_err(db_err)?;
                CancelJobOutcome::Cancelled
            }
            JobStatus::Running => {
                tx.execute(
                    "UPDATE jobs SET cancel_requested = 1, updated_at = ?1 WHERE id = ?2",
                    params![now.as_unix_millis(), job_id.get()],
                )
                .map_err(db_err)?;
                CancelJobOutcome::CancelRequested
            }
        };
        tx.commit().map_err(db_err)?;
        Ok(outcome)
    }

    fn retry_job(
        &self,
        tenant: &TenantId,
        job_id: JobId,
        reset_attempts: bool,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE jobs SET status = 'queued', next_retry_at = NULL, error_json = NULL, \
                 cancel_requested = 0, finished_at = NULL, \
                 attempt_count = CASE WHEN ?1 THEN 0 ELSE attempt_count END, updated_at = ?2 \
                 WHERE tenant_id = ?3 AND id = ?4 AND status IN ('failed', 'cancelled')",
                params![reset_attempts, now.as_unix_millis(), tenant.as_str(), job_id.get()],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::Conflict(format!(
                "job {job_id} is not failed or cancelled"
            )));
        }
        Ok(())
    }

    fn job_cancel_requested(&self, job_id: JobId) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT cancel_requested FROM jobs WHERE id = ?1",
            params![job_id.get()],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| StoreError::NotFound(format!("job {job_id}")))
    }

    fn acknowledge_cancel(&self, job_id: JobId, now: Timestamp) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE jobs SET status = 'cancelled', locked_at = NULL, locked_by = NULL, \
                 updated_at = ?1, finished_at = ?1 WHERE id = ?2 AND status = 'running'",
                params![now.as_unix_millis(), job_id.get()],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("job {job_id}")));
        }
        Ok(())
    }

    fn set_job_progress(
        &self,
        job_id: JobId,
        progress: &Value,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE jobs SET progress_json = ?1, updated_at = ?2 WHERE id = ?3",
                params![json_text(progress), now.as_unix_millis(), job_id.get()],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("job {job_id}")));
        }
        Ok(())
    }

    fn add_source(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        source: &NewSource,
        now: Timestamp,
    ) -> Result<SourceDocumentRecord, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO source_documents (tenant_id, run_id, source_type, title, url, provider, \
             content_text, content_bytes, mime_type, status, max_attempts, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'new', ?10, ?11)",
            params![
                tenant.as_str(),
                run_id.get(),
                source.source_type.as_str(),
                source.title,
                source.url,
                source.provider,
                source.content_text,
                source.content_bytes,
                source.mime_type,
                source.max_attempts,
                now.as_unix_millis(),
            ],
        )
        .map_err(db_err)?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {SOURCE_COLUMNS} FROM source_documents WHERE id = ?1"),
            params![id],
            map_source,
        )
        .map_err(db_err)
    }

    fn get_source(
        &self,
        tenant: &TenantId,
        source_id: SourceId,
    ) -> Result<SourceDocumentRecord, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT {SOURCE_COLUMNS} FROM source_documents WHERE tenant_id = ?1 AND id = ?2"
            ),
            params![tenant.as_str(), source_id.get()],
            map_source,
        )
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| StoreError::NotFound(format!("source {source_id}")))
    }

    fn list_sources(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<SourceDocumentRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SOURCE_COLUMNS} FROM source_documents \
                 WHERE tenant_id = ?1 AND run_id = ?2 ORDER BY id"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![tenant.as_str(), run_id.get()], map_source)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn list_fetchable_sources(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<SourceDocumentRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SOURCE_COLUMNS} FROM source_documents \
                 WHERE tenant_id = ?1 AND run_id = ?2 AND ( \
                   status = 'new' OR (status = 'failed' AND attempt_count < max_attempts \
                     AND next_retry_at IS NOT NULL AND next_retry_at <= ?3) \
                 ) ORDER BY id LIMIT ?4",
                ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(
                params![tenant.as_str(), run_id.get(), now.as_unix_millis(), limit],
                map_source,
            )
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn find_source_by_hash(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        content_hash: &str,
    ) -> Result<Option<SourceId>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id FROM source_documents \
             WHERE tenant_id = ?1 AND run_id = ?2 AND content_hash = ?3",
            params![tenant.as_str(), run_id.get(), content_hash],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .map_err(db_err)
        .map(|id| id.map(SourceId::new))
    }

    fn save_source_fetched(
        &self,
        tenant: &TenantId,
        source_id: SourceId,
        update: &SourceFetchUpdate,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let headers = serde_json::to_string(&update.http_headers)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let fetch_info = serde_json::to_string(&update.fetch_info)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let changed = conn
            .execute(
                "UPDATE source_documents SET content_text = ?1, content_bytes = ?2, \
                 content_hash = ?3, mime_type = COALESCE(?4, mime_type), http_final_url = ?5, \
                 url_normalized = ?6, http_status_code = ?7, http_headers = ?8, \
                 http_error_message = NULL, status = 'fetched', canonical_source_id = id, \
                 fetch_info = ?9, fetched_at = ?10 WHERE tenant_id = ?11 AND id = ?12",
                params![
                    update.content_text,
                    update.content_bytes,
                    update.content_hash,
                    update.mime_type,
                    update.http_final_url,
                    update.url_normalized,
                    update.http_status_code,
                    headers,
                    fetch_info,
                    now.as_unix_millis(),
                    tenant.as_str(),
                    source_id.get(),
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("source {source_id}")));
        }
        Ok(())
    }

    fn mark_source_duplicate(
        &self,
        tenant: &TenantId,
        source_id: SourceId,
        canonical_id: SourceId,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;
        let fetch_info_text: String = tx
            .query_row(
                "SELECT fetch_info FROM source_documents WHERE tenant_id = ?1 AND id = ?2",
                params![tenant.as_str(), source_id.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("source {source_id}")))?;
        let mut fetch_info: FetchInfo = serde_json::from_str(&fetch_info_text)
            .map_err(|err| StoreError::Corrupt(err.to_string()))?;
        fetch_info.deduped = true;
        let fetch_info = serde_json::to_string(&fetch_info)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        tx.execute(
            "UPDATE source_documents SET status = 'processed', content_hash = NULL, \
             content_text = NULL, content_bytes = NULL, canonical_source_id = ?1, \
             fetch_info = ?2, fetched_at = COALESCE(fetched_at, ?3) \
             WHERE tenant_id = ?4 AND id = ?5",
            params![
                canonical_id.get(),
                fetch_info,
                now.as_unix_millis(),
                tenant.as_str(),
                source_id.get()
            ],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(())
    }

    fn mark_source_processed(
        &self,
        tenant: &TenantId,
        source_id: SourceId,
        summary: &Value,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let _ = now;
        let changed = conn
            .execute(
                "UPDATE source_documents SET status = 'processed', processed_summary = ?1 \
                 WHERE tenant_id = ?2 AND id = ?3",
                params![json_text(summary), tenant.as_str(), source_id.get()],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("source {source_id}")));
        }
        Ok(())
    }

    fn mark_source_fetch_failed(
        &self,
        tenant: &TenantId,
        source_id: SourceId,
        http_status_code: Option<u16>,
        error: &str,
        next_retry_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let _ = now;
        let changed = conn
            .execute(
                "UPDATE source_documents SET status = 'failed', \
                 attempt_count = attempt_count + 1, http_status_code = ?1, \
                 http_error_message = ?2, next_retry_at = ?3 WHERE tenant_id = ?4 AND id = ?5",
                params![
                    http_status_code,
                    error,
                    next_retry_at.map(Timestamp::as_unix_millis),
                    tenant.as_str(),
                    source_id.get()
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("source {source_id}")));
        }
        Ok(())
    }

    fn create_prospect(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        prospect: &NewProspect,
        now: Timestamp,
    ) -> Result<ProspectRecord, StoreError> {
        let conn = self.lock()?;
        let mandate: String = conn
            .query_row(
                "SELECT mandate_id FROM runs WHERE tenant_id = ?1 AND id = ?2",
                params![tenant.as_str(), run_id.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("run {run_id}")))?;
        let host = prospect.website_url.as_deref().and_then(canonical_host);
        conn.execute(
            "INSERT INTO prospects (tenant_id, run_id, mandate_id, name_raw, name_normalized, \
             website_url, website_host, hq_country, hq_city, sector, subsector, description, \
             relevance_score, evidence_score, confidence, discovered_by, review_status, \
             created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
             'new', ?17)",
            params![
                tenant.as_str(),
                run_id.get(),
                mandate,
                prospect.name_raw,
                prospect.name_normalized,
                prospect.website_url,
                host,
                prospect.hq_country,
                prospect.hq_city,
                prospect.sector,
                prospect.subsector,
                prospect.description,
                prospect.relevance_score,
                prospect.evidence_score,
                prospect.confidence,
                prospect.discovered_by.as_str(),
                now.as_unix_millis(),
            ],
        )
        .map_err(db_err)?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {PROSPECT_COLUMNS} FROM prospects WHERE id = ?1"),
            params![id],
            map_prospect,
        )
        .map_err(db_err)
    }

    fn get_prospect(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
    ) -> Result<ProspectRecord, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {PROSPECT_COLUMNS} FROM prospects WHERE tenant_id = ?1 AND id = ?2"),
            params![tenant.as_str(), prospect_id.get()],
            map_prospect,
        )
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| StoreError::NotFound(format!("prospect {prospect_id}")))
    }

    fn list_prospects(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<ProspectRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {PROSPECT_COLUMNS} FROM prospects \
                 WHERE tenant_id = ?1 AND run_id = ?2 ORDER BY id"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![tenant.as_str(), run_id.get()], map_prospect)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn find_prospect_by_name(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        name_normalized: &str,
    ) -> Result<Option<ProspectRecord>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT {PROSPECT_COLUMNS} FROM prospects \
                 WHERE tenant_id = ?1 AND run_id = ?2 AND name_normalized = ?3"
            ),
            params![tenant.as_str(), run_id.get(), name_normalized],
            map_prospect,
        )
        .optional()
        .map_err(db_err)
    }

    fn find_prospect_by_host(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        host: &str,
    ) -> Result<Option<ProspectRecord>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT {PROSPECT_COLUMNS} FROM prospects \
                 WHERE tenant_id = ?1 AND run_id = ?2 AND website_host = ?3 ORDER BY id LIMIT 1"
            ),
            params![tenant.as_str(), run_id.get(), host],
            map_prospect,
        )
        .optional()
        .map_err(db_err)
    }

    fn merge_into_prospect(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
        evidence_score: f64,
        discovered_by: DiscoveredBy,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;
        let current_text: String = tx
            .query_row(
                "SELECT discovered_by FROM prospects WHERE tenant_id = ?1 AND id = ?2",
                params![tenant.as_str(), prospect_id.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("prospect {prospect_id}")))?;
        let current = DiscoveredBy::parse(&current_text)
            .ok_or_else(|| StoreError::Corrupt("unknown discovery attribution".to_string()))?;
        let combined = current.combined_with(discovered_by);
        tx.execute(
            "UPDATE prospects SET evidence_score = MAX(evidence_score, ?1), discovered_by = ?2 \
             WHERE tenant_id = ?3 AND id = ?4",
            params![evidence_score, combined.as_str(), tenant.as_str(), prospect_id.get()],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(())
    }

    fn rewrite_prospect_references(
        &self,
        tenant: &TenantId,
        from: ProspectId,
        to: ProspectId,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;
        for (table, column) in [
            ("prospect_evidence", "prospect_id"),
            ("prospect_metrics", "prospect_id"),
            ("executives", "prospect_id"),
            ("merge_decisions", "prospect_id"),
        ] {
            tx.execute(
                &format!("UPDATE {table} SET {column} = ?1 WHERE tenant_id = ?2 AND {column} = ?3"),
                params![to.get(), tenant.as_str(), from.get()],
            )
            .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)?;
        Ok(())
    }

    fn delete_prospect(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "DELETE FROM prospects WHERE tenant_id = ?1 AND id = ?2",
                params![tenant.as_str(), prospect_id.get()],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("prospect {prospect_id}")));
        }
        Ok(())
    }

    fn set_prospect_review(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
        review_status: ReviewStatus,
        exec_search_enabled: bool,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE prospects SET review_status = ?1, exec_search_enabled = ?2 \
                 WHERE tenant_id = ?3 AND id = ?4",
                params![
                    review_status.as_str(),
                    exec_search_enabled,
                    tenant.as_str(),
                    prospect_id.get()
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("prospect {prospect_id}")));
        }
        Ok(())
    }

    fn add_prospect_evidence(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
        evidence: &NewEvidence,
        now: Timestamp,
    ) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO prospect_evidence (tenant_id, prospect_id, source_type, source_name, \
             source_url, source_document_id, source_content_hash, raw_snippet, evidence_weight, \
             created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                tenant.as_str(),
                prospect_id.get(),
                evidence.source_type,
                evidence.source_name,
                evidence.source_url,
                evidence.source_document_id.map(SourceId::get),
                evidence.source_content_hash,
                evidence.raw_snippet,
                evidence.evidence_weight,
                now.as_unix_millis(),
            ],
        )
        .map_err(db_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn list_prospect_evidence(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<ProspectEvidenceRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT e.id, e.tenant_id, e.source_type, e.source_name, e.source_url, \
             e.source_document_id, e.source_content_hash, e.raw_snippet, e.evidence_weight, \
             e.created_at, e.prospect_id \
             FROM prospect_evidence e JOIN prospects p ON e.prospect_id = p.id \
             WHERE p.tenant_id = ?1 AND p.run_id = ?2 ORDER BY e.id"
        );
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![tenant.as_str(), run_id.get()], |row| {
                let owner: i64 = row.get(10)?;
                let (owner, tenant_id, cols) = map_evidence_common(row, owner)?;
                Ok(ProspectEvidenceRecord {
                    id: cols.id,
                    tenant_id,
                    prospect_id: ProspectId::new(owner),
                    source_type: cols.source_type,
                    source_name: cols.source_name,
                    source_url: cols.source_url,
                    source_document_id: cols.source_document_id,
                    source_content_hash: cols.source_content_hash,
                    raw_snippet: cols.raw_snippet,
                    evidence_weight: cols.evidence_weight,
                    created_at: cols.created_at,
                })
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn record_metric(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        prospect_id: ProspectId,
        metric_key: &str,
        value: &MetricValue,
        as_of_year: Option<i32>,
        confidence: Option<f64>,
        source_document_id: Option<SourceId>,
        now: Timestamp,
    ) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        let value_text = serde_json::to_string(value)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        conn.execute(
            "INSERT INTO prospect_metrics (tenant_id, run_id, prospect_id, metric_key, \
             value_json, as_of_year, confidence, source_document_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                tenant.as_str(),
                run_id.get(),
                prospect_id.get(),
                metric_key,
                value_text,
                as_of_year,
                confidence,
                source_document_id.map(SourceId::get),
                now.as_unix_millis(),
            ],
        )
        .map_err(db_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn list_metrics(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<ProspectMetricRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, run_id, prospect_id, metric_key, value_json, as_of_year, \
                 confidence, source_document_id, created_at FROM prospect_metrics \
                 WHERE tenant_id = ?1 AND run_id = ?2 ORDER BY id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![tenant.as_str(), run_id.get()], |row| {
                let value_text: String = row.get(5)?;
                let value: MetricValue = serde_json::from_str(&value_text)
                    .map_err(|_| corrupt(5, "invalid metric value"))?;
                Ok(ProspectMetricRecord {
                    id: row.get(0)?,
                    tenant_id: TenantId::new(row.get::<_, String>(1)?),
                    run_id: RunId::new(row.get(2)?),
                    prospect_id: ProspectId::new(row.get(3)?),
                    metric_key: row.get(4)?,
                    value,
                    as_of_year: row.get(6)?,
                    confidence: row.get(7)?,
                    source_document_id: row.get::<_, Option<i64>>(8)?.map(SourceId::new),
                    created_at: Timestamp::from_unix_millis(row.get(9)?),
                })
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn create_executive(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        executive: &NewExecutive,
        now: Timestamp,
    ) -> Result<ExecutiveRecord, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO executives (tenant_id, run_id, prospect_id, name_raw, name_normalized, \
             title, profile_url, linkedin_url, email, confidence, discovered_by, review_status, \
             verification_status, source_label, source_document_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'new', 'unverified', ?12, \
             ?13, ?14)",
            params![
                tenant.as_str(),
                run_id.get(),
                executive.prospect_id.get(),
                executive.name_raw,
                executive.name_normalized,
                executive.title,
                executive.profile_url,
                executive.linkedin_url,
                executive.email,
                executive.confidence,
                executive.engine.attribution().as_str(),
                executive.source_label,
                executive.source_document_id.map(SourceId::get),
                now.as_unix_millis(),
            ],
        )
        .map_err(db_err)?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {EXECUTIVE_COLUMNS} FROM executives WHERE id = ?1"),
            params![id],
            map_executive,
        )
        .map_err(db_err)
    }

    fn get_executive(
        &self,
        tenant: &TenantId,
        executive_id: ExecutiveId,
    ) -> Result<ExecutiveRecord, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {EXECUTIVE_COLUMNS} FROM executives WHERE tenant_id = ?1 AND id = ?2"),
            params![tenant.as_str(), executive_id.get()],
            map_executive,
        )
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| StoreError::NotFound(format!("executive {executive_id}")))
    }

    fn list_executives(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<ExecutiveRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {EXECUTIVE_COLUMNS} FROM executives \
                 WHERE tenant_id = ?1 AND run_id = ?2 ORDER BY id"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![tenant.as_str(), run_id.get()], map_executive)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn list_executives_for_prospect(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
    ) -> Result<Vec<ExecutiveRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {EXECUTIVE_COLUMNS} FROM executives \
                 WHERE tenant_id = ?1 AND prospect_id = ?2 ORDER BY id"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![tenant.as_str(), prospect_id.get()], map_executive)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn find_executive_by_name(
        &self,
        tenant: &TenantId,
        prospect_id: ProspectId,
        name_normalized: &str,
    ) -> Result<Option<ExecutiveRecord>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT {EXECUTIVE_COLUMNS} FROM executives \
                 WHERE tenant_id = ?1 AND prospect_id = ?2 AND name_normalized = ?3 \
                 ORDER BY id LIMIT 1"
            ),
            params![tenant.as_str(), prospect_id.get(), name_normalized],
            map_executive,
        )
        .optional()
        .map_err(db_err)
    }

    fn set_executive_discovered_by(
        &self,
        tenant: &TenantId,
        executive_id: ExecutiveId,
        discovered_by: DiscoveredBy,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE executives SET discovered_by = ?1 WHERE tenant_id = ?2 AND id = ?3",
                params![discovered_by.as_str(), tenant.as_str(), executive_id.get()],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("executive {executive_id}")));
        }
        Ok(())
    }

    fn set_executive_verification(
        &self,
        tenant: &TenantId,
        executive_id: ExecutiveId,
        status: VerificationStatus,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE executives SET verification_status = ?1 WHERE tenant_id = ?2 AND id = ?3",
                params![status.as_str(), tenant.as_str(), executive_id.get()],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("executive {executive_id}")));
        }
        Ok(())
    }

    fn add_executive_evidence(
        &self,
        tenant: &TenantId,
        executive_id: ExecutiveId,
        evidence: &NewEvidence,
        now: Timestamp,
    ) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO executive_evidence (tenant_id, executive_id, source_type, source_name, \
             source_url, source_document_id, source_content_hash, raw_snippet, evidence_weight, \
             created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                tenant.as_str(),
                executive_id.get(),
                evidence.source_type,
                evidence.source_name,
                evidence.source_url,
                evidence.source_document_id.map(SourceId::get),
                evidence.source_content_hash,
                evidence.raw_snippet,
                evidence.evidence_weight,
                now.as_unix_millis(),
            ],
        )
        .map_err(db_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn list_executive_evidence(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<ExecutiveEvidenceRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = "SELECT e.id, e.tenant_id, e.source_type, e.source_name, e.source_url, \
                   e.source_document_id, e.source_content_hash, e.raw_snippet, \
                   e.evidence_weight, e.created_at, e.executive_id \
                   FROM executive_evidence e JOIN executives x ON e.executive_id = x.id \
                   WHERE x.tenant_id = ?1 AND x.run_id = ?2 ORDER BY e.id";
        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![tenant.as_str(), run_id.get()], |row| {
                let owner: i64 = row.get(10)?;
                let (owner, tenant_id, cols) = map_evidence_common(row, owner)?;
                Ok(ExecutiveEvidenceRecord {
                    id: cols.id,
                    tenant_id,
                    executive_id: ExecutiveId::new(owner),
                    source_type: cols.source_type,
                    source_name: cols.source_name,
                    source_url: cols.source_url,
                    source_document_id: cols.source_document_id,
                    source_content_hash: cols.source_content_hash,
                    raw_snippet: cols.raw_snippet,
                    evidence_weight: cols.evidence_weight,
                    created_at: cols.created_at,
                })
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn record_merge_decision(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        decision: &NewMergeDecision,
        now: Timestamp,
    ) -> Result<MergeDecisionRecord, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO merge_decisions (tenant_id, run_id, prospect_id, left_executive_id, \
             right_executive_id, decision_type, evidence, created_by, note, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                tenant.as_str(),
                run_id.get(),
                decision.prospect_id.get(),
                decision.left_executive_id.get(),
                decision.right_executive_id.get(),
                decision.decision_type.as_str(),
                json_text(&decision.evidence),
                decision.created_by,
                decision.note,
                now.as_unix_millis(),
            ],
        )
        .map_err(db_err)?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {DECISION_COLUMNS} FROM merge_decisions WHERE id = ?1"),
            params![id],
            map_decision,
        )
        .map_err(db_err)
    }

    fn list_merge_decisions(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<MergeDecisionRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {DECISION_COLUMNS} FROM merge_decisions \
                 WHERE tenant_id = ?1 AND run_id = ?2 ORDER BY id"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![tenant.as_str(), run_id.get()], map_decision)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn get_merge_decision(
        &self,
        tenant: &TenantId,
        decision_id: DecisionId,
    ) -> Result<MergeDecisionRecord, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT {DECISION_COLUMNS} FROM merge_decisions WHERE tenant_id = ?1 AND id = ?2"
            ),
            params![tenant.as_str(), decision_id.get()],
            map_decision,
        )
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| StoreError::NotFound(format!("merge decision {decision_id}")))
    }

    fn upsert_promotion(
        &self,
        tenant: &TenantId,
        canonical_executive_id: ExecutiveId,
        now: Timestamp,
    ) -> Result<(PromotionIds, bool), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;
        let existing: Option<(String, String, String)> = tx
            .query_row(
                "SELECT candidate_id, contact_id, assignment_id FROM ats_promotions \
                 WHERE tenant_id = ?1 AND executive_id = ?2",
                params![tenant.as_str(), canonical_executive_id.get()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(db_err)?;
        if let Some((candidate_id, contact_id, assignment_id)) = existing {
            tx.commit().map_err(db_err)?;
            return Ok((
                PromotionIds {
                    candidate_id,
                    contact_id,
                    assignment_id,
                },
                false,
            ));
        }

        let ids = PromotionIds {
            candidate_id: format!("cand-{canonical_executive_id}"),
            contact_id: format!("cont-{canonical_executive_id}"),
            assignment_id: format!("asgn-{canonical_executive_id}"),
        };
        tx.execute(
            "INSERT INTO ats_promotions (tenant_id, executive_id, candidate_id, contact_id, \
             assignment_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                tenant.as_str(),
                canonical_executive_id.get(),
                ids.candidate_id,
                ids.contact_id,
                ids.assignment_id,
                now.as_unix_millis(),
            ],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok((ids, true))
    }

    fn set_executive_ats_ids(
        &self,
        tenant: &TenantId,
        executive_id: ExecutiveId,
        ids: &PromotionIds,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE executives SET candidate_id = ?1, contact_id = ?2, assignment_id = ?3 \
                 WHERE tenant_id = ?4 AND id = ?5",
                params![
                    ids.candidate_id,
                    ids.contact_id,
                    ids.assignment_id,
                    tenant.as_str(),
                    executive_id.get()
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("executive {executive_id}")));
        }
        Ok(())
    }

    fn find_enrichment_in_ttl(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        provider: &str,
        purpose: &str,
        target_type: &str,
        target_id: i64,
        input_scope_hash: &str,
        ttl_ms: i64,
        now: Timestamp,
    ) -> Result<Option<EnrichmentRecord>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT {ENRICHMENT_COLUMNS} FROM enrichment_records \
                 WHERE tenant_id = ?1 AND run_id = ?2 AND provider = ?3 AND purpose = ?4 \
                   AND target_type = ?5 AND target_id = ?6 AND input_scope_hash = ?7 \
                   AND created_at >= ?8 ORDER BY id DESC LIMIT 1"
            ),
            params![
                tenant.as_str(),
                run_id.get(),
                provider,
                purpose,
                target_type,
                target_id,
                input_scope_hash,
                now.as_unix_millis().saturating_sub(ttl_ms),
            ],
            map_enrichment,
        )
        .optional()
        .map_err(db_err)
    }

    fn find_enrichment_by_hash(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        provider: &str,
        purpose: &str,
        target_type: &str,
        target_id: i64,
        input_scope_hash: &str,
        content_hash: &str,
    ) -> Result<Option<EnrichmentRecord>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT {ENRICHMENT_COLUMNS} FROM enrichment_records \
                 WHERE tenant_id = ?1 AND run_id = ?2 AND provider = ?3 AND purpose = ?4 \
                   AND target_type = ?5 AND target_id = ?6 AND input_scope_hash = ?7 \
                   AND content_hash = ?8 ORDER BY id DESC LIMIT 1"
            ),
            params![
                tenant.as_str(),
                run_id.get(),
                provider,
                purpose,
                target_type,
                target_id,
                input_scope_hash,
                content_hash,
            ],
            map_enrichment,
        )
        .optional()
        .map_err(db_err)
    }

    fn insert_enrichment(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        enrichment: &NewEnrichment,
        now: Timestamp,
    ) -> Result<EnrichmentRecord, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO enrichment_records (tenant_id, run_id, provider, purpose, target_type, \
             target_id, input_scope_hash, content_hash, status, source_document_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'stored', ?9, ?10)",
            params![
                tenant.as_str(),
                run_id.get(),
                enrichment.provider,
                enrichment.purpose,
                enrichment.target_type,
                enrichment.target_id,
                enrichment.input_scope_hash,
                enrichment.content_hash,
                enrichment.source_document_id.get(),
                now.as_unix_millis(),
            ],
        )
        .map_err(db_err)?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {ENRICHMENT_COLUMNS} FROM enrichment_records WHERE id = ?1"),
            params![id],
            map_enrichment,
        )
        .map_err(db_err)
    }

    fn insert_export_pack(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        storage_pointer: &str,
        sha256: &str,
        size_bytes: u64,
        now: Timestamp,
    ) -> Result<ExportPackRecord, StoreError> {
        let conn = self.lock()?;
        let size = i64::try_from(size_bytes)
            .map_err(|_| StoreError::Backend("pack size exceeds i64".to_string()))?;
        conn.execute(
            "INSERT INTO export_packs (tenant_id, run_id, storage_pointer, sha256, size_bytes, \
             created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                tenant.as_str(),
                run_id.get(),
                storage_pointer,
                sha256,
                size,
                now.as_unix_millis()
            ],
        )
        .map_err(db_err)?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {PACK_COLUMNS} FROM export_packs WHERE id = ?1"),
            params![id],
            map_pack,
        )
        .map_err(db_err)
    }

    fn set_export_pack_pointer(
        &self,
        tenant: &TenantId,
        pack_id: PackId,
        storage_pointer: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE export_packs SET storage_pointer = ?1 WHERE tenant_id = ?2 AND id = ?3",
                params![storage_pointer, tenant.as_str(), pack_id.get()],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("export pack {pack_id}")));
        }
        Ok(())
    }

    fn list_export_packs(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<ExportPackRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {PACK_COLUMNS} FROM export_packs \
                 WHERE tenant_id = ?1 AND run_id = ?2 ORDER BY created_at DESC, id DESC"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![tenant.as_str(), run_id.get()], map_pack)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn get_export_pack(
        &self,
        tenant: &TenantId,
        pack_id: PackId,
    ) -> Result<ExportPackRecord, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {PACK_COLUMNS} FROM export_packs WHERE tenant_id = ?1 AND id = ?2"),
            params![tenant.as_str(), pack_id.get()],
            map_pack,
        )
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| StoreError::NotFound(format!("export pack {pack_id}")))
    }

    fn record_event(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        event_type: &str,
        status: &str,
        input_json: Option<&Value>,
        output_json: Option<&Value>,
        error_message: Option<&str>,
        now: Timestamp,
    ) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO research_events (tenant_id, run_id, event_type, status, input_json, \
             output_json, error_message, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tenant.as_str(),
                run_id.get(),
                event_type,
                status,
                input_json.map(json_text),
                output_json.map(json_text),
                error_message,
                now.as_unix_millis(),
            ],
        )
        .map_err(db_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn list_events(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<EventRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM research_events \
                 WHERE tenant_id = ?1 AND run_id = ?2 ORDER BY id"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![tenant.as_str(), run_id.get()], map_event)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn count_events(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        event_type: &str,
    ) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM research_events \
                 WHERE tenant_id = ?1 AND run_id = ?2 AND event_type = ?3",
                params![tenant.as_str(), run_id.get(), event_type],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
