// crates/research-orchestrator/src/export.rs
// ============================================================================
// Module: Export Pack Builder
// Description: Deterministic run-pack archives with a verifying registry.
// Purpose: Produce byte-identical ZIPs for identical run state.
// Dependencies: csv, research-core, sha2, zip
// ============================================================================

//! ## Overview
//! Determinism is the contract: the snapshot reads every table through one
//! store, rows render in fixed column order sorted by stable keys, JSON
//! serializes with sorted keys, `generated_at` is pinned to a fixed sentinel,
//! and the archive packs entries alphabetically with deflate and zeroed
//! timestamps. Two builds over the same run state are byte-identical, the
//! SHA-256 in the registry matches the bytes on disk, and download re-reads
//! verify the hash before returning.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Cursor;
use std::io::Write;

use research_core::EngineError;
use research_core::ExecutiveRecord;
use research_core::ExportPackRecord;
use research_core::hash_bytes;
use research_core::identifiers::PackId;
use research_core::identifiers::RunId;
use research_core::identifiers::TenantId;
use research_core::interfaces::Clock;
use research_core::interfaces::ContentFetcher;
use research_core::interfaces::ResearchStore;
use research_core::validate_storage_pointer;
use research_core::DEFAULT_HASH_ALGORITHM;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::execs::build_forest;
use crate::service::Orchestrator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Sentinel written as `generated_at` so archives stay byte-identical.
pub const GENERATED_AT_SENTINEL: &str = "1970-01-01T00:00:00Z";
/// Stable error code for oversized archives.
pub const EXPORT_ZIP_TOO_LARGE: &str = "EXPORT_ZIP_TOO_LARGE";

// ============================================================================
// SECTION: Options
// ============================================================================

/// Options for one export call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Render the optional HTML print view.
    #[serde(default)]
    pub include_print_view: bool,
    /// Override of the configured archive size cap.
    #[serde(default)]
    pub max_zip_bytes: Option<u64>,
}

// ============================================================================
// SECTION: Operations
// ============================================================================

impl<S, F, C> Orchestrator<S, F, C>
where
    S: ResearchStore,
    F: ContentFetcher,
    C: Clock,
{
    /// Builds, stores, and registers a run pack.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LimitExceeded`] with code
    /// [`EXPORT_ZIP_TOO_LARGE`] when the archive exceeds the cap.
    pub fn export_run_pack(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        options: &ExportOptions,
    ) -> Result<ExportPackRecord, EngineError> {
        let bytes = self.render_run_pack(tenant, run_id, options)?;

        let cap = options.max_zip_bytes.unwrap_or(self.config.export_pack_max_zip_bytes);
        if bytes.len() as u64 > cap {
            return Err(EngineError::LimitExceeded {
                code: EXPORT_ZIP_TOO_LARGE.to_string(),
                message: format!("run pack exceeds {cap} bytes"),
                details: json!({ "max_zip_bytes": cap }),
            });
        }

        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes);
        let now = self.clock.now();
        let record = self.store.insert_export_pack(
            tenant,
            run_id,
            "pending",
            digest.hex(),
            bytes.len() as u64,
            now,
        )?;
        let pointer =
            format!("company_research/{tenant}/runs/{run_id}/{}.zip", record.id);
        validate_storage_pointer(&pointer)
            .map_err(|err| EngineError::Validation(err.to_string()))?;
        self.store.set_export_pack_pointer(tenant, record.id, &pointer)?;

        let path = self.config.export_pack_storage_root.join(&pointer);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| EngineError::Io(err.to_string()))?;
        }
        std::fs::write(&path, &bytes).map_err(|err| EngineError::Io(err.to_string()))?;

        self.store.get_export_pack(tenant, record.id).map_err(EngineError::from)
    }

    /// Lists the packs of a run, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on store failure.
    pub fn list_export_packs(
        &self,
        tenant: &TenantId,
        run_id: RunId,
    ) -> Result<Vec<ExportPackRecord>, EngineError> {
        Ok(self.store.list_export_packs(tenant, run_id)?)
    }

    /// Re-reads a stored pack, verifying its hash against the registry.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Conflict`] when the stored bytes no longer
    /// match the registered hash.
    pub fn download_export_pack(
        &self,
        tenant: &TenantId,
        pack_id: PackId,
    ) -> Result<Vec<u8>, EngineError> {
        let record = self.store.get_export_pack(tenant, pack_id)?;
        let path = self.config.export_pack_storage_root.join(&record.storage_pointer);
        let bytes = std::fs::read(&path).map_err(|err| EngineError::Io(err.to_string()))?;
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes);
        if digest.hex() != record.sha256 {
            return Err(EngineError::Conflict(format!(
                "pack {pack_id} bytes do not match the registered hash"
            )));
        }
        Ok(bytes)
    }

    /// Renders the archive bytes for a run.
    fn render_run_pack(
        &self,
        tenant: &TenantId,
        run_id: RunId,
        options: &ExportOptions,
    ) -> Result<Vec<u8>, EngineError> {
        // One consistent snapshot: every table read through the same store
        // before any rendering begins.
        let run = self.store.get_run(tenant, run_id)?;
        let mut prospects = self.store.list_prospects(tenant, run_id)?;
        let mut executives = self.store.list_executives(tenant, run_id)?;
        let decisions = self.store.list_merge_decisions(tenant, run_id)?;
        let metrics = self.store.list_metrics(tenant, run_id)?;
        let events = self.store.list_events(tenant, run_id)?;
        prospects.sort_by_key(|p| p.id);
        executives.sort_by(|a, b| (a.prospect_id, a.id).cmp(&(b.prospect_id, b.id)));

        let mut forest = build_forest(&executives, &decisions)?;
        let resolution = forest.resolution_map();

        let run_pack = json!({
            "generated_at": GENERATED_AT_SENTINEL,
            "run": {
                "id": run.id,
                "tenant_id": run.tenant_id,
                "mandate_id": run.mandate_id,
                "name": run.name,
                "sector": run.sector,
                "region_scope": run.region_scope,
                "status": run.status,
                "summary": run.summary,
            },
            "counts": {
                "prospects": prospects.len(),
                "executives": executives.len(),
                "merge_decisions": decisions.len(),
                "metrics": metrics.len(),
                "events": events.len(),
            },
        });
        let run_pack_bytes = serde_json::to_vec_pretty(&run_pack)
            .map_err(|err| EngineError::Io(err.to_string()))?;

        let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
        entries.push(("run_pack.json".to_string(), run_pack_bytes));
        entries.push(("companies.csv".to_string(), render_companies_csv(&prospects)?));
        entries.push(("executives.csv".to_string(), render_executives_csv(&executives)?));

        let canonical_ids: std::collections::BTreeSet<_> =
            resolution.iter().map(|(_, canonical)| *canonical).collect();
        let canonical_rows: Vec<ExecutiveRecord> = executives
            .iter()
            .filter(|executive| canonical_ids.contains(&executive.id))
            .cloned()
            .collect();
        entries.push((
            "canonical_executives.csv".to_string(),
            render_executives_csv(&canonical_rows)?,
        ));

        let mut resolution_csv = csv_writer();
        write_record(&mut resolution_csv, &["requested_id", "canonical_id"])?;
        for (requested, canonical) in &resolution {
            write_record(&mut resolution_csv, &[&requested.to_string(), &canonical.to_string()])?;
        }
        entries.push(("executive_resolution_map.csv".to_string(), finish_csv(resolution_csv)?));

        let mut decisions_csv = csv_writer();
        write_record(
            &mut decisions_csv,
            &[
                "id",
                "company_prospect_id",
                "left_executive_id",
                "right_executive_id",
                "decision_type",
                "created_by",
                "note",
                "created_at",
            ],
        )?;
        for decision in &decisions {
            write_record(
                &mut decisions_csv,
                &[
                    &decision.id.to_string(),
                    &decision.prospect_id.to_string(),
                    &decision.left_executive_id.to_string(),
                    &decision.right_executive_id.to_string(),
                    decision.decision_type.as_str(),
                    decision.created_by.as_deref().unwrap_or(""),
                    decision.note.as_deref().unwrap_or(""),
                    &decision.created_at.to_string(),
                ],
            )?;
        }
        entries.push(("merge_decisions.csv".to_string(), finish_csv(decisions_csv)?));

        let mut exec_decisions_csv = csv_writer();
        write_record(
            &mut exec_decisions_csv,
            &["executive_id", "company_prospect_id", "review_status", "verification_status"],
        )?;
        for executive in &executives {
            write_record(
                &mut exec_decisions_csv,
                &[
                    &executive.id.to_string(),
                    &executive.prospect_id.to_string(),
                    executive.review_status.as_str(),
                    executive.verification_status.as_str(),
                ],
            )?;
        }
        entries.push(("executive_decisions.csv".to_string(), finish_csv(exec_decisions_csv)?));

        let mut audit_csv = csv_writer();
        write_record(&mut audit_csv, &["event_type", "count"])?;
        let mut counts: std::collections::BTreeMap<&str, u64> = std::collections::BTreeMap::new();
        for event in &events {
            *counts.entry(event.event_type.as_str()).or_insert(0) += 1;
        }
        for (event_type, count) in counts {
            write_record(&mut audit_csv, &[event_type, &count.to_string()])?;
        }
        entries.push(("audit_summary.csv".to_string(), finish_csv(audit_csv)?));

        if options.include_print_view {
            entries.push(("print_view.html".to_string(), render_print_view(&run, &prospects)));
        }

        write_deterministic_zip(entries)
    }
}

// ============================================================================
// SECTION: Rendering Helpers
// ============================================================================

/// Creates a CSV writer over an in-memory buffer with LF line endings.
fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

/// Writes one CSV record.
fn write_record(writer: &mut csv::Writer<Vec<u8>>, fields: &[&str]) -> Result<(), EngineError> {
    writer.write_record(fields).map_err(|err| EngineError::Io(err.to_string()))
}

/// Finishes a CSV writer into bytes.
fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, EngineError> {
    writer.into_inner().map_err(|err| EngineError::Io(err.to_string()))
}

/// Renders the prospect table.
fn render_companies_csv(
    prospects: &[research_core::ProspectRecord],
) -> Result<Vec<u8>, EngineError> {
    let mut writer = csv_writer();
    write_record(
        &mut writer,
        &[
            "id",
            "name_raw",
            "name_normalized",
            "website_url",
            "hq_country",
            "hq_city",
            "sector",
            "subsector",
            "relevance_score",
            "evidence_score",
            "confidence",
            "discovered_by",
            "review_status",
            "exec_search_enabled",
        ],
    )?;
    for prospect in prospects {
        write_record(
            &mut writer,
            &[
                &prospect.id.to_string(),
                &prospect.name_raw,
                &prospect.name_normalized,
                prospect.website_url.as_deref().unwrap_or(""),
                prospect.hq_country.as_deref().unwrap_or(""),
                prospect.hq_city.as_deref().unwrap_or(""),
                &prospect.sector,
                prospect.subsector.as_deref().unwrap_or(""),
                &prospect.relevance_score.to_string(),
                &prospect.evidence_score.to_string(),
                &prospect.confidence.to_string(),
                prospect.discovered_by.as_str(),
                prospect.review_status.as_str(),
                &prospect.exec_search_enabled.to_string(),
            ],
        )?;
    }
    finish_csv(writer)
}

/// Renders an executive table.
fn render_executives_csv(executives: &[ExecutiveRecord]) -> Result<Vec<u8>, EngineError> {
    let mut writer = csv_writer();
    write_record(
        &mut writer,
        &[
            "id",
            "company_prospect_id",
            "name_raw",
            "name_normalized",
            "title",
            "linkedin_url",
            "profile_url",
            "email",
            "confidence",
            "discovered_by",
            "verification_status",
            "candidate_id",
            "contact_id",
            "assignment_id",
        ],
    )?;
    for executive in executives {
        write_record(
            &mut writer,
            &[
                &executive.id.to_string(),
                &executive.prospect_id.to_string(),
                &executive.name_raw,
                &executive.name_normalized,
                executive.title.as_deref().unwrap_or(""),
                executive.linkedin_url.as_deref().unwrap_or(""),
                executive.profile_url.as_deref().unwrap_or(""),
                executive.email.as_deref().unwrap_or(""),
                &executive.confidence.to_string(),
                executive.discovered_by.as_str(),
                executive.verification_status.as_str(),
                executive.candidate_id.as_deref().unwrap_or(""),
                executive.contact_id.as_deref().unwrap_or(""),
                executive.assignment_id.as_deref().unwrap_or(""),
            ],
        )?;
    }
    finish_csv(writer)
}

/// Renders the optional print view.
fn render_print_view(
    run: &research_core::RunRecord,
    prospects: &[research_core::ProspectRecord],
) -> Vec<u8> {
    let mut html = String::new();
    html.push_str("<!doctype html>\n<html><head><meta charset=\"utf-8\">");
    html.push_str(&format!("<title>{}</title></head><body>\n", run.name));
    html.push_str(&format!("<h1>{}</h1>\n<table>\n", run.name));
    html.push_str("<tr><th>Name</th><th>Sector</th><th>Review</th></tr>\n");
    for prospect in prospects {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            prospect.name_raw,
            prospect.sector,
            prospect.review_status.as_str()
        ));
    }
    html.push_str("</table>\n</body></html>\n");
    html.into_bytes()
}

// ============================================================================
// SECTION: Deterministic ZIP
// ============================================================================

/// Packs entries alphabetically with deflate and zeroed timestamps.
pub(crate) fn write_deterministic_zip(
    mut entries: Vec<(String, Vec<u8>)>,
) -> Result<Vec<u8>, EngineError> {
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());
    for (name, bytes) in entries {
        writer
            .start_file(name, options)
            .map_err(|err| EngineError::Io(err.to_string()))?;
        writer.write_all(&bytes).map_err(|err| EngineError::Io(err.to_string()))?;
    }
    let cursor = writer.finish().map_err(|err| EngineError::Io(err.to_string()))?;
    Ok(cursor.into_inner())
}
