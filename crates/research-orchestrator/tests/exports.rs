// crates/research-orchestrator/tests/exports.rs
// ============================================================================
// Module: Export Tests
// Description: Determinism, size caps, and evidence bundle integrity.
// ============================================================================
//! ## Overview
//! Validates byte-identical run packs with registry-matching hashes and
//! alphabetical archive ordering, the size-cap envelope, download
//! verification, and the evidence bundle manifest contract.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::io::Read;

use common::Harness;
use common::empty_config;
use research_config::EngineConfig;
use research_core::DEFAULT_HASH_ALGORITHM;
use research_core::EngineError;
use research_core::hash_bytes;
use research_core::identifiers::RunId;
use research_orchestrator::AcquireExtractParams;
use research_orchestrator::ExportOptions;
use serde_json::Value;
use serde_json::json;

/// Builds a run with prospects, executives, and a merge decision.
fn seeded_run(harness: &Harness) -> RunId {
    let tenant = harness.tenant();
    let run_id = harness.create_run(empty_config());
    let _ = harness.add_text_source(run_id, "Helio Labs Ltd\nAtlas Robotics GmbH\n");
    harness
        .orchestrator
        .acquire_extract(
            &tenant,
            run_id,
            &AcquireExtractParams {
                max_urls: 10,
                force: false,
            },
            None,
        )
        .unwrap();
    harness
        .orchestrator
        .run_discovery_provider(&tenant, run_id, "deterministic", &json!({}), false)
        .unwrap();
    run_id
}

// ============================================================================
// SECTION: Run Pack Determinism
// ============================================================================

/// Tests two consecutive exports are byte-identical with matching hashes.
#[test]
fn test_export_is_byte_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        export_pack_storage_root: dir.path().to_path_buf(),
        ..EngineConfig::default()
    };
    let harness = Harness::with_config(config);
    let tenant = harness.tenant();
    let run_id = seeded_run(&harness);

    let options = ExportOptions::default();
    let first = harness.orchestrator.export_run_pack(&tenant, run_id, &options).unwrap();
    harness.clock.advance_millis(60_000);
    let second = harness.orchestrator.export_run_pack(&tenant, run_id, &options).unwrap();

    assert_eq!(first.sha256, second.sha256);
    let first_bytes = harness.orchestrator.download_export_pack(&tenant, first.id).unwrap();
    let second_bytes = harness.orchestrator.download_export_pack(&tenant, second.id).unwrap();
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(hash_bytes(DEFAULT_HASH_ALGORITHM, &first_bytes).hex(), first.sha256);

    // Archive entries are alphabetical.
    let reader = std::io::Cursor::new(first_bytes);
    let archive = zip::ZipArchive::new(reader).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
    assert!(names.contains(&"run_pack.json"));
    assert!(names.contains(&"companies.csv"));
    assert!(names.contains(&"executive_resolution_map.csv"));

    // The registry lists newest first.
    let packs = harness.orchestrator.list_export_packs(&tenant, run_id).unwrap();
    assert_eq!(packs.len(), 2);
    assert_eq!(packs[0].id, second.id);

    // Storage pointers are relative and traversal-free.
    assert!(first.storage_pointer.starts_with("company_research/"));
    assert!(!first.storage_pointer.contains(".."));
}

/// Tests the pinned generated_at sentinel inside run_pack.json.
#[test]
fn test_export_pins_generated_at() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        export_pack_storage_root: dir.path().to_path_buf(),
        ..EngineConfig::default()
    };
    let harness = Harness::with_config(config);
    let tenant = harness.tenant();
    let run_id = seeded_run(&harness);

    let pack = harness
        .orchestrator
        .export_run_pack(&tenant, run_id, &ExportOptions::default())
        .unwrap();
    let bytes = harness.orchestrator.download_export_pack(&tenant, pack.id).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut run_pack = String::new();
    archive.by_name("run_pack.json").unwrap().read_to_string(&mut run_pack).unwrap();
    let parsed: Value = serde_json::from_str(&run_pack).unwrap();
    assert_eq!(parsed["generated_at"], json!("1970-01-01T00:00:00Z"));
}

// ============================================================================
// SECTION: Size Cap
// ============================================================================

/// Tests the size-cap envelope carries the lowered cap.
#[test]
fn test_export_size_cap_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        export_pack_storage_root: dir.path().to_path_buf(),
        ..EngineConfig::default()
    };
    let harness = Harness::with_config(config);
    let tenant = harness.tenant();
    let run_id = seeded_run(&harness);

    let err = harness
        .orchestrator
        .export_run_pack(
            &tenant,
            run_id,
            &ExportOptions {
                include_print_view: false,
                max_zip_bytes: Some(16),
            },
        )
        .unwrap_err();
    let envelope = err.envelope();
    assert_eq!(envelope.error.code, "EXPORT_ZIP_TOO_LARGE");
    assert_eq!(envelope.error.details["max_zip_bytes"], json!(16));

    // Nothing was registered.
    assert!(harness.orchestrator.list_export_packs(&tenant, run_id).unwrap().is_empty());
}

// ============================================================================
// SECTION: Evidence Bundle
// ============================================================================

/// Tests manifest hashes cover every file and the side file seals it.
#[test]
fn test_evidence_bundle_manifest_integrity() {
    let harness = Harness::new();
    let tenant = harness.tenant();
    let run_id = seeded_run(&harness);

    let first = harness.orchestrator.build_evidence_bundle(&tenant, run_id).unwrap();
    let second = harness.orchestrator.build_evidence_bundle(&tenant, run_id).unwrap();
    assert_eq!(first, second);

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(first)).unwrap();
    let mut manifest_bytes = Vec::new();
    archive.by_name("MANIFEST.json").unwrap().read_to_end(&mut manifest_bytes).unwrap();
    let mut side = String::new();
    archive.by_name("MANIFEST.sha256").unwrap().read_to_string(&mut side).unwrap();
    let manifest_digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &manifest_bytes);
    assert_eq!(side.trim(), format!("SHA256(MANIFEST.json)={}", manifest_digest.hex()));

    let manifest: Value = serde_json::from_slice(&manifest_bytes).unwrap();
    let files = manifest["files"].as_array().unwrap();
    assert!(!files.is_empty());
    for entry in files {
        let name = entry["file_name"].as_str().unwrap();
        let mut bytes = Vec::new();
        archive.by_name(name).unwrap().read_to_end(&mut bytes).unwrap();
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes);
        assert_eq!(entry["sha256"].as_str().unwrap(), digest.hex());
        assert_eq!(entry["size_bytes"].as_u64().unwrap(), bytes.len() as u64);
    }

    // Provider envelopes (non-fetched sources) are included.
    assert!(files.iter().any(|entry| {
        entry["file_name"].as_str().is_some_and(|name| name.ends_with(".json"))
    }));
}

/// Tests the evidence bundle honors its size cap.
#[test]
fn test_evidence_bundle_size_cap() {
    let config = EngineConfig {
        evidence_bundle_max_zip_bytes: 32,
        ..EngineConfig::default()
    };
    let harness = Harness::with_config(config);
    let tenant = harness.tenant();
    let run_id = seeded_run(&harness);

    let err = harness.orchestrator.build_evidence_bundle(&tenant, run_id).unwrap_err();
    match err {
        EngineError::LimitExceeded { code, details, .. } => {
            assert_eq!(code, "EVIDENCE_ZIP_TOO_LARGE");
            assert_eq!(details["max_zip_bytes"], json!(32));
        }
        other => panic!("unexpected error: {other}"),
    }
}
