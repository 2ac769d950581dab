// crates/research-cli/src/main.rs
// ============================================================================
// Module: Research CLI Entry Point
// Description: Command dispatcher for runs, workers, and exports.
// Purpose: Operate the research engine from a terminal or a cron job.
// Dependencies: clap, research-config, research-orchestrator,
//               research-store-sqlite
// ============================================================================

//! ## Overview
//! The CLI builds one orchestrator from the environment configuration and a
//! SQLite store path, then dispatches a single operation per invocation:
//! create/start/cancel/retry runs, add sources, drain the queue as a worker,
//! run discovery providers, and export run packs. Results print as JSON so
//! scripts can consume them; errors map to their envelope and a non-zero
//! exit code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use research_config::EngineConfig;
use research_core::EngineError;
use research_core::MandateId;
use research_core::NewSource;
use research_core::RunSpec;
use research_core::SourceType;
use research_core::identifiers::JobId;
use research_core::identifiers::PackId;
use research_core::identifiers::RunId;
use research_core::identifiers::TenantId;
use research_core::identifiers::WorkerId;
use research_fetch::FetcherConfig;
use research_fetch::HttpFetcher;
use research_orchestrator::AcquireExtractParams;
use research_orchestrator::ExportOptions;
use research_orchestrator::Orchestrator;
use research_orchestrator::SystemClock;
use research_orchestrator::Worker;
use research_store_sqlite::SqliteStore;
use serde_json::json;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Research engine command-line interface.
#[derive(Debug, Parser)]
#[command(name = "research-engine", version, about = "Company research orchestration engine")]
struct Cli {
    /// SQLite store path.
    #[arg(long, default_value = "research.db")]
    store: PathBuf,
    /// Tenant every operation is scoped to.
    #[arg(long)]
    tenant: String,
    /// Operation to perform.
    #[command(subcommand)]
    command: Command,
}

/// Operations exposed by the CLI.
#[derive(Debug, Subcommand)]
enum Command {
    /// Create a run for a mandate.
    CreateRun {
        /// Mandate identifier.
        #[arg(long)]
        mandate: String,
        /// Run display name.
        #[arg(long)]
        name: String,
        /// Sector under research.
        #[arg(long)]
        sector: String,
        /// Run configuration JSON (seed_urls, providers, rank spec).
        #[arg(long, default_value = "{}")]
        config: String,
    },
    /// Start a planned run.
    StartRun {
        /// Run identifier.
        #[arg(long)]
        run: i64,
    },
    /// Cancel a run.
    CancelRun {
        /// Run identifier.
        #[arg(long)]
        run: i64,
    },
    /// Retry a failed or cancelled run.
    RetryRun {
        /// Run identifier.
        #[arg(long)]
        run: i64,
    },
    /// Register a URL source on a run.
    AddUrl {
        /// Run identifier.
        #[arg(long)]
        run: i64,
        /// URL to acquire.
        #[arg(long)]
        url: String,
    },
    /// Enqueue an acquire+extract job.
    Acquire {
        /// Run identifier.
        #[arg(long)]
        run: i64,
        /// Maximum URLs to fetch.
        #[arg(long, default_value_t = 0)]
        max_urls: u32,
        /// Re-select already acquired sources.
        #[arg(long)]
        force: bool,
    },
    /// Run a discovery provider.
    Discover {
        /// Run identifier.
        #[arg(long)]
        run: i64,
        /// Provider key.
        #[arg(long)]
        provider: String,
        /// Provider request JSON.
        #[arg(long, default_value = "{}")]
        request: String,
        /// Bypass the enrichment TTL.
        #[arg(long)]
        force: bool,
    },
    /// Drain the job queue as a worker.
    Work {
        /// Worker identity for leases.
        #[arg(long, default_value = "cli-worker")]
        worker_id: String,
    },
    /// Show a job.
    Job {
        /// Job identifier.
        #[arg(long)]
        job: i64,
    },
    /// Export a run pack.
    Export {
        /// Run identifier.
        #[arg(long)]
        run: i64,
        /// Include the HTML print view.
        #[arg(long)]
        print_view: bool,
    },
    /// List the export packs of a run.
    Packs {
        /// Run identifier.
        #[arg(long)]
        run: i64,
    },
    /// Write the evidence bundle of a run to a file.
    Evidence {
        /// Run identifier.
        #[arg(long)]
        run: i64,
        /// Output path for the bundle.
        #[arg(long)]
        out: PathBuf,
    },
    /// Verify and re-read a stored export pack.
    Download {
        /// Pack identifier.
        #[arg(long)]
        pack: i64,
        /// Output path for the archive.
        #[arg(long)]
        out: PathBuf,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let envelope = err.envelope();
            let rendered = serde_json::to_string_pretty(&envelope)
                .unwrap_or_else(|_| err.to_string());
            let _ = writeln!(std::io::stderr(), "{rendered}");
            ExitCode::FAILURE
        }
    }
}

/// Builds the orchestrator and dispatches one command.
fn run(cli: Cli) -> Result<(), EngineError> {
    let config = EngineConfig::from_env()
        .map_err(|err| EngineError::Validation(err.to_string()))?;
    let store = SqliteStore::open(&cli.store)
        .map_err(|err| EngineError::Store(err.to_string()))?;
    let fetcher = HttpFetcher::new(FetcherConfig::default())
        .map_err(|err| EngineError::Io(err.to_string()))?;
    let orchestrator = Orchestrator::new(store, fetcher, SystemClock, config);
    let tenant = TenantId::new(cli.tenant);

    match cli.command {
        Command::CreateRun {
            mandate,
            name,
            sector,
            config,
        } => {
            let config = serde_json::from_str(&config)
                .map_err(|err| EngineError::Validation(format!("run config: {err}")))?;
            let run = orchestrator.create_run(
                &tenant,
                &RunSpec {
                    mandate_id: MandateId::new(mandate),
                    name,
                    description: None,
                    sector,
                    region_scope: Vec::new(),
                    config,
                    created_by: None,
                },
            )?;
            emit(&json!({ "run_id": run.id, "status": run.status }))
        }
        Command::StartRun { run } => {
            let outcome = orchestrator.start_run(&tenant, RunId::new(run))?;
            emit(&serde_json::to_value(outcome).unwrap_or_default())
        }
        Command::CancelRun { run } => {
            let outcome = orchestrator.cancel_run(&tenant, RunId::new(run))?;
            emit(&serde_json::to_value(outcome).unwrap_or_default())
        }
        Command::RetryRun { run } => {
            let outcome = orchestrator.retry_run(&tenant, RunId::new(run))?;
            emit(&serde_json::to_value(outcome).unwrap_or_default())
        }
        Command::AddUrl { run, url } => {
            let source = orchestrator.add_source(
                &tenant,
                RunId::new(run),
                &NewSource {
                    source_type: SourceType::Url,
                    title: Some(url.clone()),
                    url: Some(url),
                    provider: None,
                    content_text: None,
                    content_bytes: None,
                    mime_type: None,
                    max_attempts: 0,
                },
            )?;
            emit(&json!({ "source_id": source.id, "status": source.status }))
        }
        Command::Acquire {
            run,
            max_urls,
            force,
        } => {
            let outcome = orchestrator.enqueue_acquire_extract(
                &tenant,
                RunId::new(run),
                &AcquireExtractParams { max_urls, force },
            )?;
            emit(&serde_json::to_value(outcome).unwrap_or_default())
        }
        Command::Discover {
            run,
            provider,
            request,
            force,
        } => {
            let request = serde_json::from_str(&request)
                .map_err(|err| EngineError::Validation(format!("provider request: {err}")))?;
            let outcome = orchestrator.run_discovery_provider(
                &tenant,
                RunId::new(run),
                &provider,
                &request,
                force,
            )?;
            emit(&serde_json::to_value(outcome).unwrap_or_default())
        }
        Command::Work { worker_id } => {
            let worker = Worker::new(&orchestrator, WorkerId::new(worker_id));
            let processed = worker.run_until_idle()?;
            emit(&json!({ "processed": processed }))
        }
        Command::Job { job } => {
            let status = orchestrator.get_job_status(&tenant, JobId::new(job))?;
            emit(&serde_json::to_value(status).unwrap_or_default())
        }
        Command::Export { run, print_view } => {
            let pack = orchestrator.export_run_pack(
                &tenant,
                RunId::new(run),
                &ExportOptions {
                    include_print_view: print_view,
                    max_zip_bytes: None,
                },
            )?;
            emit(&serde_json::to_value(pack).unwrap_or_default())
        }
        Command::Packs { run } => {
            let packs = orchestrator.list_export_packs(&tenant, RunId::new(run))?;
            emit(&serde_json::to_value(packs).unwrap_or_default())
        }
        Command::Evidence { run, out } => {
            let bytes = orchestrator.build_evidence_bundle(&tenant, RunId::new(run))?;
            std::fs::write(&out, &bytes).map_err(|err| EngineError::Io(err.to_string()))?;
            emit(&json!({ "path": out, "size_bytes": bytes.len() }))
        }
        Command::Download { pack, out } => {
            let bytes = orchestrator.download_export_pack(&tenant, PackId::new(pack))?;
            std::fs::write(&out, &bytes).map_err(|err| EngineError::Io(err.to_string()))?;
            emit(&json!({ "path": out, "size_bytes": bytes.len() }))
        }
    }
}

/// Prints a JSON result to stdout.
fn emit(value: &serde_json::Value) -> Result<(), EngineError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| EngineError::Io(err.to_string()))?;
    writeln!(std::io::stdout(), "{rendered}").map_err(|err| EngineError::Io(err.to_string()))
}
