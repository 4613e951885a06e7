//! Backup Snapshot - Main entry point
//!
//! Creates an incremental hard-link snapshot of the given sources.

use anyhow::Context;
use backup_snapshot::executor::{RunOptions, RunOutcome, SnapshotOrchestrator, EXIT_FATAL};
use backup_snapshot::shutdown::ShutdownCoordinator;
use backup_snapshot::{utils, Config, FilesystemSemantics, ProcessTransferer, SyncCommandBuilder};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Let the sync tool report what it would do; the staging directory
    /// is removed instead of published
    #[arg(long)]
    dry_run: bool,

    /// Filesystem of the destination (overrides config, default NTFS)
    #[arg(long, value_enum, ignore_case = true)]
    target_fst: Option<FilesystemSemantics>,

    /// Source directories to back up
    #[arg(long, num_args = 1.., required = true, value_name = "PATH")]
    sources: Vec<PathBuf>,

    /// Destination root holding the snapshots; must already exist
    #[arg(long, value_name = "PATH")]
    destination: PathBuf,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Sync tool executable (overrides config)
    #[arg(long, value_name = "PROGRAM")]
    sync_program: Option<String>,

    /// Pattern excluded from the transfer, may be repeated
    #[arg(long = "exclude", value_name = "PATTERN")]
    excludes: Vec<String>,

    /// Keep only this many snapshots after a successful run
    #[arg(long, value_name = "N")]
    keep: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::from_file(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(Config::default()),
    };

    // Initialize logging
    let log_level = args
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.log.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    if let Err(e) = utils::logger::init(&log_level) {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    let code = match config.and_then(|config| apply_overrides(config, &args)) {
        Ok(config) => run(config, &args).await,
        Err(e) => {
            tracing::error!("Configuration error: {:#}", e);
            EXIT_FATAL
        }
    };

    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn apply_overrides(mut config: Config, args: &Args) -> anyhow::Result<Config> {
    if let Some(target_fst) = args.target_fst {
        config.sync.target_fst = target_fst;
    }
    if let Some(program) = &args.sync_program {
        config.sync.program = program.clone();
    }
    config.sync.excludes.extend(args.excludes.iter().cloned());
    if args.keep.is_some() {
        config.retention.keep = args.keep;
    }
    if let Some(level) = &args.log_level {
        config.log.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn run(config: Config, args: &Args) -> i32 {
    tracing::info!(
        "Starting backup-snapshot v{} (target filesystem: {}{})",
        env!("CARGO_PKG_VERSION"),
        config.sync.target_fst,
        if args.dry_run { ", dry run" } else { "" }
    );

    let shutdown = ShutdownCoordinator::new();
    let listener = shutdown.listen();

    let builder = SyncCommandBuilder::new(&config.sync.program).with_excludes(config.sync.excludes.clone());
    let orchestrator = SnapshotOrchestrator::with_cancel(ProcessTransferer, builder, shutdown.token());

    let options = RunOptions {
        sources: args.sources.clone(),
        destination: args.destination.clone(),
        semantics: config.sync.target_fst,
        dry_run: args.dry_run,
        keep: config.retention.keep,
    };

    let result = orchestrator.run(&options).await;
    listener.abort();

    match result {
        Ok(report) => {
            match &report.outcome {
                RunOutcome::Published(path) => tracing::info!("Backup complete: {}", path.display()),
                RunOutcome::Discarded => tracing::info!("Dry run complete, nothing was written"),
                RunOutcome::NothingTransferred => tracing::error!("Backup failed: no source directory could be transferred"),
                RunOutcome::LeftInPlace(path) => tracing::error!(
                    "Backup failed: {} source(s) failed, staged data left at {}",
                    report.failures(),
                    path.display()
                ),
                RunOutcome::PublishFailed(path) => tracing::error!(
                    "Backup transferred but not published, staged data left at {}",
                    path.display()
                ),
                RunOutcome::DiscardFailed(path) => tracing::error!(
                    "Could not remove {}, remove it manually",
                    path.display()
                ),
            }
            report.exit_code()
        }
        Err(e) => {
            tracing::error!("{}", e);
            EXIT_FATAL
        }
    }
}
