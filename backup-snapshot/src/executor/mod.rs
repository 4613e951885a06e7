//! Snapshot executor - Orchestrates one backup run.
//!
//! A run goes through these steps:
//! - validate the destination root and scan its snapshots
//! - plan the new snapshot (name, link reference, thoroughness)
//! - stage every source into a fresh temporary directory via the sync tool
//! - publish the staging directory by renaming it, discard it after a dry
//!   run, or leave it in place when anything failed

pub mod meta;
pub mod plan;
pub mod retention;
pub mod staging;

use crate::catalog::{validate_destination, BackupCatalog};
use crate::fs::source::{normalize_source, staged_name};
use crate::fs::walker::{tree_stats, TreeStats};
use crate::sync::{FilesystemSemantics, SyncCommand, SyncCommandBuilder, SyncOptions, Transferer};
use crate::utils::format::{format_bytes, format_duration};
use crate::utils::{Result, SnapshotError};
use chrono::{Local, NaiveDateTime};
use meta::{host_name, MetaSource, SnapshotMeta};
use plan::SnapshotPlan;
use staging::StagingDir;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Snapshot published, or dry run cleaned up.
pub const EXIT_OK: i32 = 0;
/// Invalid destination, unusable config, staging not created.
pub const EXIT_FATAL: i32 = 1;
/// A transfer failed, the run was interrupted, or nothing was transferred.
pub const EXIT_SOURCE_FAILURE: i32 = 3;
/// Transfers succeeded but publishing or cleanup did not.
pub const EXIT_POST_TRANSFER: i32 = 4;

/// What to back up and where.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub sources: Vec<PathBuf>,
    pub destination: PathBuf,
    pub semantics: FilesystemSemantics,
    pub dry_run: bool,

    /// Snapshots to retain after a successful publish (None = all)
    pub keep: Option<usize>,
}

/// Per-source result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// Sync tool exited with 0
    Transferred,
    /// Sync tool failed or could not be started
    Failed(String),
    /// Not an existing directory
    NotADirectory,
    /// No last path component to stage it under
    Unnamed,
    /// An earlier source already used the same staged name
    DuplicateName,
    /// Not run because an earlier source failed
    SkippedAfterFailure,
    /// Not run because shutdown was requested
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: PathBuf,
    pub staged_name: Option<OsString>,
    pub command: Option<SyncCommand>,
    pub status: SourceStatus,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Staging renamed to the snapshot path
    Published(PathBuf),
    /// Dry run finished and staging was removed
    Discarded,
    /// Nothing could be transferred; staging was removed
    NothingTransferred,
    /// A source failed; staging left at this path for the operator
    LeftInPlace(PathBuf),
    /// Rename failed; staged tree still at this path
    PublishFailed(PathBuf),
    /// Removal failed; directory still at this path
    DiscardFailed(PathBuf),
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub plan: SnapshotPlan,
    pub sources: Vec<SourceReport>,
    pub outcome: RunOutcome,
    pub stats: Option<TreeStats>,
    pub pruned: usize,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.sources.iter().filter(|s| s.status.is_failure()).count()
    }

    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            RunOutcome::Published(_) | RunOutcome::Discarded => EXIT_OK,
            RunOutcome::NothingTransferred | RunOutcome::LeftInPlace(_) => EXIT_SOURCE_FAILURE,
            RunOutcome::PublishFailed(_) | RunOutcome::DiscardFailed(_) => EXIT_POST_TRANSFER,
        }
    }
}

impl SourceStatus {
    fn is_failure(&self) -> bool {
        matches!(self, SourceStatus::Failed(_) | SourceStatus::Interrupted)
    }

    fn was_attempted(&self) -> bool {
        matches!(self, SourceStatus::Transferred | SourceStatus::Failed(_))
    }
}

/// Main snapshot driver
pub struct SnapshotOrchestrator<T> {
    transferer: T,
    builder: SyncCommandBuilder,
    cancel_token: CancellationToken,
}

impl<T: Transferer> SnapshotOrchestrator<T> {
    /// Create a new orchestrator (no cancellation support)
    pub fn new(transferer: T, builder: SyncCommandBuilder) -> Self {
        Self::with_cancel(transferer, builder, CancellationToken::new())
    }

    /// Create a new orchestrator that stops between sources once
    /// `cancel_token` is cancelled
    pub fn with_cancel(transferer: T, builder: SyncCommandBuilder, cancel_token: CancellationToken) -> Self {
        Self {
            transferer,
            builder,
            cancel_token,
        }
    }

    /// Run a backup stamped with the current local time.
    pub async fn run(&self, options: &RunOptions) -> Result<RunReport> {
        self.run_at(options, Local::now().naive_local()).await
    }

    /// Run a backup stamped with `now`.
    ///
    /// `Err` is returned only for fatal errors, before anything was written.
    /// Every later failure is reported through [`RunReport::outcome`].
    pub async fn run_at(&self, options: &RunOptions, now: NaiveDateTime) -> Result<RunReport> {
        debug!(destination = %options.destination.display(), "Destination backup directory");
        let root = validate_destination(&options.destination)?;

        let catalog = BackupCatalog::scan(&root)?;
        let plan = SnapshotPlan::compute(&root, &catalog, now);

        let span = info_span!("snapshot", id = %plan.snapshot_name);
        self.execute_plan(options, plan).instrument(span).await
    }

    async fn execute_plan(&self, options: &RunOptions, plan: SnapshotPlan) -> Result<RunReport> {
        debug!(path = %plan.snapshot_path.display(), "Destination directory");
        if plan.snapshot_path.exists() {
            return Err(SnapshotError::SnapshotExists(plan.snapshot_path.clone()));
        }

        match &plan.reference {
            Some(last) => {
                info!("Last backup was {}", last);
                info!("Create backup at {} relative to {}.", plan.snapshot_path.display(), last.path.display());
            }
            None => info!("No backups existing yet."),
        }
        if plan.thorough {
            info!("First backup of the month, comparing file contents by checksum");
        }
        info!(path = %plan.log_file.display(), "Log to");

        let started = Instant::now();
        let staging = StagingDir::create(&plan.root)?;
        let sources = self.transfer_sources(options, &plan, staging.path()).await;

        let failures = sources.iter().filter(|s| s.status.is_failure()).count();
        let attempted = sources.iter().filter(|s| s.status.was_attempted()).count();
        let transferred = sources
            .iter()
            .filter(|s| s.status == SourceStatus::Transferred)
            .count();

        let mut report = RunReport {
            plan,
            sources,
            outcome: RunOutcome::Discarded,
            stats: None,
            pruned: 0,
        };

        if failures > 0 {
            let kept = staging.keep();
            error!(
                "Errors during backup. Stop backup. Manually remove temporary dir {}",
                kept.display()
            );
            report.outcome = RunOutcome::LeftInPlace(kept);
        } else if options.dry_run || attempted == 0 {
            if !options.dry_run {
                warn!("No source directory was transferred, nothing to publish");
            }
            let staged_path = staging.path().to_path_buf();
            report.outcome = match staging.discard() {
                Ok(()) if options.dry_run => RunOutcome::Discarded,
                Ok(()) => RunOutcome::NothingTransferred,
                Err(e) => {
                    error!("{}. Remove manually.", e);
                    RunOutcome::DiscardFailed(staged_path)
                }
            };
        } else {
            report.stats = self.finalize(&report, options, staging.path());
            report.outcome = match staging.publish(&report.plan.snapshot_path) {
                Ok(published) => {
                    info!(path = %published.display(), "Snapshot published");
                    RunOutcome::Published(published)
                }
                Err(SnapshotError::Publish { staging, source, .. }) => {
                    error!("Renaming failed with {}", source);
                    RunOutcome::PublishFailed(staging)
                }
                Err(e) => return Err(e),
            };

            if let (RunOutcome::Published(_), Some(keep)) = (&report.outcome, options.keep) {
                report.pruned = match retention::prune(&report.plan.root, keep) {
                    Ok(n) => n,
                    Err(e) => {
                        error!("Failed to prune old snapshots: {}", e);
                        0
                    }
                };
            }
        }

        info!(
            "Run finished after {}: {} of {} sources transferred, {} failed",
            format_duration(started.elapsed().as_secs()),
            transferred,
            report.sources.len(),
            failures
        );

        Ok(report)
    }

    /// Stage each source in order. Stops running the sync tool after the
    /// first failure but still reports every source.
    async fn transfer_sources(&self, options: &RunOptions, plan: &SnapshotPlan, staging: &Path) -> Vec<SourceReport> {
        let mut reports = Vec::with_capacity(options.sources.len());
        let mut used_names: HashSet<OsString> = HashSet::new();
        let mut failed = false;

        for source in &options.sources {
            let mut report = SourceReport {
                source: source.clone(),
                staged_name: None,
                command: None,
                status: SourceStatus::NotADirectory,
            };

            if !source.is_dir() {
                warn!("{} is not a directory. Skip for backup.", source.display());
                reports.push(report);
                continue;
            }
            info!("Backup {}...", source.display());

            let normalized = normalize_source(source);
            let Some(name) = staged_name(&normalized) else {
                warn!("{} has no directory name to back up under. Skip for backup.", source.display());
                report.status = SourceStatus::Unnamed;
                reports.push(report);
                continue;
            };
            report.staged_name = Some(name.clone());

            if !used_names.insert(name.clone()) {
                warn!(
                    "{} would be stored as {}, which an earlier source already uses. Skip for backup.",
                    source.display(),
                    name.to_string_lossy()
                );
                report.status = SourceStatus::DuplicateName;
                reports.push(report);
                continue;
            }

            let command = self.builder.build(&SyncOptions {
                source: normalized,
                destination: staging.to_path_buf(),
                semantics: options.semantics,
                dry_run: options.dry_run,
                link_reference: plan.link_reference(&name),
                thorough: plan.thorough,
                log_file: Some(plan.log_file.clone()),
            });
            report.command = Some(command.clone());

            if failed {
                info!("Skip {} because errors happened.", source.display());
                report.status = SourceStatus::SkippedAfterFailure;
                reports.push(report);
                continue;
            }

            if self.cancel_token.is_cancelled() {
                warn!("Shutdown requested, not starting {}", source.display());
                report.status = SourceStatus::Interrupted;
                failed = true;
                reports.push(report);
                continue;
            }

            info!("Execute {}", command);
            report.status = match self.transferer.execute(&command).await {
                Ok(outcome) if outcome.is_success() => SourceStatus::Transferred,
                Ok(outcome) => {
                    let code = outcome
                        .code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".to_string());
                    error!("Error during execution of {}. Returncode: {}", command.program.to_string_lossy(), code);
                    for line in &outcome.stderr_tail {
                        error!("stderr: {}", line);
                    }
                    SourceStatus::Failed(format!("exit status {}", code))
                }
                Err(e) => {
                    error!("{}", e);
                    SourceStatus::Failed(e.to_string())
                }
            };
            failed |= report.status.is_failure();
            reports.push(report);
        }

        reports
    }

    /// Collect statistics and write the metadata file into the staged tree.
    /// Problems here are logged and never block publishing.
    fn finalize(&self, report: &RunReport, options: &RunOptions, staging: &Path) -> Option<TreeStats> {
        let stats = match tree_stats(staging) {
            Ok(stats) => {
                info!(
                    "Snapshot holds {} files ({}), {} new, {} files shared with earlier snapshots",
                    stats.files,
                    format_bytes(stats.bytes),
                    format_bytes(stats.new_bytes()),
                    stats.linked_files
                );
                Some(stats)
            }
            Err(e) => {
                warn!("Failed to collect snapshot statistics: {}", e);
                None
            }
        };

        let meta = SnapshotMeta {
            version: 1,
            snapshot: report.plan.snapshot_name.clone(),
            host: host_name(),
            started_at: report.plan.started_at,
            finished_at: Local::now().naive_local(),
            reference: report.plan.reference.as_ref().map(|r| r.name()),
            thorough: report.plan.thorough,
            semantics: options.semantics,
            sources: report
                .sources
                .iter()
                .filter(|s| s.status == SourceStatus::Transferred)
                .filter_map(|s| {
                    s.staged_name.as_ref().map(|name| MetaSource {
                        path: s.source.clone(),
                        name: name.to_string_lossy().into_owned(),
                    })
                })
                .collect(),
            stats,
        };
        if let Err(e) = meta.write_to(staging) {
            warn!("Failed to write snapshot metadata: {}", e);
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{parse_timestamp, BackupRecord};
    use crate::sync::TransferOutcome;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records commands and mimics the sync tool by creating the staged
    /// subdirectory, unless told to fail.
    #[derive(Default)]
    struct FakeTransferer {
        commands: Mutex<Vec<SyncCommand>>,
        fail_on_call: Option<usize>,
    }

    impl FakeTransferer {
        fn failing_on(call: usize) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Self::default()
            }
        }

        fn commands(&self) -> Vec<SyncCommand> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl Transferer for FakeTransferer {
        async fn execute(&self, command: &SyncCommand) -> Result<TransferOutcome> {
            let call = {
                let mut commands = self.commands.lock().unwrap();
                commands.push(command.clone());
                commands.len() - 1
            };
            if self.fail_on_call == Some(call) {
                return Ok(TransferOutcome::failure(23));
            }

            let n = command.args.len();
            let source = PathBuf::from(&command.args[n - 2]);
            let destination = PathBuf::from(&command.args[n - 1]);
            if !command.has_arg("--dry-run") {
                let staged = destination.join(source.file_name().unwrap());
                fs::create_dir_all(&staged)?;
                fs::write(staged.join("file.txt"), b"content")?;
            }
            Ok(TransferOutcome::success())
        }
    }

    struct Fixture {
        _temp_dir: TempDir,
        root: PathBuf,
        sources: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let root = temp_dir.path().join("backup");
            let sources = temp_dir.path().join("data");
            fs::create_dir(&root).unwrap();
            fs::create_dir(&sources).unwrap();
            Self {
                root: fs::canonicalize(root).unwrap(),
                sources: fs::canonicalize(sources).unwrap(),
                _temp_dir: temp_dir,
            }
        }

        fn source(&self, name: &str) -> PathBuf {
            let path = self.sources.join(name);
            fs::create_dir_all(&path).unwrap();
            path
        }

        fn options(&self, sources: Vec<PathBuf>) -> RunOptions {
            RunOptions {
                sources,
                destination: self.root.clone(),
                semantics: FilesystemSemantics::Ntfs,
                dry_run: false,
                keep: None,
            }
        }

        fn entries(&self) -> Vec<String> {
            let mut names: Vec<String> = fs::read_dir(&self.root)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }

        fn staging_dirs(&self) -> Vec<String> {
            self.entries()
                .into_iter()
                .filter(|n| n.starts_with(staging::STAGING_PREFIX))
                .collect()
        }
    }

    fn ts(name: &str) -> NaiveDateTime {
        parse_timestamp(name).unwrap()
    }

    fn orchestrator(transferer: FakeTransferer) -> SnapshotOrchestrator<FakeTransferer> {
        SnapshotOrchestrator::new(transferer, SyncCommandBuilder::default())
    }

    fn link_dest(command: &SyncCommand) -> Option<String> {
        command.args.iter().find_map(|a| {
            a.to_str()
                .and_then(|a| a.strip_prefix("--link-dest="))
                .map(str::to_string)
        })
    }

    #[tokio::test]
    async fn test_first_backup_is_thorough_and_published() {
        let fx = Fixture::new();
        let docs = fx.source("docs");
        let runner = orchestrator(FakeTransferer::default());

        let report = runner
            .run_at(&fx.options(vec![docs.clone()]), ts("2024_02_01_08_00_00"))
            .await
            .unwrap();

        assert!(report.plan.reference.is_none());
        assert!(report.plan.thorough);
        assert_eq!(report.outcome, RunOutcome::Published(fx.root.join("2024_02_01_08_00_00")));
        assert_eq!(report.exit_code(), EXIT_OK);

        let commands = runner.transferer.commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].has_arg("--checksum"));
        assert!(link_dest(&commands[0]).is_none());
        assert_eq!(
            commands[0].args.last().map(PathBuf::from).unwrap().parent(),
            Some(fx.root.as_path())
        );

        let snapshot = fx.root.join("2024_02_01_08_00_00");
        assert!(snapshot.join("docs/file.txt").is_file());
        assert!(fx.staging_dirs().is_empty());

        let meta = SnapshotMeta::read_from(&snapshot).unwrap();
        assert_eq!(meta.snapshot, "2024_02_01_08_00_00");
        assert_eq!(meta.sources.len(), 1);
        assert_eq!(meta.sources[0].name, "docs");
        assert_eq!(report.stats.map(|s| s.files), Some(1));

        let catalog = BackupCatalog::scan(&fx.root).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_incremental_run_links_against_previous_snapshot() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.root.join("2024_03_02_08_00_00/docs")).unwrap();
        let docs = fx.source("docs");
        let missing = fx.sources.join("does-not-exist");
        let runner = orchestrator(FakeTransferer::default());

        let report = runner
            .run_at(&fx.options(vec![missing.clone(), docs.clone()]), ts("2024_03_20_08_00_00"))
            .await
            .unwrap();

        assert!(!report.plan.thorough);
        assert_eq!(
            report.plan.reference.as_ref().map(BackupRecord::name).as_deref(),
            Some("2024_03_02_08_00_00")
        );
        assert_eq!(report.sources[0].status, SourceStatus::NotADirectory);
        assert_eq!(report.sources[1].status, SourceStatus::Transferred);

        let commands = runner.transferer.commands();
        assert_eq!(commands.len(), 1);
        assert!(!commands[0].has_arg("--checksum"));
        assert_eq!(
            link_dest(&commands[0]),
            Some(fx.root.join("2024_03_02_08_00_00/docs").to_string_lossy().into_owned())
        );
        assert!(matches!(report.outcome, RunOutcome::Published(_)));
    }

    #[tokio::test]
    async fn test_trailing_separator_stages_same_name() {
        let fx = Fixture::new();
        let docs = fx.source("docs");
        let mut with_slash = docs.clone().into_os_string();
        with_slash.push("/");
        let runner = orchestrator(FakeTransferer::default());

        let report = runner
            .run_at(&fx.options(vec![PathBuf::from(with_slash)]), ts("2024_03_20_08_00_00"))
            .await
            .unwrap();

        assert_eq!(report.sources[0].staged_name, Some(OsString::from("docs")));
        let commands = runner.transferer.commands();
        let n = commands[0].args.len();
        assert_eq!(PathBuf::from(&commands[0].args[n - 2]), docs);
    }

    #[tokio::test]
    async fn test_dry_run_discards_staging() {
        let fx = Fixture::new();
        fs::create_dir(fx.root.join("2024_03_02_08_00_00")).unwrap();
        let docs = fx.source("docs");
        let runner = orchestrator(FakeTransferer::default());
        let before = fx.entries();

        let mut options = fx.options(vec![docs]);
        options.dry_run = true;
        let report = runner.run_at(&options, ts("2024_03_20_08_00_00")).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Discarded);
        assert_eq!(report.exit_code(), EXIT_OK);
        assert!(runner.transferer.commands()[0].has_arg("--dry-run"));
        assert_eq!(fx.entries(), before);
        assert_eq!(BackupCatalog::scan(&fx.root).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_leaves_staging_and_skips_remaining_sources() {
        let fx = Fixture::new();
        let first = fx.source("first");
        let second = fx.source("second");
        let third = fx.source("third");
        let runner = orchestrator(FakeTransferer::failing_on(1));

        let report = runner
            .run_at(&fx.options(vec![first, second, third]), ts("2024_03_20_08_00_00"))
            .await
            .unwrap();

        let statuses: Vec<&SourceStatus> = report.sources.iter().map(|s| &s.status).collect();
        assert_eq!(statuses[0], &SourceStatus::Transferred);
        assert!(matches!(statuses[1], SourceStatus::Failed(_)));
        assert_eq!(statuses[2], &SourceStatus::SkippedAfterFailure);
        assert!(report.sources[2].command.is_some());
        assert_eq!(runner.transferer.commands().len(), 2);

        let RunOutcome::LeftInPlace(staging) = &report.outcome else {
            panic!("unexpected outcome {:?}", report.outcome);
        };
        assert!(staging.join("first/file.txt").is_file());
        assert!(!fx.root.join("2024_03_20_08_00_00").exists());
        assert_eq!(fx.staging_dirs().len(), 1);
        assert_eq!(report.exit_code(), EXIT_SOURCE_FAILURE);
        assert_eq!(report.failures(), 1);
    }

    #[tokio::test]
    async fn test_failed_dry_run_is_not_discarded() {
        let fx = Fixture::new();
        let docs = fx.source("docs");
        let runner = orchestrator(FakeTransferer::failing_on(0));

        let mut options = fx.options(vec![docs]);
        options.dry_run = true;
        let report = runner.run_at(&options, ts("2024_03_20_08_00_00")).await.unwrap();

        assert!(matches!(report.outcome, RunOutcome::LeftInPlace(_)));
        assert_eq!(fx.staging_dirs().len(), 1);
    }

    #[tokio::test]
    async fn test_no_usable_source_publishes_nothing() {
        let fx = Fixture::new();
        let runner = orchestrator(FakeTransferer::default());

        let report = runner
            .run_at(&fx.options(vec![fx.sources.join("missing")]), ts("2024_03_20_08_00_00"))
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::NothingTransferred);
        assert_eq!(report.exit_code(), EXIT_SOURCE_FAILURE);
        assert!(fx.entries().is_empty());
        assert!(runner.transferer.commands().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_staged_name_is_skipped() {
        let fx = Fixture::new();
        let a = fx.source("a/docs");
        let b = fx.source("b/docs");
        let runner = orchestrator(FakeTransferer::default());

        let report = runner
            .run_at(&fx.options(vec![a, b]), ts("2024_03_20_08_00_00"))
            .await
            .unwrap();

        assert_eq!(report.sources[0].status, SourceStatus::Transferred);
        assert_eq!(report.sources[1].status, SourceStatus::DuplicateName);
        assert_eq!(runner.transferer.commands().len(), 1);
        assert!(matches!(report.outcome, RunOutcome::Published(_)));
    }

    #[tokio::test]
    async fn test_cancelled_run_is_left_in_place() {
        let fx = Fixture::new();
        let docs = fx.source("docs");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let runner = SnapshotOrchestrator::with_cancel(
            FakeTransferer::default(),
            SyncCommandBuilder::default(),
            cancel,
        );

        let report = runner
            .run_at(&fx.options(vec![docs]), ts("2024_03_20_08_00_00"))
            .await
            .unwrap();

        assert_eq!(report.sources[0].status, SourceStatus::Interrupted);
        assert!(runner.transferer.commands().is_empty());
        assert!(matches!(report.outcome, RunOutcome::LeftInPlace(_)));
    }

    #[tokio::test]
    async fn test_invalid_destination_is_fatal_without_side_effects() {
        let fx = Fixture::new();
        let docs = fx.source("docs");
        let runner = orchestrator(FakeTransferer::default());

        let mut options = fx.options(vec![docs]);
        options.destination = fx.root.join("missing");
        let result = runner.run_at(&options, ts("2024_03_20_08_00_00")).await;

        assert!(matches!(result, Err(SnapshotError::InvalidDestination(_))));
        assert!(fx.entries().is_empty());
        assert!(runner.transferer.commands().is_empty());
    }

    #[tokio::test]
    async fn test_existing_snapshot_name_is_fatal() {
        let fx = Fixture::new();
        fs::create_dir(fx.root.join("2024_03_20_08_00_00")).unwrap();
        let docs = fx.source("docs");
        let runner = orchestrator(FakeTransferer::default());

        let result = runner
            .run_at(&fx.options(vec![docs]), ts("2024_03_20_08_00_00"))
            .await;

        assert!(matches!(result, Err(SnapshotError::SnapshotExists(_))));
        assert!(fx.staging_dirs().is_empty());
    }

    #[tokio::test]
    async fn test_retention_after_publish() {
        let fx = Fixture::new();
        for name in ["2024_01_01_08_00_00", "2024_02_01_08_00_00", "2024_03_01_08_00_00"] {
            fs::create_dir(fx.root.join(name)).unwrap();
        }
        let docs = fx.source("docs");
        let runner = orchestrator(FakeTransferer::default());

        let mut options = fx.options(vec![docs]);
        options.keep = Some(2);
        let report = runner.run_at(&options, ts("2024_03_20_08_00_00")).await.unwrap();

        assert_eq!(report.pruned, 2);
        let names: Vec<String> = BackupCatalog::scan(&fx.root)
            .unwrap()
            .iter()
            .map(BackupRecord::name)
            .collect();
        assert_eq!(names, vec!["2024_03_01_08_00_00", "2024_03_20_08_00_00"]);
    }
}
