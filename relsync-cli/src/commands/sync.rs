//! `relsync sync` — evaluate every target and open release pull requests.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use tokio::sync::watch;

use relsync_core::{ReleaseMarker, SyncTarget};
use relsync_engine::{
    orchestrator, EngineOptions, RunOptions, RunSummary, SyncEngine, SyncOutcome, TargetReport,
};

use super::{AuthArgs, ConfigArgs};

/// Grace period for detached blocking calls once the run is over.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Arguments for `relsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub auth: AuthArgs,

    /// Report what would be opened without creating pull requests or
    /// requesting reviewers.
    #[arg(long)]
    pub dry_run: bool,

    /// Title prefix identifying release pull requests.
    #[arg(long, default_value = ReleaseMarker::DEFAULT)]
    pub marker: String,

    /// Maximum targets evaluated at once (default: all).
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Give up on a single target after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub target_timeout: Option<u64>,

    /// Timeout for each GitHub API request.
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub call_timeout: u64,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        if self.marker.trim().is_empty() {
            bail!("--marker must not be empty");
        }
        let targets = self.config.load()?;
        let client = self.auth.client(Duration::from_secs(self.call_timeout))?;

        let options = EngineOptions::new(self.dry_run, Local::now().date_naive())
            .with_marker(ReleaseMarker::from(self.marker.trim()));
        let engine = Arc::new(SyncEngine::new(Arc::new(client), options));
        let run_options = RunOptions {
            max_concurrency: self.max_concurrency,
            target_timeout: self.target_timeout.map(Duration::from_secs),
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to build tokio runtime")?;
        let summary = runtime.block_on(run_until_interrupted(engine, targets, run_options));
        runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);

        if self.json {
            print_json(&summary, self.dry_run)?;
        } else {
            print_table(&summary, self.dry_run);
        }

        if summary.has_failures() {
            bail!(
                "{} of {} targets failed",
                summary.failed(),
                summary.reports.len()
            );
        }
        Ok(())
    }
}

/// Run the orchestrator; ctrl-c cancels whatever has not finished yet.
async fn run_until_interrupted(
    engine: Arc<SyncEngine>,
    targets: Vec<SyncTarget>,
    options: RunOptions,
) -> RunSummary {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling unfinished targets");
            let _ = shutdown_tx.send(true);
        }
    });

    let summary = orchestrator::run(engine, targets, options, shutdown_rx).await;
    signal.abort();
    summary
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SyncReportJson {
    dry_run: bool,
    summary: SyncSummaryJson,
    targets: Vec<TargetJson>,
}

#[derive(Serialize)]
struct SyncSummaryJson {
    total: usize,
    created: usize,
    would_create: usize,
    duplicate_skipped: usize,
    no_action_needed: usize,
    failed: usize,
    elapsed_ms: u64,
}

#[derive(Serialize)]
struct TargetJson {
    owner: String,
    repo: String,
    head: String,
    base: String,
    outcome: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pull_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pull_url: Option<String>,
    elapsed_ms: u64,
}

#[derive(Tabled)]
struct SyncTableRow {
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "base <- head")]
    branches: String,
    #[tabled(rename = "outcome")]
    outcome: String,
    #[tabled(rename = "detail")]
    detail: String,
}

fn target_json(report: &TargetReport) -> TargetJson {
    let (pull_number, pull_url) = match &report.outcome {
        SyncOutcome::Created { pull } | SyncOutcome::DuplicateSkipped { existing: pull } => {
            (Some(pull.number), Some(pull.html_url.clone()))
        }
        SyncOutcome::Failed(err) => match err.pull_request() {
            Some((number, url)) => (Some(number), Some(url.to_owned())),
            None => (None, None),
        },
        _ => (None, None),
    };
    let error_kind = match &report.outcome {
        SyncOutcome::Failed(err) => Some(err.kind()),
        _ => None,
    };
    TargetJson {
        owner: report.target.owner.clone(),
        repo: report.target.repo.clone(),
        head: report.target.head_branch.clone(),
        base: report.target.base_branch.clone(),
        outcome: report.outcome.key(),
        detail: report.outcome.detail(),
        error_kind,
        pull_number,
        pull_url,
        elapsed_ms: report.elapsed.as_millis() as u64,
    }
}

fn print_json(summary: &RunSummary, dry_run: bool) -> Result<()> {
    let payload = SyncReportJson {
        dry_run,
        summary: SyncSummaryJson {
            total: summary.reports.len(),
            created: summary.count("created"),
            would_create: summary.count("would_create"),
            duplicate_skipped: summary.count("duplicate_skipped"),
            no_action_needed: summary.count("no_action_needed"),
            failed: summary.failed(),
            elapsed_ms: summary.elapsed.as_millis() as u64,
        },
        targets: summary.reports.iter().map(target_json).collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize sync JSON")?
    );
    Ok(())
}

fn print_table(summary: &RunSummary, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if summary.reports.is_empty() {
        println!("{prefix}No sync targets configured.");
        return;
    }

    let rows: Vec<SyncTableRow> = summary
        .reports
        .iter()
        .map(|report| SyncTableRow {
            repository: report.target.repo_ref().to_string(),
            branches: format!(
                "{} <- {}",
                report.target.base_branch, report.target.head_branch
            ),
            outcome: outcome_label(&report.outcome),
            detail: report.outcome.detail(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let opened = if dry_run {
        format!("{} would open", summary.count("would_create"))
    } else {
        format!("{} opened", summary.count("created"))
    };
    println!(
        "{prefix}{} targets | {opened} | {} already open | {} up to date | {} failed",
        summary.reports.len(),
        summary.count("duplicate_skipped"),
        summary.count("no_action_needed"),
        summary.failed(),
    );
}

fn outcome_label(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::NoActionNeeded => "UP TO DATE".bright_black().to_string(),
        SyncOutcome::DuplicateSkipped { .. } => "ALREADY OPEN".cyan().to_string(),
        SyncOutcome::Created { .. } => "CREATED".green().bold().to_string(),
        SyncOutcome::WouldCreate { .. } => "WOULD CREATE".yellow().bold().to_string(),
        SyncOutcome::Failed(err) if err.is_partial() => "PARTIAL".magenta().bold().to_string(),
        SyncOutcome::Failed(_) => "FAILED".red().bold().to_string(),
    }
}
