//! `relsync targets` — show the configured targets without touching GitHub.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use relsync_core::SyncTarget;

use super::ConfigArgs;

/// Arguments for `relsync targets`.
#[derive(Args, Debug)]
pub struct TargetsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit the validated target list as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct TargetTableRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "head")]
    head: String,
    #[tabled(rename = "base")]
    base: String,
    #[tabled(rename = "reviewers")]
    reviewers: String,
}

impl TargetsArgs {
    pub fn run(self) -> Result<()> {
        let targets = self.config.load()?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&targets)
                    .context("failed to serialize targets JSON")?
            );
            return Ok(());
        }
        print_table(&targets);
        Ok(())
    }
}

fn print_table(targets: &[SyncTarget]) {
    if targets.is_empty() {
        println!("No sync targets configured.");
        return;
    }
    let rows: Vec<TargetTableRow> = targets
        .iter()
        .enumerate()
        .map(|(index, target)| TargetTableRow {
            index,
            repository: target.repo_ref().to_string(),
            head: target.head_branch.clone(),
            base: target.base_branch.clone(),
            reviewers: if target.reviewers.is_empty() {
                "-".to_string()
            } else {
                target
                    .reviewers
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            },
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{} targets", targets.len());
}
