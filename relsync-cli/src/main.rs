//! relsync — open release pull requests for branch pairs whose head has
//! moved ahead of base.
//!
//! # Usage
//!
//! ```text
//! relsync sync [--dry-run] [--config <file> | --config-url <url>] [--marker <text>]
//!              [--max-concurrency N] [--target-timeout SECS] [--call-timeout SECS] [--json]
//! relsync targets [--config <file> | --config-url <url>] [--json]
//! ```
//!
//! Credentials come from `GITHUB_ACCESS_TOKEN` or `GITHUB_INSTALLATION_TOKEN`;
//! without either, requests are anonymous.

mod commands;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{sync::SyncArgs, targets::TargetsArgs};
use logging::LogFormat;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "relsync",
    version,
    about = "Open deduplicated release pull requests across repositories",
    long_about = None,
)]
struct Cli {
    /// Log line format on stderr. Level comes from `RUST_LOG` (default `info`).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate every configured target and open release pull requests.
    Sync(SyncArgs),

    /// Load and validate the configuration, then list its targets.
    Targets(TargetsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format);
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Targets(args) => args.run(),
    }
}
