//! twinslot: blue-green releases for a compose stack.
//!
//! Two slots (A and B) hold full copies of the service stack. `deploy`
//! brings the new release up in the idle slot, waits until every service is
//! healthy, repoints the reverse proxy, verifies the public endpoint, and
//! removes the old slot. Any failure after cutover sends traffic back.
//!
//! # Usage
//!
//! ```text
//! twinslot --config /srv/shop/twinslot.toml deploy
//! twinslot status --format json
//! twinslot history --limit 5
//! ```
//!
//! Exit codes: 0 success, 1 deployment failed or rolled back, 2 missing
//! prerequisite or another run in progress, 3 rollback failed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod exit;
mod workspace;

#[derive(Parser)]
#[command(
    name = "twinslot",
    about = "Blue-green release orchestrator for compose stacks",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to twinslot.toml. Relative paths inside it resolve against its directory.
    #[arg(long, global = true, default_value = "twinslot.toml")]
    config: PathBuf,

    /// Log output format (logs go to stderr).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Deploy the current release into the idle slot and switch traffic to it.
    Deploy,
    /// Show both slots, the routing target, the lease and the last deployment.
    Status {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Switch traffic back to the idle slot and stop the active one.
    Rollback,
    /// Destroy both slots, including volumes, and route traffic nowhere.
    Cleanup,
    /// List recent deployments, newest first, or show one in full.
    History {
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Show only the deployment with this id.
        #[arg(long)]
        id: Option<String>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Remove a lease left behind by a crashed run.
    Unlock,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,twinslot=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit::for_error(&e)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Deploy => commands::deploy::deploy(&cli.config).await,
        Command::Status { format } => commands::status::status(&cli.config, format).await,
        Command::Rollback => commands::rollback::rollback(&cli.config).await,
        Command::Cleanup => commands::cleanup::cleanup(&cli.config).await,
        Command::History { limit, id, format } => {
            commands::history::history(&cli.config, limit, id.as_deref(), format)
        }
        Command::Unlock => commands::unlock::unlock(&cli.config),
    }
}
