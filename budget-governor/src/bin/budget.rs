//! Budget CLI - monitor and maintain the budget governor's usage data
//!
//! # Usage
//!
//! ```bash
//! # Current daily status
//! budget status
//!
//! # Weekly report as JSON
//! budget report --period weekly --output-format json
//!
//! # Last 30 days of snapshots
//! budget history 30
//!
//! # Check the retention window without prompting (files are kept)
//! budget reset --yes
//!
//! # Live status view
//! budget watch --interval 10
//! ```

use anyhow::Context;
use budget_governor::budget::BudgetPeriod;
use budget_governor::cli::{commands, CliContext, OutputFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "budget")]
#[command(version)]
#[command(about = "Budget governance monitor for multi-agent LLM workloads", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "BUDGET_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (table, json, plain)
    #[arg(short, long, global = true, default_value = "table")]
    output_format: String,

    /// Suppress status messages
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current daily usage and agent allocation
    Status,

    /// Generate a usage report
    Report {
        /// Report period (daily, weekly, monthly)
        #[arg(short, long, default_value = "daily")]
        period: BudgetPeriod,
    },

    /// Show totals of recent daily snapshots
    History {
        /// Number of days to look back
        #[arg(default_value_t = 7)]
        days: u32,
    },

    /// Prune in-memory records older than the retention window.
    ///
    /// This process loads only today's snapshot, so there is normally
    /// nothing old to prune; snapshot files are never deleted.
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Refresh the status view periodically
    Watch {
        /// Refresh interval in seconds
        #[arg(short, long, default_value_t = 5)]
        interval: u64,
    },
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;
    // The library logs through the `log` facade
    tracing_log::LogTracer::init().context("failed to bridge log records")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let output_format: OutputFormat = cli.output_format.parse().unwrap_or_else(|e| {
        eprintln!("Warning: {}. Using table format.", e);
        OutputFormat::Table
    });

    let mut ctx = match cli.config {
        Some(path) => CliContext::new(path.clone())
            .with_context(|| format!("Error loading configuration from {}", path.display()))?,
        None => CliContext::with_defaults().context("Error initializing context")?,
    };
    ctx.output_format = output_format;
    ctx.quiet = cli.quiet;
    ctx.verbose = cli.verbose;

    tracing::debug!("Using configuration {}", ctx.config_path.display());

    match cli.command {
        Commands::Status => commands::status::execute(&ctx)?,
        Commands::Report { period } => commands::report::execute(&ctx, period)?,
        Commands::History { days } => commands::history::execute(&ctx, days)?,
        Commands::Reset { yes } => commands::reset::execute(&ctx, yes)?,
        Commands::Watch { interval } => commands::watch::execute(&ctx, interval)?,
    }

    Ok(())
}
