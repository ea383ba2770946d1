//! Reconciles an internal ledger against a bank statement.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::RunRequest;
use config::AppConfig;

/// Match internal transactions to bank statement lines.
#[derive(Debug, Parser)]
#[command(name = "tally", version, about)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile two ledgers and print a summary.
    Run(RunArgs),
    /// Print the effective configuration.
    Config,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Internal ledger CSV.
    #[arg(long, value_name = "CSV")]
    internal: PathBuf,
    /// Bank statement CSV.
    #[arg(long, value_name = "CSV")]
    bank: PathBuf,
    /// Maximum booking date distance in days.
    #[arg(long, value_name = "DAYS")]
    date_tolerance: Option<u32>,
    /// Amount tolerance (currently does not affect matching).
    #[arg(long, value_name = "AMOUNT")]
    amount_tolerance: Option<Decimal>,
    /// Minimum vendor similarity, 0 to 1.
    #[arg(long, value_name = "RATIO")]
    similarity_threshold: Option<f64>,
    /// Write matches.csv, unmatched_internal.csv and unmatched_bank.csv here.
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
    /// Print the side-by-side comparison for this transaction ID.
    #[arg(long, value_name = "TRANSACTION_ID")]
    show: Option<String>,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

impl From<RunArgs> for RunRequest {
    fn from(args: RunArgs) -> Self {
        RunRequest {
            internal: args.internal,
            bank: args.bank,
            date_tolerance: args.date_tolerance,
            amount_tolerance: args.amount_tolerance,
            similarity_threshold: args.similarity_threshold,
            out_dir: args.out_dir,
            show: args.show,
            json: args.json,
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let output = match cli.command {
        Command::Run(args) => commands::run(config, &args.into())?,
        Command::Config => commands::show_config(&config)?,
    };
    println!("{output}");
    Ok(())
}
