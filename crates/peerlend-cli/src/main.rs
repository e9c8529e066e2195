mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::amortization::{EmiArgs, OutstandingArgs, ScheduleArgs};
use commands::loans::{AcceptArgs, HistoryArgs, PayArgs, ProposeArgs};
use commands::portfolio::SummaryArgs;

/// Peer-to-peer loan amortization and payment tracking
#[derive(Parser)]
#[command(
    name = "plend",
    version,
    about = "Peer-to-peer loan amortization and payment tracking",
    long_about = "A CLI for EMI computation, amortization schedules, outstanding balances \
                  and portfolio summaries, plus a file-backed proposal/acceptance/payment \
                  workflow with a payment ledger."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Path to a YAML or JSON config file (falls back to $PLEND_CONFIG)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate the equated monthly installment
    Emi(EmiArgs),
    /// Build a month-by-month amortization schedule
    Schedule(ScheduleArgs),
    /// Outstanding balance of a loan record
    Outstanding(OutstandingArgs),
    /// Summarise a set of loans (active count, principal, outstanding, rate)
    Summary(SummaryArgs),
    /// Submit a lender proposal against a borrower request
    Propose(ProposeArgs),
    /// Accept a proposal, making the loan active
    Accept(AcceptArgs),
    /// Record one EMI payment on an active loan
    Pay(PayArgs),
    /// Show the payment ledger of a loan
    History(HistoryArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_env("PLEND_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = match config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Emi(args) => commands::amortization::run_emi(args, &cfg),
        Commands::Schedule(args) => commands::amortization::run_schedule(args),
        Commands::Outstanding(args) => commands::amortization::run_outstanding(args, &cfg),
        Commands::Summary(args) => commands::portfolio::run_summary(args, &cfg),
        Commands::Propose(args) => commands::loans::run_propose(args, &cfg),
        Commands::Accept(args) => commands::loans::run_accept(args, &cfg),
        Commands::Pay(args) => commands::loans::run_pay(args, &cfg),
        Commands::History(args) => commands::loans::run_history(args, &cfg),
        Commands::Version => {
            println!("plend {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
