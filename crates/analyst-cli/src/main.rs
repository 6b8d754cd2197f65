mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use commands::lbo::{LboArgs, ReturnsArgs};
use commands::monte_carlo::{McDcfArgs, MonteCarloArgs, StressTestArgs};
use commands::quick::QuickArgs;
use commands::statistics::StatsArgs;
use commands::valuation::DcfArgs;

/// Financial analyst toolkit: valuation, buyouts, simulation and statistics
#[derive(Parser)]
#[command(
    name = "fa",
    version,
    about = "Financial analyst toolkit",
    long_about = "A CLI for DCF valuation with scenarios and a recommendation, leveraged \
                  buyout modelling, Monte Carlo simulation and stress testing, and \
                  statistical hypothesis tests. Monetary figures use decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// DCF valuation with bull/bear cases, sensitivity and a rating
    Dcf(DcfArgs),
    /// Leveraged buyout model with debt schedule and returns
    Lbo(LboArgs),
    /// IRR, XIRR and MOIC for a cash-flow series
    Returns(ReturnsArgs),
    /// Generic Monte Carlo simulation over distributions
    MonteCarlo(MonteCarloArgs),
    /// Monte Carlo DCF valuation
    McDcf(McDcfArgs),
    /// Deterministic DCF stress scenarios
    StressTest(StressTestArgs),
    /// Statistical hypothesis test
    Stats(StatsArgs),
    /// Quick back-of-the-envelope valuation
    Quick(QuickArgs),
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

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match input::config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Dcf(args) => commands::valuation::run_dcf(args, &config),
        Commands::Lbo(args) => commands::lbo::run_lbo(args, &config),
        Commands::Returns(args) => commands::lbo::run_returns(args),
        Commands::MonteCarlo(args) => commands::monte_carlo::run_monte_carlo(args, &config),
        Commands::McDcf(args) => commands::monte_carlo::run_mc_dcf(args, &config),
        Commands::StressTest(args) => commands::monte_carlo::run_stress_test(args),
        Commands::Stats(args) => commands::statistics::run_stats(args, &config),
        Commands::Quick(args) => commands::quick::run_quick(args),
        Commands::Version => {
            println!("fa {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
