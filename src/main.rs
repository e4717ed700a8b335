//! Intraday strategies - main entry point
//!
//! This binary provides two subcommands:
//! - replay: Run a strategy over recorded candle data
//! - universe: Run the momentum universe rebalancer over snapshots

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "intraday-strategies")]
#[command(about = "Intraday equity trading strategies with session replay", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a strategy over recorded candle data
    Replay {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/spy_vwap.json")]
        config: String,

        /// Strategy name (overrides config file)
        #[arg(short, long)]
        strategy: Option<String>,

        /// Risk per trade in currency (overrides config file)
        #[arg(long)]
        risk: Option<f64>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },

    /// Run the momentum universe rebalancer over daily snapshots
    Universe {
        /// Path to the universe snapshot CSV
        #[arg(short, long, default_value = "data/universe.csv")]
        snapshots: String,

        /// Path to configuration file (strategy section holds the filter)
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Replay { .. } => "replay",
        Commands::Universe { .. } => "universe",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Replay {
            config,
            strategy,
            risk,
            start,
            end,
        } => commands::replay::run(config, strategy, risk, start, end),

        Commands::Universe { snapshots, config } => commands::universe::run(snapshots, config),
    }
}
