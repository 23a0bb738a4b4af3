//! Opening range breakout bot - main entry point
//!
//! This binary provides three subcommands:
//! - run: start the engine with the HTTP control surface
//! - simulate: feed a synthetic trading day through the engine
//! - replay: feed bars from a CSV file through the engine

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "orb-bot")]
#[command(about = "Opening range breakout trading engine with simulated execution", long_about = None)]
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
    /// Run the engine behind the HTTP control surface
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/es_orb.json")]
        config: String,

        /// Address for the control surface
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },

    /// Simulate a full trading day with synthetic bars
    Simulate {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/es_orb.json")]
        config: String,

        /// Starting price for the synthetic session
        #[arg(long, default_value = "5000.0")]
        start_price: f64,

        /// RNG seed for a reproducible session
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Replay bars from a CSV file (timestamp,open,high,low,close,volume)
    Replay {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/es_orb.json")]
        config: String,

        /// Path to the bar file
        #[arg(short, long)]
        file: String,
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
    let filter_str = format!("{},hyper=warn,hyper_util=warn,tower=warn,h2=warn", level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

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
        Commands::Run { .. } => "run",
        Commands::Simulate { .. } => "simulate",
        Commands::Replay { .. } => "replay",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Run { config, bind } => commands::run::run(config, bind),
        Commands::Simulate {
            config,
            start_price,
            seed,
        } => commands::simulate::run(config, start_price, seed),
        Commands::Replay { config, file } => commands::replay::run(config, file),
    }
}
