//! tabmdp CLI - Solve tabular MDPs from problem files
//!
//! Loads a problem (states, actions, rewards and either known transitions or
//! observed trials), runs policy iteration and prints the optimal policy,
//! its value function and the action values.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::float_cmp)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod report;

use commands::{config as config_cmd, demo, estimate, solve};
use crate::config::{Config, LogFormat};

#[derive(Parser)]
#[command(name = "tabmdp")]
#[command(author, version, about = "tabmdp - policy iteration for tabular MDPs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: $TABMDP_CONFIG, ./tabmdp.toml, ~/.config/tabmdp/tabmdp.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a problem file with policy iteration
    Solve(solve::SolveArgs),

    /// Estimate transition probabilities from a problem's trials
    Estimate(estimate::EstimateArgs),

    /// Solve the built-in three-state example
    Demo(demo::DemoArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(config_cmd::ConfigCommands),
}

fn init_tracing(config: &Config, verbose: bool) {
    let log_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("tabmdp={log_level}").into());

    // Logs go to stderr so JSON reports on stdout stay parseable
    match config.logging.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config, cli.verbose);

    match &config.source {
        Some(path) => debug!("Loaded config from: {:?}", path),
        None => debug!("No config file found, using defaults"),
    }

    match &cli.command {
        Commands::Solve(args) => solve::run(args, &config),
        Commands::Estimate(args) => estimate::run(args, &config),
        Commands::Demo(args) => demo::run(args, &config),
        Commands::Config(cmd) => config_cmd::run(cmd, &config),
    }
}
