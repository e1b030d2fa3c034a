//! Configuration management commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::config::Config;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a configuration file with default values
    Init {
        /// Where to write the file
        #[arg(default_value = "tabmdp.toml")]
        path: PathBuf,

        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

pub fn run(cmd: &ConfigCommands, config: &Config) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config),
        ConfigCommands::Init { path, force } => init(path, *force).map(|_| ()),
    }
}

fn show(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    match &config.source {
        Some(path) => println!("# Config file: {}", path.display()),
        None => println!("# No configuration file found. Using defaults."),
    }
    println!("# Environment overrides: TABMDP__<SECTION>__<KEY>\n");
    print!("{}", config.to_toml()?);

    Ok(())
}

/// Write the default configuration to `path`. Returns whether a file was written.
fn init(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(false);
    }

    let content = format!(
        "# tabmdp configuration\n# Values here can be overridden with TABMDP__<SECTION>__<KEY>.\n\n{}",
        Config::default().to_toml()?
    );
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Configuration file created: {}", path.display());

    Ok(true)
}
