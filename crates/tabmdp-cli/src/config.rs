//! Configuration loading for the tabmdp CLI

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use config::{ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use tabmdp_rl::SolverConfig;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "TABMDP_CONFIG";

/// Prefix for `TABMDP__SECTION__KEY` overrides
const ENV_PREFIX: &str = "TABMDP";

const CONFIG_FILE_NAME: &str = "tabmdp.toml";

/// Configuration for the CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub solver: SolverConfig,
    pub problem: ProblemConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
    /// File the configuration was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemConfig {
    /// Discount used when a problem file does not set `gamma`
    pub gamma: f64,
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self { gamma: 0.9 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Decimal places in text tables
    pub precision: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            precision: 4,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// `explicit` (from `--config`) must exist; otherwise the usual locations
    /// are searched and a missing file means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::find_config_file(),
        };

        Self::load_from(path, None)
    }

    /// Build from an optional file plus the environment.
    ///
    /// `env` replaces the process environment when given.
    pub fn load_from(path: Option<PathBuf>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = ConfigBuilder::<config::builder::DefaultState>::default();

        if let Some(path) = &path {
            builder = builder.add_source(File::from(path.clone()).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let mut config: Config = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.source = path;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.solver
            .validate()
            .context("Invalid [solver] configuration")?;
        tabmdp_core::Discount::new(self.problem.gamma)
            .context("Invalid [problem] configuration")?;
        Ok(())
    }

    /// Find the configuration file
    pub fn find_config_file() -> Option<PathBuf> {
        // Check in order: TABMDP_CONFIG env, ./tabmdp.toml, ~/.config/tabmdp/tabmdp.toml
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config").join("tabmdp").join(CONFIG_FILE_NAME);
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Render as TOML, for `config show` and `config init`
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tabmdp_rl::InitialPolicy;

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    #[test]
    fn test_defaults() {
        let config = Config::load_from(None, no_env()).unwrap();

        assert_eq!(config.problem.gamma, 0.9);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.output.precision, 4);
        assert_eq!(config.solver, SolverConfig::default());
        assert!(config.source.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[solver]
max_policy_iterations = 50
initial_policy = "first_action"

[output]
format = "json"
"#
        )
        .unwrap();

        let config = Config::load_from(Some(file.path().to_path_buf()), no_env()).unwrap();

        assert_eq!(config.solver.max_policy_iterations, 50);
        assert_eq!(config.solver.initial_policy, InitialPolicy::FirstAction);
        assert_eq!(config.solver.tolerance, 1e-6);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.precision, 4);
        assert_eq!(config.source.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[problem]\ngamma = 0.5").unwrap();

        let env = HashMap::from([
            ("TABMDP__PROBLEM__GAMMA".to_string(), "0.75".to_string()),
            ("TABMDP__SOLVER__SEED".to_string(), "11".to_string()),
        ]);
        let config = Config::load_from(Some(file.path().to_path_buf()), Some(env)).unwrap();

        assert_eq!(config.problem.gamma, 0.75);
        assert_eq!(config.solver.seed, Some(11));
    }

    #[test]
    fn test_invalid_gamma_rejected() {
        let env = HashMap::from([("TABMDP__PROBLEM__GAMMA".to_string(), "1.5".to_string())]);
        assert!(Config::load_from(None, Some(env)).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("[solver]"));
        assert!(rendered.contains("max_evaluation_sweeps = 10000"));

        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.solver, SolverConfig::default());
        assert_eq!(parsed.logging.format, LogFormat::Text);
    }
}
