//! Estimate a transition table from a problem's trials

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use tracing::info;

use tabmdp_core::{Problem, TransitionSource};
use tabmdp_rl::TransitionCounts;

use crate::commands::solve::load_problem;
use crate::config::{Config, OutputFormat};
use crate::report::EstimateReport;

#[derive(Args)]
pub struct EstimateArgs {
    /// Problem file (.toml or .json)
    pub problem: PathBuf,

    /// Output format (defaults to [output].format)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
}

pub fn run(args: &EstimateArgs, config: &Config) -> Result<()> {
    let problem = load_problem(&args.problem, None, config.problem.gamma)?;
    let report = estimate_problem(problem, &args.problem.display().to_string())?;

    match args.format.unwrap_or(config.output.format) {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => print!("{}", report.to_text(config.output.precision)),
    }
    Ok(())
}

fn estimate_problem(problem: Problem, name: &str) -> Result<EstimateReport> {
    let trials = match problem.source {
        TransitionSource::Trials(trials) => trials,
        TransitionSource::Known(_) => {
            bail!("{name} supplies its transitions directly; there is nothing to estimate")
        }
    };

    let mut counts = TransitionCounts::new(problem.states.clone(), problem.actions.clone());
    counts.record_all(&trials)?;
    let model = counts.to_model()?;

    info!(
        "Estimated {} of {} (state, action) pairs from {} trials",
        counts.observed_pairs(),
        model.n_states() * model.n_actions(),
        trials.len()
    );

    Ok(EstimateReport::new(
        name,
        trials.len(),
        counts.observed_pairs(),
        &model,
    ))
}
