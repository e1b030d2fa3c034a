//! Solve a problem file with policy iteration

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use tracing::{info, warn};

use tabmdp_core::{Problem, ProblemFile, TransitionSource};
use tabmdp_rl::{action_values, PolicyIteration, SolverConfig};

use crate::config::{Config, OutputFormat};
use crate::report::SolveReport;

#[derive(Args)]
pub struct SolveArgs {
    /// Problem file (.toml or .json)
    pub problem: PathBuf,

    /// Output format (defaults to [output].format)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Discount factor, overriding the problem file
    #[arg(short, long)]
    pub gamma: Option<f64>,

    /// Seed for the random initial policy
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum evaluate/improve rounds
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Evaluation convergence tolerance
    #[arg(long)]
    pub tolerance: Option<f64>,
}

impl SolveArgs {
    /// Apply command-line overrides on top of the configured solver settings
    fn solver_config(&self, base: &SolverConfig) -> SolverConfig {
        let mut config = base.clone();
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(max_iterations) = self.max_iterations {
            config.max_policy_iterations = max_iterations;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        config
    }
}

pub fn run(args: &SolveArgs, config: &Config) -> Result<()> {
    let problem = load_problem(&args.problem, args.gamma, config.problem.gamma)?;
    let report = solve_problem(
        problem,
        &args.problem.display().to_string(),
        args.solver_config(&config.solver),
    )?;

    print_report(
        &report,
        args.format.unwrap_or(config.output.format),
        config.output.precision,
    )
}

/// Load and validate a problem file. `gamma` wins over the file's own
/// discount, which wins over `default_gamma`.
pub(crate) fn load_problem(path: &Path, gamma: Option<f64>, default_gamma: f64) -> Result<Problem> {
    let mut file = ProblemFile::load(path)
        .with_context(|| format!("Failed to load problem file {}", path.display()))?;
    if gamma.is_some() {
        file.gamma = gamma;
    }

    file.into_problem(default_gamma)
        .with_context(|| format!("Invalid problem in {}", path.display()))
}

/// Run policy iteration on `problem`, estimating the model first when the
/// problem only carries trials.
pub(crate) fn solve_problem(
    problem: Problem,
    name: &str,
    solver_config: SolverConfig,
) -> Result<SolveReport> {
    let started_at = Utc::now();
    let gamma = problem.gamma;

    let (solver, estimated) = match problem.source {
        TransitionSource::Known(model) => (
            PolicyIteration::new(model, problem.rewards, gamma, solver_config)?,
            false,
        ),
        TransitionSource::Trials(trials) => {
            if trials.is_empty() {
                warn!("No trials in {}; every transition row will be uniform", name);
            }
            (
                PolicyIteration::from_trials(problem.rewards, &trials, gamma, solver_config)?,
                true,
            )
        }
    };

    info!(
        "Solving {} ({} states, {} actions, gamma {})",
        name,
        problem.states.len(),
        problem.actions.len(),
        gamma
    );

    let solution = solver.solve()?;
    let q_values = action_values(&solution.values, solver.model(), solver.rewards(), gamma)?;

    Ok(SolveReport::new(
        name,
        started_at,
        gamma.value(),
        solution,
        q_values,
        estimated.then(|| solver.model()),
    ))
}

pub(crate) fn print_report(report: &SolveReport, format: OutputFormat, precision: usize) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => print!("{}", report.to_text(precision)),
    }
    Ok(())
}
