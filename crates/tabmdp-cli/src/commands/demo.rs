//! Built-in three-state example

use anyhow::{Context, Result};
use clap::Args;

use tabmdp_core::ProblemFile;

use crate::commands::solve::{print_report, solve_problem};
use crate::config::{Config, OutputFormat};

const THREE_STATE: &str = include_str!("../../../../demos/three_state.toml");

#[derive(Args)]
pub struct DemoArgs {
    /// Output format (defaults to [output].format)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
}

pub fn run(args: &DemoArgs, config: &Config) -> Result<()> {
    let problem = ProblemFile::from_toml_str(THREE_STATE)
        .and_then(|file| file.into_problem(config.problem.gamma))
        .context("Built-in demo problem is invalid")?;

    let report = solve_problem(problem, "three_state (built-in)", config.solver.clone())?;

    print_report(
        &report,
        args.format.unwrap_or(config.output.format),
        config.output.precision,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabmdp_rl::{SolveStatus, SolverConfig};

    #[test]
    fn test_demo_solves_to_known_policy() {
        let problem = ProblemFile::from_toml_str(THREE_STATE)
            .unwrap()
            .into_problem(0.5)
            .unwrap();
        assert_eq!(problem.gamma.value(), 0.9);

        let config = SolverConfig {
            seed: Some(1),
            ..SolverConfig::default()
        };
        let report = solve_problem(problem, "demo", config).unwrap();

        assert_eq!(report.status, SolveStatus::Converged);
        let action = |s: &str| report.policy.action(&s.to_string()).cloned();
        assert_eq!(action("0").as_deref(), Some("a"));
        assert_eq!(action("1").as_deref(), Some("b"));
        assert_eq!(action("2").as_deref(), Some("a"));
        assert_eq!(report.estimated_transitions.as_ref().map(Vec::len), Some(8));
    }
}
