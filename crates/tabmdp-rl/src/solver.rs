//! Policy iteration - Coordinates evaluation and improvement
//!
//! The loop moves through `Initializing -> Evaluating -> Improving` and
//! repeats the last two until the improved policy equals the current one
//! (`Converged`) or the iteration budget runs out (`Exhausted`). Running out
//! of budget is a normal outcome: the latest policy and values are returned
//! with [`SolveStatus::Exhausted`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use tabmdp_core::{
    Discount, Label, Policy, Result, RewardModel, TransitionModel, TrialLog, ValueFunction,
};

use crate::estimator::TransitionCounts;
use crate::evaluator::{check_tolerance, evaluate, DEFAULT_TOLERANCE};
use crate::improver::improve;

/// How the first policy is chosen when none is supplied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialPolicy {
    /// Uniformly random action per state
    #[default]
    Random,
    /// First action of the action space everywhere
    FirstAction,
}

/// Solver limits and start-up behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Evaluation stops once no state changes by this much in a sweep
    pub tolerance: f64,
    /// Sweep budget for each policy evaluation
    pub max_evaluation_sweeps: usize,
    /// Budget of evaluate/improve rounds
    pub max_policy_iterations: usize,
    pub initial_policy: InitialPolicy,
    /// Seed for the random initial policy; entropy when unset
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_evaluation_sweeps: 10_000,
            max_policy_iterations: 1_000,
            initial_policy: InitialPolicy::Random,
            seed: None,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        check_tolerance(self.tolerance)
    }
}

/// Where the policy-iteration loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Evaluating,
    Improving,
    Converged,
    Exhausted,
}

/// How a solve ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Improvement returned the policy unchanged
    Converged,
    /// The iteration budget ran out first
    Exhausted,
}

impl From<SolveStatus> for Phase {
    fn from(status: SolveStatus) -> Self {
        match status {
            SolveStatus::Converged => Phase::Converged,
            SolveStatus::Exhausted => Phase::Exhausted,
        }
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Converged => write!(f, "converged"),
            SolveStatus::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// One evaluate/improve round
#[derive(Debug, Clone)]
pub struct IterationRecord<S: Label> {
    /// 1-based round number
    pub iteration: usize,
    pub sweeps: usize,
    pub evaluation_converged: bool,
    /// States whose action the improvement step changed
    pub changed_states: usize,
    /// Values of the policy evaluated in this round
    pub values: ValueFunction<S>,
}

/// Result of a policy-iteration solve
#[derive(Debug, Clone)]
pub struct Solution<S: Label, A: Label> {
    pub policy: Policy<S, A>,
    /// Values from the last evaluation
    pub values: ValueFunction<S>,
    pub status: SolveStatus,
    pub iterations: usize,
    pub history: Vec<IterationRecord<S>>,
}

impl<S: Label, A: Label> Solution<S, A> {
    pub fn is_converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }

    pub fn action(&self, state: &S) -> Option<&A> {
        self.policy.action(state)
    }

    pub fn value(&self, state: &S) -> Option<f64> {
        self.values.get(state)
    }

    /// Total evaluation sweeps across all rounds
    pub fn total_sweeps(&self) -> usize {
        self.history.iter().map(|r| r.sweeps).sum()
    }
}

/// Solution of the learning variant, together with the estimated model
#[derive(Debug, Clone)]
pub struct LearnedSolution<S: Label, A: Label> {
    pub model: TransitionModel<S, A>,
    pub solution: Solution<S, A>,
}

/// Policy iteration over a fixed transition model
#[derive(Debug, Clone)]
pub struct PolicyIteration<S: Label, A: Label> {
    model: TransitionModel<S, A>,
    rewards: RewardModel<S, A>,
    gamma: Discount,
    config: SolverConfig,
    initial: Option<Policy<S, A>>,
}

impl<S: Label, A: Label> PolicyIteration<S, A> {
    pub fn new(
        model: TransitionModel<S, A>,
        rewards: RewardModel<S, A>,
        gamma: Discount,
        config: SolverConfig,
    ) -> Result<Self> {
        model.ensure_compatible(&rewards)?;
        config.validate()?;

        Ok(Self {
            model,
            rewards,
            gamma,
            config,
            initial: None,
        })
    }

    /// Learning variant: estimate the model once from `trials`, then plan on it.
    ///
    /// The log is a fixed batch, so estimating again inside the loop would
    /// only reproduce the same table.
    pub fn from_trials(
        rewards: RewardModel<S, A>,
        trials: &TrialLog<S, A>,
        gamma: Discount,
        config: SolverConfig,
    ) -> Result<Self> {
        let mut counts = TransitionCounts::new(rewards.states().clone(), rewards.actions().clone());
        counts.record_all(trials)?;
        let model = counts.to_model()?;

        info!(
            "Estimated transitions from {} trials over {} states and {} actions",
            trials.len(),
            model.n_states(),
            model.n_actions()
        );

        Self::new(model, rewards, gamma, config)
    }

    /// Start from `policy` instead of the configured initial policy
    pub fn with_initial_policy(mut self, policy: Policy<S, A>) -> Result<Self> {
        policy.ensure_spaces(self.model.states(), self.model.actions())?;
        self.initial = Some(policy);
        Ok(self)
    }

    pub fn model(&self) -> &TransitionModel<S, A> {
        &self.model
    }

    pub fn rewards(&self) -> &RewardModel<S, A> {
        &self.rewards
    }

    pub fn gamma(&self) -> Discount {
        self.gamma
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn initial_policy(&self) -> Result<Policy<S, A>> {
        if let Some(policy) = &self.initial {
            return Ok(policy.clone());
        }

        let states = self.model.states().clone();
        let actions = self.model.actions().clone();
        match self.config.initial_policy {
            InitialPolicy::FirstAction => Policy::constant(states, actions, 0),
            InitialPolicy::Random => {
                let mut rng = match self.config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                let choices = (0..states.len())
                    .map(|_| rng.gen_range(0..actions.len()))
                    .collect();
                Policy::from_indices(states, actions, choices)
            }
        }
    }

    /// Run policy iteration to convergence or exhaustion
    pub fn solve(&self) -> Result<Solution<S, A>> {
        let mut phase = Phase::Initializing;
        trace!(?phase, "Policy iteration phase");

        let mut policy = self.initial_policy()?;
        let mut values = ValueFunction::zeros(self.model.states().clone());
        let mut history = Vec::new();
        let mut status = SolveStatus::Exhausted;

        for iteration in 1..=self.config.max_policy_iterations {
            phase = Phase::Evaluating;
            trace!(?phase, iteration, "Policy iteration phase");

            let evaluation = evaluate(
                &policy,
                &self.model,
                &self.rewards,
                self.gamma,
                self.config.max_evaluation_sweeps,
                self.config.tolerance,
            )?;
            values = evaluation.values;

            phase = Phase::Improving;
            trace!(?phase, iteration, "Policy iteration phase");

            let candidate = improve(&values, &self.model, &self.rewards, self.gamma)?;
            let changed_states = candidate.differences(&policy)?;

            debug!(
                "Iteration {}: {} sweeps, {} states changed action",
                iteration, evaluation.sweeps, changed_states
            );

            history.push(IterationRecord {
                iteration,
                sweeps: evaluation.sweeps,
                evaluation_converged: evaluation.converged,
                changed_states,
                values: values.clone(),
            });

            if candidate == policy {
                status = SolveStatus::Converged;
                break;
            }
            policy = candidate;
        }

        phase = status.into();
        trace!(?phase, "Policy iteration phase");

        match status {
            SolveStatus::Converged => {
                info!("Policy iteration converged after {} iterations", history.len());
            }
            SolveStatus::Exhausted => {
                warn!(
                    "Policy iteration exhausted its budget of {} iterations",
                    self.config.max_policy_iterations
                );
            }
        }

        Ok(Solution {
            policy,
            values,
            status,
            iterations: history.len(),
            history,
        })
    }

    /// Solve and hand back the model alongside the solution
    pub fn solve_learned(self) -> Result<LearnedSolution<S, A>> {
        let solution = self.solve()?;
        Ok(LearnedSolution {
            model: self.model,
            solution,
        })
    }
}
