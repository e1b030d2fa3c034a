//! Policy evaluation by synchronous fixed-point sweeps
//!
//! Each sweep computes, for every state,
//! `V'(s) = Σ_s' P(s'|s,π(s)) · (R(s,π(s)) + γ·V(s'))`
//! from the previous table only (Jacobi update), so the result does not
//! depend on the order states are visited in.

use ndarray::{Array1, ArrayView1};
use tracing::{debug, trace, warn};

use tabmdp_core::{
    Discount, Label, MdpError, Policy, Result, RewardModel, TransitionModel, ValueFunction,
};

/// Convergence threshold on the largest per-state change between sweeps.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Outcome of evaluating one policy.
#[derive(Debug, Clone)]
pub struct Evaluation<S: Label> {
    pub values: ValueFunction<S>,
    /// Sweeps performed
    pub sweeps: usize,
    /// Largest change in the last sweep; infinite if no sweep ran
    pub delta: f64,
    /// False when `max_sweeps` ran out first. The values are still the latest table.
    pub converged: bool,
}

/// One-step lookahead: `Σ_s' P(s'|s,a) · (R(s,a) + γ·V(s'))`.
pub(crate) fn backup<S: Label, A: Label>(
    model: &TransitionModel<S, A>,
    rewards: &RewardModel<S, A>,
    gamma: f64,
    values: ArrayView1<'_, f64>,
    s: usize,
    a: usize,
) -> f64 {
    let r = rewards.reward(s, a);
    model
        .row(s, a)
        .iter()
        .zip(values.iter())
        .map(|(p, v)| p * (r + gamma * v))
        .sum::<f64>()
}

pub(crate) fn check_tolerance(tolerance: f64) -> Result<()> {
    if tolerance.is_finite() && tolerance >= 0.0 {
        Ok(())
    } else {
        Err(MdpError::invalid(format!(
            "tolerance must be a non-negative number, got {tolerance}"
        )))
    }
}

/// Evaluate `policy`, starting from all-zero values.
///
/// Stops once a sweep changes no state by `tolerance` or more, or after
/// `max_sweeps` sweeps. Running out of sweeps is reported through
/// [`Evaluation::converged`], not as an error.
pub fn evaluate<S: Label, A: Label>(
    policy: &Policy<S, A>,
    model: &TransitionModel<S, A>,
    rewards: &RewardModel<S, A>,
    gamma: Discount,
    max_sweeps: usize,
    tolerance: f64,
) -> Result<Evaluation<S>> {
    model.ensure_compatible(rewards)?;
    policy.ensure_spaces(model.states(), model.actions())?;
    check_tolerance(tolerance)?;

    let n_s = model.n_states();
    let gamma = gamma.value();

    let mut values = Array1::<f64>::zeros(n_s);
    let mut delta = f64::INFINITY;
    let mut sweeps = 0;
    let mut converged = false;

    while sweeps < max_sweeps {
        let next = Array1::from_shape_fn(n_s, |s| {
            backup(model, rewards, gamma, values.view(), s, policy.choice(s))
        });

        delta = next
            .iter()
            .zip(values.iter())
            .fold(0.0_f64, |acc, (new, old)| acc.max((new - old).abs()));
        values = next;
        sweeps += 1;

        trace!(sweep = sweeps, delta, "Evaluation sweep");

        if delta < tolerance {
            converged = true;
            break;
        }
    }

    if converged {
        debug!("Policy evaluation converged after {} sweeps (delta {:.3e})", sweeps, delta);
    } else {
        warn!(
            "Policy evaluation stopped after {} sweeps without converging (delta {:.3e})",
            sweeps, delta
        );
    }

    Ok(Evaluation {
        values: ValueFunction::from_array(model.states().clone(), values)?,
        sweeps,
        delta,
        converged,
    })
}
