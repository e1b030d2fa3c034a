//! Maximum-likelihood transition estimation from observed trials
//!
//! For a `(state, action)` pair seen `n` times, `P(s'|s,a)` is the fraction
//! of those `n` observations that landed in `s'`. Pairs never observed get a
//! uniform distribution over all states: an explicit smoothing choice so the
//! planner always has a well-defined row to work with.

use std::sync::Arc;

use ndarray::{Array2, Array3};
use tracing::debug;

use tabmdp_core::{Label, Result, Space, TransitionModel, Trial, TrialLog};

/// Transition counts accumulated from a trial log.
#[derive(Debug, Clone)]
pub struct TransitionCounts<S: Label, A: Label> {
    states: Arc<Space<S>>,
    actions: Arc<Space<A>>,
    counts: Array3<u64>,
    totals: Array2<u64>,
}

impl<S: Label, A: Label> TransitionCounts<S, A> {
    pub fn new(states: Arc<Space<S>>, actions: Arc<Space<A>>) -> Self {
        let n_s = states.len();
        let n_a = actions.len();
        Self {
            states,
            actions,
            counts: Array3::zeros((n_s, n_a, n_s)),
            totals: Array2::zeros((n_s, n_a)),
        }
    }

    /// Count one trial. Unknown labels are rejected before anything is counted.
    pub fn record(&mut self, trial: &Trial<S, A>) -> Result<()> {
        let s = self.states.require(&trial.state)?;
        let a = self.actions.require(&trial.action)?;
        let n = self.states.require(&trial.next_state)?;

        self.counts[[s, a, n]] += 1;
        self.totals[[s, a]] += 1;
        Ok(())
    }

    /// Count trials in order, stopping at the first one with an unknown label.
    pub fn record_all<'a>(&mut self, trials: impl IntoIterator<Item = &'a Trial<S, A>>) -> Result<()>
    where
        S: 'a,
        A: 'a,
    {
        for trial in trials {
            self.record(trial)?;
        }
        Ok(())
    }

    /// Times `(state, action)` was observed; 0 for unknown labels.
    pub fn observations(&self, state: &S, action: &A) -> u64 {
        match (self.states.index_of(state), self.actions.index_of(action)) {
            (Some(s), Some(a)) => self.totals[[s, a]],
            _ => 0,
        }
    }

    /// Total number of trials counted.
    pub fn total(&self) -> u64 {
        self.totals.sum()
    }

    /// Number of `(state, action)` pairs with at least one observation.
    pub fn observed_pairs(&self) -> usize {
        self.totals.iter().filter(|&&n| n > 0).count()
    }

    /// Maximum-likelihood model; uniform rows for unobserved pairs.
    pub fn to_model(&self) -> Result<TransitionModel<S, A>> {
        let n_s = self.states.len();
        let uniform = 1.0 / n_s as f64;

        let mut probabilities = Array3::<f64>::zeros(self.counts.dim());
        for ((s, a), &total) in self.totals.indexed_iter() {
            for n in 0..n_s {
                probabilities[[s, a, n]] = if total > 0 {
                    self.counts[[s, a, n]] as f64 / total as f64
                } else {
                    uniform
                };
            }
        }

        debug!(
            "Estimated transition model from {} trials ({} of {} state-action pairs observed)",
            self.total(),
            self.observed_pairs(),
            self.totals.len()
        );

        TransitionModel::from_dense(self.states.clone(), self.actions.clone(), probabilities)
    }
}

/// Estimate a transition model from a batch trial log.
///
/// Pure: the same inputs always give the same table. Fails with
/// `InvalidInput` if `states` or `actions` is empty or contains duplicates,
/// or if a trial names a label outside them.
pub fn estimate<S: Label, A: Label>(
    states: &[S],
    actions: &[A],
    trials: &TrialLog<S, A>,
) -> Result<TransitionModel<S, A>> {
    let states = Space::shared("state", states.iter().cloned())?;
    let actions = Space::shared("action", actions.iter().cloned())?;

    let mut counts = TransitionCounts::new(states, actions);
    counts.record_all(trials)?;
    counts.to_model()
}
