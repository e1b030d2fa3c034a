//! Transition and reward models, and the discount factor

use std::sync::Arc;

use ndarray::{Array2, Array3, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{MdpError, Result};
use crate::space::{same_space, Label, Space};

/// Allowed deviation of a transition row sum from 1 when a model is supplied.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// Discount factor, guaranteed to lie in `[0, 1)`.
///
/// A factor of 1 or more would make policy evaluation a non-contracting
/// mapping that may never converge, so it cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Discount(f64);

impl Discount {
    pub fn new(gamma: f64) -> Result<Self> {
        if (0.0..1.0).contains(&gamma) {
            Ok(Self(gamma))
        } else {
            Err(MdpError::invalid(format!(
                "discount factor must be in [0, 1), got {gamma}"
            )))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Discount {
    type Error = MdpError;

    fn try_from(gamma: f64) -> Result<Self> {
        Self::new(gamma)
    }
}

impl From<Discount> for f64 {
    fn from(gamma: Discount) -> Self {
        gamma.0
    }
}

impl std::fmt::Display for Discount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dense transition table `P[s, a, s']`.
///
/// Rows supplied within [`PROBABILITY_SUM_TOLERANCE`] of 1 are accepted and
/// rescaled, so every stored `(s, a)` row sums to 1 up to rounding.
#[derive(Debug, Clone)]
pub struct TransitionModel<S: Label, A: Label> {
    states: Arc<Space<S>>,
    actions: Arc<Space<A>>,
    probabilities: Array3<f64>,
}

impl<S: Label, A: Label> TransitionModel<S, A> {
    /// Every next state equally likely from every `(s, a)`.
    pub fn uniform(states: Arc<Space<S>>, actions: Arc<Space<A>>) -> Self {
        let n_s = states.len();
        let probabilities = Array3::from_elem((n_s, actions.len(), n_s), 1.0 / n_s as f64);
        Self {
            states,
            actions,
            probabilities,
        }
    }

    /// Wrap an already-built `(|S|, |A|, |S|)` table after validating it.
    pub fn from_dense(
        states: Arc<Space<S>>,
        actions: Arc<Space<A>>,
        probabilities: Array3<f64>,
    ) -> Result<Self> {
        let expected = (states.len(), actions.len(), states.len());
        if probabilities.dim() != expected {
            return Err(MdpError::invalid(format!(
                "transition table has shape {:?}, expected {expected:?}",
                probabilities.dim()
            )));
        }

        let mut model = Self {
            states,
            actions,
            probabilities,
        };
        model.normalize_rows()?;
        Ok(model)
    }

    /// Build from `(state, action, next_state, probability)` entries.
    ///
    /// Every `(state, action)` pair needs at least one entry; next states not
    /// mentioned in a pair's entries get probability 0.
    pub fn from_entries(
        states: Arc<Space<S>>,
        actions: Arc<Space<A>>,
        entries: impl IntoIterator<Item = (S, A, S, f64)>,
    ) -> Result<Self> {
        let n_s = states.len();
        let n_a = actions.len();
        let mut probabilities = Array3::<f64>::zeros((n_s, n_a, n_s));
        let mut assigned = Array3::from_elem((n_s, n_a, n_s), false);

        for (state, action, next_state, p) in entries {
            let s = states.require(&state)?;
            let a = actions.require(&action)?;
            let n = states.require(&next_state)?;

            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(MdpError::invalid(format!(
                    "probability for ({state:?}, {action:?}, {next_state:?}) must be in [0, 1], got {p}"
                )));
            }
            if assigned[[s, a, n]] {
                return Err(MdpError::invalid(format!(
                    "duplicate transition entry ({state:?}, {action:?}, {next_state:?})"
                )));
            }

            assigned[[s, a, n]] = true;
            probabilities[[s, a, n]] = p;
        }

        for s in 0..n_s {
            for a in 0..n_a {
                if !assigned.slice(ndarray::s![s, a, ..]).iter().any(|&x| x) {
                    return Err(MdpError::invalid(format!(
                        "missing transition row for ({:?}, {:?})",
                        states.label(s),
                        actions.label(a)
                    )));
                }
            }
        }

        let mut model = Self {
            states,
            actions,
            probabilities,
        };
        model.normalize_rows()?;
        Ok(model)
    }

    /// Reject rows further than the tolerance from 1, then rescale the rest.
    fn normalize_rows(&mut self) -> Result<()> {
        for ((s, a), &sum) in self.probabilities.sum_axis(Axis(2)).indexed_iter() {
            if !sum.is_finite() || (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
                return Err(MdpError::invalid(format!(
                    "transition probabilities for ({:?}, {:?}) sum to {sum}, expected 1",
                    self.states.label(s),
                    self.actions.label(a)
                )));
            }
            self.probabilities
                .slice_mut(ndarray::s![s, a, ..])
                .mapv_inplace(|p| p / sum);
        }
        Ok(())
    }

    pub fn states(&self) -> &Arc<Space<S>> {
        &self.states
    }

    pub fn actions(&self) -> &Arc<Space<A>> {
        &self.actions
    }

    pub fn n_states(&self) -> usize {
        self.states.len()
    }

    pub fn n_actions(&self) -> usize {
        self.actions.len()
    }

    /// `P(next_state | state, action)`, or `None` if any label is unknown.
    pub fn probability(&self, state: &S, action: &A, next_state: &S) -> Option<f64> {
        let s = self.states.index_of(state)?;
        let a = self.actions.index_of(action)?;
        let n = self.states.index_of(next_state)?;
        Some(self.probabilities[[s, a, n]])
    }

    /// Distribution over next-state indices for state index `s`, action index `a`.
    pub fn row(&self, s: usize, a: usize) -> ArrayView1<'_, f64> {
        self.probabilities.slice(ndarray::s![s, a, ..])
    }

    pub fn probabilities(&self) -> &Array3<f64> {
        &self.probabilities
    }

    /// Largest `|Σ_s' P(s'|s,a) - 1|` over all rows.
    pub fn max_row_error(&self) -> f64 {
        self.probabilities
            .sum_axis(Axis(2))
            .iter()
            .fold(0.0_f64, |acc, sum| acc.max((sum - 1.0).abs()))
    }

    /// All `(state, action, next_state, probability)` triples in canonical order.
    pub fn entries(&self) -> impl Iterator<Item = (&S, &A, &S, f64)> + '_ {
        self.probabilities
            .indexed_iter()
            .map(|((s, a, n), &p)| (self.states.label(s), self.actions.label(a), self.states.label(n), p))
    }

    /// `InvalidInput` unless `rewards` is defined over the same spaces.
    pub fn ensure_compatible(&self, rewards: &RewardModel<S, A>) -> Result<()> {
        if !same_space(&self.states, rewards.states()) {
            return Err(MdpError::invalid(
                "reward model and transition model use different state sets",
            ));
        }
        if !same_space(&self.actions, rewards.actions()) {
            return Err(MdpError::invalid(
                "reward model and transition model use different action sets",
            ));
        }
        Ok(())
    }
}

/// Dense reward table `R[s, a]`; every pair must be defined.
#[derive(Debug, Clone)]
pub struct RewardModel<S: Label, A: Label> {
    states: Arc<Space<S>>,
    actions: Arc<Space<A>>,
    rewards: Array2<f64>,
}

impl<S: Label, A: Label> RewardModel<S, A> {
    pub fn from_entries(
        states: Arc<Space<S>>,
        actions: Arc<Space<A>>,
        entries: impl IntoIterator<Item = (S, A, f64)>,
    ) -> Result<Self> {
        let mut rewards = Array2::<f64>::zeros((states.len(), actions.len()));
        let mut assigned = Array2::from_elem((states.len(), actions.len()), false);

        for (state, action, reward) in entries {
            let s = states.require(&state)?;
            let a = actions.require(&action)?;

            if !reward.is_finite() {
                return Err(MdpError::invalid(format!(
                    "reward for ({state:?}, {action:?}) is not finite: {reward}"
                )));
            }
            if assigned[[s, a]] {
                return Err(MdpError::invalid(format!(
                    "duplicate reward entry ({state:?}, {action:?})"
                )));
            }

            assigned[[s, a]] = true;
            rewards[[s, a]] = reward;
        }

        if let Some(((s, a), _)) = assigned.indexed_iter().find(|&(_, &set)| !set) {
            return Err(MdpError::invalid(format!(
                "missing reward for ({:?}, {:?})",
                states.label(s),
                actions.label(a)
            )));
        }

        Ok(Self {
            states,
            actions,
            rewards,
        })
    }

    /// Build by evaluating `reward` for every `(state, action)` pair.
    pub fn from_fn(
        states: Arc<Space<S>>,
        actions: Arc<Space<A>>,
        reward: impl Fn(&S, &A) -> f64,
    ) -> Result<Self> {
        let entries: Vec<(S, A, f64)> = states
            .iter()
            .flat_map(|s| actions.iter().map(move |a| (s.clone(), a.clone())))
            .map(|(s, a)| {
                let r = reward(&s, &a);
                (s, a, r)
            })
            .collect();
        Self::from_entries(states, actions, entries)
    }

    pub fn states(&self) -> &Arc<Space<S>> {
        &self.states
    }

    pub fn actions(&self) -> &Arc<Space<A>> {
        &self.actions
    }

    /// Reward by state and action index.
    pub fn reward(&self, s: usize, a: usize) -> f64 {
        self.rewards[[s, a]]
    }

    pub fn get(&self, state: &S, action: &A) -> Option<f64> {
        let s = self.states.index_of(state)?;
        let a = self.actions.index_of(action)?;
        Some(self.rewards[[s, a]])
    }

    pub fn table(&self) -> &Array2<f64> {
        &self.rewards
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spaces() -> (Arc<Space<u32>>, Arc<Space<char>>) {
        (
            Space::shared("state", [0, 1]).unwrap(),
            Space::shared("action", ['a', 'b']).unwrap(),
        )
    }

    #[test]
    fn test_discount_range() {
        assert!(Discount::new(0.0).is_ok());
        assert!(Discount::new(0.99).is_ok());
        assert!(Discount::new(1.0).is_err());
        assert!(Discount::new(-0.1).is_err());
        assert!(Discount::new(f64::NAN).is_err());
        assert_eq!(Discount::new(0.9).unwrap().value(), 0.9);
    }

    #[test]
    fn test_discount_deserialize_validates() {
        let gamma: Discount = serde_json::from_str("0.5").unwrap();
        assert_eq!(gamma.value(), 0.5);
        assert!(serde_json::from_str::<Discount>("1.5").is_err());
    }

    #[test]
    fn test_uniform_model() {
        let (states, actions) = spaces();
        let model = TransitionModel::uniform(states, actions);

        assert_eq!(model.probability(&0, &'a', &1), Some(0.5));
        assert!(model.max_row_error() < 1e-12);
    }

    #[test]
    fn test_from_entries_sparse_rows() {
        let (states, actions) = spaces();
        let model = TransitionModel::from_entries(
            states,
            actions,
            vec![
                (0, 'a', 1, 1.0),
                (0, 'b', 0, 0.25),
                (0, 'b', 1, 0.75),
                (1, 'a', 1, 1.0),
                (1, 'b', 0, 1.0),
            ],
        )
        .unwrap();

        assert_eq!(model.probability(&0, &'a', &0), Some(0.0));
        assert_eq!(model.probability(&0, &'b', &1), Some(0.75));
        assert_eq!(model.probability(&2, &'a', &0), None);
        assert_eq!(model.entries().count(), 8);
    }

    #[test]
    fn test_from_entries_missing_row() {
        let (states, actions) = spaces();
        let err = TransitionModel::from_entries(
            states,
            actions,
            vec![(0, 'a', 1, 1.0), (0, 'b', 0, 1.0), (1, 'a', 1, 1.0)],
        )
        .unwrap_err();

        assert!(err.to_string().contains("missing transition row for (1, 'b')"));
    }

    #[test]
    fn test_from_entries_bad_sum() {
        let (states, actions) = spaces();
        let err = TransitionModel::from_entries(
            states,
            actions,
            vec![
                (0, 'a', 1, 0.5),
                (0, 'b', 0, 1.0),
                (1, 'a', 1, 1.0),
                (1, 'b', 0, 1.0),
            ],
        )
        .unwrap_err();

        assert!(err.to_string().contains("sum to 0.5"));
    }

    #[test]
    fn test_near_one_rows_are_rescaled() {
        let (states, actions) = spaces();
        let model = TransitionModel::from_entries(
            states,
            actions,
            vec![
                (0, 'a', 0, 0.5),
                (0, 'a', 1, 0.500_000_5),
                (0, 'b', 0, 1.0),
                (1, 'a', 1, 1.0),
                (1, 'b', 0, 1.0),
            ],
        )
        .unwrap();

        assert!(model.max_row_error() <= 1e-9);
        assert!((model.probability(&0, &'a', &1).unwrap() - 0.500_000_5 / 1.000_000_5).abs() < 1e-12);
    }

    #[test]
    fn test_from_dense_rescales_rows() {
        let (states, actions) = spaces();
        let mut probabilities = Array3::<f64>::zeros((2, 2, 2));
        probabilities.fill(0.5);
        probabilities[[1, 0, 0]] = 0.499_999_6;

        let model = TransitionModel::from_dense(states, actions, probabilities).unwrap();
        assert!(model.max_row_error() <= 1e-9);
    }

    #[test]
    fn test_from_entries_rejects_unknown_and_out_of_range() {
        let (states, actions) = spaces();
        let unknown =
            TransitionModel::from_entries(states.clone(), actions.clone(), vec![(0, 'z', 1, 1.0)]);
        assert!(unknown.unwrap_err().to_string().contains("unknown action label"));

        let negative = TransitionModel::from_entries(states, actions, vec![(0, 'a', 1, -0.1)]);
        assert!(negative.unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_from_dense_shape_checked() {
        let (states, actions) = spaces();
        let err = TransitionModel::from_dense(states, actions, Array3::zeros((2, 2, 3))).unwrap_err();
        assert!(err.to_string().contains("shape"));
    }

    #[test]
    fn test_rewards_require_every_pair() {
        let (states, actions) = spaces();
        let err = RewardModel::from_entries(
            states.clone(),
            actions.clone(),
            vec![(0, 'a', 1.0), (0, 'b', 2.0), (1, 'a', 3.0)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing reward for (1, 'b')"));

        let rewards = RewardModel::from_fn(states, actions, |s, a| {
            f64::from(*s) * 10.0 + if *a == 'a' { 1.0 } else { 2.0 }
        })
        .unwrap();
        assert_eq!(rewards.get(&1, &'b'), Some(12.0));
        assert_eq!(rewards.reward(0, 0), 1.0);
    }

    #[test]
    fn test_duplicate_reward_rejected() {
        let (states, actions) = spaces();
        let err = RewardModel::from_entries(states, actions, vec![(0, 'a', 1.0), (0, 'a', 2.0)])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate reward entry"));
    }

    #[test]
    fn test_ensure_compatible() {
        let (states, actions) = spaces();
        let model = TransitionModel::uniform(states.clone(), actions.clone());
        let rewards = RewardModel::from_fn(states, actions, |_, _| 0.0).unwrap();
        assert!(model.ensure_compatible(&rewards).is_ok());

        let other_states = Space::shared("state", [0, 1, 2]).unwrap();
        let other_actions = Space::shared("action", ['a', 'b']).unwrap();
        let other = RewardModel::from_fn(other_states, other_actions, |_, _| 0.0).unwrap();
        assert!(model.ensure_compatible(&other).is_err());
    }
}
