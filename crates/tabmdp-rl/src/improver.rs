//! Greedy policy improvement

use std::sync::Arc;

use ndarray::{Array2, ArrayView1};
use serde::ser::{Serialize, SerializeMap, Serializer};

use tabmdp_core::{
    same_space, Discount, Label, MdpError, Policy, Result, RewardModel, Space, TransitionModel,
    ValueFunction,
};

use crate::evaluator::backup;

/// Action values `Q(s, a) = Σ_s' P(s'|s,a) · (R(s,a) + γ·V(s'))` for every pair.
#[derive(Debug, Clone)]
pub struct ActionValues<S: Label, A: Label> {
    states: Arc<Space<S>>,
    actions: Arc<Space<A>>,
    q: Array2<f64>,
}

impl<S: Label, A: Label> ActionValues<S, A> {
    pub fn states(&self) -> &Arc<Space<S>> {
        &self.states
    }

    pub fn actions(&self) -> &Arc<Space<A>> {
        &self.actions
    }

    pub fn get(&self, state: &S, action: &A) -> Option<f64> {
        let s = self.states.index_of(state)?;
        let a = self.actions.index_of(action)?;
        Some(self.q[[s, a]])
    }

    /// Value by state and action index.
    pub fn at(&self, s: usize, a: usize) -> f64 {
        self.q[[s, a]]
    }

    pub fn table(&self) -> &Array2<f64> {
        &self.q
    }

    /// Index of the best action in state index `s`.
    ///
    /// Ties go to the action that comes first in the action space: a later
    /// action only takes over when strictly better.
    pub fn greedy(&self, s: usize) -> usize {
        first_argmax(self.q.row(s))
    }
}

fn first_argmax(row: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (a, &value) in row.iter().enumerate() {
        if value > best_value {
            best = a;
            best_value = value;
        }
    }
    best
}

impl<S, A> Serialize for ActionValues<S, A>
where
    S: Label + Serialize,
    A: Label + Serialize,
{
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> std::result::Result<Ser::Ok, Ser::Error> {
        let mut outer = serializer.serialize_map(Some(self.states.len()))?;
        for (s, state) in self.states.iter().enumerate() {
            let row: Vec<(&A, f64)> = self
                .actions
                .iter()
                .enumerate()
                .map(|(a, action)| (action, self.q[[s, a]]))
                .collect();
            outer.serialize_entry(state, &RowMap(&row))?;
        }
        outer.end()
    }
}

struct RowMap<'a, A>(&'a [(&'a A, f64)]);

impl<A: Serialize> Serialize for RowMap<'_, A> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> std::result::Result<Ser::Ok, Ser::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (action, value) in self.0 {
            map.serialize_entry(action, value)?;
        }
        map.end()
    }
}

/// Compute the full Q table for `values`.
pub fn action_values<S: Label, A: Label>(
    values: &ValueFunction<S>,
    model: &TransitionModel<S, A>,
    rewards: &RewardModel<S, A>,
    gamma: Discount,
) -> Result<ActionValues<S, A>> {
    model.ensure_compatible(rewards)?;
    if !same_space(values.states(), model.states()) {
        return Err(MdpError::invalid(
            "value function is defined over a different state set than the model",
        ));
    }

    let gamma = gamma.value();
    let v = values.as_array().view();
    let q = Array2::from_shape_fn((model.n_states(), model.n_actions()), |(s, a)| {
        backup(model, rewards, gamma, v, s, a)
    });

    Ok(ActionValues {
        states: model.states().clone(),
        actions: model.actions().clone(),
        q,
    })
}

/// Greedy policy with respect to `values`.
///
/// Pure: `values` is only read. Ties resolve to the first action in the
/// model's action order, so the result is deterministic.
pub fn improve<S: Label, A: Label>(
    values: &ValueFunction<S>,
    model: &TransitionModel<S, A>,
    rewards: &RewardModel<S, A>,
    gamma: Discount,
) -> Result<Policy<S, A>> {
    let q = action_values(values, model, rewards, gamma)?;
    let choices = (0..model.n_states()).map(|s| q.greedy(s)).collect();
    Policy::from_indices(model.states().clone(), model.actions().clone(), choices)
}
