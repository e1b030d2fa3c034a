//! Deterministic policies and state value functions

use std::sync::Arc;

use ndarray::Array1;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{MdpError, Result};
use crate::space::{same_space, Label, Space};

/// A deterministic, stationary policy: exactly one action per state.
#[derive(Debug, Clone)]
pub struct Policy<S: Label, A: Label> {
    states: Arc<Space<S>>,
    actions: Arc<Space<A>>,
    choices: Vec<usize>,
}

impl<S: Label, A: Label> Policy<S, A> {
    /// Build from action indices, one per state in state-space order.
    pub fn from_indices(
        states: Arc<Space<S>>,
        actions: Arc<Space<A>>,
        choices: Vec<usize>,
    ) -> Result<Self> {
        if choices.len() != states.len() {
            return Err(MdpError::invalid(format!(
                "policy covers {} states, expected {}",
                choices.len(),
                states.len()
            )));
        }
        if let Some(&bad) = choices.iter().find(|&&a| a >= actions.len()) {
            return Err(MdpError::invalid(format!(
                "policy action index {bad} out of range for {} actions",
                actions.len()
            )));
        }

        Ok(Self {
            states,
            actions,
            choices,
        })
    }

    /// Build from `(state, action)` pairs; every state must be assigned exactly once.
    pub fn from_pairs(
        states: Arc<Space<S>>,
        actions: Arc<Space<A>>,
        pairs: impl IntoIterator<Item = (S, A)>,
    ) -> Result<Self> {
        let mut choices: Vec<Option<usize>> = vec![None; states.len()];
        for (state, action) in pairs {
            let s = states.require(&state)?;
            let a = actions.require(&action)?;
            if choices[s].replace(a).is_some() {
                return Err(MdpError::invalid(format!(
                    "policy assigns state {state:?} more than once"
                )));
            }
        }

        let choices = choices
            .into_iter()
            .enumerate()
            .map(|(s, a)| {
                a.ok_or_else(|| {
                    MdpError::invalid(format!("policy has no action for state {:?}", states.label(s)))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            states,
            actions,
            choices,
        })
    }

    /// The same action everywhere.
    pub fn constant(states: Arc<Space<S>>, actions: Arc<Space<A>>, action: usize) -> Result<Self> {
        let choices = vec![action; states.len()];
        Self::from_indices(states, actions, choices)
    }

    pub fn states(&self) -> &Arc<Space<S>> {
        &self.states
    }

    pub fn actions(&self) -> &Arc<Space<A>> {
        &self.actions
    }

    /// Action index chosen in state index `s`.
    pub fn choice(&self, s: usize) -> usize {
        self.choices[s]
    }

    pub fn choices(&self) -> &[usize] {
        &self.choices
    }

    pub fn action(&self, state: &S) -> Option<&A> {
        let s = self.states.index_of(state)?;
        Some(self.actions.label(self.choices[s]))
    }

    /// `(state, action)` pairs in state order.
    pub fn iter(&self) -> impl Iterator<Item = (&S, &A)> + '_ {
        self.states
            .iter()
            .zip(&self.choices)
            .map(|(s, &a)| (s, self.actions.label(a)))
    }

    /// Number of states where `self` and `other` pick different actions.
    pub fn differences(&self, other: &Self) -> Result<usize> {
        other.ensure_spaces(&self.states, &self.actions)?;
        Ok(self
            .choices
            .iter()
            .zip(&other.choices)
            .filter(|(a, b)| a != b)
            .count())
    }

    /// `InvalidInput` unless the policy is defined over the given spaces.
    pub fn ensure_spaces(&self, states: &Arc<Space<S>>, actions: &Arc<Space<A>>) -> Result<()> {
        if !same_space(&self.states, states) || !same_space(&self.actions, actions) {
            return Err(MdpError::invalid(
                "policy is defined over a different state or action set than the model",
            ));
        }
        Ok(())
    }
}

/// State-for-state, action-for-action equality.
impl<S: Label, A: Label> PartialEq for Policy<S, A> {
    fn eq(&self, other: &Self) -> bool {
        self.choices == other.choices
            && same_space(&self.states, &other.states)
            && same_space(&self.actions, &other.actions)
    }
}

impl<S: Label, A: Label> Eq for Policy<S, A> {}

impl<S, A> Serialize for Policy<S, A>
where
    S: Label + Serialize,
    A: Label + Serialize,
{
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> std::result::Result<Ser::Ok, Ser::Error> {
        let mut map = serializer.serialize_map(Some(self.choices.len()))?;
        for (state, action) in self.iter() {
            map.serialize_entry(state, action)?;
        }
        map.end()
    }
}

/// Expected discounted return from every state.
#[derive(Debug, Clone)]
pub struct ValueFunction<S: Label> {
    states: Arc<Space<S>>,
    values: Array1<f64>,
}

impl<S: Label> ValueFunction<S> {
    /// All-zero values, the starting point of every evaluation.
    pub fn zeros(states: Arc<Space<S>>) -> Self {
        let values = Array1::zeros(states.len());
        Self { states, values }
    }

    pub fn from_array(states: Arc<Space<S>>, values: Array1<f64>) -> Result<Self> {
        if values.len() != states.len() {
            return Err(MdpError::invalid(format!(
                "value function has {} entries, expected {}",
                values.len(),
                states.len()
            )));
        }
        Ok(Self { states, values })
    }

    pub fn states(&self) -> &Arc<Space<S>> {
        &self.states
    }

    pub fn get(&self, state: &S) -> Option<f64> {
        self.states.index_of(state).map(|s| self.values[s])
    }

    /// Value by state index.
    pub fn at(&self, s: usize) -> f64 {
        self.values[s]
    }

    pub fn as_array(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn into_array(self) -> Array1<f64> {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, f64)> + '_ {
        self.states.iter().zip(self.values.iter().copied())
    }

    /// `max_s |self[s] - other[s]|`
    pub fn max_abs_diff(&self, other: &Self) -> Result<f64> {
        self.ensure_same_states(other)?;
        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .fold(0.0_f64, |acc, (a, b)| acc.max((a - b).abs())))
    }

    /// True if no state is worse than in `other` by more than `slack`.
    pub fn dominates(&self, other: &Self, slack: f64) -> Result<bool> {
        self.ensure_same_states(other)?;
        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .all(|(a, b)| *a >= *b - slack))
    }

    fn ensure_same_states(&self, other: &Self) -> Result<()> {
        if !same_space(&self.states, &other.states) {
            return Err(MdpError::invalid(
                "value functions are defined over different state sets",
            ));
        }
        Ok(())
    }
}

impl<S> Serialize for ValueFunction<S>
where
    S: Label + Serialize,
{
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> std::result::Result<Ser::Ok, Ser::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (state, value) in self.iter() {
            map.serialize_entry(state, &value)?;
        }
        map.end()
    }
}
