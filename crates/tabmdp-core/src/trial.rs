//! Observed transitions and the append-only trial log

use serde::{Deserialize, Serialize};

/// A single observed transition (s, a, s')
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trial<S, A> {
    pub state: S,
    pub action: A,
    pub next_state: S,
}

impl<S, A> Trial<S, A> {
    pub fn new(state: S, action: A, next_state: S) -> Self {
        Self {
            state,
            action,
            next_state,
        }
    }
}

impl<S, A> From<(S, A, S)> for Trial<S, A> {
    fn from((state, action, next_state): (S, A, S)) -> Self {
        Self::new(state, action, next_state)
    }
}

/// Ordered log of observed transitions. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialLog<S, A> {
    trials: Vec<Trial<S, A>>,
}

impl<S, A> TrialLog<S, A> {
    pub fn new() -> Self {
        Self { trials: Vec::new() }
    }

    /// Append one observation
    pub fn push(&mut self, trial: impl Into<Trial<S, A>>) {
        self.trials.push(trial.into());
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trial<S, A>> {
        self.trials.iter()
    }

    pub fn as_slice(&self) -> &[Trial<S, A>] {
        &self.trials
    }
}

impl<S, A> Default for TrialLog<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A, T: Into<Trial<S, A>>> Extend<T> for TrialLog<S, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.trials.extend(iter.into_iter().map(Into::into));
    }
}

impl<S, A, T: Into<Trial<S, A>>> FromIterator<T> for TrialLog<S, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut log = Self::new();
        log.extend(iter);
        log
    }
}

impl<'a, S, A> IntoIterator for &'a TrialLog<S, A> {
    type Item = &'a Trial<S, A>;
    type IntoIter = std::slice::Iter<'a, Trial<S, A>>;

    fn into_iter(self) -> Self::IntoIter {
        self.trials.iter()
    }
}
