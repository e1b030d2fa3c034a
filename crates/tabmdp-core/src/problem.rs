//! Problem files: states, actions, rewards and either trials or a known model
//!
//! Labels are read as strings; integer labels in the file (`states = [0, 1]`)
//! are accepted and converted, so `0` and `"0"` name the same state.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{MdpError, Result};
use crate::model::{Discount, RewardModel, TransitionModel};
use crate::space::Space;
use crate::trial::{Trial, TrialLog};

/// A state or action label as written in a problem file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawLabel {
    Int(i64),
    Text(String),
}

impl From<RawLabel> for String {
    fn from(label: RawLabel) -> Self {
        match label {
            RawLabel::Int(i) => i.to_string(),
            RawLabel::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewardEntry {
    pub state: RawLabel,
    pub action: RawLabel,
    pub reward: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrialEntry {
    pub state: RawLabel,
    pub action: RawLabel,
    pub next_state: RawLabel,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionEntry {
    pub state: RawLabel,
    pub action: RawLabel,
    pub next_state: RawLabel,
    pub probability: f64,
}

/// On-disk problem description (TOML or JSON).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProblemFile {
    pub states: Vec<RawLabel>,
    pub actions: Vec<RawLabel>,
    #[serde(default)]
    pub gamma: Option<f64>,
    pub rewards: Vec<RewardEntry>,
    #[serde(default)]
    pub trials: Option<Vec<TrialEntry>>,
    #[serde(default)]
    pub transitions: Option<Vec<TransitionEntry>>,
}

/// Where the transition dynamics of a problem come from.
#[derive(Debug, Clone)]
pub enum TransitionSource<S: crate::Label, A: crate::Label> {
    /// Probabilities supplied directly
    Known(TransitionModel<S, A>),
    /// Probabilities to be estimated from observed trials
    Trials(TrialLog<S, A>),
}

/// A validated problem, ready for the solver.
#[derive(Debug, Clone)]
pub struct Problem {
    pub states: Arc<Space<String>>,
    pub actions: Arc<Space<String>>,
    pub gamma: Discount,
    pub rewards: RewardModel<String, String>,
    pub source: TransitionSource<String, String>,
}

impl ProblemFile {
    /// Load a problem file, picking the format from the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        debug!("Loaded problem file: {:?} ({} bytes)", path, content.len());

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(MdpError::invalid(format!(
                "unsupported problem file extension {other:?}, expected .toml or .json"
            ))),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Validate labels, rewards and transitions. `default_gamma` applies when
    /// the file does not set one.
    pub fn into_problem(self, default_gamma: f64) -> Result<Problem> {
        let states = Space::shared("state", self.states.into_iter().map(String::from))?;
        let actions = Space::shared("action", self.actions.into_iter().map(String::from))?;
        let gamma = Discount::new(self.gamma.unwrap_or(default_gamma))?;

        let rewards = RewardModel::from_entries(
            states.clone(),
            actions.clone(),
            self.rewards
                .into_iter()
                .map(|r| (String::from(r.state), String::from(r.action), r.reward)),
        )?;

        let source = match (self.transitions, self.trials) {
            (Some(transitions), trials) => {
                if trials.is_some() {
                    warn!("Problem defines both transitions and trials; ignoring trials");
                }
                let entries = transitions.into_iter().map(|t| {
                    (
                        String::from(t.state),
                        String::from(t.action),
                        String::from(t.next_state),
                        t.probability,
                    )
                });
                TransitionSource::Known(TransitionModel::from_entries(
                    states.clone(),
                    actions.clone(),
                    entries,
                )?)
            }
            (None, trials) => TransitionSource::Trials(
                trials
                    .unwrap_or_default()
                    .into_iter()
                    .map(|t| {
                        Trial::new(
                            String::from(t.state),
                            String::from(t.action),
                            String::from(t.next_state),
                        )
                    })
                    .collect(),
            ),
        };

        Ok(Problem {
            states,
            actions,
            gamma,
            rewards,
            source,
        })
    }
}
