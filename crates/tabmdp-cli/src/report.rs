//! Solve and estimate reports, rendered as text tables or JSON

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use tabmdp_core::{Policy, TransitionModel, ValueFunction};
use tabmdp_rl::{ActionValues, Solution, SolveStatus};

/// One non-zero entry of a transition table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRow {
    pub state: String,
    pub action: String,
    pub next_state: String,
    pub probability: f64,
}

/// Non-zero entries of `model`, in state/action/next-state order
pub fn transition_rows(model: &TransitionModel<String, String>) -> Vec<TransitionRow> {
    model
        .entries()
        .filter(|&(_, _, _, p)| p > 0.0)
        .map(|(state, action, next_state, probability)| TransitionRow {
            state: state.clone(),
            action: action.clone(),
            next_state: next_state.clone(),
            probability,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct IterationSummary {
    pub iteration: usize,
    pub sweeps: usize,
    pub evaluation_converged: bool,
    pub changed_states: usize,
}

/// Everything `tabmdp solve` reports about one run
#[derive(Debug, Clone, Serialize)]
pub struct SolveReport {
    pub id: Uuid,
    pub problem: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub gamma: f64,
    pub status: SolveStatus,
    pub iterations: usize,
    pub total_sweeps: usize,
    pub policy: Policy<String, String>,
    pub values: ValueFunction<String>,
    pub q_values: ActionValues<String, String>,
    pub history: Vec<IterationSummary>,
    /// Present when the model was estimated from trials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_transitions: Option<Vec<TransitionRow>>,
}

impl SolveReport {
    pub fn new(
        problem: impl Into<String>,
        started_at: DateTime<Utc>,
        gamma: f64,
        solution: Solution<String, String>,
        q_values: ActionValues<String, String>,
        estimated: Option<&TransitionModel<String, String>>,
    ) -> Self {
        let history = solution
            .history
            .iter()
            .map(|record| IterationSummary {
                iteration: record.iteration,
                sweeps: record.sweeps,
                evaluation_converged: record.evaluation_converged,
                changed_states: record.changed_states,
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            problem: problem.into(),
            started_at,
            finished_at: Utc::now(),
            gamma,
            status: solution.status,
            iterations: solution.iterations,
            total_sweeps: solution.total_sweeps(),
            policy: solution.policy,
            values: solution.values,
            q_values,
            history,
            estimated_transitions: estimated.map(transition_rows),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self, precision: usize) -> String {
        let elapsed = self.finished_at - self.started_at;
        let mut out = format!(
            "Policy Iteration: {}\n{}\n",
            self.problem,
            "=".repeat(18 + self.problem.len())
        );
        out.push_str(&format!("Run:        {}\n", self.id));
        out.push_str(&format!("Status:     {}\n", self.status));
        out.push_str(&format!("Iterations: {}\n", self.iterations));
        out.push_str(&format!("Sweeps:     {}\n", self.total_sweeps));
        out.push_str(&format!("Gamma:      {}\n", self.gamma));
        out.push_str(&format!("Elapsed:    {} ms\n\n", elapsed.num_milliseconds()));

        let actions = self.q_values.actions();
        let state_width = column_width(self.policy.states().iter(), "STATE");
        let action_width = column_width(actions.iter(), "ACTION");
        let number_width = precision + 8;

        out.push_str(&format!(
            "{:<state_width$} {:<action_width$} {:>number_width$}",
            "STATE", "ACTION", "VALUE"
        ));
        for action in actions.iter() {
            out.push_str(&format!(" {:>number_width$}", format!("Q[{action}]")));
        }
        out.push('\n');
        out.push_str(&"-".repeat(
            state_width + action_width + (number_width + 1) * (actions.len() + 1) + 1,
        ));
        out.push('\n');

        for (s, (state, action)) in self.policy.iter().enumerate() {
            out.push_str(&format!(
                "{:<state_width$} {:<action_width$} {:>number_width$.precision$}",
                state,
                action,
                self.values.at(s)
            ));
            for a in 0..actions.len() {
                out.push_str(&format!(" {:>number_width$.precision$}", self.q_values.at(s, a)));
            }
            out.push('\n');
        }

        if let Some(rows) = &self.estimated_transitions {
            out.push_str("\nEstimated transitions\n");
            out.push_str(&render_transitions(rows, precision));
        }

        out
    }
}

/// Everything `tabmdp estimate` reports
#[derive(Debug, Clone, Serialize)]
pub struct EstimateReport {
    pub id: Uuid,
    pub problem: String,
    pub created_at: DateTime<Utc>,
    pub trials: usize,
    /// (state, action) pairs with at least one trial
    pub observed_pairs: usize,
    pub total_pairs: usize,
    pub transitions: Vec<TransitionRow>,
}

impl EstimateReport {
    pub fn new(
        problem: impl Into<String>,
        trials: usize,
        observed_pairs: usize,
        model: &TransitionModel<String, String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            problem: problem.into(),
            created_at: Utc::now(),
            trials,
            observed_pairs,
            total_pairs: model.n_states() * model.n_actions(),
            transitions: transition_rows(model),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self, precision: usize) -> String {
        let mut out = format!(
            "Transition estimate: {}\nTrials:         {}\nObserved pairs: {} of {}\n\n",
            self.problem, self.trials, self.observed_pairs, self.total_pairs
        );
        out.push_str(&render_transitions(&self.transitions, precision));
        out
    }
}

fn column_width<'a>(labels: impl Iterator<Item = &'a String>, header: &str) -> usize {
    labels.map(String::len).max().unwrap_or(0).max(header.len())
}

fn render_transitions(rows: &[TransitionRow], precision: usize) -> String {
    let state_width = column_width(rows.iter().map(|r| &r.state), "STATE");
    let action_width = column_width(rows.iter().map(|r| &r.action), "ACTION");
    let next_width = column_width(rows.iter().map(|r| &r.next_state), "NEXT");

    let mut out = format!(
        "{:<state_width$} {:<action_width$} {:<next_width$} {:>12}\n{}\n",
        "STATE",
        "ACTION",
        "NEXT",
        "PROBABILITY",
        "-".repeat(state_width + action_width + next_width + 15)
    );
    for row in rows {
        out.push_str(&format!(
            "{:<state_width$} {:<action_width$} {:<next_width$} {:>12.precision$}\n",
            row.state, row.action, row.next_state, row.probability
        ));
    }
    out
}
