//! tabmdp RL - Planning algorithms for tabular MDPs
//!
//! This crate provides maximum-likelihood transition estimation, policy
//! evaluation, greedy policy improvement and the policy-iteration loop that
//! ties them together.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::similar_names)]

pub mod estimator;
pub mod evaluator;
pub mod improver;
pub mod solver;

pub use estimator::{estimate, TransitionCounts};
pub use evaluator::{evaluate, Evaluation, DEFAULT_TOLERANCE};
pub use improver::{action_values, improve, ActionValues};
pub use solver::{
    InitialPolicy, IterationRecord, LearnedSolution, Phase, PolicyIteration, Solution,
    SolveStatus, SolverConfig,
};
