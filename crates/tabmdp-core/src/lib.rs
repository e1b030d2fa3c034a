//! tabmdp Core - Shared types for tabular Markov Decision Processes
//!
//! This crate provides the foundational types used across all tabmdp components:
//! label spaces, transition and reward models, policies, value functions,
//! trial logs and the on-disk problem format.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod error;
pub mod model;
pub mod policy;
pub mod problem;
pub mod space;
pub mod trial;

pub use error::{MdpError, Result};
pub use model::{Discount, RewardModel, TransitionModel, PROBABILITY_SUM_TOLERANCE};
pub use policy::{Policy, ValueFunction};
pub use problem::{Problem, ProblemFile, RawLabel, TransitionSource};
pub use space::{same_space, Label, Space};
pub use trial::{Trial, TrialLog};
