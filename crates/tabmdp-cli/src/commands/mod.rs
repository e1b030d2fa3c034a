//! CLI command modules

pub mod config;
pub mod demo;
pub mod estimate;
pub mod solve;
