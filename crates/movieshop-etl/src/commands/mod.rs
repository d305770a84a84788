//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod repair;
pub mod run;
pub mod show;
pub mod tables;
