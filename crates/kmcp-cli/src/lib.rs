//! CLI argument model and validation for the kube-mcp server binary.
//!
//! Exposes the clap-backed `Cli` plus helpers that turn parsed flags into the
//! workspace layout and operation settings used at startup.

pub mod cli_args;
pub mod cli_types;
pub mod validation;

pub use cli_args::Cli;
pub use cli_types::*;
pub use validation::*;
