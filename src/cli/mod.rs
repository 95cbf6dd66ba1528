//! CLI module for the deployer.
//!
//! This module provides the command-line interface for applying plans to
//! an application server.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
