//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Deployer - declarative configuration of a JEE application server.
#[derive(Parser, Debug)]
#[command(name = "deployer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "DEPLOYER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, yaml).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply a plan to the container and print the audits.
    Apply {
        /// Plan file (defaults to the configured plan).
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Wait for the server to be running before reading anything.
        #[arg(long)]
        wait_for_boot: bool,
    },

    /// Show the operations and audits a plan would produce, without applying them.
    Diff {
        /// Plan file (defaults to the configured plan).
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },

    /// Load and validate a plan and the configuration.
    Validate {
        /// Plan file (defaults to the configured plan).
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Print the live, unpinned resources as a plan.
    Effective,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
    /// YAML output.
    Yaml,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
