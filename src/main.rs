//! Deployer CLI entrypoint.
//!
//! This is the main entrypoint for the `deployer` command-line tool.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use jee_deployer::cli::{Cli, Commands, OutputFormatter};
use jee_deployer::config::{ConfigParser, ConfigValidator, DeployerConfig, ValidationResult, find_config_file};
use jee_deployer::container::{Container, STARTUP_TIMEOUT};
use jee_deployer::error::{DeployerError, Result};
use jee_deployer::plan::{Plan, PlanLoader};
use jee_deployer::reconciler::Deployer;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code for plan, configuration and reconciliation errors.
const EXIT_CLIENT_ERROR: u8 = 2;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);
    match runtime.block_on(run(cli, &formatter)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", formatter.error(&e));
            if e.is_client_error() {
                ExitCode::from(EXIT_CLIENT_ERROR)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Initializes the logging system. `RUST_LOG` takes precedence over the
/// verbosity flag.
fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Apply { plan, wait_for_boot } => cmd_apply(&config, plan.as_deref(), wait_for_boot, formatter).await,
        Commands::Diff { plan } => cmd_diff(&config, plan.as_deref(), formatter).await,
        Commands::Validate { plan, warnings } => cmd_validate(&config, plan.as_deref(), warnings, formatter),
        Commands::Effective => cmd_effective(&config, formatter).await,
    }
}

/// Apply a plan.
async fn cmd_apply(
    config: &DeployerConfig,
    plan_path: Option<&Path>,
    wait_for_boot: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let plan = load_plan(config, plan_path)?;
    let mut deployer = create_deployer(config)?;

    if wait_for_boot {
        info!("Waiting for the server to be running");
        deployer.container().wait_for_boot(STARTUP_TIMEOUT).await?;
    }

    let report = deployer.run(&plan).await?;
    println!("{}", formatter.format_report(&report)?);
    Ok(())
}

/// Show what a plan would change.
async fn cmd_diff(
    config: &DeployerConfig,
    plan_path: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let plan = load_plan(config, plan_path)?;
    let mut deployer = create_deployer(config)?;

    let dry_run = deployer.dry_run(&plan).await?;
    println!("{}", formatter.format_dry_run(&dry_run)?);
    Ok(())
}

/// Validate configuration and plan.
fn cmd_validate(
    config: &DeployerConfig,
    plan_path: Option<&Path>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let validation: ValidationResult = ConfigValidator::new().validate(config)?;
    config.reconcile_config()?;
    let plan = load_plan(config, plan_path)?;

    println!("{}", formatter.format_validation(&plan, &validation, show_warnings)?);
    Ok(())
}

/// Print the effective plan.
async fn cmd_effective(config: &DeployerConfig, formatter: &OutputFormatter) -> Result<()> {
    let deployer = create_deployer(config)?;
    let plan = deployer.effective_plan().await?;
    println!("{}", formatter.format_effective(&plan)?);
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Loads the configuration from the given file, the nearest
/// `deployer.config.yaml`, or the defaults, then applies `.env` and
/// environment overrides.
fn load_config(config_path: Option<&PathBuf>) -> Result<DeployerConfig> {
    let config_file = match config_path {
        Some(path) => Some(path.clone()),
        None => match find_config_file(".") {
            Ok(path) => Some(path),
            Err(DeployerError::Config(_)) => {
                warn!("No configuration file found, using defaults");
                None
            }
            Err(e) => return Err(e),
        },
    };

    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let parser = ConfigParser::new().with_base_path(&base_dir);
    parser.load_dotenv()?;

    let config = match &config_file {
        Some(path) => parser.load_with_env(path)?,
        None => {
            let mut config = DeployerConfig::default();
            ConfigParser::apply_env_overrides(&mut config);
            config
        }
    };

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Loads the plan given on the command line, or the configured one.
fn load_plan(config: &DeployerConfig, plan_path: Option<&Path>) -> Result<Plan> {
    let path = plan_path.unwrap_or(&config.plan.0);
    debug!("Plan file: {}", path.display());
    PlanLoader::new().with_defaults(config.defaults.clone()).load_file(&path)
}

/// Creates a deployer for the configured container and repository.
fn create_deployer(config: &DeployerConfig) -> Result<Deployer> {
    let client = config.container.client()?;
    let container = Container::new(Arc::new(client)).with_not_found_matcher(config.container.not_found_matcher());
    let repository = config.repository.repository()?;
    Ok(Deployer::new(container, Arc::new(repository), config.reconcile_config()?))
}
