//! Configuration parser for loading configuration files.
//!
//! This module handles loading configuration from YAML files, `.env` files
//! and environment variables, with environment variables taking precedence.

use crate::error::{ConfigError, DeployerError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::{DeployerConfig, PlanLocation};

/// Environment variable overriding `container.url`.
pub const ENV_CONTAINER_URL: &str = "DEPLOYER_CONTAINER_URL";
/// Environment variable overriding `container.user`.
pub const ENV_CONTAINER_USER: &str = "DEPLOYER_CONTAINER_USER";
/// Environment variable overriding `container.password`.
pub const ENV_CONTAINER_PASSWORD: &str = "DEPLOYER_CONTAINER_PASSWORD";
/// Environment variable overriding `plan`.
pub const ENV_PLAN: &str = "DEPLOYER_PLAN";
/// Environment variable overriding `managed`, comma separated.
pub const ENV_MANAGED: &str = "DEPLOYER_MANAGED";

/// Configuration parser for loading deployer configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DeployerConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(DeployerError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            DeployerError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        let mut config = self.parse_yaml(&content, Some(path))?;
        if let Some(base) = path.parent() {
            self.resolve_plan(&mut config, base);
        }
        Ok(config)
    }

    /// Parses configuration from a YAML string. An empty document yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<DeployerConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(DeployerConfig::default());
        }

        let config: DeployerConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            DeployerError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Container management interface at {}", config.container.url);
        Ok(config)
    }

    /// Relative plan paths are relative to the configuration file, unless a
    /// base path was set.
    fn resolve_plan(&self, config: &mut DeployerConfig, config_dir: &Path) {
        if config.plan.0.is_relative() {
            let base = self.base_path.as_deref().unwrap_or(config_dir);
            config.plan = PlanLocation(base.join(&config.plan.0));
        }
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Environment variables are named `DEPLOYER_<SECTION>_<KEY>` (e.g.,
    /// `DEPLOYER_CONTAINER_URL`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<DeployerConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides(config: &mut DeployerConfig) {
        Self::apply_overrides(config, |name| std::env::var(name).ok());
    }

    /// Applies overrides looked up by variable name.
    pub fn apply_overrides(config: &mut DeployerConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_CONTAINER_URL) {
            debug!("Overriding container.url from environment");
            config.container.url = url;
        }

        if let Some(user) = lookup(ENV_CONTAINER_USER) {
            debug!("Overriding container.user from environment");
            config.container.user = Some(user);
        }

        if let Some(password) = lookup(ENV_CONTAINER_PASSWORD) {
            debug!("Overriding container.password from environment");
            config.container.password = Some(password);
        }

        if let Some(plan) = lookup(ENV_PLAN) {
            debug!("Overriding plan from environment");
            config.plan = PlanLocation(PathBuf::from(plan));
        }

        if let Some(managed) = lookup(ENV_MANAGED) {
            debug!("Overriding managed from environment");
            config.managed = managed
                .split(',')
                .map(str::trim)
                .filter(|kind| !kind.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                DeployerError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["deployer.config.yaml", "deployer.config.yml"];

/// Per-user configuration directory, e.g. `~/.config/jee-deployer`.
#[must_use]
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("jee-deployer"))
}

/// Finds the configuration file in the given directory or its parents,
/// falling back to the per-user configuration directory.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    if let Some(user_dir) = user_config_dir() {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = user_dir.join(filename);
            if config_path.exists() {
                info!("Using user configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }
    }

    Err(DeployerError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
