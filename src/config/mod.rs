//! Configuration module for the deployer.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `deployer.config.yaml`
//! - `.env` loading and environment overrides
//! - Validation of configuration values

mod parser;
mod spec;
mod validator;

pub use parser::{
    ConfigParser, DEFAULT_CONFIG_FILES, ENV_CONTAINER_PASSWORD, ENV_CONTAINER_URL, ENV_CONTAINER_USER, ENV_MANAGED,
    ENV_PLAN, find_config_file, user_config_dir,
};
pub use spec::{
    ContainerConfig, DEFAULT_CONTAINER_URL, DEFAULT_PLAN_FILE, DeployerConfig, PlanLocation, RepositoryConfig,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
