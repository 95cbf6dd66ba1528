//! Configuration validation.
//!
//! Checks the configuration before anything talks to the container, so a
//! typo in a URL or a kind name is reported up front.

use crate::error::{ConfigError, DeployerError, Result};
use tracing::debug;
use url::Url;

use super::spec::{ContainerConfig, DeployerConfig, RepositoryConfig};
use crate::plan::ResourceKind;
use crate::reconciler::ManagedKinds;

/// Validator for deployer configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if validation fails.
    pub fn validate(&self, config: &DeployerConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_container(&config.container, &mut result);
        Self::validate_repository(&config.repository, &mut result);
        Self::validate_scope(config, &mut result);

        if config.plan.0.as_os_str().is_empty() {
            result.error("plan", "Plan path cannot be empty");
        }

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(DeployerError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    fn validate_container(container: &ContainerConfig, result: &mut ValidationResult) {
        validate_url("container.url", &container.url, result);

        if container.timeout_secs == 0 {
            result.error("container.timeout_secs", "Timeout must be greater than zero");
        }

        match (&container.user, &container.password) {
            (Some(_), None) => result
                .warnings
                .push(String::from("container.user is set without a password, requests are sent unauthenticated")),
            (None, Some(_)) => result
                .warnings
                .push(String::from("container.password is set without a user and is ignored")),
            _ => {}
        }

        for (index, template) in container.not_found_messages.iter().enumerate() {
            if template.prefix.is_empty() {
                result.error(
                    format!("container.not_found_messages[{index}].prefix"),
                    "Not-found template needs a prefix",
                );
            }
        }
    }

    fn validate_repository(repository: &RepositoryConfig, result: &mut ValidationResult) {
        validate_url("repository.url", &repository.url, result);
        validate_url("repository.search_url", &repository.search_url, result);

        if repository.timeout_secs == 0 {
            result.error("repository.timeout_secs", "Timeout must be greater than zero");
        }
    }

    fn validate_scope(config: &DeployerConfig, result: &mut ValidationResult) {
        for name in &config.managed {
            let name = name.trim();
            if name != ManagedKinds::ALL && ResourceKind::from_name(name).is_none() {
                result.error("managed", format!("Unknown resource kind '{name}' in managed list"));
            }
        }

        if config.managed.len() > 1 && config.managed.iter().any(|name| name.trim() == ManagedKinds::ALL) {
            result
                .warnings
                .push(format!("managed lists '{}' with other kinds, all kinds are managed", ManagedKinds::ALL));
        }

        for (kind, names) in &config.pinned {
            if ResourceKind::from_name(kind).is_none() {
                result.error(format!("pinned.{kind}"), format!("Unknown resource kind '{kind}'"));
            }
            if names.iter().any(String::is_empty) {
                result.error(format!("pinned.{kind}"), "Pinned names cannot be empty");
            }
        }
    }
}

fn validate_url(field: &str, value: &str, result: &mut ValidationResult) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => result.error(field, format!("Unsupported URL scheme '{}'", url.scheme())),
        Err(e) => result.error(field, format!("Invalid URL '{value}': {e}")),
    }
}

impl ValidationResult {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
