//! Configuration types for the deployer.
//!
//! This module defines the structs that map to `deployer.config.yaml`: where
//! the container and the artifact repository are, which plan to apply, and
//! which resources a run may touch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::container::{HttpManagementClient, MessageTemplate, NotFoundMatcher};
use crate::error::{ConfigError, Result};
use crate::plan::{PlanDefaults, ResourceKind};
use crate::reconciler::{ManagedKinds, ReconcileConfig};
use crate::repository::MavenRepository;

/// Default management interface of a local server.
pub const DEFAULT_CONTAINER_URL: &str = "http://localhost:9990";

/// Default plan file.
pub const DEFAULT_PLAN_FILE: &str = "deployer.root.bundle";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeployerConfig {
    /// Management interface of the container.
    pub container: ContainerConfig,
    /// Artifact repository.
    pub repository: RepositoryConfig,
    /// Plan file applied when none is given on the command line.
    pub plan: PlanLocation,
    /// Kinds whose unplanned resources are removed, or `all`.
    pub managed: Vec<String>,
    /// Resources never touched, by kind name.
    pub pinned: BTreeMap<String, Vec<String>>,
    /// Defaults applied while loading plans.
    pub defaults: PlanDefaults,
}

/// Path of the plan file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PlanLocation(pub PathBuf);

impl Default for PlanLocation {
    fn default() -> Self {
        Self(PathBuf::from(DEFAULT_PLAN_FILE))
    }
}

/// Management interface settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContainerConfig {
    /// Base URL, without the `/management` path.
    pub url: String,
    /// Management user.
    pub user: Option<String>,
    /// Management password.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Extra not-found descriptions, on top of the built-in ones.
    pub not_found_messages: Vec<MessageTemplate>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CONTAINER_URL.to_string(),
            user: None,
            password: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            not_found_messages: Vec::new(),
        }
    }
}

impl ContainerConfig {
    /// Creates the HTTP management client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn client(&self) -> Result<HttpManagementClient> {
        let client = HttpManagementClient::with_timeout(&self.url, self.timeout_secs)?;
        Ok(match (&self.user, &self.password) {
            (Some(user), Some(password)) => client.with_credentials(user, password),
            _ => client,
        })
    }

    /// The built-in not-found templates plus the configured ones.
    #[must_use]
    pub fn not_found_matcher(&self) -> NotFoundMatcher {
        self.not_found_messages
            .iter()
            .cloned()
            .fold(NotFoundMatcher::new(), NotFoundMatcher::with_template)
    }
}

/// Artifact repository settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Base URL of the Maven layout.
    pub url: String,
    /// Search endpoint used to trace checksums back to artifacts.
    pub search_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            url: MavenRepository::DEFAULT_URL.to_string(),
            search_url: MavenRepository::DEFAULT_SEARCH_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RepositoryConfig {
    /// Creates the repository client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn repository(&self) -> Result<MavenRepository> {
        MavenRepository::with_urls(&self.url, &self.search_url, self.timeout_secs)
    }
}

impl DeployerConfig {
    /// The scope of a run: managed kinds and pinned resources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownResourceKind`] for a kind name that is
    /// neither a resource kind nor `all`.
    pub fn reconcile_config(&self) -> Result<ReconcileConfig> {
        let mut config = ReconcileConfig::new().with_managed(ManagedKinds::from_names(&self.managed)?);
        for (kind, names) in &self.pinned {
            let kind = ResourceKind::from_name(kind).ok_or_else(|| ConfigError::UnknownResourceKind {
                name: kind.clone(),
            })?;
            for name in names {
                config = config.with_pinned(kind, name.as_str());
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeployerConfig::default();
        assert_eq!(config.container.url, DEFAULT_CONTAINER_URL);
        assert_eq!(config.plan.0, PathBuf::from(DEFAULT_PLAN_FILE));
        assert_eq!(config.repository.url, MavenRepository::DEFAULT_URL);

        let scope = config.reconcile_config().expect("scope");
        assert_eq!(scope.managed, ManagedKinds::None);
        assert!(!scope.is_managed(ResourceKind::Loggers));
    }

    #[test]
    fn test_reconcile_config() {
        let mut config = DeployerConfig {
            managed: vec!["loggers".into(), "deployables".into()],
            ..DeployerConfig::default()
        };
        config.pinned.insert("deployables".into(), vec!["deployer".into()]);

        let scope = config.reconcile_config().expect("scope");
        assert!(scope.is_managed(ResourceKind::Loggers));
        assert!(!scope.is_managed(ResourceKind::DataSources));
        assert!(scope.is_pinned(ResourceKind::Deployables, "deployer"));
        assert!(!scope.is_pinned(ResourceKind::Loggers, "deployer"));
    }

    #[test]
    fn test_unknown_pinned_kind() {
        let mut config = DeployerConfig::default();
        config.pinned.insert("queues".into(), vec!["jms".into()]);
        assert!(config.reconcile_config().is_err());
    }

    #[test]
    fn test_password_is_not_serialized() {
        let config = ContainerConfig {
            user: Some("admin".into()),
            password: Some("secret".into()),
            ..ContainerConfig::default()
        };
        let yaml = serde_yaml::to_string(&config).expect("yaml");
        assert!(yaml.contains("admin"));
        assert!(!yaml.contains("secret"));
    }

    #[test]
    fn test_configured_not_found_messages_extend_built_in() {
        let config = ContainerConfig {
            not_found_messages: vec![MessageTemplate::new("WFLYCTL0999: Missing", " gone")],
            ..ContainerConfig::default()
        };
        let matcher = config.not_found_matcher();
        assert!(matcher.is_not_found("WFLYCTL0999: Missing '/logger=x' gone"));
        assert!(matcher.is_not_found("WFLYCTL0216: Management resource '/logger=x' not found"));
    }
}
