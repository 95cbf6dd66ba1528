//! Desired-state records and the [`Plan`] that groups them.

use indexmap::IndexMap;
use serde::Serialize;

use super::types::{ArtifactType, Checksum, DeploymentState, LogHandlerType, LogLevel, ResourceKind, Version};

/// Common view of one plan entry.
pub trait PlanEntry {
    /// Identity of the entry within its kind.
    fn id(&self) -> &str;

    /// Desired lifecycle state.
    fn state(&self) -> DeploymentState;
}

/// A deployable archive resolved from the artifact repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeployablePlan {
    /// Logical deployment name.
    #[serde(skip)]
    pub name: String,
    /// Desired state.
    #[serde(skip_serializing_if = "DeploymentState::is_deployed")]
    pub state: DeploymentState,
    /// Maven group id. Only optional for undeployed entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Maven artifact id.
    pub artifact_id: String,
    /// Version, or `CURRENT`.
    pub version: Version,
    /// Packaging.
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    /// Maven classifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    /// Expected checksum of the archive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
}

impl DeployablePlan {
    /// Creates a deployed war entry.
    #[must_use]
    pub fn new(name: impl Into<String>, group_id: impl Into<String>, artifact_id: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            state: DeploymentState::Deployed,
            group_id: Some(group_id.into()),
            artifact_id: artifact_id.into(),
            version,
            artifact_type: ArtifactType::War,
            classifier: None,
            checksum: None,
        }
    }

    /// Sets the desired state.
    #[must_use]
    pub const fn with_state(mut self, state: DeploymentState) -> Self {
        self.state = state;
        self
    }

    /// Sets the expected checksum.
    #[must_use]
    pub fn with_checksum(mut self, checksum: Checksum) -> Self {
        self.checksum = Some(checksum);
        self
    }

    /// Sets the packaging.
    #[must_use]
    pub const fn with_type(mut self, artifact_type: ArtifactType) -> Self {
        self.artifact_type = artifact_type;
        self
    }

    /// Sets the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Name of the deployment inside the container, with its archive suffix.
    #[must_use]
    pub fn physical_name(&self) -> String {
        match self.artifact_type.deployment_suffix() {
            Some(suffix) if !self.name.ends_with(suffix) => format!("{}{suffix}", self.name),
            _ => self.name.clone(),
        }
    }

    /// Name without the archive suffix, comparable to the logical name of a
    /// deployment in the container.
    #[must_use]
    pub fn logical_name(&self) -> &str {
        self.artifact_type
            .deployment_suffix()
            .and_then(|suffix| self.name.strip_suffix(suffix))
            .unwrap_or(&self.name)
    }

    /// `group:artifact:version:type[:classifier]`.
    #[must_use]
    pub fn coordinates(&self) -> String {
        let mut coordinates = format!(
            "{}:{}:{}:{}",
            self.group_id.as_deref().unwrap_or("?"),
            self.artifact_id,
            self.version,
            self.artifact_type
        );
        if let Some(classifier) = &self.classifier {
            coordinates.push(':');
            coordinates.push_str(classifier);
        }
        coordinates
    }
}

impl PlanEntry for DeployablePlan {
    fn id(&self) -> &str {
        &self.name
    }

    fn state(&self) -> DeploymentState {
        self.state
    }
}

/// A logger category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggerPlan {
    /// Logger category, or `ROOT`.
    #[serde(skip)]
    pub category: String,
    /// Desired state.
    #[serde(skip_serializing_if = "DeploymentState::is_deployed")]
    pub state: DeploymentState,
    /// Level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
    /// Names of the handlers attached to this logger.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub handlers: Vec<String>,
    /// Explicit use-parent-handlers flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_parent_handlers: Option<bool>,
}

impl LoggerPlan {
    /// Category of the root logger.
    pub const ROOT: &'static str = "ROOT";

    /// Creates a deployed logger without handlers.
    #[must_use]
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            state: DeploymentState::Deployed,
            level: None,
            handlers: Vec::new(),
            use_parent_handlers: None,
        }
    }

    /// Sets the level.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Appends a handler.
    #[must_use]
    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handlers.push(handler.into());
        self
    }

    /// Sets the desired state.
    #[must_use]
    pub const fn with_state(mut self, state: DeploymentState) -> Self {
        self.state = state;
        self
    }

    /// Returns true for the root logger.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.category == Self::ROOT
    }

    /// Use-parent-handlers, defaulting to true only when no handlers are attached.
    #[must_use]
    pub fn effective_use_parent_handlers(&self) -> bool {
        self.use_parent_handlers.unwrap_or(self.handlers.is_empty())
    }
}

impl PlanEntry for LoggerPlan {
    fn id(&self) -> &str {
        &self.category
    }

    fn state(&self) -> DeploymentState {
        self.state
    }
}

/// A logging handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LogHandlerPlan {
    /// Handler name.
    #[serde(skip)]
    pub name: String,
    /// Desired state.
    #[serde(skip_serializing_if = "DeploymentState::is_deployed")]
    pub state: DeploymentState,
    /// Handler type.
    #[serde(rename = "type")]
    pub handler_type: LogHandlerType,
    /// Level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
    /// Pattern format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Named formatter, exclusive with `format`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
    /// Character encoding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// File name below the server log directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Rotation suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Module of a custom handler.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Class of a custom handler.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Properties of a custom handler.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, String>,
}

impl LogHandlerPlan {
    /// Creates a deployed handler of the given type with nothing else set.
    #[must_use]
    pub fn new(name: impl Into<String>, handler_type: LogHandlerType) -> Self {
        Self {
            name: name.into(),
            state: DeploymentState::Deployed,
            handler_type,
            level: None,
            format: None,
            formatter: None,
            encoding: None,
            file: None,
            suffix: None,
            module: None,
            class: None,
            properties: IndexMap::new(),
        }
    }

    /// Sets the desired state.
    #[must_use]
    pub const fn with_state(mut self, state: DeploymentState) -> Self {
        self.state = state;
        self
    }

    /// Sets the level.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Sets the format.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

impl PlanEntry for LogHandlerPlan {
    fn id(&self) -> &str {
        &self.name
    }

    fn state(&self) -> DeploymentState {
        self.state
    }
}

/// A JDBC data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DataSourcePlan {
    /// Data source name.
    #[serde(skip)]
    pub name: String,
    /// Desired state.
    #[serde(skip_serializing_if = "DeploymentState::is_deployed")]
    pub state: DeploymentState,
    /// XA data source.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub xa: bool,
    /// JDBC driver name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// JNDI name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jndi_name: Option<String>,
    /// JDBC connection URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Database user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Database password. Never serialized.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Minimum pool size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_pool_size: Option<u32>,
    /// Initial pool size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_pool_size: Option<u32>,
    /// Maximum pool size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pool_size: Option<u32>,
    /// Idle timeout in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u32>,
}

impl DataSourcePlan {
    /// Creates a deployed, non-XA data source.
    #[must_use]
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: DeploymentState::Deployed,
            xa: false,
            driver: None,
            jndi_name: None,
            uri: Some(uri.into()),
            user_name: None,
            password: None,
            min_pool_size: None,
            initial_pool_size: None,
            max_pool_size: None,
            max_age: None,
        }
    }

    /// Sets the credentials.
    #[must_use]
    pub fn with_credentials(mut self, user_name: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the JNDI name.
    #[must_use]
    pub fn with_jndi_name(mut self, jndi_name: impl Into<String>) -> Self {
        self.jndi_name = Some(jndi_name.into());
        self
    }

    /// Sets the driver.
    #[must_use]
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }
}

impl PlanEntry for DataSourcePlan {
    fn id(&self) -> &str {
        &self.name
    }

    fn state(&self) -> DeploymentState {
        self.state
    }
}

/// The desired state of one container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Plan {
    /// Log handlers by name.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub log_handlers: IndexMap<String, LogHandlerPlan>,
    /// Loggers by category.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub loggers: IndexMap<String, LoggerPlan>,
    /// Data sources by name.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub data_sources: IndexMap<String, DataSourcePlan>,
    /// Deployables by name.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub deployables: IndexMap<String, DeployablePlan>,
}

impl Plan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a deployable.
    #[must_use]
    pub fn with_deployable(mut self, deployable: DeployablePlan) -> Self {
        self.deployables.insert(deployable.name.clone(), deployable);
        self
    }

    /// Adds or replaces a logger.
    #[must_use]
    pub fn with_logger(mut self, logger: LoggerPlan) -> Self {
        self.loggers.insert(logger.category.clone(), logger);
        self
    }

    /// Adds or replaces a log handler.
    #[must_use]
    pub fn with_log_handler(mut self, handler: LogHandlerPlan) -> Self {
        self.log_handlers.insert(handler.name.clone(), handler);
        self
    }

    /// Adds or replaces a data source.
    #[must_use]
    pub fn with_data_source(mut self, data_source: DataSourcePlan) -> Self {
        self.data_sources.insert(data_source.name.clone(), data_source);
        self
    }

    /// Names of all entries of one kind, in plan order.
    #[must_use]
    pub fn names(&self, kind: ResourceKind) -> Vec<&str> {
        match kind {
            ResourceKind::LogHandlers => self.log_handlers.keys().map(String::as_str).collect(),
            ResourceKind::Loggers => self.loggers.keys().map(String::as_str).collect(),
            ResourceKind::DataSources => self.data_sources.keys().map(String::as_str).collect(),
            ResourceKind::Deployables => self.deployables.keys().map(String::as_str).collect(),
        }
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log_handlers.len() + self.loggers.len() + self.data_sources.len() + self.deployables.len()
    }

    /// Returns true if the plan has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_name_appends_suffix_once() {
        let plan = DeployablePlan::new("foo", "org.foo", "foo-war", Version::new("1.0.0"));
        assert_eq!(plan.physical_name(), "foo.war");

        let already = DeployablePlan::new("foo.war", "org.foo", "foo-war", Version::new("1.0.0"));
        assert_eq!(already.physical_name(), "foo.war");

        let ear = DeployablePlan::new("foo", "org.foo", "foo-ear", Version::new("1.0.0")).with_type(ArtifactType::Ear);
        assert_eq!(ear.physical_name(), "foo.ear");
    }

    #[test]
    fn test_logical_name_strips_own_suffix() {
        let plan = DeployablePlan::new("foo.war", "org.foo", "foo-war", Version::new("1.0.0"));
        assert_eq!(plan.logical_name(), "foo");

        let bare = DeployablePlan::new("foo", "org.foo", "foo-war", Version::new("1.0.0"));
        assert_eq!(bare.logical_name(), "foo");

        let jar = DeployablePlan::new("foo.war", "org.foo", "foo", Version::new("1.0.0")).with_type(ArtifactType::Jar);
        assert_eq!(jar.logical_name(), "foo.war");
    }

    #[test]
    fn test_use_parent_handlers_default() {
        assert!(LoggerPlan::new("a").effective_use_parent_handlers());
        assert!(!LoggerPlan::new("a").with_handler("FILE").effective_use_parent_handlers());
    }

    #[test]
    fn test_plan_names_in_order() {
        let plan = Plan::new()
            .with_logger(LoggerPlan::new("b"))
            .with_logger(LoggerPlan::new("a"));
        assert_eq!(plan.names(ResourceKind::Loggers), vec!["b", "a"]);
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_password_is_never_serialized() {
        let plan = Plan::new().with_data_source(DataSourcePlan::new("db", "jdbc:h2:mem:db").with_credentials("sa", "secret"));
        let yaml = serde_yaml::to_string(&plan).expect("serialize");
        assert!(yaml.contains("user-name: sa"));
        assert!(!yaml.contains("secret"));
    }
}
