//! Value types shared by the plan, the container accessors and the audit log.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Desired lifecycle state of a plan entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentState {
    /// The resource must exist and match the plan.
    #[default]
    Deployed,
    /// The resource must not exist.
    Undeployed,
}

impl DeploymentState {
    /// Parses the plan representation of a state.
    #[must_use]
    pub fn from_plan_value(value: &str) -> Option<Self> {
        match value {
            "deployed" => Some(Self::Deployed),
            "undeployed" => Some(Self::Undeployed),
            _ => None,
        }
    }

    /// Returns true for [`DeploymentState::Deployed`].
    #[must_use]
    pub const fn is_deployed(&self) -> bool {
        matches!(self, Self::Deployed)
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deployed => write!(f, "deployed"),
            Self::Undeployed => write!(f, "undeployed"),
        }
    }
}

/// The four kinds of resources a plan can describe.
///
/// Declaration order is the order kinds are reconciled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Logging handlers.
    LogHandlers,
    /// Logger categories.
    Loggers,
    /// JDBC data sources.
    DataSources,
    /// Deployable archives.
    Deployables,
}

impl ResourceKind {
    /// All kinds in reconciliation order.
    pub const ALL: [Self; 4] = [Self::LogHandlers, Self::Loggers, Self::DataSources, Self::Deployables];

    /// The name used in plans and configuration.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LogHandlers => "log-handlers",
            Self::Loggers => "loggers",
            Self::DataSources => "data-sources",
            Self::Deployables => "deployables",
        }
    }

    /// Rank used by the operation sequencer. Lower ranks are added first and removed last.
    #[must_use]
    pub const fn rank(&self) -> i32 {
        match self {
            Self::LogHandlers => 1,
            Self::Loggers => 2,
            Self::DataSources => 3,
            Self::Deployables => 4,
        }
    }

    /// Looks a kind up by its plan name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A SHA-1 content checksum, stored as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Creates a checksum from its hex representation.
    #[must_use]
    pub fn new(hex: impl AsRef<str>) -> Self {
        Self(hex.as_ref().trim().to_ascii_lowercase())
    }

    /// Creates a checksum from raw digest bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Returns the hex representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if there is no checksum at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An artifact version. `CURRENT` stands for whatever is deployed right now.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Sentinel for "the version currently deployed".
    pub const CURRENT: &'static str = "CURRENT";

    /// Creates a version.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// Returns the `CURRENT` sentinel.
    #[must_use]
    pub fn current() -> Self {
        Self(Self::CURRENT.to_string())
    }

    /// Returns true for the `CURRENT` sentinel.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.0 == Self::CURRENT
    }

    /// Returns the version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Packaging of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    /// Web archive.
    #[default]
    War,
    /// Java archive.
    Jar,
    /// Enterprise archive.
    Ear,
    /// Maven project descriptor.
    Pom,
    /// A bundle of plans, never deployable by itself.
    Bundle,
    /// Packaging could not be determined.
    Unknown,
}

impl ArtifactType {
    /// The lowercase type name, also the file extension.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::War => "war",
            Self::Jar => "jar",
            Self::Ear => "ear",
            Self::Pom => "pom",
            Self::Bundle => "bundle",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a type name, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "war" => Some(Self::War),
            "jar" => Some(Self::Jar),
            "ear" => Some(Self::Ear),
            "pom" => Some(Self::Pom),
            "bundle" => Some(Self::Bundle),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Suffix the container needs on the deployment name, if any.
    #[must_use]
    pub const fn deployment_suffix(&self) -> Option<&'static str> {
        match self {
            Self::War => Some(".war"),
            Self::Jar => Some(".jar"),
            Self::Ear => Some(".ear"),
            Self::Pom | Self::Bundle | Self::Unknown => None,
        }
    }

    /// Returns true if the container can deploy archives of this type.
    #[must_use]
    pub const fn is_deployable(&self) -> bool {
        self.deployment_suffix().is_some()
    }

    /// Guesses the type from a deployment name's suffix.
    #[must_use]
    pub fn from_deployment_name(name: &str) -> Self {
        [Self::War, Self::Jar, Self::Ear]
            .into_iter()
            .find(|t| t.deployment_suffix().is_some_and(|suffix| name.ends_with(suffix)))
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Log level as understood by the container's logging subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Everything.
    All,
    /// Trace.
    Trace,
    /// Debug.
    Debug,
    /// Info.
    Info,
    /// Warn.
    Warn,
    /// Error.
    Error,
    /// Nothing.
    Off,
}

impl LogLevel {
    /// Parses a level name. Accepts the `java.util.logging` and JBoss
    /// aliases (`SEVERE`, `FATAL`, `WARNING`, `CONFIG`, `FINE`, `FINER`, `FINEST`).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ALL" => Some(Self::All),
            "TRACE" | "FINEST" => Some(Self::Trace),
            "DEBUG" | "FINE" | "FINER" => Some(Self::Debug),
            "INFO" | "CONFIG" => Some(Self::Info),
            "WARN" | "WARNING" => Some(Self::Warn),
            "ERROR" | "SEVERE" | "FATAL" => Some(Self::Error),
            "OFF" => Some(Self::Off),
            _ => None,
        }
    }

    /// Maps a level read from the container. Unknown names map to `WARN`.
    #[must_use]
    pub fn from_container(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            warn!("unknown log level '{}' reported by container, using WARN", name);
            Self::Warn
        })
    }

    /// The level name written to the container.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Off => "OFF",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of logging handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogHandlerType {
    /// Writes to the console.
    Console,
    /// Writes to a file rotated on a date pattern.
    #[default]
    PeriodicRotatingFile,
    /// A handler class from a module.
    Custom,
}

impl LogHandlerType {
    /// All handler types.
    pub const ALL: [Self; 3] = [Self::Console, Self::PeriodicRotatingFile, Self::Custom];

    /// Name used in plans.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::PeriodicRotatingFile => "periodic-rotating-file",
            Self::Custom => "custom",
        }
    }

    /// Address key of handlers of this type in the logging subsystem.
    #[must_use]
    pub const fn address_key(&self) -> &'static str {
        match self {
            Self::Console => "console-handler",
            Self::PeriodicRotatingFile => "periodic-rotating-file-handler",
            Self::Custom => "custom-handler",
        }
    }

    /// Parses a plan type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.type_name() == name)
    }
}

impl fmt::Display for LogHandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_aliases() {
        assert_eq!(LogLevel::parse("SEVERE"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("fatal"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("CONFIG"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("FINER"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("FINEST"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("LOUD"), None);
        assert_eq!(LogLevel::from_container("LOUD"), LogLevel::Warn);
    }

    #[test]
    fn test_resource_kind_names_and_ranks() {
        assert_eq!(ResourceKind::from_name("data-sources"), Some(ResourceKind::DataSources));
        assert_eq!(ResourceKind::from_name("all"), None);
        let ranks: Vec<_> = ResourceKind::ALL.iter().map(ResourceKind::rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_artifact_type_suffix() {
        assert_eq!(ArtifactType::War.deployment_suffix(), Some(".war"));
        assert!(!ArtifactType::Bundle.is_deployable());
        assert_eq!(ArtifactType::from_deployment_name("app.ear"), ArtifactType::Ear);
        assert_eq!(ArtifactType::from_deployment_name("app"), ArtifactType::Unknown);
    }

    #[test]
    fn test_checksum_normalizes_case() {
        assert_eq!(Checksum::new("ABC123"), Checksum::new("abc123"));
        assert_eq!(Checksum::from_bytes(&[0xab, 0x01]).as_str(), "ab01");
    }

    #[test]
    fn test_current_version() {
        assert!(Version::current().is_current());
        assert!(!Version::new("1.0.0").is_current());
    }
}
