//! Plan loader: YAML text to a fully defaulted, validated [`Plan`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use super::model::{DataSourcePlan, DeployablePlan, LogHandlerPlan, LoggerPlan, Plan};
use super::types::{ArtifactType, Checksum, DeploymentState, LogHandlerType, LogLevel, ResourceKind, Version};
use crate::error::{PlanError, Result};

/// Pattern used when a handler declares neither a format nor a formatter.
pub const DEFAULT_LOG_FORMAT: &str = "%d{HH:mm:ss,SSS} %-5p [%c] (%t) %s%e%n";

/// Defaults applied to plan entries that leave a field out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanDefaults {
    /// Group id of deployables that declare none.
    pub group_id: Option<String>,
    /// Packaging of deployables.
    pub deployable_type: ArtifactType,
    /// Level of loggers.
    pub log_level: LogLevel,
    /// Level of log handlers.
    pub log_handler_level: LogLevel,
    /// Type of log handlers.
    pub log_handler_type: LogHandlerType,
    /// Pattern of log handlers without a formatter.
    pub log_format: String,
    /// Rotation suffix of file handlers.
    pub log_file_suffix: String,
    /// Driver of data sources whose URI does not name one.
    pub data_source_driver: Option<String>,
}

impl Default for PlanDefaults {
    fn default() -> Self {
        Self {
            group_id: None,
            deployable_type: ArtifactType::War,
            log_level: LogLevel::Debug,
            log_handler_level: LogLevel::All,
            log_handler_type: LogHandlerType::PeriodicRotatingFile,
            log_format: DEFAULT_LOG_FORMAT.to_string(),
            log_file_suffix: ".yyyy-MM-dd".to_string(),
            data_source_driver: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
struct RawPlan {
    log_handlers: IndexMap<String, Option<RawLogHandler>>,
    loggers: IndexMap<String, Option<RawLogger>>,
    data_sources: IndexMap<String, Option<RawDataSource>>,
    deployables: IndexMap<String, Option<RawDeployable>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
struct RawDeployable {
    state: Option<String>,
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<serde_yaml::Value>,
    #[serde(rename = "type")]
    artifact_type: Option<String>,
    classifier: Option<String>,
    checksum: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
struct RawLogger {
    state: Option<String>,
    level: Option<String>,
    handler: Option<String>,
    handlers: Vec<String>,
    use_parent_handlers: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
struct RawLogHandler {
    state: Option<String>,
    #[serde(rename = "type")]
    handler_type: Option<String>,
    level: Option<String>,
    format: Option<String>,
    formatter: Option<String>,
    encoding: Option<String>,
    file: Option<String>,
    suffix: Option<String>,
    module: Option<String>,
    class: Option<String>,
    properties: IndexMap<String, serde_yaml::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
struct RawDataSource {
    state: Option<String>,
    xa: Option<bool>,
    driver: Option<String>,
    jndi_name: Option<String>,
    uri: Option<String>,
    user_name: Option<String>,
    password: Option<serde_yaml::Value>,
    min_pool_size: Option<u32>,
    initial_pool_size: Option<u32>,
    max_pool_size: Option<u32>,
    max_age: Option<u32>,
}

/// Loads plans and applies [`PlanDefaults`].
#[derive(Debug, Default)]
pub struct PlanLoader {
    defaults: PlanDefaults,
}

impl PlanLoader {
    /// Creates a loader with built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the defaults.
    #[must_use]
    pub fn with_defaults(mut self, defaults: PlanDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Loads a plan file.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::FileNotFound`] if the file does not exist, or a
    /// parse or validation error.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Plan> {
        let path = path.as_ref();
        info!("Loading plan from: {}", path.display());

        if !path.exists() {
            return Err(PlanError::FileNotFound { path: path.to_path_buf() }.into());
        }

        let content = std::fs::read_to_string(path)?;
        self.parse_yaml(&content)
    }

    /// Parses a plan from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or an entry fails validation.
    pub fn parse_yaml(&self, content: &str) -> Result<Plan> {
        if content.trim().is_empty() {
            debug!("Empty plan");
            return Ok(Plan::new());
        }

        let raw: Option<RawPlan> = serde_yaml::from_str(content).map_err(|e| PlanError::ParseError {
            message: format!("YAML parse error: {e}"),
        })?;
        let raw = raw.unwrap_or_default();

        let mut plan = Plan::new();
        for (name, body) in raw.log_handlers {
            let handler = self.log_handler(&name, body.unwrap_or_default())?;
            plan.log_handlers.insert(name, handler);
        }
        for (category, body) in raw.loggers {
            let logger = self.logger(&category, body.unwrap_or_default())?;
            plan.loggers.insert(category, logger);
        }
        for (name, body) in raw.data_sources {
            let data_source = self.data_source(&name, body.unwrap_or_default())?;
            plan.data_sources.insert(name, data_source);
        }
        for (name, body) in raw.deployables {
            let deployable = self.deployable(&name, body.unwrap_or_default())?;
            plan.deployables.insert(name, deployable);
        }

        debug!("Loaded plan with {} entries", plan.len());
        Ok(plan)
    }

    fn deployable(&self, name: &str, raw: RawDeployable) -> Result<DeployablePlan> {
        let kind = ResourceKind::Deployables;
        let state = parse_state(kind, name, raw.state.as_deref())?;

        let group_id = raw.group_id.or_else(|| self.defaults.group_id.clone());
        if group_id.is_none() && state.is_deployed() {
            return Err(PlanError::invalid(kind.name(), name, "group-id is required").into());
        }

        let artifact_type = match raw.artifact_type {
            Some(type_name) => ArtifactType::from_name(&type_name)
                .ok_or_else(|| PlanError::invalid(kind.name(), name, format!("unknown type '{type_name}'")))?,
            None => self.defaults.deployable_type,
        };
        if !artifact_type.is_deployable() {
            return Err(PlanError::invalid(kind.name(), name, format!("type '{artifact_type}' cannot be deployed")).into());
        }

        let version = raw
            .version
            .and_then(scalar_to_string)
            .map_or_else(Version::current, Version::new);

        let checksum = match raw.checksum {
            Some(hex_value) => {
                if hex::decode(hex_value.trim()).is_err() {
                    return Err(PlanError::invalid(kind.name(), name, "checksum must be hex").into());
                }
                Some(Checksum::new(hex_value))
            }
            None => None,
        };

        Ok(DeployablePlan {
            name: name.to_string(),
            state,
            group_id,
            artifact_id: raw.artifact_id.unwrap_or_else(|| name.to_string()),
            version,
            artifact_type,
            classifier: raw.classifier,
            checksum,
        })
    }

    fn logger(&self, category: &str, raw: RawLogger) -> Result<LoggerPlan> {
        let kind = ResourceKind::Loggers;
        let state = parse_state(kind, category, raw.state.as_deref())?;

        let level = match raw.level {
            Some(level) => Some(parse_level(kind, category, &level)?),
            None => Some(self.defaults.log_level),
        };

        let mut handlers = Vec::new();
        if let Some(handler) = raw.handler {
            handlers.push(handler);
        }
        for handler in raw.handlers {
            if !handlers.contains(&handler) {
                handlers.push(handler);
            }
        }

        let is_root = category == LoggerPlan::ROOT;
        if raw.use_parent_handlers == Some(false) && handlers.is_empty() && !is_root {
            return Err(PlanError::invalid(kind.name(), category, "use-parent-handlers is false but no handlers are set").into());
        }

        Ok(LoggerPlan {
            category: category.to_string(),
            state,
            level,
            handlers,
            use_parent_handlers: if is_root { None } else { raw.use_parent_handlers },
        })
    }

    fn log_handler(&self, name: &str, raw: RawLogHandler) -> Result<LogHandlerPlan> {
        let kind = ResourceKind::LogHandlers;
        let state = parse_state(kind, name, raw.state.as_deref())?;

        let handler_type = match raw.handler_type {
            Some(type_name) => LogHandlerType::from_name(&type_name)
                .ok_or_else(|| PlanError::invalid(kind.name(), name, format!("unknown handler type '{type_name}'")))?,
            None => self.defaults.log_handler_type,
        };

        let level = match raw.level {
            Some(level) => parse_level(kind, name, &level)?,
            None => self.defaults.log_handler_level,
        };

        if raw.format.is_some() && raw.formatter.is_some() {
            return Err(PlanError::invalid(kind.name(), name, "format and formatter are mutually exclusive").into());
        }
        let format = match (&raw.format, &raw.formatter) {
            (None, None) => Some(self.defaults.log_format.clone()),
            _ => raw.format,
        };

        let (file, suffix) = if handler_type == LogHandlerType::PeriodicRotatingFile {
            (
                Some(raw.file.unwrap_or_else(|| format!("{}.log", name.to_lowercase()))),
                Some(raw.suffix.unwrap_or_else(|| self.defaults.log_file_suffix.clone())),
            )
        } else {
            (raw.file, raw.suffix)
        };

        if handler_type == LogHandlerType::Custom && state.is_deployed() && (raw.module.is_none() || raw.class.is_none()) {
            return Err(PlanError::invalid(kind.name(), name, "custom handlers need a module and a class").into());
        }

        let mut properties = IndexMap::new();
        for (key, value) in raw.properties {
            let value = scalar_to_string(value)
                .ok_or_else(|| PlanError::invalid(kind.name(), name, format!("property '{key}' must be a scalar")))?;
            properties.insert(key, value);
        }

        Ok(LogHandlerPlan {
            name: name.to_string(),
            state,
            handler_type,
            level: Some(level),
            format,
            formatter: raw.formatter,
            encoding: raw.encoding,
            file,
            suffix,
            module: raw.module,
            class: raw.class,
            properties,
        })
    }

    fn data_source(&self, name: &str, raw: RawDataSource) -> Result<DataSourcePlan> {
        let kind = ResourceKind::DataSources;
        let state = parse_state(kind, name, raw.state.as_deref())?;

        if let Some(uri) = &raw.uri {
            url::Url::parse(uri)
                .map_err(|e| PlanError::invalid(kind.name(), name, format!("invalid uri '{uri}': {e}")))?;
        } else if state.is_deployed() {
            return Err(PlanError::invalid(kind.name(), name, "uri is required").into());
        }

        let driver = raw
            .driver
            .or_else(|| raw.uri.as_deref().and_then(driver_from_uri))
            .or_else(|| self.defaults.data_source_driver.clone());

        Ok(DataSourcePlan {
            name: name.to_string(),
            state,
            xa: raw.xa.unwrap_or(false),
            driver,
            jndi_name: Some(raw.jndi_name.unwrap_or_else(|| format!("java:/datasources/{name}DS"))),
            uri: raw.uri,
            user_name: raw.user_name,
            password: raw.password.and_then(scalar_to_string),
            min_pool_size: raw.min_pool_size,
            initial_pool_size: raw.initial_pool_size,
            max_pool_size: raw.max_pool_size,
            max_age: raw.max_age,
        })
    }
}

/// Extracts the driver name from a `jdbc:<driver>:...` URI.
#[must_use]
pub fn driver_from_uri(uri: &str) -> Option<String> {
    let rest = uri.strip_prefix("jdbc:")?;
    let driver = rest.split(':').next()?;
    if !driver.is_empty() && driver.len() <= 256 && driver.chars().all(char::is_alphanumeric) && rest.len() > driver.len() {
        Some(driver.to_string())
    } else {
        None
    }
}

fn parse_state(kind: ResourceKind, name: &str, value: Option<&str>) -> Result<DeploymentState> {
    match value {
        None => Ok(DeploymentState::Deployed),
        Some(value) => DeploymentState::from_plan_value(value).ok_or_else(|| {
            PlanError::UnsupportedState {
                kind: kind.name().to_string(),
                name: name.to_string(),
                state: value.to_string(),
            }
            .into()
        }),
    }
}

fn parse_level(kind: ResourceKind, name: &str, value: &str) -> Result<LogLevel> {
    LogLevel::parse(value).ok_or_else(|| PlanError::invalid(kind.name(), name, format!("unknown log level '{value}'")).into())
}

fn scalar_to_string(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployerError;

    fn parse(yaml: &str) -> Result<Plan> {
        PlanLoader::new().parse_yaml(yaml)
    }

    #[test]
    fn test_empty_plan() {
        let plan = parse("").expect("empty plan");
        assert!(plan.is_empty());
    }

    #[test]
    fn test_deployable_defaults() {
        let plan = parse(
            r"
deployables:
  foo:
    group-id: org.foo
",
        )
        .expect("plan");
        let foo = &plan.deployables["foo"];
        assert_eq!(foo.artifact_id, "foo");
        assert!(foo.version.is_current());
        assert_eq!(foo.artifact_type, ArtifactType::War);
        assert_eq!(foo.state, DeploymentState::Deployed);
    }

    #[test]
    fn test_numeric_version_and_checksum() {
        let plan = parse(
            r"
deployables:
  foo:
    group-id: org.foo
    artifact-id: foo-war
    version: 1.2
    checksum: ABC123
",
        )
        .expect("plan");
        let foo = &plan.deployables["foo"];
        assert_eq!(foo.version.as_str(), "1.2");
        assert_eq!(foo.checksum, Some(Checksum::new("abc123")));
    }

    #[test]
    fn test_group_id_required_unless_undeployed() {
        let err = parse("deployables:\n  foo:\n    version: 1.0\n").expect_err("missing group");
        assert!(matches!(err, DeployerError::Plan(PlanError::Invalid { .. })));

        let plan = parse("deployables:\n  foo:\n    state: undeployed\n").expect("undeployed");
        assert_eq!(plan.deployables["foo"].state, DeploymentState::Undeployed);
    }

    #[test]
    fn test_bundle_is_not_deployable() {
        let err = parse("deployables:\n  foo:\n    group-id: g\n    type: bundle\n").expect_err("bundle");
        assert!(matches!(err, DeployerError::Plan(PlanError::Invalid { .. })));
    }

    #[test]
    fn test_unsupported_state() {
        let err = parse("loggers:\n  com.foo:\n    state: paused\n").expect_err("state");
        match err {
            DeployerError::Plan(PlanError::UnsupportedState { state, name, .. }) => {
                assert_eq!(state, "paused");
                assert_eq!(name, "com.foo");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_logger_handlers() {
        let plan = parse(
            r"
loggers:
  com.foo:
    level: FINE
    handler: FOO
    handlers: [FOO, BAR]
",
        )
        .expect("plan");
        let logger = &plan.loggers["com.foo"];
        assert_eq!(logger.level, Some(LogLevel::Debug));
        assert_eq!(logger.handlers, vec!["FOO", "BAR"]);
        assert!(!logger.effective_use_parent_handlers());
    }

    #[test]
    fn test_logger_without_handlers_must_use_parent() {
        let err = parse("loggers:\n  com.foo:\n    use-parent-handlers: false\n").expect_err("invalid");
        assert!(matches!(err, DeployerError::Plan(PlanError::Invalid { .. })));
    }

    #[test]
    fn test_log_handler_defaults() {
        let plan = parse("log-handlers:\n  FOO:\n").expect("plan");
        let handler = &plan.log_handlers["FOO"];
        assert_eq!(handler.handler_type, LogHandlerType::PeriodicRotatingFile);
        assert_eq!(handler.level, Some(LogLevel::All));
        assert_eq!(handler.file.as_deref(), Some("foo.log"));
        assert_eq!(handler.suffix.as_deref(), Some(".yyyy-MM-dd"));
        assert_eq!(handler.format.as_deref(), Some(DEFAULT_LOG_FORMAT));
    }

    #[test]
    fn test_log_handler_format_conflict() {
        let err = parse("log-handlers:\n  FOO:\n    format: '%m'\n    formatter: JSON\n").expect_err("conflict");
        assert!(matches!(err, DeployerError::Plan(PlanError::Invalid { .. })));
    }

    #[test]
    fn test_custom_handler_needs_module_and_class() {
        let err = parse("log-handlers:\n  C:\n    type: custom\n    module: org.foo\n").expect_err("custom");
        assert!(matches!(err, DeployerError::Plan(PlanError::Invalid { .. })));

        let plan = parse(
            r"
log-handlers:
  C:
    type: custom
    module: org.foo
    class: org.foo.Handler
    properties:
      port: 514
",
        )
        .expect("plan");
        assert_eq!(plan.log_handlers["C"].properties["port"], "514");
    }

    #[test]
    fn test_data_source_defaults() {
        let plan = parse(
            r"
data-sources:
  foo:
    uri: jdbc:postgresql://db.example.org:5432/foo
    user-name: joe
    password: secret
",
        )
        .expect("plan");
        let ds = &plan.data_sources["foo"];
        assert_eq!(ds.driver.as_deref(), Some("postgresql"));
        assert_eq!(ds.jndi_name.as_deref(), Some("java:/datasources/fooDS"));
        assert!(!ds.xa);
    }

    #[test]
    fn test_data_source_uri_required() {
        let err = parse("data-sources:\n  foo:\n    driver: h2\n").expect_err("uri");
        assert!(matches!(err, DeployerError::Plan(PlanError::Invalid { .. })));
    }

    #[test]
    fn test_driver_from_uri() {
        assert_eq!(driver_from_uri("jdbc:h2:mem:test").as_deref(), Some("h2"));
        assert_eq!(driver_from_uri("jdbc:postgresql://host/db").as_deref(), Some("postgresql"));
        assert_eq!(driver_from_uri("postgresql://host/db"), None);
        assert_eq!(driver_from_uri("jdbc:"), None);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(parse("deployables:\n  foo:\n    group-id: g\n    colour: red\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let err = PlanLoader::new().load_file(dir.path().join("plan.yaml")).expect_err("missing");
        assert!(matches!(err, DeployerError::Plan(PlanError::FileNotFound { .. })));
    }

    #[test]
    fn test_load_file_with_group_default() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("plan.yaml");
        std::fs::write(&path, "deployables:\n  foo:\n    version: 1.0.0\n").expect("write");

        let defaults = PlanDefaults {
            group_id: Some("org.example".to_string()),
            ..PlanDefaults::default()
        };
        let plan = PlanLoader::new().with_defaults(defaults).load_file(&path).expect("plan");
        assert_eq!(plan.deployables["foo"].group_id.as_deref(), Some("org.example"));
    }
}
