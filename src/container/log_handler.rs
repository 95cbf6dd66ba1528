//! Log handlers: `/subsystem=logging/<type>-handler=<name>`.

use indexmap::IndexMap;
use serde_json::{Map, Value, json};

use super::address::Address;
use super::node;
use super::operation::Operation;
use super::Container;
use crate::error::Result;
use crate::plan::{LogHandlerType, LogLevel, ResourceKind};

const KIND: ResourceKind = ResourceKind::LogHandlers;

/// Directory file handlers write relative to.
pub const LOG_DIR: &str = "jboss.server.log.dir";

/// The `file` attribute for a path below [`LOG_DIR`].
#[must_use]
pub fn file_value(path: &str) -> Value {
    json!({ "path": path, "relative-to": LOG_DIR })
}

/// A log handler as it exists in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHandlerResource {
    /// Handler type.
    pub handler_type: LogHandlerType,
    /// Handler name.
    pub name: String,
    /// Level.
    pub level: Option<LogLevel>,
    /// Pattern, the `formatter` attribute.
    pub format: Option<String>,
    /// Named formatter.
    pub formatter: Option<String>,
    /// Encoding.
    pub encoding: Option<String>,
    /// File path below the log directory.
    pub file: Option<String>,
    /// Rotation suffix.
    pub suffix: Option<String>,
    /// Module of a custom handler.
    pub module: Option<String>,
    /// Class of a custom handler.
    pub class: Option<String>,
    /// Properties of a custom handler.
    pub properties: IndexMap<String, String>,
}

impl LogHandlerResource {
    /// Address of a handler.
    #[must_use]
    pub fn address(handler_type: LogHandlerType, name: &str) -> Address {
        Address::root()
            .and("subsystem", "logging")
            .and(handler_type.address_key(), name)
    }

    /// Builds the resource from a read-resource result.
    #[must_use]
    pub fn from_node(handler_type: LogHandlerType, name: &str, node: &Value) -> Self {
        Self {
            handler_type,
            name: name.to_string(),
            level: node::string(node, "level").map(|l| LogLevel::from_container(&l)),
            format: node::string(node, "formatter"),
            formatter: node::string(node, "named-formatter"),
            encoding: node::string(node, "encoding"),
            file: node
                .get("file")
                .and_then(|file| node::string(file, "path")),
            suffix: node::string(node, "suffix"),
            module: node::string(node, "module"),
            class: node::string(node, "class"),
            properties: node::string_map(node, "properties"),
        }
    }

    fn own_address(&self) -> Address {
        Self::address(self.handler_type, &self.name)
    }

    /// Writes an attribute.
    #[must_use]
    pub fn write(&self, name: &str, value: Option<Value>) -> Operation {
        Operation::write_attribute(KIND, self.own_address(), name, value)
    }

    /// Sets one property.
    #[must_use]
    pub fn put_property(&self, key: &str, value: &str) -> Operation {
        Operation::map_put(KIND, self.own_address(), "properties", key, value)
    }

    /// Removes one property.
    #[must_use]
    pub fn remove_property(&self, key: &str) -> Operation {
        Operation::map_remove(KIND, self.own_address(), "properties", key)
    }

    /// Removes the handler.
    #[must_use]
    pub fn remove(&self) -> Operation {
        Operation::remove(KIND, self.own_address())
    }
}

/// A log handler to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogHandlerSpec {
    /// Handler type.
    pub handler_type: LogHandlerType,
    /// Handler name.
    pub name: String,
    /// Level.
    pub level: Option<LogLevel>,
    /// Pattern.
    pub format: Option<String>,
    /// Named formatter.
    pub formatter: Option<String>,
    /// Encoding.
    pub encoding: Option<String>,
    /// File path below the log directory.
    pub file: Option<String>,
    /// Rotation suffix.
    pub suffix: Option<String>,
    /// Module.
    pub module: Option<String>,
    /// Class.
    pub class: Option<String>,
    /// Properties.
    pub properties: IndexMap<String, String>,
}

impl LogHandlerSpec {
    /// Creates an empty spec.
    #[must_use]
    pub fn new(handler_type: LogHandlerType, name: impl Into<String>) -> Self {
        Self {
            handler_type,
            name: name.into(),
            ..Self::default()
        }
    }

    /// The add operation.
    #[must_use]
    pub fn add(self) -> Operation {
        let mut operation = Operation::add(KIND, LogHandlerResource::address(self.handler_type, &self.name));
        let strings = [
            ("level", self.level.map(|l| l.as_str().to_string())),
            ("formatter", self.format),
            ("named-formatter", self.formatter),
            ("encoding", self.encoding),
            ("suffix", self.suffix),
            ("module", self.module),
            ("class", self.class),
        ];
        for (name, value) in strings {
            if let Some(value) = value {
                operation = operation.param(name, value);
            }
        }
        if let Some(file) = &self.file {
            operation = operation.param("file", file_value(file));
        }
        if !self.properties.is_empty() {
            let properties: Map<String, Value> = self
                .properties
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();
            operation = operation.param("properties", properties);
        }
        operation
    }
}

/// Reads one handler.
///
/// # Errors
///
/// Returns an error if the read fails.
pub async fn read(container: &Container, handler_type: LogHandlerType, name: &str) -> Result<Option<LogHandlerResource>> {
    Ok(container
        .read_resource(&LogHandlerResource::address(handler_type, name))
        .await?
        .map(|node| LogHandlerResource::from_node(handler_type, name, &node)))
}

/// Reads the handler with this name, whatever its type. The expected type
/// is tried first.
///
/// # Errors
///
/// Returns an error if a read fails.
pub async fn find(container: &Container, expected: LogHandlerType, name: &str) -> Result<Option<LogHandlerResource>> {
    let others = LogHandlerType::ALL.into_iter().filter(|t| *t != expected);
    for handler_type in std::iter::once(expected).chain(others) {
        if let Some(handler) = read(container, handler_type, name).await? {
            return Ok(Some(handler));
        }
    }
    Ok(None)
}

/// Reads all handlers of every supported type.
///
/// # Errors
///
/// Returns an error if a read fails.
pub async fn list(container: &Container) -> Result<Vec<LogHandlerResource>> {
    let mut handlers = Vec::new();
    for handler_type in LogHandlerType::ALL {
        let children = container
            .read_children(&LogHandlerResource::address(handler_type, Address::WILDCARD))
            .await?;
        handlers.extend(children.iter().filter_map(|(address, node)| {
            address
                .last_value()
                .map(|name| LogHandlerResource::from_node(handler_type, name, node))
        }));
    }
    Ok(handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::OperationKind;
    use crate::testing::FakeManagementClient;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_read_file_handler() {
        let client = Arc::new(FakeManagementClient::new());
        client.insert(
            LogHandlerResource::address(LogHandlerType::PeriodicRotatingFile, "FOO"),
            json!({
                "level": "ALL",
                "formatter": "%s%n",
                "file": {"path": "foo.log", "relative-to": LOG_DIR},
                "suffix": ".yyyy-MM-dd"
            }),
        );
        client.insert(
            LogHandlerResource::address(LogHandlerType::Console, "CONSOLE"),
            json!({"level": "INFO"}),
        );
        let container = Container::new(client);

        let handler = read(&container, LogHandlerType::PeriodicRotatingFile, "FOO")
            .await
            .expect("read")
            .expect("exists");
        assert_eq!(handler.file.as_deref(), Some("foo.log"));
        assert_eq!(handler.format.as_deref(), Some("%s%n"));
        assert_eq!(handler.level, Some(LogLevel::All));

        let all = list(&container).await.expect("list");
        let names: Vec<_> = all.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["CONSOLE", "FOO"]);
    }

    #[test]
    fn test_add_custom_handler() {
        let mut spec = LogHandlerSpec::new(LogHandlerType::Custom, "SYSLOG");
        spec.module = Some("org.foo".into());
        spec.class = Some("org.foo.Handler".into());
        spec.properties.insert("port".into(), "514".into());

        let step = spec.add().to_step(None);
        assert_eq!(
            step["address"],
            json!([{"subsystem": "logging"}, {"custom-handler": "SYSLOG"}])
        );
        assert_eq!(step["properties"]["port"], "514");
        assert!(step.get("file").is_none());
    }

    #[test]
    fn test_property_operations() {
        let handler = LogHandlerResource::from_node(LogHandlerType::Custom, "SYSLOG", &json!({}));
        assert_eq!(handler.put_property("a", "1").kind(), OperationKind::MapPut);
        assert_eq!(handler.remove_property("a").kind(), OperationKind::MapRemove);
    }
}
