//! Loggers: `/subsystem=logging/logger=<category>` and the root logger.

use serde_json::Value;

use super::address::Address;
use super::node;
use super::operation::{Operation, OperationKind};
use super::Container;
use crate::error::Result;
use crate::plan::{LogLevel, LoggerPlan, ResourceKind};

const KIND: ResourceKind = ResourceKind::Loggers;

/// A logger as it exists in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerResource {
    /// Category, `ROOT` for the root logger.
    pub category: String,
    /// Level.
    pub level: Option<LogLevel>,
    /// Attached handlers.
    pub handlers: Vec<String>,
    /// Use-parent-handlers; the root logger has none.
    pub use_parent_handlers: Option<bool>,
}

impl LoggerResource {
    /// Address of a logger.
    #[must_use]
    pub fn address(category: &str) -> Address {
        let logging = Address::root().and("subsystem", "logging");
        if category == LoggerPlan::ROOT {
            logging.and("root-logger", LoggerPlan::ROOT)
        } else {
            logging.and("logger", category)
        }
    }

    /// Builds the resource from a read-resource result.
    #[must_use]
    pub fn from_node(category: &str, node: &Value) -> Self {
        Self {
            category: category.to_string(),
            level: node::string(node, "level").map(|l| LogLevel::from_container(&l)),
            handlers: node::string_list(node, "handlers"),
            use_parent_handlers: node::boolean(node, "use-parent-handlers"),
        }
    }

    /// Returns true for the root logger.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.category == LoggerPlan::ROOT
    }

    /// Writes an attribute.
    #[must_use]
    pub fn write(&self, name: &str, value: Option<Value>) -> Operation {
        Operation::write_attribute(KIND, Self::address(&self.category), name, value)
    }

    /// Attaches a handler.
    #[must_use]
    pub fn add_handler(&self, handler: &str) -> Operation {
        Operation::new(OperationKind::AddHandler, KIND, Self::address(&self.category)).param("name", handler)
    }

    /// Detaches a handler.
    #[must_use]
    pub fn remove_handler(&self, handler: &str) -> Operation {
        Operation::new(OperationKind::RemoveHandler, KIND, Self::address(&self.category)).param("name", handler)
    }

    /// Removes the logger.
    #[must_use]
    pub fn remove(&self) -> Operation {
        Operation::remove(KIND, Self::address(&self.category))
    }
}

/// A logger to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggerSpec {
    /// Category.
    pub category: String,
    /// Level.
    pub level: Option<LogLevel>,
    /// Handlers.
    pub handlers: Vec<String>,
    /// Use-parent-handlers.
    pub use_parent_handlers: Option<bool>,
}

impl LoggerSpec {
    /// Creates an empty spec.
    #[must_use]
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Self::default()
        }
    }

    /// The add operation.
    #[must_use]
    pub fn add(self) -> Operation {
        let mut operation = Operation::add(KIND, LoggerResource::address(&self.category));
        if let Some(level) = self.level {
            operation = operation.param("level", level.as_str());
        }
        if !self.handlers.is_empty() {
            operation = operation.param("handlers", self.handlers);
        }
        if let Some(use_parent_handlers) = self.use_parent_handlers {
            operation = operation.param("use-parent-handlers", use_parent_handlers);
        }
        operation
    }
}

/// Reads one logger.
///
/// # Errors
///
/// Returns an error if the read fails.
pub async fn read(container: &Container, category: &str) -> Result<Option<LoggerResource>> {
    Ok(container
        .read_resource(&LoggerResource::address(category))
        .await?
        .map(|node| LoggerResource::from_node(category, &node)))
}

/// Reads all non-root loggers.
///
/// # Errors
///
/// Returns an error if the read fails.
pub async fn list(container: &Container) -> Result<Vec<LoggerResource>> {
    let children = container
        .read_children(&LoggerResource::address(Address::WILDCARD))
        .await?;
    Ok(children
        .iter()
        .filter_map(|(address, node)| {
            address
                .last_value()
                .map(|category| LoggerResource::from_node(category, node))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeManagementClient;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_root_address() {
        assert_eq!(LoggerResource::address("ROOT").to_string(), "/subsystem=logging/root-logger=ROOT");
        assert_eq!(LoggerResource::address("com.foo").to_string(), "/subsystem=logging/logger=com.foo");
    }

    #[tokio::test]
    async fn test_read_and_list() {
        let client = Arc::new(FakeManagementClient::new());
        client.insert(
            LoggerResource::address("com.foo"),
            json!({"level": "FINE", "handlers": ["FILE"], "use-parent-handlers": false}),
        );
        client.insert(LoggerResource::address("ROOT"), json!({"level": "INFO"}));
        let container = Container::new(client);

        let logger = read(&container, "com.foo").await.expect("read").expect("exists");
        assert_eq!(logger.level, Some(LogLevel::Debug));
        assert_eq!(logger.handlers, vec!["FILE"]);
        assert_eq!(logger.use_parent_handlers, Some(false));

        let all = list(&container).await.expect("list");
        assert_eq!(all.len(), 1);
        assert!(read(&container, "ROOT").await.expect("read").is_some_and(|r| r.is_root()));
    }

    #[test]
    fn test_add_operation() {
        let spec = LoggerSpec {
            category: "com.foo".into(),
            level: Some(LogLevel::Info),
            handlers: vec!["A".into()],
            use_parent_handlers: Some(false),
        };
        let step = spec.add().to_step(None);
        assert_eq!(step["level"], "INFO");
        assert_eq!(step["handlers"], json!(["A"]));
        assert_eq!(step["use-parent-handlers"], false);
    }
}
