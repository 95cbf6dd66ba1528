//! Data sources: `/subsystem=datasources/data-source=<name>` and
//! `/subsystem=datasources/xa-data-source=<name>`.
//!
//! XA data sources have no connection URL. The URI is split into the
//! `ServerName`, `PortNumber` and `DatabaseName` XA properties, stored as
//! `xa-datasource-properties` children, and reassembled when read.

use serde_json::Value;
use url::Url;

use super::address::Address;
use super::node;
use super::operation::Operation;
use super::Container;
use crate::error::{PlanError, Result};
use crate::plan::ResourceKind;

const KIND: ResourceKind = ResourceKind::DataSources;

const XA_PROPERTIES: &str = "xa-datasource-properties";

/// The XA properties of a JDBC URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XaProperties {
    /// Database host.
    pub server_name: String,
    /// Database port.
    pub port_number: Option<u16>,
    /// Database name.
    pub database_name: String,
}

impl XaProperties {
    /// Splits a `jdbc:<driver>://host[:port]/database` URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI has no host.
    pub fn from_uri(name: &str, uri: &str) -> Result<Self> {
        let url = Url::parse(uri.strip_prefix("jdbc:").unwrap_or(uri))
            .map_err(|e| PlanError::invalid(KIND.name(), name, format!("invalid uri {uri}: {e}")))?;
        let server_name = url
            .host_str()
            .ok_or_else(|| PlanError::invalid(KIND.name(), name, format!("uri {uri} has no host")))?
            .to_string();
        Ok(Self {
            server_name,
            port_number: url.port(),
            database_name: url.path().trim_start_matches('/').to_string(),
        })
    }

    /// Name and value of each property, in the order they are added.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![("ServerName", self.server_name.clone())];
        if let Some(port) = self.port_number {
            entries.push(("PortNumber", port.to_string()));
        }
        entries.push(("DatabaseName", self.database_name.clone()));
        entries
    }
}

/// A data source as it exists in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceResource {
    /// Name.
    pub name: String,
    /// XA data source.
    pub xa: bool,
    /// Driver name.
    pub driver: Option<String>,
    /// JNDI name.
    pub jndi_name: Option<String>,
    /// Connection URI.
    pub uri: Option<String>,
    /// User name.
    pub user_name: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Minimum pool size.
    pub min_pool_size: Option<u32>,
    /// Initial pool size.
    pub initial_pool_size: Option<u32>,
    /// Maximum pool size.
    pub max_pool_size: Option<u32>,
    /// Idle timeout in minutes.
    pub max_age: Option<u32>,
}

impl DataSourceResource {
    /// Address of a data source.
    #[must_use]
    pub fn address(name: &str, xa: bool) -> Address {
        let key = if xa { "xa-data-source" } else { "data-source" };
        Address::root().and("subsystem", "datasources").and(key, name)
    }

    /// Builds the resource from a read-resource result.
    #[must_use]
    pub fn from_node(name: &str, xa: bool, node: &Value) -> Self {
        let driver = node::string(node, "driver-name");
        let uri = if xa {
            Self::xa_uri(driver.as_deref(), node)
        } else {
            node::string(node, "connection-url")
        };
        Self {
            name: name.to_string(),
            xa,
            driver,
            jndi_name: node::string(node, "jndi-name"),
            uri,
            user_name: node::string(node, "user-name"),
            password: node::string(node, "password"),
            min_pool_size: node::number(node, "min-pool-size"),
            initial_pool_size: node::number(node, "initial-pool-size"),
            max_pool_size: node::number(node, "max-pool-size"),
            max_age: node::number(node, "idle-timeout-minutes"),
        }
    }

    fn xa_uri(driver: Option<&str>, node: &Value) -> Option<String> {
        let properties = node.get(XA_PROPERTIES)?;
        let property = |name: &str| properties.get(name).and_then(|p| node::string(p, "value"));
        let port = property("PortNumber").map(|p| format!(":{p}")).unwrap_or_default();
        Some(format!(
            "jdbc:{}://{}{}/{}",
            driver.unwrap_or_default(),
            property("ServerName")?,
            port,
            property("DatabaseName").unwrap_or_default()
        ))
    }

    fn own_address(&self) -> Address {
        Self::address(&self.name, self.xa)
    }

    /// Writes an attribute.
    #[must_use]
    pub fn write(&self, name: &str, value: Option<Value>) -> Operation {
        Operation::write_attribute(KIND, self.own_address(), name, value)
    }

    /// Points the data source at another URI: the connection URL, or the XA
    /// properties of an XA data source.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI of an XA data source cannot be split.
    pub fn write_uri(&self, uri: Option<&str>) -> Result<Vec<Operation>> {
        if !self.xa {
            return Ok(vec![self.write("connection-url", uri.map(Value::from))]);
        }
        let Some(uri) = uri else {
            return Ok(Vec::new());
        };
        let old = self
            .uri
            .as_deref()
            .and_then(|old| XaProperties::from_uri(&self.name, old).ok())
            .map(|p| p.entries())
            .unwrap_or_default();
        let address = self.own_address();
        Ok(XaProperties::from_uri(&self.name, uri)?
            .entries()
            .into_iter()
            .map(|(name, value)| {
                let property = address.clone().and(XA_PROPERTIES, name);
                if old.iter().any(|(old_name, _)| *old_name == name) {
                    Operation::write_attribute(KIND, property, "value", Some(Value::from(value)))
                } else {
                    Operation::add(KIND, property).param("value", value)
                }
            })
            .collect())
    }

    /// Removes the data source.
    #[must_use]
    pub fn remove(&self) -> Operation {
        Operation::remove(KIND, self.own_address())
    }
}

/// A data source to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSourceSpec {
    /// Name.
    pub name: String,
    /// XA data source.
    pub xa: bool,
    /// Driver name.
    pub driver: Option<String>,
    /// JNDI name.
    pub jndi_name: Option<String>,
    /// Connection URI.
    pub uri: Option<String>,
    /// User name.
    pub user_name: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Minimum pool size.
    pub min_pool_size: Option<u32>,
    /// Initial pool size.
    pub initial_pool_size: Option<u32>,
    /// Maximum pool size.
    pub max_pool_size: Option<u32>,
    /// Idle timeout in minutes.
    pub max_age: Option<u32>,
}

impl DataSourceSpec {
    /// Creates an empty spec.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The add operation, followed by the XA property adds of an XA data
    /// source. The data source is enabled right away.
    ///
    /// # Errors
    ///
    /// Returns an error if an XA data source has no usable URI.
    pub fn add(self) -> Result<Vec<Operation>> {
        let address = DataSourceResource::address(&self.name, self.xa);
        let mut add = Operation::add(KIND, address.clone());

        let strings = [
            ("jndi-name", self.jndi_name),
            ("driver-name", self.driver),
            ("user-name", self.user_name),
            ("password", self.password),
        ];
        for (name, value) in strings {
            if let Some(value) = value {
                add = add.param(name, value);
            }
        }
        let numbers = [
            ("min-pool-size", self.min_pool_size),
            ("initial-pool-size", self.initial_pool_size),
            ("max-pool-size", self.max_pool_size),
            ("idle-timeout-minutes", self.max_age),
        ];
        for (name, value) in numbers {
            if let Some(value) = value {
                add = add.param(name, value);
            }
        }
        add = add.param("enabled", true);

        if !self.xa {
            if let Some(uri) = self.uri {
                add = add.param("connection-url", uri);
            }
            return Ok(vec![add]);
        }

        let uri = self
            .uri
            .ok_or_else(|| PlanError::invalid(KIND.name(), &self.name, "xa data source without uri"))?;
        let mut operations = vec![add];
        for (name, value) in XaProperties::from_uri(&self.name, &uri)?.entries() {
            operations.push(Operation::add(KIND, address.clone().and(XA_PROPERTIES, name)).param("value", value));
        }
        Ok(operations)
    }
}

async fn read_one(container: &Container, name: &str, xa: bool) -> Result<Option<DataSourceResource>> {
    Ok(container
        .read_resource(&DataSourceResource::address(name, xa))
        .await?
        .map(|node| DataSourceResource::from_node(name, xa, &node)))
}

/// Reads one data source, plain or XA.
///
/// # Errors
///
/// Returns an error if a read fails.
pub async fn read(container: &Container, name: &str) -> Result<Option<DataSourceResource>> {
    match read_one(container, name, false).await? {
        Some(data_source) => Ok(Some(data_source)),
        None => read_one(container, name, true).await,
    }
}

/// Reads all data sources, plain and XA, sorted by name.
///
/// # Errors
///
/// Returns an error if a read fails.
pub async fn list(container: &Container) -> Result<Vec<DataSourceResource>> {
    let mut data_sources = Vec::new();
    for xa in [false, true] {
        let children = container
            .read_children(&DataSourceResource::address(Address::WILDCARD, xa))
            .await?;
        data_sources.extend(children.iter().filter_map(|(address, node)| {
            address
                .last_value()
                .map(|name| DataSourceResource::from_node(name, xa, node))
        }));
    }
    data_sources.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(data_sources)
}
