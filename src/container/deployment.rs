//! Deployments: `/deployment=<name>`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use super::address::Address;
use super::node;
use super::operation::{Operation, OperationKind};
use super::Container;
use crate::error::{ContainerError, Result};
use crate::plan::{ArtifactType, Checksum, ResourceKind};

const KIND: ResourceKind = ResourceKind::Deployables;

/// A deployment as it exists in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentResource {
    /// Name in the container, including the archive suffix.
    pub name: String,
    /// SHA-1 of the deployed content.
    pub checksum: Checksum,
    /// Whether the deployment is enabled.
    pub enabled: bool,
}

impl DeploymentResource {
    /// Address of a deployment.
    #[must_use]
    pub fn address(name: &str) -> Address {
        Address::root().and("deployment", name)
    }

    /// Name without the archive suffix, as used in plans.
    #[must_use]
    pub fn logical_name(&self) -> &str {
        ArtifactType::from_deployment_name(&self.name)
            .deployment_suffix()
            .and_then(|suffix| self.name.strip_suffix(suffix))
            .unwrap_or(&self.name)
    }

    /// Builds the resource from a read-resource result.
    ///
    /// # Errors
    ///
    /// Returns an error if the content hash is malformed.
    pub fn from_node(name: &str, node: &Value) -> Result<Self> {
        let checksum = match node
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("hash"))
            .and_then(|h| h.get("BYTES_VALUE"))
            .and_then(Value::as_str)
        {
            Some(encoded) => {
                let bytes = STANDARD.decode(encoded).map_err(|e| {
                    ContainerError::invalid_response(format!("bad content hash of deployment {name}: {e}"))
                })?;
                Checksum::from_bytes(&bytes)
            }
            None => Checksum::new(""),
        };

        Ok(Self {
            name: name.to_string(),
            checksum,
            enabled: node::boolean(node, "enabled").unwrap_or(true),
        })
    }

    /// Replaces the content of this deployment.
    #[must_use]
    pub fn redeploy(&self, content: Vec<u8>) -> Operation {
        Operation::new(OperationKind::FullReplaceDeployment, KIND, Address::root())
            .param("name", self.name.as_str())
            .param("runtime-name", self.name.as_str())
            .param("enabled", true)
            .with_content(content)
    }

    /// Undeploys and removes this deployment.
    #[must_use]
    pub fn remove(&self) -> Vec<Operation> {
        let address = Self::address(&self.name);
        vec![
            Operation::new(OperationKind::Undeploy, KIND, address.clone()),
            Operation::remove(KIND, address),
        ]
    }
}

/// A deployment to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSpec {
    /// Name in the container, including the archive suffix.
    pub name: String,
    /// Archive content.
    pub content: Vec<u8>,
}

impl DeploymentSpec {
    /// The add operation, deploying the content right away.
    #[must_use]
    pub fn add(self) -> Operation {
        Operation::add(KIND, DeploymentResource::address(&self.name))
            .param("runtime-name", self.name.as_str())
            .param("enabled", true)
            .with_content(self.content)
    }
}

/// Reads one deployment.
///
/// # Errors
///
/// Returns an error if the read fails.
pub async fn read(container: &Container, name: &str) -> Result<Option<DeploymentResource>> {
    match container.read_resource(&DeploymentResource::address(name)).await? {
        Some(node) => Ok(Some(DeploymentResource::from_node(name, &node)?)),
        None => Ok(None),
    }
}

/// Reads all deployments.
///
/// # Errors
///
/// Returns an error if the read fails.
pub async fn list(container: &Container) -> Result<Vec<DeploymentResource>> {
    let children = container
        .read_children(&DeploymentResource::address(Address::WILDCARD))
        .await?;
    let mut deployments = Vec::with_capacity(children.len());
    for (address, node) in children {
        if let Some(name) = address.last_value() {
            deployments.push(DeploymentResource::from_node(name, &node)?);
        }
    }
    Ok(deployments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeManagementClient;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_read_checksum() {
        let client = Arc::new(FakeManagementClient::new());
        client.insert_deployment("foo.war", "abc123");
        let container = Container::new(client);

        let deployment = read(&container, "foo.war").await.expect("read").expect("exists");
        assert_eq!(deployment.checksum, Checksum::new("abc123"));
        assert_eq!(deployment.logical_name(), "foo");
        assert!(read(&container, "bar.war").await.expect("read").is_none());
    }

    #[tokio::test]
    async fn test_list() {
        let client = Arc::new(FakeManagementClient::new());
        client.insert_deployment("a.war", "aa");
        client.insert_deployment("b.ear", "bb");
        let container = Container::new(client);

        let names: Vec<_> = list(&container)
            .await
            .expect("list")
            .iter()
            .map(|d| d.logical_name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_remove_undeploys_first() {
        let deployment = DeploymentResource {
            name: "foo.war".into(),
            checksum: Checksum::new("abc123"),
            enabled: true,
        };
        let kinds: Vec<_> = deployment.remove().iter().map(Operation::kind).collect();
        assert_eq!(kinds, vec![OperationKind::Undeploy, OperationKind::Remove]);
        assert_eq!(deployment.redeploy(vec![1]).get("name"), Some(&Value::from("foo.war")));
    }
}
