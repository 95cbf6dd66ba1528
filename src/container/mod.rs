//! Access to the application server's management model.
//!
//! - Addresses, operations and their commit order
//! - The [`ManagementClient`] seam and its HTTP implementation
//! - [`Container`]: reads, and the one open [`Batch`] of a run
//! - One accessor per resource kind

mod address;
mod batch;
mod client;
pub mod data_source;
pub mod deployment;
pub mod log_handler;
pub mod logger;
mod node;
mod not_found;
mod operation;
mod sequence;

pub use address::Address;
pub use batch::{Batch, ProcessState};
pub use client::{HttpManagementClient, ManagementClient, ManagementRequest, ManagementResponse, Outcome};
pub use not_found::{MessageTemplate, NotFoundMatcher};
pub use operation::{Direction, Operation, OperationKind, SortKey};
pub use sequence::sort_for_commit;

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::{ContainerError, Result};

/// How long [`Container::wait_for_boot`] waits by default.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval while waiting for boot.
const BOOT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Handle on one container.
///
/// At most one batch is open at a time. Concurrent runs against the same
/// container must be serialized by the caller.
pub struct Container {
    client: Arc<dyn ManagementClient>,
    not_found: NotFoundMatcher,
    batch: Option<Batch>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("not_found", &self.not_found)
            .field("batch", &self.batch.as_ref().map(Batch::id))
            .finish_non_exhaustive()
    }
}

impl Container {
    /// Creates a handle using the given client.
    #[must_use]
    pub fn new(client: Arc<dyn ManagementClient>) -> Self {
        Self {
            client,
            not_found: NotFoundMatcher::default(),
            batch: None,
        }
    }

    /// Replaces the not-found matcher.
    #[must_use]
    pub fn with_not_found_matcher(mut self, matcher: NotFoundMatcher) -> Self {
        self.not_found = matcher;
        self
    }

    /// Reads a resource and its children. A missing resource is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, or the read fails for another
    /// reason than the resource not existing.
    pub async fn read_resource(&self, address: &Address) -> Result<Option<Value>> {
        let request = ManagementRequest::single("read-resource", address).param("recursive", true);
        let response = self.client.execute(request).await?;

        if response.is_success() {
            return Ok(Some(response.result));
        }

        let description = response.failure_description.unwrap_or_default();
        if self.not_found.is_not_found(&description) {
            debug!("{} does not exist", address);
            return Ok(None);
        }

        Err(ContainerError::OperationFailed {
            operation: format!("read-resource {address}"),
            description,
        }
        .into())
    }

    /// Reads every child matching a wildcard address, e.g.
    /// `/subsystem=logging/logger=*`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails. A missing parent yields no children.
    pub async fn read_children(&self, pattern: &Address) -> Result<Vec<(Address, Value)>> {
        let request = ManagementRequest::single("read-resource", pattern).param("recursive", true);
        let response = self.client.execute(request).await?;

        if !response.is_success() {
            let description = response.failure_description.unwrap_or_default();
            if self.not_found.is_not_found(&description) {
                return Ok(Vec::new());
            }
            return Err(ContainerError::OperationFailed {
                operation: format!("read-resource {pattern}"),
                description,
            }
            .into());
        }

        let items = response
            .result
            .as_array()
            .ok_or_else(|| ContainerError::invalid_response(format!("expected a list reading {pattern}")))?;

        let mut children = Vec::with_capacity(items.len());
        for item in items {
            if item.get("outcome").and_then(Value::as_str) != Some("success") {
                continue;
            }
            let address = item
                .get("address")
                .and_then(Address::from_json)
                .ok_or_else(|| ContainerError::invalid_response(format!("child of {pattern} without address")))?;
            children.push((address, item.get("result").cloned().unwrap_or(Value::Null)));
        }
        Ok(children)
    }

    /// Reads one attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or the read fails.
    pub async fn read_attribute(&self, address: &Address, name: &str) -> Result<Value> {
        let request = ManagementRequest::single("read-attribute", address).param("name", name);
        let response = self.client.execute(request).await?;
        if response.is_success() {
            Ok(response.result)
        } else {
            Err(ContainerError::OperationFailed {
                operation: format!("read-attribute {address} {name}"),
                description: response.failure_description.unwrap_or_default(),
            }
            .into())
        }
    }

    /// Opens a batch.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::BatchAlreadyOpen`] if a batch is open.
    pub fn start_batch(&mut self) -> Result<()> {
        if let Some(open) = &self.batch {
            return Err(ContainerError::BatchAlreadyOpen {
                open: open.id().to_string(),
            }
            .into());
        }
        let batch = Batch::new();
        debug!("Started batch {}", batch.id());
        self.batch = Some(batch);
        Ok(())
    }

    /// Adds an operation to the open batch.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NoBatchOpen`] if no batch is open.
    pub fn add_step(&mut self, operation: Operation) -> Result<()> {
        let batch = self.batch.as_mut().ok_or(ContainerError::NoBatchOpen)?;
        debug!("add step {}", operation);
        batch.push(operation);
        Ok(())
    }

    /// Operations collected so far, in insertion order.
    #[must_use]
    pub fn pending(&self) -> &[Operation] {
        self.batch.as_ref().map_or(&[] as &[Operation], Batch::operations)
    }

    /// Returns true if a batch is open.
    #[must_use]
    pub const fn has_open_batch(&self) -> bool {
        self.batch.is_some()
    }

    /// Discards the open batch without sending anything. Returns the
    /// discarded operations in commit order.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NoBatchOpen`] if no batch is open.
    pub fn rollback(&mut self) -> Result<Vec<Operation>> {
        let batch = self.batch.take().ok_or(ContainerError::NoBatchOpen)?;
        debug!("Rolled back batch {} with {} operations", batch.id(), batch.len());
        Ok(batch.into_sorted())
    }

    /// Sends the open batch as one composite request.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NoBatchOpen`] if no batch is open, the
    /// server's failure description if the composite failed, or an error for
    /// an unexpected process state.
    pub async fn commit(&mut self) -> Result<ProcessState> {
        let batch = self.batch.take().ok_or(ContainerError::NoBatchOpen)?;
        if batch.is_empty() {
            debug!("Batch {} is empty, nothing to commit", batch.id());
            return Ok(ProcessState::Running);
        }

        let id = batch.id();
        let steps = batch.len();
        let response = self.client.execute(batch.into_request()).await?;

        if !response.is_success() {
            let description = response.failure_description.unwrap_or_default();
            error!("Batch {} failed: {}", id, description);
            return Err(ContainerError::OperationFailed {
                operation: "composite".to_string(),
                description,
            }
            .into());
        }

        let state = ProcessState::from_header(response.process_state.as_deref())?;
        info!("Committed batch {} with {} operations, process state {}", id, steps, state);
        Ok(state)
    }

    /// Polls the server state until it is running.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::BootTimeout`] if the server is not running in time.
    pub async fn wait_for_boot(&self, timeout: Duration) -> Result<()> {
        let poll = async {
            loop {
                match self.read_attribute(&Address::root(), "server-state").await {
                    Ok(Value::String(state)) if state == "running" => return,
                    Ok(state) => debug!("server state: {}", state),
                    Err(e) => debug!("server not reachable yet: {}", e),
                }
                tokio::time::sleep(BOOT_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll).await.map_err(|_| {
            ContainerError::BootTimeout {
                timeout_secs: timeout.as_secs(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployerError;
    use crate::plan::ResourceKind;
    use crate::testing::FakeManagementClient;
    use serde_json::json;

    fn logger_address(category: &str) -> Address {
        Address::root().and("subsystem", "logging").and("logger", category)
    }

    #[tokio::test]
    async fn test_read_missing_resource_is_none() {
        let client = Arc::new(FakeManagementClient::new());
        let container = Container::new(client);
        assert_eq!(container.read_resource(&logger_address("x")).await.expect("read"), None);
    }

    #[tokio::test]
    async fn test_read_other_failure_is_error() {
        let client = Arc::new(FakeManagementClient::new());
        client.fail_reads("WFLYCTL0030: No resource definition is registered");
        let container = Container::new(client);
        let err = container.read_resource(&logger_address("x")).await.expect_err("fail");
        assert!(matches!(err, DeployerError::Container(ContainerError::OperationFailed { .. })));
    }

    #[tokio::test]
    async fn test_read_children() {
        let client = Arc::new(FakeManagementClient::new());
        client.insert(logger_address("a"), json!({"level": "INFO"}));
        client.insert(logger_address("b"), json!({"level": "DEBUG"}));
        let container = Container::new(client);

        let children = container
            .read_children(&logger_address(Address::WILDCARD))
            .await
            .expect("children");
        let names: Vec<_> = children.iter().filter_map(|(a, _)| a.last_value()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_second_batch_is_rejected() {
        let mut container = Container::new(Arc::new(FakeManagementClient::new()));
        container.start_batch().expect("first");
        let err = container.start_batch().expect_err("second");
        assert!(matches!(err, DeployerError::Container(ContainerError::BatchAlreadyOpen { .. })));
    }

    #[tokio::test]
    async fn test_commit_and_rollback_without_batch() {
        let mut container = Container::new(Arc::new(FakeManagementClient::new()));
        assert!(matches!(container.rollback(), Err(DeployerError::Container(ContainerError::NoBatchOpen))));
        assert!(matches!(
            container.commit().await,
            Err(DeployerError::Container(ContainerError::NoBatchOpen))
        ));
    }

    #[tokio::test]
    async fn test_empty_commit_sends_nothing() {
        let client = Arc::new(FakeManagementClient::new());
        let mut container = Container::new(client.clone());
        container.start_batch().expect("start");
        assert_eq!(container.commit().await.expect("commit"), ProcessState::Running);
        assert_eq!(client.request_count(), 0);
        assert!(!container.has_open_batch());
    }

    #[tokio::test]
    async fn test_rollback_sends_nothing() {
        let client = Arc::new(FakeManagementClient::new());
        let mut container = Container::new(client.clone());
        container.start_batch().expect("start");
        container
            .add_step(Operation::add(ResourceKind::Loggers, logger_address("a")))
            .expect("step");
        let discarded = container.rollback().expect("rollback");
        assert_eq!(discarded.len(), 1);
        assert_eq!(client.request_count(), 0);
        container.start_batch().expect("a new batch after rollback");
    }

    #[tokio::test]
    async fn test_commit_applies_and_reports_state() {
        let client = Arc::new(FakeManagementClient::new());
        client.set_process_state("reload-required");
        let mut container = Container::new(client.clone());
        container.start_batch().expect("start");
        container
            .add_step(Operation::add(ResourceKind::Loggers, logger_address("a")).param("level", "INFO"))
            .expect("step");

        assert_eq!(container.commit().await.expect("commit"), ProcessState::ReloadRequired);
        assert_eq!(client.get(&logger_address("a")).expect("added")["level"], "INFO");
    }

    #[tokio::test]
    async fn test_failed_commit_carries_description() {
        let client = Arc::new(FakeManagementClient::new());
        client.fail_commits("WFLYCTL0062: Composite operation failed and was rolled back");
        let mut container = Container::new(client);
        container.start_batch().expect("start");
        container
            .add_step(Operation::add(ResourceKind::Loggers, logger_address("a")))
            .expect("step");

        match container.commit().await {
            Err(DeployerError::Container(ContainerError::OperationFailed { description, .. })) => {
                assert!(description.starts_with("WFLYCTL0062"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wait_for_boot() {
        let container = Container::new(Arc::new(FakeManagementClient::new()));
        container.wait_for_boot(Duration::from_secs(1)).await.expect("running");
    }
}
