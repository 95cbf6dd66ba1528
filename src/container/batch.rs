//! Batches of operations committed as one composite request.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use super::address::Address;
use super::client::ManagementRequest;
use super::operation::Operation;
use super::sequence::sort_for_commit;
use crate::error::{ContainerError, Result};

/// State of the server process after a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessState {
    /// All changes are active.
    Running,
    /// Some changes need a reload.
    ReloadRequired,
    /// Some changes need a restart.
    RestartRequired,
}

impl ProcessState {
    /// Maps the `process-state` response header. A missing header means running.
    ///
    /// # Errors
    ///
    /// Returns an error for `starting`, `stopping` and unknown states.
    pub fn from_header(header: Option<&str>) -> Result<Self> {
        match header {
            None | Some("running") => Ok(Self::Running),
            Some("reload-required") => Ok(Self::ReloadRequired),
            Some("restart-required") => Ok(Self::RestartRequired),
            Some(other) => Err(ContainerError::UnexpectedProcessState {
                state: other.to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::ReloadRequired => write!(f, "reload-required"),
            Self::RestartRequired => write!(f, "restart-required"),
        }
    }
}

/// Operations collected during one run.
#[derive(Debug, Clone)]
pub struct Batch {
    id: Uuid,
    operations: Vec<Operation>,
}

impl Default for Batch {
    fn default() -> Self {
        Self::new()
    }
}

impl Batch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            operations: Vec::new(),
        }
    }

    /// Identifier used in log messages.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Appends an operation.
    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Operations in insertion order.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if there is nothing to commit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations in commit order.
    #[must_use]
    pub fn into_sorted(self) -> Vec<Operation> {
        sort_for_commit(self.operations)
    }

    /// Builds the composite request in commit order.
    #[must_use]
    pub fn into_request(self) -> ManagementRequest {
        let mut attachments = Vec::new();
        let steps: Vec<Value> = self
            .into_sorted()
            .into_iter()
            .map(|operation| {
                let index = operation.content().map(|content| {
                    attachments.push(content.to_vec());
                    attachments.len() - 1
                });
                operation.to_step(index)
            })
            .collect();

        let mut headers = Map::new();
        headers.insert("rollback-on-runtime-failure".to_string(), Value::Bool(true));

        let request = ManagementRequest::single("composite", &Address::root())
            .param("steps", Value::Array(steps))
            .param("operation-headers", Value::Object(headers));

        ManagementRequest {
            operation: request.operation,
            attachments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::OperationKind;
    use crate::error::DeployerError;
    use crate::plan::ResourceKind;

    #[test]
    fn test_process_state_mapping() {
        assert_eq!(ProcessState::from_header(None).expect("none"), ProcessState::Running);
        assert_eq!(
            ProcessState::from_header(Some("restart-required")).expect("restart"),
            ProcessState::RestartRequired
        );
        let err = ProcessState::from_header(Some("starting")).expect_err("starting");
        assert!(matches!(err, DeployerError::Container(ContainerError::UnexpectedProcessState { .. })));
    }

    #[test]
    fn test_request_sorted_with_attachments() {
        let mut batch = Batch::new();
        batch.push(
            Operation::add(ResourceKind::Deployables, Address::root().and("deployment", "a.war"))
                .with_content(b"a".to_vec()),
        );
        batch.push(Operation::new(
            OperationKind::Remove,
            ResourceKind::Deployables,
            Address::root().and("deployment", "b.war"),
        ));
        batch.push(Operation::add(
            ResourceKind::Loggers,
            Address::root().and("subsystem", "logging").and("logger", "x"),
        ));
        batch.push(
            Operation::add(ResourceKind::Deployables, Address::root().and("deployment", "c.war"))
                .with_content(b"c".to_vec()),
        );

        let request = batch.into_request();
        let steps = request.operation["steps"].as_array().expect("steps");
        let operations: Vec<_> = steps.iter().map(|s| s["operation"].as_str().unwrap_or_default()).collect();
        assert_eq!(operations, vec!["add", "add", "add", "remove"]);
        assert_eq!(steps[0]["address"][1]["logger"], "x");
        assert_eq!(steps[1]["content"][0]["input-stream-index"], 0);
        assert_eq!(steps[2]["content"][0]["input-stream-index"], 1);
        assert_eq!(request.attachments, vec![b"a".to_vec(), b"c".to_vec()]);
        assert_eq!(request.operation["operation-headers"]["rollback-on-runtime-failure"], true);
    }
}
