//! Audit trail of a run.
//!
//! Every resource that is added, changed or removed produces one [`Audit`]
//! listing the property transitions. Confidential values are replaced by
//! [`CONCEALED`] as they are recorded, so no secret ever reaches the log.

use serde::Serialize;
use std::fmt;

use crate::error::{DeployerError, Result};
use crate::plan::LogHandlerType;

/// Placeholder recorded instead of confidential values.
pub const CONCEALED: &str = "concealed";

/// The resource an audit entry is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuditTarget {
    /// A deployment.
    Deployable {
        /// Logical deployment name.
        name: String,
    },
    /// A logger.
    Logger {
        /// Logger category.
        category: String,
    },
    /// A log handler.
    #[serde(rename_all = "kebab-case")]
    LogHandler {
        /// Handler type.
        handler_type: LogHandlerType,
        /// Handler name.
        name: String,
    },
    /// A data source.
    DataSource {
        /// Data source name.
        name: String,
    },
}

impl fmt::Display for AuditTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deployable { name } => write!(f, "deployable {name}"),
            Self::Logger { category } => write!(f, "logger {category}"),
            Self::LogHandler { handler_type, name } => write!(f, "{handler_type} log-handler {name}"),
            Self::DataSource { name } => write!(f, "data-source {name}"),
        }
    }
}

/// What happened to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOperation {
    /// The resource was created.
    Add,
    /// The resource was updated in place.
    Change,
    /// The resource was deleted.
    Remove,
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Change => write!(f, "change"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// One property transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Change {
    /// Property name.
    pub name: String,
    /// Value before, `None` if it was not set.
    pub old_value: Option<String>,
    /// Value after, `None` if it is no longer set.
    pub new_value: Option<String>,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.name,
            self.old_value.as_deref().unwrap_or("null"),
            self.new_value.as_deref().unwrap_or("null")
        )
    }
}

/// Record of one resource's transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Audit {
    /// The resource.
    #[serde(flatten)]
    pub target: AuditTarget,
    /// What happened.
    pub operation: AuditOperation,
    /// Property transitions, in the order they were recorded.
    pub changes: Vec<Change>,
}

impl Audit {
    /// Finds the change recorded for a property.
    #[must_use]
    pub fn change(&self, name: &str) -> Option<&Change> {
        self.changes.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for Audit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation, self.target)?;
        for change in &self.changes {
            write!(f, "\n  {change}")?;
        }
        Ok(())
    }
}

/// Collects the changes of one resource while it is reconciled.
#[derive(Debug, Clone)]
pub struct AuditBuilder {
    target: AuditTarget,
    changes: Vec<Change>,
}

impl AuditBuilder {
    /// Starts collecting changes for a resource.
    #[must_use]
    pub const fn new(target: AuditTarget) -> Self {
        Self {
            target,
            changes: Vec::new(),
        }
    }

    /// Records a transition. Nothing is recorded if both sides are equal.
    pub fn change(&mut self, name: &str, old_value: Option<String>, new_value: Option<String>) -> &mut Self {
        if old_value != new_value {
            self.changes.push(Change {
                name: name.to_string(),
                old_value,
                new_value,
            });
        }
        self
    }

    /// Records a transition of a confidential value. Only the presence of
    /// each side is kept.
    pub fn change_concealed(&mut self, name: &str, old_value: Option<String>, new_value: Option<String>) -> &mut Self {
        if old_value != new_value {
            self.changes.push(Change {
                name: name.to_string(),
                old_value: old_value.map(|_| CONCEALED.to_string()),
                new_value: new_value.map(|_| CONCEALED.to_string()),
            });
        }
        self
    }

    /// Number of recorded changes.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    /// The resource.
    #[must_use]
    pub const fn target(&self) -> &AuditTarget {
        &self.target
    }

    /// Finishes as an added resource.
    #[must_use]
    pub fn added(self) -> Audit {
        self.finish(AuditOperation::Add)
    }

    /// Finishes as a changed resource.
    #[must_use]
    pub fn changed(self) -> Audit {
        self.finish(AuditOperation::Change)
    }

    /// Finishes as a removed resource.
    #[must_use]
    pub fn removed(self) -> Audit {
        self.finish(AuditOperation::Remove)
    }

    fn finish(self, operation: AuditOperation) -> Audit {
        Audit {
            target: self.target,
            operation,
            changes: self.changes,
        }
    }
}

/// A plan entry that was deliberately not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditWarning {
    /// The resource.
    #[serde(flatten)]
    pub target: AuditTarget,
    /// Why it was skipped.
    pub message: String,
}

impl fmt::Display for AuditWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.message)
    }
}

/// Append-only log of the audits of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditLog {
    audits: Vec<Audit>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<AuditWarning>,
}

impl AuditLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an audit.
    pub fn push(&mut self, audit: Audit) {
        self.audits.push(audit);
    }

    /// Appends a warning.
    pub fn warn(&mut self, target: AuditTarget, message: impl Into<String>) {
        self.warnings.push(AuditWarning {
            target,
            message: message.into(),
        });
    }

    /// All audits in order.
    #[must_use]
    pub fn audits(&self) -> &[Audit] {
        &self.audits
    }

    /// All warnings in order.
    #[must_use]
    pub fn warnings(&self) -> &[AuditWarning] {
        &self.warnings
    }

    /// Number of audits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.audits.len()
    }

    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.audits.is_empty()
    }

    /// Iterates over the audits.
    pub fn iter(&self) -> std::slice::Iter<'_, Audit> {
        self.audits.iter()
    }

    /// Finds the audit for a target.
    #[must_use]
    pub fn find(&self, target: &AuditTarget) -> Option<&Audit> {
        self.audits.iter().find(|a| &a.target == target)
    }

    /// Serializes the audits as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| DeployerError::internal(format!("Failed to serialize audits: {e}")))
    }

    /// Serializes the audits as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| DeployerError::internal(format!("Failed to serialize audits: {e}")))
    }
}

impl<'a> IntoIterator for &'a AuditLog {
    type Item = &'a Audit;
    type IntoIter = std::slice::Iter<'a, Audit>;

    fn into_iter(self) -> Self::IntoIter {
        self.audits.iter()
    }
}
