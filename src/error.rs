//! Error types for the deployer.
//!
//! The hierarchy follows the life of a run: loading configuration, loading the
//! plan, talking to the container, talking to the artifact repository and
//! reconciling the two states.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the deployer.
#[derive(Debug, Error)]
pub enum DeployerError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plan loading and validation errors.
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Management API errors.
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// Artifact repository errors.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A managed-kind entry names no known resource kind.
    #[error("Unknown resource kind in managed list: {name}")]
    UnknownResourceKind {
        /// The unrecognised name.
        name: String,
    },
}

/// Plan loading and validation errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The plan file does not exist.
    #[error("Plan file not found: {path}")]
    FileNotFound {
        /// Path to the missing plan.
        path: PathBuf,
    },

    /// The plan could not be parsed.
    #[error("Failed to parse plan: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// A plan entry is invalid.
    #[error("Invalid {kind} '{name}': {message}")]
    Invalid {
        /// Resource kind of the entry.
        kind: String,
        /// Name of the entry.
        name: String,
        /// What is wrong with it.
        message: String,
    },

    /// A plan entry carries a `state` that is neither deployed nor undeployed.
    #[error("Unsupported state '{state}' for {kind} '{name}'")]
    UnsupportedState {
        /// Resource kind of the entry.
        kind: String,
        /// Name of the entry.
        name: String,
        /// The state value found in the plan.
        state: String,
    },
}

/// Management API errors.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Authentication against the management interface failed.
    #[error("Management authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// The request never produced a usable response.
    #[error("Management request failed: {message}")]
    RequestFailed {
        /// Description of the transport error.
        message: String,
    },

    /// The container answered with a failed outcome.
    #[error("Management operation failed: {description}")]
    OperationFailed {
        /// Operation name.
        operation: String,
        /// Failure description reported by the container.
        description: String,
    },

    /// The response did not have the expected shape.
    #[error("Invalid management response: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// A batch was started while another one was still open.
    #[error("Batch {open} is still open")]
    BatchAlreadyOpen {
        /// Identifier of the open batch.
        open: String,
    },

    /// Commit or rollback was called without an open batch.
    #[error("No batch is open")]
    NoBatchOpen,

    /// The process state after commit is neither running nor pending reload/restart.
    #[error("Unexpected process state: {state}")]
    UnexpectedProcessState {
        /// The reported process state.
        state: String,
    },

    /// The container did not reach the running state in time.
    #[error("Container not running after {timeout_secs} seconds")]
    BootTimeout {
        /// Seconds waited.
        timeout_secs: u64,
    },
}

/// Artifact repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Network error talking to the repository.
    #[error("Network error communicating with repository: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Repository responded with an error status.
    #[error("Repository request failed: {status} - {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Body or reason.
        message: String,
    },

    /// No artifact with this checksum is known.
    #[error("No artifact found with checksum {checksum}")]
    UnknownChecksum {
        /// The checksum that was looked up.
        checksum: String,
    },

    /// Invalid response from the repository.
    #[error("Invalid response from repository: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The plan targets a pinned resource.
    #[error("{kind} '{name}' is pinned and cannot be changed")]
    Pinned {
        /// Resource kind.
        kind: String,
        /// Name of the pinned resource.
        name: String,
    },

    /// The checksum in the plan does not match the actual one.
    #[error("Checksum mismatch for deployable '{name}': planned {planned}, actual {actual}")]
    ChecksumMismatch {
        /// Name of the deployable.
        name: String,
        /// Checksum declared in the plan.
        planned: String,
        /// Checksum resolved from the repository or read from the container.
        actual: String,
    },

    /// The repository has no artifact for the planned coordinates.
    #[error("Artifact not found for deployable '{name}': {coordinates}")]
    ArtifactNotFound {
        /// Name of the deployable.
        name: String,
        /// Maven-style coordinates that were looked up.
        coordinates: String,
    },

    /// A property that cannot be changed on a live resource differs.
    #[error("Cannot change {property} of {kind} '{name}' in place")]
    ImmutableProperty {
        /// Resource kind.
        kind: String,
        /// Name of the resource.
        name: String,
        /// The property that differs.
        property: String,
    },

    /// The operation is not supported for this resource.
    #[error("Unsupported operation on {kind} '{name}': {reason}")]
    Unsupported {
        /// Resource kind.
        kind: String,
        /// Name of the resource.
        name: String,
        /// Why it is unsupported.
        reason: String,
    },
}

/// Result type alias for deployer operations.
pub type Result<T> = std::result::Result<T, DeployerError>;

impl DeployerError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if the error was caused by the plan or configuration
    /// rather than by the container or the repository.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Plan(_) | Self::Reconcile(_) | Self::Config(_))
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Container(ContainerError::RequestFailed { .. })
                | Self::Repository(RepositoryError::NetworkError { .. })
        )
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl PlanError {
    /// Creates an invalid-entry error.
    #[must_use]
    pub fn invalid(kind: impl Into<String>, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            kind: kind.into(),
            name: name.into(),
            message: message.into(),
        }
    }
}

impl ContainerError {
    /// Creates a transport error.
    #[must_use]
    pub fn request(message: impl Into<String>) -> Self {
        Self::RequestFailed {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl RepositoryError {
    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
