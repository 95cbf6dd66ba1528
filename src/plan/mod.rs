//! The desired state.
//!
//! - [`Plan`] and its four entry types
//! - Loading plans from YAML with defaults applied
//! - Plan fingerprints

mod hash;
mod loader;
mod model;
mod types;

pub use hash::PlanHasher;
pub use loader::{DEFAULT_LOG_FORMAT, PlanDefaults, PlanLoader, driver_from_uri};
pub use model::{DataSourcePlan, DeployablePlan, LogHandlerPlan, LoggerPlan, Plan, PlanEntry};
pub use types::{ArtifactType, Checksum, DeploymentState, LogHandlerType, LogLevel, ResourceKind, Version};
