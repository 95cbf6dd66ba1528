// ============================================================================
// Linting
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // Public items should be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # JEE Deployer
//!
//! A declarative, idempotent reconciler for the configuration of a
//! WildFly/JBoss application server.
//!
//! ## Overview
//!
//! A YAML plan lists the deployables, loggers, log-handlers and data-sources
//! the server should carry. The deployer reads what the server has through
//! its HTTP management API, computes the operations that bring it in line,
//! sends them as a single composite batch and reports an audit per change.
//!
//! ## Architecture
//!
//! 1. **Plan**: `deployer.root.bundle`, loaded by [`plan::PlanLoader`]
//! 2. **Container**: the live server, read and written through [`container::Container`]
//! 3. **Reconciler**: compares both per resource kind and queues operations
//! 4. **Audits**: one record per added, changed or removed resource
//!
//! Resources of a kind listed as *managed* that the plan no longer names are
//! removed. *Pinned* resources are never touched.
//!
//! ## Modules
//!
//! - [`plan`]: Plan model, loading and hashing
//! - [`container`]: Management client, operations and batches
//! - [`repository`]: Maven repository lookups for deployables
//! - [`reconciler`]: Per-kind reconciliation and the [`Deployer`]
//! - [`audit`]: Change records
//! - [`config`]: Deployer configuration
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! deployables:
//!   shop:
//!     group-id: com.example
//!     artifact-id: shop
//!     version: 1.4.2
//! loggers:
//!   com.example:
//!     level: DEBUG
//!     handlers: [CONSOLE]
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod audit;
pub mod cli;
pub mod config;
pub mod container;
pub mod error;
pub mod plan;
pub mod reconciler;
pub mod repository;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use audit::{Audit, AuditLog, AuditOperation};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, DeployerConfig};
pub use container::{Container, HttpManagementClient, ManagementClient, ProcessState};
pub use error::{DeployerError, Result};
pub use plan::{Plan, PlanLoader};
pub use reconciler::{Deployer, DryRun, ReconcileConfig, RunReport};
pub use repository::{MavenRepository, Repository};
