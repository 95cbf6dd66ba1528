//! Reconciliation of a plan against a running container.
//!
//! A [`Deployer`] reconciles every resource kind in turn into one batch, then
//! commits the batch as a single composite operation. Either the whole plan
//! is applied or nothing is.

mod data_source;
mod deployable;
mod engine;
mod log_handler;
mod logger;
mod property;
mod scope;

pub use data_source::DataSourceReconciler;
pub use deployable::DeployableReconciler;
pub use engine::{AddOutcome, ReconcileContext, ResourceReconciler, check_pinned, reconcile_kind};
pub use log_handler::LogHandlerReconciler;
pub use logger::LoggerReconciler;
pub use property::{Descriptor, Property, Registry};
pub use scope::{ManagedKinds, ReconcileConfig};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::container::{self, Container, Operation, ProcessState};
use crate::error::Result;
use crate::plan::{DataSourcePlan, DeployablePlan, LogHandlerPlan, LoggerPlan, Plan, PlanHasher, ResourceKind};
use crate::repository::{Repository, lookup_or_unknown};

/// Result of a committed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the batch was committed.
    pub finished_at: DateTime<Utc>,
    /// Host the run was started from.
    pub host: String,
    /// Fingerprint of the applied plan.
    pub plan_hash: String,
    /// Server process state after the commit.
    pub process_state: ProcessState,
    /// What changed.
    pub audits: AuditLog,
}

impl RunReport {
    /// Returns true if the run changed nothing.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.audits.is_empty()
    }
}

/// Result of a dry run: what a run would send, and what it would audit.
#[derive(Debug, Clone, Serialize)]
pub struct DryRun {
    /// Operations in commit order.
    #[serde(skip)]
    pub operations: Vec<Operation>,
    /// Audits the run would record.
    pub audits: AuditLog,
}

/// Applies plans to one container.
pub struct Deployer {
    container: Container,
    repository: Arc<dyn Repository>,
    config: ReconcileConfig,
    log_handlers: LogHandlerReconciler,
    loggers: LoggerReconciler,
    data_sources: DataSourceReconciler,
    hasher: PlanHasher,
}

impl std::fmt::Debug for Deployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployer")
            .field("container", &self.container)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Deployer {
    /// Creates a deployer.
    #[must_use]
    pub fn new(container: Container, repository: Arc<dyn Repository>, config: ReconcileConfig) -> Self {
        Self {
            container,
            repository,
            config,
            log_handlers: LogHandlerReconciler::new(),
            loggers: LoggerReconciler::new(),
            data_sources: DataSourceReconciler::new(),
            hasher: PlanHasher::new(),
        }
    }

    /// The container this deployer applies plans to.
    #[must_use]
    pub const fn container(&self) -> &Container {
        &self.container
    }

    /// Scope of the runs.
    #[must_use]
    pub const fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Reconciles the plan and commits the resulting batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan targets a pinned resource, a resource
    /// cannot be converged, or the commit fails. Nothing is applied then.
    pub async fn run(&mut self, plan: &Plan) -> Result<RunReport> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        info!("Starting run {} with {} plan entries", run_id, plan.len());

        let audits = self.reconcile(plan).await?;
        let process_state = self.container.commit().await.inspect_err(|e| {
            error!("Run {} failed to commit: {}", run_id, e);
        })?;

        info!("Run {} finished with {} audits", run_id, audits.len());
        Ok(RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            host: host_name(),
            plan_hash: self.hasher.hash_plan(plan),
            process_state,
            audits,
        })
    }

    /// Reconciles the plan without committing anything.
    ///
    /// # Errors
    ///
    /// Returns the errors [`Deployer::run`] would return before its commit.
    pub async fn dry_run(&mut self, plan: &Plan) -> Result<DryRun> {
        let audits = self.reconcile(plan).await?;
        let operations = self.container.rollback()?;
        debug!("Dry run would send {} operations", operations.len());
        Ok(DryRun { operations, audits })
    }

    /// Reconciles every kind into a fresh batch, leaving it open.
    async fn reconcile(&mut self, plan: &Plan) -> Result<AuditLog> {
        check_pinned(&self.log_handlers, plan, &self.config)?;
        check_pinned(&self.loggers, plan, &self.config)?;
        check_pinned(&self.data_sources, plan, &self.config)?;
        check_pinned(&DeployableReconciler::new(self.repository.as_ref()), plan, &self.config)?;

        self.container.start_batch()?;
        let mut audits = AuditLog::new();
        if let Err(e) = self.reconcile_into(plan, &mut audits).await {
            self.container.rollback()?;
            return Err(e);
        }
        Ok(audits)
    }

    async fn reconcile_into(&mut self, plan: &Plan, audits: &mut AuditLog) -> Result<()> {
        let deployables = DeployableReconciler::new(self.repository.as_ref());
        let mut ctx = ReconcileContext {
            container: &mut self.container,
            audits,
            config: &self.config,
        };

        reconcile_kind(&self.log_handlers, plan, &mut ctx).await?;
        reconcile_kind(&self.loggers, plan, &mut ctx).await?;
        reconcile_kind(&self.data_sources, plan, &mut ctx).await?;
        reconcile_kind(&deployables, plan, &mut ctx).await
    }

    /// Reads the live, unpinned resources back into a plan. Deployments are
    /// traced to their artifacts by checksum.
    ///
    /// # Errors
    ///
    /// Returns an error if a read fails.
    pub async fn effective_plan(&self) -> Result<Plan> {
        let mut plan = Plan::new();
        let visible = |kind: ResourceKind, name: &str| !self.config.is_pinned(kind, name);

        for handler in container::log_handler::list(&self.container).await? {
            if visible(ResourceKind::LogHandlers, &handler.name) {
                plan.log_handlers.insert(handler.name.clone(), LogHandlerPlan {
                    name: handler.name,
                    state: crate::plan::DeploymentState::Deployed,
                    handler_type: handler.handler_type,
                    level: handler.level,
                    format: handler.format,
                    formatter: handler.formatter,
                    encoding: handler.encoding,
                    file: handler.file,
                    suffix: handler.suffix,
                    module: handler.module,
                    class: handler.class,
                    properties: handler.properties,
                });
            }
        }

        let root = container::logger::read(&self.container, LoggerPlan::ROOT).await?;
        for logger in root.into_iter().chain(container::logger::list(&self.container).await?) {
            if visible(ResourceKind::Loggers, &logger.category) {
                plan.loggers.insert(logger.category.clone(), LoggerPlan {
                    category: logger.category,
                    state: crate::plan::DeploymentState::Deployed,
                    level: logger.level,
                    handlers: logger.handlers,
                    use_parent_handlers: logger.use_parent_handlers,
                });
            }
        }

        for data_source in container::data_source::list(&self.container).await? {
            if visible(ResourceKind::DataSources, &data_source.name) {
                plan.data_sources.insert(data_source.name.clone(), DataSourcePlan {
                    name: data_source.name,
                    state: crate::plan::DeploymentState::Deployed,
                    xa: data_source.xa,
                    driver: data_source.driver,
                    jndi_name: data_source.jndi_name,
                    uri: data_source.uri,
                    user_name: data_source.user_name,
                    password: None,
                    min_pool_size: data_source.min_pool_size,
                    initial_pool_size: data_source.initial_pool_size,
                    max_pool_size: data_source.max_pool_size,
                    max_age: data_source.max_age,
                });
            }
        }

        for deployment in container::deployment::list(&self.container).await? {
            let name = deployment.logical_name().to_string();
            if !visible(ResourceKind::Deployables, &name) {
                continue;
            }
            let artifact = lookup_or_unknown(self.repository.as_ref(), &deployment.checksum).await;
            plan.deployables.insert(name.clone(), DeployablePlan {
                name,
                state: crate::plan::DeploymentState::Deployed,
                group_id: Some(artifact.group_id),
                artifact_id: artifact.artifact_id,
                version: artifact.version,
                artifact_type: artifact.artifact_type,
                classifier: artifact.classifier,
                checksum: Some(deployment.checksum),
            });
        }

        Ok(plan)
    }
}

fn host_name() -> String {
    hostname::get().map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string())
}
