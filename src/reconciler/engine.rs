//! The reconciliation algorithm, shared by every resource kind.

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::scope::ReconcileConfig;
use crate::audit::{AuditBuilder, AuditLog};
use crate::container::{Container, Operation};
use crate::error::{ReconcileError, Result};
use crate::plan::{DeploymentState, Plan, PlanEntry, ResourceKind};

/// Result of adding a planned resource.
#[derive(Debug)]
pub enum AddOutcome {
    /// The operations that create the resource.
    Added(Vec<Operation>),
    /// Nothing was added, for the given reason.
    Skipped(String),
}

/// What the reconciliation algorithm needs to know about one resource kind.
#[async_trait]
pub trait ResourceReconciler: Send + Sync {
    /// Plan entry of this kind.
    type Plan: PlanEntry + Sync;
    /// Live resource of this kind.
    type Live: Send + Sync;

    /// The kind reconciled.
    fn kind(&self) -> ResourceKind;

    /// Plan entries of this kind, in plan order.
    fn planned<'p>(&self, plan: &'p Plan) -> Vec<&'p Self::Plan>;

    /// All live resources of this kind that may be cleaned up.
    async fn existing(&self, container: &Container) -> Result<Vec<Self::Live>>;

    /// Identity of a live resource.
    fn live_id(&self, live: &Self::Live) -> String;

    /// Identity of the live resource a plan entry refers to, comparable to
    /// [`ResourceReconciler::live_id`] and to pinned names.
    fn plan_id(&self, plan: &Self::Plan) -> String {
        plan.id().to_string()
    }

    /// Reads the live resource a plan entry refers to.
    async fn read(&self, container: &Container, plan: &Self::Plan) -> Result<Option<Self::Live>>;

    /// Starts the audit of a live resource.
    fn audit_for_live(&self, live: &Self::Live) -> AuditBuilder;

    /// Starts the audit of a plan entry.
    fn audit_for_plan(&self, plan: &Self::Plan) -> AuditBuilder;

    /// Converges a live resource to its plan entry.
    async fn update(
        &self,
        container: &Container,
        live: &Self::Live,
        plan: &Self::Plan,
        audit: &mut AuditBuilder,
    ) -> Result<Vec<Operation>>;

    /// Creates a resource from its plan entry.
    async fn add(&self, container: &Container, plan: &Self::Plan, audit: &mut AuditBuilder) -> Result<AddOutcome>;

    /// Removes a live resource, checking it against the plan entry that
    /// asked for the removal, if any.
    async fn remove(
        &self,
        container: &Container,
        live: &Self::Live,
        plan: Option<&Self::Plan>,
        audit: &mut AuditBuilder,
    ) -> Result<Vec<Operation>>;
}

/// State threaded through the reconciliation of one run.
#[derive(Debug)]
pub struct ReconcileContext<'a> {
    /// Container with the run's open batch.
    pub container: &'a mut Container,
    /// Audits collected so far.
    pub audits: &'a mut AuditLog,
    /// Scope of the run.
    pub config: &'a ReconcileConfig,
}

impl ReconcileContext<'_> {
    fn add_steps(&mut self, operations: Vec<Operation>) -> Result<()> {
        for operation in operations {
            self.container.add_step(operation)?;
        }
        Ok(())
    }
}

/// Fails if the plan targets a pinned resource of this kind. Entries are
/// compared by the identity of the live resource they refer to.
///
/// # Errors
///
/// Returns [`ReconcileError::Pinned`] for the first pinned entry.
pub fn check_pinned<R: ResourceReconciler>(reconciler: &R, plan: &Plan, config: &ReconcileConfig) -> Result<()> {
    let kind = reconciler.kind();
    match reconciler
        .planned(plan)
        .into_iter()
        .find(|entry| config.is_pinned(kind, &reconciler.plan_id(entry)))
    {
        Some(entry) => Err(ReconcileError::Pinned {
            kind: kind.name().to_string(),
            name: entry.id().to_string(),
        }
        .into()),
        None => Ok(()),
    }
}

/// Reconciles one resource kind, adding its operations to the open batch
/// and its audits to the log.
///
/// # Errors
///
/// Returns an error if a pinned resource is targeted, a read fails, or a
/// resource cannot be converged. Nothing is committed either way.
pub async fn reconcile_kind<R: ResourceReconciler>(
    reconciler: &R,
    plan: &Plan,
    ctx: &mut ReconcileContext<'_>,
) -> Result<()> {
    let kind = reconciler.kind();
    check_pinned(reconciler, plan, ctx.config)?;

    // Pinned resources appear in this listing only. No read or write below
    // addresses them.
    let mut remaining: IndexMap<String, R::Live> = reconciler
        .existing(ctx.container)
        .await?
        .into_iter()
        .map(|live| (reconciler.live_id(&live), live))
        .filter(|(id, _)| !ctx.config.is_pinned(kind, id))
        .collect();
    debug!("{} existing {}", remaining.len(), kind);

    for entry in reconciler.planned(plan) {
        let id = entry.id();
        let live = reconciler.read(ctx.container, entry).await?;
        if let Some(live) = &live {
            let live_id = reconciler.live_id(live);
            if ctx.config.is_pinned(kind, &live_id) {
                return Err(ReconcileError::Pinned {
                    kind: kind.name().to_string(),
                    name: live_id,
                }
                .into());
            }
        }

        match (entry.state(), live) {
            (DeploymentState::Deployed, Some(live)) => {
                remaining.shift_remove(&reconciler.live_id(&live));
                let mut audit = reconciler.audit_for_plan(entry);
                let operations = reconciler.update(ctx.container, &live, entry, &mut audit).await?;
                ctx.add_steps(operations)?;
                if audit.change_count() > 0 {
                    ctx.audits.push(audit.changed());
                } else {
                    info!("{} {} is up to date", kind, id);
                }
            }
            (DeploymentState::Deployed, None) => {
                let mut audit = reconciler.audit_for_plan(entry);
                match reconciler.add(ctx.container, entry, &mut audit).await? {
                    AddOutcome::Added(operations) => {
                        ctx.add_steps(operations)?;
                        ctx.audits.push(audit.added());
                    }
                    AddOutcome::Skipped(reason) => {
                        warn!("Skipped {} {}: {}", kind, id, reason);
                        ctx.audits.warn(audit.target().clone(), reason);
                    }
                }
            }
            (DeploymentState::Undeployed, Some(live)) => {
                remaining.shift_remove(&reconciler.live_id(&live));
                let mut audit = reconciler.audit_for_live(&live);
                let operations = reconciler.remove(ctx.container, &live, Some(entry), &mut audit).await?;
                ctx.add_steps(operations)?;
                ctx.audits.push(audit.removed());
            }
            (DeploymentState::Undeployed, None) => {
                info!("{} {} is already removed", kind, id);
            }
        }
    }

    if ctx.config.is_managed(kind) {
        for (id, live) in remaining {
            debug!("Cleaning up unplanned {} {}", kind, id);
            let mut audit = reconciler.audit_for_live(&live);
            let operations = reconciler.remove(ctx.container, &live, None, &mut audit).await?;
            ctx.add_steps(operations)?;
            ctx.audits.push(audit.removed());
        }
    } else if !remaining.is_empty() {
        debug!("{} unplanned {} left alone, kind is not managed", remaining.len(), kind);
    }

    Ok(())
}
