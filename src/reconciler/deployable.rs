//! Deployable reconciliation.
//!
//! Deployables are not diffed property by property. The planned coordinates
//! are resolved against the repository, and the resolved checksum is
//! compared with the checksum of the deployed content.

use async_trait::async_trait;
use tracing::{debug, info};

use super::engine::{AddOutcome, ResourceReconciler};
use crate::audit::{AuditBuilder, AuditTarget};
use crate::container::deployment::{self, DeploymentResource, DeploymentSpec};
use crate::container::{Container, Operation};
use crate::error::{PlanError, ReconcileError, Result};
use crate::plan::{Checksum, DeployablePlan, Plan, ResourceKind, Version};
use crate::repository::{Artifact, ArtifactCoordinates, Repository, lookup_or_unknown};

/// Reconciles deployables against an artifact repository.
pub struct DeployableReconciler<'r> {
    repository: &'r dyn Repository,
}

impl std::fmt::Debug for DeployableReconciler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployableReconciler").finish_non_exhaustive()
    }
}

impl<'r> DeployableReconciler<'r> {
    /// Creates a reconciler resolving artifacts in the repository.
    #[must_use]
    pub fn new(repository: &'r dyn Repository) -> Self {
        Self { repository }
    }

    fn coordinates(plan: &DeployablePlan, version: Version) -> Result<ArtifactCoordinates> {
        let group_id = plan
            .group_id
            .clone()
            .ok_or_else(|| PlanError::invalid(ResourceKind::Deployables.name(), &plan.name, "missing group-id"))?;
        Ok(ArtifactCoordinates {
            group_id,
            artifact_id: plan.artifact_id.clone(),
            version,
            artifact_type: plan.artifact_type,
            classifier: plan.classifier.clone(),
        })
    }

    async fn resolve(&self, plan: &DeployablePlan, version: Version) -> Result<Artifact> {
        let coordinates = Self::coordinates(plan, version)?;
        let artifact = self
            .repository
            .resolve_artifact(&coordinates)
            .await?
            .ok_or_else(|| ReconcileError::ArtifactNotFound {
                name: plan.name.clone(),
                coordinates: coordinates.to_string(),
            })?;
        debug!("{} resolved to {}", coordinates, artifact.checksum);
        verify_checksum(plan, &artifact.checksum)?;
        Ok(artifact)
    }
}

/// Fails if the plan declares a checksum other than `actual`.
fn verify_checksum(plan: &DeployablePlan, actual: &Checksum) -> Result<()> {
    match &plan.checksum {
        Some(planned) if planned != actual => Err(ReconcileError::ChecksumMismatch {
            name: plan.name.clone(),
            planned: planned.to_string(),
            actual: actual.to_string(),
        }
        .into()),
        _ => Ok(()),
    }
}

/// Records the artifact fields that differ between two artifacts.
fn audit_artifact(audit: &mut AuditBuilder, old: Option<&Artifact>, new: Option<&Artifact>) {
    let field = |artifact: Option<&Artifact>, f: fn(&Artifact) -> String| artifact.map(f);
    audit
        .change("group-id", field(old, |a| a.group_id.clone()), field(new, |a| a.group_id.clone()))
        .change(
            "artifact-id",
            field(old, |a| a.artifact_id.clone()),
            field(new, |a| a.artifact_id.clone()),
        )
        .change("version", field(old, |a| a.version.to_string()), field(new, |a| a.version.to_string()))
        .change(
            "type",
            field(old, |a| a.artifact_type.to_string()),
            field(new, |a| a.artifact_type.to_string()),
        )
        .change("checksum", field(old, |a| a.checksum.to_string()), field(new, |a| a.checksum.to_string()));
}

fn target(name: &str) -> AuditBuilder {
    AuditBuilder::new(AuditTarget::Deployable { name: name.to_string() })
}

#[async_trait]
impl<'r> ResourceReconciler for DeployableReconciler<'r> {
    type Plan = DeployablePlan;
    type Live = DeploymentResource;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Deployables
    }

    fn planned<'p>(&self, plan: &'p Plan) -> Vec<&'p DeployablePlan> {
        plan.deployables.values().collect()
    }

    async fn existing(&self, container: &Container) -> Result<Vec<DeploymentResource>> {
        deployment::list(container).await
    }

    fn live_id(&self, live: &DeploymentResource) -> String {
        live.logical_name().to_string()
    }

    fn plan_id(&self, plan: &DeployablePlan) -> String {
        plan.logical_name().to_string()
    }

    async fn read(&self, container: &Container, plan: &DeployablePlan) -> Result<Option<DeploymentResource>> {
        deployment::read(container, &plan.physical_name()).await
    }

    fn audit_for_live(&self, live: &DeploymentResource) -> AuditBuilder {
        target(live.logical_name())
    }

    fn audit_for_plan(&self, plan: &DeployablePlan) -> AuditBuilder {
        target(&plan.name)
    }

    async fn update(
        &self,
        _container: &Container,
        live: &DeploymentResource,
        plan: &DeployablePlan,
        audit: &mut AuditBuilder,
    ) -> Result<Vec<Operation>> {
        let current = if plan.version.is_current() {
            let deployed = lookup_or_unknown(self.repository, &live.checksum).await;
            debug!("{} is at version {}", plan.name, deployed.version);
            Some(deployed)
        } else {
            None
        };
        let version = current
            .as_ref()
            .map_or_else(|| plan.version.clone(), |deployed| deployed.version.clone());

        let artifact = self.resolve(plan, version).await?;
        if artifact.checksum == live.checksum {
            info!("{} is already deployed with checksum {}", plan.name, live.checksum);
            return Ok(Vec::new());
        }

        let deployed = match current {
            Some(deployed) => deployed,
            None => lookup_or_unknown(self.repository, &live.checksum).await,
        };
        audit_artifact(audit, Some(&deployed), Some(&artifact));
        let content = self.repository.fetch_content(&artifact).await?;
        Ok(vec![live.redeploy(content)])
    }

    async fn add(&self, _container: &Container, plan: &DeployablePlan, audit: &mut AuditBuilder) -> Result<AddOutcome> {
        if plan.version.is_current() {
            return Ok(AddOutcome::Skipped(format!(
                "version {} needs a deployed {} to resolve against",
                Version::CURRENT,
                plan.physical_name()
            )));
        }

        let artifact = self.resolve(plan, plan.version.clone()).await?;
        audit_artifact(audit, None, Some(&artifact));
        let content = self.repository.fetch_content(&artifact).await?;
        let spec = DeploymentSpec {
            name: plan.physical_name(),
            content,
        };
        Ok(AddOutcome::Added(vec![spec.add()]))
    }

    async fn remove(
        &self,
        _container: &Container,
        live: &DeploymentResource,
        plan: Option<&DeployablePlan>,
        audit: &mut AuditBuilder,
    ) -> Result<Vec<Operation>> {
        if let Some(plan) = plan {
            verify_checksum(plan, &live.checksum)?;
        }
        let deployed = lookup_or_unknown(self.repository, &live.checksum).await;
        audit_artifact(audit, Some(&deployed), None);
        Ok(live.remove())
    }
}
