//! Logger reconciliation.

use async_trait::async_trait;
use serde_json::Value;

use super::engine::{AddOutcome, ResourceReconciler};
use super::property::{Descriptor, Property, Registry, render_list};
use crate::audit::{AuditBuilder, AuditTarget};
use crate::container::logger::{self, LoggerResource, LoggerSpec};
use crate::container::{Container, Operation};
use crate::error::{ReconcileError, Result};
use crate::plan::{LogLevel, LoggerPlan, Plan, ResourceKind};

type LoggerProperty<T> = Property<LoggerPlan, LoggerResource, LoggerSpec, T>;

/// The handlers of a logger. Only the handlers that differ are attached or
/// detached, and the change is audited once for the whole list.
struct Handlers;

impl Descriptor<LoggerPlan, LoggerResource, LoggerSpec> for Handlers {
    fn name(&self) -> &'static str {
        "handlers"
    }

    fn update(&self, live: &LoggerResource, plan: &LoggerPlan, audit: &mut AuditBuilder) -> Result<Vec<Operation>> {
        let removed: Vec<&str> = live
            .handlers
            .iter()
            .filter(|h| !plan.handlers.contains(h))
            .map(String::as_str)
            .collect();
        let added: Vec<&str> = plan
            .handlers
            .iter()
            .filter(|h| !live.handlers.contains(h))
            .map(String::as_str)
            .collect();
        if removed.is_empty() && added.is_empty() {
            return Ok(Vec::new());
        }

        audit.change(
            self.name(),
            (!removed.is_empty()).then(|| render_list(removed.iter().copied())),
            (!added.is_empty()).then(|| render_list(added.iter().copied())),
        );
        Ok(removed
            .iter()
            .map(|h| live.remove_handler(h))
            .chain(added.iter().map(|h| live.add_handler(h)))
            .collect())
    }

    fn build(&self, plan: &LoggerPlan, spec: &mut LoggerSpec, audit: &mut AuditBuilder) {
        if !plan.handlers.is_empty() {
            audit.change(self.name(), None, Some(render_list(plan.handlers.iter().map(String::as_str))));
            spec.handlers.clone_from(&plan.handlers);
        }
    }

    fn audit_removal(&self, live: &LoggerResource, audit: &mut AuditBuilder) {
        if !live.handlers.is_empty() {
            audit.change(self.name(), Some(render_list(live.handlers.iter().map(String::as_str))), None);
        }
    }
}

/// Reconciles loggers, including the root logger.
///
/// The root logger always exists: it is updated but never added, removed
/// or cleaned up, and it has no use-parent-handlers flag.
#[derive(Debug)]
pub struct LoggerReconciler {
    properties: Registry<LoggerPlan, LoggerResource, LoggerSpec>,
}

impl LoggerReconciler {
    /// Creates the reconciler and its property registry.
    #[must_use]
    pub fn new() -> Self {
        let properties = Registry::new()
            .with(LoggerProperty::<LogLevel>::new(
                "level",
                |l| l.level,
                |p| p.level,
                |s, v| s.level = Some(v),
                |l, v| Ok(vec![l.write("level", v.map(|v| Value::from(v.as_str())))]),
            ))
            .with(Handlers)
            .with(
                LoggerProperty::<bool>::new(
                    "use-parent-handlers",
                    |l| l.use_parent_handlers,
                    |p| (!p.is_root()).then(|| p.effective_use_parent_handlers()),
                    |s, v| s.use_parent_handlers = Some(v),
                    |l, v| Ok(vec![l.write("use-parent-handlers", v.map(|v| Value::from(*v)))]),
                )
                .only_if(|l| !l.is_root()),
            );
        Self { properties }
    }

    fn unsupported(category: &str, reason: &str) -> ReconcileError {
        ReconcileError::Unsupported {
            kind: ResourceKind::Loggers.name().to_string(),
            name: category.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Default for LoggerReconciler {
    fn default() -> Self {
        Self::new()
    }
}

fn target(category: &str) -> AuditBuilder {
    AuditBuilder::new(AuditTarget::Logger {
        category: category.to_string(),
    })
}

#[async_trait]
impl ResourceReconciler for LoggerReconciler {
    type Plan = LoggerPlan;
    type Live = LoggerResource;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Loggers
    }

    fn planned<'p>(&self, plan: &'p Plan) -> Vec<&'p LoggerPlan> {
        plan.loggers.values().collect()
    }

    async fn existing(&self, container: &Container) -> Result<Vec<LoggerResource>> {
        logger::list(container).await
    }

    fn live_id(&self, live: &LoggerResource) -> String {
        live.category.clone()
    }

    async fn read(&self, container: &Container, plan: &LoggerPlan) -> Result<Option<LoggerResource>> {
        logger::read(container, &plan.category).await
    }

    fn audit_for_live(&self, live: &LoggerResource) -> AuditBuilder {
        target(&live.category)
    }

    fn audit_for_plan(&self, plan: &LoggerPlan) -> AuditBuilder {
        target(&plan.category)
    }

    async fn update(
        &self,
        _container: &Container,
        live: &LoggerResource,
        plan: &LoggerPlan,
        audit: &mut AuditBuilder,
    ) -> Result<Vec<Operation>> {
        self.properties.update(live, plan, audit)
    }

    async fn add(&self, _container: &Container, plan: &LoggerPlan, audit: &mut AuditBuilder) -> Result<AddOutcome> {
        if plan.is_root() {
            return Err(Self::unsupported(&plan.category, "the root logger cannot be added").into());
        }
        let mut spec = LoggerSpec::new(plan.category.as_str());
        self.properties.build(plan, &mut spec, audit);
        Ok(AddOutcome::Added(vec![spec.add()]))
    }

    async fn remove(
        &self,
        _container: &Container,
        live: &LoggerResource,
        _plan: Option<&LoggerPlan>,
        audit: &mut AuditBuilder,
    ) -> Result<Vec<Operation>> {
        if live.is_root() {
            return Err(Self::unsupported(&live.category, "the root logger cannot be removed").into());
        }
        self.properties.audit_removal(live, audit);
        Ok(vec![live.remove()])
    }
}
