//! Data source reconciliation.

use async_trait::async_trait;
use serde_json::Value;

use super::engine::{AddOutcome, ResourceReconciler};
use super::property::{Property, Registry};
use crate::audit::{AuditBuilder, AuditTarget};
use crate::container::data_source::{self, DataSourceResource, DataSourceSpec};
use crate::container::{Container, Operation};
use crate::error::{ReconcileError, Result};
use crate::plan::{DataSourcePlan, Plan, ResourceKind};

type DataSourceProperty<T> = Property<DataSourcePlan, DataSourceResource, DataSourceSpec, T>;

fn string(value: Option<&String>) -> Option<Value> {
    value.map(|v| Value::from(v.as_str()))
}

fn number(value: Option<&u32>) -> Option<Value> {
    value.map(|v| Value::from(*v))
}

/// Reconciles plain and XA data sources.
#[derive(Debug)]
pub struct DataSourceReconciler {
    properties: Registry<DataSourcePlan, DataSourceResource, DataSourceSpec>,
}

impl DataSourceReconciler {
    /// Creates the reconciler and its property registry.
    #[must_use]
    pub fn new() -> Self {
        let properties = Registry::new()
            .with(DataSourceProperty::<bool>::new(
                "xa",
                |l| l.xa.then_some(true),
                |p| p.xa.then_some(true),
                |s, v| s.xa = v,
                |l, _| {
                    Err(ReconcileError::ImmutableProperty {
                        kind: ResourceKind::DataSources.name().to_string(),
                        name: l.name.clone(),
                        property: "xa".to_string(),
                    }
                    .into())
                },
            ))
            .with(DataSourceProperty::<String>::new(
                "driver",
                |l| l.driver.clone(),
                |p| p.driver.clone(),
                |s, v| s.driver = Some(v),
                |l, v| Ok(vec![l.write("driver-name", string(v))]),
            ))
            .with(DataSourceProperty::<String>::new(
                "jndi-name",
                |l| l.jndi_name.clone(),
                |p| p.jndi_name.clone(),
                |s, v| s.jndi_name = Some(v),
                |l, v| Ok(vec![l.write("jndi-name", string(v))]),
            ))
            .with(DataSourceProperty::<String>::new(
                "uri",
                |l| l.uri.clone(),
                |p| p.uri.clone(),
                |s, v| s.uri = Some(v),
                |l, v| l.write_uri(v.map(String::as_str)),
            ))
            .with(DataSourceProperty::<String>::new(
                "user-name",
                |l| l.user_name.clone(),
                |p| p.user_name.clone(),
                |s, v| s.user_name = Some(v),
                |l, v| Ok(vec![l.write("user-name", string(v))]),
            ))
            .with(
                DataSourceProperty::<String>::new(
                    "password",
                    |l| l.password.clone(),
                    |p| p.password.clone(),
                    |s, v| s.password = Some(v),
                    |l, v| Ok(vec![l.write("password", string(v))]),
                )
                .confidential(),
            )
            .with(DataSourceProperty::<u32>::new(
                "min-pool-size",
                |l| l.min_pool_size,
                |p| p.min_pool_size,
                |s, v| s.min_pool_size = Some(v),
                |l, v| Ok(vec![l.write("min-pool-size", number(v))]),
            ))
            .with(DataSourceProperty::<u32>::new(
                "initial-pool-size",
                |l| l.initial_pool_size,
                |p| p.initial_pool_size,
                |s, v| s.initial_pool_size = Some(v),
                |l, v| Ok(vec![l.write("initial-pool-size", number(v))]),
            ))
            .with(DataSourceProperty::<u32>::new(
                "max-pool-size",
                |l| l.max_pool_size,
                |p| p.max_pool_size,
                |s, v| s.max_pool_size = Some(v),
                |l, v| Ok(vec![l.write("max-pool-size", number(v))]),
            ))
            .with(DataSourceProperty::<u32>::new(
                "max-age",
                |l| l.max_age,
                |p| p.max_age,
                |s, v| s.max_age = Some(v),
                |l, v| Ok(vec![l.write("idle-timeout-minutes", number(v))]),
            ));
        Self { properties }
    }
}

impl Default for DataSourceReconciler {
    fn default() -> Self {
        Self::new()
    }
}

fn target(name: &str) -> AuditBuilder {
    AuditBuilder::new(AuditTarget::DataSource { name: name.to_string() })
}

#[async_trait]
impl ResourceReconciler for DataSourceReconciler {
    type Plan = DataSourcePlan;
    type Live = DataSourceResource;

    fn kind(&self) -> ResourceKind {
        ResourceKind::DataSources
    }

    fn planned<'p>(&self, plan: &'p Plan) -> Vec<&'p DataSourcePlan> {
        plan.data_sources.values().collect()
    }

    async fn existing(&self, container: &Container) -> Result<Vec<DataSourceResource>> {
        data_source::list(container).await
    }

    fn live_id(&self, live: &DataSourceResource) -> String {
        live.name.clone()
    }

    async fn read(&self, container: &Container, plan: &DataSourcePlan) -> Result<Option<DataSourceResource>> {
        data_source::read(container, &plan.name).await
    }

    fn audit_for_live(&self, live: &DataSourceResource) -> AuditBuilder {
        target(&live.name)
    }

    fn audit_for_plan(&self, plan: &DataSourcePlan) -> AuditBuilder {
        target(&plan.name)
    }

    async fn update(
        &self,
        _container: &Container,
        live: &DataSourceResource,
        plan: &DataSourcePlan,
        audit: &mut AuditBuilder,
    ) -> Result<Vec<Operation>> {
        self.properties.update(live, plan, audit)
    }

    async fn add(&self, _container: &Container, plan: &DataSourcePlan, audit: &mut AuditBuilder) -> Result<AddOutcome> {
        let mut spec = DataSourceSpec::new(plan.name.as_str());
        self.properties.build(plan, &mut spec, audit);
        Ok(AddOutcome::Added(spec.add()?))
    }

    async fn remove(
        &self,
        _container: &Container,
        live: &DataSourceResource,
        _plan: Option<&DataSourcePlan>,
        audit: &mut AuditBuilder,
    ) -> Result<Vec<Operation>> {
        self.properties.audit_removal(live, audit);
        Ok(vec![live.remove()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::CONCEALED;
    use crate::error::DeployerError;
    use serde_json::json;

    fn live(xa: bool) -> DataSourceResource {
        DataSourceResource::from_node(
            "db",
            xa,
            &json!({
                "connection-url": "jdbc:h2:mem:db",
                "driver-name": "h2",
                "jndi-name": "java:/datasources/dbDS",
                "user-name": "sa",
                "password": "old-secret"
            }),
        )
    }

    fn plan() -> DataSourcePlan {
        DataSourcePlan::new("db", "jdbc:h2:mem:db")
            .with_driver("h2")
            .with_jndi_name("java:/datasources/dbDS")
            .with_credentials("sa", "old-secret")
    }

    #[test]
    fn test_unchanged() {
        let mut audit = target("db");
        let operations = DataSourceReconciler::new()
            .properties
            .update(&live(false), &plan(), &mut audit)
            .expect("update");
        assert!(operations.is_empty());
        assert_eq!(audit.change_count(), 0);
    }

    #[test]
    fn test_password_change_is_concealed() {
        let plan = plan().with_credentials("sa", "new-secret");
        let mut audit = target("db");
        let operations = DataSourceReconciler::new()
            .properties
            .update(&live(false), &plan, &mut audit)
            .expect("update");

        assert_eq!(operations.len(), 1);
        let audit = audit.changed();
        let change = audit.change("password").expect("password");
        assert_eq!(change.old_value.as_deref(), Some(CONCEALED));
        assert_eq!(change.new_value.as_deref(), Some(CONCEALED));
        let json = serde_json::to_string(&audit).expect("json");
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_xa_cannot_change_in_place() {
        let mut plan = plan();
        plan.xa = true;
        let mut audit = target("db");
        let err = DataSourceReconciler::new()
            .properties
            .update(&live(false), &plan, &mut audit)
            .expect_err("immutable");
        assert!(matches!(
            err,
            DeployerError::Reconcile(ReconcileError::ImmutableProperty { ref property, .. }) if property == "xa"
        ));
    }

    #[test]
    fn test_pool_sizes() {
        let mut plan = plan();
        plan.max_pool_size = Some(20);
        plan.max_age = Some(5);
        let mut audit = target("db");
        let operations = DataSourceReconciler::new()
            .properties
            .update(&live(false), &plan, &mut audit)
            .expect("update");
        let names: Vec<_> = operations.iter().filter_map(|o| o.get("name")).collect();
        assert_eq!(names, vec![&json!("max-pool-size"), &json!("idle-timeout-minutes")]);
        assert_eq!(audit.changed().change("max-age").and_then(|c| c.new_value.clone()), Some("5".into()));
    }
}
