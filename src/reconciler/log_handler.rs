//! Log handler reconciliation.

use async_trait::async_trait;
use serde_json::Value;

use super::engine::{AddOutcome, ResourceReconciler};
use super::property::{Descriptor, Property, Registry, render_map};
use crate::audit::{AuditBuilder, AuditTarget};
use crate::container::log_handler::{self, LogHandlerResource, LogHandlerSpec, file_value};
use crate::container::{Container, Operation};
use crate::error::{ReconcileError, Result};
use crate::plan::{LogHandlerPlan, LogLevel, Plan, ResourceKind};

type HandlerProperty<T> = Property<LogHandlerPlan, LogHandlerResource, LogHandlerSpec, T>;

/// The properties map of a handler. Keys that differ are put or removed one
/// by one, and the change is audited once for the whole map.
struct Properties;

impl Descriptor<LogHandlerPlan, LogHandlerResource, LogHandlerSpec> for Properties {
    fn name(&self) -> &'static str {
        "properties"
    }

    fn update(
        &self,
        live: &LogHandlerResource,
        plan: &LogHandlerPlan,
        audit: &mut AuditBuilder,
    ) -> Result<Vec<Operation>> {
        let removed: Vec<(&str, &str)> = live
            .properties
            .iter()
            .filter(|(key, value)| plan.properties.get(*key) != Some(*value))
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        let added: Vec<(&str, &str)> = plan
            .properties
            .iter()
            .filter(|(key, value)| live.properties.get(*key) != Some(*value))
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        if removed.is_empty() && added.is_empty() {
            return Ok(Vec::new());
        }

        audit.change(
            self.name(),
            (!removed.is_empty()).then(|| render_map(removed.iter().copied())),
            (!added.is_empty()).then(|| render_map(added.iter().copied())),
        );
        Ok(removed
            .iter()
            .filter(|(key, _)| !plan.properties.contains_key(*key))
            .map(|(key, _)| live.remove_property(key))
            .chain(added.iter().map(|(key, value)| live.put_property(key, value)))
            .collect())
    }

    fn build(&self, plan: &LogHandlerPlan, spec: &mut LogHandlerSpec, audit: &mut AuditBuilder) {
        if !plan.properties.is_empty() {
            let rendered = render_map(plan.properties.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            audit.change(self.name(), None, Some(rendered));
            spec.properties.clone_from(&plan.properties);
        }
    }

    fn audit_removal(&self, live: &LogHandlerResource, audit: &mut AuditBuilder) {
        if !live.properties.is_empty() {
            let rendered = render_map(live.properties.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            audit.change(self.name(), Some(rendered), None);
        }
    }
}

fn string(value: Option<&String>) -> Option<Value> {
    value.map(|v| Value::from(v.as_str()))
}

/// Reconciles console, periodic-rotating-file and custom handlers.
#[derive(Debug)]
pub struct LogHandlerReconciler {
    properties: Registry<LogHandlerPlan, LogHandlerResource, LogHandlerSpec>,
}

impl LogHandlerReconciler {
    /// Creates the reconciler and its property registry.
    #[must_use]
    pub fn new() -> Self {
        let properties = Registry::new()
            .with(HandlerProperty::<LogLevel>::new(
                "level",
                |l| l.level,
                |p| p.level,
                |s, v| s.level = Some(v),
                |l, v| Ok(vec![l.write("level", v.map(|v| Value::from(v.as_str())))]),
            ))
            .with(HandlerProperty::<String>::new(
                "format",
                |l| l.format.clone(),
                |p| p.format.clone(),
                |s, v| s.format = Some(v),
                |l, v| Ok(vec![l.write("formatter", string(v))]),
            ))
            .with(HandlerProperty::<String>::new(
                "formatter",
                |l| l.formatter.clone(),
                |p| p.formatter.clone(),
                |s, v| s.formatter = Some(v),
                |l, v| Ok(vec![l.write("named-formatter", string(v))]),
            ))
            .with(HandlerProperty::<String>::new(
                "encoding",
                |l| l.encoding.clone(),
                |p| p.encoding.clone(),
                |s, v| s.encoding = Some(v),
                |l, v| Ok(vec![l.write("encoding", string(v))]),
            ))
            .with(HandlerProperty::<String>::new(
                "file",
                |l| l.file.clone(),
                |p| p.file.clone(),
                |s, v| s.file = Some(v),
                |l, v| Ok(vec![l.write("file", v.map(|path| file_value(path)))]),
            ))
            .with(HandlerProperty::<String>::new(
                "suffix",
                |l| l.suffix.clone(),
                |p| p.suffix.clone(),
                |s, v| s.suffix = Some(v),
                |l, v| Ok(vec![l.write("suffix", string(v))]),
            ))
            .with(HandlerProperty::<String>::new(
                "module",
                |l| l.module.clone(),
                |p| p.module.clone(),
                |s, v| s.module = Some(v),
                |l, v| Ok(vec![l.write("module", string(v))]),
            ))
            .with(HandlerProperty::<String>::new(
                "class",
                |l| l.class.clone(),
                |p| p.class.clone(),
                |s, v| s.class = Some(v),
                |l, v| Ok(vec![l.write("class", string(v))]),
            ))
            .with(Properties);
        Self { properties }
    }
}

impl Default for LogHandlerReconciler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceReconciler for LogHandlerReconciler {
    type Plan = LogHandlerPlan;
    type Live = LogHandlerResource;

    fn kind(&self) -> ResourceKind {
        ResourceKind::LogHandlers
    }

    fn planned<'p>(&self, plan: &'p Plan) -> Vec<&'p LogHandlerPlan> {
        plan.log_handlers.values().collect()
    }

    async fn existing(&self, container: &Container) -> Result<Vec<LogHandlerResource>> {
        log_handler::list(container).await
    }

    fn live_id(&self, live: &LogHandlerResource) -> String {
        live.name.clone()
    }

    async fn read(&self, container: &Container, plan: &LogHandlerPlan) -> Result<Option<LogHandlerResource>> {
        log_handler::find(container, plan.handler_type, &plan.name).await
    }

    fn audit_for_live(&self, live: &LogHandlerResource) -> AuditBuilder {
        AuditBuilder::new(AuditTarget::LogHandler {
            handler_type: live.handler_type,
            name: live.name.clone(),
        })
    }

    fn audit_for_plan(&self, plan: &LogHandlerPlan) -> AuditBuilder {
        AuditBuilder::new(AuditTarget::LogHandler {
            handler_type: plan.handler_type,
            name: plan.name.clone(),
        })
    }

    async fn update(
        &self,
        _container: &Container,
        live: &LogHandlerResource,
        plan: &LogHandlerPlan,
        audit: &mut AuditBuilder,
    ) -> Result<Vec<Operation>> {
        if live.handler_type != plan.handler_type {
            return Err(ReconcileError::ImmutableProperty {
                kind: ResourceKind::LogHandlers.name().to_string(),
                name: live.name.clone(),
                property: "type".to_string(),
            }
            .into());
        }
        self.properties.update(live, plan, audit)
    }

    async fn add(&self, _container: &Container, plan: &LogHandlerPlan, audit: &mut AuditBuilder) -> Result<AddOutcome> {
        let mut spec = LogHandlerSpec::new(plan.handler_type, plan.name.as_str());
        self.properties.build(plan, &mut spec, audit);
        Ok(AddOutcome::Added(vec![spec.add()]))
    }

    async fn remove(
        &self,
        _container: &Container,
        live: &LogHandlerResource,
        _plan: Option<&LogHandlerPlan>,
        audit: &mut AuditBuilder,
    ) -> Result<Vec<Operation>> {
        self.properties.audit_removal(live, audit);
        Ok(vec![live.remove()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::OperationKind;
    use crate::plan::LogHandlerType;
    use serde_json::json;

    fn target() -> AuditBuilder {
        AuditBuilder::new(AuditTarget::LogHandler {
            handler_type: LogHandlerType::Custom,
            name: "SYSLOG".into(),
        })
    }

    fn live() -> LogHandlerResource {
        LogHandlerResource::from_node(
            LogHandlerType::Custom,
            "SYSLOG",
            &json!({
                "level": "INFO",
                "module": "org.foo",
                "class": "org.foo.Handler",
                "properties": {"host": "localhost", "port": "514"}
            }),
        )
    }

    fn plan() -> LogHandlerPlan {
        let mut plan = LogHandlerPlan::new("SYSLOG", LogHandlerType::Custom).with_level(LogLevel::Info);
        plan.module = Some("org.foo".into());
        plan.class = Some("org.foo.Handler".into());
        plan
    }

    #[test]
    fn test_properties_difference() {
        let plan = plan().with_property("port", "514").with_property("facility", "LOCAL0");
        let mut audit = target();
        let operations = LogHandlerReconciler::new()
            .properties
            .update(&live(), &plan, &mut audit)
            .expect("update");

        let kinds: Vec<_> = operations.iter().map(Operation::kind).collect();
        assert_eq!(kinds, vec![OperationKind::MapRemove, OperationKind::MapPut]);
        assert_eq!(operations[0].get("key"), Some(&json!("host")));
        assert_eq!(operations[1].get("key"), Some(&json!("facility")));

        let audit = audit.changed();
        assert_eq!(audit.changes.len(), 1);
        let change = audit.change("properties").expect("properties");
        assert_eq!(change.old_value.as_deref(), Some("{host=localhost}"));
        assert_eq!(change.new_value.as_deref(), Some("{facility=LOCAL0}"));
    }

    #[test]
    fn test_changed_property_value_is_put_only() {
        let plan = plan().with_property("host", "localhost").with_property("port", "1514");
        let mut audit = target();
        let operations = LogHandlerReconciler::new()
            .properties
            .update(&live(), &plan, &mut audit)
            .expect("update");
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].kind(), OperationKind::MapPut);
        let change = audit.changed();
        assert_eq!(change.changes[0].old_value.as_deref(), Some("{port=514}"));
    }

    #[test]
    fn test_file_is_written_relative_to_log_dir() {
        let live = LogHandlerResource::from_node(
            LogHandlerType::PeriodicRotatingFile,
            "FOO",
            &json!({"file": {"path": "foo.log", "relative-to": log_handler::LOG_DIR}}),
        );
        let mut plan = LogHandlerPlan::new("FOO", LogHandlerType::PeriodicRotatingFile);
        plan.file = Some("bar.log".into());

        let mut audit = target();
        let operations = LogHandlerReconciler::new()
            .properties
            .update(&live, &plan, &mut audit)
            .expect("update");
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].get("value"), Some(&file_value("bar.log")));
    }
}
