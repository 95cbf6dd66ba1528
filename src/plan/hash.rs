//! Plan fingerprints.
//!
//! A run report carries the fingerprint of the plan it applied, so two
//! reports can be compared without keeping the plans around.

use sha2::{Digest, Sha256};

use super::model::{DataSourcePlan, DeployablePlan, LogHandlerPlan, LoggerPlan, Plan};

/// Hasher for computing plan fingerprints.
#[derive(Debug, Default)]
pub struct PlanHasher;

impl PlanHasher {
    /// Creates a new plan hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of the entire plan.
    ///
    /// Entry order matters: it is the order operations are generated in.
    #[must_use]
    pub fn hash_plan(&self, plan: &Plan) -> String {
        let mut hasher = Sha256::new();

        for handler in plan.log_handlers.values() {
            hasher.update(self.hash_log_handler(handler).as_bytes());
        }
        for logger in plan.loggers.values() {
            hasher.update(self.hash_logger(logger).as_bytes());
        }
        for data_source in plan.data_sources.values() {
            hasher.update(self.hash_data_source(data_source).as_bytes());
        }
        for deployable in plan.deployables.values() {
            hasher.update(self.hash_deployable(deployable).as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a hash for a single deployable.
    #[must_use]
    pub fn hash_deployable(&self, deployable: &DeployablePlan) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"deployable");
        hasher.update(deployable.name.as_bytes());
        hasher.update(deployable.state.to_string().as_bytes());
        update_opt(&mut hasher, deployable.group_id.as_deref());
        hasher.update(deployable.artifact_id.as_bytes());
        hasher.update(deployable.version.as_str().as_bytes());
        hasher.update(deployable.artifact_type.type_name().as_bytes());
        update_opt(&mut hasher, deployable.classifier.as_deref());
        update_opt(&mut hasher, deployable.checksum.as_ref().map(|c| c.as_str()));
        hex::encode(hasher.finalize())
    }

    /// Computes a hash for a single logger.
    #[must_use]
    pub fn hash_logger(&self, logger: &LoggerPlan) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"logger");
        hasher.update(logger.category.as_bytes());
        hasher.update(logger.state.to_string().as_bytes());
        update_opt(&mut hasher, logger.level.map(|l| l.as_str()));
        for handler in &logger.handlers {
            hasher.update(handler.as_bytes());
        }
        hasher.update([u8::from(logger.effective_use_parent_handlers())]);
        hex::encode(hasher.finalize())
    }

    /// Computes a hash for a single log handler.
    #[must_use]
    pub fn hash_log_handler(&self, handler: &LogHandlerPlan) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"log-handler");
        hasher.update(handler.name.as_bytes());
        hasher.update(handler.state.to_string().as_bytes());
        hasher.update(handler.handler_type.type_name().as_bytes());
        update_opt(&mut hasher, handler.level.map(|l| l.as_str()));
        for value in [
            &handler.format,
            &handler.formatter,
            &handler.encoding,
            &handler.file,
            &handler.suffix,
            &handler.module,
            &handler.class,
        ] {
            update_opt(&mut hasher, value.as_deref());
        }

        // Properties (sorted for determinism)
        let mut properties: Vec<_> = handler.properties.iter().collect();
        properties.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in properties {
            hasher.update(key.as_bytes());
            hasher.update(value.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Computes a hash for a single data source. The password takes part so
    /// that a credential rotation changes the fingerprint.
    #[must_use]
    pub fn hash_data_source(&self, data_source: &DataSourcePlan) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"data-source");
        hasher.update(data_source.name.as_bytes());
        hasher.update(data_source.state.to_string().as_bytes());
        hasher.update([u8::from(data_source.xa)]);
        for value in [
            &data_source.driver,
            &data_source.jndi_name,
            &data_source.uri,
            &data_source.user_name,
            &data_source.password,
        ] {
            update_opt(&mut hasher, value.as_deref());
        }
        for value in [
            data_source.min_pool_size,
            data_source.initial_pool_size,
            data_source.max_pool_size,
            data_source.max_age,
        ] {
            match value {
                Some(v) => hasher.update(v.to_be_bytes()),
                None => hasher.update([0xff]),
            }
        }
        hex::encode(hasher.finalize())
    }
}

fn update_opt(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update([1]);
            hasher.update(v.as_bytes());
        }
        None => hasher.update([0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Version;

    fn sample_plan() -> Plan {
        Plan::new()
            .with_deployable(DeployablePlan::new("foo", "org.foo", "foo-war", Version::new("1.0.0")))
            .with_data_source(DataSourcePlan::new("db", "jdbc:h2:mem:db").with_credentials("sa", "one"))
    }

    #[test]
    fn test_hash_deterministic() {
        let hasher = PlanHasher::new();
        assert_eq!(hasher.hash_plan(&sample_plan()), hasher.hash_plan(&sample_plan()));
        assert_eq!(hasher.hash_plan(&sample_plan()).len(), 64);
    }

    #[test]
    fn test_hash_changes_with_version() {
        let hasher = PlanHasher::new();
        let changed = sample_plan().with_deployable(DeployablePlan::new("foo", "org.foo", "foo-war", Version::new("1.0.1")));
        assert_ne!(hasher.hash_plan(&sample_plan()), hasher.hash_plan(&changed));
    }

    #[test]
    fn test_hash_changes_with_password() {
        let hasher = PlanHasher::new();
        let changed = sample_plan().with_data_source(DataSourcePlan::new("db", "jdbc:h2:mem:db").with_credentials("sa", "two"));
        assert_ne!(hasher.hash_plan(&sample_plan()), hasher.hash_plan(&changed));
    }
}
