//! Which resources a run may touch.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ConfigError, Result};
use crate::plan::ResourceKind;

/// Resource kinds whose unplanned resources are removed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(untagged)]
pub enum ManagedKinds {
    /// No kind is managed; unplanned resources are left alone.
    #[default]
    None,
    /// Every kind.
    All,
    /// The listed kinds.
    Some(BTreeSet<ResourceKind>),
}

impl ManagedKinds {
    /// Sentinel that manages every kind.
    pub const ALL: &'static str = "all";

    /// Parses the configured names.
    ///
    /// # Errors
    ///
    /// Returns an error for a name that is neither a kind nor `all`.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kinds = BTreeSet::new();
        for name in names {
            let name = name.as_ref().trim();
            if name == Self::ALL {
                return Ok(Self::All);
            }
            let kind = ResourceKind::from_name(name).ok_or_else(|| ConfigError::UnknownResourceKind {
                name: name.to_string(),
            })?;
            kinds.insert(kind);
        }
        if kinds.is_empty() {
            Ok(Self::None)
        } else {
            Ok(Self::Some(kinds))
        }
    }

    /// Returns true if unplanned resources of this kind are removed.
    #[must_use]
    pub fn contains(&self, kind: ResourceKind) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Some(kinds) => kinds.contains(&kind),
        }
    }
}

/// Scope of one run, passed explicitly into every reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileConfig {
    /// Kinds whose unplanned resources are removed.
    pub managed: ManagedKinds,
    /// Names excluded from reconciliation, per kind.
    pub pinned: BTreeMap<ResourceKind, BTreeSet<String>>,
}

impl ReconcileConfig {
    /// A scope that manages nothing and pins nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the managed kinds.
    #[must_use]
    pub fn with_managed(mut self, managed: ManagedKinds) -> Self {
        self.managed = managed;
        self
    }

    /// Pins one resource.
    #[must_use]
    pub fn with_pinned(mut self, kind: ResourceKind, name: impl Into<String>) -> Self {
        self.pinned.entry(kind).or_default().insert(name.into());
        self
    }

    /// Returns true if the kind is managed.
    #[must_use]
    pub fn is_managed(&self, kind: ResourceKind) -> bool {
        self.managed.contains(kind)
    }

    /// Returns true if the resource is pinned.
    #[must_use]
    pub fn is_pinned(&self, kind: ResourceKind, name: &str) -> bool {
        self.pinned.get(&kind).is_some_and(|names| names.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_sentinel() {
        let managed = ManagedKinds::from_names(["all"]).expect("managed");
        assert!(ResourceKind::ALL.into_iter().all(|kind| managed.contains(kind)));
    }

    #[test]
    fn test_listed_kinds() {
        let managed = ManagedKinds::from_names(["loggers", "deployables"]).expect("managed");
        assert!(managed.contains(ResourceKind::Loggers));
        assert!(!managed.contains(ResourceKind::DataSources));
        assert_eq!(ManagedKinds::from_names(Vec::<String>::new()).expect("empty"), ManagedKinds::None);
    }

    #[test]
    fn test_unknown_kind() {
        assert!(ManagedKinds::from_names(["queues"]).is_err());
    }

    #[test]
    fn test_pinned() {
        let config = ReconcileConfig::new().with_pinned(ResourceKind::Loggers, "org.jboss.as");
        assert!(config.is_pinned(ResourceKind::Loggers, "org.jboss.as"));
        assert!(!config.is_pinned(ResourceKind::Deployables, "org.jboss.as"));
    }
}
