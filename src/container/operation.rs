//! Typed management operations.

use serde_json::{Map, Value, json};
use std::fmt;

use super::address::Address;
use crate::plan::ResourceKind;

/// Whether an operation creates or modifies state, or takes it away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Adds or writes.
    Additive,
    /// Undeploys or removes.
    Subtractive,
}

impl Direction {
    /// Multiplier applied to the kind rank.
    #[must_use]
    pub const fn sign(&self) -> i32 {
        match self {
            Self::Additive => 1,
            Self::Subtractive => -1,
        }
    }
}

/// Management operations the reconciler emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Create a resource.
    Add,
    /// Attach a handler to a logger.
    AddHandler,
    /// Set or undefine an attribute.
    WriteAttribute,
    /// Set one key of a map attribute.
    MapPut,
    /// Remove one key of a map attribute.
    MapRemove,
    /// Replace the content of a deployment.
    FullReplaceDeployment,
    /// Stop a deployment.
    Undeploy,
    /// Delete a resource.
    Remove,
    /// Detach a handler from a logger.
    RemoveHandler,
}

impl OperationKind {
    /// Operation name on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::AddHandler => "add-handler",
            Self::WriteAttribute => "write-attribute",
            Self::MapPut => "map-put",
            Self::MapRemove => "map-remove",
            Self::FullReplaceDeployment => "full-replace-deployment",
            Self::Undeploy => "undeploy",
            Self::Remove => "remove",
            Self::RemoveHandler => "remove-handler",
        }
    }

    /// Direction used for sequencing.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        match self {
            Self::Add
            | Self::AddHandler
            | Self::WriteAttribute
            | Self::MapPut
            | Self::MapRemove
            | Self::FullReplaceDeployment => Direction::Additive,
            Self::Undeploy | Self::Remove | Self::RemoveHandler => Direction::Subtractive,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sequencing key: direction first, then the signed kind rank.
pub type SortKey = (Direction, i32);

/// One step of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    kind: OperationKind,
    resource_kind: ResourceKind,
    address: Address,
    params: Map<String, Value>,
    content: Option<Vec<u8>>,
    sort_key: SortKey,
}

impl Operation {
    /// Creates an operation without parameters.
    #[must_use]
    pub fn new(kind: OperationKind, resource_kind: ResourceKind, address: Address) -> Self {
        let direction = kind.direction();
        Self {
            kind,
            resource_kind,
            address,
            params: Map::new(),
            content: None,
            sort_key: (direction, direction.sign() * resource_kind.rank()),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Attaches deployment content, sent alongside the request.
    #[must_use]
    pub fn with_content(mut self, content: Vec<u8>) -> Self {
        self.content = Some(content);
        self
    }

    /// `add` with the given attributes.
    #[must_use]
    pub fn add(resource_kind: ResourceKind, address: Address) -> Self {
        Self::new(OperationKind::Add, resource_kind, address)
    }

    /// `remove`.
    #[must_use]
    pub fn remove(resource_kind: ResourceKind, address: Address) -> Self {
        Self::new(OperationKind::Remove, resource_kind, address)
    }

    /// `write-attribute`; a missing value undefines the attribute.
    #[must_use]
    pub fn write_attribute(resource_kind: ResourceKind, address: Address, name: &str, value: Option<Value>) -> Self {
        let operation = Self::new(OperationKind::WriteAttribute, resource_kind, address).param("name", name);
        match value {
            Some(value) => operation.param("value", value),
            None => operation,
        }
    }

    /// `map-put` of one key.
    #[must_use]
    pub fn map_put(resource_kind: ResourceKind, address: Address, name: &str, key: &str, value: &str) -> Self {
        Self::new(OperationKind::MapPut, resource_kind, address)
            .param("name", name)
            .param("key", key)
            .param("value", value)
    }

    /// `map-remove` of one key.
    #[must_use]
    pub fn map_remove(resource_kind: ResourceKind, address: Address, name: &str, key: &str) -> Self {
        Self::new(OperationKind::MapRemove, resource_kind, address)
            .param("name", name)
            .param("key", key)
    }

    /// The operation kind.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The resource kind the operation belongs to.
    #[must_use]
    pub const fn resource_kind(&self) -> ResourceKind {
        self.resource_kind
    }

    /// The target address.
    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }

    /// A parameter value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Attached content, if any.
    #[must_use]
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    /// Key computed when the operation was created.
    #[must_use]
    pub const fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    /// The JSON step. Content is referenced by its index among the request
    /// attachments.
    #[must_use]
    pub fn to_step(&self, attachment_index: Option<usize>) -> Value {
        let mut step = Map::new();
        step.insert("operation".to_string(), Value::String(self.kind.name().to_string()));
        step.insert("address".to_string(), self.address.to_json());
        for (name, value) in &self.params {
            step.insert(name.clone(), value.clone());
        }
        if let Some(index) = attachment_index {
            step.insert("content".to_string(), json!([{ "input-stream-index": index }]));
        }
        Value::Object(step)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.kind)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(name, value)| match value {
                    Value::String(s) => format!("{name}={s}"),
                    other => format!("{name}={other}"),
                })
                .collect();
            write!(f, "({})", params.join(", "))?;
        }
        if let Some(content) = &self.content {
            write!(f, " [{} bytes]", content.len())?;
        }
        Ok(())
    }
}
