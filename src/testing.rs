//! In-memory collaborators for tests.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::container::{Address, ManagementClient, ManagementRequest, ManagementResponse};
use crate::error::{RepositoryError, Result};
use crate::plan::{ArtifactType, Checksum, Version};
use crate::repository::{Artifact, ArtifactCoordinates, Repository};

#[derive(Debug, Default)]
struct FakeState {
    resources: BTreeMap<Address, Map<String, Value>>,
    commits: Vec<Vec<Value>>,
    requests: usize,
    reads: Vec<Address>,
    read_failure: Option<String>,
    commit_failure: Option<String>,
    process_state: Option<String>,
}

/// A management model kept in memory. Reads see committed changes.
#[derive(Debug, Default)]
pub struct FakeManagementClient {
    state: Mutex<FakeState>,
}

fn lock(state: &Mutex<FakeState>) -> std::sync::MutexGuard<'_, FakeState> {
    state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl FakeManagementClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a resource.
    pub fn insert(&self, address: Address, node: Value) {
        let node = node.as_object().cloned().unwrap_or_default();
        lock(&self.state).resources.insert(address, node);
    }

    /// Stores a deployment whose content has the given checksum.
    pub fn insert_deployment(&self, name: &str, checksum: &str) {
        self.insert(
            Address::root().and("deployment", name),
            json!({
                "name": name,
                "runtime-name": name,
                "enabled": true,
                "content": [{"hash": {"BYTES_VALUE": STANDARD.encode(hex::decode(checksum).unwrap_or_default())}}]
            }),
        );
    }

    /// A resource as stored, without children.
    pub fn get(&self, address: &Address) -> Option<Value> {
        lock(&self.state).resources.get(address).cloned().map(Value::Object)
    }

    /// Makes every read fail with the description.
    pub fn fail_reads(&self, description: &str) {
        lock(&self.state).read_failure = Some(description.to_string());
    }

    /// Makes every commit fail with the description.
    pub fn fail_commits(&self, description: &str) {
        lock(&self.state).commit_failure = Some(description.to_string());
    }

    /// Reports this process state after commits.
    pub fn set_process_state(&self, state: &str) {
        lock(&self.state).process_state = Some(state.to_string());
    }

    /// Number of requests received.
    pub fn request_count(&self) -> usize {
        lock(&self.state).requests
    }

    /// Addresses of every read-resource request, in order.
    pub fn reads(&self) -> Vec<Address> {
        lock(&self.state).reads.clone()
    }

    /// Steps of every committed composite, in order.
    pub fn commits(&self) -> Vec<Vec<Value>> {
        lock(&self.state).commits.clone()
    }

    /// Steps of the last committed composite.
    pub fn last_commit(&self) -> Vec<Value> {
        lock(&self.state).commits.last().cloned().unwrap_or_default()
    }
}

fn not_found(address: &Address) -> ManagementResponse {
    ManagementResponse::failed(format!("WFLYCTL0216: Management resource '{address}' not found"))
}

fn with_children(resources: &BTreeMap<Address, Map<String, Value>>, address: &Address) -> Value {
    let mut node = resources.get(address).cloned().unwrap_or_default();
    let depth = address.segments().len();
    for child in resources.keys() {
        if child.segments().len() == depth + 1 && child.segments()[..depth] == *address.segments() {
            if let Some((key, name)) = child.segments().last() {
                let group = node
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !group.is_object() {
                    *group = Value::Object(Map::new());
                }
                if let Some(group) = group.as_object_mut() {
                    group.insert(name.clone(), with_children(resources, child));
                }
            }
        }
    }
    Value::Object(node)
}

fn read(state: &FakeState, address: &Address) -> ManagementResponse {
    if let Some(description) = &state.read_failure {
        return ManagementResponse::failed(description.clone());
    }
    if address.last_value() == Some(Address::WILDCARD) {
        let depth = address.segments().len();
        let prefix = &address.segments()[..depth - 1];
        let items: Vec<Value> = state
            .resources
            .keys()
            .filter(|a| {
                a.segments().len() == depth
                    && a.segments()[..depth - 1] == *prefix
                    && a.last_key() == address.last_key()
            })
            .map(|a| {
                json!({
                    "address": a.to_json(),
                    "outcome": "success",
                    "result": with_children(&state.resources, a)
                })
            })
            .collect();
        return ManagementResponse::success(Value::Array(items));
    }
    if state.resources.contains_key(address) {
        ManagementResponse::success(with_children(&state.resources, address))
    } else {
        not_found(address)
    }
}

fn params(step: &Value) -> Map<String, Value> {
    let mut params = step.as_object().cloned().unwrap_or_default();
    params.remove("operation");
    params.remove("address");
    params
}

fn content_node(step: &Value, attachments: &[Vec<u8>]) -> Option<Value> {
    let index = step.get("content")?.get(0)?.get("input-stream-index")?.as_u64()?;
    let bytes = attachments.get(usize::try_from(index).ok()?)?;
    let digest = std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| hex::decode(s).ok())
        .unwrap_or_else(|| bytes.clone());
    Some(json!([{"hash": {"BYTES_VALUE": STANDARD.encode(digest)}}]))
}

fn apply(
    resources: &mut BTreeMap<Address, Map<String, Value>>,
    step: &Value,
    attachments: &[Vec<u8>],
) -> std::result::Result<(), String> {
    let operation = step.get("operation").and_then(Value::as_str).unwrap_or_default();
    let address = step
        .get("address")
        .and_then(Address::from_json)
        .ok_or_else(|| "missing address".to_string())?;
    let name = step.get("name").and_then(Value::as_str).unwrap_or_default().to_string();

    if operation == "add" {
        if resources.contains_key(&address) {
            return Err(format!("WFLYCTL0212: Duplicate resource {address}"));
        }
        let mut node = params(step);
        if let Some(content) = content_node(step, attachments) {
            node.insert("content".to_string(), content);
        }
        resources.insert(address, node);
        return Ok(());
    }

    if operation == "full-replace-deployment" {
        let target = Address::root().and("deployment", name.clone());
        let node = resources.entry(target).or_default();
        node.insert("name".to_string(), Value::String(name.clone()));
        node.insert("runtime-name".to_string(), Value::String(name));
        node.insert("enabled".to_string(), Value::Bool(true));
        if let Some(content) = content_node(step, attachments) {
            node.insert("content".to_string(), content);
        }
        return Ok(());
    }

    if operation == "remove" {
        if resources.remove(&address).is_none() {
            return Err(format!("WFLYCTL0216: Management resource '{address}' not found"));
        }
        let depth = address.segments().len();
        resources.retain(|a, _| !(a.segments().len() > depth && a.segments()[..depth] == *address.segments()));
        return Ok(());
    }

    let node = resources
        .get_mut(&address)
        .ok_or_else(|| format!("WFLYCTL0216: Management resource '{address}' not found"))?;

    match operation {
        "write-attribute" => {
            match step.get("value") {
                Some(value) => node.insert(name, value.clone()),
                None => node.remove(&name),
            };
        }
        "map-put" => {
            let key = step.get("key").and_then(Value::as_str).unwrap_or_default().to_string();
            let value = step.get("value").cloned().unwrap_or(Value::Null);
            let map = node.entry(name).or_insert_with(|| Value::Object(Map::new()));
            if !map.is_object() {
                *map = Value::Object(Map::new());
            }
            if let Some(map) = map.as_object_mut() {
                map.insert(key, value);
            }
        }
        "map-remove" => {
            let key = step.get("key").and_then(Value::as_str).unwrap_or_default();
            if let Some(map) = node.get_mut(&name).and_then(Value::as_object_mut) {
                map.remove(key);
            }
        }
        "add-handler" => {
            let handlers = node.entry("handlers").or_insert_with(|| Value::Array(Vec::new()));
            if !handlers.is_array() {
                *handlers = Value::Array(Vec::new());
            }
            if let Some(handlers) = handlers.as_array_mut() {
                handlers.push(Value::String(name));
            }
        }
        "remove-handler" => {
            if let Some(handlers) = node.get_mut("handlers").and_then(Value::as_array_mut) {
                handlers.retain(|h| h.as_str() != Some(name.as_str()));
            }
        }
        "undeploy" => {
            node.insert("enabled".to_string(), Value::Bool(false));
        }
        other => return Err(format!("unsupported operation {other}")),
    }
    Ok(())
}

#[async_trait]
impl ManagementClient for FakeManagementClient {
    async fn execute(&self, request: ManagementRequest) -> Result<ManagementResponse> {
        let mut state = lock(&self.state);
        state.requests += 1;

        let address = request
            .operation
            .get("address")
            .and_then(Address::from_json)
            .unwrap_or_default();

        match request.operation_name() {
            "read-resource" => {
                state.reads.push(address.clone());
                Ok(read(&state, &address))
            }
            "read-attribute" => Ok(ManagementResponse::success(json!("running"))),
            "composite" => {
                if let Some(description) = &state.commit_failure {
                    return Ok(ManagementResponse::failed(description.clone()));
                }
                let steps = request
                    .operation
                    .get("steps")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();

                let mut resources = state.resources.clone();
                for step in &steps {
                    if let Err(description) = apply(&mut resources, step, &request.attachments) {
                        return Ok(ManagementResponse::failed(description));
                    }
                }
                state.resources = resources;
                state.commits.push(steps);

                let response = ManagementResponse::success(Value::Null);
                Ok(match &state.process_state {
                    Some(process_state) => response.with_process_state(process_state.clone()),
                    None => response,
                })
            }
            other => Ok(ManagementResponse::failed(format!("unsupported operation {other}"))),
        }
    }
}

/// Repository holding a fixed set of artifacts. Content is the checksum's hex
/// text, which the fake management client turns back into the hash.
///
/// Republishing coordinates replaces what they resolve to, while the old
/// checksum stays searchable.
#[derive(Debug, Default)]
pub struct FakeRepository {
    artifacts: Mutex<Vec<Artifact>>,
    history: Mutex<Vec<Artifact>>,
    fetched: Mutex<HashMap<Checksum, usize>>,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a war artifact.
    pub fn publish(&self, group_id: &str, artifact_id: &str, version: &str, checksum: &str) {
        self.publish_artifact(Artifact {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: Version::new(version),
            artifact_type: ArtifactType::War,
            classifier: None,
            checksum: Checksum::new(checksum),
        });
    }

    /// Publishes an artifact, replacing one with the same coordinates.
    pub fn publish_artifact(&self, artifact: Artifact) {
        let mut artifacts = self.artifacts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        artifacts.retain(|a| a.coordinates() != artifact.coordinates());
        artifacts.push(artifact.clone());
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(artifact);
    }

    /// How often content with this checksum was fetched.
    pub fn fetch_count(&self, checksum: &str) -> usize {
        self.fetched
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&Checksum::new(checksum))
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Repository for FakeRepository {
    async fn resolve_artifact(&self, coordinates: &ArtifactCoordinates) -> Result<Option<Artifact>> {
        let artifacts = self.artifacts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(artifacts.iter().find(|a| a.coordinates() == *coordinates).cloned())
    }

    async fn lookup_by_checksum(&self, checksum: &Checksum) -> Result<Artifact> {
        let artifacts = self.history.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        artifacts
            .iter()
            .find(|a| a.checksum == *checksum)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::UnknownChecksum {
                    checksum: checksum.to_string(),
                }
                .into()
            })
    }

    async fn fetch_content(&self, artifact: &Artifact) -> Result<Vec<u8>> {
        *self
            .fetched
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(artifact.checksum.clone())
            .or_default() += 1;
        Ok(artifact.checksum.as_str().as_bytes().to_vec())
    }
}
