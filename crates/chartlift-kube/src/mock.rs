//! In-memory resource store for testing
//!
//! Mimics the API server closely enough for the reconciler: label selector
//! matching on list, object updates that keep the stored status, and status
//! updates that only touch `status`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use kube::api::DynamicObject;
use serde_json::Value;

use crate::error::{KubeError, Result};
use crate::resources::{object_name, ResourceKind};
use crate::store::ResourceStore;

/// Store operations, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    List,
    Replace,
    ReplaceStatus,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub lists: usize,
    pub replaces: usize,
    pub status_replaces: usize,
}

/// In-memory resource store
#[derive(Clone, Default)]
pub struct MockResourceStore {
    /// Objects per kind, in insertion order
    objects: Arc<RwLock<HashMap<ResourceKind, Vec<DynamicObject>>>>,
    operations: Arc<RwLock<OperationCounts>>,
    /// (operation, kind, object name); list failures use an empty name
    failures: Arc<RwLock<HashSet<(MockOperation, ResourceKind, String)>>>,
}

impl MockResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an object of `kind` with the given labels
    pub fn object(kind: ResourceKind, name: &str, labels: &[(&str, &str)]) -> DynamicObject {
        let mut obj = DynamicObject::new(name, &kind.api_resource());
        obj.metadata.labels = Some(
            labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        );
        obj
    }

    /// Add an object
    pub fn insert(&self, kind: ResourceKind, obj: DynamicObject) {
        self.objects
            .write()
            .unwrap()
            .entry(kind)
            .or_default()
            .push(obj);
    }

    /// Add an object built by [`MockResourceStore::object`]
    pub fn with_object(self, kind: ResourceKind, name: &str, labels: &[(&str, &str)]) -> Self {
        self.insert(kind, Self::object(kind, name, labels));
        self
    }

    /// Fail every `operation` on the named object (or every list of `kind`)
    pub fn fail(&self, operation: MockOperation, kind: ResourceKind, name: &str) {
        self.failures
            .write()
            .unwrap()
            .insert((operation, kind, name.to_string()));
    }

    /// Remove every injected failure
    pub fn clear_failures(&self) {
        self.failures.write().unwrap().clear();
    }

    /// Get a stored object
    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<DynamicObject> {
        self.objects
            .read()
            .unwrap()
            .get(&kind)
            .and_then(|objs| objs.iter().find(|o| o.metadata.name.as_deref() == Some(name)))
            .cloned()
    }

    /// Label value of a stored object
    pub fn label(&self, kind: ResourceKind, name: &str, key: &str) -> Option<String> {
        self.get(kind, name)
            .and_then(|o| o.metadata.labels)
            .and_then(|labels| labels.get(key).cloned())
    }

    /// Status of a stored object
    pub fn status(&self, kind: ResourceKind, name: &str) -> Value {
        self.get(kind, name)
            .map(|o| o.data["status"].clone())
            .unwrap_or(Value::Null)
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        *self.operations.write().unwrap() = OperationCounts::default();
    }

    fn check_failure(&self, operation: MockOperation, kind: ResourceKind, name: &str) -> Result<()> {
        if self
            .failures
            .read()
            .unwrap()
            .contains(&(operation, kind, name.to_string()))
        {
            return Err(api_error(500, format!("injected {:?} failure on {}", operation, kind)));
        }
        Ok(())
    }

    /// Store `obj` in place of the object with the same name
    fn update(
        &self,
        kind: ResourceKind,
        obj: &DynamicObject,
        merge: impl FnOnce(&mut DynamicObject, &DynamicObject),
    ) -> Result<DynamicObject> {
        let name = object_name(kind, obj)?;
        let mut objects = self.objects.write().unwrap();
        let stored = objects
            .get_mut(&kind)
            .and_then(|objs| objs.iter_mut().find(|o| o.metadata.name.as_deref() == Some(&*name)))
            .ok_or_else(|| api_error(404, format!("{} \"{}\" not found", kind.plural(), name)))?;
        merge(stored, obj);
        Ok(stored.clone())
    }
}

#[async_trait]
impl ResourceStore for MockResourceStore {
    async fn list(&self, kind: ResourceKind, selector: &str) -> Result<Vec<DynamicObject>> {
        self.operations.write().unwrap().lists += 1;
        self.check_failure(MockOperation::List, kind, "")?;

        let required = parse_selector(selector);
        let objects = self.objects.read().unwrap();
        Ok(objects
            .get(&kind)
            .map(|objs| {
                objs.iter()
                    .filter(|o| matches_labels(o, &required))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace(&self, kind: ResourceKind, obj: &DynamicObject) -> Result<DynamicObject> {
        self.operations.write().unwrap().replaces += 1;
        self.check_failure(MockOperation::Replace, kind, &object_name(kind, obj)?)?;

        self.update(kind, obj, |stored, new| {
            let status = stored.data.get("status").cloned();
            *stored = new.clone();
            match status {
                Some(status) => set_status(stored, status),
                None => remove_status(stored),
            }
        })
    }

    async fn replace_status(
        &self,
        kind: ResourceKind,
        obj: &DynamicObject,
    ) -> Result<DynamicObject> {
        self.operations.write().unwrap().status_replaces += 1;
        self.check_failure(MockOperation::ReplaceStatus, kind, &object_name(kind, obj)?)?;

        self.update(kind, obj, |stored, new| match new.data.get("status") {
            Some(status) => set_status(stored, status.clone()),
            None => remove_status(stored),
        })
    }
}

fn set_status(obj: &mut DynamicObject, status: Value) {
    if !obj.data.is_object() {
        obj.data = Value::Object(Default::default());
    }
    if let Value::Object(map) = &mut obj.data {
        map.insert("status".to_string(), status);
    }
}

fn remove_status(obj: &mut DynamicObject) {
    if let Value::Object(map) = &mut obj.data {
        map.remove("status");
    }
}

/// Parse `k=v,k2=v2` into pairs
fn parse_selector(selector: &str) -> Vec<(String, String)> {
    selector
        .split(',')
        .filter(|term| !term.trim().is_empty())
        .filter_map(|term| term.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

fn matches_labels(obj: &DynamicObject, required: &[(String, String)]) -> bool {
    let labels = obj.metadata.labels.as_ref();
    required.iter().all(|(k, v)| {
        labels
            .and_then(|l| l.get(k))
            .map(|actual| actual == v)
            .unwrap_or(false)
    })
}

fn api_error(code: u16, message: String) -> KubeError {
    KubeError::Api(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: if code == 404 { "NotFound" } else { "InternalError" }.to_string(),
        code,
    }))
}
