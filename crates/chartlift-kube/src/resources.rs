//! KubeSphere application resources
//!
//! Applications and their versions are custom resources with no Rust types,
//! so they are handled as [`DynamicObject`]s and mutated by JSON path.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{SecondsFormat, Utc};
use kube::api::DynamicObject;
use kube::core::GroupVersionKind;
use kube::discovery::ApiResource;
use serde_json::{Map, Value};

use crate::error::{KubeError, Result};

/// API group of the application resources
pub const API_GROUP: &str = "application.kubesphere.io";

/// API version of the application resources
pub const API_VERSION: &str = "v2";

/// Label holding an application's category
pub const CATEGORY_LABEL: &str = "application.kubesphere.io/app-category-name";

/// Label listing an application in the app store
pub const APP_STORE_LABEL: &str = "application.kubesphere.io/app-store";

/// Label linking a version to its application
pub const APP_ID_LABEL: &str = "application.kubesphere.io/app-id";

/// Category given to applications once published
pub const UNCATEGORIZED: &str = "kubesphere-app-uncategorized";

/// User recorded as the publisher of imported versions
pub const PUBLISHER: &str = "admin";

/// Application resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Application,
    ApplicationVersion,
}

impl ResourceKind {
    pub fn kind(self) -> &'static str {
        match self {
            ResourceKind::Application => "Application",
            ResourceKind::ApplicationVersion => "ApplicationVersion",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            ResourceKind::Application => "applications",
            ResourceKind::ApplicationVersion => "applicationversions",
        }
    }

    /// API resource used to build dynamic clients
    pub fn api_resource(self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(API_GROUP, API_VERSION, self.kind());
        ApiResource::from_gvk_with_plural(&gvk, self.plural())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Equality label selector `key=value`
pub fn label_selector(key: &str, value: &str) -> String {
    format!("{}={}", key, value)
}

/// Current UTC time as RFC 3339 with second precision
pub fn rfc3339_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Name of an object, required for every update
pub fn object_name(kind: ResourceKind, obj: &DynamicObject) -> Result<String> {
    obj.metadata
        .name
        .clone()
        .ok_or_else(|| KubeError::InvalidObject {
            kind: kind.to_string(),
            message: "metadata.name is missing".to_string(),
        })
}

/// Set or overwrite one label
pub fn set_label(obj: &mut DynamicObject, key: &str, value: &str) {
    obj.metadata
        .labels
        .get_or_insert_with(BTreeMap::new)
        .insert(key.to_string(), value.to_string());
}

/// Set `value` at `path`, creating intermediate objects
///
/// Missing or null intermediates become empty objects. Any other
/// non-object intermediate is an error.
pub fn set_nested_field(target: &mut Value, value: Value, path: &[&str]) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        return Err(KubeError::InvalidObject {
            kind: "object".to_string(),
            message: "empty field path".to_string(),
        });
    };

    let mut current = target;
    for (depth, segment) in parents.iter().enumerate() {
        current = as_object(current, &path[..depth])?
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    as_object(current, parents)?.insert(last.to_string(), value);
    Ok(())
}

fn as_object<'a>(value: &'a mut Value, path: &[&str]) -> Result<&'a mut Map<String, Value>> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => Ok(map),
        other => Err(KubeError::InvalidObject {
            kind: "object".to_string(),
            message: format!(
                "field '{}' is {} instead of an object",
                if path.is_empty() { ".".to_string() } else { path.join(".") },
                json_type(other)
            ),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
