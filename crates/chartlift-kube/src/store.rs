//! Access to application resources in the cluster
//!
//! The reconciler only needs three calls: list by label selector, update the
//! object (labels) and update the status subresource.

use std::path::Path;

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams, PostParams};
use kube::config::{Config, KubeConfigOptions, Kubeconfig};
use kube::Client;

use crate::error::Result;
use crate::resources::{object_name, ResourceKind};

/// Cluster operations used by the reconciler
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// List objects of `kind` matching an equality label selector
    async fn list(&self, kind: ResourceKind, selector: &str) -> Result<Vec<DynamicObject>>;

    /// Replace an object; the status subresource is left untouched
    async fn replace(&self, kind: ResourceKind, obj: &DynamicObject) -> Result<DynamicObject>;

    /// Replace the status subresource of an object
    async fn replace_status(&self, kind: ResourceKind, obj: &DynamicObject)
        -> Result<DynamicObject>;
}

/// [`ResourceStore`] backed by the Kubernetes API
pub struct KubeResourceStore {
    client: Client,
}

impl KubeResourceStore {
    /// Connect with an explicit kubeconfig, or the default configuration
    ///
    /// The default configuration is `$KUBECONFIG` / `~/.kube/config`, falling
    /// back to the in-cluster service account.
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self> {
        let client = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)?;
                let config =
                    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
                tracing::debug!(kubeconfig = %path.display(), cluster = %config.cluster_url, "using kubeconfig");
                Client::try_from(config)?
            }
            None => Client::try_default().await?,
        };
        Ok(Self::with_client(client))
    }

    /// Create with an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// API handle for an object, namespaced when the object carries a namespace
    fn api(&self, kind: ResourceKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = kind.api_resource();
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }
}

#[async_trait]
impl ResourceStore for KubeResourceStore {
    async fn list(&self, kind: ResourceKind, selector: &str) -> Result<Vec<DynamicObject>> {
        let lp = ListParams::default().labels(selector);
        let list = self.api(kind, None).list(&lp).await?;
        Ok(list.items)
    }

    async fn replace(&self, kind: ResourceKind, obj: &DynamicObject) -> Result<DynamicObject> {
        let name = object_name(kind, obj)?;
        let api = self.api(kind, obj.metadata.namespace.as_deref());
        Ok(api.replace(&name, &PostParams::default(), obj).await?)
    }

    async fn replace_status(
        &self,
        kind: ResourceKind,
        obj: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = object_name(kind, obj)?;
        let api = self.api(kind, obj.metadata.namespace.as_deref());
        let data = serde_json::to_vec(obj)?;
        Ok(api.replace_status(&name, &PostParams::default(), data).await?)
    }
}
