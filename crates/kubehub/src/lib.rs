//! Keel kubehub – the cluster client seam.
//!
//! [`ClusterClient`] is the only way the rest of the workspace talks to a
//! cluster. [`KubeCluster`] backs it with kube-rs; [`MemoryCluster`] keeps
//! objects in memory for tests and dry runs.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use keel_core::{KeelError, KeelResult, ResourceKind};
use keel_engine::CompiledSelector;
use kube::core::DynamicObject;
use kube::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

mod kube_cluster;
mod memory;

pub use kube_cluster::KubeCluster;
pub use memory::{Call, MemoryCluster};

/// Get/List/Create/Delete over the Shipwright kinds.
///
/// `namespace` is ignored for cluster-scoped kinds. `get` and `delete` report a
/// missing object as [`KeelError::NotFound`]; every other failure is
/// [`KeelError::RemoteCallFailed`] carrying the server's message.
#[async_trait::async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> KeelResult<DynamicObject>;

    /// Items come back in server order. `namespace: None` lists all namespaces.
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        selector: Option<&CompiledSelector>,
    ) -> KeelResult<Vec<DynamicObject>>;

    async fn create(&self, kind: ResourceKind, namespace: Option<&str>, object: DynamicObject) -> KeelResult<DynamicObject>;

    async fn delete(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> KeelResult<()>;
}

/// Build a kube client: the named kubeconfig context when given, otherwise the
/// in-cluster config with kubeconfig fallback.
pub async fn connect(context: Option<&str>) -> Result<Client> {
    let client = match context {
        Some(ctx) => {
            let opts = kube::config::KubeConfigOptions { context: Some(ctx.to_string()), ..Default::default() };
            let config = kube::Config::from_kubeconfig(&opts)
                .await
                .with_context(|| format!("loading kubeconfig context '{}'", ctx))?;
            Client::try_from(config).context("building kube client")?
        }
        None => Client::try_default().await.context("inferring kube config (in-cluster, then kubeconfig)")?,
    };
    info!(context = ?context, ns = %client.default_namespace(), "kube client ready");
    Ok(client)
}

// ---- typed helpers ----

pub fn to_dynamic<K: Serialize>(obj: &K) -> KeelResult<DynamicObject> {
    serde_json::to_value(obj)
        .and_then(serde_json::from_value)
        .map_err(|e| KeelError::RemoteCallFailed(format!("encoding object: {}", e)))
}

pub fn from_dynamic<K: DeserializeOwned>(kind: ResourceKind, obj: DynamicObject) -> KeelResult<K> {
    serde_json::to_value(obj)
        .and_then(serde_json::from_value)
        .map_err(|e| KeelError::RemoteCallFailed(format!("decoding {}: {}", kind, e)))
}

pub async fn get_as<K: DeserializeOwned>(
    cluster: &dyn ClusterClient,
    kind: ResourceKind,
    namespace: Option<&str>,
    name: &str,
) -> KeelResult<K> {
    from_dynamic(kind, cluster.get(kind, namespace, name).await?)
}

pub async fn list_as<K: DeserializeOwned>(
    cluster: &dyn ClusterClient,
    kind: ResourceKind,
    namespace: Option<&str>,
    selector: Option<&CompiledSelector>,
) -> KeelResult<Vec<K>> {
    cluster
        .list(kind, namespace, selector)
        .await?
        .into_iter()
        .map(|o| from_dynamic(kind, o))
        .collect()
}

pub async fn create_as<K: Serialize + DeserializeOwned>(
    cluster: &dyn ClusterClient,
    kind: ResourceKind,
    namespace: Option<&str>,
    obj: &K,
) -> KeelResult<K> {
    let created = cluster.create(kind, namespace, to_dynamic(obj)?).await?;
    from_dynamic(kind, created)
}
