use std::time::Instant;

use keel_core::{KeelError, KeelResult, ResourceKind};
use keel_engine::CompiledSelector;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::core::DynamicObject;
use kube::Client;
use tracing::{debug, info};

use crate::ClusterClient;

/// [`ClusterClient`] over a live API server.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, kind: ResourceKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = kind.api_resource();
        match namespace {
            Some(ns) if kind.namespaced() => Api::namespaced_with(self.client.clone(), ns, &ar),
            _ => Api::all_with(self.client.clone(), &ar),
        }
    }
}

/// 404 on a named lookup is `NotFound`; anything else is passed through.
pub(crate) fn map_kube_error(
    err: kube::Error,
    kind: ResourceKind,
    name: Option<&str>,
    namespace: Option<&str>,
) -> KeelError {
    match (err, name) {
        (kube::Error::Api(ae), Some(name)) if ae.code == 404 => KeelError::NotFound {
            kind,
            name: name.to_string(),
            namespace: namespace.filter(|_| kind.namespaced()).map(str::to_string),
        },
        (kube::Error::Api(ae), _) => KeelError::RemoteCallFailed(ae.message),
        (other, _) => KeelError::RemoteCallFailed(other.to_string()),
    }
}

#[async_trait::async_trait]
impl ClusterClient for KubeCluster {
    async fn get(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> KeelResult<DynamicObject> {
        let t0 = Instant::now();
        let obj = self
            .api(kind, namespace)
            .get(name)
            .await
            .map_err(|e| map_kube_error(e, kind, Some(name), namespace))?;
        debug!(kind = %kind, name, ns = ?namespace, took_ms = %t0.elapsed().as_millis(), "kube: get ok");
        Ok(obj)
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        selector: Option<&CompiledSelector>,
    ) -> KeelResult<Vec<DynamicObject>> {
        let t0 = Instant::now();
        let mut lp = ListParams::default();
        if let Some(sel) = selector {
            lp = lp.labels(&sel.to_string());
        }
        let list = self
            .api(kind, namespace)
            .list(&lp)
            .await
            .map_err(|e| map_kube_error(e, kind, None, namespace))?;
        info!(kind = %kind, ns = %namespace.unwrap_or("(all)"), selector = ?lp.label_selector, items = list.items.len(), took_ms = %t0.elapsed().as_millis(), "kube: list ok");
        Ok(list.items)
    }

    async fn create(&self, kind: ResourceKind, namespace: Option<&str>, object: DynamicObject) -> KeelResult<DynamicObject> {
        let t0 = Instant::now();
        let created = self
            .api(kind, namespace)
            .create(&PostParams::default(), &object)
            .await
            .map_err(|e| map_kube_error(e, kind, None, namespace))?;
        info!(kind = %kind, name = ?created.metadata.name, ns = ?namespace, took_ms = %t0.elapsed().as_millis(), "kube: create ok");
        Ok(created)
    }

    async fn delete(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> KeelResult<()> {
        let t0 = Instant::now();
        let _ = self
            .api(kind, namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| map_kube_error(e, kind, Some(name), namespace))?;
        info!(kind = %kind, name, ns = ?namespace, took_ms = %t0.elapsed().as_millis(), "kube: delete ok");
        Ok(())
    }
}
