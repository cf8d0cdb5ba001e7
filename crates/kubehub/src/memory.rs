use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use keel_core::{KeelError, KeelResult, ResourceKind};
use keel_engine::CompiledSelector;
use kube::core::DynamicObject;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{to_dynamic, ClusterClient};

/// One recorded call against a [`MemoryCluster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub verb: &'static str,
    pub kind: ResourceKind,
    pub namespace: Option<String>,
    pub name: Option<String>,
}

#[derive(Default)]
struct Inner {
    objects: HashMap<ResourceKind, Vec<DynamicObject>>,
    journal: Vec<Call>,
    fail_next: Option<String>,
}

/// In-memory [`ClusterClient`].
///
/// Keeps insertion order, assigns `generateName` suffixes, evaluates label
/// selectors, journals every call and can be told to fail the next one.
#[derive(Default)]
pub struct MemoryCluster {
    inner: Mutex<Inner>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store an object without going through `create` (not journalled).
    pub fn seed<K: Serialize>(&self, kind: ResourceKind, obj: &K) -> KeelResult<()> {
        let obj = to_dynamic(obj)?;
        self.lock().objects.entry(kind).or_default().push(obj);
        Ok(())
    }

    /// Make the next call fail with `RemoteCallFailed(message)`.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().journal.clone()
    }

    pub fn objects(&self, kind: ResourceKind) -> Vec<DynamicObject> {
        self.lock().objects.get(&kind).cloned().unwrap_or_default()
    }

    fn begin(&self, verb: &'static str, kind: ResourceKind, namespace: Option<&str>, name: Option<&str>) -> KeelResult<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        let namespace = namespace.filter(|_| kind.namespaced()).map(str::to_string);
        inner.journal.push(Call { verb, kind, namespace, name: name.map(str::to_string) });
        if let Some(msg) = inner.fail_next.take() {
            return Err(KeelError::RemoteCallFailed(msg));
        }
        Ok(inner)
    }
}

fn in_scope(obj: &DynamicObject, kind: ResourceKind, namespace: Option<&str>) -> bool {
    match namespace {
        Some(ns) if kind.namespaced() => obj.metadata.namespace.as_deref() == Some(ns),
        _ => true,
    }
}

fn not_found(kind: ResourceKind, name: &str, namespace: Option<&str>) -> KeelError {
    KeelError::NotFound {
        kind,
        name: name.to_string(),
        namespace: namespace.filter(|_| kind.namespaced()).map(str::to_string),
    }
}

#[async_trait::async_trait]
impl ClusterClient for MemoryCluster {
    async fn get(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> KeelResult<DynamicObject> {
        let inner = self.begin("get", kind, namespace, Some(name))?;
        let found = inner
            .objects
            .get(&kind)
            .and_then(|v| v.iter().find(|o| in_scope(o, kind, namespace) && o.metadata.name.as_deref() == Some(name)))
            .cloned();
        found.ok_or_else(|| not_found(kind, name, namespace))
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        selector: Option<&CompiledSelector>,
    ) -> KeelResult<Vec<DynamicObject>> {
        let inner = self.begin("list", kind, namespace, None)?;
        let items: Vec<DynamicObject> = inner
            .objects
            .get(&kind)
            .map(|v| {
                v.iter()
                    .filter(|o| in_scope(o, kind, namespace))
                    .filter(|o| {
                        let labels = o.metadata.labels.clone().unwrap_or_default();
                        selector.map(|s| s.matches(&labels)).unwrap_or(true)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        debug!(kind = %kind, items = items.len(), "memory: list");
        Ok(items)
    }

    async fn create(&self, kind: ResourceKind, namespace: Option<&str>, mut object: DynamicObject) -> KeelResult<DynamicObject> {
        let mut inner = self.begin("create", kind, namespace, object.metadata.name.as_deref())?;
        let name = match (&object.metadata.name, &object.metadata.generate_name) {
            (Some(n), _) => n.clone(),
            (None, Some(prefix)) => format!("{}{}", prefix, &Uuid::new_v4().simple().to_string()[..5]),
            (None, None) => return Err(KeelError::RemoteCallFailed("name or generateName is required".into())),
        };
        if kind.namespaced() {
            object.metadata.namespace = namespace.map(str::to_string).or(object.metadata.namespace);
        }
        let ns = object.metadata.namespace.clone();
        let store = inner.objects.entry(kind).or_default();
        if store.iter().any(|o| o.metadata.name.as_deref() == Some(name.as_str()) && o.metadata.namespace == ns) {
            return Err(KeelError::RemoteCallFailed(format!(
                "{}.shipwright.io \"{}\" already exists",
                kind.noun(),
                name
            )));
        }
        object.metadata.name = Some(name);
        object.metadata.uid = Some(Uuid::new_v4().to_string());
        object.metadata.creation_timestamp = Some(Time(chrono::Utc::now()));
        store.push(object.clone());
        Ok(object)
    }

    async fn delete(&self, kind: ResourceKind, namespace: Option<&str>, name: &str) -> KeelResult<()> {
        let mut inner = self.begin("delete", kind, namespace, Some(name))?;
        let store = inner.objects.entry(kind).or_default();
        let pos = store
            .iter()
            .position(|o| in_scope(o, kind, namespace) && o.metadata.name.as_deref() == Some(name))
            .ok_or_else(|| not_found(kind, name, namespace))?;
        store.remove(pos);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::resources::{Build, BuildSpec};
    use keel_engine::compile_selector;
    use kube::core::ObjectMeta;
    use std::collections::BTreeMap;

    fn build(name: &str, ns: &str, team: &str) -> Build {
        Build {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some(ns.into()),
                labels: Some(BTreeMap::from([("team".to_string(), team.to_string())])),
                ..Default::default()
            },
            spec: BuildSpec::default(),
            status: None,
        }
    }

    fn names(items: &[DynamicObject]) -> Vec<String> {
        items.iter().filter_map(|o| o.metadata.name.clone()).collect()
    }

    #[tokio::test]
    async fn list_scopes_by_namespace_and_selector() {
        let mc = MemoryCluster::new();
        mc.seed(ResourceKind::Build, &build("a", "ci", "payments")).expect("seed");
        mc.seed(ResourceKind::Build, &build("b", "ci", "search")).expect("seed");
        mc.seed(ResourceKind::Build, &build("c", "prod", "payments")).expect("seed");

        let all = mc.list(ResourceKind::Build, None, None).await.expect("list");
        assert_eq!(names(&all), vec!["a", "b", "c"]);
        let ci = mc.list(ResourceKind::Build, Some("ci"), None).await.expect("list");
        assert_eq!(names(&ci), vec!["a", "b"]);
        let sel = compile_selector("team=payments").expect("valid").expect("some");
        let payments = mc.list(ResourceKind::Build, None, Some(&sel)).await.expect("list");
        assert_eq!(names(&payments), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn create_assigns_generated_names_and_rejects_duplicates() {
        let mc = MemoryCluster::new();
        let mut obj = to_dynamic(&build("x", "ci", "t")).expect("dyn");
        obj.metadata.name = None;
        obj.metadata.generate_name = Some("buildrun-".into());
        let created = mc.create(ResourceKind::BuildRun, Some("ci"), obj).await.expect("create");
        let name = created.metadata.name.expect("name");
        assert!(name.starts_with("buildrun-") && name.len() == "buildrun-".len() + 5);
        assert!(created.metadata.creation_timestamp.is_some());

        let named = to_dynamic(&build("fixed", "ci", "t")).expect("dyn");
        mc.create(ResourceKind::Build, Some("ci"), named.clone()).await.expect("first");
        let err = mc.create(ResourceKind::Build, Some("ci"), named).await.unwrap_err();
        assert_eq!(err, KeelError::RemoteCallFailed("build.shipwright.io \"fixed\" already exists".into()));
    }

    #[tokio::test]
    async fn get_and_delete_report_not_found() {
        let mc = MemoryCluster::new();
        mc.seed(ResourceKind::Build, &build("a", "ci", "t")).expect("seed");
        assert!(mc.get(ResourceKind::Build, Some("ci"), "a").await.is_ok());
        assert!(matches!(mc.get(ResourceKind::Build, Some("prod"), "a").await, Err(KeelError::NotFound { .. })));
        mc.delete(ResourceKind::Build, Some("ci"), "a").await.expect("delete");
        assert!(matches!(mc.delete(ResourceKind::Build, Some("ci"), "a").await, Err(KeelError::NotFound { .. })));
        assert_eq!(mc.calls().len(), 4);
    }

    #[tokio::test]
    async fn injected_failure_hits_once() {
        let mc = MemoryCluster::new();
        mc.fail_next("etcdserver: request timed out");
        let err = mc.list(ResourceKind::BuildRun, Some("ci"), None).await.unwrap_err();
        assert_eq!(err, KeelError::RemoteCallFailed("etcdserver: request timed out".into()));
        assert!(mc.list(ResourceKind::BuildRun, Some("ci"), None).await.is_ok());
    }
}
