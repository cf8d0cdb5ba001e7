//! List filtering shared by every list operation.

use keel_core::KeelResult;
use kube::ResourceExt;

use crate::requests::{ListClusterRequest, ListRequest};
use crate::selector::{compile_selector, CompiledSelector};

/// Namespace scope and selector go to the cluster; the name prefix is applied
/// here, after the items come back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// `None` lists across all namespaces (and is the only option for
    /// cluster-scoped kinds).
    pub namespace: Option<String>,
    pub name_prefix: Option<String>,
    pub selector: Option<CompiledSelector>,
}

impl ListFilter {
    pub fn namespaced(req: &ListRequest) -> KeelResult<Self> {
        Ok(Self {
            namespace: req.namespace.clone(),
            name_prefix: req.prefix.clone(),
            selector: compile(req.label_selector.as_deref())?,
        })
    }

    pub fn cluster(req: &ListClusterRequest) -> KeelResult<Self> {
        Ok(Self {
            namespace: None,
            name_prefix: req.prefix.clone(),
            selector: compile(req.label_selector.as_deref())?,
        })
    }

    /// Keep items whose name starts with the prefix, in the order given.
    pub fn retain_prefixed<K: ResourceExt>(&self, items: Vec<K>) -> Vec<K> {
        match self.name_prefix.as_deref() {
            None => items,
            Some(prefix) => items.into_iter().filter(|o| o.name_any().starts_with(prefix)).collect(),
        }
    }
}

fn compile(expr: Option<&str>) -> KeelResult<Option<CompiledSelector>> {
    match expr {
        Some(e) => compile_selector(e),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::resources::{Build, BuildSpec};
    use keel_core::KeelError;
    use kube::core::ObjectMeta;

    fn build(name: &str) -> Build {
        Build {
            metadata: ObjectMeta { name: Some(name.into()), ..Default::default() },
            spec: BuildSpec::default(),
            status: None,
        }
    }

    #[test]
    fn prefix_preserves_order() {
        let filter = ListFilter { name_prefix: Some("app-".into()), ..Default::default() };
        let items = vec![build("app-b"), build("web"), build("app-a"), build("apps"), build("app-c")];
        let names: Vec<_> = filter.retain_prefixed(items).iter().map(|b| b.name_any()).collect();
        assert_eq!(names, vec!["app-b", "app-a", "app-c"]);
    }

    #[test]
    fn no_prefix_keeps_everything() {
        let filter = ListFilter::default();
        assert_eq!(filter.retain_prefixed(vec![build("a"), build("b")]).len(), 2);
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let filter = ListFilter { name_prefix: Some("zzz".into()), ..Default::default() };
        assert!(filter.retain_prefixed(vec![build("a")]).is_empty());
    }

    #[test]
    fn selector_is_compiled_up_front() {
        let req = ListRequest { label_selector: Some("team=payments".into()), ..Default::default() };
        let filter = ListFilter::namespaced(&req).expect("valid");
        assert_eq!(filter.selector.map(|s| s.to_string()).as_deref(), Some("team=payments"));

        let req = ListClusterRequest { label_selector: Some("team in (".into()), ..Default::default() };
        assert!(matches!(ListFilter::cluster(&req), Err(KeelError::InvalidSelectorSyntax { .. })));
    }
}
