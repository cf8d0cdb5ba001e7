//! Keel core types: Shipwright resources, resource kinds and errors.

#![forbid(unsafe_code)]

use kube::core::ApiResource;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod resources;

pub use error::{KeelError, KeelResult};
pub use resources::{Build, BuildRun, BuildStrategy, ClusterBuildStrategy};

/// Namespace used when a request leaves it empty.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Annotation written by `kubectl apply`; never carried over to a cloned object.
pub const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

pub mod prelude {
    pub use super::{
        Build, BuildRun, BuildStrategy, ClusterBuildStrategy, KeelError, KeelResult, ResourceKind,
        DEFAULT_NAMESPACE, LAST_APPLIED_ANNOTATION,
    };
}

/// The Shipwright kinds this workspace knows how to talk to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Build,
    BuildRun,
    BuildStrategy,
    ClusterBuildStrategy,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Build,
        ResourceKind::BuildRun,
        ResourceKind::BuildStrategy,
        ResourceKind::ClusterBuildStrategy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Build => "Build",
            ResourceKind::BuildRun => "BuildRun",
            ResourceKind::BuildStrategy => "BuildStrategy",
            ResourceKind::ClusterBuildStrategy => "ClusterBuildStrategy",
        }
    }

    /// Lowercase noun used in rendered messages ("Found 2 build(s)").
    pub fn noun(&self) -> &'static str {
        match self {
            ResourceKind::Build => "build",
            ResourceKind::BuildRun => "buildrun",
            ResourceKind::BuildStrategy => "buildstrategy",
            ResourceKind::ClusterBuildStrategy => "clusterbuildstrategy",
        }
    }

    pub fn namespaced(&self) -> bool {
        !matches!(self, ResourceKind::ClusterBuildStrategy)
    }

    /// Erased API resource (group/version/plural) for dynamic clients.
    pub fn api_resource(&self) -> ApiResource {
        match self {
            ResourceKind::Build => ApiResource::erase::<Build>(&()),
            ResourceKind::BuildRun => ApiResource::erase::<BuildRun>(&()),
            ResourceKind::BuildStrategy => ApiResource::erase::<BuildStrategy>(&()),
            ResourceKind::ClusterBuildStrategy => ApiResource::erase::<ClusterBuildStrategy>(&()),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_resources_point_at_shipwright_v1beta1() {
        let ar = ResourceKind::BuildRun.api_resource();
        assert_eq!(ar.group, "shipwright.io");
        assert_eq!(ar.version, "v1beta1");
        assert_eq!(ar.kind, "BuildRun");
        assert_eq!(ar.plural, "buildruns");
        assert_eq!(ResourceKind::ClusterBuildStrategy.api_resource().plural, "clusterbuildstrategies");
    }

    #[test]
    fn only_cluster_strategies_are_cluster_scoped() {
        let cluster: Vec<_> = ResourceKind::ALL.iter().filter(|k| !k.namespaced()).collect();
        assert_eq!(cluster, vec![&ResourceKind::ClusterBuildStrategy]);
    }
}
