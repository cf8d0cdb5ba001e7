//! Restarting a BuildRun means submitting a fresh copy of it.

use keel_core::resources::BuildRun;
use keel_core::LAST_APPLIED_ANNOTATION;
use kube::core::ObjectMeta;
use kube::ResourceExt;

/// Suffix appended to the original name to form the clone's `generateName`.
pub const RESTART_SUFFIX: &str = "-restart-";

/// Clone `original` into a new, unsubmitted BuildRun.
///
/// Spec, labels and annotations are copied by value; the last-applied
/// snapshot annotation is dropped. Status is ignored, so runs that succeeded,
/// failed or are still running can all be restarted.
pub fn restart_from(original: &BuildRun) -> BuildRun {
    let mut annotations = original.metadata.annotations.clone();
    if let Some(a) = annotations.as_mut() {
        a.remove(LAST_APPLIED_ANNOTATION);
    }
    BuildRun {
        metadata: ObjectMeta {
            generate_name: Some(format!("{}{}", original.name_any(), RESTART_SUFFIX)),
            namespace: original.metadata.namespace.clone(),
            labels: original.metadata.labels.clone(),
            annotations,
            ..Default::default()
        },
        spec: original.spec.clone(),
        status: None,
    }
}
