//! Shipwright `shipwright.io/v1beta1` resources as they travel over the wire.
//!
//! These mirror the CRD JSON loosely: strings stay strings (`source.type`,
//! `strategy.kind`, `timeout`) and every spec keeps unmodelled fields in an
//! `extra` map so an object read from the cluster can be re-submitted without
//! losing anything. Validation lives in `keel-engine`, not here.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GROUP: &str = "shipwright.io";
pub const VERSION: &str = "v1beta1";

/// Wire value of `source.type` for git sources.
pub const SOURCE_TYPE_GIT: &str = "Git";
/// Wire value of `source.type` for OCI artifact sources.
pub const SOURCE_TYPE_OCI: &str = "OCI";

// ---- Build ----

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "shipwright.io",
    version = "v1beta1",
    kind = "Build",
    plural = "builds",
    namespaced,
    schema = "disabled",
    status = "BuildStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct BuildSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    pub strategy: Strategy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub param_values: Vec<ParamValue>,
    pub output: Image,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<Git>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oci_artifact: Option<OciArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_dir: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Git {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OciArtifact {
    pub image: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub image: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A parameter value. Only the single-string form is modelled; `values`,
/// `secretValue` and `configMapValue` ride along in `extra`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParamValue {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ParamValue {
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: Some(value.into()), extra: BTreeMap::new() }
    }
}

// ---- BuildRun ----

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "shipwright.io",
    version = "v1beta1",
    kind = "BuildRun",
    plural = "buildruns",
    namespaced,
    schema = "disabled",
    status = "BuildRunStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct BuildRunSpec {
    pub build: ReferencedBuild,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub param_values: Vec<ParamValue>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Either a reference to a Build by name or an embedded Build spec.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferencedBuild {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Box<BuildSpec>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildRunStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_run_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Time>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<Time>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_details: Option<FailureDetails>,
}

impl BuildRunStatus {
    /// The `Succeeded` condition, if the controller has reported one.
    pub fn succeeded(&self) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == CONDITION_SUCCEEDED)
    }
}

pub const CONDITION_SUCCEEDED: &str = "Succeeded";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailureDetails {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<FailureLocation>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailureLocation {
    #[serde(default)]
    pub pod: String,
    #[serde(default)]
    pub container: String,
}

// ---- Strategies (read-only catalogs) ----

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "shipwright.io",
    version = "v1beta1",
    kind = "BuildStrategy",
    plural = "buildstrategies",
    namespaced,
    schema = "disabled",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct BuildStrategySpec {
    #[serde(default)]
    pub steps: Vec<Value>,
    #[serde(default)]
    pub parameters: Vec<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "shipwright.io",
    version = "v1beta1",
    kind = "ClusterBuildStrategy",
    plural = "clusterbuildstrategies",
    schema = "disabled",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBuildStrategySpec {
    #[serde(default)]
    pub steps: Vec<Value>,
    #[serde(default)]
    pub parameters: Vec<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buildrun_keeps_unmodelled_spec_fields() {
        let raw = serde_json::json!({
            "apiVersion": "shipwright.io/v1beta1",
            "kind": "BuildRun",
            "metadata": { "name": "r1", "namespace": "ci" },
            "spec": {
                "build": { "name": "app" },
                "serviceAccount": "pipeline",
                "retention": { "ttlAfterSucceeded": "10m" }
            },
            "status": {
                "conditions": [{ "type": "Succeeded", "status": "False", "reason": "Failed" }]
            }
        });
        let br: BuildRun = serde_json::from_value(raw).expect("parse");
        assert_eq!(br.spec.build.name.as_deref(), Some("app"));
        assert_eq!(br.spec.service_account.as_deref(), Some("pipeline"));
        assert!(br.spec.extra.contains_key("retention"));
        let cond = br.status.as_ref().and_then(|s| s.succeeded()).expect("condition");
        assert_eq!(cond.status, "False");

        let back = serde_json::to_value(&br).expect("serialize");
        assert_eq!(back["spec"]["retention"]["ttlAfterSucceeded"], "10m");
        assert_eq!(back["kind"], "BuildRun");
    }

    #[test]
    fn build_source_serializes_wire_names() {
        let spec = BuildSpec {
            source: Some(Source {
                source_type: SOURCE_TYPE_OCI.into(),
                oci_artifact: Some(OciArtifact { image: "ghcr.io/acme/src:1".into(), ..Default::default() }),
                context_dir: Some("app".into()),
                ..Default::default()
            }),
            strategy: Strategy { name: "buildah".into(), kind: Some("ClusterBuildStrategy".into()) },
            output: Image { image: "registry/app:latest".into(), ..Default::default() },
            ..Default::default()
        };
        let v = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(v["source"]["type"], "OCI");
        assert_eq!(v["source"]["ociArtifact"]["image"], "ghcr.io/acme/src:1");
        assert_eq!(v["source"]["contextDir"], "app");
        assert!(v.get("paramValues").is_none());
        assert!(v.get("timeout").is_none());
    }
}
