//! Keel public API façade (in-process).
//!
//! [`Toolbox`] runs one operation per call: validate and build with
//! `keel-engine`, talk to the cluster through a [`ClusterClient`], render the
//! result as text. [`Toolbox::call`] is the name + JSON-argument entry point a
//! transport sits on; the typed methods are what frontends use directly.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use keel_core::{Build, BuildRun, BuildStrategy, ClusterBuildStrategy, KeelError, ResourceKind};
use keel_engine::requests::{decode, CreateBuildRequest, CreateBuildRunRequest, ListClusterRequest, ListRequest, ObjectRequest};
use keel_engine::{build_definition, buildrun_definition, restart_from, ListFilter};
use keel_kubehub::{create_as, get_as, list_as, ClusterClient};
use kube::ResourceExt;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

pub mod render;
pub mod tools;

pub use tools::{catalog, ToolName, ToolSpec};

/// Outcome of [`Toolbox::call`]: rendered text, flagged when it describes a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub text: String,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: false }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: true }
    }
}

/// A failed operation: the underlying error plus the step that was running
/// when a remote call failed (`"list builds"`, `"create new buildrun"`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub action: Option<&'static str>,
    pub error: KeelError,
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&render::error_text(self.action, &self.error))
    }
}

impl std::error::Error for ToolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl ToolError {
    fn at(action: &'static str) -> impl Fn(KeelError) -> ToolError {
        move |error| ToolError { action: Some(action), error }
    }
}

impl From<KeelError> for ToolError {
    fn from(error: KeelError) -> Self {
        ToolError { action: None, error }
    }
}

pub type ToolOutcome = Result<String, ToolError>;

/// Metric label for an error.
fn error_label(e: &KeelError) -> &'static str {
    match e {
        KeelError::MissingRequiredField(_) => "missing_field",
        KeelError::InvalidSourceKind(_) => "invalid_source_kind",
        KeelError::InvalidStrategyKind(_) => "invalid_strategy_kind",
        KeelError::AmbiguousBuildReference => "ambiguous_build_reference",
        KeelError::InvalidDuration { .. } => "invalid_duration",
        KeelError::InvalidSelectorSyntax { .. } => "invalid_selector",
        KeelError::InvalidArguments { .. } => "invalid_arguments",
        KeelError::UnknownTool(_) => "unknown_tool",
        KeelError::NotFound { .. } => "not_found",
        KeelError::RemoteCallFailed(_) => "remote",
    }
}

/// Build, BuildRun and strategy operations over one cluster handle.
#[derive(Clone)]
pub struct Toolbox {
    cluster: Arc<dyn ClusterClient>,
}

impl Toolbox {
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self { cluster }
    }

    fn cluster(&self) -> &dyn ClusterClient {
        self.cluster.as_ref()
    }

    /// Dispatch by tool name. Never fails: errors come back as
    /// `ToolResult { is_error: true }`.
    pub async fn call(&self, tool: &str, args: Value) -> ToolResult {
        let t0 = Instant::now();
        let name = match tool.parse::<ToolName>() {
            Ok(n) => n,
            Err(e) => {
                counter!("keel_tool_errors", 1, "tool" => "unknown", "error" => error_label(&e));
                warn!(tool = %tool, "api: unknown tool");
                return ToolResult::error(e.to_string());
            }
        };
        counter!("keel_tool_calls", 1, "tool" => name.as_str());
        let res = self.dispatch(name, args).await;
        histogram!("keel_tool_latency_ms", t0.elapsed().as_secs_f64() * 1000.0, "tool" => name.as_str());
        match res {
            Ok(text) => {
                info!(tool = %name, took_ms = %t0.elapsed().as_millis(), "api: call ok");
                ToolResult::ok(text)
            }
            Err(e) => {
                counter!("keel_tool_errors", 1, "tool" => name.as_str(), "error" => error_label(&e.error));
                warn!(tool = %name, error = %e, took_ms = %t0.elapsed().as_millis(), "api: call failed");
                ToolResult::error(e.to_string())
            }
        }
    }

    async fn dispatch(&self, name: ToolName, args: Value) -> ToolOutcome {
        let tool = name.as_str();
        match name {
            ToolName::ListBuilds => self.list_builds(&decode(tool, args)?).await,
            ToolName::GetBuild => self.get_build(&decode(tool, args)?).await,
            ToolName::CreateBuild => self.create_build(&decode(tool, args)?).await,
            ToolName::DeleteBuild => self.delete_build(&decode(tool, args)?).await,
            ToolName::ListBuildruns => self.list_buildruns(&decode(tool, args)?).await,
            ToolName::GetBuildrun => self.get_buildrun(&decode(tool, args)?).await,
            ToolName::CreateBuildrun => self.create_buildrun(&decode(tool, args)?).await,
            ToolName::RestartBuildrun => self.restart_buildrun(&decode(tool, args)?).await,
            ToolName::DeleteBuildrun => self.delete_buildrun(&decode(tool, args)?).await,
            ToolName::ListBuildstrategies => self.list_buildstrategies(&decode(tool, args)?).await,
            ToolName::ListClusterbuildstrategies => self.list_clusterbuildstrategies(&decode(tool, args)?).await,
        }
    }

    // ---- builds ----

    pub async fn list_builds(&self, req: &ListRequest) -> ToolOutcome {
        let filter = ListFilter::namespaced(req)?;
        let items: Vec<Build> =
            list_as(self.cluster(), ResourceKind::Build, filter.namespace.as_deref(), filter.selector.as_ref())
                .await
                .map_err(ToolError::at("list builds"))?;
        Ok(render::build_list(&filter.retain_prefixed(items)))
    }

    pub async fn get_build(&self, req: &ObjectRequest) -> ToolOutcome {
        let name = req.require_name()?;
        let ns = req.namespace();
        let build: Build = get_as(self.cluster(), ResourceKind::Build, Some(&ns), name)
            .await
            .map_err(ToolError::at("get build"))?;
        Ok(render::build_detail(&build))
    }

    pub async fn create_build(&self, req: &CreateBuildRequest) -> ToolOutcome {
        let def = build_definition(req)?;
        let created: Build = create_as(self.cluster(), ResourceKind::Build, Some(&def.namespace), &def.to_resource())
            .await
            .map_err(ToolError::at("create build"))?;
        info!(name = %created.name_any(), ns = %def.namespace, strategy = %def.blueprint.strategy.name, "api: build created");
        Ok(format!("Successfully created Build '{}' in namespace '{}'", def.name, def.namespace))
    }

    pub async fn delete_build(&self, req: &ObjectRequest) -> ToolOutcome {
        let name = req.require_name()?;
        let ns = req.namespace();
        self.cluster()
            .delete(ResourceKind::Build, Some(&ns), name)
            .await
            .map_err(ToolError::at("delete build"))?;
        Ok(format!("Successfully deleted Build '{}' from namespace '{}'", name, ns))
    }

    // ---- buildruns ----

    pub async fn list_buildruns(&self, req: &ListRequest) -> ToolOutcome {
        let filter = ListFilter::namespaced(req)?;
        let items: Vec<BuildRun> =
            list_as(self.cluster(), ResourceKind::BuildRun, filter.namespace.as_deref(), filter.selector.as_ref())
                .await
                .map_err(ToolError::at("list buildruns"))?;
        Ok(render::buildrun_list(&filter.retain_prefixed(items)))
    }

    pub async fn get_buildrun(&self, req: &ObjectRequest) -> ToolOutcome {
        let name = req.require_name()?;
        let ns = req.namespace();
        let run: BuildRun = get_as(self.cluster(), ResourceKind::BuildRun, Some(&ns), name)
            .await
            .map_err(ToolError::at("get buildrun"))?;
        Ok(render::buildrun_detail(&run))
    }

    pub async fn create_buildrun(&self, req: &CreateBuildRunRequest) -> ToolOutcome {
        let def = buildrun_definition(req)?;
        let created: BuildRun =
            create_as(self.cluster(), ResourceKind::BuildRun, Some(&def.namespace), &def.to_resource())
                .await
                .map_err(ToolError::at("create buildrun"))?;
        Ok(format!("Successfully created BuildRun '{}' in namespace '{}'", created.name_any(), def.namespace))
    }

    /// Re-submit an existing BuildRun under a generated name.
    pub async fn restart_buildrun(&self, req: &ObjectRequest) -> ToolOutcome {
        let name = req.require_name()?;
        let ns = req.namespace();
        let original: BuildRun = get_as(self.cluster(), ResourceKind::BuildRun, Some(&ns), name)
            .await
            .map_err(ToolError::at("get buildrun"))?;
        let created: BuildRun = create_as(self.cluster(), ResourceKind::BuildRun, Some(&ns), &restart_from(&original))
            .await
            .map_err(ToolError::at("create new buildrun"))?;
        info!(from = %name, to = %created.name_any(), ns = %ns, "api: buildrun restarted");
        Ok(format!("Successfully restarted BuildRun '{}' as '{}' in namespace '{}'", name, created.name_any(), ns))
    }

    pub async fn delete_buildrun(&self, req: &ObjectRequest) -> ToolOutcome {
        let name = req.require_name()?;
        let ns = req.namespace();
        self.cluster()
            .delete(ResourceKind::BuildRun, Some(&ns), name)
            .await
            .map_err(ToolError::at("delete buildrun"))?;
        Ok(format!("Successfully deleted BuildRun '{}' from namespace '{}'", name, ns))
    }

    // ---- strategies ----

    pub async fn list_buildstrategies(&self, req: &ListRequest) -> ToolOutcome {
        let filter = ListFilter::namespaced(req)?;
        let items: Vec<BuildStrategy> = list_as(
            self.cluster(),
            ResourceKind::BuildStrategy,
            filter.namespace.as_deref(),
            filter.selector.as_ref(),
        )
        .await
        .map_err(ToolError::at("list buildstrategies"))?;
        Ok(render::buildstrategy_list(&filter.retain_prefixed(items)))
    }

    pub async fn list_clusterbuildstrategies(&self, req: &ListClusterRequest) -> ToolOutcome {
        let filter = ListFilter::cluster(req)?;
        let items: Vec<ClusterBuildStrategy> =
            list_as(self.cluster(), ResourceKind::ClusterBuildStrategy, None, filter.selector.as_ref())
                .await
                .map_err(ToolError::at("list clusterbuildstrategies"))?;
        Ok(render::clusterbuildstrategy_list(&filter.retain_prefixed(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_kubehub::MemoryCluster;
    use serde_json::json;

    fn toolbox() -> (Arc<MemoryCluster>, Toolbox) {
        let mc = Arc::new(MemoryCluster::new());
        (mc.clone(), Toolbox::new(mc))
    }

    #[test]
    fn tool_result_serializes_is_error_in_camel_case() {
        let v = serde_json::to_value(ToolResult::error("boom")).expect("json");
        assert_eq!(v, json!({ "text": "boom", "isError": true }));
    }

    #[test]
    fn tool_error_display_uses_the_step() {
        let e = ToolError::at("create new buildrun")(KeelError::RemoteCallFailed("quota exceeded".into()));
        assert_eq!(e.to_string(), "Failed to create new buildrun: quota exceeded");
        let e: ToolError = KeelError::AmbiguousBuildReference.into();
        assert_eq!(e.to_string(), KeelError::AmbiguousBuildReference.to_string());
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result() {
        let (mc, tb) = toolbox();
        let res = tb.call("rebuild_everything", json!({})).await;
        assert!(res.is_error);
        assert_eq!(res.text, "unknown tool 'rebuild_everything'");
        assert!(mc.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_arguments_are_rejected_before_any_remote_call() {
        let (mc, tb) = toolbox();
        let res = tb.call("create_build", json!({ "name": 42 })).await;
        assert!(res.is_error);
        assert!(res.text.starts_with("invalid arguments for create_build:"), "{}", res.text);
        assert!(mc.calls().is_empty());
    }

    #[tokio::test]
    async fn null_arguments_count_as_empty() {
        let (_mc, tb) = toolbox();
        let res = tb.call("list_builds", Value::Null).await;
        assert_eq!(res, ToolResult::ok("No builds found"));
    }
}
