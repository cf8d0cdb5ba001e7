//! Build construction.

use std::collections::BTreeMap;
use std::time::Duration;

use keel_core::resources::{self, Build, ParamValue};
use keel_core::{KeelError, KeelResult};
use kube::core::ObjectMeta;
use tracing::debug;

use crate::duration::{format_go_duration, parse_timeout};
use crate::requests::{BuildFields, CreateBuildRequest};
use crate::source::{SourceKind, SourceSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Namespaced,
    Cluster,
}

impl StrategyKind {
    /// Absent means `ClusterBuildStrategy`.
    pub fn resolve(raw: Option<&str>) -> KeelResult<Self> {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            None | Some("clusterbuildstrategy") => Ok(StrategyKind::Cluster),
            Some("buildstrategy") => Ok(StrategyKind::Namespaced),
            Some(_) => Err(KeelError::InvalidStrategyKind(raw.unwrap_or_default().to_string())),
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            StrategyKind::Namespaced => "BuildStrategy",
            StrategyKind::Cluster => "ClusterBuildStrategy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyRef {
    pub name: String,
    pub kind: StrategyKind,
}

/// Everything a Build carries except its identity. Also the payload of an
/// inline BuildRun.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildBlueprint {
    pub strategy: StrategyRef,
    pub source: SourceSpec,
    pub output_image: String,
    pub parameters: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl BuildBlueprint {
    /// Assemble strategy, source and output from request fields.
    ///
    /// Required fields are checked in order source url, strategy, output image
    /// and the first missing one is reported.
    pub(crate) fn assemble(fields: &BuildFields, default_source: Option<SourceKind>) -> KeelResult<Self> {
        let url = fields.source_url.as_deref().ok_or_else(|| KeelError::missing("source-url"))?;
        let strategy = fields.strategy.as_deref().ok_or_else(|| KeelError::missing("strategy"))?;
        let output_image = fields.output_image.as_deref().ok_or_else(|| KeelError::missing("output-image"))?;

        let kind = SourceKind::resolve(fields.source_type.as_deref(), default_source)?;
        let strategy_kind = StrategyKind::resolve(fields.strategy_kind.as_deref())?;
        let source = SourceSpec::new(kind, url, fields.context_dir.as_deref(), fields.revision.as_deref());

        Ok(Self {
            strategy: StrategyRef { name: strategy.to_string(), kind: strategy_kind },
            source,
            output_image: output_image.to_string(),
            parameters: Vec::new(),
            timeout: None,
        })
    }

    pub fn to_wire(&self) -> resources::BuildSpec {
        resources::BuildSpec {
            source: Some(self.source.to_wire()),
            strategy: resources::Strategy {
                name: self.strategy.name.clone(),
                kind: Some(self.strategy.kind.wire_name().to_string()),
            },
            param_values: param_values(&self.parameters),
            output: resources::Image { image: self.output_image.clone(), extra: BTreeMap::new() },
            timeout: self.timeout.map(format_go_duration),
            extra: BTreeMap::new(),
        }
    }
}

/// A validated Build, ready for creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDefinition {
    pub name: String,
    pub namespace: String,
    pub blueprint: BuildBlueprint,
}

impl BuildDefinition {
    pub fn to_resource(&self) -> Build {
        Build {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                namespace: Some(self.namespace.clone()),
                ..Default::default()
            },
            spec: self.blueprint.to_wire(),
            status: None,
        }
    }
}

/// Validate a `create_build` request.
///
/// Fail-fast order: name, source url, strategy, output image, source type,
/// strategy kind, timeout.
pub fn build_definition(req: &CreateBuildRequest) -> KeelResult<BuildDefinition> {
    let name = req.name.as_deref().ok_or_else(|| KeelError::missing("name"))?;
    let mut blueprint = BuildBlueprint::assemble(&req.fields, None)?;
    blueprint.timeout = req.timeout.as_deref().map(parse_timeout).transpose()?;
    blueprint.parameters = ordered_parameters(&req.parameters);
    let namespace = crate::namespace_or_default(req.namespace.as_deref());
    debug!(name, namespace = %namespace, strategy = %blueprint.strategy.name, "build definition assembled");
    Ok(BuildDefinition { name: name.to_string(), namespace, blueprint })
}

pub(crate) fn ordered_parameters(params: &BTreeMap<String, String>) -> Vec<(String, String)> {
    params.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

pub(crate) fn param_values(params: &[(String, String)]) -> Vec<ParamValue> {
    params.iter().map(|(k, v)| ParamValue::single(k.clone(), v.clone())).collect()
}
