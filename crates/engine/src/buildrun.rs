//! BuildRun construction: by reference to an existing Build or with an inline spec.

use std::time::Duration;

use keel_core::resources::{BuildRun, BuildRunSpec, ReferencedBuild};
use keel_core::{KeelError, KeelResult};
use kube::core::ObjectMeta;
use tracing::debug;

use crate::build::{ordered_parameters, param_values, BuildBlueprint};
use crate::duration::{format_go_duration, parse_timeout};
use crate::requests::CreateBuildRunRequest;
use crate::source::SourceKind;

/// Prefix for server-generated BuildRun names.
pub const GENERATED_NAME_PREFIX: &str = "buildrun-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunIdentity {
    Named(String),
    /// `metadata.generateName`; the cluster appends a random suffix.
    Generated(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildReference {
    Existing(String),
    Inline(Box<BuildBlueprint>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRunDefinition {
    pub identity: RunIdentity,
    pub namespace: String,
    pub reference: BuildReference,
    pub service_account: Option<String>,
    pub parameters: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl BuildRunDefinition {
    pub fn to_resource(&self) -> BuildRun {
        let (name, generate_name) = match &self.identity {
            RunIdentity::Named(n) => (Some(n.clone()), None),
            RunIdentity::Generated(p) => (None, Some(p.clone())),
        };
        let build = match &self.reference {
            BuildReference::Existing(name) => ReferencedBuild { name: Some(name.clone()), spec: None },
            BuildReference::Inline(bp) => ReferencedBuild { name: None, spec: Some(Box::new(bp.to_wire())) },
        };
        BuildRun {
            metadata: ObjectMeta {
                name,
                generate_name,
                namespace: Some(self.namespace.clone()),
                ..Default::default()
            },
            spec: BuildRunSpec {
                build,
                service_account: self.service_account.clone(),
                timeout: self.timeout.map(format_go_duration),
                param_values: param_values(&self.parameters),
                ..Default::default()
            },
            status: None,
        }
    }
}

/// Validate a `create_buildrun` request.
///
/// A request with neither a build name nor a strategy is refused before
/// anything else is looked at. With a build name the run references that Build
/// and inline fields are ignored; otherwise the inline spec needs a source url
/// and an output image, and the source type defaults to Git.
pub fn buildrun_definition(req: &CreateBuildRunRequest) -> KeelResult<BuildRunDefinition> {
    if req.build_name.is_none() && req.fields.strategy.is_none() {
        return Err(KeelError::AmbiguousBuildReference);
    }

    let identity = match &req.name {
        Some(n) => RunIdentity::Named(n.clone()),
        None => RunIdentity::Generated(GENERATED_NAME_PREFIX.to_string()),
    };
    let timeout = req.timeout.as_deref().map(parse_timeout).transpose()?;

    let reference = match &req.build_name {
        Some(build) => BuildReference::Existing(build.clone()),
        None => BuildReference::Inline(Box::new(BuildBlueprint::assemble(&req.fields, Some(SourceKind::Git))?)),
    };

    let namespace = crate::namespace_or_default(req.namespace.as_deref());
    debug!(namespace = %namespace, inline = matches!(reference, BuildReference::Inline(_)), "buildrun definition assembled");
    Ok(BuildRunDefinition {
        identity,
        namespace,
        reference,
        service_account: req.service_account.clone(),
        parameters: ordered_parameters(&req.parameters),
        timeout,
    })
}
