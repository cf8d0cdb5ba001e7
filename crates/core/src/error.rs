use serde::{Deserialize, Serialize};

use crate::ResourceKind;

/// Every way a request can be refused or fail.
///
/// Validation variants are raised before any remote call is made. `NotFound` is
/// kept apart from `RemoteCallFailed` so callers can tell "does not exist" from
/// a transient failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum KeelError {
    #[error("{0} is required")]
    MissingRequiredField(String),
    #[error("source type must be 'Git' or 'OCI' (got '{0}')")]
    InvalidSourceKind(String),
    #[error("strategy kind must be 'BuildStrategy' or 'ClusterBuildStrategy' (got '{0}')")]
    InvalidStrategyKind(String),
    #[error("either build-name or inline build spec (strategy, source-url, output-image) must be provided")]
    AmbiguousBuildReference,
    #[error("invalid timeout duration '{text}': {reason}")]
    InvalidDuration { text: String, reason: String },
    #[error("invalid label selector '{expression}': {reason}")]
    InvalidSelectorSyntax { expression: String, reason: String },
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("{}", not_found_message(*kind, name, namespace.as_deref()))]
    NotFound { kind: ResourceKind, name: String, namespace: Option<String> },
    #[error("{0}")]
    RemoteCallFailed(String),
}

pub type KeelResult<T> = Result<T, KeelError>;

impl KeelError {
    pub fn missing(field: &str) -> Self {
        KeelError::MissingRequiredField(field.to_string())
    }

    /// True for errors detected locally, before talking to the cluster.
    pub fn is_validation(&self) -> bool {
        !matches!(self, KeelError::NotFound { .. } | KeelError::RemoteCallFailed(_))
    }
}

fn not_found_message(kind: ResourceKind, name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) => format!("{} '{}' not found in namespace '{}'", kind, name, ns),
        None => format!("{} '{}' not found", kind, name),
    }
}
