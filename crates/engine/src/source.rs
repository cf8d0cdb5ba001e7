//! Source descriptors: where a build gets its input from.

use std::collections::BTreeMap;

use keel_core::resources::{self, SOURCE_TYPE_GIT, SOURCE_TYPE_OCI};
use keel_core::{KeelError, KeelResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Git,
    OciArtifact,
}

impl SourceKind {
    /// Normalize a user-supplied source type.
    ///
    /// An absent value resolves to `default` when one is given (BuildRun inline
    /// specs default to Git) and is rejected otherwise (Build creation).
    pub fn resolve(raw: Option<&str>, default: Option<SourceKind>) -> KeelResult<Self> {
        let Some(raw) = raw else {
            return default.ok_or_else(|| KeelError::InvalidSourceKind(String::new()));
        };
        match raw.to_ascii_lowercase().as_str() {
            "git" => Ok(SourceKind::Git),
            "oci" | "ociartifact" | "oci-artifact" => Ok(SourceKind::OciArtifact),
            _ => Err(KeelError::InvalidSourceKind(raw.to_string())),
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            SourceKind::Git => SOURCE_TYPE_GIT,
            SourceKind::OciArtifact => SOURCE_TYPE_OCI,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Git { url: String, revision: Option<String> },
    OciArtifact { image: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub location: SourceLocation,
    pub context_dir: Option<String>,
}

impl SourceSpec {
    /// `revision` only applies to git; it is dropped for OCI artifacts.
    pub fn new(kind: SourceKind, url: &str, context_dir: Option<&str>, revision: Option<&str>) -> Self {
        let location = match kind {
            SourceKind::Git => SourceLocation::Git {
                url: url.to_string(),
                revision: revision.filter(|r| !r.is_empty()).map(str::to_string),
            },
            SourceKind::OciArtifact => SourceLocation::OciArtifact { image: url.to_string() },
        };
        let context_dir = context_dir.filter(|c| !c.is_empty()).map(str::to_string);
        Self { location, context_dir }
    }

    pub fn kind(&self) -> SourceKind {
        match self.location {
            SourceLocation::Git { .. } => SourceKind::Git,
            SourceLocation::OciArtifact { .. } => SourceKind::OciArtifact,
        }
    }

    pub fn url(&self) -> &str {
        match &self.location {
            SourceLocation::Git { url, .. } => url,
            SourceLocation::OciArtifact { image } => image,
        }
    }

    pub fn to_wire(&self) -> resources::Source {
        let mut source = resources::Source {
            source_type: self.kind().wire_name().to_string(),
            context_dir: self.context_dir.clone(),
            ..Default::default()
        };
        match &self.location {
            SourceLocation::Git { url, revision } => {
                source.git = Some(resources::Git { url: url.clone(), revision: revision.clone(), extra: BTreeMap::new() });
            }
            SourceLocation::OciArtifact { image } => {
                source.oci_artifact = Some(resources::OciArtifact { image: image.clone(), extra: BTreeMap::new() });
            }
        }
        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_kinds_case_insensitively() {
        assert_eq!(SourceKind::resolve(Some("Git"), None), Ok(SourceKind::Git));
        assert_eq!(SourceKind::resolve(Some("git"), None), Ok(SourceKind::Git));
        assert_eq!(SourceKind::resolve(Some("OCI"), None), Ok(SourceKind::OciArtifact));
        assert_eq!(SourceKind::resolve(Some("OCIArtifact"), None), Ok(SourceKind::OciArtifact));
        assert_eq!(SourceKind::resolve(Some("Local"), None), Err(KeelError::InvalidSourceKind("Local".into())));
    }

    #[test]
    fn absent_kind_needs_a_default() {
        assert_eq!(SourceKind::resolve(None, None), Err(KeelError::InvalidSourceKind(String::new())));
        assert_eq!(SourceKind::resolve(None, Some(SourceKind::Git)), Ok(SourceKind::Git));
    }

    #[test]
    fn git_source_keeps_revision_and_context() {
        let s = SourceSpec::new(SourceKind::Git, "https://example.com/repo.git", Some("svc"), Some("main"));
        let wire = s.to_wire();
        assert_eq!(wire.source_type, "Git");
        let git = wire.git.expect("git");
        assert_eq!(git.url, "https://example.com/repo.git");
        assert_eq!(git.revision.as_deref(), Some("main"));
        assert_eq!(wire.context_dir.as_deref(), Some("svc"));
        assert!(wire.oci_artifact.is_none());
    }

    #[test]
    fn oci_source_silently_drops_revision() {
        let s = SourceSpec::new(SourceKind::OciArtifact, "ghcr.io/acme/src:v1", Some("app"), Some("main"));
        assert_eq!(s.location, SourceLocation::OciArtifact { image: "ghcr.io/acme/src:v1".into() });
        assert_eq!(s.context_dir.as_deref(), Some("app"));
        let wire = s.to_wire();
        assert_eq!(wire.source_type, "OCI");
        assert!(wire.git.is_none());
        assert_eq!(wire.oci_artifact.map(|o| o.image), Some("ghcr.io/acme/src:v1".to_string()));
    }
}
