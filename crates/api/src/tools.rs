//! Tool names and the catalog served to clients.

use std::fmt;
use std::str::FromStr;

use keel_core::KeelError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    ListBuilds,
    GetBuild,
    CreateBuild,
    DeleteBuild,
    ListBuildruns,
    GetBuildrun,
    CreateBuildrun,
    RestartBuildrun,
    DeleteBuildrun,
    ListBuildstrategies,
    ListClusterbuildstrategies,
}

impl ToolName {
    pub const ALL: [ToolName; 11] = [
        ToolName::ListBuilds,
        ToolName::GetBuild,
        ToolName::CreateBuild,
        ToolName::DeleteBuild,
        ToolName::ListBuildruns,
        ToolName::GetBuildrun,
        ToolName::CreateBuildrun,
        ToolName::RestartBuildrun,
        ToolName::DeleteBuildrun,
        ToolName::ListBuildstrategies,
        ToolName::ListClusterbuildstrategies,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ListBuilds => "list_builds",
            ToolName::GetBuild => "get_build",
            ToolName::CreateBuild => "create_build",
            ToolName::DeleteBuild => "delete_build",
            ToolName::ListBuildruns => "list_buildruns",
            ToolName::GetBuildrun => "get_buildrun",
            ToolName::CreateBuildrun => "create_buildrun",
            ToolName::RestartBuildrun => "restart_buildrun",
            ToolName::DeleteBuildrun => "delete_buildrun",
            ToolName::ListBuildstrategies => "list_buildstrategies",
            ToolName::ListClusterbuildstrategies => "list_clusterbuildstrategies",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolName::ListBuilds => "List Builds in a namespace with filtering options",
            ToolName::GetBuild => "Get a specific Build by name",
            ToolName::CreateBuild => "Create a new Build resource",
            ToolName::DeleteBuild => "Delete a Build by name",
            ToolName::ListBuildruns => "List BuildRuns in a namespace with filtering options",
            ToolName::GetBuildrun => "Get a specific BuildRun by name",
            ToolName::CreateBuildrun => "Create a new BuildRun resource (either from existing Build or inline)",
            ToolName::RestartBuildrun => "Restart a BuildRun by creating a new one",
            ToolName::DeleteBuildrun => "Delete a BuildRun by name",
            ToolName::ListBuildstrategies => "List BuildStrategies in a namespace with filtering options",
            ToolName::ListClusterbuildstrategies => "List ClusterBuildStrategies with filtering options",
        }
    }

    /// Argument keys the tool reads; `*` marks required ones.
    pub fn arguments(&self) -> &'static [&'static str] {
        match self {
            ToolName::ListBuilds | ToolName::ListBuildruns | ToolName::ListBuildstrategies => {
                &["namespace", "prefix", "label-selector"]
            }
            ToolName::ListClusterbuildstrategies => &["prefix", "label-selector"],
            ToolName::GetBuild
            | ToolName::DeleteBuild
            | ToolName::GetBuildrun
            | ToolName::RestartBuildrun
            | ToolName::DeleteBuildrun => &["name*", "namespace"],
            ToolName::CreateBuild => &[
                "name*",
                "namespace",
                "source-type*",
                "source-url*",
                "context-dir",
                "revision",
                "strategy*",
                "strategy-kind",
                "output-image*",
                "parameters",
                "timeout",
            ],
            ToolName::CreateBuildrun => &[
                "name",
                "namespace",
                "build-name",
                "source-type",
                "source-url",
                "context-dir",
                "revision",
                "strategy",
                "strategy-kind",
                "output-image",
                "service-account",
                "parameters",
                "timeout",
            ],
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| KeelError::UnknownTool(s.to_string()))
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: &'static [&'static str],
}

pub fn catalog() -> Vec<ToolSpec> {
    ToolName::ALL
        .iter()
        .map(|t| ToolSpec { name: t.as_str(), description: t.description(), arguments: t.arguments() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for t in ToolName::ALL {
            assert_eq!(t.as_str().parse::<ToolName>(), Ok(t));
        }
        assert_eq!("listBuilds".parse::<ToolName>(), Err(KeelError::UnknownTool("listBuilds".into())));
    }

    #[test]
    fn catalog_lists_every_tool_once() {
        let cat = catalog();
        assert_eq!(cat.len(), 11);
        let mut names: Vec<_> = cat.iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 11);
        assert_eq!(cat[0].name, "list_builds");
    }
}
