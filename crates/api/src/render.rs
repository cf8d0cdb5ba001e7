//! Plain-text rendering of tool results.
//!
//! Lists are a `Found N <kind>(s):` header followed by one block per object,
//! each closed by `---`. Single-object views carry every populated field.
//! Timestamps are UTC `YYYY-MM-DD HH:MM:SS`.

use std::fmt::Write as _;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use keel_core::resources::{SOURCE_TYPE_GIT, SOURCE_TYPE_OCI};
use keel_core::{Build, BuildRun, BuildStrategy, ClusterBuildStrategy, KeelError};
use kube::ResourceExt;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind assumed for a Build strategy reference that leaves `kind` unset.
const DEFAULT_STRATEGY_KIND: &str = "BuildStrategy";

pub fn timestamp(t: Option<&Time>) -> String {
    t.map(|t| t.0.format(TIME_FORMAT).to_string()).unwrap_or_else(|| "-".to_string())
}

fn header(out: &mut String, count: usize, noun: &str) {
    let _ = write!(out, "Found {} {}:\n\n", count, noun);
}

fn strategy_line(b: &Build) -> String {
    let kind = b.spec.strategy.kind.as_deref().unwrap_or(DEFAULT_STRATEGY_KIND);
    format!("Strategy: {} ({})\n", b.spec.strategy.name, kind)
}

// ---- builds ----

pub fn build_list(items: &[Build]) -> String {
    if items.is_empty() {
        return "No builds found".to_string();
    }
    let mut out = String::new();
    header(&mut out, items.len(), "build(s)");
    for b in items {
        let _ = writeln!(out, "Name: {}", b.name_any());
        let _ = writeln!(out, "Namespace: {}", b.namespace().unwrap_or_default());
        out.push_str(&strategy_line(b));
        if let Some(src) = &b.spec.source {
            let _ = writeln!(out, "Source Type: {}", src.source_type);
            if let Some(git) = &src.git {
                let _ = writeln!(out, "Git URL: {}", git.url);
            }
        }
        let _ = writeln!(out, "Output Image: {}", b.spec.output.image);
        let _ = writeln!(out, "Created: {}", timestamp(b.metadata.creation_timestamp.as_ref()));
        out.push_str("---\n");
    }
    out
}

pub fn build_detail(b: &Build) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Build: {}", b.name_any());
    let _ = writeln!(out, "Namespace: {}", b.namespace().unwrap_or_default());
    out.push_str(&strategy_line(b));
    if let Some(src) = &b.spec.source {
        let _ = writeln!(out, "Source Type: {}", src.source_type);
        if let Some(git) = src.git.as_ref().filter(|_| src.source_type == SOURCE_TYPE_GIT || src.oci_artifact.is_none()) {
            let _ = writeln!(out, "Git URL: {}", git.url);
            if let Some(rev) = &git.revision {
                let _ = writeln!(out, "Git Revision: {}", rev);
            }
        }
        if let Some(oci) = src.oci_artifact.as_ref().filter(|_| src.source_type == SOURCE_TYPE_OCI || src.git.is_none()) {
            let _ = writeln!(out, "OCI Image: {}", oci.image);
        }
        if let Some(dir) = &src.context_dir {
            let _ = writeln!(out, "Context Dir: {}", dir);
        }
    }
    let _ = writeln!(out, "Output Image: {}", b.spec.output.image);
    if let Some(timeout) = &b.spec.timeout {
        let _ = writeln!(out, "Timeout: {}", timeout);
    }
    if !b.spec.param_values.is_empty() {
        out.push_str("Parameters:\n");
        for p in &b.spec.param_values {
            let _ = writeln!(out, "  {}: {}", p.name, p.value.as_deref().unwrap_or(""));
        }
    }
    if let Some(registered) = b.status.as_ref().and_then(|s| s.registered.as_deref()) {
        let _ = writeln!(out, "Registered: {}", registered);
        if let Some(reason) = b.status.as_ref().and_then(|s| s.reason.as_deref()) {
            let _ = writeln!(out, "Reason: {}", reason);
        }
        if let Some(message) = b.status.as_ref().and_then(|s| s.message.as_deref()).filter(|m| !m.is_empty()) {
            let _ = writeln!(out, "Message: {}", message);
        }
    }
    let _ = writeln!(out, "Created: {}", timestamp(b.metadata.creation_timestamp.as_ref()));
    out
}

// ---- buildruns ----

fn build_reference(out: &mut String, r: &BuildRun) {
    match (&r.spec.build.name, &r.spec.build.spec) {
        (Some(name), _) => {
            let _ = writeln!(out, "Build: {}", name);
        }
        (None, Some(_)) => out.push_str("Build: (inline spec)\n"),
        (None, None) => {}
    }
}

fn succeeded_condition(out: &mut String, r: &BuildRun, with_transition: bool) {
    let Some(cond) = r.status.as_ref().and_then(|s| s.succeeded()) else {
        return;
    };
    let _ = writeln!(out, "Status: {}", cond.status);
    let _ = writeln!(out, "Reason: {}", cond.reason.as_deref().unwrap_or(""));
    if let Some(msg) = cond.message.as_deref().filter(|m| !m.is_empty()) {
        let _ = writeln!(out, "Message: {}", msg);
    }
    if with_transition {
        let _ = writeln!(out, "Last Transition: {}", timestamp(cond.last_transition_time.as_ref()));
    }
}

fn run_times(out: &mut String, r: &BuildRun) {
    let Some(status) = r.status.as_ref() else {
        return;
    };
    if let Some(t) = &status.start_time {
        let _ = writeln!(out, "Started: {}", timestamp(Some(t)));
    }
    if let Some(t) = &status.completion_time {
        let _ = writeln!(out, "Completed: {}", timestamp(Some(t)));
    }
}

pub fn buildrun_list(items: &[BuildRun]) -> String {
    if items.is_empty() {
        return "No buildruns found".to_string();
    }
    let mut out = String::new();
    header(&mut out, items.len(), "buildrun(s)");
    for r in items {
        let _ = writeln!(out, "Name: {}", r.name_any());
        let _ = writeln!(out, "Namespace: {}", r.namespace().unwrap_or_default());
        build_reference(&mut out, r);
        succeeded_condition(&mut out, r, false);
        run_times(&mut out, r);
        let _ = writeln!(out, "Created: {}", timestamp(r.metadata.creation_timestamp.as_ref()));
        out.push_str("---\n");
    }
    out
}

pub fn buildrun_detail(r: &BuildRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "BuildRun: {}", r.name_any());
    let _ = writeln!(out, "Namespace: {}", r.namespace().unwrap_or_default());
    build_reference(&mut out, r);
    succeeded_condition(&mut out, r, true);
    if let Some(status) = &r.status {
        if let Some(task_run) = &status.task_run_name {
            let _ = writeln!(out, "TaskRun: {}", task_run);
        }
    }
    run_times(&mut out, r);
    if let Some(status) = &r.status {
        if let Some(output) = &status.output {
            out.push_str("Output:\n");
            if let Some(digest) = output.digest.as_deref().filter(|d| !d.is_empty()) {
                let _ = writeln!(out, "  Digest: {}", digest);
            }
            if let Some(size) = output.size.filter(|s| *s > 0) {
                let _ = writeln!(out, "  Size: {} bytes", size);
            }
        }
        if let Some(failure) = &status.failure_details {
            out.push_str("Failure Details:\n");
            let _ = writeln!(out, "  Reason: {}", failure.reason);
            let _ = writeln!(out, "  Message: {}", failure.message);
            if let Some(loc) = &failure.location {
                let _ = writeln!(out, "  Pod: {}", loc.pod);
                let _ = writeln!(out, "  Container: {}", loc.container);
            }
        }
    }
    let _ = writeln!(out, "Created: {}", timestamp(r.metadata.creation_timestamp.as_ref()));
    out
}

// ---- strategies ----

fn strategy_block(out: &mut String, name: &str, namespace: Option<&str>, steps: usize, params: usize, created: Option<&Time>) {
    let _ = writeln!(out, "Name: {}", name);
    if let Some(ns) = namespace {
        let _ = writeln!(out, "Namespace: {}", ns);
    }
    let _ = writeln!(out, "Steps: {}", steps);
    if params > 0 {
        let _ = writeln!(out, "Parameters: {}", params);
    }
    let _ = writeln!(out, "Created: {}", timestamp(created));
    out.push_str("---\n");
}

pub fn buildstrategy_list(items: &[BuildStrategy]) -> String {
    if items.is_empty() {
        return "No buildstrategies found".to_string();
    }
    let mut out = String::new();
    header(&mut out, items.len(), "buildstrategy(ies)");
    for s in items {
        let ns = s.namespace().unwrap_or_default();
        strategy_block(
            &mut out,
            &s.name_any(),
            Some(&ns),
            s.spec.steps.len(),
            s.spec.parameters.len(),
            s.metadata.creation_timestamp.as_ref(),
        );
    }
    out
}

pub fn clusterbuildstrategy_list(items: &[ClusterBuildStrategy]) -> String {
    if items.is_empty() {
        return "No clusterbuildstrategies found".to_string();
    }
    let mut out = String::new();
    header(&mut out, items.len(), "clusterbuildstrategy(ies)");
    for s in items {
        strategy_block(
            &mut out,
            &s.name_any(),
            None,
            s.spec.steps.len(),
            s.spec.parameters.len(),
            s.metadata.creation_timestamp.as_ref(),
        );
    }
    out
}

// ---- errors ----

/// Text for a failed call. Remote failures name the step that failed.
pub fn error_text(action: Option<&str>, err: &KeelError) -> String {
    match (err, action) {
        (KeelError::RemoteCallFailed(msg), Some(action)) => format!("Failed to {}: {}", action, msg),
        (KeelError::InvalidSelectorSyntax { expression, reason }, _) => {
            format!("Invalid label selector: {:?}: {}", expression, reason)
        }
        (KeelError::InvalidDuration { text, reason }, _) => format!("Invalid timeout duration: {:?}: {}", text, reason),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use keel_core::resources::{
        BuildRunSpec, BuildRunStatus, BuildSpec, Condition, FailureDetails, FailureLocation, Git, Image, OutputResult,
        ParamValue, ReferencedBuild, Source, Strategy, CONDITION_SUCCEEDED,
    };
    use kube::core::ObjectMeta;

    fn created() -> Option<Time> {
        Some(Time(Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).single().expect("valid date")))
    }

    fn meta(name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.into()),
            namespace: Some("ci".into()),
            creation_timestamp: created(),
            ..Default::default()
        }
    }

    fn git_build() -> Build {
        Build {
            metadata: meta("app"),
            spec: BuildSpec {
                source: Some(Source {
                    source_type: "Git".into(),
                    git: Some(Git { url: "https://github.com/acme/app".into(), revision: Some("main".into()), ..Default::default() }),
                    context_dir: Some("src".into()),
                    ..Default::default()
                }),
                strategy: Strategy { name: "buildah".into(), kind: Some("ClusterBuildStrategy".into()) },
                param_values: vec![ParamValue::single("dockerfile", "Containerfile")],
                output: Image { image: "registry.io/acme/app:1".into(), ..Default::default() },
                timeout: Some("10m0s".into()),
                ..Default::default()
            },
            status: None,
        }
    }

    #[test]
    fn empty_lists_say_so() {
        assert_eq!(build_list(&[]), "No builds found");
        assert_eq!(buildrun_list(&[]), "No buildruns found");
        assert_eq!(buildstrategy_list(&[]), "No buildstrategies found");
        assert_eq!(clusterbuildstrategy_list(&[]), "No clusterbuildstrategies found");
    }

    #[test]
    fn build_list_block() {
        let text = build_list(&[git_build()]);
        assert_eq!(
            text,
            "Found 1 build(s):\n\n\
             Name: app\n\
             Namespace: ci\n\
             Strategy: buildah (ClusterBuildStrategy)\n\
             Source Type: Git\n\
             Git URL: https://github.com/acme/app\n\
             Output Image: registry.io/acme/app:1\n\
             Created: 2024-03-09 14:05:07\n\
             ---\n"
        );
    }

    #[test]
    fn build_detail_carries_every_field() {
        let text = build_detail(&git_build());
        assert!(text.starts_with("Build: app\nNamespace: ci\n"));
        assert!(text.contains("Git Revision: main\n"));
        assert!(text.contains("Context Dir: src\n"));
        assert!(text.contains("Timeout: 10m0s\n"));
        assert!(text.contains("Parameters:\n  dockerfile: Containerfile\n"));
        assert!(text.ends_with("Created: 2024-03-09 14:05:07\n"));
    }

    #[test]
    fn failed_buildrun_detail() {
        let run = BuildRun {
            metadata: meta("app-x7k2p"),
            spec: BuildRunSpec {
                build: ReferencedBuild { name: Some("app".into()), spec: None },
                ..Default::default()
            },
            status: Some(BuildRunStatus {
                conditions: vec![Condition {
                    type_: CONDITION_SUCCEEDED.into(),
                    status: "False".into(),
                    reason: Some("Failed".into()),
                    message: Some("step-build exited 1".into()),
                    last_transition_time: created(),
                }],
                task_run_name: Some("app-x7k2p-tr".into()),
                start_time: created(),
                completion_time: None,
                output: Some(OutputResult { digest: Some("sha256:abc".into()), size: Some(0) }),
                failure_details: Some(FailureDetails {
                    reason: "BuildahBudFailed".into(),
                    message: "exit 1".into(),
                    location: Some(FailureLocation { pod: "app-pod".into(), container: "step-build".into() }),
                }),
            }),
        };
        let text = buildrun_detail(&run);
        assert!(text.contains("Build: app\nStatus: False\nReason: Failed\nMessage: step-build exited 1\n"));
        assert!(text.contains("Last Transition: 2024-03-09 14:05:07\nTaskRun: app-x7k2p-tr\nStarted: "));
        assert!(!text.contains("Completed:"));
        assert!(text.contains("Output:\n  Digest: sha256:abc\nFailure Details:\n"));
        assert!(!text.contains("Size:"));
        assert!(text.contains("  Pod: app-pod\n  Container: step-build\n"));
    }

    #[test]
    fn inline_buildrun_is_marked() {
        let run = BuildRun {
            metadata: meta("buildrun-q8v2m"),
            spec: BuildRunSpec {
                build: ReferencedBuild { name: None, spec: Some(Box::new(git_build().spec)) },
                ..Default::default()
            },
            status: None,
        };
        assert!(buildrun_list(&[run]).contains("Build: (inline spec)\n"));
    }

    #[test]
    fn cluster_strategies_have_no_namespace_line() {
        let s = ClusterBuildStrategy {
            metadata: ObjectMeta { name: Some("kaniko".into()), creation_timestamp: created(), ..Default::default() },
            spec: keel_core::resources::ClusterBuildStrategySpec {
                steps: vec![serde_json::json!({"name": "build"})],
                ..Default::default()
            },
        };
        assert_eq!(
            clusterbuildstrategy_list(&[s]),
            "Found 1 clusterbuildstrategy(ies):\n\nName: kaniko\nSteps: 1\nCreated: 2024-03-09 14:05:07\n---\n"
        );
    }

    #[test]
    fn remote_errors_name_the_failed_step() {
        let e = KeelError::RemoteCallFailed("connection refused".into());
        assert_eq!(error_text(Some("list builds"), &e), "Failed to list builds: connection refused");
        let e = KeelError::missing("name");
        assert_eq!(error_text(Some("get build"), &e), "name is required");
    }
}
