use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use keel_api::{catalog, ToolName, ToolResult, Toolbox};
use keel_engine::requests::{
    BuildFields, CreateBuildRequest, CreateBuildRunRequest, ListClusterRequest, ListRequest, ObjectRequest,
};
use keel_kubehub::KubeCluster;
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "keelctl", version, about = "Keel CLI: Shipwright Builds, BuildRuns and strategies")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Kubernetes namespace (lists: all namespaces when unset; otherwise `default`)
    #[arg(long = "ns", global = true, env = "KEEL_NAMESPACE")]
    namespace: Option<String>,

    /// Kubeconfig context to use instead of the current one
    #[arg(long = "context", global = true, env = "KEEL_CONTEXT")]
    context: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available tools
    Tools,
    /// Invoke a tool by name with a JSON argument map
    Call {
        /// Tool name, e.g. "list_builds"
        tool: String,
        /// Arguments as a JSON object, e.g. '{"namespace":"ci"}'
        #[arg(long = "args", default_value = "{}")]
        args: String,
    },
    /// Builds
    #[command(subcommand)]
    Build(BuildCmd),
    /// BuildRuns
    #[command(subcommand)]
    Buildrun(BuildRunCmd),
    /// Namespaced BuildStrategies
    #[command(subcommand)]
    Strategy(StrategyCmd),
    /// ClusterBuildStrategies
    #[command(subcommand)]
    ClusterStrategy(StrategyCmd),
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Only names starting with this prefix
    #[arg(long = "prefix")]
    prefix: Option<String>,
    /// Label selector, e.g. "team=payments,tier!=dev"
    #[arg(short = 'l', long = "selector")]
    selector: Option<String>,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Source type: Git or OCI
    #[arg(long = "source-type")]
    source_type: Option<String>,
    /// Git repository URL or OCI artifact image
    #[arg(long = "source-url")]
    source_url: Option<String>,
    #[arg(long = "context-dir")]
    context_dir: Option<String>,
    /// Git revision (ignored for OCI sources)
    #[arg(long = "revision")]
    revision: Option<String>,
    /// Build strategy name
    #[arg(long = "strategy")]
    strategy: Option<String>,
    /// BuildStrategy or ClusterBuildStrategy (default)
    #[arg(long = "strategy-kind")]
    strategy_kind: Option<String>,
    #[arg(long = "output-image")]
    output_image: Option<String>,
    /// Strategy parameter as key=value (repeatable)
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
    /// Timeout, e.g. "10m" or "1h30m"
    #[arg(long = "timeout")]
    timeout: Option<String>,
}

impl SourceArgs {
    fn fields(&self) -> BuildFields {
        BuildFields {
            source_type: self.source_type.clone(),
            source_url: self.source_url.clone(),
            context_dir: self.context_dir.clone(),
            revision: self.revision.clone(),
            strategy: self.strategy.clone(),
            strategy_kind: self.strategy_kind.clone(),
            output_image: self.output_image.clone(),
        }
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        self.params.iter().cloned().collect()
    }
}

#[derive(Subcommand, Debug)]
enum BuildCmd {
    List(ListArgs),
    Get { name: String },
    Create {
        name: String,
        #[command(flatten)]
        source: SourceArgs,
    },
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum BuildRunCmd {
    List(ListArgs),
    Get { name: String },
    /// Run an existing Build (--build) or an inline spec (--strategy, --source-url, --output-image)
    Create {
        /// BuildRun name; generated when omitted
        #[arg(long = "name")]
        name: Option<String>,
        #[arg(long = "build")]
        build: Option<String>,
        #[arg(long = "service-account")]
        service_account: Option<String>,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Re-run a BuildRun under a new name
    Restart { name: String },
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum StrategyCmd {
    List(ListArgs),
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

fn init_tracing() {
    let env = std::env::var("KEEL_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("KEEL_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid KEEL_METRICS_ADDR; expected host:port");
        }
    }
}

fn to_args<T: Serialize>(req: &T) -> Result<serde_json::Value> {
    serde_json::to_value(req).context("encoding tool arguments")
}

/// Map a subcommand to a tool name and its argument map.
fn invocation(cli: &Cli) -> Result<(String, serde_json::Value)> {
    let ns = cli.namespace.clone();
    let list = |a: &ListArgs| ListRequest { namespace: ns.clone(), prefix: a.prefix.clone(), label_selector: a.selector.clone() };
    let object = |name: &str| ObjectRequest::new(name, ns.as_deref());
    let (tool, args) = match &cli.command {
        Commands::Tools => anyhow::bail!("`tools` lists the catalog; it does not invoke a tool"),
        Commands::Call { tool, args } => {
            let v: serde_json::Value = serde_json::from_str(args).with_context(|| format!("parsing --args for {}", tool))?;
            return Ok((tool.clone(), v));
        }
        Commands::Build(BuildCmd::List(a)) => (ToolName::ListBuilds, to_args(&list(a))?),
        Commands::Build(BuildCmd::Get { name }) => (ToolName::GetBuild, to_args(&object(name))?),
        Commands::Build(BuildCmd::Create { name, source }) => (
            ToolName::CreateBuild,
            to_args(&CreateBuildRequest {
                name: Some(name.clone()),
                namespace: ns.clone(),
                fields: source.fields(),
                parameters: source.parameters(),
                timeout: source.timeout.clone(),
            })?,
        ),
        Commands::Build(BuildCmd::Delete { name }) => (ToolName::DeleteBuild, to_args(&object(name))?),
        Commands::Buildrun(BuildRunCmd::List(a)) => (ToolName::ListBuildruns, to_args(&list(a))?),
        Commands::Buildrun(BuildRunCmd::Get { name }) => (ToolName::GetBuildrun, to_args(&object(name))?),
        Commands::Buildrun(BuildRunCmd::Create { name, build, service_account, source }) => (
            ToolName::CreateBuildrun,
            to_args(&CreateBuildRunRequest {
                name: name.clone(),
                namespace: ns.clone(),
                build_name: build.clone(),
                fields: source.fields(),
                parameters: source.parameters(),
                timeout: source.timeout.clone(),
                service_account: service_account.clone(),
            })?,
        ),
        Commands::Buildrun(BuildRunCmd::Restart { name }) => (ToolName::RestartBuildrun, to_args(&object(name))?),
        Commands::Buildrun(BuildRunCmd::Delete { name }) => (ToolName::DeleteBuildrun, to_args(&object(name))?),
        Commands::Strategy(StrategyCmd::List(a)) => (ToolName::ListBuildstrategies, to_args(&list(a))?),
        Commands::ClusterStrategy(StrategyCmd::List(a)) => (
            ToolName::ListClusterbuildstrategies,
            to_args(&ListClusterRequest { prefix: a.prefix.clone(), label_selector: a.selector.clone() })?,
        ),
    };
    Ok((tool.as_str().to_string(), args))
}

fn print_result(output: Output, res: &ToolResult) -> Result<()> {
    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(res)?),
        Output::Human if res.is_error => eprintln!("{}", res.text),
        Output::Human => println!("{}", res.text.trim_end()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    if let Commands::Tools = cli.command {
        let tools = catalog();
        match cli.output {
            Output::Human => {
                for t in &tools {
                    println!("{} • {}", t.name, t.description);
                    println!("    args: {}", t.arguments.join(", "));
                }
            }
            Output::Json => println!("{}", serde_json::to_string_pretty(&tools)?),
        }
        return Ok(());
    }

    let (tool, args) = invocation(&cli)?;
    let client = keel_kubehub::connect(cli.context.as_deref()).await?;
    let toolbox = Toolbox::new(Arc::new(KubeCluster::new(client)));
    info!(tool = %tool, "call invoked");
    let res = toolbox.call(&tool, args).await;
    print_result(cli.output, &res)?;
    if res.is_error {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(argv: &[&str]) -> Cli {
        Cli::try_parse_from(argv).expect("parse")
    }

    #[test]
    fn params_split_on_first_equals() {
        assert_eq!(parse_param("a=b=c"), Ok(("a".to_string(), "b=c".to_string())));
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn build_create_maps_to_kebab_case_arguments() {
        let cli = parse(&[
            "keelctl", "--ns", "ci", "build", "create", "app", "--source-type", "Git", "--source-url",
            "https://github.com/acme/app", "--strategy", "buildah", "--output-image", "registry.io/acme/app",
            "--param", "dockerfile=Containerfile", "--timeout", "10m",
        ]);
        let (tool, args) = invocation(&cli).expect("invocation");
        assert_eq!(tool, "create_build");
        assert_eq!(
            args,
            json!({
                "name": "app",
                "namespace": "ci",
                "source-type": "Git",
                "source-url": "https://github.com/acme/app",
                "strategy": "buildah",
                "output-image": "registry.io/acme/app",
                "parameters": { "dockerfile": "Containerfile" },
                "timeout": "10m"
            })
        );
    }

    #[test]
    fn list_without_namespace_sends_none() {
        let cli = parse(&["keelctl", "buildrun", "list", "-l", "team=payments"]);
        let (tool, args) = invocation(&cli).expect("invocation");
        assert_eq!(tool, "list_buildruns");
        assert_eq!(args, json!({ "label-selector": "team=payments" }));
    }

    #[test]
    fn cluster_strategy_list_has_no_namespace() {
        let cli = parse(&["keelctl", "--ns", "ci", "cluster-strategy", "list", "--prefix", "build"]);
        let (tool, args) = invocation(&cli).expect("invocation");
        assert_eq!(tool, "list_clusterbuildstrategies");
        assert_eq!(args, json!({ "prefix": "build" }));
    }

    #[test]
    fn raw_call_passes_arguments_through() {
        let cli = parse(&["keelctl", "call", "restart_buildrun", "--args", r#"{"name":"nightly"}"#]);
        let (tool, args) = invocation(&cli).expect("invocation");
        assert_eq!(tool, "restart_buildrun");
        assert_eq!(args, json!({ "name": "nightly" }));
    }
}
