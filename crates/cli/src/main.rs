//! `agentflow` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate`: validate a workflow graph JSON file.
//! - `run`: execute a workflow graph JSON file.
//! - `save`: validate and store a workflow graph for a tenant.
//! - `workflows`: list a tenant's stored workflows.
//! - `types`: list registered agent types by category.
//! - `describe`: show one agent type with its configuration schema.
//! - `ask`: serve a natural-language request end to end.

mod app;
mod settings;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;

use agents::ExecutionContext;
use engine::{validate_graph, ExecutionStatus, WorkflowGraph};

use crate::app::{builtin_registry, App};
use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "agentflow",
    about = "Compose agents into workflows and run them",
    version
)]
struct Cli {
    /// Path to an agentflow.toml settings file.
    #[arg(long, global = true, env = "AGENTFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Storage URL (`memory://` or `file://<dir>`); overrides the settings file.
    #[arg(long, global = true, env = "AGENTFLOW_STORAGE")]
    storage: Option<String>,

    /// Tenant that owns stored workflows.
    #[arg(long, global = true, default_value = "default")]
    tenant: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a workflow graph JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
    /// Execute a workflow graph JSON file and print the execution record.
    Run {
        path: PathBuf,
        /// Initial input as a JSON document.
        #[arg(long, default_value = "{}")]
        input: String,
    },
    /// Validate and store a workflow graph.
    Save { path: PathBuf },
    /// List the tenant's stored workflows.
    Workflows,
    /// List registered agent types grouped by category.
    Types,
    /// Show one agent type and its configuration schema.
    Describe { type_id: String },
    /// Match, compose or route a natural-language request and run it.
    Ask {
        request: String,
        /// Initial input as a JSON document; defaults to `{"query": <request>}`.
        #[arg(long)]
        input: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let settings = Settings::load(cli.config.as_deref())?;

    // Validation needs no storage.
    if let Command::Validate { path } = &cli.command {
        return validate(path);
    }

    let app = App::build(&settings, cli.storage.as_deref()).await?;

    match cli.command {
        Command::Validate { .. } => Ok(()),
        Command::Run { path, input } => {
            let graph = read_graph(&path)?;
            let input = parse_input(&input)?;
            let execution_id = uuid::Uuid::new_v4().to_string();
            let ctx = ExecutionContext::new(graph.id.clone(), execution_id).with_tenant(cli.tenant.clone());

            let execution = app.executor.execute_with_context(&graph, input, &ctx).await?;
            app.store.save_execution(&execution, Some(&cli.tenant)).await?;
            print_json(&execution)?;
            exit_on_failure(execution.status);
            Ok(())
        }
        Command::Save { path } => {
            let graph = read_graph(&path)?;
            app.store.save_workflow(&cli.tenant, &graph).await?;
            println!("✅ Saved workflow '{}' for tenant '{}'", graph.id, cli.tenant);
            Ok(())
        }
        Command::Workflows => {
            for graph in app.store.list_workflows(&cli.tenant).await? {
                println!("{:<24} {:<32} [{}]", graph.id, graph.name, graph.type_ids().join(", "));
            }
            Ok(())
        }
        Command::Types => {
            for (category, descriptors) in app.registry.list_by_category() {
                println!("{category}");
                for d in descriptors {
                    println!("  {:<20} {}", d.type_id, d.description);
                }
            }
            Ok(())
        }
        Command::Describe { type_id } => {
            let descriptor = app.registry.describe(&type_id)?;
            print_json(&descriptor.to_metadata())
        }
        Command::Ask { request, input } => {
            let input = match input {
                Some(raw) => parse_input(&raw)?,
                None => json!({ "query": request }),
            };
            let ctx = ExecutionContext::new("pending", "pending").with_tenant(cli.tenant.clone());

            let outcome = app.supervisor.handle(&request, input, &ctx).await?;
            info!("request served via {:?}", outcome.route);
            print_json(&json!({
                "route": outcome.route,
                "graph_id": outcome.graph.id,
                "execution": outcome.execution,
            }))?;
            exit_on_failure(outcome.execution.status);
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn validate(path: &Path) -> anyhow::Result<()> {
    let graph = read_graph(path)?;
    let registry = builtin_registry()?;

    match validate_graph(&graph, &registry) {
        Ok(order) => {
            println!("✅ Workflow is valid. Execution order: {order:?}");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Validation failed: {e}");
            std::process::exit(1);
        }
    }
}

fn read_graph(path: &Path) -> anyhow::Result<WorkflowGraph> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid workflow JSON in {}", path.display()))
}

fn parse_input(raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).context("--input is not valid JSON")
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_on_failure(status: ExecutionStatus) {
    if status == ExecutionStatus::Failed {
        std::process::exit(2);
    }
}
