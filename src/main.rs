use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flowload_core::config::AppConfig;
use flowload_core::task_log::TaskLog;
use flowload_core::traits::{ProcessEngine, Variables};
use flowload_engine::{replay_trace, RestEngineClient};
use flowload_trace::{load_definition, TraceBuilder, TraceNode};

#[derive(Parser)]
#[command(
    name = "flowload",
    version,
    about = "Reconcile workflow definitions with simulated task logs"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "flowload.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct the execution path of a task log and print it as JSON
    Trace {
        /// Process definition document (.json or .toml)
        #[arg(short, long)]
        definition: PathBuf,
        /// Task log: JSON array of task names or entry objects
        #[arg(short, long)]
        log: PathBuf,
        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Deploy a process definition to the engine
    Deploy {
        /// Deployment name
        #[arg(short, long)]
        name: String,
        /// File whose content is deployed
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Start a process instance
    Start {
        /// Deployed definition id
        #[arg(long)]
        definition_id: String,
        /// Process variable, repeatable
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
    /// Reconstruct a trace, then start an instance and claim its tasks in order
    Replay {
        #[arg(short, long)]
        definition: PathBuf,
        #[arg(short, long)]
        log: PathBuf,
        /// Deployed definition id to start
        #[arg(long)]
        definition_id: String,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty variable name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn load_log(path: &Path) -> anyhow::Result<TaskLog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading task log {}", path.display()))?;
    let log: TaskLog = serde_json::from_str(&content)
        .with_context(|| format!("parsing task log {}", path.display()))?;
    Ok(log)
}

fn reconstruct(config: &AppConfig, definition: &Path, log: &Path) -> anyhow::Result<TraceNode> {
    let graph = load_definition(definition)?;
    let mut log = load_log(log)?;

    let root = TraceBuilder::new(&graph)
        .with_cycle_guard(config.trace.cycle_guard)
        .build(&mut log)?;

    let leftover = log.unconsumed();
    if !leftover.is_empty() {
        warn!(entries = ?leftover, "Task log entries not matched by the trace");
    }
    Ok(root)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "flowload", &mut std::io::stdout());
        return Ok(());
    }

    let config = AppConfig::load_or_default(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config => {
            println!("{}", config.to_toml()?);
        }
        Commands::Trace {
            definition,
            log,
            compact,
        } => {
            let root = reconstruct(&config, &definition, &log)?;
            let json = if compact {
                serde_json::to_string(&root)?
            } else {
                serde_json::to_string_pretty(&root)?
            };
            println!("{}", json);
        }
        Commands::Deploy { name, file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let client = RestEngineClient::new(&config.engine)?;
            let id = client.deploy_definition(name, content).await?;
            println!("{}", id);
        }
        Commands::Start {
            definition_id,
            vars,
        } => {
            let variables: Variables = vars.into_iter().collect();
            let client = RestEngineClient::new(&config.engine)?;
            let id = client.start_process(definition_id, variables).await?;
            println!("{}", id);
        }
        Commands::Replay {
            definition,
            log,
            definition_id,
        } => {
            let root = reconstruct(&config, &definition, &log)?;
            let client = RestEngineClient::new(&config.engine)?;
            let report = replay_trace(&client, &definition_id, &root).await?;
            info!(process_id = %report.process_id, "Replay finished");
            for task_id in &report.claimed {
                println!("{}", task_id);
            }
        }
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}
