use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use taskgate_core::client::{ResilientClient, TaskApi};
use taskgate_core::config::GatewayConfig;
use taskgate_core::coordinator::OptimisticCoordinator;
use taskgate_core::domain::{ApiError, TaskId, TaskList, TaskStatus};
use taskgate_core::gateway::{GatewayServer, shutdown_signal};
use taskgate_core::impls::{InMemoryTaskCache, ReqwestTransport, UpstreamLoader};
use taskgate_core::ports::TaskCache;

#[derive(Parser)]
#[command(name = "taskgate", version, about = "Resilient gateway for a task-management API")]
struct Cli {
    /// Upstream base URL
    #[arg(long, env = "API_BASE_URL")]
    base_url: Option<String>,

    /// Gateway bind host
    #[arg(long, env = "TASKGATE_HOST")]
    host: Option<String>,

    /// Gateway bind port
    #[arg(long, env = "TASKGATE_PORT")]
    port: Option<u16>,

    /// Default tracing filter when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway (default)
    Serve,

    /// Query the upstream health endpoint
    Check,

    /// Print one task list
    List {
        #[arg(value_enum)]
        list: ListArg,
    },

    /// Print all projects, or the tasks of one project
    Projects { name: Option<String> },

    /// Print all areas, or the detail of one area
    Areas { name: Option<String> },

    /// Flip a task between open and completed, optimistically
    Toggle {
        id: String,

        /// Status the task has now
        #[arg(long, value_enum, default_value = "open")]
        current: StatusArg,

        /// List the task is shown in
        #[arg(long, value_enum, default_value = "inbox")]
        list: ListArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ListArg {
    Inbox,
    Today,
    Upcoming,
}

impl From<ListArg> for TaskList {
    fn from(arg: ListArg) -> Self {
        match arg {
            ListArg::Inbox => TaskList::Inbox,
            ListArg::Today => TaskList::Today,
            ListArg::Upcoming => TaskList::Upcoming,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Open,
    Completed,
}

impl From<StatusArg> for TaskStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Open => TaskStatus::Open,
            StatusArg::Completed => TaskStatus::Completed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = GatewayConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config.client.base_url = base_url;
    }
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    config.validate().context("invalid configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => cmd_serve(config).await,
        Command::Check => cmd_check(&config).await,
        Command::List { list } => cmd_list(&config, list.into()).await,
        Command::Projects { name } => cmd_projects(&config, name.as_deref()).await,
        Command::Areas { name } => cmd_areas(&config, name.as_deref()).await,
        Command::Toggle { id, current, list } => {
            cmd_toggle(&config, id, current.into(), list.into()).await
        }
    }
}

fn task_api(config: &GatewayConfig) -> TaskApi {
    let client = ResilientClient::new(
        Arc::new(ReqwestTransport::default()),
        config.client.retry_policy(),
    );
    TaskApi::new(client, config.client.base_url.clone())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_serve(config: GatewayConfig) -> Result<()> {
    info!(
        host = %config.host,
        port = config.port,
        upstream = %config.client.base_url,
        "starting gateway"
    );
    let server = GatewayServer::new(config)?;
    server.serve(shutdown_signal()).await?;
    Ok(())
}

async fn cmd_check(config: &GatewayConfig) -> Result<()> {
    let health = task_api(config)
        .health()
        .await
        .context("upstream health check failed")?;
    print_json(&health)
}

async fn cmd_list(config: &GatewayConfig, list: TaskList) -> Result<()> {
    print_json(&task_api(config).list_tasks(list).await?)
}

async fn cmd_projects(config: &GatewayConfig, name: Option<&str>) -> Result<()> {
    let api = task_api(config);
    match name {
        Some(name) => print_json(&api.project_tasks(name).await?),
        None => print_json(&api.list_projects().await?),
    }
}

async fn cmd_areas(config: &GatewayConfig, name: Option<&str>) -> Result<()> {
    let api = task_api(config);
    match name {
        Some(name) => print_json(&api.area_detail(name).await?),
        None => print_json(&api.list_areas().await?),
    }
}

async fn cmd_toggle(
    config: &GatewayConfig,
    id: String,
    current: TaskStatus,
    list: TaskList,
) -> Result<()> {
    let key = format!("/todos/{}", list.as_str());

    let api = task_api(config);
    let cache = Arc::new(InMemoryTaskCache::new(Arc::new(UpstreamLoader::new(
        api.clone(),
    ))));
    cache
        .revalidate(&key)
        .await
        .with_context(|| format!("failed to load {key}"))?;

    let coordinator = OptimisticCoordinator::new(cache.clone(), api);
    let outcome = coordinator
        .toggle_status(
            TaskId::new(id.clone()),
            current,
            &key,
            Some(Box::new(|status: TaskStatus| println!("task is now {status}"))),
            Some(Box::new(|err: &ApiError| eprintln!("toggle failed: {err}"))),
        )
        .await;

    let shown = cache
        .read(&key)
        .unwrap_or_default()
        .into_iter()
        .find(|t| t.id.as_str() == id);
    if let Some(task) = shown {
        print_json(&task)?;
    }

    outcome.with_context(|| format!("failed to toggle {id}"))
}
