use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;
use volshrink::*;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Shrink a volume by the same amount on several hosts, after checking every host can take it
#[derive(Parser)]
#[command(name = "volshrink", author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to $CONFIG_FILE, then ./volshrink.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive shrink session (the default)
    Shrink,
    /// Serve this host's volumes to the orchestrator
    Agent,
    /// Print recent rollout results as JSON lines
    History {
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Shrink);
    // Keep the prompt readable unless RUST_LOG asks for more.
    init_tracing(match command {
        Command::Agent => "info",
        _ => "warn",
    });

    let result = match config::AppConfig::load(cli.config.as_deref()) {
        Ok(app_config) => match command {
            Command::Shrink => run_shrink(app_config).await,
            Command::Agent => run_agent(app_config).await.map(|()| ExitCode::SUCCESS),
            Command::History { limit } => {
                run_history(app_config, limit).await.map(|()| ExitCode::SUCCESS)
            }
        },
        Err(e) => Err(e),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "volshrink failed");
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn local_storage(app_config: &config::AppConfig) -> Arc<storage::SysinfoStorage> {
    Arc::new(storage::SysinfoStorage::new(
        app_config.agent.minimum_headroom_bytes,
        storage::ResizeCommand::new(app_config.agent.resize_command.clone()),
    ))
}

async fn open_audit(app_config: &config::AppConfig) -> Result<Option<Arc<audit_repo::AuditRepo>>> {
    if !app_config.audit.enabled {
        return Ok(None);
    }
    let repo =
        audit_repo::AuditRepo::connect(&app_config.audit.path, app_config.audit.retention_days)
            .await?;
    repo.init().await?;
    Ok(Some(Arc::new(repo)))
}

async fn run_shrink(app_config: config::AppConfig) -> Result<ExitCode> {
    let orchestrator_config = &app_config.orchestrator;
    if orchestrator_config.sends_plaintext_credentials() {
        tracing::warn!(
            scheme = %orchestrator_config.agent_scheme,
            "agent passwords are sent unencrypted; set orchestrator.agent_scheme = \"https\" behind TLS"
        );
    }
    let local = Arc::new(remote::LocalExecutor::new(local_storage(&app_config)));
    let http = Arc::new(remote::HttpExecutor::new(
        &orchestrator_config.agent_scheme,
        orchestrator_config.agent_port,
        orchestrator_config.request_timeout(),
    )?);
    let executor = Arc::new(remote::RoutingExecutor::new(
        local,
        http,
        orchestrator_config.local_aliases.clone(),
    ));

    let audit = match open_audit(&app_config).await {
        Ok(audit) => audit,
        Err(e) => {
            tracing::warn!(error = %e, path = %app_config.audit.path, "audit log unavailable; continuing without it");
            None
        }
    };
    if let Some(repo) = &audit {
        match repo.prune_old_data().await {
            Ok(removed) => tracing::debug!(removed, operation = "prune_old_data", "audit log pruned"),
            Err(e) => tracing::warn!(error = %e, operation = "prune_old_data", "failed to prune audit log"),
        }
    }

    let orchestrator = session::Orchestrator::new(
        executor,
        session::SessionSettings::from(orchestrator_config),
        audit,
    );
    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let last = orchestrator.run_loop(&mut stdin, &mut stdout).await?;

    Ok(match last {
        Some(outcome) if outcome.needs_attention() => ExitCode::from(1),
        _ => ExitCode::SUCCESS,
    })
}

async fn run_agent(app_config: config::AppConfig) -> Result<()> {
    app_config.validate_agent()?;
    let agent_config = &app_config.agent;
    if agent_config.resize_command.is_empty() {
        tracing::warn!("agent.resize_command is not set; resize requests will be refused");
    }

    let app = agent::app(
        local_storage(&app_config),
        remote::Credentials::new(&agent_config.username, &agent_config.password),
    );
    let addr = format!("{}:{}", agent_config.host, agent_config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Agent listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Received shutdown signal");
}

async fn run_history(app_config: config::AppConfig, limit: u32) -> Result<()> {
    let Some(repo) = open_audit(&app_config).await? else {
        anyhow::bail!("audit log is disabled (audit.enabled = false)");
    };
    for record in repo.recent(limit).await? {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}
