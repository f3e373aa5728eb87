#![forbid(unsafe_code)]

//! `agent-tether` — supervise an interactive coding agent bound to a
//! tracked session.
//!
//! Spawns the tool with inherited standard streams, registers the session
//! with the registrar backend, and guarantees that process termination and
//! session archival happen exactly once on every exit path.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use agent_tether::config::SupervisorConfig;
use agent_tether::daemon;
use agent_tether::mode::PermissionMode;
use agent_tether::models::session::{LifecycleState, SessionMetadata};
use agent_tether::orchestrator::cleanup::{CleanupCoordinator, GraceWindows};
use agent_tether::orchestrator::launcher::LauncherConfig;
use agent_tether::orchestrator::{self, TerminationTrigger};
use agent_tether::session::local::LocalRegistrar;
use agent_tether::session::SessionRegistrar;
use agent_tether::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "agent-tether",
    about = "Supervise an interactive coding agent bound to a tracked session",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Permission mode for the tool. Overrides the config file.
    #[arg(long, value_enum)]
    mode: Option<PermissionMode>,

    /// Tool binary to launch. Overrides the config file.
    #[arg(long)]
    tool: Option<String>,

    /// Stable session identity tag. Overrides the config file.
    #[arg(long)]
    session: Option<String>,

    /// Arguments passed through to the tool verbatim, after `--`.
    #[arg(last = true)]
    tool_args: Vec<String>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("agent-tether bootstrap");

    let code = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))?;

    std::process::exit(code);
}

async fn run(args: Cli) -> Result<i32> {
    // ── Load configuration ──────────────────────────────
    let mut config = match args.config {
        Some(ref path) => SupervisorConfig::load_from_path(path)?,
        None => SupervisorConfig::default(),
    };
    if let Some(tool) = args.tool {
        config.tool = tool;
    }
    if let Some(tag) = args.session {
        config.session_tag = Some(tag);
    }
    let mode = args.mode.unwrap_or(config.mode);
    info!(tool = %config.tool, ?mode, "configuration loaded");

    // ── Register the session ────────────────────────────
    let registrar = LocalRegistrar::new(config.resolved_state_dir()?, config.rpc_socket.clone());

    let tag = config.effective_session_tag();
    let mut metadata = SessionMetadata::new();
    metadata.insert("tool", config.tool.clone());
    metadata.insert("mode", serde_json::json!(mode));
    metadata.insert("started_by", "cli");

    let handle = registrar
        .create_or_get_session(&tag, metadata.clone(), LifecycleState::Running)
        .await?;
    info!(session = %tag, "session registered");

    // ── Announce to the daemon, if one is configured ────
    if let Some(ref daemon_socket) = config.daemon_socket {
        daemon::notify_session_started(daemon_socket, &tag, &metadata).await;
    }

    // ── Supervise until termination ─────────────────────
    let grace = GraceWindows {
        remote_kill: config.remote_kill_grace(),
        local: config.cleanup_grace(),
    };

    let code = match LauncherConfig::resolve(&config) {
        Ok(launcher_config) => {
            orchestrator::supervise(&launcher_config, mode, &args.tool_args, handle, grace).await
        }
        Err(err) => {
            error!(%err, "failed to prepare launcher");
            CleanupCoordinator::new(None, handle, grace)
                .run(TerminationTrigger::Fault(err.to_string()))
                .await
        }
    };

    Ok(code)
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
