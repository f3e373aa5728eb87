//! Tool process launcher.
//!
//! Spawns the interactive tool with stdin/stdout/stderr inherited from the
//! host, so the operator talks to the tool directly. The child is spawned
//! with `kill_on_drop(true)` for safety; orderly termination is the
//! cleanup coordinator's job.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::config::SupervisorConfig;
use crate::mode::PermissionMode;
use crate::{AppError, Result};

/// Everything the launcher needs, resolved up front.
///
/// Ambient state (invoking directory, caller environment, home directory)
/// is captured once in [`LauncherConfig::resolve`]; spawning itself reads
/// no process-global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    /// Tool binary to launch.
    pub tool: String,
    /// Base arguments always passed before mode flags.
    pub base_args: Vec<String>,
    /// Working directory for the child.
    pub workdir: PathBuf,
    /// Environment variables set on the child beyond the inherited ones.
    pub env_overrides: Vec<(String, String)>,
}

impl LauncherConfig {
    /// Capture ambient inputs and produce a concrete launcher config.
    ///
    /// The tool home variable is only overridden when the caller's
    /// environment does not already set it; the default points at a fixed
    /// subdirectory of the user's home.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the working directory or the user's
    /// home directory cannot be determined.
    pub fn resolve(config: &SupervisorConfig) -> Result<Self> {
        let workdir = match config.workdir {
            Some(ref dir) => dir.clone(),
            None => std::env::current_dir()
                .map_err(|err| AppError::Config(format!("cannot determine working directory: {err}")))?,
        };

        let mut env_overrides = Vec::new();
        if std::env::var_os(&config.tool_home_env).is_none() {
            let home = dirs::home_dir()
                .ok_or_else(|| AppError::Config("cannot determine home directory".into()))?;
            let tool_home = home.join(&config.tool_home_subdir);
            env_overrides.push((
                config.tool_home_env.clone(),
                tool_home.to_string_lossy().into_owned(),
            ));
        }

        Ok(Self {
            tool: config.tool.clone(),
            base_args: config.tool_args.clone(),
            workdir,
            env_overrides,
        })
    }
}

/// Full command line for a launch: program, base arguments, mode flags,
/// then passthrough arguments in caller order.
#[must_use]
pub fn command_line(
    config: &LauncherConfig,
    mode: PermissionMode,
    passthrough: &[String],
) -> Vec<String> {
    let mut argv = Vec::with_capacity(
        1 + config.base_args.len() + mode.cli_flags().len() + passthrough.len(),
    );
    argv.push(config.tool.clone());
    argv.extend(config.base_args.iter().cloned());
    argv.extend(mode.cli_flags().iter().map(|flag| (*flag).to_owned()));
    argv.extend(passthrough.iter().cloned());
    argv
}

/// Spawn the tool process with inherited standard streams.
///
/// # Errors
///
/// Returns `AppError::Spawn` when the binary is missing or unspawnable.
/// Callers convert this into a process-error termination trigger so that
/// cleanup still runs.
pub fn spawn_tool(
    config: &LauncherConfig,
    mode: PermissionMode,
    passthrough: &[String],
) -> Result<Child> {
    if mode.is_dangerous() {
        warn!(tool = %config.tool, "approvals and sandboxing disabled for this run");
    }
    debug!(argv = ?command_line(config, mode, passthrough), "launching tool");

    let mut cmd = Command::new(&config.tool);
    cmd.args(&config.base_args)
        .args(mode.cli_flags())
        .args(passthrough)
        .current_dir(&config.workdir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    for (key, value) in &config.env_overrides {
        cmd.env(key, value);
    }

    cmd.spawn()
        .map_err(|err| AppError::Spawn(format!("failed to spawn {}: {err}", config.tool)))
}
