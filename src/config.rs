//! Supervisor configuration parsing and validation.
//!
//! All ambient inputs (working directory, home directory, environment) are
//! resolved once into explicit structs; no component reads process-global
//! state after startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

use crate::mode::PermissionMode;
use crate::{AppError, Result};

fn default_tool() -> String {
    "codex".into()
}

fn default_tool_home_env() -> String {
    "CODEX_HOME".into()
}

fn default_tool_home_subdir() -> String {
    ".agent-tether/tool-home".into()
}

fn default_remote_kill_grace_ms() -> u64 {
    2000
}

fn default_cleanup_grace_ms() -> u64 {
    1000
}

fn default_rpc_socket() -> String {
    "agent-tether".into()
}

/// Global configuration parsed from `config.toml`.
///
/// Every field has a default; the config file itself is optional.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SupervisorConfig {
    /// Tool binary to launch (e.g. `codex`).
    #[serde(default = "default_tool")]
    pub tool: String,
    /// Base arguments always passed to the tool, before mode flags.
    #[serde(default)]
    pub tool_args: Vec<String>,
    /// Default permission mode when `--mode` is not given.
    #[serde(default)]
    pub mode: PermissionMode,
    /// Working directory for the tool. Defaults to the invoking directory.
    #[serde(default)]
    pub workdir: Option<PathBuf>,
    /// Environment variable naming the tool's home/config directory.
    #[serde(default = "default_tool_home_env")]
    pub tool_home_env: String,
    /// Subdirectory under the user's home used when the variable is unset.
    #[serde(default = "default_tool_home_subdir")]
    pub tool_home_subdir: String,
    /// Grace window before force-kill when teardown is remotely requested.
    #[serde(default = "default_remote_kill_grace_ms")]
    pub remote_kill_grace_ms: u64,
    /// Grace window before force-kill on local cleanup and error paths.
    #[serde(default = "default_cleanup_grace_ms")]
    pub cleanup_grace_ms: u64,
    /// Directory for locally persisted session records.
    /// Defaults to `.agent-tether` under the user's home.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    /// Local socket name the session's RPC surface listens on.
    #[serde(default = "default_rpc_socket")]
    pub rpc_socket: String,
    /// Local socket name of the optional notification daemon.
    #[serde(default)]
    pub daemon_socket: Option<String>,
    /// Stable identity tag for the session. Generated when absent.
    #[serde(default)]
    pub session_tag: Option<String>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            tool_args: Vec::new(),
            mode: PermissionMode::default(),
            workdir: None,
            tool_home_env: default_tool_home_env(),
            tool_home_subdir: default_tool_home_subdir(),
            remote_kill_grace_ms: default_remote_kill_grace_ms(),
            cleanup_grace_ms: default_cleanup_grace_ms(),
            state_dir: None,
            rpc_socket: default_rpc_socket(),
            daemon_socket: None,
            session_tag: None,
        }
    }
}

impl SupervisorConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Grace window applied when teardown was requested remotely.
    #[must_use]
    pub fn remote_kill_grace(&self) -> Duration {
        Duration::from_millis(self.remote_kill_grace_ms)
    }

    /// Grace window applied on local cleanup and error paths.
    #[must_use]
    pub fn cleanup_grace(&self) -> Duration {
        Duration::from_millis(self.cleanup_grace_ms)
    }

    /// Resolved directory for locally persisted session records.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when no explicit `state_dir` is set and
    /// the user's home directory cannot be determined.
    pub fn resolved_state_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.state_dir {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(".agent-tether"))
            .ok_or_else(|| AppError::Config("cannot determine home directory".into()))
    }

    /// Session identity tag, generating a fresh one when unconfigured.
    #[must_use]
    pub fn effective_session_tag(&self) -> String {
        self.session_tag
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    fn validate(&self) -> Result<()> {
        if self.tool.trim().is_empty() {
            return Err(AppError::Config("tool must not be empty".into()));
        }
        if self.remote_kill_grace_ms == 0 || self.cleanup_grace_ms == 0 {
            return Err(AppError::Config(
                "grace windows must be greater than zero".into(),
            ));
        }
        if self.rpc_socket.trim().is_empty() {
            return Err(AppError::Config("rpc_socket must not be empty".into()));
        }
        Ok(())
    }
}
