//! Supervision core: spawn the tool, wait for a termination trigger,
//! tear everything down exactly once.
//!
//! Two independent signal sources, the exit watcher and the remote kill
//! listener, feed a single mpsc channel. The supervision task suspends at
//! one `select!` point until the first trigger arrives; the cleanup
//! coordinator then owns the process and session handles for the rest of
//! the run.

pub mod cleanup;
pub mod exit_watcher;
pub mod kill_listener;
pub mod launcher;

use std::process::ExitStatus;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::mode::PermissionMode;
use crate::session::SessionHandle;
use self::cleanup::{CleanupCoordinator, GraceWindows};
use self::launcher::LauncherConfig;

/// Event capable of initiating the cleanup sequence.
///
/// Carries enough context to log and to phrase the archival reason; the
/// cleanup sequence itself is identical regardless of variant.
#[derive(Debug)]
pub enum TerminationTrigger {
    /// A remote actor requested termination of this session.
    RemoteKill,
    /// The child process exited on its own.
    ProcessExited(ExitStatus),
    /// The child process could not be spawned or failed while running.
    ProcessError(String),
    /// A local failure outside the child process.
    Fault(String),
}

impl TerminationTrigger {
    /// Human-readable description for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::RemoteKill => "remote kill request".to_owned(),
            Self::ProcessExited(status) => {
                if status.success() {
                    "process exited normally (code 0)".to_owned()
                } else {
                    status.code().map_or_else(
                        || "process terminated by signal".to_owned(),
                        |code| format!("process exited with code {code}"),
                    )
                }
            }
            Self::ProcessError(msg) => format!("process error: {msg}"),
            Self::Fault(msg) => format!("local fault: {msg}"),
        }
    }

    /// Reason recorded in the session metadata at archival.
    #[must_use]
    pub fn archive_reason(&self) -> &'static str {
        match self {
            Self::RemoteKill => "User terminated",
            Self::ProcessExited(_) => "Process exited",
            Self::ProcessError(_) => "Process failed",
            Self::Fault(_) => "Internal error",
        }
    }

    /// Whether termination was requested by a remote actor.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteKill)
    }
}

/// Run the tool under supervision until the first termination trigger,
/// then perform the full cleanup sequence. Returns the host exit code.
pub async fn supervise(
    launcher_config: &LauncherConfig,
    mode: PermissionMode,
    passthrough: &[String],
    handle: Arc<dyn SessionHandle>,
    grace: GraceWindows,
) -> i32 {
    let (trigger_tx, mut trigger_rx) = mpsc::channel::<TerminationTrigger>(8);
    kill_listener::register(handle.as_ref(), trigger_tx);

    match launcher::spawn_tool(launcher_config, mode, passthrough) {
        Ok(mut child) => {
            info!(
                pid = child.id().unwrap_or(0),
                tool = %launcher_config.tool,
                "tool process spawned"
            );

            let trigger = tokio::select! {
                trigger = exit_watcher::wait_for_exit(&mut child) => trigger,
                Some(trigger) = trigger_rx.recv() => trigger,
            };

            CleanupCoordinator::new(Some(child), handle, grace)
                .run(trigger)
                .await
        }
        Err(err) => {
            error!(
                %err,
                tool = %launcher_config.tool,
                "failed to start tool; check that it is installed and on your PATH"
            );
            let trigger = TerminationTrigger::ProcessError(err.to_string());
            CleanupCoordinator::new(None, handle, grace).run(trigger).await
        }
    }
}
