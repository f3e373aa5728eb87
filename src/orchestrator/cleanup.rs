//! Cleanup coordinator — escalating teardown of process and session.
//!
//! Runs exactly once per supervisor lifetime, from whichever trigger
//! arrives first. Escalation: graceful termination signal, bounded grace
//! wait, forceful kill. Session teardown: archive, death notice, flush,
//! close. Every backend-facing step degrades to log-and-continue so the
//! host process always exits even when the backend is unreachable.

use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tokio::time::timeout;
use tracing::{info, info_span, warn};

use crate::session::SessionHandle;
use crate::Result;

use super::TerminationTrigger;

/// Actor recorded in the session metadata when this process archives it.
const ARCHIVE_ACTOR: &str = "cli";

/// Bounded wait between the graceful signal and the forceful kill.
///
/// A remote-initiated kill affords slightly more grace than local cleanup;
/// the two windows are configured independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraceWindows {
    /// Window applied when a remote actor requested termination.
    pub remote_kill: Duration,
    /// Window applied on local cleanup and error paths.
    pub local: Duration,
}

impl Default for GraceWindows {
    fn default() -> Self {
        Self {
            remote_kill: Duration::from_secs(2),
            local: Duration::from_secs(1),
        }
    }
}

impl GraceWindows {
    /// Window to apply for the given trigger source.
    #[must_use]
    pub fn for_trigger(&self, trigger: &TerminationTrigger) -> Duration {
        if trigger.is_remote() {
            self.remote_kill
        } else {
            self.local
        }
    }
}

/// Progress of the one-shot cleanup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPhase {
    /// Cleanup has not started.
    Idle,
    /// Terminating the child process.
    Escalating,
    /// Archiving and closing the session record.
    SessionClosing,
    /// Cleanup finished; the host may exit.
    Done,
}

/// Owns the process and session handles for the teardown of a run.
pub struct CleanupCoordinator {
    phase: CleanupPhase,
    child: Option<Child>,
    handle: Option<Arc<dyn SessionHandle>>,
    grace: GraceWindows,
}

impl CleanupCoordinator {
    /// Build a coordinator over the spawned child (if any) and the session
    /// handle. `child` is `None` when the spawn itself failed.
    #[must_use]
    pub fn new(
        child: Option<Child>,
        handle: Arc<dyn SessionHandle>,
        grace: GraceWindows,
    ) -> Self {
        Self {
            phase: CleanupPhase::Idle,
            child,
            handle: Some(handle),
            grace,
        }
    }

    /// Current phase of the teardown sequence.
    #[must_use]
    pub fn phase(&self) -> CleanupPhase {
        self.phase
    }

    /// Execute the full cleanup sequence for `trigger`.
    ///
    /// Idempotent: only the first invocation runs; later triggers are
    /// logged and dropped. Returns the host exit code, which is 0 on every
    /// termination path; the child's own exit status is logged, never
    /// propagated.
    pub async fn run(&mut self, trigger: TerminationTrigger) -> i32 {
        if self.phase != CleanupPhase::Idle {
            warn!(
                trigger = %trigger.describe(),
                phase = ?self.phase,
                "cleanup already started, dropping trigger"
            );
            return 0;
        }

        let span = info_span!("cleanup", trigger = %trigger.describe());
        let _guard = span.enter();
        info!("starting cleanup");

        self.phase = CleanupPhase::Escalating;
        self.escalate(self.grace.for_trigger(&trigger)).await;

        self.phase = CleanupPhase::SessionClosing;
        self.teardown_session(trigger.archive_reason()).await;

        self.phase = CleanupPhase::Done;
        info!("cleanup complete");
        0
    }

    /// Terminate the child: graceful signal, bounded grace wait, then
    /// forceful kill. No escalation beyond the forceful kill; a failure
    /// there is logged, not retried.
    async fn escalate(&mut self, grace: Duration) {
        let Some(mut child) = self.child.take() else {
            info!("no live process to terminate");
            return;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                info!(?status, "process already exited");
                return;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(%err, "could not poll process state");
            }
        }

        if let Err(err) = send_graceful(&child) {
            warn!(%err, "graceful termination signal rejected, will force-kill");
        }

        match timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                info!(?status, "process exited within grace window");
            }
            Ok(Err(err)) => {
                warn!(%err, "error waiting for process during grace window");
            }
            Err(_) => {
                warn!(?grace, "process outlived grace window, forcing kill");
                if let Err(err) = child.kill().await {
                    warn!(%err, "failed to force-kill process");
                }
            }
        }
    }

    /// Archive, announce, flush and close the session. Each step is
    /// best-effort; a backend failure never blocks the next step.
    async fn teardown_session(&mut self, reason: &'static str) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        if let Err(err) = handle
            .update_metadata(Box::new(move |record| {
                let _ = record.archive(ARCHIVE_ACTOR, reason);
            }))
            .await
        {
            warn!(%err, "failed to archive session");
        }

        if let Err(err) = handle.send_death_notice().await {
            warn!(%err, "failed to send session death notice");
        }

        if let Err(err) = handle.flush().await {
            warn!(%err, "failed to flush session state");
        }

        if let Err(err) = handle.close().await {
            warn!(%err, "failed to close session handle");
        }

        info!("session released");
    }
}

/// Ask the child to terminate gracefully.
///
/// # Errors
///
/// Returns `AppError::Signal` when the OS rejects the signal; the caller
/// escalates to a forceful kill regardless.
#[cfg(unix)]
fn send_graceful(child: &Child) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    use crate::AppError;

    let Some(pid) = child.id() else {
        // Already reaped.
        return Ok(());
    };
    let pid = i32::try_from(pid)
        .map_err(|_| AppError::Signal(format!("pid {pid} out of range")))?;
    kill(Pid::from_raw(pid), Signal::SIGTERM)
        .map_err(|err| AppError::Signal(format!("SIGTERM rejected: {err}")))
}

/// Non-unix platforms have no graceful signal distinct from kill; the
/// grace wait still gives the child a chance to exit on its own.
#[cfg(not(unix))]
fn send_graceful(_child: &Child) -> Result<()> {
    Ok(())
}
