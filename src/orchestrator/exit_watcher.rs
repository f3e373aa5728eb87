//! Exit watcher — turns child process termination into a trigger.

use tokio::process::Child;

use super::TerminationTrigger;

/// Wait for the child to terminate and map the outcome to a trigger.
///
/// Resolves exactly once: either the process exited (carrying its exit
/// status) or waiting on it failed. The caller races this against the
/// remote kill channel; whichever side fires first wins, and the cleanup
/// coordinator's one-shot guard absorbs the loser.
pub async fn wait_for_exit(child: &mut Child) -> TerminationTrigger {
    match child.wait().await {
        Ok(status) => TerminationTrigger::ProcessExited(status),
        Err(err) => TerminationTrigger::ProcessError(format!("wait on child failed: {err}")),
    }
}
