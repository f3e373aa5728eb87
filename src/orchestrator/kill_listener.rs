//! Remote kill listener — inbound kill commands become termination
//! triggers.
//!
//! The handler never touches coordinator state directly: it forwards a
//! message over the trigger channel into the single task that owns the
//! one-shot cleanup guard, so a kill racing a natural process exit can
//! never double-run cleanup.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::session::SessionHandle;

use super::TerminationTrigger;

/// RPC command name a remote actor uses to terminate the session.
pub const KILL_COMMAND: &str = "kill";

/// Register the kill handler on the session's RPC surface.
///
/// The handler raises [`TerminationTrigger::RemoteKill`] immediately so a
/// concurrently waiting supervisor unblocks; terminating the process is
/// the cleanup coordinator's job. Repeat invocations enqueue further
/// triggers, which the coordinator drops as no-ops.
pub fn register(handle: &dyn SessionHandle, triggers: mpsc::Sender<TerminationTrigger>) {
    handle.register_rpc_handler(
        KILL_COMMAND,
        Box::new(move || {
            info!("remote kill requested");
            if let Err(err) = triggers.try_send(TerminationTrigger::RemoteKill) {
                debug!(%err, "kill trigger not enqueued; cleanup already underway");
            }
        }),
    );
}
