//! Best-effort notification to a local session daemon.
//!
//! When a daemon socket is configured, the supervisor announces the newly
//! started session with a single JSON line over the local socket. The
//! daemon is optional: connect failures are logged at debug level and
//! otherwise ignored.

use interprocess::local_socket::traits::tokio::Stream as _;
use interprocess::local_socket::{tokio::Stream, GenericNamespaced, ToNsName};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::models::session::SessionMetadata;

/// One-line event announcing a started session.
#[derive(Debug, Serialize)]
struct SessionStartedEvent<'a> {
    event: &'static str,
    tag: &'a str,
    metadata: &'a SessionMetadata,
}

/// Announce the session identified by `tag` to the daemon listening on
/// `socket_name`.
///
/// Absence of a daemon is not an error; every failure path is a
/// debug-logged no-op.
pub async fn notify_session_started(socket_name: &str, tag: &str, metadata: &SessionMetadata) {
    let Ok(name) = socket_name.to_ns_name::<GenericNamespaced>() else {
        debug!(socket = socket_name, "invalid daemon socket name, skipping notification");
        return;
    };

    let mut stream = match Stream::connect(name).await {
        Ok(stream) => stream,
        Err(err) => {
            debug!(%err, socket = socket_name, "session daemon not reachable, skipping notification");
            return;
        }
    };

    let event = SessionStartedEvent {
        event: "session_started",
        tag,
        metadata,
    };

    let Ok(mut line) = serde_json::to_string(&event) else {
        debug!("could not serialize session start event");
        return;
    };
    line.push('\n');

    if let Err(err) = stream.write_all(line.as_bytes()).await {
        debug!(%err, "failed to write session start notification");
    }
}
