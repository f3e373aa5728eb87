//! Local session registrar — fallback backend when no remote sync service
//! is attached.
//!
//! Session records are persisted as JSON documents under the state
//! directory. The session's RPC surface is a local socket (named pipe on
//! Windows, Unix domain socket elsewhere) accepting line-delimited JSON
//! commands from `agent-tether-ctl`.
//!
//! ## Protocol
//!
//! Request (one JSON object per line):
//! ```json
//! {"command": "kill"}
//! {"command": "ping"}
//! ```
//!
//! Response (one JSON object per line):
//! ```json
//! {"ok": true}
//! {"ok": false, "error": "unknown command: foo"}
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use interprocess::local_socket::{tokio::prelude::*, GenericNamespaced, ListenerOptions};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::models::session::{LifecycleState, SessionMetadata, SessionRecord};
use crate::session::{RecordMutator, RpcHandler, SessionHandle, SessionRegistrar};
use crate::{AppError, Result};

/// Handlers registered against a session's RPC surface, keyed by command.
type RpcHandlers = Arc<Mutex<HashMap<String, RpcHandler>>>;

/// Inbound RPC request line.
#[derive(Debug, Deserialize)]
struct RpcRequest {
    /// Command verb. Kill requests carry no payload.
    command: String,
}

/// Outbound RPC response line.
#[derive(Debug, Serialize)]
struct RpcResponse {
    /// Whether the command was dispatched to a handler.
    ok: bool,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RpcResponse {
    fn success() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
        }
    }
}

/// File-backed registrar used when the supervisor runs without a remote
/// backend.
pub struct LocalRegistrar {
    state_dir: PathBuf,
    rpc_socket: String,
}

impl LocalRegistrar {
    /// Create a registrar rooted at `state_dir`, exposing each session's
    /// RPC surface on the `rpc_socket` local socket name.
    #[must_use]
    pub fn new(state_dir: PathBuf, rpc_socket: String) -> Self {
        Self {
            state_dir,
            rpc_socket,
        }
    }

    fn record_path(&self, tag: &str) -> PathBuf {
        self.state_dir.join("sessions").join(format!("{tag}.json"))
    }

    /// Load a previously persisted record for `tag`, if any.
    async fn load_record(&self, tag: &str) -> Option<SessionRecord> {
        let raw = tokio::fs::read_to_string(self.record_path(tag)).await.ok()?;
        match serde_json::from_str::<SessionRecord>(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(tag, %err, "discarding unreadable session record");
                None
            }
        }
    }
}

impl SessionRegistrar for LocalRegistrar {
    fn create_or_get_session(
        &self,
        tag: &str,
        metadata: SessionMetadata,
        initial_state: LifecycleState,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn SessionHandle>>> + Send + '_>> {
        let tag = tag.to_owned();
        Box::pin(async move {
            // An archived record is terminal; a reused tag gets a fresh
            // record so the lifecycle stays monotonic per record.
            let record = match self.load_record(&tag).await {
                Some(existing) if !existing.is_archived() => {
                    info!(tag, session_id = %existing.id, "reusing live session record");
                    existing
                }
                _ => {
                    let mut record = SessionRecord::new(tag.clone(), metadata);
                    record.state = initial_state;
                    info!(tag, session_id = %record.id, "created session record");
                    record
                }
            };

            let handle = LocalSessionHandle::start(
                record,
                self.record_path(&tag),
                &self.rpc_socket,
            )?;
            handle.flush().await?;
            Ok(Arc::new(handle) as Arc<dyn SessionHandle>)
        })
    }
}

/// Live handle over a locally persisted session record.
pub struct LocalSessionHandle {
    tag: String,
    record: tokio::sync::Mutex<SessionRecord>,
    path: PathBuf,
    handlers: RpcHandlers,
    cancel: CancellationToken,
}

impl LocalSessionHandle {
    /// Bind the RPC socket and wrap `record` in a live handle.
    fn start(record: SessionRecord, path: PathBuf, rpc_socket: &str) -> Result<Self> {
        let handlers: RpcHandlers = Arc::new(Mutex::new(HashMap::new()));
        let cancel = CancellationToken::new();
        spawn_rpc_listener(rpc_socket, Arc::clone(&handlers), cancel.clone())?;

        Ok(Self {
            tag: record.tag.clone(),
            record: tokio::sync::Mutex::new(record),
            path,
            handlers,
            cancel,
        })
    }
}

impl SessionHandle for LocalSessionHandle {
    fn identity(&self) -> &str {
        &self.tag
    }

    fn register_rpc_handler(&self, name: &str, handler: RpcHandler) {
        if let Ok(mut guard) = self.handlers.lock() {
            if guard.insert(name.to_owned(), handler).is_some() {
                debug!(command = name, "replaced rpc handler");
            }
        }
    }

    fn update_metadata(&self, mutate: RecordMutator) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut record = self.record.lock().await;
            mutate(&mut record);
            Ok(())
        })
    }

    fn send_death_notice(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            // Local observers are socket clients; they learn of death when
            // the RPC surface goes away on close.
            debug!(tag = %self.tag, "death notice (local backend, no remote observers)");
            Ok(())
        })
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let serialized = {
                let record = self.record.lock().await;
                serde_json::to_string_pretty(&*record)
                    .map_err(|err| AppError::Remote(format!("serialize session record: {err}")))?
            };
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| AppError::Remote(format!("create state dir: {err}")))?;
            }
            tokio::fs::write(&self.path, serialized)
                .await
                .map_err(|err| AppError::Remote(format!("persist session record: {err}")))?;
            Ok(())
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.cancel.cancel();
            info!(tag = %self.tag, "session handle closed");
            Ok(())
        })
    }
}

/// Spawn the RPC listener task for a session.
///
/// # Errors
///
/// Returns `AppError::Remote` if the local socket cannot be created.
fn spawn_rpc_listener(
    socket_name: &str,
    handlers: RpcHandlers,
    cancel: CancellationToken,
) -> Result<()> {
    let name = socket_name.to_owned();
    let listener_name = name
        .clone()
        .to_ns_name::<GenericNamespaced>()
        .map_err(|err| AppError::Remote(format!("invalid rpc socket name '{name}': {err}")))?;

    let listener = ListenerOptions::new()
        .name(listener_name)
        .create_tokio()
        .map_err(|err| AppError::Remote(format!("failed to create rpc listener: {err}")))?;

    info!(rpc_socket = %name, "session RPC surface listening");

    tokio::spawn(async move {
        let span = info_span!("rpc_listener", socket = %name);
        async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("RPC listener shutting down");
                        break;
                    }
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok(stream) => {
                                let handlers = Arc::clone(&handlers);
                                tokio::spawn(handle_connection(stream, handlers));
                            }
                            Err(err) => {
                                warn!(%err, "RPC accept failed");
                            }
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await;
    });

    Ok(())
}

/// Handle a single RPC client connection.
async fn handle_connection(
    stream: interprocess::local_socket::tokio::Stream,
    handlers: RpcHandlers,
) {
    let span = info_span!("rpc_conn");
    async move {
        let (reader, mut writer) = stream.split();
        let mut buf_reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            match buf_reader.read_line(&mut line).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let response = match serde_json::from_str::<RpcRequest>(trimmed) {
                        Ok(request) => dispatch_command(&request.command, &handlers),
                        Err(err) => RpcResponse::error(format!("invalid json: {err}")),
                    };

                    let mut response_line = serde_json::to_string(&response)
                        .unwrap_or_else(|_| r#"{"ok":false,"error":"serialization failed"}"#.to_owned());
                    response_line.push('\n');

                    if let Err(err) = writer.write_all(response_line.as_bytes()).await {
                        warn!(%err, "failed to write rpc response");
                        break;
                    }
                }
                Err(err) => {
                    warn!(%err, "rpc read error");
                    break;
                }
            }
        }

        debug!("RPC connection closed");
    }
    .instrument(span)
    .await;
}

/// Route an RPC command to its registered handler.
fn dispatch_command(command: &str, handlers: &RpcHandlers) -> RpcResponse {
    let Ok(guard) = handlers.lock() else {
        return RpcResponse::error("handler registry poisoned");
    };
    match guard.get(command) {
        Some(handler) => {
            info!(command, "dispatching rpc command");
            handler();
            RpcResponse::success()
        }
        None if command == "ping" => RpcResponse::success(),
        None => RpcResponse::error(format!("unknown command: {command}")),
    }
}
