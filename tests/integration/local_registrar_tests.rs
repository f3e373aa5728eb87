//! Integration tests for the local file-backed registrar and its RPC
//! socket surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use interprocess::local_socket::traits::tokio::Stream as _;
use interprocess::local_socket::{tokio::Stream, GenericNamespaced, ToNsName};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use agent_tether::models::session::{LifecycleState, SessionMetadata, SessionRecord};
use agent_tether::session::local::LocalRegistrar;
use agent_tether::session::SessionRegistrar;

fn unique_socket() -> String {
    format!("agent-tether-test-{}", uuid::Uuid::new_v4())
}

async fn send_line(socket: &str, line: &str) -> serde_json::Value {
    let name = socket
        .to_owned()
        .to_ns_name::<GenericNamespaced>()
        .expect("socket name");
    let stream = Stream::connect(name).await.expect("connect rpc socket");
    let (reader, mut writer) = stream.split();

    writer
        .write_all(format!("{line}\n").as_bytes())
        .await
        .expect("write request");

    let mut buf_reader = BufReader::new(reader);
    let mut response = String::new();
    buf_reader.read_line(&mut response).await.expect("read response");
    serde_json::from_str(response.trim()).expect("valid json response")
}

// ── Record persistence ───────────────────────────────────────

#[tokio::test]
async fn create_persists_record_under_state_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registrar = LocalRegistrar::new(dir.path().to_path_buf(), unique_socket());

    let mut metadata = SessionMetadata::new();
    metadata.insert("tool", "codex");
    let handle = registrar
        .create_or_get_session("alpha", metadata, LifecycleState::Running)
        .await
        .expect("create session");
    assert_eq!(handle.identity(), "alpha");

    let raw = tokio::fs::read_to_string(dir.path().join("sessions").join("alpha.json"))
        .await
        .expect("record file exists");
    let record: SessionRecord = serde_json::from_str(&raw).expect("valid record");
    assert_eq!(record.tag, "alpha");
    assert_eq!(record.state, LifecycleState::Running);
    assert_eq!(record.metadata.get("tool").and_then(|v| v.as_str()), Some("codex"));
}

#[tokio::test]
async fn live_record_is_reused_for_the_same_tag() {
    let dir = tempfile::tempdir().expect("tempdir");

    let first = LocalRegistrar::new(dir.path().to_path_buf(), unique_socket());
    let handle = first
        .create_or_get_session("beta", SessionMetadata::new(), LifecycleState::Running)
        .await
        .expect("create session");
    handle.close().await.expect("close");

    let raw = tokio::fs::read_to_string(dir.path().join("sessions").join("beta.json"))
        .await
        .expect("record file");
    let original: SessionRecord = serde_json::from_str(&raw).expect("record");

    // A second run with the same tag picks the live record back up.
    let second = LocalRegistrar::new(dir.path().to_path_buf(), unique_socket());
    let reused = second
        .create_or_get_session("beta", SessionMetadata::new(), LifecycleState::Running)
        .await
        .expect("reopen session");
    reused.flush().await.expect("flush");

    let raw = tokio::fs::read_to_string(dir.path().join("sessions").join("beta.json"))
        .await
        .expect("record file");
    let record: SessionRecord = serde_json::from_str(&raw).expect("record");
    assert_eq!(record.id, original.id, "live record keeps its identity");
}

#[tokio::test]
async fn archived_record_is_replaced_by_a_fresh_one() {
    let dir = tempfile::tempdir().expect("tempdir");

    let first = LocalRegistrar::new(dir.path().to_path_buf(), unique_socket());
    let handle = first
        .create_or_get_session("gamma", SessionMetadata::new(), LifecycleState::Running)
        .await
        .expect("create session");
    handle
        .update_metadata(Box::new(|record| {
            let _ = record.archive("cli", "User terminated");
        }))
        .await
        .expect("archive");
    handle.flush().await.expect("flush");
    handle.close().await.expect("close");

    let raw = tokio::fs::read_to_string(dir.path().join("sessions").join("gamma.json"))
        .await
        .expect("record file");
    let archived: SessionRecord = serde_json::from_str(&raw).expect("record");
    assert_eq!(archived.state, LifecycleState::Archived);

    let second = LocalRegistrar::new(dir.path().to_path_buf(), unique_socket());
    let fresh = second
        .create_or_get_session("gamma", SessionMetadata::new(), LifecycleState::Running)
        .await
        .expect("recreate session");
    fresh.flush().await.expect("flush");

    let raw = tokio::fs::read_to_string(dir.path().join("sessions").join("gamma.json"))
        .await
        .expect("record file");
    let record: SessionRecord = serde_json::from_str(&raw).expect("record");
    assert_ne!(record.id, archived.id, "archived records are terminal");
    assert_eq!(record.state, LifecycleState::Running);
}

// ── RPC surface ──────────────────────────────────────────────

#[tokio::test]
async fn rpc_socket_dispatches_registered_command() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = unique_socket();
    let registrar = LocalRegistrar::new(dir.path().to_path_buf(), socket.clone());

    let handle = registrar
        .create_or_get_session("delta", SessionMetadata::new(), LifecycleState::Running)
        .await
        .expect("create session");

    let fired = Arc::new(AtomicBool::new(false));
    let fired_clone = Arc::clone(&fired);
    handle.register_rpc_handler(
        "kill",
        Box::new(move || {
            fired_clone.store(true, Ordering::SeqCst);
        }),
    );

    let response = send_line(&socket, r#"{"command": "kill"}"#).await;
    assert_eq!(response["ok"], serde_json::Value::Bool(true));

    // The handler runs synchronously in the dispatch path.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(fired.load(Ordering::SeqCst), "kill handler fired");

    handle.close().await.expect("close");
}

#[tokio::test]
async fn rpc_socket_rejects_unknown_commands() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = unique_socket();
    let registrar = LocalRegistrar::new(dir.path().to_path_buf(), socket.clone());
    let handle = registrar
        .create_or_get_session("epsilon", SessionMetadata::new(), LifecycleState::Running)
        .await
        .expect("create session");

    let response = send_line(&socket, r#"{"command": "explode"}"#).await;
    assert_eq!(response["ok"], serde_json::Value::Bool(false));
    assert!(response["error"]
        .as_str()
        .is_some_and(|msg| msg.contains("unknown command")));

    let response = send_line(&socket, "not json at all").await;
    assert_eq!(response["ok"], serde_json::Value::Bool(false));

    handle.close().await.expect("close");
}

#[tokio::test]
async fn rpc_socket_answers_ping_without_a_handler() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = unique_socket();
    let registrar = LocalRegistrar::new(dir.path().to_path_buf(), socket.clone());
    let handle = registrar
        .create_or_get_session("zeta", SessionMetadata::new(), LifecycleState::Running)
        .await
        .expect("create session");

    let response = send_line(&socket, r#"{"command": "ping"}"#).await;
    assert_eq!(response["ok"], serde_json::Value::Bool(true));

    handle.close().await.expect("close");
}
