//! Unit tests for the session record model and lifecycle monotonicity.

use agent_tether::models::session::{LifecycleState, SessionMetadata, SessionRecord};

#[test]
fn new_records_start_running() {
    let record = SessionRecord::new("tag-1".into(), SessionMetadata::new());
    assert_eq!(record.state, LifecycleState::Running);
    assert!(!record.is_archived());
    assert!(!record.id.is_empty());
    assert_eq!(record.tag, "tag-1");
}

#[test]
fn running_may_only_become_archived() {
    assert!(LifecycleState::Running.can_transition_to(LifecycleState::Archived));
    assert!(!LifecycleState::Running.can_transition_to(LifecycleState::Running));
    assert!(!LifecycleState::Archived.can_transition_to(LifecycleState::Running));
    assert!(!LifecycleState::Archived.can_transition_to(LifecycleState::Archived));
}

#[test]
fn archive_fires_exactly_once() {
    let mut record = SessionRecord::new("tag-2".into(), SessionMetadata::new());

    assert!(record.archive("cli", "User terminated"));
    assert!(record.is_archived());
    assert_eq!(
        record.metadata.get("archive_reason").and_then(|v| v.as_str()),
        Some("User terminated")
    );

    // The second archival is rejected and leaves the first reason intact.
    assert!(!record.archive("cli", "Process exited"));
    assert_eq!(
        record.metadata.get("archive_reason").and_then(|v| v.as_str()),
        Some("User terminated")
    );
    assert_eq!(record.state, LifecycleState::Archived);
}

#[test]
fn archival_records_actor_and_timestamp() {
    let mut record = SessionRecord::new("tag-3".into(), SessionMetadata::new());
    assert!(record.archive("cli", "Process exited"));

    assert_eq!(
        record.metadata.get("archived_by").and_then(|v| v.as_str()),
        Some("cli")
    );
    let archived_at = record
        .metadata
        .get("archived_at")
        .and_then(|v| v.as_str())
        .expect("archival timestamp set");
    assert!(
        chrono::DateTime::parse_from_rfc3339(archived_at).is_ok(),
        "timestamp is rfc3339: {archived_at}"
    );
}

#[test]
fn metadata_insert_and_lookup() {
    let mut metadata = SessionMetadata::new();
    assert!(metadata.is_empty());

    metadata.insert("tool", "codex");
    metadata.insert("pid", 42);
    assert_eq!(metadata.len(), 2);
    assert_eq!(metadata.get("tool").and_then(|v| v.as_str()), Some("codex"));
    assert_eq!(metadata.get("pid").and_then(serde_json::Value::as_u64), Some(42));
    assert!(metadata.get("missing").is_none());

    // Re-inserting replaces the previous value.
    metadata.insert("tool", "claude");
    assert_eq!(metadata.len(), 2);
    assert_eq!(metadata.get("tool").and_then(|v| v.as_str()), Some("claude"));
}

#[test]
fn records_round_trip_through_json() {
    let mut metadata = SessionMetadata::new();
    metadata.insert("mode", "read-only");
    let mut record = SessionRecord::new("tag-4".into(), metadata);
    assert!(record.archive("cli", "User terminated"));

    let raw = serde_json::to_string(&record).unwrap();
    let parsed: SessionRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, record);
}
