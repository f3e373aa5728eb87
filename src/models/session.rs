//! Session record model and lifecycle helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle state for a tracked session.
///
/// The state is monotonic: once a session is `Archived` it never returns
/// to `Running`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Session is live; the supervised process may still be running.
    Running,
    /// Session has been archived; terminal state.
    Archived,
}

impl LifecycleState {
    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!((self, next), (Self::Running, Self::Archived))
    }
}

/// Mutable key-value metadata document attached to a session record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionMetadata(serde_json::Map<String, Value>);

impl SessionMetadata {
    /// Empty metadata document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a metadata entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a metadata entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of entries in the document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the document holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Record who archived the session, when, and why.
    pub fn record_archival(&mut self, actor: &str, reason: &str, at: DateTime<Utc>) {
        self.insert("archived_at", at.to_rfc3339());
        self.insert("archived_by", actor);
        self.insert("archive_reason", reason);
    }
}

/// Session domain entity, persisted by the registrar backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionRecord {
    /// Unique record identifier.
    pub id: String,
    /// Caller-supplied identity tag; immutable after creation.
    pub tag: String,
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Mutable metadata document.
    pub metadata: SessionMetadata,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Construct a new running session with a generated identifier.
    #[must_use]
    pub fn new(tag: String, metadata: SessionMetadata) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tag,
            state: LifecycleState::Running,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Archive the session, recording actor and reason in the metadata.
    ///
    /// Returns `false` without touching the record when it is already
    /// archived; the transition fires at most once per record.
    pub fn archive(&mut self, actor: &str, reason: &str) -> bool {
        if !self.state.can_transition_to(LifecycleState::Archived) {
            return false;
        }
        let now = Utc::now();
        self.state = LifecycleState::Archived;
        self.metadata.record_archival(actor, reason, now);
        self.updated_at = now;
        true
    }

    /// Whether the session has reached its terminal state.
    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.state == LifecycleState::Archived
    }
}
