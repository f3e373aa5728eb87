//! Backend-agnostic session registrar abstraction.
//!
//! The [`SessionRegistrar`] and [`SessionHandle`] traits decouple the
//! supervision core from the session backend. A remote sync backend and the
//! bundled [`local`] registrar expose the same surface: create-or-get a
//! session record, register RPC handlers against it, and mutate, flush and
//! close it. All backend calls are asynchronous and independently fallible.

pub mod local;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::models::session::{LifecycleState, SessionMetadata, SessionRecord};
use crate::Result;

/// Callback invoked when the session's RPC surface receives the command it
/// was registered for. Handlers must not block; long-running work belongs
/// on the task that owns the session, reached via a channel.
pub type RpcHandler = Box<dyn Fn() + Send + Sync>;

/// One-shot mutation applied to the session record under the backend's lock.
pub type RecordMutator = Box<dyn FnOnce(&mut SessionRecord) + Send>;

/// Opaque handle to a live session record.
///
/// Held by the supervisor for the duration of a run and released after
/// [`close`](SessionHandle::close). Backends keep the underlying record for
/// persistence beyond the run.
pub trait SessionHandle: Send + Sync {
    /// Identity tag of the underlying session record.
    fn identity(&self) -> &str;

    /// Register a handler for an inbound RPC command.
    ///
    /// Re-registering a name replaces the previous handler. The transport
    /// acknowledges the caller itself; handlers only observe the event.
    fn register_rpc_handler(&self, name: &str, handler: RpcHandler);

    /// Apply a mutation to the session record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Remote`](crate::AppError::Remote) if the backend
    /// rejects the update.
    fn update_metadata(&self, mutate: RecordMutator) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Announce session death to remote observers before closing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Remote`](crate::AppError::Remote) if the notice
    /// cannot be delivered.
    fn send_death_notice(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Flush buffered session state to the backend.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Remote`](crate::AppError::Remote) if persisting
    /// fails.
    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Close the handle and release backend resources.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Remote`](crate::AppError::Remote) if the backend
    /// reports a failure while shutting the session surface down.
    fn close(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Factory for session handles, keyed by identity tag.
pub trait SessionRegistrar: Send + Sync {
    /// Create a session record for `tag`, or return the live existing one.
    ///
    /// `initial_state` applies only when a fresh record is created; an
    /// existing live record keeps its own state.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Remote`](crate::AppError::Remote) if the backend
    /// cannot create or load the record.
    fn create_or_get_session(
        &self,
        tag: &str,
        metadata: SessionMetadata,
        initial_state: LifecycleState,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn SessionHandle>>> + Send + '_>>;
}
