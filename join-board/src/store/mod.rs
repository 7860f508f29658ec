//! Remote task store abstraction.
//!
//! Defines the [`TaskStore`] trait that every backend must satisfy.
//! Concrete implementations include:
//! - [`http::HttpTaskStore`]: Firebase-style REST database over HTTP
//! - [`memory::MemoryTaskStore`]: in-process map with fault injection, for tests

pub mod http;
pub mod memory;

use join_proto::task::{ProtoError, StatusPatch, TaskCollection, TaskKey, TaskRecord};

pub use http::HttpTaskStore;
pub use memory::MemoryTaskStore;

/// Errors that can occur while talking to the task store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP request could not be sent or its body not read.
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error text extracted from the response body.
        body: String,
    },

    /// The store answered with a body that is not a task payload.
    #[error("malformed store response: {0}")]
    Decode(#[from] ProtoError),

    /// The store refused the operation outright.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Async access to the `tasks` collection of the remote store.
///
/// Every method maps to one request against the store. Implementations do
/// no caching and no retries; the store is the only source of truth and the
/// last write to a record wins.
pub trait TaskStore: Send + Sync {
    /// Fetch the whole collection. An empty store yields an empty map.
    fn list(&self) -> impl std::future::Future<Output = Result<TaskCollection, StoreError>> + Send;

    /// Fetch one record, or `None` if the key does not exist.
    fn get(
        &self,
        key: &TaskKey,
    ) -> impl std::future::Future<Output = Result<Option<TaskRecord>, StoreError>> + Send;

    /// Append a record; the store assigns and returns its key.
    fn insert(
        &self,
        record: &TaskRecord,
    ) -> impl std::future::Future<Output = Result<TaskKey, StoreError>> + Send;

    /// Replace a record wholesale.
    fn replace(
        &self,
        key: &TaskKey,
        record: &TaskRecord,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Overwrite only `status` and `sequence` of a record.
    fn patch_status(
        &self,
        key: &TaskKey,
        patch: StatusPatch,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete a record. Deleting a missing key is not an error.
    fn remove(
        &self,
        key: &TaskKey,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Rewrite `addTaskId` of several records in one all-or-nothing request.
    fn renumber(
        &self,
        updates: &[(TaskKey, u64)],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
