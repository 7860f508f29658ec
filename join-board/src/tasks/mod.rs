//! Task persistence and editing for the board.
//!
//! [`TaskRepository`] mediates every read and write against the remote
//! store and owns the id and sequence bookkeeping. [`TaskDraft`] holds the
//! state of the add/edit form until it is submitted.

pub mod draft;
pub mod repository;

pub use draft::TaskDraft;
pub use repository::{
    ReindexStrategy, TaskRepository, next_sequence_in, next_task_id_in, renumber_plan,
};

use join_proto::date::TaskDate;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during task operations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max 256 characters)")]
    TitleTooLong,
    /// A category must be chosen.
    #[error("task category cannot be empty")]
    CategoryEmpty,
    /// A due date must be set.
    #[error("task due date is required")]
    DateMissing,
    /// The due date lies before today.
    #[error("task due date {0} is in the past")]
    DateInPast(TaskDate),
    /// Subtask text cannot be empty.
    #[error("subtask text cannot be empty")]
    SubtaskEmpty,
    /// No subtask at the given position.
    #[error("no subtask at position {0}")]
    SubtaskIndex(usize),
    /// The store rejected or failed a write.
    #[error(transparent)]
    Store(#[from] StoreError),
}
