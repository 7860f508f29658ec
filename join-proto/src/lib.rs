//! Shared data model for the Join task board.
//!
//! Defines the task record as it is stored in the remote JSON database,
//! the due-date type with its input auto-correction, and the helpers that
//! decode store responses.

pub mod date;
pub mod task;
