//! Drag-and-drop between status columns.
//!
//! The [`DragController`] owns the in-flight drag state:
//!
//! ```text
//! Idle --start_dragging(key)--> Dragging(key) --move_to(status)--> Idle
//! ```
//!
//! Ending a drag gesture without a drop clears the drop-target highlight
//! but keeps the dragged key until the next `move_to`.

use join_proto::task::{TaskKey, TaskRecord, TaskStatus};

use crate::board::Board;
use crate::store::TaskStore;
use crate::tasks::TaskRepository;

/// Drag state of the board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    /// Nothing is being dragged.
    #[default]
    Idle,
    /// The task with this key is being dragged.
    Dragging(TaskKey),
}

/// Result of dropping the dragged task on a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No task was being dragged; nothing happened.
    NothingDragged,
    /// The dragged task no longer exists in the store.
    TaskMissing,
    /// The task was moved and the board reloaded.
    Moved {
        /// The task as written.
        task: TaskRecord,
        /// Board reloaded after the write.
        board: Board,
    },
    /// The write failed; the reloaded board shows the state before the drop.
    WriteFailed {
        /// Board reloaded after the failed write.
        board: Board,
    },
}

/// Drag-and-drop state for one board view.
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
    highlighted: Option<TaskStatus>,
}

impl DragController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current drag state.
    #[must_use]
    pub const fn state(&self) -> &DragState {
        &self.state
    }

    /// Key of the task being dragged, if any.
    #[must_use]
    pub const fn dragged(&self) -> Option<&TaskKey> {
        match &self.state {
            DragState::Dragging(key) => Some(key),
            DragState::Idle => None,
        }
    }

    /// Column currently highlighted as a drop target.
    #[must_use]
    pub const fn highlighted(&self) -> Option<TaskStatus> {
        self.highlighted
    }

    /// Starts dragging a task, replacing any previous drag.
    pub fn start_dragging(&mut self, key: TaskKey) {
        tracing::debug!(key = %key, "drag started");
        self.state = DragState::Dragging(key);
    }

    /// Whether a column under the pointer accepts a drop.
    #[must_use]
    pub const fn allow_drop(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Highlights `status` as the drop target.
    pub fn highlight(&mut self, status: TaskStatus) {
        self.highlighted = Some(status);
    }

    /// Removes the drop-target highlight.
    pub fn remove_highlight(&mut self) {
        self.highlighted = None;
    }

    /// Drag gesture ended. Clears the highlight only.
    pub fn end_drag(&mut self) {
        self.remove_highlight();
    }

    /// Drops the dragged task on `status`.
    ///
    /// Places the task at the end of the target column, writes the full
    /// record, and reloads the board. The dragged key is cleared afterwards
    /// whether or not the write succeeded; nothing is rolled back.
    pub async fn move_to<S: TaskStore>(
        &mut self,
        repo: &TaskRepository<S>,
        status: TaskStatus,
    ) -> MoveOutcome {
        let Some(key) = self.dragged().cloned() else {
            return MoveOutcome::NothingDragged;
        };

        let outcome = match repo.move_task(&key, status).await {
            Ok(Some(task)) => MoveOutcome::Moved {
                task,
                board: repo.load_board().await,
            },
            Ok(None) => {
                tracing::debug!(key = %key, "dropped task no longer exists");
                MoveOutcome::TaskMissing
            }
            // Already logged by the repository.
            Err(_) => MoveOutcome::WriteFailed {
                board: repo.load_board().await,
            },
        };

        self.remove_highlight();
        self.state = DragState::Idle;
        outcome
    }
}
