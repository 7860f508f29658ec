//! Board view model: status columns, search, and summary counters.
//!
//! A [`Board`] is rebuilt from a full fetch after every write; it is never
//! patched incrementally.

use chrono::NaiveDate;
use join_proto::date::TaskDate;
use join_proto::task::{Priority, TaskCollection, TaskKey, TaskRecord, TaskStatus};

/// One task as shown on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Store key of the task.
    pub key: TaskKey,
    /// The task itself.
    pub task: TaskRecord,
}

/// A status column with its cards in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Which column this is.
    pub status: TaskStatus,
    /// Cards ordered by ascending sequence.
    pub cards: Vec<Card>,
}

impl Column {
    /// Whether the column shows its empty placeholder.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Number of cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }
}

/// The four status columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    columns: Vec<Column>,
}

impl Board {
    /// Groups tasks into columns, each sorted by sequence.
    ///
    /// A missing sequence sorts as 0; equal sequences fall back to
    /// `addTaskId` so the order is stable across reloads.
    #[must_use]
    pub fn from_tasks(tasks: &TaskCollection) -> Self {
        let columns = TaskStatus::ALL
            .iter()
            .map(|&status| {
                let mut cards: Vec<Card> = tasks
                    .iter()
                    .filter(|(_, t)| t.status == status)
                    .map(|(key, task)| Card {
                        key: key.clone(),
                        task: task.clone(),
                    })
                    .collect();
                cards.sort_by_key(|c| (c.task.sort_sequence(), c.task.add_task_id));
                Column { status, cards }
            })
            .collect();
        Self { columns }
    }

    /// Columns in board order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The column for `status`.
    #[must_use]
    pub fn column(&self, status: TaskStatus) -> Option<&Column> {
        self.columns.iter().find(|c| c.status == status)
    }

    /// Total number of cards.
    #[must_use]
    pub fn card_count(&self) -> usize {
        self.columns.iter().map(Column::len).sum()
    }

    /// Whether no column has any card.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(Column::is_empty)
    }

    /// Keeps only cards whose title or description contains `query`,
    /// ignoring case. A blank query keeps everything.
    #[must_use]
    pub fn filter(&self, query: &str) -> Self {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.clone();
        }
        let columns = self
            .columns
            .iter()
            .map(|column| Column {
                status: column.status,
                cards: column
                    .cards
                    .iter()
                    .filter(|card| matches_query(&card.task, &needle))
                    .cloned()
                    .collect(),
            })
            .collect();
        Self { columns }
    }
}

/// Case-insensitive match on title or description. `needle` must already be
/// lowercase.
fn matches_query(task: &TaskRecord, needle: &str) -> bool {
    task.fields.title.to_lowercase().contains(needle)
        || task.fields.description.to_lowercase().contains(needle)
}

/// Counters shown on the summary page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Tasks in `todo`.
    pub todo: usize,
    /// Tasks in `inProgress`.
    pub in_progress: usize,
    /// Tasks in `awaitFeedback`.
    pub await_feedback: usize,
    /// Tasks in `done`.
    pub done: usize,
    /// All tasks on the board.
    pub total: usize,
    /// Tasks marked urgent.
    pub urgent: usize,
    /// Nearest due date from today on among unfinished urgent tasks, or
    /// among all unfinished tasks when none of them is urgent.
    pub upcoming_deadline: Option<TaskDate>,
}

impl Summary {
    /// Computes the counters as of `today`.
    #[must_use]
    pub fn from_tasks(tasks: &TaskCollection, today: NaiveDate) -> Self {
        let mut summary = Self {
            total: tasks.len(),
            ..Self::default()
        };
        for task in tasks.values() {
            match task.status {
                TaskStatus::Todo => summary.todo += 1,
                TaskStatus::InProgress => summary.in_progress += 1,
                TaskStatus::AwaitFeedback => summary.await_feedback += 1,
                TaskStatus::Done => summary.done += 1,
            }
            if task.fields.priority == Priority::Urgent {
                summary.urgent += 1;
            }
        }

        let upcoming = |urgent_only: bool| {
            tasks
                .values()
                .filter(|t| t.status != TaskStatus::Done)
                .filter(|t| !urgent_only || t.fields.priority == Priority::Urgent)
                .filter_map(|t| t.fields.date)
                .filter(|d| d.as_naive() >= today)
                .min()
        };
        summary.upcoming_deadline = upcoming(true).or_else(|| upcoming(false));
        summary
    }
}
