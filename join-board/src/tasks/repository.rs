//! Task repository: reads, writes, and id/sequence bookkeeping.
//!
//! Reads never fail from the caller's point of view: a store error is
//! logged and the board sees no data. Writes are logged and returned to the
//! immediate caller; nothing is retried.
//!
//! Two numbering schemes live here:
//! - `addTaskId` is dense from 0. New tasks take the first free id, and a
//!   delete shifts every larger id down by one.
//! - `sequence` orders a status column. A task entering a column gets one
//!   more than the column's current maximum, or 0 in an empty column. Gaps
//!   are never closed.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use join_proto::task::{StatusPatch, TaskCollection, TaskFields, TaskKey, TaskRecord, TaskStatus};
use serde::Deserialize;

use super::TaskError;
use crate::board::{Board, Summary};
use crate::store::TaskStore;

/// How ids above a deleted task are shifted down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReindexStrategy {
    /// One multi-path update the store applies all-or-nothing.
    #[default]
    Batch,
    /// One full record write per shifted task, lowest id first. A failure
    /// part-way leaves the ids with a gap.
    PerRecord,
}

/// Smallest id not used by any task, searched below the task count.
///
/// With dense ids this is the task count; after a partial renumbering it
/// fills the first gap.
#[must_use]
pub fn next_task_id_in(tasks: &TaskCollection) -> u64 {
    let used: BTreeSet<u64> = tasks.values().map(|t| t.add_task_id).collect();
    let count = u64::try_from(tasks.len()).unwrap_or(u64::MAX);
    (0..count).find(|id| !used.contains(id)).unwrap_or(count)
}

/// Sequence for a task entering `status`: column maximum + 1, or 0.
#[must_use]
pub fn next_sequence_in(tasks: &TaskCollection, status: TaskStatus) -> u64 {
    tasks
        .values()
        .filter(|t| t.status == status)
        .map(TaskRecord::sort_sequence)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

/// New ids for the tasks left after deleting `deleted_id`, in ascending
/// order of their current id.
#[must_use]
pub fn renumber_plan(tasks: &TaskCollection, deleted_id: u64) -> Vec<(TaskKey, u64)> {
    let mut shifted: Vec<(TaskKey, u64)> = tasks
        .iter()
        .filter(|(_, t)| t.add_task_id > deleted_id)
        .map(|(key, t)| (key.clone(), t.add_task_id))
        .collect();
    shifted.sort_by_key(|(_, id)| *id);
    shifted.into_iter().map(|(key, id)| (key, id - 1)).collect()
}

/// Mediates all task reads and writes against a [`TaskStore`].
pub struct TaskRepository<S: TaskStore> {
    store: S,
    reindex: ReindexStrategy,
}

impl<S: TaskStore> TaskRepository<S> {
    /// Creates a repository using batch renumbering.
    pub fn new(store: S) -> Self {
        Self {
            store,
            reindex: ReindexStrategy::default(),
        }
    }

    /// Selects how ids are shifted after a delete.
    #[must_use]
    pub fn with_reindex(mut self, reindex: ReindexStrategy) -> Self {
        self.reindex = reindex;
        self
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Every task, keyed by store key. Empty on store error.
    pub async fn fetch_all_tasks(&self) -> TaskCollection {
        match self.store.list().await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch tasks");
                TaskCollection::new()
            }
        }
    }

    /// One task, or `None` if it is absent or the read failed.
    pub async fn fetch_task(&self, key: &TaskKey) -> Option<TaskRecord> {
        match self.store.get(key).await {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to fetch task");
                None
            }
        }
    }

    /// Finds a task by its `addTaskId`.
    pub async fn find_by_task_id(&self, add_task_id: u64) -> Option<(TaskKey, TaskRecord)> {
        self.fetch_all_tasks()
            .await
            .into_iter()
            .find(|(_, t)| t.add_task_id == add_task_id)
    }

    /// First free `addTaskId`.
    pub async fn next_task_id(&self) -> u64 {
        next_task_id_in(&self.fetch_all_tasks().await)
    }

    /// Sequence a task entering `status` would receive.
    pub async fn next_sequence(&self, status: TaskStatus) -> u64 {
        next_sequence_in(&self.fetch_all_tasks().await, status)
    }

    /// Creates a task at the end of the `todo` column.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the insert fails.
    pub async fn create_task(&self, fields: TaskFields) -> Result<TaskKey, TaskError> {
        let tasks = self.fetch_all_tasks().await;
        let record = TaskRecord::new(
            next_task_id_in(&tasks),
            TaskStatus::Todo,
            next_sequence_in(&tasks, TaskStatus::Todo),
            fields,
        );
        let key = self
            .store
            .insert(&record)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "failed to create task"))?;
        tracing::info!(
            key = %key,
            add_task_id = record.add_task_id,
            sequence = record.sort_sequence(),
            "task created"
        );
        Ok(key)
    }

    /// Replaces the editable fields of a task, keeping its id and placement.
    ///
    /// Returns `false` without writing if the task does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the write fails.
    pub async fn update_task(&self, key: &TaskKey, fields: TaskFields) -> Result<bool, TaskError> {
        let Some(mut record) = self.fetch_task(key).await else {
            tracing::debug!(key = %key, "update skipped, task not found");
            return Ok(false);
        };
        record.fields = fields;
        self.store
            .replace(key, &record)
            .await
            .inspect_err(|e| tracing::warn!(key = %key, error = %e, "failed to update task"))?;
        tracing::info!(key = %key, add_task_id = record.add_task_id, "task updated");
        Ok(true)
    }

    /// Writes only `status` and `sequence` of a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the patch fails.
    pub async fn patch_task_status(
        &self,
        key: &TaskKey,
        status: TaskStatus,
        sequence: u64,
    ) -> Result<(), TaskError> {
        self.store
            .patch_status(key, StatusPatch { status, sequence })
            .await
            .inspect_err(|e| {
                tracing::warn!(key = %key, error = %e, "failed to patch task status");
            })?;
        tracing::info!(key = %key, status = %status, sequence, "task status patched");
        Ok(())
    }

    /// Quick status change: appends the task to `status` with a partial
    /// update. Returns the patch written, or `None` if the task is absent.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the patch fails.
    pub async fn change_status(
        &self,
        key: &TaskKey,
        status: TaskStatus,
    ) -> Result<Option<StatusPatch>, TaskError> {
        let tasks = self.fetch_all_tasks().await;
        if !tasks.contains_key(key) {
            tracing::debug!(key = %key, "status change skipped, task not found");
            return Ok(None);
        }
        let sequence = next_sequence_in(&tasks, status);
        self.patch_task_status(key, status, sequence).await?;
        Ok(Some(StatusPatch { status, sequence }))
    }

    /// Moves a task to the end of `status` with a full record write.
    ///
    /// Returns the record as written, or `None` if the task is absent.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the write fails.
    pub async fn move_task(
        &self,
        key: &TaskKey,
        status: TaskStatus,
    ) -> Result<Option<TaskRecord>, TaskError> {
        let sequence = self.next_sequence(status).await;
        let Some(mut record) = self.fetch_task(key).await else {
            tracing::debug!(key = %key, "move skipped, task not found");
            return Ok(None);
        };
        let from = record.status;
        record.status = status;
        record.sequence = Some(sequence);
        self.store
            .replace(key, &record)
            .await
            .inspect_err(|e| tracing::warn!(key = %key, error = %e, "failed to move task"))?;
        tracing::info!(key = %key, from = %from, to = %status, sequence, "task moved");
        Ok(Some(record))
    }

    /// Deletes the task with `add_task_id` and shifts larger ids down.
    ///
    /// Returns `false` if no task has that id.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the delete or the renumbering fails.
    /// With [`ReindexStrategy::PerRecord`] a renumbering failure leaves the
    /// records written so far in place.
    pub async fn delete_task(&self, add_task_id: u64) -> Result<bool, TaskError> {
        let mut tasks = self.fetch_all_tasks().await;
        let Some(key) = tasks
            .iter()
            .find(|(_, t)| t.add_task_id == add_task_id)
            .map(|(key, _)| key.clone())
        else {
            tracing::debug!(add_task_id, "delete skipped, task not found");
            return Ok(false);
        };

        self.store
            .remove(&key)
            .await
            .inspect_err(|e| tracing::warn!(key = %key, error = %e, "failed to delete task"))?;
        tasks.remove(&key);
        tracing::info!(key = %key, add_task_id, "task deleted");

        let plan = renumber_plan(&tasks, add_task_id);
        self.apply_renumber(&tasks, &plan).await?;
        Ok(true)
    }

    async fn apply_renumber(
        &self,
        tasks: &TaskCollection,
        plan: &[(TaskKey, u64)],
    ) -> Result<(), TaskError> {
        if plan.is_empty() {
            return Ok(());
        }
        match self.reindex {
            ReindexStrategy::Batch => {
                self.store.renumber(plan).await.inspect_err(|e| {
                    tracing::warn!(error = %e, count = plan.len(), "failed to renumber tasks");
                })?;
            }
            ReindexStrategy::PerRecord => {
                for (done, (key, new_id)) in plan.iter().enumerate() {
                    let Some(mut record) = tasks.get(key).cloned() else {
                        continue;
                    };
                    record.add_task_id = *new_id;
                    self.store.replace(key, &record).await.inspect_err(|e| {
                        tracing::warn!(
                            key = %key,
                            error = %e,
                            renumbered = done,
                            remaining = plan.len() - done,
                            "renumbering interrupted, task ids are no longer dense"
                        );
                    })?;
                }
            }
        }
        tracing::debug!(count = plan.len(), strategy = ?self.reindex, "task ids renumbered");
        Ok(())
    }

    /// Reloads the board from the store.
    pub async fn load_board(&self) -> Board {
        Board::from_tasks(&self.fetch_all_tasks().await)
    }

    /// Summary counters as of `today`.
    pub async fn summary(&self, today: NaiveDate) -> Summary {
        Summary::from_tasks(&self.fetch_all_tasks().await, today)
    }
}
