//! Add/edit form state.
//!
//! A [`TaskDraft`] is created fresh when the form opens (or seeded from an
//! existing task when editing), mutated by user actions, and turned into
//! [`TaskFields`] by [`TaskDraft::validate`] on submit.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use join_proto::date::TaskDate;
use join_proto::task::{MAX_TASK_TITLE_LENGTH, Priority, Subtask, SubtaskState, TaskFields};

use super::TaskError;

/// State of the task form between opening and submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    /// Card title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Category label.
    pub category: String,
    /// Chosen priority.
    pub priority: Priority,
    date: Option<TaskDate>,
    /// Date the task had when editing started; kept valid even if past.
    original_date: Option<TaskDate>,
    subtasks: Vec<Subtask>,
    selected_contacts: BTreeSet<String>,
}

impl TaskDraft {
    /// Seeds a draft from an existing task for editing.
    #[must_use]
    pub fn from_fields(fields: &TaskFields) -> Self {
        Self {
            title: fields.title.clone(),
            description: fields.description.clone(),
            category: fields.category.clone(),
            priority: fields.priority,
            date: fields.date,
            original_date: fields.date,
            subtasks: fields.subtasks.clone(),
            selected_contacts: fields.assigned_to.clone(),
        }
    }

    /// Clears the form.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Current due date.
    #[must_use]
    pub const fn date(&self) -> Option<TaskDate> {
        self.date
    }

    /// Sets the due date from typed input, auto-correcting it.
    ///
    /// Returns the corrected date, or `None` (leaving the date unset) when
    /// the input is not yet a date.
    pub fn set_date_input(&mut self, input: &str) -> Option<TaskDate> {
        self.date = TaskDate::autocorrect(input);
        self.date
    }

    /// Picks a priority. Choosing the current one again clears it, like the
    /// priority buttons on the form.
    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = if self.priority == priority {
            Priority::Unset
        } else {
            priority
        };
    }

    /// Selects or deselects a contact; returns whether it is now selected.
    pub fn toggle_contact(&mut self, contact_id: &str) -> bool {
        if self.selected_contacts.remove(contact_id) {
            false
        } else {
            self.selected_contacts.insert(contact_id.to_string());
            true
        }
    }

    /// Contacts currently selected for assignment.
    #[must_use]
    pub const fn selected_contacts(&self) -> &BTreeSet<String> {
        &self.selected_contacts
    }

    /// Subtasks in display order.
    #[must_use]
    pub fn subtasks(&self) -> &[Subtask] {
        &self.subtasks
    }

    /// Appends an unchecked subtask and returns its position.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::SubtaskEmpty`] for blank text.
    pub fn add_subtask(&mut self, text: &str) -> Result<usize, TaskError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TaskError::SubtaskEmpty);
        }
        self.subtasks.push(Subtask::new(text));
        Ok(self.subtasks.len() - 1)
    }

    /// Rewrites the text of a subtask, keeping its check state.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::SubtaskEmpty`] for blank text and
    /// [`TaskError::SubtaskIndex`] for an unknown position.
    pub fn edit_subtask(&mut self, index: usize, text: &str) -> Result<(), TaskError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TaskError::SubtaskEmpty);
        }
        let subtask = self.subtasks.get_mut(index).ok_or(TaskError::SubtaskIndex(index))?;
        subtask.text = text.to_string();
        Ok(())
    }

    /// Removes and returns a subtask.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::SubtaskIndex`] for an unknown position.
    pub fn remove_subtask(&mut self, index: usize) -> Result<Subtask, TaskError> {
        if index >= self.subtasks.len() {
            return Err(TaskError::SubtaskIndex(index));
        }
        Ok(self.subtasks.remove(index))
    }

    /// Flips a subtask between checked and unchecked.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::SubtaskIndex`] for an unknown position.
    pub fn toggle_subtask(&mut self, index: usize) -> Result<SubtaskState, TaskError> {
        let subtask = self.subtasks.get_mut(index).ok_or(TaskError::SubtaskIndex(index))?;
        subtask.status = subtask.status.toggled();
        Ok(subtask.status)
    }

    /// Checks the form and produces the fields to store.
    ///
    /// Title and category are required, the title is capped at
    /// [`MAX_TASK_TITLE_LENGTH`] characters, and the due date must not lie
    /// before `today` unless it is the date the task already had.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`TaskError`] validation variant.
    pub fn validate(&self, today: NaiveDate) -> Result<TaskFields, TaskError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(TaskError::TitleEmpty);
        }
        if title.chars().count() > MAX_TASK_TITLE_LENGTH {
            return Err(TaskError::TitleTooLong);
        }
        let date = self.date.ok_or(TaskError::DateMissing)?;
        if date.as_naive() < today && Some(date) != self.original_date {
            return Err(TaskError::DateInPast(date));
        }
        let category = self.category.trim();
        if category.is_empty() {
            return Err(TaskError::CategoryEmpty);
        }

        Ok(TaskFields {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            date: Some(date),
            category: category.to_string(),
            priority: self.priority,
            subtasks: self.subtasks.clone(),
            assigned_to: self.selected_contacts.clone(),
        })
    }
}
