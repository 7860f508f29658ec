//! `join` subcommands and their plain-text rendering.
//!
//! Every command runs against a [`TaskRepository`] and writes its output to
//! any [`Write`] sink, so the same code drives the binary and the tests.

use std::io::{self, Write};

use chrono::NaiveDate;
use join_proto::task::{Priority, TaskKey, TaskRecord, TaskStatus};

use crate::board::{Board, Summary};
use crate::drag::{DragController, MoveOutcome};
use crate::store::TaskStore;
use crate::tasks::{TaskDraft, TaskError, TaskRepository};

/// Errors reported by a command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Validation or store failure from the repository.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// No task carries the given `addTaskId`.
    #[error("no task with id {0}")]
    NotFound(u64),

    /// The `--date` value could not be read as a date.
    #[error("could not read {0:?} as a date (expected DD/MM/YYYY)")]
    InvalidDate(String),

    /// The store rejected the move; the board is unchanged.
    #[error("task {0} could not be moved, the store rejected the write")]
    MoveFailed(u64),

    /// Writing the output failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Board subcommands.
#[derive(Debug, Clone, clap::Subcommand)]
pub enum Command {
    /// Show all four columns.
    Board {
        /// Only show tasks whose title or description contains this text.
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show task counters and the next deadline.
    Summary,
    /// Show one task in detail.
    Show {
        /// Task id (`addTaskId`).
        id: u64,
    },
    /// Create a task in "To do".
    Add(TaskArgs),
    /// Change the fields of a task.
    Edit {
        /// Task id (`addTaskId`).
        id: u64,
        #[command(flatten)]
        args: TaskArgs,
    },
    /// Move a task to the end of another column.
    Move {
        /// Task id (`addTaskId`).
        id: u64,
        /// Target column (todo, in-progress, await-feedback, done).
        status: TaskStatus,
    },
    /// Change only the status of a task.
    Status {
        /// Task id (`addTaskId`).
        id: u64,
        /// Target column (todo, in-progress, await-feedback, done).
        status: TaskStatus,
    },
    /// Check or uncheck a subtask.
    Check {
        /// Task id (`addTaskId`).
        id: u64,
        /// Subtask position, starting at 0.
        index: usize,
    },
    /// Delete a task; larger ids shift down by one.
    Delete {
        /// Task id (`addTaskId`).
        id: u64,
    },
}

/// Task form fields shared by `add` and `edit`. Unset flags keep the
/// current value.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct TaskArgs {
    /// Card title.
    #[arg(long)]
    pub title: Option<String>,

    /// Free-text description.
    #[arg(long)]
    pub description: Option<String>,

    /// Due date, `DD/MM/YYYY`. Half-typed dates are corrected.
    #[arg(long)]
    pub date: Option<String>,

    /// Category label, e.g. "Technical Task".
    #[arg(long)]
    pub category: Option<String>,

    /// Urgent, Medium, Low, or none.
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Append a subtask (repeatable).
    #[arg(long = "subtask")]
    pub subtasks: Vec<String>,

    /// Assign or unassign a contact id (repeatable).
    #[arg(long = "assign")]
    pub assign: Vec<String>,
}

impl TaskArgs {
    fn apply(&self, draft: &mut TaskDraft) -> Result<(), CommandError> {
        if let Some(title) = &self.title {
            draft.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            draft.description.clone_from(description);
        }
        if let Some(category) = &self.category {
            draft.category.clone_from(category);
        }
        if let Some(priority) = self.priority {
            draft.priority = priority;
        }
        if let Some(input) = &self.date {
            draft
                .set_date_input(input)
                .ok_or_else(|| CommandError::InvalidDate(input.clone()))?;
        }
        for text in &self.subtasks {
            draft.add_subtask(text)?;
        }
        for contact in &self.assign {
            draft.toggle_contact(contact);
        }
        Ok(())
    }
}

/// Runs one command, writing its output to `out` and flushing it.
///
/// # Errors
///
/// Returns [`CommandError`] when the task does not exist, the input does
/// not validate, the store rejects a write, or `out` fails.
pub async fn run<S: TaskStore, W: Write>(
    command: Command,
    repo: &TaskRepository<S>,
    today: NaiveDate,
    out: &mut W,
) -> Result<(), CommandError> {
    tracing::debug!(?command, "running command");
    match command {
        Command::Board { search } => {
            let board = repo.load_board().await;
            match search.as_deref().map(str::trim) {
                Some(query) if !query.is_empty() => {
                    let filtered = board.filter(query);
                    if filtered.is_empty() {
                        writeln!(out, "No results found for {query:?}.")?;
                    } else {
                        render_board(&filtered, out)?;
                    }
                }
                _ => render_board(&board, out)?,
            }
        }
        Command::Summary => render_summary(&repo.summary(today).await, out)?,
        Command::Show { id } => {
            let (key, task) = find(repo, id).await?;
            render_task(&key, &task, out)?;
        }
        Command::Add(args) => {
            let mut draft = TaskDraft::default();
            args.apply(&mut draft)?;
            let key = repo.create_task(draft.validate(today)?).await?;
            match repo.fetch_task(&key).await {
                Some(task) => writeln!(out, "Created task {} ({key}).", task.add_task_id)?,
                None => writeln!(out, "Created task {key}.")?,
            }
        }
        Command::Edit { id, args } => {
            let (key, task) = find(repo, id).await?;
            let mut draft = TaskDraft::from_fields(&task.fields);
            args.apply(&mut draft)?;
            if !repo.update_task(&key, draft.validate(today)?).await? {
                return Err(CommandError::NotFound(id));
            }
            writeln!(out, "Updated task {id}.")?;
        }
        Command::Move { id, status } => {
            let (key, _) = find(repo, id).await?;
            let mut drag = DragController::new();
            drag.start_dragging(key);
            drag.highlight(status);
            match drag.move_to(repo, status).await {
                MoveOutcome::Moved { task, board } => {
                    writeln!(
                        out,
                        "Moved task {id} to {} (position {}).",
                        status.label(),
                        task.sort_sequence()
                    )?;
                    if let Some(column) = board.column(status) {
                        let tasks: Vec<&TaskRecord> =
                            column.cards.iter().map(|c| &c.task).collect();
                        render_column(status, &tasks, out)?;
                    }
                }
                MoveOutcome::WriteFailed { .. } => return Err(CommandError::MoveFailed(id)),
                MoveOutcome::NothingDragged | MoveOutcome::TaskMissing => {
                    return Err(CommandError::NotFound(id));
                }
            }
        }
        Command::Status { id, status } => {
            let (key, _) = find(repo, id).await?;
            let patch = repo
                .change_status(&key, status)
                .await?
                .ok_or(CommandError::NotFound(id))?;
            writeln!(
                out,
                "Task {id} is now in {} (position {}).",
                patch.status.label(),
                patch.sequence
            )?;
        }
        Command::Check { id, index } => {
            let (key, task) = find(repo, id).await?;
            let mut fields = task.fields;
            let subtask = fields
                .subtasks
                .get_mut(index)
                .ok_or(TaskError::SubtaskIndex(index))?;
            subtask.status = subtask.status.toggled();
            let state = if subtask.is_checked() { "checked" } else { "unchecked" };
            let text = subtask.text.clone();
            if !repo.update_task(&key, fields).await? {
                return Err(CommandError::NotFound(id));
            }
            writeln!(out, "Subtask {index} of task {id} ({text}) is now {state}.")?;
        }
        Command::Delete { id } => {
            if !repo.delete_task(id).await? {
                return Err(CommandError::NotFound(id));
            }
            writeln!(out, "Deleted task {id}.")?;
        }
    }
    out.flush()?;
    Ok(())
}

async fn find<S: TaskStore>(
    repo: &TaskRepository<S>,
    id: u64,
) -> Result<(TaskKey, TaskRecord), CommandError> {
    repo.find_by_task_id(id).await.ok_or(CommandError::NotFound(id))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Writes all four columns, with a placeholder line for empty ones.
///
/// # Errors
///
/// Returns any error from `out`.
pub fn render_board(board: &Board, out: &mut impl Write) -> io::Result<()> {
    for (i, column) in board.columns().iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        let tasks: Vec<&TaskRecord> = column.cards.iter().map(|c| &c.task).collect();
        render_column(column.status, &tasks, out)?;
    }
    Ok(())
}

fn render_column(
    status: TaskStatus,
    tasks: &[&TaskRecord],
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "{} ({})", status.label(), tasks.len())?;
    if tasks.is_empty() {
        writeln!(out, "  No tasks {}", status.label().to_lowercase())?;
    }
    for task in tasks {
        writeln!(out, "  {}", card_line(task))?;
    }
    Ok(())
}

fn card_line(task: &TaskRecord) -> String {
    let fields = &task.fields;
    let mut line = format!("#{:<3} {}", task.add_task_id, fields.title);
    if fields.priority != Priority::Unset {
        line.push_str(&format!("  [{}]", fields.priority));
    }
    if let Some(date) = fields.date {
        line.push_str(&format!("  due {date}"));
    }
    if !fields.subtasks.is_empty() {
        line.push_str(&format!(
            "  {}/{} subtasks",
            task.completed_subtasks(),
            fields.subtasks.len()
        ));
    }
    line
}

/// Writes every field of one task.
///
/// # Errors
///
/// Returns any error from `out`.
pub fn render_task(key: &TaskKey, task: &TaskRecord, out: &mut impl Write) -> io::Result<()> {
    let fields = &task.fields;
    writeln!(out, "#{} {}", task.add_task_id, fields.title)?;
    writeln!(out, "  key:         {key}")?;
    writeln!(out, "  status:      {} (position {})", task.status.label(), task.sort_sequence())?;
    if !fields.category.is_empty() {
        writeln!(out, "  category:    {}", fields.category)?;
    }
    if let Some(date) = fields.date {
        writeln!(out, "  due:         {date}")?;
    }
    if fields.priority != Priority::Unset {
        writeln!(out, "  priority:    {}", fields.priority)?;
    }
    if !fields.assigned_to.is_empty() {
        let assigned: Vec<&str> = fields.assigned_to.iter().map(String::as_str).collect();
        writeln!(out, "  assigned to: {}", assigned.join(", "))?;
    }
    if !fields.description.is_empty() {
        writeln!(out, "  description: {}", fields.description)?;
    }
    if !fields.subtasks.is_empty() {
        writeln!(out, "  subtasks:")?;
        for (i, subtask) in fields.subtasks.iter().enumerate() {
            let mark = if subtask.is_checked() { 'x' } else { ' ' };
            writeln!(out, "    {i}. [{mark}] {}", subtask.text)?;
        }
    }
    Ok(())
}

/// Writes the summary counters.
///
/// # Errors
///
/// Returns any error from `out`.
pub fn render_summary(summary: &Summary, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "To do:             {}", summary.todo)?;
    writeln!(out, "In progress:       {}", summary.in_progress)?;
    writeln!(out, "Await feedback:    {}", summary.await_feedback)?;
    writeln!(out, "Done:              {}", summary.done)?;
    writeln!(out, "Tasks on board:    {}", summary.total)?;
    writeln!(out, "Urgent:            {}", summary.urgent)?;
    match summary.upcoming_deadline {
        Some(date) => writeln!(out, "Upcoming deadline: {date}"),
        None => writeln!(out, "Upcoming deadline: none"),
    }
}
