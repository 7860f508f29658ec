//! Task records as stored in the remote JSON database.
//!
//! A record is addressed two ways: by the opaque [`TaskKey`] the store
//! assigns on insert, and by the dense, user-facing `addTaskId`. Field names
//! on the wire are camelCase to match what the browser front end writes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::date::{self, DateError, TaskDate};

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Name of the store collection holding task records.
pub const TASKS_COLLECTION: &str = "tasks";

/// Wire name of the dense task id field.
pub const ADD_TASK_ID_FIELD: &str = "addTaskId";

/// Errors produced when decoding store payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// The payload was not valid JSON or did not match the record shape.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// The payload was valid JSON of the wrong kind.
    #[error("unexpected payload shape: expected {0}")]
    UnexpectedShape(&'static str),
    /// A status name outside the four board columns.
    #[error("unknown status: {0}")]
    UnknownStatus(String),
    /// A priority name outside `Urgent`, `Medium`, `Low`.
    #[error("unknown priority: {0}")]
    UnknownPriority(String),
    /// A malformed due date.
    #[error(transparent)]
    Date(#[from] DateError),
}

/// Opaque key the store assigns to a record on insert.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskKey(String);

impl TaskKey {
    /// Wraps a store key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The board column a task sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    /// Not started.
    Todo,
    /// Being worked on.
    InProgress,
    /// Waiting for someone else's input.
    AwaitFeedback,
    /// Finished.
    Done,
}

impl TaskStatus {
    /// All columns in board order, left to right.
    pub const ALL: [Self; 4] = [Self::Todo, Self::InProgress, Self::AwaitFeedback, Self::Done];

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "inProgress",
            Self::AwaitFeedback => "awaitFeedback",
            Self::Done => "done",
        }
    }

    /// Column heading shown on the board.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Todo => "To do",
            Self::InProgress => "In progress",
            Self::AwaitFeedback => "Await feedback",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ProtoError;

    /// Accepts the wire names case-insensitively, with or without `-`/`_`
    /// separators (`inProgress`, `in-progress`, `IN_PROGRESS`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "todo" => Ok(Self::Todo),
            "inprogress" => Ok(Self::InProgress),
            "awaitfeedback" => Ok(Self::AwaitFeedback),
            "done" => Ok(Self::Done),
            _ => Err(ProtoError::UnknownStatus(s.to_string())),
        }
    }
}

/// Task priority. Stored as `"Urgent"`, `"Medium"`, `"Low"`, or `""`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Shown first in the summary's urgent counter.
    Urgent,
    /// Medium priority.
    Medium,
    /// Low priority.
    Low,
    /// No priority chosen.
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl Priority {
    /// Wire name of the priority.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "Urgent",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Unset => "",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urgent" => Ok(Self::Urgent),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "" | "none" => Ok(Self::Unset),
            _ => Err(ProtoError::UnknownPriority(s.to_string())),
        }
    }
}

/// Check state of a subtask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtaskState {
    /// Done.
    Checked,
    /// Not done.
    #[default]
    Unchecked,
}

impl SubtaskState {
    /// Returns the opposite state.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Checked => Self::Unchecked,
            Self::Unchecked => Self::Checked,
        }
    }
}

/// One line of a task's checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    /// Subtask text.
    pub text: String,
    /// Check state.
    pub status: SubtaskState,
}

impl Subtask {
    /// Creates an unchecked subtask.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: SubtaskState::Unchecked,
        }
    }

    /// Whether the subtask is checked.
    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.status == SubtaskState::Checked
    }
}

/// The user-editable part of a task.
///
/// Every field defaults when missing because the store drops empty arrays
/// and older records lack some fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFields {
    /// Card title.
    #[serde(default)]
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Due date.
    #[serde(default, with = "date::optional")]
    pub date: Option<TaskDate>,
    /// Category label (e.g. "Technical Task", "User Story").
    #[serde(default)]
    pub category: String,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// Ordered checklist.
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// Ids of assigned contacts. Weak references; never dereferenced here.
    #[serde(default)]
    pub assigned_to: BTreeSet<String>,
}

/// A stored task: board placement plus editable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Dense user-facing id, contiguous from 0.
    pub add_task_id: u64,
    /// Column the task is in.
    pub status: TaskStatus,
    /// Position within the column; `None` sorts as 0.
    #[serde(default)]
    pub sequence: Option<u64>,
    /// Editable fields.
    #[serde(flatten)]
    pub fields: TaskFields,
}

impl TaskRecord {
    /// Creates a record placed at `sequence` in `status`.
    #[must_use]
    pub const fn new(
        add_task_id: u64,
        status: TaskStatus,
        sequence: u64,
        fields: TaskFields,
    ) -> Self {
        Self {
            add_task_id,
            status,
            sequence: Some(sequence),
            fields,
        }
    }

    /// Sequence used for column ordering (`None` counts as 0).
    #[must_use]
    pub fn sort_sequence(&self) -> u64 {
        self.sequence.unwrap_or(0)
    }

    /// Number of checked subtasks.
    #[must_use]
    pub fn completed_subtasks(&self) -> usize {
        self.fields.subtasks.iter().filter(|s| s.is_checked()).count()
    }
}

/// Partial body of a quick status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPatch {
    /// New column.
    pub status: TaskStatus,
    /// Position in the new column.
    pub sequence: u64,
}

/// Response body of a POST to a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    /// Key the store assigned to the new record.
    pub name: TaskKey,
}

/// All tasks, keyed by store key.
pub type TaskCollection = BTreeMap<TaskKey, TaskRecord>;

/// A collection entry that could not be decoded.
#[derive(Debug)]
pub struct RejectedRecord {
    /// Store key of the entry.
    pub key: TaskKey,
    /// Why decoding failed.
    pub error: serde_json::Error,
}

/// Decodes a single-record response. `null` means the key does not exist.
///
/// # Errors
///
/// Returns [`ProtoError::Json`] if the body is not a task record.
pub fn decode_record(body: &[u8]) -> Result<Option<TaskRecord>, ProtoError> {
    Ok(serde_json::from_slice::<Option<TaskRecord>>(body)?)
}

/// Decodes a whole-collection response.
///
/// `null` (an empty collection) decodes to an empty map. Entries that do not
/// decode are returned separately so one bad record does not hide the rest
/// of the board.
///
/// # Errors
///
/// Returns [`ProtoError::Json`] for invalid JSON and
/// [`ProtoError::UnexpectedShape`] when the body is neither `null` nor an
/// object.
pub fn decode_collection(body: &[u8]) -> Result<(TaskCollection, Vec<RejectedRecord>), ProtoError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    let entries = match value {
        serde_json::Value::Null => return Ok((TaskCollection::new(), Vec::new())),
        serde_json::Value::Object(map) => map,
        _ => return Err(ProtoError::UnexpectedShape("object or null")),
    };

    let mut tasks = TaskCollection::new();
    let mut rejected = Vec::new();
    for (key, entry) in entries {
        let key = TaskKey::new(key);
        match serde_json::from_value::<TaskRecord>(entry) {
            Ok(record) => {
                tasks.insert(key, record);
            }
            Err(error) => rejected.push(RejectedRecord { key, error }),
        }
    }
    Ok((tasks, rejected))
}

/// Builds a multi-path update body that rewrites `addTaskId` for each key.
///
/// The store applies every path of one request together, so a renumbering
/// sent this way is all-or-nothing.
#[must_use]
pub fn renumber_body(updates: &[(TaskKey, u64)]) -> serde_json::Value {
    let paths = updates
        .iter()
        .map(|(key, id)| (format!("{key}/{ADD_TASK_ID_FIELD}"), serde_json::Value::from(*id)))
        .collect();
    serde_json::Value::Object(paths)
}
