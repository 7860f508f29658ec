//! Integration tests for the `join` subcommands.
//!
//! Commands run against an in-memory store with output captured in a
//! buffer, the same way the binary runs them against stdout.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::NaiveDate;
use clap::Parser;
use join_board::commands::{self, Command, CommandError, TaskArgs};
use join_board::config::{CliArgs, ClientConfig, ConfigError};
use join_board::store::MemoryTaskStore;
use join_board::tasks::{ReindexStrategy, TaskError, TaskRepository};
use join_proto::task::{Priority, SubtaskState, TaskStatus};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
}

/// Parses a command line the way the binary does.
fn parse(args: &[&str]) -> Command {
    let argv = std::iter::once("join").chain(args.iter().copied());
    CliArgs::try_parse_from(argv).unwrap().command.unwrap()
}

async fn run(
    repo: &TaskRepository<MemoryTaskStore>,
    args: &[&str],
) -> Result<String, CommandError> {
    let mut out = Vec::new();
    commands::run(parse(args), repo, today(), &mut out).await?;
    Ok(String::from_utf8(out).unwrap())
}

async fn add(repo: &TaskRepository<MemoryTaskStore>, title: &str) {
    run(
        repo,
        &["add", "--title", title, "--category", "User Story", "--date", "01/07/2026"],
    )
    .await
    .unwrap();
}

fn repo() -> TaskRepository<MemoryTaskStore> {
    TaskRepository::new(MemoryTaskStore::new())
}

// ---------------------------------------------------------------------------
// add / show / edit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_creates_task_in_todo() {
    let repo = repo();
    let out = run(
        &repo,
        &[
            "add",
            "--title",
            "Plan sprint",
            "--description",
            "Pick stories",
            "--category",
            "Technical Task",
            "--date",
            "1.7.26",
            "--priority",
            "urgent",
            "--subtask",
            "estimate",
            "--subtask",
            "assign",
            "--assign",
            "c1",
        ],
    )
    .await
    .unwrap();
    assert!(out.starts_with("Created task 0 ("), "{out}");

    let (_, task) = repo.find_by_task_id(0).await.unwrap();
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.sequence, Some(0));
    assert_eq!(task.fields.priority, Priority::Urgent);
    assert_eq!(task.fields.date.unwrap().to_string(), "01/07/2026");
    assert_eq!(task.fields.subtasks.len(), 2);
    assert!(task.fields.assigned_to.contains("c1"));
}

#[tokio::test]
async fn add_rejects_invalid_form() {
    let repo = repo();
    let err = run(&repo, &["add", "--category", "x", "--date", "01/07/2026"]).await.unwrap_err();
    assert!(matches!(err, CommandError::Task(TaskError::TitleEmpty)));

    let err = run(&repo, &["add", "--title", "t", "--category", "x", "--date", "01/01/2020"])
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Task(TaskError::DateInPast(_))));

    let err = run(&repo, &["add", "--title", "t", "--category", "x", "--date", "soon"])
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::InvalidDate(_)));

    assert!(repo.fetch_all_tasks().await.is_empty());
}

#[tokio::test]
async fn show_prints_details() {
    let repo = repo();
    add(&repo, "Design board").await;
    let out = run(&repo, &["show", "0"]).await.unwrap();
    assert!(out.starts_with("#0 Design board\n"));
    assert!(out.contains("status:      To do (position 0)"));
    assert!(out.contains("due:         01/07/2026"));

    assert!(matches!(run(&repo, &["show", "4"]).await, Err(CommandError::NotFound(4))));
}

#[tokio::test]
async fn edit_changes_fields_and_keeps_placement() {
    let repo = repo();
    add(&repo, "first").await;
    add(&repo, "second").await;

    run(&repo, &["edit", "1", "--title", "second, renamed", "--priority", "low"])
        .await
        .unwrap();

    let (_, task) = repo.find_by_task_id(1).await.unwrap();
    assert_eq!(task.fields.title, "second, renamed");
    assert_eq!(task.fields.priority, Priority::Low);
    assert_eq!(task.fields.category, "User Story");
    assert_eq!((task.status, task.sequence), (TaskStatus::Todo, Some(1)));
}

// ---------------------------------------------------------------------------
// move / status / check / delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn move_and_status_append_to_target_column() {
    let repo = repo();
    for title in ["a", "b", "c"] {
        add(&repo, title).await;
    }

    let out = run(&repo, &["move", "0", "done"]).await.unwrap();
    assert!(out.starts_with("Moved task 0 to Done (position 0)."), "{out}");

    let out = run(&repo, &["status", "2", "DONE"]).await.unwrap();
    assert_eq!(out, "Task 2 is now in Done (position 1).\n");

    let board = repo.load_board().await;
    let done: Vec<u64> = board
        .column(TaskStatus::Done)
        .unwrap()
        .cards
        .iter()
        .map(|c| c.task.add_task_id)
        .collect();
    assert_eq!(done, vec![0, 2]);
}

#[tokio::test]
async fn move_write_failure_is_reported() {
    let repo = repo();
    add(&repo, "a").await;
    repo.store().fail_writes_after(0);
    assert!(matches!(
        run(&repo, &["move", "0", "in-progress"]).await,
        Err(CommandError::MoveFailed(0))
    ));
}

#[tokio::test]
async fn check_toggles_subtask() {
    let repo = repo();
    run(
        &repo,
        &["add", "--title", "t", "--category", "c", "--date", "01/07/2026", "--subtask", "one"],
    )
    .await
    .unwrap();

    let out = run(&repo, &["check", "0", "0"]).await.unwrap();
    assert_eq!(out, "Subtask 0 of task 0 (one) is now checked.\n");
    let (_, task) = repo.find_by_task_id(0).await.unwrap();
    assert_eq!(task.fields.subtasks[0].status, SubtaskState::Checked);

    run(&repo, &["check", "0", "0"]).await.unwrap();
    let (_, task) = repo.find_by_task_id(0).await.unwrap();
    assert_eq!(task.fields.subtasks[0].status, SubtaskState::Unchecked);

    assert!(matches!(
        run(&repo, &["check", "0", "3"]).await,
        Err(CommandError::Task(TaskError::SubtaskIndex(3)))
    ));
}

#[tokio::test]
async fn delete_renumbers_remaining_tasks() {
    let repo = repo();
    for title in ["a", "b", "c"] {
        add(&repo, title).await;
    }
    assert_eq!(run(&repo, &["delete", "0"]).await.unwrap(), "Deleted task 0.\n");

    let (_, b) = repo.find_by_task_id(0).await.unwrap();
    let (_, c) = repo.find_by_task_id(1).await.unwrap();
    assert_eq!((b.fields.title.as_str(), c.fields.title.as_str()), ("b", "c"));
    assert!(matches!(run(&repo, &["delete", "2"]).await, Err(CommandError::NotFound(2))));
}

// ---------------------------------------------------------------------------
// board / summary
// ---------------------------------------------------------------------------

#[tokio::test]
async fn board_lists_columns_and_search_filters() {
    let repo = repo();
    add(&repo, "Fix login").await;
    add(&repo, "Write docs").await;

    let out = run(&repo, &["board"]).await.unwrap();
    assert!(out.contains("To do (2)"));
    assert!(out.contains("Fix login"));
    assert!(out.contains("In progress (0)\n  No tasks in progress"));

    let out = run(&repo, &["board", "--search", "LOGIN"]).await.unwrap();
    assert!(out.contains("To do (1)"));
    assert!(!out.contains("Write docs"));

    let out = run(&repo, &["board", "-s", "zebra"]).await.unwrap();
    assert_eq!(out, "No results found for \"zebra\".\n");
}

#[tokio::test]
async fn board_survives_store_outage() {
    let repo = repo();
    add(&repo, "a").await;
    repo.store().fail_reads(true);
    let out = run(&repo, &["board"]).await.unwrap();
    assert!(out.contains("To do (0)"));
}

#[tokio::test]
async fn summary_counts() {
    let repo = repo();
    add(&repo, "a").await;
    add(&repo, "b").await;
    run(&repo, &["edit", "1", "--priority", "urgent"]).await.unwrap();
    run(&repo, &["status", "0", "done"]).await.unwrap();

    let out = run(&repo, &["summary"]).await.unwrap();
    assert!(out.contains("To do:             1"));
    assert!(out.contains("Done:              1"));
    assert!(out.contains("Tasks on board:    2"));
    assert!(out.contains("Urgent:            1"));
    assert!(out.contains("Upcoming deadline: 01/07/2026"));
}

#[test]
fn task_args_default_is_empty() {
    let args = TaskArgs::default();
    assert!(args.title.is_none() && args.subtasks.is_empty() && args.assign.is_empty());
}

// ---------------------------------------------------------------------------
// startup configuration
// ---------------------------------------------------------------------------

fn load(args: &[&str]) -> Result<ClientConfig, ConfigError> {
    let argv = std::iter::once("join").chain(args.iter().copied());
    ClientConfig::load(&CliArgs::try_parse_from(argv).unwrap())
}

#[test]
fn missing_explicit_config_is_an_error_not_a_fallback() {
    let result = load(&[
        "--config",
        "/nonexistent/join.toml",
        "--store-url",
        "https://prod.example.com/db",
        "--reindex",
        "per-record",
        "delete",
        "0",
    ]);
    assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
}

#[test]
fn mistyped_store_url_is_an_error_not_localhost() {
    for url in ["htps//prod.example.com", "ftp://prod.example.com/db"] {
        let result = load(&["--store-url", url, "delete", "0"]);
        assert!(
            matches!(result, Err(ConfigError::InvalidUrl { .. })),
            "{url} was accepted"
        );
    }
}

#[test]
fn flags_reach_resolved_config() {
    let path = std::env::temp_dir().join(format!("join-{}.toml", uuid::Uuid::now_v7()));
    std::fs::write(&path, "[store]\nrequest_timeout_secs = 7\n").unwrap();

    let config = load(&[
        "--config",
        path.to_str().unwrap(),
        "--store-url",
        "https://prod.example.com/db",
        "--reindex",
        "per-record",
    ])
    .unwrap();

    assert_eq!(config.base_url.as_str(), "https://prod.example.com/db/");
    assert_eq!(config.reindex, ReindexStrategy::PerRecord);
    assert_eq!(config.request_timeout, Some(std::time::Duration::from_secs(7)));
}

/// Accepts writes but fails to flush, like a closed stdout pipe.
struct UnflushableWriter(Vec<u8>);

impl std::io::Write for UnflushableWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
    }
}

#[tokio::test]
async fn failed_flush_is_reported() {
    let repo = repo();
    let mut out = UnflushableWriter(Vec::new());
    let result = commands::run(parse(&["summary"]), &repo, today(), &mut out).await;
    assert!(matches!(result, Err(CommandError::Io(_))));
}
