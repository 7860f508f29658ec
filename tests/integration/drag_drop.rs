//! Integration tests for dragging tasks between columns over HTTP.
//!
//! Drives [`DragController`] against an in-process `join-store`, checking
//! that a drop writes status and sequence together and that the reloaded
//! board reflects the store.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use join_board::drag::{DragController, DragState, MoveOutcome};
use join_board::store::{HttpTaskStore, MemoryTaskStore};
use join_board::tasks::TaskRepository;
use join_proto::task::{TaskFields, TaskStatus};
use url::Url;

async fn start_repo() -> (TaskRepository<HttpTaskStore>, tokio::task::JoinHandle<()>) {
    let (addr, handle) = join_store::server::start_server("127.0.0.1:0")
        .await
        .expect("failed to start store server");
    let url = Url::parse(&format!("http://{addr}/")).unwrap();
    (TaskRepository::new(HttpTaskStore::new(&url)), handle)
}

fn fields(title: &str) -> TaskFields {
    TaskFields {
        title: title.to_string(),
        ..TaskFields::default()
    }
}

fn titles(board: &join_board::board::Board, status: TaskStatus) -> Vec<String> {
    board
        .column(status)
        .unwrap()
        .cards
        .iter()
        .map(|c| c.task.fields.title.clone())
        .collect()
}

#[tokio::test]
async fn drop_into_empty_column_gets_sequence_zero() {
    let (repo, _handle) = start_repo().await;
    let key = repo.create_task(fields("a")).await.unwrap();

    let mut drag = DragController::new();
    drag.start_dragging(key.clone());
    let MoveOutcome::Moved { task, board } = drag.move_to(&repo, TaskStatus::Done).await else {
        panic!("expected a move");
    };

    assert_eq!((task.status, task.sequence, task.add_task_id), (TaskStatus::Done, Some(0), 0));
    assert_eq!(titles(&board, TaskStatus::Done), vec!["a"]);
    assert_eq!(repo.fetch_task(&key).await.unwrap(), task);
}

#[tokio::test]
async fn drop_appends_after_column_maximum() {
    let (repo, _handle) = start_repo().await;
    let a = repo.create_task(fields("a")).await.unwrap();
    let b = repo.create_task(fields("b")).await.unwrap();
    let c = repo.create_task(fields("c")).await.unwrap();
    repo.patch_task_status(&a, TaskStatus::Done, 7).await.unwrap();
    repo.patch_task_status(&b, TaskStatus::Done, 2).await.unwrap();

    let mut drag = DragController::new();
    drag.start_dragging(c.clone());
    let MoveOutcome::Moved { task, board } = drag.move_to(&repo, TaskStatus::Done).await else {
        panic!("expected a move");
    };

    assert_eq!(task.sequence, Some(8));
    assert_eq!(task.add_task_id, 2);
    assert_eq!(titles(&board, TaskStatus::Done), vec!["b", "a", "c"]);
    assert!(board.column(TaskStatus::Todo).unwrap().is_empty());
}

#[tokio::test]
async fn drop_on_same_column_moves_to_end() {
    let (repo, _handle) = start_repo().await;
    let first = repo.create_task(fields("first")).await.unwrap();
    repo.create_task(fields("second")).await.unwrap();

    let mut drag = DragController::new();
    drag.start_dragging(first);
    let MoveOutcome::Moved { board, .. } = drag.move_to(&repo, TaskStatus::Todo).await else {
        panic!("expected a move");
    };
    assert_eq!(titles(&board, TaskStatus::Todo), vec!["second", "first"]);
}

#[tokio::test]
async fn drag_lifecycle() {
    let (repo, _handle) = start_repo().await;
    let key = repo.create_task(fields("a")).await.unwrap();
    let mut drag = DragController::new();

    assert!(!drag.allow_drop());
    drag.start_dragging(key.clone());
    assert!(drag.allow_drop());
    drag.highlight(TaskStatus::InProgress);
    assert_eq!(drag.highlighted(), Some(TaskStatus::InProgress));

    // Leaving the column without dropping.
    drag.remove_highlight();
    drag.end_drag();
    assert_eq!(drag.state(), &DragState::Dragging(key));

    drag.highlight(TaskStatus::InProgress);
    assert!(matches!(
        drag.move_to(&repo, TaskStatus::InProgress).await,
        MoveOutcome::Moved { .. }
    ));
    assert_eq!(drag.state(), &DragState::Idle);
    assert_eq!(drag.highlighted(), None);

    // A second drop without a new drag does nothing.
    assert_eq!(drag.move_to(&repo, TaskStatus::Done).await, MoveOutcome::NothingDragged);
}

#[tokio::test]
async fn dragged_task_deleted_meanwhile() {
    let (repo, _handle) = start_repo().await;
    let key = repo.create_task(fields("gone soon")).await.unwrap();
    let mut drag = DragController::new();
    drag.start_dragging(key);

    assert!(repo.delete_task(0).await.unwrap());
    assert_eq!(drag.move_to(&repo, TaskStatus::Done).await, MoveOutcome::TaskMissing);
    assert_eq!(drag.state(), &DragState::Idle);
}

#[tokio::test]
async fn rejected_write_keeps_board_unchanged() {
    let store = MemoryTaskStore::new();
    let repo = TaskRepository::new(store);
    let key = repo.create_task(fields("stuck")).await.unwrap();
    repo.store().fail_writes_after(0);

    let mut drag = DragController::new();
    drag.start_dragging(key.clone());
    let MoveOutcome::WriteFailed { board } = drag.move_to(&repo, TaskStatus::Done).await else {
        panic!("expected a failed write");
    };
    assert_eq!(titles(&board, TaskStatus::Todo), vec!["stuck"]);
    assert_eq!(drag.state(), &DragState::Idle);

    // No retry: healing the store does not replay the move.
    repo.store().heal();
    let task = repo.fetch_task(&key).await.unwrap();
    assert_eq!(task.status, TaskStatus::Todo);
}
