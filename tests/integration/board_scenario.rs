//! End-to-end board scenarios against an in-process `join-store`.
//!
//! Walks the create / move / delete flow and checks id density, sequence
//! allocation, column order, and delete renumbering through the real HTTP
//! client.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeSet;

use join_board::board::Board;
use join_board::drag::{DragController, MoveOutcome};
use join_board::store::HttpTaskStore;
use join_board::tasks::{ReindexStrategy, TaskRepository};
use join_proto::task::{TaskFields, TaskKey, TaskStatus};
use serde_json::json;
use url::Url;

async fn start_repo(
    reindex: ReindexStrategy,
) -> (TaskRepository<HttpTaskStore>, Url, tokio::task::JoinHandle<()>) {
    let (addr, handle) = join_store::server::start_server("127.0.0.1:0")
        .await
        .expect("failed to start store server");
    let url = Url::parse(&format!("http://{addr}/")).unwrap();
    let repo = TaskRepository::new(HttpTaskStore::new(&url)).with_reindex(reindex);
    (repo, url, handle)
}

fn fields(title: &str) -> TaskFields {
    TaskFields {
        title: title.to_string(),
        ..TaskFields::default()
    }
}

/// `(addTaskId, sequence, title)` of a column, in display order.
fn column(board: &Board, status: TaskStatus) -> Vec<(u64, Option<u64>, String)> {
    board
        .column(status)
        .unwrap()
        .cards
        .iter()
        .map(|c| (c.task.add_task_id, c.task.sequence, c.task.fields.title.clone()))
        .collect()
}

#[tokio::test]
async fn create_move_delete_scenario() {
    for reindex in [ReindexStrategy::Batch, ReindexStrategy::PerRecord] {
        let (repo, _url, _handle) = start_repo(reindex).await;

        let mut keys: Vec<TaskKey> = Vec::new();
        for title in ["t0", "t1", "t2"] {
            keys.push(repo.create_task(fields(title)).await.unwrap());
        }
        let board = repo.load_board().await;
        assert_eq!(
            column(&board, TaskStatus::Todo),
            vec![
                (0, Some(0), "t0".to_string()),
                (1, Some(1), "t1".to_string()),
                (2, Some(2), "t2".to_string()),
            ]
        );

        // Move id 1 to in progress.
        let mut drag = DragController::new();
        drag.start_dragging(keys[1].clone());
        let MoveOutcome::Moved { board, .. } = drag.move_to(&repo, TaskStatus::InProgress).await
        else {
            panic!("expected a move");
        };
        assert_eq!(
            column(&board, TaskStatus::Todo),
            vec![(0, Some(0), "t0".to_string()), (2, Some(2), "t2".to_string())]
        );
        assert_eq!(column(&board, TaskStatus::InProgress), vec![(1, Some(0), "t1".to_string())]);

        // Delete id 0: ids shift down, sequences stay.
        assert!(repo.delete_task(0).await.unwrap());
        let board = repo.load_board().await;
        assert_eq!(
            column(&board, TaskStatus::Todo),
            vec![(1, Some(2), "t2".to_string())],
            "{reindex:?}"
        );
        assert_eq!(
            column(&board, TaskStatus::InProgress),
            vec![(0, Some(0), "t1".to_string())],
            "{reindex:?}"
        );
        assert_eq!(board.card_count(), 2);
    }
}

#[tokio::test]
async fn delete_preserves_relative_order_of_ids() {
    let (repo, _url, _handle) = start_repo(ReindexStrategy::Batch).await;
    for title in ["t0", "t1", "t2", "t3"] {
        repo.create_task(fields(title)).await.unwrap();
    }

    assert!(repo.delete_task(1).await.unwrap());

    let tasks = repo.fetch_all_tasks().await;
    let mut by_id: Vec<(u64, String)> = tasks
        .values()
        .map(|t| (t.add_task_id, t.fields.title.clone()))
        .collect();
    by_id.sort();
    assert_eq!(
        by_id,
        vec![(0, "t0".to_string()), (1, "t2".to_string()), (2, "t3".to_string())]
    );
}

#[tokio::test]
async fn first_fit_id_after_external_gap() {
    let (repo, url, _handle) = start_repo(ReindexStrategy::Batch).await;
    for title in ["t0", "t1", "t2", "t3"] {
        repo.create_task(fields(title)).await.unwrap();
    }
    // Another client removes id 2 without renumbering.
    let (key, _) = repo.find_by_task_id(2).await.unwrap();
    let response = reqwest::Client::new()
        .delete(format!("{url}tasks/{key}.json"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    assert_eq!(repo.next_task_id().await, 2);
    let key = repo.create_task(fields("filler")).await.unwrap();
    assert_eq!(repo.fetch_task(&key).await.unwrap().add_task_id, 2);

    let ids: BTreeSet<u64> = repo.fetch_all_tasks().await.values().map(|t| t.add_task_id).collect();
    assert_eq!(ids, BTreeSet::from([0, 1, 2, 3]));
}

#[tokio::test]
async fn null_sequence_sorts_first() {
    let (repo, url, _handle) = start_repo(ReindexStrategy::Batch).await;
    for title in ["three", "one", "two"] {
        repo.create_task(fields(title)).await.unwrap();
    }
    // Rewrite sequences to [3, 1, 2] and add a record without one.
    let client = reqwest::Client::new();
    for (title, sequence) in [("three", 3), ("one", 1), ("two", 2)] {
        let (key, _) = repo
            .fetch_all_tasks()
            .await
            .into_iter()
            .find(|(_, t)| t.fields.title == title)
            .unwrap();
        client
            .patch(format!("{url}tasks/{key}.json"))
            .json(&json!({"sequence": sequence}))
            .send()
            .await
            .unwrap();
    }
    client
        .put(format!("{url}tasks/legacy.json"))
        .json(&json!({"addTaskId": 3, "status": "todo", "title": "unsequenced"}))
        .send()
        .await
        .unwrap();

    let board = repo.load_board().await;
    let titles: Vec<String> = column(&board, TaskStatus::Todo)
        .into_iter()
        .map(|(_, _, t)| t)
        .collect();
    assert_eq!(titles, vec!["unsequenced", "one", "two", "three"]);
    assert_eq!(repo.next_sequence(TaskStatus::Todo).await, 4);
}

#[tokio::test]
async fn status_patch_and_search_and_summary() {
    let (repo, _url, _handle) = start_repo(ReindexStrategy::Batch).await;
    let a = repo.create_task(fields("Fix login")).await.unwrap();
    repo.create_task(fields("Write docs")).await.unwrap();

    let patch = repo.change_status(&a, TaskStatus::AwaitFeedback).await.unwrap().unwrap();
    assert_eq!(patch.sequence, 0);

    let board = repo.load_board().await;
    let found = board.filter("LOGIN");
    assert_eq!(found.card_count(), 1);
    assert_eq!(found.column(TaskStatus::AwaitFeedback).unwrap().len(), 1);
    assert!(board.filter("nothing like this").is_empty());

    let summary = repo.summary(chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()).await;
    assert_eq!((summary.todo, summary.await_feedback, summary.total), (1, 1, 2));
}
