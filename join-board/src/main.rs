//! `join`: kanban task board on the command line.
//!
//! Talks to a Firebase-style REST store (or a local `join-store`).
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/join/config.toml`).
//!
//! ```bash
//! # Show the board from a local join-store
//! cargo run --bin join
//!
//! # Against a remote database
//! cargo run --bin join -- --store-url https://example.firebasedatabase.app/ board
//!
//! # Add, move, and delete tasks
//! cargo run --bin join -- add --title "Write docs" --category "Technical Task" --date 01/07/2026
//! cargo run --bin join -- move 0 in-progress
//! cargo run --bin join -- delete 0
//! ```

use std::io;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use join_board::commands::{self, Command};
use join_board::config::{CliArgs, ClientConfig};
use join_board::store::HttpTaskStore;
use join_board::tasks::TaskRepository;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    // Logs never go to stdout, which carries command output.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let store = match HttpTaskStore::with_timeout(&config.base_url, config.request_timeout) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let repo = TaskRepository::new(store).with_reindex(config.reindex);
    tracing::debug!(base_url = %config.base_url, reindex = ?config.reindex, "store configured");

    let command = cli.command.unwrap_or(Command::Board { search: None });
    let today = chrono::Local::now().date_naive();
    let mut stdout = io::stdout().lock();

    match commands::run(command, &repo, today, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging to stderr, or to `file_path` when given.
///
/// Returns a [`WorkerGuard`] for file logging that must be held until
/// shutdown to ensure all buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let Some((log_dir, file_name)) = file_path.and_then(split_log_path) else {
        if let Some(path) = file_path {
            eprintln!("Warning: --log-file {} names no file; logging to stderr", path.display());
        }
        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(env_filter)
            .init();
        return None;
    };

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Splits a log file path into its directory and file name.
///
/// Returns `None` for paths with no file name, such as `/` or `..`.
fn split_log_path(path: &Path) -> Option<(&Path, &str)> {
    let file_name = path.file_name()?.to_str()?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    Some((dir, file_name))
}
