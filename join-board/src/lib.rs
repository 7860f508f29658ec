//! Join: kanban task board client for a Firebase-style REST store.

pub mod board;
pub mod commands;
pub mod config;
pub mod drag;
pub mod store;
pub mod tasks;
