//! Join store server library.
//!
//! An in-memory JSON document store that speaks the Firebase Realtime
//! Database REST dialect (`<collection>.json`, `<collection>/<key>.json`).
//! The board client talks to it exactly as it would to the hosted database,
//! which makes it usable for local development and end-to-end tests.

pub mod config;
pub mod server;
pub mod store;
