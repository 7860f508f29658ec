//! Join store server -- in-memory stand-in for the hosted task database.
//!
//! Serves the Firebase REST dialect the board client speaks, so the client
//! can run against a local process instead of the hosted database.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 127.0.0.1:9000
//! cargo run --bin join-store
//!
//! # Run on custom address with a preloaded board
//! cargo run --bin join-store -- --bind 0.0.0.0:8080 --seed board.json
//! ```

use std::sync::Arc;

use clap::Parser;
use join_store::config::{StoreCliArgs, StoreConfig};
use join_store::server::{self, StoreState};

#[tokio::main]
async fn main() {
    let cli = StoreCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match StoreConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let store = match config.open_store() {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "failed to load seed");
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %config.bind_addr, "starting join store server");

    let state = Arc::new(StoreState::with_config(config.max_body_size, store));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "store server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "store server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start store server");
            std::process::exit(1);
        }
    }
}

