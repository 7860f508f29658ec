//! Store server settings.
//!
//! Flags (and their `STORE_*` environment variables) win over the
//! `[server]` table of `~/.config/join-store/config.toml`, which wins over
//! compiled defaults. Settings are checked before the server binds: a zero
//! body limit or an unreadable seed snapshot stops startup instead of
//! serving an unusable or empty board.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::server::DEFAULT_MAX_BODY_SIZE;
use crate::store::{self, DocumentStore};

/// Address the server binds to when none is configured.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:9000";

/// Errors that can occur when loading store configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A body limit of zero would reject every write.
    #[error("max_body_size must be at least 1 byte")]
    ZeroBodyLimit,

    /// The seed snapshot cannot be opened.
    #[error("cannot open seed {path}: {source}")]
    SeedUnreadable {
        /// Configured seed path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The seed snapshot is not valid JSON.
    #[error("seed {path} is not JSON: {source}")]
    SeedJson {
        /// Configured seed path.
        path: PathBuf,
        /// Parser error.
        source: serde_json::Error,
    },

    /// The seed snapshot is JSON but not a map of collections.
    #[error("seed {path}: {source}")]
    SeedShape {
        /// Configured seed path.
        path: PathBuf,
        /// Why the snapshot was refused.
        source: store::StoreError,
    },
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StoreConfigFile {
    server: ServerTable,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ServerTable {
    bind_addr: Option<String>,
    max_body_size: Option<usize>,
    seed: Option<PathBuf>,
}

/// CLI arguments for the store server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Join in-memory REST store")]
pub struct StoreCliArgs {
    /// Address to bind the store server to.
    #[arg(short, long, env = "STORE_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/join-store/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum accepted request body size in bytes.
    #[arg(long)]
    pub max_body_size: Option<usize>,

    /// JSON snapshot (`{"tasks": {...}}`) to load at startup.
    #[arg(long, env = "STORE_SEED")]
    pub seed: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "STORE_LOG")]
    pub log_level: String,
}

/// Checked store server configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Address to bind the server to (e.g., `127.0.0.1:9000`).
    pub bind_addr: String,
    /// Maximum accepted request body size in bytes, never zero.
    pub max_body_size: usize,
    /// Snapshot loaded at startup; known to be openable when loaded.
    pub seed: Option<PathBuf>,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            seed: None,
            log_level: "info".to_string(),
        }
    }
}

impl StoreConfig {
    /// Merges flags, the config file, and defaults, then checks the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicit `--config` is missing, any
    /// config file is unreadable or malformed, the body limit is zero, or
    /// the seed snapshot cannot be opened.
    pub fn load(cli: &StoreCliArgs) -> Result<Self, ConfigError> {
        let table = match cli.config.as_deref() {
            Some(path) => read_table(path, true)?,
            None => match dirs::config_dir() {
                Some(dir) => read_table(&dir.join("join-store").join("config.toml"), false)?,
                None => ServerTable::default(),
            },
        };
        Self::merge(cli, table).checked()
    }

    fn merge(cli: &StoreCliArgs, table: ServerTable) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: cli
                .bind
                .clone()
                .or(table.bind_addr)
                .unwrap_or(defaults.bind_addr),
            max_body_size: cli
                .max_body_size
                .or(table.max_body_size)
                .unwrap_or(defaults.max_body_size),
            seed: cli.seed.clone().or(table.seed),
            log_level: cli.log_level.clone(),
        }
    }

    fn checked(self) -> Result<Self, ConfigError> {
        if self.max_body_size == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }
        if let Some(path) = &self.seed {
            File::open(path).map_err(|source| ConfigError::SeedUnreadable {
                path: path.clone(),
                source,
            })?;
        }
        Ok(self)
    }

    /// Builds the document store, filled from the seed snapshot if set.
    ///
    /// # Errors
    ///
    /// Returns a `Seed*` [`ConfigError`] if the snapshot cannot be read,
    /// is not JSON, or does not map collection names to objects.
    pub fn open_store(&self) -> Result<DocumentStore, ConfigError> {
        let Some(path) = &self.seed else {
            return Ok(DocumentStore::new());
        };
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::SeedUnreadable {
                path: path.clone(),
                source,
            })?;
        let snapshot = serde_json::from_str(&contents).map_err(|source| ConfigError::SeedJson {
            path: path.clone(),
            source,
        })?;
        DocumentStore::from_snapshot(snapshot).map_err(|source| ConfigError::SeedShape {
            path: path.clone(),
            source,
        })
    }
}

/// Reads the `[server]` table; a missing file is empty unless `required`.
fn read_table(path: &Path, required: bool) -> Result<ServerTable, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(toml::from_str::<StoreConfigFile>(&contents)?.server),
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            Ok(ServerTable::default())
        }
        Err(source) => Err(ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}
