//! HTTP front end of the store: routes, handlers, and server startup.
//!
//! Resources follow the Firebase REST layout. Every path ends in `.json`:
//!
//! | Method | Path                      | Effect                              |
//! |--------|---------------------------|-------------------------------------|
//! | GET    | `/<collection>.json`      | whole collection or `null`          |
//! | POST   | `/<collection>.json`      | insert, returns `{"name": key}`     |
//! | PUT    | `/<collection>.json`      | replace collection                  |
//! | PATCH  | `/<collection>.json`      | atomic multi-path update            |
//! | GET    | `/<collection>/<key>.json`| one record or `null`                |
//! | PUT    | `/<collection>/<key>.json`| replace record (`null` deletes)     |
//! | PATCH  | `/<collection>/<key>.json`| shallow merge                       |
//! | DELETE | `/<collection>/<key>.json`| remove record                       |

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use join_proto::task::{PushResponse, TaskKey};
use serde_json::{Map, Value};

use crate::store::{self, DocumentStore};

/// Default maximum accepted request body size in bytes (1 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Suffix every resource path carries.
const JSON_SUFFIX: &str = ".json";

/// Shared server state holding the document store.
pub struct StoreState {
    /// The backing collections.
    pub store: DocumentStore,
    /// Maximum accepted request body size in bytes.
    max_body_size: usize,
}

impl Default for StoreState {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreState {
    /// Creates state with an empty store and the default body limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: DocumentStore::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Creates state around an existing store with a custom body limit.
    #[must_use]
    pub const fn with_config(max_body_size: usize, store: DocumentStore) -> Self {
        Self {
            store,
            max_body_size,
        }
    }
}

/// Error responses, rendered as `{"error": "..."}` like the hosted database.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The path does not name a `.json` resource.
    #[error("not found")]
    NotFound,
    /// The request body is not valid JSON.
    #[error("invalid data; couldn't parse JSON object")]
    InvalidJson,
    /// The body is valid JSON of a kind this endpoint does not accept.
    #[error("invalid data; {0}")]
    InvalidData(&'static str),
    /// A multi-path update was rejected.
    #[error(transparent)]
    Update(#[from] store::StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidJson | Self::InvalidData(_) | Self::Update(_) => StatusCode::BAD_REQUEST,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Strips the `.json` suffix from the last path segment.
fn resource(segment: &str) -> Result<&str, ApiError> {
    segment
        .strip_suffix(JSON_SUFFIX)
        .filter(|name| !name.is_empty())
        .ok_or(ApiError::NotFound)
}

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|_| ApiError::InvalidJson)
}

fn parse_object(body: &Bytes) -> Result<Map<String, Value>, ApiError> {
    match parse_body(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::InvalidData("expected an object")),
    }
}

async fn get_collection(
    State(state): State<Arc<StoreState>>,
    Path(segment): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let collection = resource(&segment)?;
    let records = state.store.list(collection).await;
    tracing::debug!(
        collection = %collection,
        count = records.as_ref().map_or(0, Map::len),
        "list collection"
    );
    Ok(Json(records.map_or(Value::Null, Value::Object)))
}

async fn push_record(
    State(state): State<Arc<StoreState>>,
    Path(segment): Path<String>,
    body: Bytes,
) -> Result<Json<PushResponse>, ApiError> {
    let collection = resource(&segment)?;
    let record = parse_body(&body)?;
    if record.is_null() {
        return Err(ApiError::InvalidData("cannot push null"));
    }
    let key = state.store.push(collection, record).await;
    tracing::info!(collection = %collection, key = %key, "record inserted");
    Ok(Json(PushResponse {
        name: TaskKey::new(key),
    }))
}

async fn put_collection(
    State(state): State<Arc<StoreState>>,
    Path(segment): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let collection = resource(&segment)?;
    let value = parse_body(&body)?;
    let records = match &value {
        Value::Object(map) => Some(map.clone()),
        Value::Null => None,
        _ => return Err(ApiError::InvalidData("expected an object or null")),
    };
    state.store.put_collection(collection, records).await;
    tracing::info!(collection = %collection, "collection replaced");
    Ok(Json(value))
}

async fn patch_collection(
    State(state): State<Arc<StoreState>>,
    Path(segment): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let collection = resource(&segment)?;
    let updates = parse_object(&body)?;
    let echo = Value::Object(updates.clone());
    let paths = updates.len();
    if let Err(e) = state.store.update_paths(collection, updates).await {
        tracing::warn!(collection = %collection, error = %e, "multi-path update rejected");
        return Err(e.into());
    }
    tracing::info!(collection = %collection, paths, "multi-path update applied");
    Ok(Json(echo))
}

async fn get_record(
    State(state): State<Arc<StoreState>>,
    Path((collection, segment)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let key = resource(&segment)?;
    let record = state.store.get(&collection, key).await;
    tracing::debug!(collection = %collection, key = %key, found = record.is_some(), "get record");
    Ok(Json(record.unwrap_or(Value::Null)))
}

async fn put_record(
    State(state): State<Arc<StoreState>>,
    Path((collection, segment)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let key = resource(&segment)?;
    let record = parse_body(&body)?;
    state.store.put(&collection, key, record.clone()).await;
    tracing::debug!(collection = %collection, key = %key, "record replaced");
    Ok(Json(record))
}

async fn patch_record(
    State(state): State<Arc<StoreState>>,
    Path((collection, segment)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let key = resource(&segment)?;
    let fields = parse_object(&body)?;
    let echo = Value::Object(fields.clone());
    state.store.merge(&collection, key, fields).await;
    tracing::debug!(collection = %collection, key = %key, "record patched");
    Ok(Json(echo))
}

async fn delete_record(
    State(state): State<Arc<StoreState>>,
    Path((collection, segment)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let key = resource(&segment)?;
    let existed = state.store.remove(&collection, key).await;
    tracing::info!(collection = %collection, key = %key, existed, "record deleted");
    Ok(Json(Value::Null))
}

/// Builds the router for the given state.
pub fn router(state: Arc<StoreState>) -> Router {
    let max_body_size = state.max_body_size;
    Router::new()
        .route(
            "/{collection}",
            get(get_collection)
                .post(push_record)
                .put(put_collection)
                .patch(patch_collection),
        )
        .route(
            "/{collection}/{key}",
            get(get_record)
                .put(put_record)
                .patch(patch_record)
                .delete(delete_record),
        )
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(state)
}

/// Starts the store server on the given address with an empty store.
///
/// Returns the actual bound address (useful when binding to port 0) and a
/// [`tokio::task::JoinHandle`] for the server task.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(StoreState::new())).await
}

/// Starts the store server with a pre-configured [`StoreState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<StoreState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "store server error");
        }
    });

    Ok((bound_addr, handle))
}
