//! HTTP client for a Firebase-style Realtime Database.
//!
//! Talks to `<base>/tasks.json` and `<base>/tasks/<key>.json`. The hosted
//! database and the local `join-store` server answer the same way, so this
//! client is used against both.

use std::time::Duration;

use join_proto::task::{
    self, ProtoError, PushResponse, StatusPatch, TASKS_COLLECTION, TaskCollection, TaskKey,
    TaskRecord,
};
use reqwest::Client;
use url::Url;

use super::{StoreError, TaskStore};

/// Extract a human-readable message from a JSON error body.
///
/// The database reports failures as `{"error": "..."}`; anything else is
/// passed through as-is.
fn extract_error_description(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json.get("error").and_then(|v| v.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// [`TaskStore`] backed by the database's REST API.
#[derive(Debug, Clone)]
pub struct HttpTaskStore {
    client: Client,
    /// Base URL without a trailing slash.
    base_url: String,
}

impl HttpTaskStore {
    /// Creates a client with the HTTP library's default timeouts.
    #[must_use]
    pub fn new(base_url: &Url) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    /// Creates a client with an optional per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Http`] if the HTTP client cannot be built.
    pub fn with_timeout(base_url: &Url, timeout: Option<Duration>) -> Result<Self, StoreError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/{TASKS_COLLECTION}.json", self.base_url)
    }

    fn record_url(&self, key: &TaskKey) -> String {
        format!("{}/{TASKS_COLLECTION}/{key}.json", self.base_url)
    }

    /// Map a non-success response to [`StoreError::Status`].
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body: extract_error_description(&body),
        })
    }
}

impl TaskStore for HttpTaskStore {
    async fn list(&self) -> Result<TaskCollection, StoreError> {
        let response = self.client.get(self.collection_url()).send().await?;
        let body = Self::check_response(response).await?.bytes().await?;
        let (tasks, rejected) = task::decode_collection(&body)?;
        for bad in rejected {
            tracing::warn!(key = %bad.key, error = %bad.error, "skipping undecodable task record");
        }
        Ok(tasks)
    }

    async fn get(&self, key: &TaskKey) -> Result<Option<TaskRecord>, StoreError> {
        let response = self.client.get(self.record_url(key)).send().await?;
        let body = Self::check_response(response).await?.bytes().await?;
        Ok(task::decode_record(&body)?)
    }

    async fn insert(&self, record: &TaskRecord) -> Result<TaskKey, StoreError> {
        let response = self.client.post(self.collection_url()).json(record).send().await?;
        let body = Self::check_response(response).await?.bytes().await?;
        let pushed: PushResponse = serde_json::from_slice(&body).map_err(ProtoError::from)?;
        tracing::debug!(key = %pushed.name, add_task_id = record.add_task_id, "task inserted");
        Ok(pushed.name)
    }

    async fn replace(&self, key: &TaskKey, record: &TaskRecord) -> Result<(), StoreError> {
        let response = self.client.put(self.record_url(key)).json(record).send().await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn patch_status(&self, key: &TaskKey, patch: StatusPatch) -> Result<(), StoreError> {
        let response = self.client.patch(self.record_url(key)).json(&patch).send().await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn remove(&self, key: &TaskKey) -> Result<(), StoreError> {
        let response = self.client.delete(self.record_url(key)).send().await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn renumber(&self, updates: &[(TaskKey, u64)]) -> Result<(), StoreError> {
        if updates.is_empty() {
            return Ok(());
        }
        let body = task::renumber_body(updates);
        let response = self.client.patch(self.collection_url()).json(&body).send().await?;
        Self::check_response(response).await?;
        Ok(())
    }
}
