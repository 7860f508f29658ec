//! In-memory JSON document collections.
//!
//! The [`DocumentStore`] holds named collections of JSON records keyed by
//! push keys. Operations mirror the REST verbs the server exposes: list,
//! get, push, put, merge, multi-path update, and remove. An empty collection
//! reads back as absent, the way the hosted database returns `null`.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors returned by document store operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// A multi-path update named an empty or malformed path.
    #[error("invalid update path: {0:?}")]
    InvalidPath(String),
    /// Two paths of one multi-path update address the same subtree.
    #[error("update paths overlap: {0:?} and {1:?}")]
    OverlappingPaths(String, String),
    /// A snapshot was not an object of collections.
    #[error("snapshot must map collection names to objects")]
    InvalidSnapshot,
}

/// Records of one collection, ordered by key.
type Collection = BTreeMap<String, Value>;

/// Thread-safe in-memory store of JSON collections.
///
/// Guarded by a single [`RwLock`]; every write holds it for the whole
/// operation, so a multi-path update is observed all-or-nothing.
pub struct DocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a store pre-filled from a snapshot `{collection: {key: record}}`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidSnapshot`] if the snapshot is not an
    /// object whose values are objects (or `null`).
    pub fn from_snapshot(snapshot: Value) -> Result<Self, StoreError> {
        let Value::Object(root) = snapshot else {
            return Err(StoreError::InvalidSnapshot);
        };
        let mut collections = HashMap::new();
        for (name, records) in root {
            match records {
                Value::Object(map) => {
                    collections.insert(name, map.into_iter().collect());
                }
                Value::Null => {}
                _ => return Err(StoreError::InvalidSnapshot),
            }
        }
        Ok(Self {
            collections: RwLock::new(collections),
        })
    }

    /// Returns every record of a collection, or `None` if it is empty.
    pub async fn list(&self, collection: &str) -> Option<Map<String, Value>> {
        let collections = self.collections.read().await;
        let records = collections.get(collection).filter(|c| !c.is_empty())?;
        Some(
            records
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Returns one record, or `None` if the key does not exist.
    pub async fn get(&self, collection: &str, key: &str) -> Option<Value> {
        let collections = self.collections.read().await;
        collections.get(collection)?.get(key).cloned()
    }

    /// Inserts a record under a fresh time-ordered key and returns the key.
    pub async fn push(&self, collection: &str, record: Value) -> String {
        let key = Uuid::now_v7().simple().to_string();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.clone(), record);
        key
    }

    /// Replaces a record. Writing `null` removes it.
    pub async fn put(&self, collection: &str, key: &str, record: Value) {
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_string()).or_default();
        if record.is_null() {
            records.remove(key);
        } else {
            records.insert(key.to_string(), record);
        }
    }

    /// Replaces a whole collection. `None` clears it.
    pub async fn put_collection(&self, collection: &str, records: Option<Map<String, Value>>) {
        let mut collections = self.collections.write().await;
        match records {
            Some(map) => {
                collections.insert(collection.to_string(), map.into_iter().collect());
            }
            None => {
                collections.remove(collection);
            }
        }
    }

    /// Shallow-merges `fields` into a record, creating it if absent.
    ///
    /// A `null` field value removes that field. Returns the merged record,
    /// or `None` if the merge left it empty (and therefore removed).
    pub async fn merge(
        &self,
        collection: &str,
        key: &str,
        fields: Map<String, Value>,
    ) -> Option<Value> {
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_string()).or_default();
        let mut current = match records.remove(key) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        apply_fields(&mut current, fields);
        if current.is_empty() {
            return None;
        }
        let merged = Value::Object(current);
        records.insert(key.to_string(), merged.clone());
        Some(merged)
    }

    /// Applies a multi-path update to a collection atomically.
    ///
    /// Each key of `updates` is a `/`-separated path below the collection:
    /// `key` replaces a whole record, `key/field` sets one field. `null`
    /// removes the addressed value. All paths are validated before anything
    /// is written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] for empty segments and
    /// [`StoreError::OverlappingPaths`] when one path is a prefix of another.
    pub async fn update_paths(
        &self,
        collection: &str,
        updates: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let parsed = parse_paths(&updates)?;
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_string()).or_default();
        for (segments, value) in parsed.into_iter().zip(updates.into_iter().map(|(_, v)| v)) {
            set_path(records, &segments, value);
        }
        Ok(())
    }

    /// Removes a record, returning whether it existed.
    pub async fn remove(&self, collection: &str, key: &str) -> bool {
        let mut collections = self.collections.write().await;
        collections
            .get_mut(collection)
            .is_some_and(|records| records.remove(key).is_some())
    }

    /// Number of records in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, BTreeMap::len)
    }
}

fn apply_fields(target: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (name, value) in fields {
        if value.is_null() {
            target.remove(&name);
        } else {
            target.insert(name, value);
        }
    }
}

/// Splits and validates every path, in the map's iteration order.
fn parse_paths(updates: &Map<String, Value>) -> Result<Vec<Vec<String>>, StoreError> {
    let mut parsed: Vec<Vec<String>> = Vec::with_capacity(updates.len());
    for path in updates.keys() {
        let segments: Vec<String> = path.trim_matches('/').split('/').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty() || s.contains('.')) {
            return Err(StoreError::InvalidPath(path.clone()));
        }
        parsed.push(segments);
    }

    for (i, a) in parsed.iter().enumerate() {
        for b in parsed.iter().skip(i + 1) {
            let shared = a.len().min(b.len());
            if a[..shared] == b[..shared] {
                return Err(StoreError::OverlappingPaths(a.join("/"), b.join("/")));
            }
        }
    }
    Ok(parsed)
}

fn set_path(records: &mut Collection, segments: &[String], value: Value) {
    let Some((key, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        if value.is_null() {
            records.remove(key);
        } else {
            records.insert(key.clone(), value);
        }
        return;
    }

    let record = records.entry(key.clone()).or_insert_with(|| Value::Object(Map::new()));
    set_nested(record, rest, value);
    if record.as_object().is_some_and(Map::is_empty) {
        records.remove(key);
    }
}

fn set_nested(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };
    if rest.is_empty() {
        if value.is_null() {
            map.remove(head);
        } else {
            map.insert(head.clone(), value);
        }
        return;
    }
    let child = map.entry(head.clone()).or_insert_with(|| Value::Object(Map::new()));
    set_nested(child, rest, value);
}
