//! In-memory task store for testing.
//!
//! Behaves like the remote store (keys assigned on insert, last write wins,
//! missing keys read as absent) and can be told to fail reads or to start
//! failing writes after a given number of successes, which is how the
//! repository's failure handling is exercised.

use join_proto::task::{StatusPatch, TaskCollection, TaskKey, TaskRecord};
use parking_lot::Mutex;
use uuid::Uuid;

use super::{StoreError, TaskStore};

#[derive(Debug, Default)]
struct Inner {
    tasks: TaskCollection,
    fail_reads: bool,
    /// Remaining writes before every write fails; `None` never fails.
    writes_left: Option<usize>,
    /// Successful write requests so far.
    write_count: usize,
}

impl Inner {
    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }

    fn check_write(&mut self) -> Result<(), StoreError> {
        match self.writes_left {
            Some(0) => Err(StoreError::Unavailable("injected write failure".to_string())),
            Some(left) => {
                self.writes_left = Some(left - 1);
                self.write_count += 1;
                Ok(())
            }
            None => {
                self.write_count += 1;
                Ok(())
            }
        }
    }
}

/// [`TaskStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    inner: Mutex<Inner>,
}

impl MemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given records.
    #[must_use]
    pub fn with_tasks(tasks: TaskCollection) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tasks,
                ..Inner::default()
            }),
        }
    }

    /// Makes every subsequent read fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.inner.lock().fail_reads = fail;
    }

    /// Lets `successes` more writes through, then fails every write.
    pub fn fail_writes_after(&self, successes: usize) {
        self.inner.lock().writes_left = Some(successes);
    }

    /// Clears all injected faults.
    pub fn heal(&self) {
        let mut inner = self.inner.lock();
        inner.fail_reads = false;
        inner.writes_left = None;
    }

    /// Returns a copy of the stored records.
    #[must_use]
    pub fn snapshot(&self) -> TaskCollection {
        self.inner.lock().tasks.clone()
    }

    /// Number of write requests that succeeded.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.lock().write_count
    }
}

impl TaskStore for MemoryTaskStore {
    async fn list(&self) -> Result<TaskCollection, StoreError> {
        let inner = self.inner.lock();
        inner.check_read()?;
        Ok(inner.tasks.clone())
    }

    async fn get(&self, key: &TaskKey) -> Result<Option<TaskRecord>, StoreError> {
        let inner = self.inner.lock();
        inner.check_read()?;
        Ok(inner.tasks.get(key).cloned())
    }

    async fn insert(&self, record: &TaskRecord) -> Result<TaskKey, StoreError> {
        let mut inner = self.inner.lock();
        inner.check_write()?;
        let key = TaskKey::new(Uuid::now_v7().simple().to_string());
        inner.tasks.insert(key.clone(), record.clone());
        Ok(key)
    }

    async fn replace(&self, key: &TaskKey, record: &TaskRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.check_write()?;
        inner.tasks.insert(key.clone(), record.clone());
        Ok(())
    }

    async fn patch_status(&self, key: &TaskKey, patch: StatusPatch) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.check_write()?;
        // A patch on a missing key would create a partial record remotely;
        // a record without its fields cannot be represented here, so skip it.
        if let Some(record) = inner.tasks.get_mut(key) {
            record.status = patch.status;
            record.sequence = Some(patch.sequence);
        }
        Ok(())
    }

    async fn remove(&self, key: &TaskKey) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.check_write()?;
        inner.tasks.remove(key);
        Ok(())
    }

    async fn renumber(&self, updates: &[(TaskKey, u64)]) -> Result<(), StoreError> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock();
        inner.check_write()?;
        for (key, id) in updates {
            if let Some(record) = inner.tasks.get_mut(key) {
                record.add_task_id = *id;
            }
        }
        Ok(())
    }
}
