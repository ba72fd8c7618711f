use crate::archive::error::ArchiveError;
use crate::archive::storage::Archive;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// `FakeArchive` is an in-memory implementation of the `Archive` trait for
/// testing purposes. It allows simulating successful writes and failures.
#[derive(Clone)]
pub struct FakeArchive {
    data: Arc<Mutex<HashMap<String, Bytes>>>,
    fail_keys: Arc<Mutex<HashSet<String>>>,
    fail_all: Arc<Mutex<bool>>,
}

#[allow(dead_code)]
impl FakeArchive {
    /// Create a new empty FakeArchive instance
    pub fn new() -> Self {
        FakeArchive {
            data: Arc::new(Mutex::new(HashMap::new())),
            fail_keys: Arc::new(Mutex::new(HashSet::new())),
            fail_all: Arc::new(Mutex::new(false)),
        }
    }

    /// Simulate a failure for writes to a specific key
    pub async fn fake_fail_key(&self, key: &str) {
        let mut fail_keys = self.fail_keys.lock().await;
        fail_keys.insert(key.to_string());
    }

    /// Simulate a failure for every write
    pub async fn fake_fail_all(&self, fail: bool) {
        let mut fail_all = self.fail_all.lock().await;
        *fail_all = fail;
    }

    /// Number of objects currently stored
    pub async fn fake_object_count(&self) -> usize {
        self.data.lock().await.len()
    }
}

#[async_trait]
impl Archive for FakeArchive {
    async fn put_object(&self, key: &str, data: Bytes) -> Result<(), ArchiveError> {
        if *self.fail_all.lock().await {
            return Err(ArchiveError::WriteError(
                key.to_string(),
                "simulated storage failure".to_string(),
            ));
        }

        let fail_keys = self.fail_keys.lock().await;
        if fail_keys.contains(key) {
            return Err(ArchiveError::WriteError(
                key.to_string(),
                "simulated storage failure".to_string(),
            ));
        }

        let mut storage_data = self.data.lock().await;
        storage_data.insert(key.to_string(), data);
        Ok(())
    }

    #[cfg(test)]
    async fn get_object(&self, key: &str) -> Result<Bytes, ArchiveError> {
        let data = self.data.lock().await;
        match data.get(key) {
            Some(bytes) => Ok(bytes.clone()),
            None => Err(ArchiveError::ObjectNotFound(key.to_string())),
        }
    }

    #[cfg(test)]
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ArchiveError> {
        let data = self.data.lock().await;
        let mut keys: Vec<String> = data
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
impl Default for FakeArchive {
    fn default() -> Self {
        Self::new()
    }
}
