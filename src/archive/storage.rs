use crate::archive::error::ArchiveError;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Archive trait defining the interface for writing raw payloads to
/// S3-compatible blob storage
#[async_trait]
pub trait Archive: Send + Sync + 'static {
    /// Store an object under the given key, overwriting any existing one
    async fn put_object(&self, key: &str, data: Bytes) -> Result<(), ArchiveError>;

    /// Fetch an object by key (test-only)
    #[cfg(test)]
    async fn get_object(&self, key: &str) -> Result<Bytes, ArchiveError>;

    /// List keys under a prefix (test-only)
    #[cfg(test)]
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ArchiveError>;
}

/// Implementation of Archive trait for Arc<T> where T implements Archive
///
/// This allows sharing archive instances across threads and components
/// efficiently.
#[async_trait]
impl<T: Archive + ?Sized> Archive for Arc<T> {
    async fn put_object(&self, key: &str, data: Bytes) -> Result<(), ArchiveError> {
        (**self).put_object(key, data).await
    }

    #[cfg(test)]
    async fn get_object(&self, key: &str) -> Result<Bytes, ArchiveError> {
        (**self).get_object(key).await
    }

    #[cfg(test)]
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ArchiveError> {
        (**self).list_keys(prefix).await
    }
}
