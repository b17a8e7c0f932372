// ============================================================
// OBJECT STORE
// ============================================================
// Bucket operations used by the ingestion workflow

mod local;
mod s3;
mod sigv4;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::domain::error::Result;
use crate::domain::storage::ObjectSummary;
use crate::infrastructure::config::{StorageBackend, StorageSettings};

pub use local::LocalFsStore;
pub use s3::{S3Credentials, S3Store};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    /// All objects whose key starts with `prefix`, in key order.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>>;

    /// Metadata for `key`, or `None` when it does not exist.
    async fn head(&self, key: &str) -> Result<Option<ObjectSummary>>;

    async fn download(&self, key: &str, dest: &Path) -> Result<()>;

    async fn upload(&self, src: &Path, key: &str) -> Result<()>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Build the configured store.
pub fn from_settings(settings: &StorageSettings) -> Result<Arc<dyn ObjectStore>> {
    match settings.backend {
        StorageBackend::S3 => {
            let credentials = S3Credentials {
                access_key_id: settings.access_key_id.clone().unwrap_or_default(),
                secret_access_key: settings.secret_access_key.clone().unwrap_or_default(),
            };
            let store = S3Store::new(
                &settings.endpoint,
                &settings.bucket,
                &settings.region,
                credentials,
            )?;
            Ok(Arc::new(store))
        }
        StorageBackend::Local => Ok(Arc::new(LocalFsStore::new(
            settings.local_root.join(&settings.bucket),
            &settings.bucket,
        ))),
    }
}
