use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::ObjectStore;
use crate::domain::error::{AppError, Result};
use crate::domain::storage::ObjectSummary;

/// Bucket backed by a directory. Keys are `/`-separated relative paths.
pub struct LocalFsStore {
    root: PathBuf,
    bucket: String,
}

impl LocalFsStore {
    pub fn new(root: impl Into<PathBuf>, bucket: &str) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.to_string(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.split('/').any(|segment| segment == "..") {
            return Err(AppError::StorageError(format!("Invalid object key: '{}'", key)));
        }
        Ok(self.root.join(key))
    }

    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Walk the root directory and collect every file as an object summary.
    async fn walk(&self) -> Result<Vec<ObjectSummary>> {
        let mut objects = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }

                let relative = path.strip_prefix(&self.root).map_err(|e| {
                    AppError::StorageError(format!("Unexpected path {}: {}", path.display(), e))
                })?;
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                objects.push(ObjectSummary {
                    key,
                    size: metadata.len(),
                });
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

#[async_trait]
impl ObjectStore for LocalFsStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        let objects = self.walk().await?;
        Ok(objects
            .into_iter()
            .filter(|o| o.key.starts_with(prefix))
            .collect())
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectSummary>> {
        let path = self.path_for(key)?;
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(ObjectSummary {
                key: key.to_string(),
                size: metadata.len(),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<()> {
        let path = self.path_for(key)?;
        if !fs::try_exists(&path).await? {
            return Err(AppError::NotFound(format!("s3://{}/{}", self.bucket, key)));
        }
        Self::ensure_parent(dest).await?;
        fs::copy(&path, dest).await?;
        Ok(())
    }

    async fn upload(&self, src: &Path, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        Self::ensure_parent(&path).await?;
        fs::copy(src, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_list_head_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path().join("csv-data"), "csv-data");

        let src = dir.path().join("batch.csv");
        std::fs::write(&src, "a,b\n1,2\n").unwrap();

        store.upload(&src, "incoming/batch.csv").await.unwrap();
        store.upload(&src, "processed/old.csv").await.unwrap();

        let incoming = store.list("incoming/").await.unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].key, "incoming/batch.csv");
        assert_eq!(incoming[0].size, 8);

        assert!(store.head("incoming/batch.csv").await.unwrap().is_some());
        store.delete("incoming/batch.csv").await.unwrap();
        assert!(store.head("incoming/batch.csv").await.unwrap().is_none());
        // second delete is a no-op
        store.delete("incoming/batch.csv").await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_then_download() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path().join("bucket"), "bucket");
        let src = dir.path().join("in.csv");
        std::fs::write(&src, "x\n1\n").unwrap();

        store.upload(&src, "processed/in.csv").await.unwrap();

        let dest = dir.path().join("scratch").join("out.csv");
        store.download("processed/in.csv", &dest).await.unwrap();
        assert_eq!(std::fs::read_to_string(dest).unwrap(), "x\n1\n");
    }

    #[tokio::test]
    async fn test_missing_bucket_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path().join("nope"), "nope");
        assert!(store.list("incoming/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path(), "bucket");
        let result = store
            .download("incoming/missing.csv", &dir.path().join("x.csv"))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_parent_traversal_is_rejected() {
        let store = LocalFsStore::new("/tmp/bucket", "bucket");
        assert!(store.path_for("incoming/../../etc/passwd").is_err());
    }
}
