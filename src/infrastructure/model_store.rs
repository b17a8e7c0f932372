use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::error::{AppError, Result};
use crate::domain::model::ClassifierModel;

/// Reads a serialized classifier from the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalModelStore {
    path: PathBuf,
}

impl LocalModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<ClassifierModel> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            AppError::ModelError(format!(
                "Failed to read model file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let model = ClassifierModel::from_json(&bytes)?;
        info!(path = %self.path.display(), model = %model, "Loaded model from file");
        Ok(model)
    }
}
