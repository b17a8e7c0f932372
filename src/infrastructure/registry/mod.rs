mod mlflow;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::Result;
use crate::domain::model::ClassifierModel;

pub use mlflow::MlflowRegistry;

/// File name of the serialized classifier inside a model artifact directory.
pub const MODEL_ARTIFACT_FILE: &str = "model.json";

/// A registered model version resolved from an alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: String,
    /// Artifact location, e.g. `mlflow-artifacts:/1/<run>/artifacts/model`
    pub source: String,
    #[serde(default)]
    pub run_id: Option<String>,
}

#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// `Ok(None)` when the alias is not assigned.
    async fn resolve_alias(&self, name: &str, alias: &str) -> Result<Option<ModelVersion>>;

    async fn fetch_model(&self, version: &ModelVersion) -> Result<ClassifierModel>;
}
