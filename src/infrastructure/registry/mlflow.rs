use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{ModelRegistry, ModelVersion, MODEL_ARTIFACT_FILE};
use crate::domain::error::{AppError, Result};
use crate::domain::model::ClassifierModel;

const ARTIFACT_PROXY_SCHEME: &str = "mlflow-artifacts:";
const RUNS_SCHEME: &str = "runs:/";

#[derive(Debug, Deserialize)]
struct AliasResponse {
    model_version: ModelVersion,
}

/// MLflow tracking server REST client.
pub struct MlflowRegistry {
    client: reqwest::Client,
    base_url: Url,
}

impl MlflowRegistry {
    pub fn new(tracking_uri: &str, timeout: Duration) -> Result<Self> {
        let normalized = if tracking_uri.ends_with('/') {
            tracking_uri.to_string()
        } else {
            format!("{}/", tracking_uri)
        };
        let base_url = Url::parse(&normalized).map_err(|e| {
            AppError::ConfigError(format!("Invalid registry URI '{}': {}", tracking_uri, e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::RegistryError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::RegistryError(format!("Invalid registry path '{}': {}", path, e)))
    }

    /// Download URL for the serialized model of `version`.
    fn artifact_url(&self, version: &ModelVersion) -> Result<Url> {
        let source = version.source.as_str();

        if let Some(rest) = source.strip_prefix(ARTIFACT_PROXY_SCHEME) {
            let path = rest.trim_start_matches('/').trim_end_matches('/');
            return self.endpoint(&format!(
                "api/2.0/mlflow-artifacts/artifacts/{}/{}",
                path, MODEL_ARTIFACT_FILE
            ));
        }

        if let Some(rest) = source.strip_prefix(RUNS_SCHEME) {
            let (run_id, artifact_path) = rest.split_once('/').unwrap_or((rest, ""));
            if run_id.is_empty() {
                return Err(AppError::RegistryError(format!(
                    "Model source '{}' has no run id",
                    source
                )));
            }
            let artifact_path = artifact_path.trim_matches('/');
            let path = if artifact_path.is_empty() {
                MODEL_ARTIFACT_FILE.to_string()
            } else {
                format!("{}/{}", artifact_path, MODEL_ARTIFACT_FILE)
            };

            let mut url = self.endpoint("get-artifact")?;
            url.query_pairs_mut()
                .append_pair("run_uuid", run_id)
                .append_pair("path", &path);
            return Ok(url);
        }

        Err(AppError::RegistryError(format!(
            "Unsupported model source '{}'",
            source
        )))
    }
}

#[async_trait]
impl ModelRegistry for MlflowRegistry {
    async fn resolve_alias(&self, name: &str, alias: &str) -> Result<Option<ModelVersion>> {
        let mut url = self.endpoint("api/2.0/mlflow/registered-models/alias")?;
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("alias", alias);

        debug!(url = %url, "Resolving model alias");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::RegistryError(format!("Request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::RegistryError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let body: AliasResponse = response
            .json()
            .await
            .map_err(|e| AppError::RegistryError(format!("Failed to parse JSON: {}", e)))?;

        info!(
            model = %body.model_version.name,
            version = %body.model_version.version,
            alias = %alias,
            "Resolved model alias"
        );
        Ok(Some(body.model_version))
    }

    async fn fetch_model(&self, version: &ModelVersion) -> Result<ClassifierModel> {
        let url = self.artifact_url(version)?;
        debug!(url = %url, "Downloading model artifact");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::RegistryError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::RegistryError(format!(
                "Artifact download failed ({}): {}",
                status, text
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::RegistryError(format!("Failed to read artifact: {}", e)))?;

        ClassifierModel::from_json(&bytes)
    }
}
