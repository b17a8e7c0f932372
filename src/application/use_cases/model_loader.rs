// ============================================================
// MODEL LOADER USE CASE
// ============================================================
// Registry alias first, local file second

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::model::ClassifierModel;
use crate::infrastructure::config::ModelSettings;
use crate::infrastructure::model_store::LocalModelStore;
use crate::infrastructure::registry::{MlflowRegistry, ModelRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelSource {
    Registry { name: String, version: String },
    Local { path: PathBuf },
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Registry { name, version } => write!(f, "registry {} v{}", name, version),
            ModelSource::Local { path } => write!(f, "file {}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub model: Arc<ClassifierModel>,
    pub source: ModelSource,
}

pub struct ModelLoader {
    registry: Option<Arc<dyn ModelRegistry>>,
    registered_name: String,
    alias: String,
    local: LocalModelStore,
}

impl ModelLoader {
    pub fn new(
        registry: Option<Arc<dyn ModelRegistry>>,
        registered_name: &str,
        alias: &str,
        local: LocalModelStore,
    ) -> Self {
        Self {
            registry,
            registered_name: registered_name.to_string(),
            alias: alias.to_string(),
            local,
        }
    }

    pub fn from_settings(settings: &ModelSettings) -> Result<Self> {
        let registry: Option<Arc<dyn ModelRegistry>> = match settings.registry_uri.as_deref() {
            Some(uri) if !uri.trim().is_empty() => Some(Arc::new(MlflowRegistry::new(
                uri,
                std::time::Duration::from_secs(settings.registry_timeout_secs),
            )?)),
            _ => None,
        };

        Ok(Self::new(
            registry,
            &settings.registered_name,
            &settings.alias,
            LocalModelStore::new(&settings.local_path),
        ))
    }

    /// Load once: registry by alias, falling back to the local file.
    pub async fn load(&self) -> Result<LoadedModel> {
        let registry_failure = match &self.registry {
            Some(registry) => match self.load_from_registry(registry.as_ref()).await {
                Ok(loaded) => return Ok(loaded),
                Err(e) => {
                    warn!(
                        model = %self.registered_name,
                        alias = %self.alias,
                        error = %e,
                        "Registry load failed, falling back to local file"
                    );
                    Some(e.to_string())
                }
            },
            None => {
                info!("No registry configured, loading local model");
                None
            }
        };

        match self.local.load().await {
            Ok(model) => Ok(LoadedModel {
                model: Arc::new(model),
                source: ModelSource::Local {
                    path: self.local.path().to_path_buf(),
                },
            }),
            Err(local_err) => Err(AppError::ModelError(match registry_failure {
                Some(registry_err) => format!(
                    "No model available. Registry: {}. Local: {}",
                    registry_err, local_err
                ),
                None => format!("No model available. Local: {}", local_err),
            })),
        }
    }

    async fn load_from_registry(&self, registry: &dyn ModelRegistry) -> Result<LoadedModel> {
        let version = registry
            .resolve_alias(&self.registered_name, &self.alias)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Alias '{}' is not assigned for model '{}'",
                    self.alias, self.registered_name
                ))
            })?;

        let model = registry.fetch_model(&version).await?;
        info!(
            model = %model,
            version = %version.version,
            "Loaded model from registry"
        );

        Ok(LoadedModel {
            model: Arc::new(model),
            source: ModelSource::Registry {
                name: version.name,
                version: version.version,
            },
        })
    }
}
