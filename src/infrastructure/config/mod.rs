//! Layered settings: defaults, optional TOML file, then environment.
//!
//! `PREDMAINT_`-prefixed variables use `__` for nesting
//! (`PREDMAINT_WATCHER__RETRIES=3`). The deployment variables
//! `MINIO_ENDPOINT`, `MINIO_BUCKET`, `AWS_ACCESS_KEY_ID`,
//! `AWS_SECRET_ACCESS_KEY`, `MLFLOW_TRACKING_URI` and `MODEL_PATH` are
//! honoured as well and take precedence.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::csv::ExpectedColumns;
use crate::domain::error::{AppError, Result};
use crate::domain::storage::StorageLayout;

pub const DEFAULT_CONFIG_PATH: &str = "config/predmaint.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Parent directory of the bucket when `backend = "local"`
    pub local_root: PathBuf,
    pub incoming_prefix: String,
    pub processed_prefix: String,
    pub file_suffix: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let layout = StorageLayout::default();
        Self {
            backend: StorageBackend::S3,
            endpoint: "http://s3:9000".to_string(),
            bucket: "csv-data".to_string(),
            region: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            local_root: PathBuf::from("data"),
            incoming_prefix: layout.incoming_prefix,
            processed_prefix: layout.processed_prefix,
            file_suffix: layout.suffix,
        }
    }
}

impl StorageSettings {
    pub fn layout(&self) -> StorageLayout {
        StorageLayout {
            incoming_prefix: self.incoming_prefix.clone(),
            processed_prefix: self.processed_prefix.clone(),
            suffix: self.file_suffix.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherSettings {
    pub schedule_interval_secs: u64,
    pub poke_interval_secs: u64,
    pub sensor_timeout_secs: u64,
    pub retries: u32,
    pub retry_delay_secs: u64,
    pub scratch_dir: PathBuf,
    pub expected_columns: ExpectedColumns,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            schedule_interval_secs: 120,
            poke_interval_secs: 30,
            sensor_timeout_secs: 90,
            retries: 1,
            retry_delay_secs: 120,
            scratch_dir: std::env::temp_dir(),
            expected_columns: ExpectedColumns::machine_failure(),
        }
    }
}

impl WatcherSettings {
    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_secs)
    }

    pub fn poke_interval(&self) -> Duration {
        Duration::from_secs(self.poke_interval_secs)
    }

    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_secs(self.sensor_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Registry base URL; `None` loads the local file only
    pub registry_uri: Option<String>,
    pub registered_name: String,
    pub alias: String,
    pub local_path: PathBuf,
    pub registry_timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            registry_uri: None,
            registered_name: "machine-failure-svc".to_string(),
            alias: "champion".to_string(),
            local_path: PathBuf::from("models/model.json"),
            registry_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Reject out-of-range feature values with 422
    pub strict_validation: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            strict_validation: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub storage: StorageSettings,
    pub watcher: WatcherSettings,
    pub model: ModelSettings,
    pub server: ServerSettings,
}

impl Settings {
    /// Load from `path` (if present) layered under the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings: Settings = Self::figment(path).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PREDMAINT_").split("__"))
            .merge(Env::raw().filter_map(|key| {
                let mapped = match key.as_str().to_ascii_uppercase().as_str() {
                    "MINIO_ENDPOINT" => "storage.endpoint",
                    "MINIO_BUCKET" => "storage.bucket",
                    "AWS_ACCESS_KEY_ID" => "storage.access_key_id",
                    "AWS_SECRET_ACCESS_KEY" => "storage.secret_access_key",
                    "MLFLOW_TRACKING_URI" => "model.registry_uri",
                    "MODEL_PATH" => "model.local_path",
                    _ => return None,
                };
                Some(mapped.into())
            }))
    }

    pub fn validate(&self) -> Result<()> {
        let storage = &self.storage;
        if storage.bucket.trim().is_empty() {
            return Err(AppError::ConfigError("storage.bucket is empty".to_string()));
        }
        for (name, prefix) in [
            ("storage.incoming_prefix", &storage.incoming_prefix),
            ("storage.processed_prefix", &storage.processed_prefix),
        ] {
            if prefix.is_empty() || !prefix.ends_with('/') {
                return Err(AppError::ConfigError(format!(
                    "{} must be non-empty and end with '/' (got '{}')",
                    name, prefix
                )));
            }
        }
        if storage.incoming_prefix.starts_with(&storage.processed_prefix)
            || storage.processed_prefix.starts_with(&storage.incoming_prefix)
        {
            return Err(AppError::ConfigError(
                "storage.incoming_prefix and storage.processed_prefix must not overlap"
                    .to_string(),
            ));
        }

        let watcher = &self.watcher;
        if watcher.schedule_interval_secs == 0 || watcher.poke_interval_secs == 0 {
            return Err(AppError::ConfigError(
                "watcher intervals must be > 0".to_string(),
            ));
        }
        if watcher.sensor_timeout_secs < watcher.poke_interval_secs {
            return Err(AppError::ConfigError(format!(
                "watcher.sensor_timeout_secs ({}) must be >= poke_interval_secs ({})",
                watcher.sensor_timeout_secs, watcher.poke_interval_secs
            )));
        }

        if self.model.alias.trim().is_empty() || self.model.registered_name.trim().is_empty() {
            return Err(AppError::ConfigError(
                "model.registered_name and model.alias must be set".to_string(),
            ));
        }

        Ok(())
    }
}
