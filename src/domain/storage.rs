use serde::{Deserialize, Serialize};

/// Metadata returned by listing or heading an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
}

/// Prefix layout of the ingestion bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLayout {
    pub incoming_prefix: String,
    pub processed_prefix: String,
    pub suffix: String,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            incoming_prefix: "incoming/".to_string(),
            processed_prefix: "processed/".to_string(),
            suffix: ".csv".to_string(),
        }
    }
}

impl StorageLayout {
    /// Key under incoming/ that ends with the suffix and is not the prefix marker.
    pub fn is_candidate(&self, key: &str) -> bool {
        key.starts_with(&self.incoming_prefix)
            && key != self.incoming_prefix
            && key.ends_with(&self.suffix)
    }

    /// Glob used by the key sensor, e.g. `incoming/*.csv`.
    pub fn incoming_pattern(&self) -> String {
        format!("{}*{}", self.incoming_prefix, self.suffix)
    }

    pub fn processed_key_for(&self, key: &str) -> String {
        format!("{}{}", self.processed_prefix, file_name(key))
    }
}

/// Last path segment of an object key.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
