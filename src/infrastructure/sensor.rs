//! Key sensor: waits for an object matching a wildcard to appear.

use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::domain::error::{AppError, Result};
use crate::domain::storage::StorageLayout;
use crate::infrastructure::object_store::ObjectStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorHit {
    /// A concrete matching key
    Key(String),
    /// Something matched but no key was reported
    Unspecified,
}

#[async_trait]
pub trait KeySensor: Send + Sync {
    /// Check once for a matching object.
    async fn poke(&self) -> Result<Option<SensorHit>>;
}

/// Translate a glob (`*` any run of characters, `?` one character) into an
/// anchored regex. `*` also spans `/`.
pub fn wildcard_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr)
        .map_err(|e| AppError::ConfigError(format!("Invalid key pattern '{}': {}", pattern, e)))
}

/// Lists the incoming prefix and matches keys against `incoming/*<suffix>`.
pub struct WildcardKeySensor {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    pattern: Regex,
}

impl WildcardKeySensor {
    pub fn new(store: Arc<dyn ObjectStore>, layout: &StorageLayout) -> Result<Self> {
        Ok(Self {
            store,
            prefix: layout.incoming_prefix.clone(),
            pattern: wildcard_to_regex(&layout.incoming_pattern())?,
        })
    }
}

#[async_trait]
impl KeySensor for WildcardKeySensor {
    async fn poke(&self) -> Result<Option<SensorHit>> {
        let objects = self.store.list(&self.prefix).await?;
        Ok(objects
            .into_iter()
            .find(|o| self.pattern.is_match(&o.key))
            .map(|o| SensorHit::Key(o.key)))
    }
}

/// Poke until a hit or until `timeout` elapses. A timeout yields `Ok(None)`.
pub async fn wait_for_key(
    sensor: &dyn KeySensor,
    poke_interval: Duration,
    timeout: Duration,
) -> Result<Option<SensorHit>> {
    let deadline = Instant::now() + timeout;
    let mut pokes = 0u32;

    loop {
        pokes += 1;
        if let Some(hit) = sensor.poke().await? {
            debug!(pokes, hit = ?hit, "Sensor matched");
            return Ok(Some(hit));
        }

        let now = Instant::now();
        if now >= deadline {
            info!(pokes, timeout_secs = timeout.as_secs(), "Sensor timed out without a match");
            return Ok(None);
        }
        sleep(poke_interval.min(deadline - now)).await;
    }
}
