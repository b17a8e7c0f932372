// ============================================================
// FILE PROMOTION USE CASE
// ============================================================
// incoming/<file>.csv -> clean -> processed/<file>.csv

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::use_cases::csv_cleaner::CsvCleaner;
use crate::domain::error::{AppError, Result};
use crate::domain::promotion::{PromotionState, RunOutcome};
use crate::domain::storage::StorageLayout;
use crate::infrastructure::config::Settings;
use crate::infrastructure::object_store::ObjectStore;
use crate::infrastructure::scheduler::Job;
use crate::infrastructure::sensor::{wait_for_key, KeySensor, SensorHit, WildcardKeySensor};
use crate::infrastructure::storage::{ensure_scratch_dir, remove_scratch_file, scratch_path_for};

pub struct FilePromotionWorkflow {
    store: Arc<dyn ObjectStore>,
    sensor: Arc<dyn KeySensor>,
    layout: StorageLayout,
    cleaner: CsvCleaner,
    scratch_dir: PathBuf,
    poke_interval: Duration,
    sensor_timeout: Duration,
}

impl FilePromotionWorkflow {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        sensor: Arc<dyn KeySensor>,
        layout: StorageLayout,
        cleaner: CsvCleaner,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            sensor,
            layout,
            cleaner,
            scratch_dir: scratch_dir.into(),
            poke_interval: Duration::from_secs(30),
            sensor_timeout: Duration::from_secs(90),
        }
    }

    pub fn with_sensor_timing(mut self, poke_interval: Duration, timeout: Duration) -> Self {
        self.poke_interval = poke_interval;
        self.sensor_timeout = timeout;
        self
    }

    /// Wire the workflow from settings with a wildcard sensor over `store`.
    pub fn from_settings(store: Arc<dyn ObjectStore>, settings: &Settings) -> Result<Self> {
        let layout = settings.storage.layout();
        let sensor = Arc::new(WildcardKeySensor::new(store.clone(), &layout)?);
        let watcher = &settings.watcher;

        Ok(Self::new(
            store,
            sensor,
            layout,
            CsvCleaner::new(watcher.expected_columns.clone()),
            watcher.scratch_dir.clone(),
        )
        .with_sensor_timing(watcher.poke_interval(), watcher.sensor_timeout()))
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Execute one run. `NoFile` leaves the bucket untouched.
    pub async fn run(&self) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, bucket = self.store.bucket(), "Promotion run started");

        let Some(source) = self.detect(&run_id).await else {
            info!(run_id = %run_id, "No files to process");
            return Ok(RunOutcome::NoFile);
        };

        let scratch = scratch_path_for(&self.scratch_dir, &source);
        let mut state = PromotionState::Detecting;
        let result = self.promote(&run_id, &source, &scratch, &mut state).await;

        if result.is_err() {
            error!(run_id = %run_id, state = %state, source = %source, "Promotion step failed");
            transition(&run_id, &mut state, PromotionState::Failed);
        } else {
            advance(&run_id, &mut state);
        }

        if let Err(e) = remove_scratch_file(&scratch) {
            warn!(run_id = %run_id, path = %scratch.display(), error = %e, "Failed to remove scratch file");
        }

        match result {
            Ok(outcome) => {
                advance(&run_id, &mut state);
                info!(run_id = %run_id, outcome = %outcome, "Promotion run finished");
                Ok(outcome)
            }
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Promotion run failed");
                Err(e)
            }
        }
    }

    /// Resolve the object to promote. Sensor errors end the run as a no-op.
    async fn detect(&self, run_id: &Uuid) -> Option<String> {
        debug!(run_id = %run_id, state = %PromotionState::Detecting, "Entering state");

        let hit = match wait_for_key(self.sensor.as_ref(), self.poke_interval, self.sensor_timeout)
            .await
        {
            Ok(hit) => hit?,
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Sensor failed, skipping run");
                return None;
            }
        };

        match hit {
            SensorHit::Key(key) if self.layout.is_candidate(&key) => Some(key),
            other => {
                debug!(run_id = %run_id, hit = ?other, "Sensor hit without usable key, listing prefix");
                match self.store.list(&self.layout.incoming_prefix).await {
                    Ok(objects) => objects
                        .into_iter()
                        .map(|o| o.key)
                        .find(|key| self.layout.is_candidate(key)),
                    Err(e) => {
                        warn!(run_id = %run_id, error = %e, "Listing incoming prefix failed");
                        None
                    }
                }
            }
        }
    }

    async fn promote(
        &self,
        run_id: &Uuid,
        source: &str,
        scratch: &Path,
        state: &mut PromotionState,
    ) -> Result<RunOutcome> {
        let destination = self.layout.processed_key_for(source);

        advance(run_id, state);
        ensure_scratch_dir(&self.scratch_dir)?;
        self.store.download(source, scratch).await?;

        advance(run_id, state);
        let report = self.cleaner.clean_file(scratch)?;
        info!(run_id = %run_id, source = %source, report = %report.summary(), "Cleaned file");

        advance(run_id, state);
        self.store.upload(scratch, &destination).await?;

        advance(run_id, state);
        if self.store.head(&destination).await?.is_none() {
            return Err(AppError::StorageError(format!(
                "Uploaded object '{}' is not visible in bucket '{}'",
                destination,
                self.store.bucket()
            )));
        }

        advance(run_id, state);
        self.store.delete(source).await?;

        Ok(RunOutcome::Promoted {
            source: source.to_string(),
            destination,
            report,
        })
    }
}

fn transition(run_id: &Uuid, state: &mut PromotionState, to: PromotionState) {
    debug!(run_id = %run_id, from = %state, to = %to, "State transition");
    *state = to;
}

/// Move to the next happy-path state.
fn advance(run_id: &Uuid, state: &mut PromotionState) {
    if let Some(to) = state.next() {
        transition(run_id, state, to);
    }
}

#[async_trait]
impl Job for FilePromotionWorkflow {
    fn name(&self) -> &str {
        "csv-file-promotion"
    }

    async fn run(&self) -> Result<String> {
        FilePromotionWorkflow::run(self).await.map(|outcome| outcome.to_string())
    }
}
