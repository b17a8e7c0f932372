use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use actix_web::web;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::application::use_cases::csv_cleaner::CsvCleaner;
use crate::application::use_cases::file_promotion::FilePromotionWorkflow;
use crate::application::use_cases::model_loader::ModelLoader;
use crate::domain::error::Result;
use crate::domain::promotion::RunOutcome;
use crate::infrastructure::config::Settings;
use crate::infrastructure::object_store;
use crate::infrastructure::scheduler::Scheduler;
use crate::interfaces::http::{start_server, ServiceContext};

/// `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Load the model, then bind and serve the inference API.
pub async fn serve(settings: &Settings) -> Result<()> {
    let loaded = ModelLoader::from_settings(&settings.model)?.load().await?;
    info!(source = %loaded.source, model = %loaded.model, "Model ready");

    let ctx = web::Data::new(ServiceContext::new(
        loaded,
        settings.server.strict_validation,
    )?);
    let server = start_server(ctx, &settings.server.host, settings.server.port)?;
    server.await?;
    Ok(())
}

fn workflow(settings: &Settings) -> Result<FilePromotionWorkflow> {
    let store = object_store::from_settings(&settings.storage)?;
    FilePromotionWorkflow::from_settings(store, settings)
}

/// Run the promotion workflow on its schedule until `shutdown` resolves.
pub async fn watch<F>(settings: &Settings, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let job = Arc::new(workflow(settings)?);
    let watcher = &settings.watcher;
    let scheduler = Scheduler::new(
        watcher.schedule_interval(),
        watcher.retries,
        watcher.retry_delay(),
    );

    info!(
        bucket = %settings.storage.bucket,
        pattern = %job.layout().incoming_pattern(),
        "Watching for incoming files"
    );
    scheduler.run_until(job, shutdown).await;
    Ok(())
}

/// A single promotion run without retries.
pub async fn run_once(settings: &Settings) -> Result<RunOutcome> {
    workflow(settings)?.run().await
}

/// Clean a local CSV file in place with the configured allow-list.
pub fn clean_local(settings: &Settings, path: &Path) -> Result<()> {
    let cleaner = CsvCleaner::new(settings.watcher.expected_columns.clone());
    let report = cleaner.clean_file(path)?;
    info!(path = %path.display(), report = %report.summary(), "Cleaned local file");
    Ok(())
}
