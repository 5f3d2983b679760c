use std::sync::Arc;

use core_jpt::common::db_env::get_db_pool;
use core_jpt::{AppConfig, setup_logging};
use data_model_jpt::store::PgStore;
use pipeline_jpt::{Scheduler, build_pipeline, seed_sources};

/// Runs the scheduler without the dashboard.
#[tokio::main]
async fn main() {
    // Load environment variables from .env file., if it exists
    dotenvy::dotenv().ok();

    setup_logging("pipeline_jpt=info,core_jpt=info,data_model_jpt=info");

    let config = AppConfig::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {}", e));

    let store = Arc::new(PgStore::new(get_db_pool().await));
    match seed_sources(store.as_ref(), &config.seed_sources).await {
        Ok(added) => tracing::info!("{} configured sources added", added),
        Err(e) => tracing::error!("Could not seed configured sources: {}", e),
    }

    let pipeline = build_pipeline(&config, store).unwrap_or_else(|e| panic!("Cannot build pipeline: {}", e));
    let (handle, controller) = Scheduler::spawn(Arc::new(pipeline), config.check_interval_minutes, true);
    tracing::info!(
        "Scheduler daemon started: checking sources every {} minutes",
        config.check_interval_minutes
    );

    // Run once immediately; later runs follow the interval.
    match handle.trigger_now().await {
        Ok(report) => tracing::info!("Initial run: {}", report.message),
        Err(e) => tracing::error!("Initial run could not start: {}", e),
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
    drop(handle);
    let _ = controller.await;
}
