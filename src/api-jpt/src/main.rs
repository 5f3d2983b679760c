use std::sync::Arc;

use core_jpt::common::db_env::get_db_pool;
use core_jpt::common::hostname::get_api_base_url;
use core_jpt::{AppConfig, setup_logging};
use data_model_jpt::store::PgStore;
use pipeline_jpt::{Scheduler, build_pipeline, seed_sources};

use api_jpt::{AppState, routes};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    setup_logging("api_jpt=debug,pipeline_jpt=info,core_jpt=info,tower_http=debug");

    let config = AppConfig::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {}", e));

    let store = Arc::new(PgStore::new(get_db_pool().await));
    match seed_sources(store.as_ref(), &config.seed_sources).await {
        Ok(added) => tracing::info!("{} configured sources added", added),
        Err(e) => tracing::error!("Could not seed configured sources: {}", e),
    }

    let pipeline = build_pipeline(&config, store.clone()).unwrap_or_else(|e| panic!("Cannot build pipeline: {}", e));
    let (scheduler, controller) = Scheduler::spawn(
        Arc::new(pipeline),
        config.check_interval_minutes,
        config.scheduler_enabled,
    );
    if config.scheduler_enabled {
        tracing::info!("Scheduler started: checking sources every {} minutes", config.check_interval_minutes);
    }

    let app = routes::router().with_state(AppState::new(store, scheduler));

    let addr = get_api_base_url().expect("Invalid HOST or PORT");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to address {}: {}", addr, e));
    tracing::info!("Dashboard API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Cannot listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
        })
        .await
        .expect("Server error");

    controller.abort();
}
