pub mod models;
pub mod reporting;
pub mod routes;

use std::sync::Arc;

use data_model_jpt::store::{JobStore, SourceStore};
use pipeline_jpt::SchedulerHandle;

/// Shared by every route handler.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobStore>,
    pub sources: Arc<dyn SourceStore>,
    pub scheduler: SchedulerHandle,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, scheduler: SchedulerHandle) -> Self
    where
        S: JobStore + SourceStore + 'static,
    {
        Self {
            jobs: store.clone(),
            sources: store,
            scheduler,
        }
    }
}
