use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use core_jpt::common::health::health_router;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod jobs;
pub mod logging_middleware;
pub mod scheduler;
pub mod sources;

//
// Router
//

pub fn router() -> Router<AppState> {
    let api_routes = Router::new()
        .route("/api/sources", get(sources::get_sources).post(sources::post_source))
        .route("/api/sources/{id}", delete(sources::delete_source))
        .route("/api/jobs", get(jobs::get_jobs))
        .route("/api/jobs/by-source", get(jobs::get_jobs_by_source))
        .route("/api/companies", get(jobs::get_companies))
        .route("/api/stats", get(scheduler::get_stats))
        .route("/api/run", post(scheduler::post_run))
        .route("/api/scheduler", post(scheduler::post_scheduler));

    Router::new()
        .merge(health_router())
        .merge(api_routes)
        // Custom route access logging
        .layer(middleware::from_fn(logging_middleware::log_route_access))
        // Tracing middleware
        .layer(TraceLayer::new_for_http())
}
