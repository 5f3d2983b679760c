use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;
use crate::models::{ApiError, SchedulerPayload, SchedulerResponse, StatsResponse};

// GET /api/stats - Dashboard counters
pub async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let total_jobs = state.jobs.count_jobs().await?;
    let total_sources = state.sources.count_sources().await?;
    let snapshot = state.scheduler.snapshot().await?;

    Ok((
        StatusCode::OK,
        Json(StatsResponse {
            total_jobs,
            total_sources,
            last_run: snapshot.last_run,
            next_run: snapshot.next_run,
            scheduler_running: snapshot.running,
            interval_minutes: snapshot.interval_minutes,
            checks_today: snapshot.checks_today,
            changes_detected: snapshot.changes_detected,
            run_in_progress: snapshot.run_in_progress,
        }),
    ))
}

// POST /api/run - Run the pipeline now and wait for its report
pub async fn post_run(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Manual pipeline run requested");
    let report = state.scheduler.trigger_now().await?;
    Ok((StatusCode::OK, Json(report)))
}

// POST /api/scheduler - Change the interval and/or start or stop periodic runs
pub async fn post_scheduler(
    State(state): State<AppState>,
    Json(payload): Json<SchedulerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.interval_minutes == Some(0) {
        return Err(ApiError::InvalidInput("interval_minutes must be at least 1".to_string()));
    }

    if let Some(minutes) = payload.interval_minutes {
        state.scheduler.update_interval(minutes).await?;
    }
    match payload.enabled {
        Some(true) => state.scheduler.start().await?,
        Some(false) => state.scheduler.stop().await?,
        None => {}
    }

    let snapshot = state.scheduler.snapshot().await?;
    tracing::info!(
        "Scheduler updated: every {} minutes, running: {}",
        snapshot.interval_minutes,
        snapshot.running
    );
    Ok((
        StatusCode::OK,
        Json(SchedulerResponse {
            message: "Scheduler updated".to_string(),
            interval_minutes: snapshot.interval_minutes,
            running: snapshot.running,
        }),
    ))
}
