use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;
use crate::models::{ApiError, DEFAULT_JOB_LIMIT, GROUPED_JOB_LIMIT, JobsQuery};
use crate::reporting::group_by_source;

// GET /api/jobs?limit= - Most recently seen jobs first
pub async fn get_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_JOB_LIMIT);
    if limit < 0 {
        return Err(ApiError::InvalidInput("limit must not be negative".to_string()));
    }
    let jobs = state.jobs.list_jobs(limit).await?;
    Ok((StatusCode::OK, Json(jobs)))
}

// GET /api/jobs/by-source - Recent jobs grouped under the source they came from
pub async fn get_jobs_by_source(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let sources = state.sources.list_sources().await?;
    let jobs = state.jobs.list_jobs(GROUPED_JOB_LIMIT).await?;
    Ok((StatusCode::OK, Json(group_by_source(&sources, &jobs))))
}

// GET /api/companies - Stored job count per company
pub async fn get_companies(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let companies = state.jobs.company_counts().await?;
    Ok((StatusCode::OK, Json(companies)))
}
