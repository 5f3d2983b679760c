use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use data_model_jpt::models::PersistedJob;
use data_model_jpt::store::StoreError;
use serde::{Deserialize, Serialize};

/// Number of jobs returned by `GET /api/jobs` without a `limit`.
pub const DEFAULT_JOB_LIMIT: i64 = 100;

/// How many of the most recent jobs `GET /api/jobs/by-source` groups.
pub const GROUPED_JOB_LIMIT: i64 = 500;

// API Payload Types

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobsQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Input payload for `POST /api/scheduler`. Missing fields leave the current setting unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerPayload {
    #[serde(default)]
    pub interval_minutes: Option<u64>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

// API Response Types

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAddedResponse {
    pub id: i32,
    pub message: String,
}

/// The identifying part of a source, as shown above each group of jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: i32,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceJobs {
    pub source: SourceRef,
    pub jobs: Vec<PersistedJob>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_jobs: i64,
    pub total_sources: i64,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub scheduler_running: bool,
    pub interval_minutes: u64,
    pub checks_today: u64,
    pub changes_detected: u64,
    pub run_in_progress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerResponse {
    pub message: String,
    pub interval_minutes: u64,
    pub running: bool,
}

// API Error Types

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "error", content = "details")]
pub enum ApiError {
    /// The request body or query is missing something or holds an unusable value
    #[serde(rename = "invalid_input")]
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A source with this URL is already tracked
    #[serde(rename = "duplicate_source")]
    #[error("Source already exists: {0}")]
    DuplicateSource(String),
    #[serde(rename = "not_found")]
    #[error("Not found")]
    NotFound,
    /// The scheduler controller no longer accepts commands
    #[serde(rename = "scheduler_unavailable")]
    #[error("The scheduler is not running")]
    SchedulerUnavailable,
    #[serde(rename = "unknown")]
    #[error("{0}")]
    Unknown(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateSource(_) => StatusCode::CONFLICT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::SchedulerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, Json(self)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        ApiError::Unknown(error.to_string())
    }
}

impl From<pipeline_jpt::Error> for ApiError {
    fn from(error: pipeline_jpt::Error) -> Self {
        match error {
            pipeline_jpt::Error::SchedulerUnavailable => ApiError::SchedulerUnavailable,
            other => ApiError::Unknown(other.to_string()),
        }
    }
}
