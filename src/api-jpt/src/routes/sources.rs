use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use data_model_jpt::models::{SourcePayload, UNNAMED_SOURCE};

use crate::AppState;
use crate::models::{ApiError, MessageResponse, SourceAddedResponse};

// GET /api/sources - All sources, newest first
pub async fn get_sources(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let sources = state.sources.list_sources().await?;
    Ok((StatusCode::OK, Json(sources)))
}

// POST /api/sources - Track a new source
pub async fn post_source(
    State(state): State<AppState>,
    Json(payload): Json<SourcePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let source = payload.into_new_source(UNNAMED_SOURCE);
    if source.url.is_empty() {
        return Err(ApiError::InvalidInput("URL is required".to_string()));
    }
    if let Err(e) = url::Url::parse(&source.url) {
        return Err(ApiError::InvalidInput(format!("Invalid URL: {}", e)));
    }

    match state.sources.add_source(&source).await? {
        Some(id) => {
            tracing::info!("Added source {} ({})", source.name, source.url);
            Ok((
                StatusCode::CREATED,
                Json(SourceAddedResponse {
                    id,
                    message: "Source added".to_string(),
                }),
            ))
        }
        None => Err(ApiError::DuplicateSource(source.url)),
    }
}

// DELETE /api/sources/{id} - Stop tracking a source; its jobs are kept
pub async fn delete_source(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.sources.delete_source(id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!("Deleted source {}", id);
    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Source deleted".to_string(),
        }),
    ))
}
