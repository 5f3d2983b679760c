use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Logs every request with its status and latency; the level follows the status class.
pub async fn log_route_access(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;
    match status {
        500..=599 => tracing::error!(method = %method, path = %path, status, duration_ms),
        400..=499 => tracing::warn!(method = %method, path = %path, status, duration_ms),
        // Health probes are noisy.
        _ if path == "/health" => tracing::debug!(method = %method, path = %path, status, duration_ms),
        _ => tracing::info!(method = %method, path = %path, status, duration_ms),
    }

    response
}
