//! Access logging middleware.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::logging::ACCESS_TARGET;

/// Emit one access event per completed request.
///
/// The request line travels in the event's fields so sink-side filters can
/// match path markers.
pub async fn access_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(
        target: ACCESS_TARGET,
        %method,
        %uri,
        status = response.status().as_u16(),
        latency_ms,
        "handled request"
    );
    response
}
