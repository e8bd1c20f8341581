//! # lamina-api — Axum Gateway for the Lamina Partition API
//!
//! An HTTP facade fronting a document-partitioning backend with a stable,
//! versioned surface. The gateway owns the cross-cutting behavior; the
//! partitioning engine sits behind the `lamina-core` contract and is
//! supplied by the embedding application.
//!
//! ## API Surface
//!
//! | Method | Path                     | Handler                | Published |
//! |--------|--------------------------|------------------------|-----------|
//! | POST   | `/general/v0/general`    | [`routes::partition`]  | yes       |
//! | GET    | `/general/openapi.json`  | [`openapi`]            | —         |
//! | GET    | `/general/docs`          | [`openapi`]            | no        |
//! | GET    | `/healthcheck`           | [`routes::health`]     | no        |
//! | GET    | `/metrics`               | Prometheus scrape      | no        |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer (when configured) → TraceLayer → AccessLog → Metrics → Handler
//! ```
//!
//! ## Failure Shape
//!
//! Every failure from any handler is normalized to `{"detail": "<message>"}`
//! by [`error::ApiError`]; deliberate rejections keep their status, anything
//! else becomes a 500.

pub mod error;
pub mod logging;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use state::{AppConfig, AppState};

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;

/// Body size limit for document uploads: 100 MiB.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Assemble the full application router.
///
/// The CORS gate is installed only when an origin allow-list is configured;
/// without one, no cross-origin headers are added at all.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let cors = cors_layer(&state.config);

    let mut router = Router::new()
        .merge(routes::partition::router())
        .merge(routes::health::router())
        .merge(openapi::router())
        .route("/metrics", axum::routing::get(prometheus_metrics))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics))
        .layer(from_fn(middleware::access_log::access_log_middleware))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    router.with_state(state)
}

/// Build the CORS layer from the configured allow-list.
///
/// Allows exactly the listed origins, the `OPTIONS` and `POST` methods, and
/// the `Content-Type` request header. No credentials mode.
fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    let origins = config.allowed_origins.as_ref()?;

    let mut parsed: Vec<HeaderValue> = Vec::with_capacity(origins.len());
    for origin in origins {
        match origin.parse::<HeaderValue>() {
            Ok(value) => parsed.push(value),
            Err(_) => tracing::warn!(%origin, "ignoring unparseable origin in allow-list"),
        }
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods([Method::OPTIONS, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

/// GET /metrics — Prometheus metrics scrape endpoint.
async fn prometheus_metrics(Extension(metrics): Extension<ApiMetrics>) -> axum::response::Response {
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Fallback for unknown paths, normalized like every other failure.
async fn not_found() -> ApiError {
    ApiError::structured(StatusCode::NOT_FOUND, "Not Found")
}
