//! Liveness probe.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

/// Build the health router.
pub fn router() -> Router<AppState> {
    Router::new().route("/healthcheck", get(healthcheck))
}

/// GET /healthcheck — fixed success payload.
///
/// Takes no input and cannot fail; excluded from the published API
/// description, and its access-log lines are suppressed as polling noise.
async fn healthcheck() -> Json<Value> {
    Json(json!({"healthcheck": "HEALTHCHECK STATUS: EVERYTHING OK!"}))
}
