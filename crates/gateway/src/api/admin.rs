//! Management endpoints.

use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// Liveness report with the overload counters.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "started_at": state.health.started_at().to_rfc3339(),
        "health_checks_passed": state.health.passes(),
        "penalties": state.penalties.count(),
    }))
}
