//! Public-identity location lookup.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use cx_hss::types::{HssResult, LocationInfoRequest};

use crate::api::responses;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /impu/{impu}/location
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct LocationParams {
    #[serde(default)]
    pub originating: Option<String>,
    #[serde(default, rename = "auth-type")]
    pub auth_type: Option<String>,
}

/// LIR toward the HSS: which S-CSCF serves this public identity.
pub async fn location(
    State(state): State<AppState>,
    Path(impu): Path<String>,
    Query(params): Query<LocationParams>,
) -> Response {
    let trail = Uuid::new_v4();

    tracing::debug!(%trail, %impu, "looking up serving S-CSCF");
    let lia = state
        .hss
        .location_info(
            LocationInfoRequest {
                impu,
                originating: params.originating.unwrap_or_default(),
                authorization_type: params.auth_type.unwrap_or_default(),
            },
            trail,
        )
        .await;

    match lia.result {
        HssResult::Success => {
            let wildcard = (!lia.wildcard_impu.is_empty()).then_some(lia.wildcard_impu.as_str());
            let body = responses::server_selection(
                lia.json_result,
                &lia.server_name,
                lia.capabilities.as_ref(),
                wildcard,
            );
            Json(body).into_response()
        }
        HssResult::NotFound => {
            tracing::info!(%trail, "user unknown - reject");
            StatusCode::NOT_FOUND.into_response()
        }
        HssResult::Timeout => {
            tracing::error!(%trail, "timeout at HSS on LIR - reject with 504");
            state.penalties.record();
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
        HssResult::ServerUnavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
