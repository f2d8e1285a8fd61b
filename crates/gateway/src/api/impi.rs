//! Private-identity endpoints: authentication-vector lookup and
//! registration status.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use base64::Engine;
use serde::Deserialize;
use uuid::Uuid;

use cx_domain::types::AuthVector;
use cx_hss::types::{HssResult, MultimediaAuthRequest, UserAuthRequest};

use crate::api::responses;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /impi/{impi}/digest
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct DigestParams {
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default, rename = "server-name")]
    pub server_name: Option<String>,
}

/// Digest-only AV lookup.
pub async fn digest(
    State(state): State<AppState>,
    Path(impi): Path<String>,
    Query(params): Query<DigestParams>,
) -> Response {
    let scheme = state.config.schemes.digest.clone();
    complete_av(
        state,
        AvEndpoint::Digest,
        impi,
        params.public_id.unwrap_or_default(),
        scheme,
        String::new(),
        params.server_name.unwrap_or_default(),
    )
    .await
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /impi/{impi}/{av|aka|aka2}
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct AvParams {
    #[serde(default)]
    pub impu: Option<String>,
    #[serde(default, rename = "resync-auth")]
    pub resync_auth: Option<String>,
    #[serde(default, rename = "server-name")]
    pub server_name: Option<String>,
}

/// Full AV lookup; the URL tail names the negotiated scheme.
pub async fn av(
    State(state): State<AppState>,
    Path((impi, scheme_tail)): Path<(String, String)>,
    Query(params): Query<AvParams>,
) -> Response {
    let (endpoint, scheme) = match scheme_tail.as_str() {
        "av" => (AvEndpoint::Unknown, state.config.schemes.unknown.clone()),
        "digest" => (AvEndpoint::Unknown, state.config.schemes.digest.clone()),
        "aka" => (AvEndpoint::Aka, state.config.schemes.akav1.clone()),
        "aka2" => (AvEndpoint::Aka, state.config.schemes.akav2.clone()),
        other => {
            tracing::info!(scheme = %other, "unparseable auth scheme in URL");
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    // Resync material arrives base64-coded; undecodable input is
    // treated as absent.
    let authorization = params
        .resync_auth
        .as_deref()
        .and_then(|auth| base64::engine::general_purpose::STANDARD.decode(auth).ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();

    complete_av(
        state,
        endpoint,
        impi,
        params.impu.unwrap_or_default(),
        scheme,
        authorization,
        params.server_name.unwrap_or_default(),
    )
    .await
}

/// Which URL shape the AV request came in on. Constrains the reply:
/// the digest URL refuses AKA vectors, the AKA URLs refuse digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AvEndpoint {
    Digest,
    Aka,
    Unknown,
}

async fn complete_av(
    state: AppState,
    endpoint: AvEndpoint,
    impi: String,
    impu: String,
    scheme: String,
    authorization: String,
    provided_server_name: String,
) -> Response {
    let trail = Uuid::new_v4();

    if impu.is_empty() {
        tracing::info!(%trail, %impi, "public ID unknown - reject");
        return StatusCode::NOT_FOUND.into_response();
    }

    let server_name = if provided_server_name.is_empty() {
        state.config.hss.server_name.clone()
    } else {
        provided_server_name
    };

    tracing::debug!(%trail, %impi, %impu, %scheme, "requesting authentication vector");
    let maa = state
        .hss
        .multimedia_auth(
            MultimediaAuthRequest {
                impi,
                impu,
                server_name,
                scheme,
                authorization,
            },
            trail,
        )
        .await;

    match maa.result {
        HssResult::Success => {
            let schemes = &state.config.schemes;
            let answered_scheme = maa.scheme;
            match maa.av {
                Some(AuthVector::Digest(av)) if answered_scheme == schemes.digest => {
                    match endpoint {
                        AvEndpoint::Digest => Json(responses::digest_ha1(&av)).into_response(),
                        AvEndpoint::Unknown => Json(responses::digest_av(&av)).into_response(),
                        AvEndpoint::Aka => {
                            tracing::info!(%trail, "AKA requested but digest received - reject");
                            StatusCode::NOT_FOUND.into_response()
                        }
                    }
                }
                Some(AuthVector::Aka(av))
                    if answered_scheme == schemes.akav1 || answered_scheme == schemes.akav2 =>
                {
                    match endpoint {
                        AvEndpoint::Digest => {
                            tracing::info!(%trail, "digest requested but AKA received - reject");
                            StatusCode::NOT_FOUND.into_response()
                        }
                        _ => Json(responses::aka_av(&av)).into_response(),
                    }
                }
                _ => {
                    tracing::info!(%trail, scheme = %answered_scheme, "unsupported scheme on answer");
                    StatusCode::NOT_FOUND.into_response()
                }
            }
        }
        HssResult::NotFound => StatusCode::NOT_FOUND.into_response(),
        HssResult::ServerUnavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        HssResult::Timeout => {
            tracing::error!(%trail, "timeout at HSS on MAR - reject with 504");
            state.penalties.record();
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /impi/{impi}/registration-status
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct RegistrationStatusParams {
    #[serde(default)]
    pub impu: Option<String>,
    #[serde(default, rename = "visited-network")]
    pub visited_network: Option<String>,
    #[serde(default, rename = "auth-type")]
    pub auth_type: Option<String>,
    #[serde(default)]
    pub sos: Option<String>,
}

/// UAR toward the HSS. A 200 OK from here passes the process's
/// health-check criterion.
pub async fn registration_status(
    State(state): State<AppState>,
    Path(impi): Path<String>,
    Query(params): Query<RegistrationStatusParams>,
) -> Response {
    let trail = Uuid::new_v4();

    let visited_network = params
        .visited_network
        .filter(|network| !network.is_empty())
        .unwrap_or_else(|| state.config.hss.default_realm.clone());
    let emergency = params.sos.as_deref() == Some("true");
    let impu = params.impu.unwrap_or_default();

    tracing::debug!(%trail, %impi, %impu, %visited_network, "checking registration status");
    let uaa = state
        .hss
        .user_auth(
            UserAuthRequest {
                impi,
                impu,
                visited_network,
                authorization_type: params.auth_type.unwrap_or_default(),
                emergency,
            },
            trail,
        )
        .await;

    match uaa.result {
        HssResult::Success => {
            let body = responses::server_selection(
                uaa.json_result,
                &uaa.server_name,
                uaa.capabilities.as_ref(),
                None,
            );
            state.health.health_check_passed();
            Json(body).into_response()
        }
        HssResult::NotFound => {
            tracing::info!(%trail, "user unknown or public/private ID conflict - reject");
            StatusCode::NOT_FOUND.into_response()
        }
        HssResult::Forbidden => {
            tracing::info!(%trail, "authorization rejected - reject");
            StatusCode::FORBIDDEN.into_response()
        }
        HssResult::Timeout => {
            tracing::error!(%trail, "timeout at HSS on UAR - reject with 504");
            state.penalties.record();
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
        HssResult::ServerUnavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
