//! Registration-data endpoint: `GET`/`PUT /impu/{impu}/reg-data`.
//!
//! The engine of the gateway. A request reads the implicit
//! registration set from the cache, decides from the request type and
//! the cached state whether the HSS must be told (and with which
//! Server-Assignment-Type), applies the answer to the cache, and
//! replies with the `<ClearwaterRegData>` document.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use cx_cache::CacheError;
use cx_domain::trace::TraceEvent;
use cx_domain::types::RegistrationState;
use cx_hss::types::{HssResult, ServerAssignmentRequest, ServerAssignmentType};
use cx_subscription::{xml, ImplicitRegistrationSet};

use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The mutation kinds a PUT body may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestType {
    Reg,
    Call,
    DeregUser,
    DeregAdmin,
    DeregTimeout,
    DeregAuthFail,
    DeregAuthTimeout,
}

impl RequestType {
    fn from_reqtype(reqtype: &str) -> Option<Self> {
        match reqtype {
            "reg" => Some(Self::Reg),
            "call" => Some(Self::Call),
            "dereg-user" => Some(Self::DeregUser),
            "dereg-admin" => Some(Self::DeregAdmin),
            "dereg-timeout" => Some(Self::DeregTimeout),
            "dereg-auth-failed" => Some(Self::DeregAuthFail),
            "dereg-auth-timeout" => Some(Self::DeregAuthTimeout),
            _ => None,
        }
    }

    fn is_deregistration(&self) -> bool {
        matches!(self, Self::DeregUser | Self::DeregAdmin | Self::DeregTimeout)
    }

    fn is_auth_failure(&self) -> bool {
        matches!(self, Self::DeregAuthFail | Self::DeregAuthTimeout)
    }

    /// The Server-Assignment-Type for request types that map directly.
    /// REG and CALL pick theirs from the cached state instead.
    fn sar_type(&self) -> ServerAssignmentType {
        match self {
            Self::DeregUser => ServerAssignmentType::UserDeregistration,
            Self::DeregAdmin => ServerAssignmentType::AdministrativeDeregistration,
            Self::DeregTimeout => ServerAssignmentType::TimeoutDeregistration,
            Self::DeregAuthFail => ServerAssignmentType::AuthenticationFailure,
            Self::DeregAuthTimeout => ServerAssignmentType::AuthenticationTimeout,
            Self::Reg | Self::Call => ServerAssignmentType::NoAssignment,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegDataParams {
    #[serde(default)]
    pub private_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PutBody {
    reqtype: String,
    #[serde(default)]
    server_name: Option<String>,
    #[serde(default)]
    wildcard_identity: Option<String>,
}

/// A parsed PUT: the mutation kind plus the optional overrides.
struct PutAction {
    rtype: RequestType,
    server_name: Option<String>,
    wildcard: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handlers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Read the cached registration data. Never mutates state.
pub async fn get_reg_data(
    State(state): State<AppState>,
    Path(impu): Path<String>,
    Query(params): Query<RegDataParams>,
) -> Response {
    process(
        state,
        impu,
        params.private_id.unwrap_or_default(),
        None,
        false,
    )
    .await
}

/// Mutate the registration data according to the body's `reqtype`.
pub async fn put_reg_data(
    State(state): State<AppState>,
    Path(impu): Path<String>,
    Query(params): Query<RegDataParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Ok(put) = serde_json::from_slice::<PutBody>(&body) else {
        tracing::error!("reg-data PUT without valid JSON reqtype");
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Some(rtype) = RequestType::from_reqtype(&put.reqtype) else {
        tracing::error!(reqtype = %put.reqtype, "reg-data PUT with invalid reqtype");
        return StatusCode::BAD_REQUEST.into_response();
    };

    let no_cache = headers
        .get(CACHE_CONTROL)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("no-cache"));

    process(
        state,
        impu,
        params.private_id.unwrap_or_default(),
        Some(PutAction {
            rtype,
            server_name: put.server_name,
            wildcard: put.wildcard_identity,
        }),
        no_cache,
    )
    .await
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// The state machine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn process(
    state: AppState,
    impu: String,
    private_id: String,
    action: Option<PutAction>,
    no_cache: bool,
) -> Response {
    let trail = Uuid::new_v4();
    let cfg = &state.config.hss;

    let sprout_wildcard = action
        .as_ref()
        .and_then(|a| a.wildcard.clone())
        .unwrap_or_default();
    // Wildcard learned from the HSS. Kept separate from the router's so
    // an updated one can be detected (and a repeat rejected).
    let mut hss_wildcard = String::new();

    loop {
        let wildcard_in_use = if hss_wildcard.is_empty() {
            sprout_wildcard.clone()
        } else {
            hss_wildcard.clone()
        };
        let lookup_impu = if wildcard_in_use.is_empty() {
            impu.clone()
        } else {
            wildcard_in_use.clone()
        };

        let mut irs = match state.cache.get_irs_for_impu(&lookup_impu, trail).await {
            Ok(irs) => irs,
            Err(CacheError::NotFound) if action.is_some() => {
                // Expected on a PUT for a subscriber we have never
                // seen; behave as if the cache returned an empty set.
                tracing::debug!(%trail, impu = %lookup_impu, "no reg data found - starting empty");
                state.cache.create_irs()
            }
            Err(CacheError::NotFound) => {
                tracing::debug!(%trail, impu = %lookup_impu, "no cached subscription - reject");
                return StatusCode::NOT_FOUND.into_response();
            }
            Err(e) => {
                tracing::error!(%trail, error = %e, "cache query failed - reject with 504");
                return StatusCode::GATEWAY_TIMEOUT.into_response();
            }
        };

        let prev_state = irs.reg_state();

        let Some(put) = action.as_ref() else {
            return reply(trail, &irs, None, prev_state, StatusCode::OK);
        };
        let rtype = put.rtype;

        // Without a private ID on the request, the one embedded in the
        // cached subscription applies. With one, an identity missing
        // from the associated set means a new binding.
        let mut impi = private_id.clone();
        let mut new_binding = false;
        if impi.is_empty() {
            impi = xml::get_private_id(irs.ims_sub_xml());
        } else if !irs.ims_sub_xml().is_empty() && !irs.has_associated_impi(&impi) {
            tracing::debug!(%trail, "subscriber registering with new binding");
            new_binding = true;
        }

        let sar_type = match rtype {
            RequestType::Reg => {
                if prev_state == RegistrationState::Registered && !new_binding {
                    // The record TTL refreshes on every SAA, so its age
                    // tells us when the HSS must revalidate. A
                    // no-cache request forces the same path.
                    let record_age = cfg.record_ttl_secs.saturating_sub(irs.ttl());
                    if record_age >= cfg.reregistration_time_secs {
                        tracing::debug!(%trail, record_age, "re-registration must revalidate");
                        ServerAssignmentType::ReRegistration
                    } else if no_cache {
                        tracing::debug!(%trail, "cached responses not allowed - revalidating");
                        ServerAssignmentType::ReRegistration
                    } else {
                        return reply(trail, &irs, Some(rtype), prev_state, StatusCode::OK);
                    }
                } else {
                    tracing::debug!(%trail, "handling initial registration");
                    irs.set_reg_state(RegistrationState::Registered);
                    irs.add_associated_impi(&impi);
                    ServerAssignmentType::Registration
                }
            }
            RequestType::Call => {
                if prev_state == RegistrationState::NotRegistered {
                    tracing::debug!(%trail, "unknown subscriber called - moving to unregistered");
                    irs.set_reg_state(RegistrationState::Unregistered);
                    ServerAssignmentType::UnregisteredUser
                } else {
                    return reply(trail, &irs, Some(rtype), prev_state, StatusCode::OK);
                }
            }
            RequestType::DeregUser | RequestType::DeregAdmin | RequestType::DeregTimeout => {
                if prev_state != RegistrationState::NotRegistered {
                    tracing::debug!(%trail, "handling deregistration");
                    irs.set_reg_state(RegistrationState::NotRegistered);
                    rtype.sar_type()
                } else {
                    // Deregistering an unknown subscriber is an error;
                    // this stops deregistration loops.
                    tracing::debug!(%trail, "rejecting deregistration of unregistered subscriber");
                    return StatusCode::BAD_REQUEST.into_response();
                }
            }
            RequestType::DeregAuthFail | RequestType::DeregAuthTimeout => {
                // Auth failures leave our state alone; the HSS still
                // hears about them so it clears its auth-pending flag.
                tracing::debug!(%trail, "handling authentication failure/timeout");
                rtype.sar_type()
            }
        };

        let server_name = put
            .server_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| cfg.server_name.clone());

        let saa = state
            .hss
            .server_assignment(
                ServerAssignmentRequest {
                    impi: impi.clone(),
                    impu: impu.clone(),
                    server_name,
                    assignment_type: sar_type,
                    support_shared_ifcs: cfg.support_shared_ifcs,
                    wildcard_impu: wildcard_in_use.clone(),
                },
                trail,
            )
            .await;

        let mut http_rc = StatusCode::OK;
        match saa.result {
            HssResult::Success => {}
            HssResult::ServerUnavailable => {
                // Another gateway node may still reach the HSS; 503
                // tells the router to try one.
                http_rc = StatusCode::SERVICE_UNAVAILABLE;
            }
            HssResult::NotFound => http_rc = StatusCode::NOT_FOUND,
            HssResult::NewWildcard => {
                if saa.wildcard_impu == wildcard_in_use {
                    // The wildcard did not actually change; erroring
                    // out beats retrying forever.
                    http_rc = StatusCode::INTERNAL_SERVER_ERROR;
                } else {
                    TraceEvent::WildcardUpdated {
                        previous: wildcard_in_use.clone(),
                        current: saa.wildcard_impu.clone(),
                    }
                    .emit();
                    hss_wildcard = saa.wildcard_impu;
                    // Restart from the cache read under the new key.
                    continue;
                }
            }
            HssResult::Timeout => {
                tracing::error!(%trail, "timeout at HSS on SAR - reject with 504");
                state.penalties.record();
                http_rc = StatusCode::GATEWAY_TIMEOUT;
            }
            _ => http_rc = StatusCode::INTERNAL_SERVER_ERROR,
        }

        let is_dereg = rtype.is_deregistration();
        let is_auth_failure = rtype.is_auth_failure();

        if saa.result == HssResult::Success && !is_dereg && !is_auth_failure {
            // The HSS assigned the subscriber to us; cache the answer.
            irs.set_charging_addresses(saa.charging_addresses);
            irs.set_ims_sub_xml(saa.service_profile);
            irs.set_ttl(cfg.record_ttl_secs);

            let public_ids = irs.public_ids();
            if public_ids.is_empty() {
                // Nothing cacheable came back; reply inline.
                return reply(trail, &irs, Some(rtype), prev_state, http_rc);
            }
            if cfg.configured && !public_ids.iter().any(|id| id.starts_with("sip:")) {
                tracing::error!(%trail, "no SIP URI in implicit registration set");
            }

            return match state.cache.put_irs(irs.clone(), trail).await {
                Ok(completion) => {
                    completion.detach();
                    reply(trail, &irs, Some(rtype), prev_state, http_rc)
                }
                Err(e) => {
                    tracing::warn!(%trail, error = %e, "failed to cache registration data");
                    StatusCode::SERVICE_UNAVAILABLE.into_response()
                }
            };
        }

        if is_dereg && saa.result != HssResult::ServerUnavailable {
            // Clear the cache even if the HSS rejected the request:
            // the router holds no bindings either way. Only an
            // undeliverable request keeps the data, so a retry against
            // another gateway instance still finds it.
            return match state.cache.delete_irs(irs.clone(), trail).await {
                Ok(completion) => {
                    completion.detach();
                    reply(trail, &irs, Some(rtype), prev_state, http_rc)
                }
                Err(CacheError::NotFound) => {
                    // Someone else already deleted it.
                    reply(trail, &irs, Some(rtype), prev_state, http_rc)
                }
                Err(e) => {
                    tracing::warn!(%trail, error = %e, "failed to delete registration data");
                    if http_rc == StatusCode::OK {
                        StatusCode::SERVICE_UNAVAILABLE.into_response()
                    } else {
                        http_rc.into_response()
                    }
                }
            };
        }

        return reply(trail, &irs, Some(rtype), prev_state, http_rc);
    }
}

/// Send the reply. A saved failure status wins over a body; otherwise
/// the `<ClearwaterRegData>` document reflects the set's current state,
/// with the previous state included for REG and CALL requests.
fn reply(
    trail: Uuid,
    irs: &ImplicitRegistrationSet,
    rtype: Option<RequestType>,
    prev_state: RegistrationState,
    http_rc: StatusCode,
) -> Response {
    if http_rc != StatusCode::OK {
        return http_rc.into_response();
    }

    let previous = matches!(rtype, Some(RequestType::Reg) | Some(RequestType::Call))
        .then_some(prev_state);

    match xml::build_reg_data_xml(
        irs.reg_state(),
        irs.ims_sub_xml(),
        irs.charging_addresses(),
        previous,
    ) {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "application/xml")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(%trail, error = %e, "cached subscription document is invalid");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
