//! [`HssConnection`] backed by the binary Cx transport.
//!
//! Owns the authoritative mapping from Diameter result-code pairs to
//! [`HssResult`] outcomes, the per-request timeout, and the
//! auth-scheme matching on multimedia-auth answers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use uuid::Uuid;

use cx_domain::config::{HssConfig, SchemesConfig};
use cx_domain::trace::TraceEvent;
use cx_domain::types::AuthVector;

use crate::connection::HssConnection;
use crate::constants::*;
use crate::transport::{CxAnswer, CxRequest, CxRequestKind, CxTransport, TransportError};
use crate::types::*;

pub struct DiameterHssConnection {
    transport: Arc<dyn CxTransport>,
    dest_realm: String,
    dest_host: String,
    timeout: Duration,
    schemes: SchemesConfig,
}

impl DiameterHssConnection {
    pub fn new(transport: Arc<dyn CxTransport>, hss: HssConfig, schemes: SchemesConfig) -> Self {
        Self {
            transport,
            dest_realm: hss.dest_realm,
            dest_host: hss.dest_host,
            timeout: Duration::from_millis(hss.diameter_timeout_ms),
            schemes,
        }
    }

    /// Run one exchange under the per-request timeout. `Err` is already
    /// a semantic outcome: a transport-level timeout (either deadline)
    /// is `Timeout`, a transport that cannot deliver is
    /// `ServerUnavailable`.
    async fn exchange(&self, kind: CxRequestKind, trail: Uuid) -> Result<CxAnswer, HssResult> {
        let name = kind.name();
        let request = CxRequest {
            dest_realm: self.dest_realm.clone(),
            dest_host: self.dest_host.clone(),
            kind,
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.transport.exchange(request)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Err(_) => {
                tracing::error!(%trail, request = name, "Cx request timed out");
                Err(HssResult::Timeout)
            }
            Ok(Err(TransportError::Timeout)) => {
                tracing::error!(%trail, request = name, "Cx transport reported timeout");
                Err(HssResult::Timeout)
            }
            Ok(Err(TransportError::Unavailable(reason))) => {
                tracing::warn!(%trail, request = name, %reason, "Cx transport unavailable");
                Err(HssResult::ServerUnavailable)
            }
            Ok(Ok(answer)) => Ok(answer),
        };

        TraceEvent::CxCall {
            request: name.into(),
            result: match &result {
                Ok(answer) => format!(
                    "rc={} exp={}",
                    answer.result_code, answer.experimental_result
                ),
                Err(outcome) => outcome.as_str().into(),
            },
            duration_ms,
        }
        .emit();

        result
    }

    fn create_maa(&self, answer: CxAnswer) -> MultimediaAuthAnswer {
        let experimental_3gpp = answer.vendor_id == VENDOR_ID_3GPP;

        if answer.result_code == DIAMETER_SUCCESS {
            let scheme = answer.sip_auth_scheme.clone().unwrap_or_default();
            let av = if scheme == self.schemes.digest {
                answer.digest.map(AuthVector::Digest)
            } else if scheme == self.schemes.akav1 {
                answer.aka.map(|mut aka| {
                    aka.version = 1;
                    AuthVector::Aka(aka)
                })
            } else if scheme == self.schemes.akav2 {
                answer.aka.map(|mut aka| {
                    aka.version = 2;
                    AuthVector::Aka(aka)
                })
            } else {
                tracing::debug!(%scheme, "unsupported auth scheme on MAA");
                return MultimediaAuthAnswer {
                    result: HssResult::UnknownAuthScheme,
                    av: None,
                    scheme,
                };
            };

            match av {
                Some(av) => MultimediaAuthAnswer {
                    result: HssResult::Success,
                    av: Some(av),
                    scheme,
                },
                // Scheme matched but the vector AVPs were absent.
                None => MultimediaAuthAnswer {
                    result: HssResult::Unknown,
                    av: None,
                    scheme,
                },
            }
        } else if answer.result_code == DIAMETER_UNABLE_TO_DELIVER {
            MultimediaAuthAnswer::failure(HssResult::ServerUnavailable)
        } else if answer.result_code == DIAMETER_TOO_BUSY {
            MultimediaAuthAnswer::failure(HssResult::Timeout)
        } else if answer.experimental_result == DIAMETER_ERROR_USER_UNKNOWN && experimental_3gpp {
            MultimediaAuthAnswer::failure(HssResult::NotFound)
        } else {
            MultimediaAuthAnswer::failure(HssResult::Unknown)
        }
    }

    fn create_uaa(&self, answer: CxAnswer) -> UserAuthAnswer {
        let rc = answer.result_code;
        let exp = answer.experimental_result;

        if rc == DIAMETER_SUCCESS
            || exp == DIAMETER_FIRST_REGISTRATION
            || exp == DIAMETER_SUBSEQUENT_REGISTRATION
        {
            UserAuthAnswer {
                result: HssResult::Success,
                json_result: if rc != 0 { rc } else { exp },
                server_name: answer.server_name.unwrap_or_default(),
                capabilities: Some(answer.capabilities.unwrap_or_default()),
            }
        } else if exp == DIAMETER_ERROR_USER_UNKNOWN || exp == DIAMETER_ERROR_IDENTITIES_DONT_MATCH
        {
            UserAuthAnswer::failure(HssResult::NotFound)
        } else if rc == DIAMETER_AUTHORIZATION_REJECTED || exp == DIAMETER_ERROR_ROAMING_NOT_ALLOWED
        {
            UserAuthAnswer::failure(HssResult::Forbidden)
        } else if rc == DIAMETER_TOO_BUSY {
            UserAuthAnswer::failure(HssResult::Timeout)
        } else if rc == DIAMETER_UNABLE_TO_DELIVER {
            UserAuthAnswer::failure(HssResult::ServerUnavailable)
        } else {
            UserAuthAnswer::failure(HssResult::Unknown)
        }
    }

    fn create_lia(&self, answer: CxAnswer) -> LocationInfoAnswer {
        let rc = answer.result_code;
        let exp = answer.experimental_result;
        let experimental_3gpp = answer.vendor_id == VENDOR_ID_3GPP;

        if rc == DIAMETER_SUCCESS
            || (experimental_3gpp
                && (exp == DIAMETER_UNREGISTERED_SERVICE
                    || exp == DIAMETER_ERROR_IDENTITY_NOT_REGISTERED))
        {
            LocationInfoAnswer {
                result: HssResult::Success,
                json_result: if rc != 0 { rc } else { exp },
                server_name: answer.server_name.unwrap_or_default(),
                capabilities: Some(answer.capabilities.unwrap_or_default()),
                wildcard_impu: answer.wildcard_impu.unwrap_or_default(),
            }
        } else if experimental_3gpp && exp == DIAMETER_ERROR_USER_UNKNOWN {
            LocationInfoAnswer::failure(HssResult::NotFound)
        } else if rc == DIAMETER_TOO_BUSY {
            LocationInfoAnswer::failure(HssResult::Timeout)
        } else if rc == DIAMETER_UNABLE_TO_DELIVER {
            LocationInfoAnswer::failure(HssResult::ServerUnavailable)
        } else {
            LocationInfoAnswer::failure(HssResult::Unknown)
        }
    }

    fn create_saa(&self, answer: CxAnswer) -> ServerAssignmentAnswer {
        let rc = answer.result_code;
        let exp = answer.experimental_result;
        let experimental_3gpp = answer.vendor_id == VENDOR_ID_3GPP;

        if rc == DIAMETER_SUCCESS {
            ServerAssignmentAnswer {
                result: HssResult::Success,
                charging_addresses: answer.charging_addresses.unwrap_or_default(),
                service_profile: answer.user_data.unwrap_or_default(),
                wildcard_impu: String::new(),
            }
        } else if rc == DIAMETER_UNABLE_TO_DELIVER {
            ServerAssignmentAnswer::failure(HssResult::ServerUnavailable)
        } else if rc == DIAMETER_TOO_BUSY {
            ServerAssignmentAnswer::failure(HssResult::Timeout)
        } else if exp == DIAMETER_ERROR_USER_UNKNOWN && experimental_3gpp {
            ServerAssignmentAnswer::failure(HssResult::NotFound)
        } else if exp == DIAMETER_ERROR_IN_ASSIGNMENT_TYPE {
            // The HSS is telling us the subscriber now lives under a
            // different wildcard; the caller re-runs its lookup.
            ServerAssignmentAnswer {
                result: HssResult::NewWildcard,
                charging_addresses: Default::default(),
                service_profile: String::new(),
                wildcard_impu: answer.wildcard_impu.unwrap_or_default(),
            }
        } else {
            ServerAssignmentAnswer::failure(HssResult::Unknown)
        }
    }
}

#[async_trait]
impl HssConnection for DiameterHssConnection {
    async fn multimedia_auth(
        &self,
        request: MultimediaAuthRequest,
        trail: Uuid,
    ) -> MultimediaAuthAnswer {
        match self
            .exchange(CxRequestKind::MultimediaAuth(request), trail)
            .await
        {
            Ok(answer) => self.create_maa(answer),
            Err(outcome) => MultimediaAuthAnswer::failure(outcome),
        }
    }

    async fn user_auth(&self, request: UserAuthRequest, trail: Uuid) -> UserAuthAnswer {
        match self.exchange(CxRequestKind::UserAuth(request), trail).await {
            Ok(answer) => self.create_uaa(answer),
            Err(outcome) => UserAuthAnswer::failure(outcome),
        }
    }

    async fn location_info(
        &self,
        request: LocationInfoRequest,
        trail: Uuid,
    ) -> LocationInfoAnswer {
        match self
            .exchange(CxRequestKind::LocationInfo(request), trail)
            .await
        {
            Ok(answer) => self.create_lia(answer),
            Err(outcome) => LocationInfoAnswer::failure(outcome),
        }
    }

    async fn server_assignment(
        &self,
        request: ServerAssignmentRequest,
        trail: Uuid,
    ) -> ServerAssignmentAnswer {
        match self
            .exchange(CxRequestKind::ServerAssignment(request), trail)
            .await
        {
            Ok(answer) => self.create_saa(answer),
            Err(outcome) => ServerAssignmentAnswer::failure(outcome),
        }
    }
}
