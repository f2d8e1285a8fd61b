//! HSS-initiated Cx notifications and their answers.
//!
//! The transport library decodes an incoming RTR/PPR into these records
//! and hands them to the registered [`HssNotificationHandler`]; the
//! returned answer is encoded back onto the wire by the transport.

use async_trait::async_trait;
use uuid::Uuid;

use cx_domain::types::ChargingAddresses;

use crate::constants::{DIAMETER_SUCCESS, DIAMETER_UNABLE_TO_COMPLY};

/// Deregistration-Reason code on a Registration-Termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeregistrationReason {
    PermanentTermination,
    NewServerAssigned,
    ServerChange,
    RemoveScscf,
    Other(i32),
}

impl DeregistrationReason {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::PermanentTermination,
            1 => Self::NewServerAssigned,
            2 => Self::ServerChange,
            3 => Self::RemoveScscf,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::PermanentTermination => 0,
            Self::NewServerAssigned => 1,
            Self::ServerChange => 2,
            Self::RemoveScscf => 3,
            Self::Other(code) => *code,
        }
    }
}

/// Registration-Termination request: tear down bindings for the named
/// identities.
#[derive(Debug, Clone)]
pub struct RegistrationTermination {
    pub reason: DeregistrationReason,
    pub impi: String,
    pub associated_impis: Vec<String>,
    /// Optional explicit public-identity list. Only honoured for
    /// permanent-termination and remove-S-CSCF reasons.
    pub impus: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RegistrationTerminationAnswer {
    /// `DIAMETER_SUCCESS` (2001) or `DIAMETER_UNABLE_TO_COMPLY` (5012).
    pub result_code: i32,
    /// The IMPI list echoed on the Associated-Identities AVP.
    pub associated_identities: Vec<String>,
}

impl RegistrationTerminationAnswer {
    pub fn success(associated_identities: Vec<String>) -> Self {
        Self {
            result_code: DIAMETER_SUCCESS,
            associated_identities,
        }
    }

    pub fn failure(associated_identities: Vec<String>) -> Self {
        Self {
            result_code: DIAMETER_UNABLE_TO_COMPLY,
            associated_identities,
        }
    }
}

/// Push-Profile request: new subscription XML and/or charging addresses
/// for every registration set of one private identity.
#[derive(Debug, Clone)]
pub struct PushProfile {
    pub impi: String,
    pub user_data: Option<String>,
    pub charging_addresses: Option<ChargingAddresses>,
}

#[derive(Debug, Clone)]
pub struct PushProfileAnswer {
    pub result_code: i32,
}

impl PushProfileAnswer {
    pub fn success() -> Self {
        Self {
            result_code: DIAMETER_SUCCESS,
        }
    }

    pub fn failure() -> Self {
        Self {
            result_code: DIAMETER_UNABLE_TO_COMPLY,
        }
    }
}

/// Processors for the two HSS-initiated notification types. The Cx
/// transport dispatches each decoded notification here and sends the
/// answer back to the HSS.
#[async_trait]
pub trait HssNotificationHandler: Send + Sync {
    async fn registration_termination(
        &self,
        request: RegistrationTermination,
        trail: Uuid,
    ) -> RegistrationTerminationAnswer;

    async fn push_profile(&self, request: PushProfile, trail: Uuid) -> PushProfileAnswer;
}
