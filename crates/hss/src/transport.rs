//! Seam to the binary Cx transport.
//!
//! The transport library owns the wire encoding and the AVP dictionary;
//! this module only defines the decoded view exchanged with it. A
//! request names its destination and carries one of the four outgoing
//! request records; an answer is the flat set of AVPs the connection
//! layer knows how to interpret.

use async_trait::async_trait;

use cx_domain::types::{AkaAuthVector, ChargingAddresses, DigestAuthVector, ServerCapabilities};

use crate::types::{
    LocationInfoRequest, MultimediaAuthRequest, ServerAssignmentRequest, UserAuthRequest,
};

#[derive(Debug, Clone)]
pub enum CxRequestKind {
    MultimediaAuth(MultimediaAuthRequest),
    UserAuth(UserAuthRequest),
    LocationInfo(LocationInfoRequest),
    ServerAssignment(ServerAssignmentRequest),
}

impl CxRequestKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MultimediaAuth(_) => "MAR",
            Self::UserAuth(_) => "UAR",
            Self::LocationInfo(_) => "LIR",
            Self::ServerAssignment(_) => "SAR",
        }
    }
}

/// An outgoing Cx request, addressed to the destination realm/host the
/// connection was configured with.
#[derive(Debug, Clone)]
pub struct CxRequest {
    pub dest_realm: String,
    pub dest_host: String,
    pub kind: CxRequestKind,
}

/// Decoded answer AVPs. Exactly one of `result_code` and
/// `experimental_result` is non-zero on a well-formed answer; the
/// payload fields are set when the corresponding AVPs were present.
#[derive(Debug, Clone, Default)]
pub struct CxAnswer {
    pub result_code: i32,
    pub experimental_result: i32,
    pub vendor_id: u32,
    pub sip_auth_scheme: Option<String>,
    pub digest: Option<DigestAuthVector>,
    pub aka: Option<AkaAuthVector>,
    pub server_name: Option<String>,
    pub capabilities: Option<ServerCapabilities>,
    pub wildcard_impu: Option<String>,
    pub charging_addresses: Option<ChargingAddresses>,
    pub user_data: Option<String>,
}

impl CxAnswer {
    pub fn with_result_code(result_code: i32) -> Self {
        Self {
            result_code,
            ..Self::default()
        }
    }

    pub fn with_experimental(experimental_result: i32, vendor_id: u32) -> Self {
        Self {
            experimental_result,
            vendor_id,
            ..Self::default()
        }
    }
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum TransportError {
    /// The peer did not answer within the transport's own deadline.
    #[error("transport timed out")]
    Timeout,

    /// No route to the HSS (no connections up, send failed).
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// One request/answer exchange on the long-lived Cx transport.
#[async_trait]
pub trait CxTransport: Send + Sync {
    async fn exchange(&self, request: CxRequest) -> Result<CxAnswer, TransportError>;
}
