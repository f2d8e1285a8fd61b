//! Typed requests toward the HSS and the uniform answers the handlers
//! consume.

use cx_domain::types::{AuthVector, ChargingAddresses, ServerCapabilities};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Result classification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Semantic outcome of a Cx transaction. The connection reduces the
/// primary/experimental result-code pair on each answer to one of
/// these; handlers never see raw Diameter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HssResult {
    Success,
    ServerUnavailable,
    NotFound,
    Forbidden,
    Timeout,
    NewWildcard,
    UnknownAuthScheme,
    Unknown,
}

impl HssResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ServerUnavailable => "server_unavailable",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Timeout => "timeout",
            Self::NewWildcard => "new_wildcard",
            Self::UnknownAuthScheme => "unknown_auth_scheme",
            Self::Unknown => "unknown",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server assignment types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Server-Assignment-Type values carried on a SAR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerAssignmentType {
    NoAssignment,
    Registration,
    ReRegistration,
    UnregisteredUser,
    TimeoutDeregistration,
    UserDeregistration,
    AdministrativeDeregistration,
    AuthenticationFailure,
    AuthenticationTimeout,
}

impl ServerAssignmentType {
    pub fn code(&self) -> i32 {
        match self {
            Self::NoAssignment => 0,
            Self::Registration => 1,
            Self::ReRegistration => 2,
            Self::UnregisteredUser => 3,
            Self::TimeoutDeregistration => 4,
            Self::UserDeregistration => 5,
            Self::AdministrativeDeregistration => 8,
            Self::AuthenticationFailure => 9,
            Self::AuthenticationTimeout => 10,
        }
    }

    /// Registration-class assignments carry subscription data on the
    /// answer; everything else tears state down.
    pub fn is_registration_class(&self) -> bool {
        matches!(
            self,
            Self::Registration | Self::ReRegistration | Self::UnregisteredUser
        )
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Requests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default)]
pub struct MultimediaAuthRequest {
    pub impi: String,
    pub impu: String,
    pub server_name: String,
    pub scheme: String,
    /// Resync authorization material, already base64-decoded. Empty
    /// when the router did not request a resync.
    pub authorization: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserAuthRequest {
    pub impi: String,
    pub impu: String,
    pub visited_network: String,
    pub authorization_type: String,
    pub emergency: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LocationInfoRequest {
    pub impu: String,
    pub originating: String,
    pub authorization_type: String,
}

#[derive(Debug, Clone)]
pub struct ServerAssignmentRequest {
    pub impi: String,
    pub impu: String,
    pub server_name: String,
    pub assignment_type: ServerAssignmentType,
    pub support_shared_ifcs: bool,
    /// Wildcard public identity under which the subscriber is
    /// provisioned, when one is in play.
    pub wildcard_impu: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Answers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct MultimediaAuthAnswer {
    pub result: HssResult,
    pub av: Option<AuthVector>,
    /// The scheme the HSS actually answered with.
    pub scheme: String,
}

impl MultimediaAuthAnswer {
    pub fn failure(result: HssResult) -> Self {
        Self {
            result,
            av: None,
            scheme: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserAuthAnswer {
    pub result: HssResult,
    /// Raw result code forwarded in the router-facing JSON body.
    pub json_result: i32,
    pub server_name: String,
    pub capabilities: Option<ServerCapabilities>,
}

impl UserAuthAnswer {
    pub fn failure(result: HssResult) -> Self {
        Self {
            result,
            json_result: 0,
            server_name: String::new(),
            capabilities: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocationInfoAnswer {
    pub result: HssResult,
    pub json_result: i32,
    pub server_name: String,
    pub capabilities: Option<ServerCapabilities>,
    pub wildcard_impu: String,
}

impl LocationInfoAnswer {
    pub fn failure(result: HssResult) -> Self {
        Self {
            result,
            json_result: 0,
            server_name: String::new(),
            capabilities: None,
            wildcard_impu: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerAssignmentAnswer {
    pub result: HssResult,
    pub charging_addresses: ChargingAddresses,
    /// The IMS subscription XML assigned to us.
    pub service_profile: String,
    pub wildcard_impu: String,
}

impl ServerAssignmentAnswer {
    pub fn failure(result: HssResult) -> Self {
        Self {
            result,
            charging_addresses: ChargingAddresses::default(),
            service_profile: String::new(),
            wildcard_impu: String::new(),
        }
    }
}
