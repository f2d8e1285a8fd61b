//! Abstract connection to an HSS.

use async_trait::async_trait;
use uuid::Uuid;

use crate::types::{
    LocationInfoAnswer, LocationInfoRequest, MultimediaAuthAnswer, MultimediaAuthRequest,
    ServerAssignmentAnswer, ServerAssignmentRequest, UserAuthAnswer, UserAuthRequest,
};

/// The four Cx transactions the gateway issues.
///
/// Implementations never fail at the Rust level: every error condition
/// is folded into the answer's [`crate::types::HssResult`], so handlers
/// have exactly one place to branch on.
#[async_trait]
pub trait HssConnection: Send + Sync {
    /// MAR/MAA — fetch an authentication vector.
    async fn multimedia_auth(
        &self,
        request: MultimediaAuthRequest,
        trail: Uuid,
    ) -> MultimediaAuthAnswer;

    /// UAR/UAA — authorize a registration attempt.
    async fn user_auth(&self, request: UserAuthRequest, trail: Uuid) -> UserAuthAnswer;

    /// LIR/LIA — locate the serving S-CSCF.
    async fn location_info(&self, request: LocationInfoRequest, trail: Uuid)
        -> LocationInfoAnswer;

    /// SAR/SAA — assign, refresh, or clear the server assignment.
    async fn server_assignment(
        &self,
        request: ServerAssignmentRequest,
        trail: Uuid,
    ) -> ServerAssignmentAnswer;
}
