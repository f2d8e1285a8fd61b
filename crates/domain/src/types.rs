//! Subscriber-data value types shared between the cache, the HSS
//! connection, and the HTTP handlers.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registration state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Registration state of an implicit registration set.
///
/// `Unregistered` means service is provisioned but no binding is active;
/// `NotRegistered` means the subscriber is unknown to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationState {
    Registered,
    Unregistered,
    NotRegistered,
}

impl RegistrationState {
    /// The wire form used in the `<RegistrationState>` element.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::Unregistered => "UNREGISTERED",
            Self::NotRegistered => "NOT_REGISTERED",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Charging addresses
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A subscriber's charging addresses.
///
/// CCFs and ECFs are stored in priority order, in the format given by the
/// provisioning server (normally the HSS). At most the first two entries
/// of each list are emitted toward the router.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargingAddresses {
    pub ccfs: Vec<String>,
    pub ecfs: Vec<String>,
}

impl ChargingAddresses {
    pub fn new(ccfs: Vec<String>, ecfs: Vec<String>) -> Self {
        Self { ccfs, ecfs }
    }

    pub fn is_empty(&self) -> bool {
        self.ccfs.is_empty() && self.ecfs.is_empty()
    }

    /// Compact form for log fields.
    pub fn log_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ccf) = self.ccfs.first() {
            parts.push(format!("Primary CCF: {ccf}"));
        }
        if let Some(ccf) = self.ccfs.get(1) {
            parts.push(format!("Secondary CCF: {ccf}"));
        }
        if let Some(ecf) = self.ecfs.first() {
            parts.push(format!("Primary ECF: {ecf}"));
        }
        if let Some(ecf) = self.ecfs.get(1) {
            parts.push(format!("Secondary ECF: {ecf}"));
        }
        parts.join(", ")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server capabilities
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// S-CSCF capabilities returned on UAA/LIA when no server name is
/// assigned. Both capability lists are kept sorted by the sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerCapabilities {
    pub mandatory_capabilities: Vec<i32>,
    pub optional_capabilities: Vec<i32>,
    /// Preferred server name carried inside the capabilities AVP, if any.
    pub server_name: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Authentication vectors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// SIP digest credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestAuthVector {
    pub ha1: String,
    pub realm: String,
    pub qop: String,
}

/// AKA challenge material. `version` is 1 or 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AkaAuthVector {
    pub challenge: String,
    pub response: String,
    pub crypt_key: String,
    pub integrity_key: String,
    pub version: u8,
}

/// An authentication vector returned on a multimedia-auth answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthVector {
    Digest(DigestAuthVector),
    Aka(AkaAuthVector),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg_state_wire_form() {
        assert_eq!(RegistrationState::Registered.as_str(), "REGISTERED");
        assert_eq!(RegistrationState::Unregistered.as_str(), "UNREGISTERED");
        assert_eq!(RegistrationState::NotRegistered.as_str(), "NOT_REGISTERED");
    }

    #[test]
    fn charging_addresses_log_string() {
        let addrs = ChargingAddresses::new(
            vec!["ccf1".into(), "ccf2".into()],
            vec!["ecf1".into()],
        );
        assert_eq!(
            addrs.log_string(),
            "Primary CCF: ccf1, Secondary CCF: ccf2, Primary ECF: ecf1"
        );
        assert!(ChargingAddresses::default().is_empty());
    }
}
