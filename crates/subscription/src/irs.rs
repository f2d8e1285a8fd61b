//! The implicit registration set: the unit of cacheing and of HSS
//! assignment.

use cx_domain::types::{ChargingAddresses, RegistrationState};

use crate::xml;

/// A group of public identities that register and deregister together.
///
/// The default public identity is derived from the subscription XML (the
/// first unbarred identity) and is stable for the lifetime of the set.
/// Mutators mark the set as touched so a subscription write can skip
/// members a push-profile notification never changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImplicitRegistrationSet {
    default_impu: String,
    default_barred: bool,
    ims_sub_xml: String,
    reg_state: RegistrationState,
    associated_impis: Vec<String>,
    charging_addresses: ChargingAddresses,
    ttl: u32,
    touched: bool,
}

impl Default for ImplicitRegistrationSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ImplicitRegistrationSet {
    /// An empty set in state `NotRegistered`, as synthesised on a PUT
    /// whose cache read missed.
    pub fn new() -> Self {
        Self {
            default_impu: String::new(),
            default_barred: false,
            ims_sub_xml: String::new(),
            reg_state: RegistrationState::NotRegistered,
            associated_impis: Vec::new(),
            charging_addresses: ChargingAddresses::default(),
            ttl: 0,
            touched: false,
        }
    }

    // ── accessors ────────────────────────────────────────────────────

    pub fn default_impu(&self) -> &str {
        &self.default_impu
    }

    /// True when every public identity in the subscription is barred.
    /// The set stays usable; the flag is surfaced in logs.
    pub fn default_barred(&self) -> bool {
        self.default_barred
    }

    pub fn ims_sub_xml(&self) -> &str {
        &self.ims_sub_xml
    }

    pub fn reg_state(&self) -> RegistrationState {
        self.reg_state
    }

    pub fn associated_impis(&self) -> &[String] {
        &self.associated_impis
    }

    pub fn has_associated_impi(&self, impi: &str) -> bool {
        self.associated_impis.iter().any(|i| i == impi)
    }

    pub fn charging_addresses(&self) -> &ChargingAddresses {
        &self.charging_addresses
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    /// All public identities in the subscription document.
    pub fn public_ids(&self) -> Vec<String> {
        xml::get_public_ids(&self.ims_sub_xml)
    }

    // ── mutators ─────────────────────────────────────────────────────

    /// Replace the subscription document and re-derive the default
    /// public identity from it.
    pub fn set_ims_sub_xml(&mut self, ims_sub_xml: String) {
        let (ids, default) = xml::get_public_and_default_ids(&ims_sub_xml);
        self.default_barred = default.is_none() && !ids.is_empty();
        if self.default_barred {
            tracing::warn!(
                default_impu = %ids[0],
                "every public identity in the registration set is barred"
            );
        }
        self.default_impu = default.or_else(|| ids.into_iter().next()).unwrap_or_default();
        self.ims_sub_xml = ims_sub_xml;
        self.touched = true;
    }

    pub fn set_reg_state(&mut self, state: RegistrationState) {
        self.reg_state = state;
        self.touched = true;
    }

    pub fn set_charging_addresses(&mut self, addresses: ChargingAddresses) {
        self.charging_addresses = addresses;
        self.touched = true;
    }

    pub fn set_ttl(&mut self, ttl: u32) {
        self.ttl = ttl;
        self.touched = true;
    }

    /// Record a private identity as bound to this set. Empty identities
    /// and duplicates are ignored.
    pub fn add_associated_impi(&mut self, impi: &str) {
        if impi.is_empty() || self.has_associated_impi(impi) {
            return;
        }
        self.associated_impis.push(impi.to_owned());
        self.touched = true;
    }

    pub fn set_associated_impis(&mut self, impis: Vec<String>) {
        self.associated_impis = impis;
        self.touched = true;
    }

    pub fn clear_touched(&mut self) {
        self.touched = false;
    }
}
