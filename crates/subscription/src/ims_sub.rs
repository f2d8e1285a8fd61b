//! The full IMS subscription for one private identity: every implicit
//! registration set the cache holds for it, keyed by default public
//! identity.

use std::collections::BTreeMap;

use cx_domain::types::ChargingAddresses;

use crate::irs::ImplicitRegistrationSet;

/// A collection of registration sets sharing one private identity.
///
/// Built by the cache when a push-profile notification needs to touch
/// every set at once. Only sets that were actually mutated are written
/// back.
#[derive(Debug, Clone, Default)]
pub struct ImsSubscription {
    irss: BTreeMap<String, ImplicitRegistrationSet>,
}

impl ImsSubscription {
    pub fn new(irss: Vec<ImplicitRegistrationSet>) -> Self {
        let irss = irss
            .into_iter()
            .map(|irs| (irs.default_impu().to_owned(), irs))
            .collect();
        Self { irss }
    }

    pub fn is_empty(&self) -> bool {
        self.irss.is_empty()
    }

    pub fn len(&self) -> usize {
        self.irss.len()
    }

    /// Look up the member set whose default public identity is `impu`.
    pub fn irs_for_default_impu(&mut self, impu: &str) -> Option<&mut ImplicitRegistrationSet> {
        self.irss.get_mut(impu)
    }

    /// Apply new charging addresses to every member set.
    pub fn set_charging_addrs(&mut self, addresses: &ChargingAddresses) {
        for irs in self.irss.values_mut() {
            irs.set_charging_addresses(addresses.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImplicitRegistrationSet> {
        self.irss.values()
    }

    pub fn into_irss(self) -> Vec<ImplicitRegistrationSet> {
        self.irss.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn irs(impu: &str) -> ImplicitRegistrationSet {
        let xml = format!(
            "<IMSSubscription><ServiceProfile><PublicIdentity>\
             <Identity>{impu}</Identity></PublicIdentity>\
             </ServiceProfile></IMSSubscription>"
        );
        let mut irs = ImplicitRegistrationSet::new();
        irs.set_ims_sub_xml(xml);
        irs.clear_touched();
        irs
    }

    #[test]
    fn charging_update_touches_every_member() {
        let mut sub = ImsSubscription::new(vec![irs("sip:a@ex"), irs("sip:b@ex")]);
        sub.set_charging_addrs(&ChargingAddresses::new(vec!["ccf1".into()], vec![]));
        assert!(sub.iter().all(|irs| irs.is_touched()));
        assert!(sub
            .iter()
            .all(|irs| irs.charging_addresses().ccfs == vec!["ccf1".to_owned()]));
    }

    #[test]
    fn lookup_by_default_impu() {
        let mut sub = ImsSubscription::new(vec![irs("sip:a@ex")]);
        assert!(sub.irs_for_default_impu("sip:a@ex").is_some());
        assert!(sub.irs_for_default_impu("sip:missing@ex").is_none());
    }
}
