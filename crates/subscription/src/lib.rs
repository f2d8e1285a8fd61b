//! `cx-subscription` — IMS subscription documents and the registration
//! sets derived from them.
//!
//! Provides the namespace-stripping subscription XML codec ([`xml`]),
//! the [`ImplicitRegistrationSet`] cache unit, and the [`ImsSubscription`]
//! collection used when a push-profile notification touches every
//! registration set belonging to one private identity.

pub mod ims_sub;
pub mod irs;
pub mod xml;

pub use ims_sub::ImsSubscription;
pub use irs::ImplicitRegistrationSet;
