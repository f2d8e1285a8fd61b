//! `cx-hss` — the Cx-protocol face of the gateway.
//!
//! Provides the [`HssConnection`] trait (four asynchronous request
//! methods, answers carrying a uniform [`types::HssResult`]), a
//! Diameter-transport-backed implementation
//! ([`diameter::DiameterHssConnection`]), and a provisioning-backed
//! fallback ([`fallback::ProvisioningHssConnection`]) used when no live
//! HSS is configured. HSS-initiated notifications (RTR/PPR) and their
//! answers live in [`notifications`].
//!
//! The Diameter wire encoding is out of scope: [`transport::CxTransport`]
//! exchanges decoded AVP views, and the dictionary stays with the
//! embedding transport library.

pub mod connection;
pub mod constants;
pub mod diameter;
pub mod fallback;
pub mod notifications;
pub mod transport;
pub mod types;

pub use connection::HssConnection;

use std::sync::Arc;

use cx_domain::config::{HssConfig, SchemesConfig};
use cx_domain::error::{Error, Result};

use diameter::DiameterHssConnection;
use fallback::{ProvisioningHssConnection, ProvisioningStore};
use transport::CxTransport;

/// Build the right [`HssConnection`] implementation for the
/// configuration.
///
/// | `hss.configured` | transport | Result                         |
/// |------------------|-----------|--------------------------------|
/// | `true`           | supplied  | [`DiameterHssConnection`]      |
/// | `true`           | absent    | config error                   |
/// | `false`          | any       | [`ProvisioningHssConnection`]  |
pub fn create_connection(
    hss: &HssConfig,
    schemes: &SchemesConfig,
    transport: Option<Arc<dyn CxTransport>>,
    provisioning: Arc<dyn ProvisioningStore>,
) -> Result<Arc<dyn HssConnection>> {
    if hss.configured {
        let transport = transport.ok_or_else(|| {
            Error::Config(
                "hss.configured is true but no Cx transport was supplied; \
                 embed one via bootstrap, or set hss.configured = false"
                    .into(),
            )
        })?;
        tracing::info!(
            dest_realm = %hss.dest_realm,
            dest_host = %hss.dest_host,
            timeout_ms = hss.diameter_timeout_ms,
            "using Diameter HSS connection"
        );
        Ok(Arc::new(DiameterHssConnection::new(
            transport,
            hss.clone(),
            schemes.clone(),
        )))
    } else {
        tracing::info!("no HSS configured; answering Cx requests from provisioning data");
        Ok(Arc::new(ProvisioningHssConnection::new(
            provisioning,
            hss.server_name.clone(),
            schemes.digest.clone(),
        )))
    }
}
