use std::sync::Arc;

use cx_cache::CacheProcessor;
use cx_domain::config::Config;
use cx_hss::HssConnection;

use crate::notifier::RouterNotifier;
use crate::overload::{HealthChecker, PenaltyCounter};

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Subscriber-data cache behind the worker pool.
    pub cache: Arc<CacheProcessor>,
    /// Live HSS connection or the provisioning-backed fallback.
    pub hss: Arc<dyn HssConnection>,
    /// Outbound client toward the router.
    pub router: Arc<dyn RouterNotifier>,
    pub health: Arc<HealthChecker>,
    pub penalties: Arc<PenaltyCounter>,
}
