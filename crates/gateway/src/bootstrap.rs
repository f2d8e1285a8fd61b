//! AppState construction shared by `main.rs` and embedders.
//!
//! Embedders that own a real Cx transport (and its dictionary) pass it
//! in here; the shipped binary runs either against such a transport or
//! in provisioning-fallback mode.

use std::sync::Arc;

use anyhow::Context;

use cx_cache::{CacheProcessor, MemoryBackend};
use cx_domain::config::{Config, ConfigSeverity};
use cx_hss::fallback::{FileProvisioningStore, ProvisioningStore};
use cx_hss::notifications::HssNotificationHandler;
use cx_hss::transport::CxTransport;

use crate::notifications::NotificationProcessor;
use crate::notifier::HttpRouterNotifier;
use crate::overload::{HealthChecker, PenaltyCounter};
use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub fn build_app_state(
    config: Arc<Config>,
    transport: Option<Arc<dyn CxTransport>>,
) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Cache ────────────────────────────────────────────────────────
    let backend = Arc::new(MemoryBackend::new());
    let cache = Arc::new(CacheProcessor::new(
        backend,
        config.cache.workers,
        config.cache.queue_depth,
    ));
    tracing::info!(
        workers = config.cache.workers,
        queue_depth = config.cache.queue_depth,
        "cache processor ready"
    );

    // ── Provisioning store ───────────────────────────────────────────
    let provisioning: Arc<dyn ProvisioningStore> = match &config.provisioning.path {
        Some(path) => Arc::new(
            FileProvisioningStore::load(path).context("loading provisioning store")?,
        ),
        None => Arc::new(FileProvisioningStore::empty()),
    };

    // ── HSS connection ───────────────────────────────────────────────
    let hss = cx_hss::create_connection(&config.hss, &config.schemes, transport, provisioning)
        .context("initializing HSS connection")?;

    // ── Router notifier ──────────────────────────────────────────────
    let router = Arc::new(HttpRouterNotifier::new(&config.router).context("building router client")?);
    tracing::info!(base_url = %config.router.base_url, "router notifier ready");

    Ok(AppState {
        config,
        cache,
        hss,
        router,
        health: Arc::new(HealthChecker::default()),
        penalties: Arc::new(PenaltyCounter::default()),
    })
}

/// The notification handler the Cx transport dispatches incoming
/// RTR/PPR requests to.
pub fn build_notification_handler(state: &AppState) -> Arc<dyn HssNotificationHandler> {
    Arc::new(NotificationProcessor::new(
        Arc::clone(&state.cache),
        Arc::clone(&state.router),
    ))
}
