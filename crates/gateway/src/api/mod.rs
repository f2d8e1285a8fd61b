pub mod admin;
pub mod impi;
pub mod impu;
pub mod reg_data;
pub mod responses;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the router-facing API.
///
/// Static segments (`digest`, `registration-status`) win over the
/// `{scheme}` capture, so the AV route only ever sees `av`, `aka`, and
/// `aka2` tails plus garbage it rejects itself.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/impi/:impi/digest", get(impi::digest))
        .route(
            "/impi/:impi/registration-status",
            get(impi::registration_status),
        )
        .route("/impi/:impi/:scheme", get(impi::av))
        .route("/impu/:impu/location", get(impu::location))
        .route(
            "/impu/:impu/reg-data",
            get(reg_data::get_reg_data).put(reg_data::put_reg_data),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the read-only management API: cached reg-data (GET only, any
/// other method gets a 405 from the router) plus the health report.
pub fn management_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(admin::health))
        .route("/impu/:impu/reg-data", get(reg_data::get_reg_data))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
