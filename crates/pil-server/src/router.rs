use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all PIL endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/payouts/preview", post(handler::preview_handler))
        .route("/v1/payouts/approve", post(handler::approve_handler))
        .route("/v1/payouts/:id", get(handler::get_entry_handler))
        .route("/v1/payouts/:id/adjustments", post(handler::adjust_handler))
        .route("/v1/payouts/:id/status", post(handler::status_handler))
        .route("/v1/payouts/:id/lineage", get(handler::lineage_handler))
        .route("/v1/payouts/:id/audit", get(handler::audit_handler))
        .route("/v1/payouts/:id/events", get(handler::events_handler))
        .route(
            "/v1/chains/:key/records",
            post(handler::create_chain_record_handler),
        )
        .route(
            "/v1/chains/:key/records/:position/verify",
            get(handler::verify_chain_record_handler),
        )
        .route("/v1/chains/:key/verify", get(handler::verify_chain_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
