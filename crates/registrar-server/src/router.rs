//! Axum router wiring.
//!
//! Every route, the fallback and the metrics endpoint itself pass through
//! the request instrumentation layer. CORS sits inside it, so answered
//! preflights are counted like any other request.

use std::sync::Arc;

use axum::{
    http::{header, Method},
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::{app_state::AppState, obs, ops};

pub fn build_router(state: AppState) -> Router {
    let http = state.http_metrics();
    let metrics_path = state.cfg().metrics.path.clone();

    let app = Router::new()
        .route("/", get(ops::root))
        .route("/api", get(ops::api_status))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route(&metrics_path, get(ops::metrics))
        .fallback(ops::not_found)
        .with_state(state);

    instrument(app, http)
}

/// Any origin; the methods and headers browser clients of the API send.
pub fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Wrap all routes (and the fallback) already added to `router` with CORS,
/// then with request instrumentation as the outermost layer.
pub fn instrument(router: Router, metrics: Arc<obs::HttpMetrics>) -> Router {
    router
        .layer(cors())
        .layer(middleware::from_fn_with_state(metrics, obs::track_requests))
}
