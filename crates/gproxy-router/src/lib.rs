//! The transport-level axum app: mounts the core's `/{provider}/*` proxy
//! dispatcher (C7) and serves the handful of paths the core explicitly
//! doesn't route (spec §4.4): `/`, `/admin*`, `/favicon.ico`, `/robots.txt`,
//! and one static asset path.
//!
//! Config file parsing/persistence, the admin web UI, static file serving,
//! log/response buffers, and password rate limiting are all out of scope
//! for the core (spec §1) — this crate gives them the narrowest possible
//! real implementation rather than a TODO.

mod admin;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use gproxy_core::CoreState;

/// Build the full app: the core's proxy router plus the non-route surfaces.
///
/// `config_path` is only used by the admin reload endpoint to re-read the
/// config file on `POST /admin/reload`; the core itself never touches disk.
pub fn app(state: Arc<CoreState>, admin_password: String, config_path: String) -> Router {
    let core_router = gproxy_core::proxy_router(state.clone());

    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/favicon.ico", get(no_content))
        .route("/robots.txt", get(robots))
        .route("/assets/{*path}", get(no_static_assets))
        .nest("/admin", admin::router(state, admin_password, config_path))
        .merge(core_router)
}

async fn index() -> impl IntoResponse {
    (StatusCode::OK, "gproxy\n")
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

async fn no_content() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

async fn robots() -> impl IntoResponse {
    (StatusCode::OK, "User-agent: *\nDisallow: /\n")
}

async fn no_static_assets() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}
