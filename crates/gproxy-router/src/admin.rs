//! The narrowest possible stand-in for the admin web UI (out of scope per
//! spec §1): one password-gated JSON endpoint listing configured providers
//! (names and flavors, never keys or access keys), plus the config-reload
//! operation spec §5/§9 describe as a narrow admin-facing surface. No
//! session/login flow, no static assets — all of that belongs to the
//! external admin UI the core treats as a collaborator it doesn't own.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use gproxy_common::{ConfigFile, ConfigSnapshot};
use gproxy_core::CoreState;
use serde::Serialize;
use serde_json::json;

#[derive(Clone)]
struct AdminState {
    core: Arc<CoreState>,
    password: String,
    config_path: String,
}

pub fn router(core: Arc<CoreState>, password: String, config_path: String) -> Router {
    Router::new()
        .route("/providers", get(list_providers))
        .route("/reload", post(reload))
        .with_state(AdminState {
            core,
            password,
            config_path,
        })
}

#[derive(Serialize)]
struct ProviderSummary {
    name: String,
    flavor: &'static str,
    key_count: usize,
}

async fn list_providers(State(state): State<AdminState>, headers: HeaderMap) -> impl IntoResponse {
    let supplied = headers
        .get("x-admin-password")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if supplied != state.password {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let snapshot = state.core.config.load_full();
    let providers: Vec<ProviderSummary> = snapshot
        .providers
        .iter()
        .map(|p| ProviderSummary {
            name: p.name.clone(),
            flavor: p.flavor.as_str(),
            key_count: p.keys.len(),
        })
        .collect();
    Json(providers).into_response()
}

/// Re-reads the config file and atomically swaps the snapshot, clearing the
/// per-provider upstream-client cache (spec §5, §9: "dynamic config
/// replacement"). The admin password itself is not reloadable here — it was
/// fixed at process start, same as the teacher's CLI/env precedence.
async fn reload(State(state): State<AdminState>, headers: HeaderMap) -> impl IntoResponse {
    let supplied = headers
        .get("x-admin-password")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if supplied != state.password {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let file = match ConfigFile::from_path(&state.config_path) {
        Ok(file) => file,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
                .into_response();
        }
    };
    let snapshot = match ConfigSnapshot::from_file(file, state.password.clone()) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
                .into_response();
        }
    };

    let provider_count = snapshot.providers.len();
    state.core.reload(snapshot).await;
    Json(json!({"reloaded": true, "providers": provider_count})).into_response()
}
