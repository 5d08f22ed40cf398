//! Shared proxy state: the configuration snapshot plus the per-provider
//! upstream-client cache (spec §5), and the axum router that mounts C7's
//! dispatcher over it.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::Router;
use axum::routing::any;
use gproxy_common::ConfigSnapshot;
use gproxy_provider_core::KeyPool;
use tokio::sync::RwLock;

use crate::error::DispatchError;
use crate::handler::proxy_handler;
use crate::upstream_client::UpstreamClient;

/// Map from provider name (lowercased) to its lazily-built upstream client.
/// Cleared wholesale on configuration reload; readers that miss rebuild
/// independently (spec §5: "two parallel rebuilds ... are acceptable").
pub type ClientCache = RwLock<HashMap<String, Arc<UpstreamClient>>>;

pub struct CoreState {
    pub config: ArcSwap<ConfigSnapshot>,
    pub clients: ClientCache,
}

impl CoreState {
    pub fn new(config: ConfigSnapshot) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the configuration snapshot and drop every cached upstream
    /// client so the next request per provider rebuilds against the new
    /// key list and base URL.
    pub async fn reload(&self, config: ConfigSnapshot) {
        self.config.store(Arc::new(config));
        self.clients.write().await.clear();
    }

    /// Retrieve or lazily construct the upstream client for `provider_name`.
    /// Returns `Ok(None)` when no provider with that name is configured,
    /// which the dispatcher maps onto `ProviderNotConfigured` (503). Returns
    /// `Err` when a provider is configured but its client failed to build
    /// (e.g. TLS backend init failure) — the dispatcher maps that onto 500
    /// rather than letting it propagate as a panic.
    pub async fn client_for(
        &self,
        provider_name: &str,
    ) -> Result<Option<Arc<UpstreamClient>>, DispatchError> {
        let snapshot = self.config.load();
        let Some(provider) = snapshot.provider(provider_name) else {
            return Ok(None);
        };
        let cache_key = provider.name.to_ascii_lowercase();

        if let Some(client) = self.clients.read().await.get(&cache_key) {
            return Ok(Some(client.clone()));
        }

        let pool = Arc::new(KeyPool::new(provider.keys.clone()));
        let client = Arc::new(
            UpstreamClient::new(pool, provider.base_url.clone(), provider.flavor).map_err(
                |err| DispatchError::internal(format!("building upstream http client: {err}")),
            )?,
        );
        self.clients
            .write()
            .await
            .insert(cache_key, client.clone());
        Ok(Some(client))
    }
}

pub struct Core {
    state: Arc<CoreState>,
}

impl Core {
    pub fn new(config: ConfigSnapshot) -> Self {
        Self {
            state: Arc::new(CoreState::new(config)),
        }
    }

    pub fn state(&self) -> Arc<CoreState> {
        self.state.clone()
    }

    /// The `/{provider}/*path` proxy route (C7), to be merged into the
    /// transport-level router alongside the non-route surfaces from
    /// `route::is_non_route`.
    pub fn router(&self) -> Router {
        proxy_router(self.state.clone())
    }
}

/// The C7 proxy route mounted over a given state, independent of owning a
/// `Core`. Lets the transport layer (`gproxy-router`) merge this with the
/// handful of paths the core doesn't route (spec §4.4).
pub fn proxy_router(state: Arc<CoreState>) -> Router {
    Router::new()
        .route("/{provider}/{*path}", any(proxy_handler))
        .route("/{provider}", any(proxy_handler))
        .with_state(state)
}
