pub mod core;
pub mod error;
pub mod handler;
pub mod route;
pub mod upstream_client;

pub use core::{ClientCache, Core, CoreState, proxy_router};
pub use error::{DispatchError, DispatchErrorKind};
pub use route::{LEGACY_PROVIDERS, Route, is_non_route, resolve_route};
pub use upstream_client::{RotationOutcome, UpstreamClient, UpstreamResponse};
