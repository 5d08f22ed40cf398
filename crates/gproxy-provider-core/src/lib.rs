//! Provider-facing primitives for gproxy: the key pool and per-request key
//! context (C2/C3), the directive parser (C6), and the header helpers both
//! lean on. Intentionally independent of any concrete HTTP client or router.

pub mod directive;
pub mod errors;
pub mod headers;
pub mod pool;

pub use directive::{Directives, RotationPolicy, parse_directives};
pub use errors::{ProviderError, ProviderResult, synthetic_rate_limit_body};
pub use headers::{Headers, header_get, header_remove, header_set};
pub use pool::{KeyPool, RequestKeyContext};
