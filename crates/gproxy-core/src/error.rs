//! Client-visible error envelope (spec §6, §7): the dispatcher's error kinds
//! and their mapping onto an HTTP status plus a JSON body.

use bytes::Bytes;
use http::StatusCode;
use serde_json::json;

/// One of the dispatcher-level error kinds from spec §7. Never constructed
/// for a successful or rotation-exhausted upstream response — those are
/// handled directly by the handler from the rotation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchErrorKind {
    InvalidRoute,
    AccessDenied,
    ProviderNotConfigured,
    TransportFailure,
    InternalError,
}

#[derive(Debug)]
pub struct DispatchError {
    pub kind: DispatchErrorKind,
    pub message: String,
}

impl DispatchError {
    pub fn new(kind: DispatchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_route(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::InvalidRoute, message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::AccessDenied, message)
    }

    pub fn provider_not_configured(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::ProviderNotConfigured, message)
    }

    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::TransportFailure, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::InternalError, message)
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            DispatchErrorKind::InvalidRoute => StatusCode::BAD_REQUEST,
            DispatchErrorKind::AccessDenied => StatusCode::UNAUTHORIZED,
            DispatchErrorKind::ProviderNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            DispatchErrorKind::TransportFailure | DispatchErrorKind::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn envelope_status(&self) -> &'static str {
        match self.kind {
            DispatchErrorKind::InvalidRoute | DispatchErrorKind::AccessDenied => "INVALID_ARGUMENT",
            DispatchErrorKind::ProviderNotConfigured
            | DispatchErrorKind::TransportFailure
            | DispatchErrorKind::InternalError => "INTERNAL",
        }
    }

    /// The `{"error":{"code":<n>,"message":<m>,"status":"..."}}` envelope
    /// from spec §6.
    pub fn body(&self) -> Bytes {
        let body = json!({
            "error": {
                "code": self.status().as_u16(),
                "message": self.message,
                "status": self.envelope_status(),
            }
        });
        Bytes::from(serde_json::to_vec(&body).unwrap_or_default())
    }
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DispatchError {}
