//! C7: the proxy dispatcher. Glues the route resolver (C5), the directive
//! parser and access check (C6), and the upstream client's rotation loop
//! (C4); copies the upstream's status/headers/body back to the client
//! unchanged on success.

use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes as AxumBytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use gproxy_common::Flavor;
use gproxy_provider_core::{Headers, header_set, parse_directives};
use tracing::Instrument;

use crate::core::CoreState;
use crate::error::DispatchError;
use crate::route::{Route, resolve_route};
use crate::upstream_client::RotationOutcome;

/// Header the dispatcher echoes back on every response so a client (or its
/// operator) can correlate a request with the proxy's own logs.
const REQUEST_ID_HEADER: &str = "x-gproxy-request-id";

const OPENAI_FORWARD_WHITELIST: &[&str] = &[
    "content-type",
    "accept",
    "user-agent",
    "openai-organization",
    "openai-project",
];
const GEMINI_FORWARD_WHITELIST: &[&str] =
    &["content-type", "accept", "user-agent", "x-goog-user-project"];

/// Headers that describe a specific hop's transport framing rather than the
/// payload; stripped both from the inbound whitelist and the outbound
/// passthrough so they don't fight axum's own framing.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
    "proxy-authenticate",
    "proxy-authorization",
];

pub async fn proxy_handler(
    State(state): State<Arc<CoreState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: AxumBytes,
) -> Response {
    let trace_id = uuid::Uuid::new_v4();
    let started = Instant::now();
    let span = tracing::info_span!(
        "proxy_request",
        trace_id = %trace_id,
        method = %method,
        path = %uri.path(),
        provider = tracing::field::Empty,
    );
    let mut response = match dispatch(&state, method, &uri, &headers, body)
        .instrument(span.clone())
        .await
    {
        Ok(response) => response,
        Err(err) => {
            let _enter = span.enter();
            tracing::warn!(status = err.status().as_u16(), kind = ?err.kind, "dispatch failed");
            error_response(&err)
        }
    };

    let _enter = span.enter();
    tracing::info!(
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "proxy_request complete"
    );
    if let Ok(value) = HeaderValue::from_str(&trace_id.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

async fn dispatch(
    state: &CoreState,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: AxumBytes,
) -> Result<Response, DispatchError> {
    let snapshot = state.config.load_full();

    let route = resolve_route(uri.path(), uri.query(), &snapshot)
        .ok_or_else(|| DispatchError::invalid_route("Invalid API path"))?;
    tracing::Span::current().record("provider", tracing::field::display(&route.provider));

    let provider_def = snapshot.provider(&route.provider);
    let flavor = flavor_for_route(&route, provider_def.map(|p| p.flavor));

    let (header_name, header_name_str) = match flavor {
        Flavor::OpenAi => (axum::http::header::AUTHORIZATION, "authorization"),
        Flavor::Gemini => (HeaderName::from_static("x-goog-api-key"), "x-goog-api-key"),
    };
    let raw_auth = headers
        .get(&header_name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let directives = parse_directives(raw_auth);

    if let Some(configured) = provider_def.and_then(|p| p.access_key.as_deref())
        && directives.access_key.as_deref() != Some(configured)
    {
        return Err(DispatchError::access_denied(
            "Missing or invalid access key",
        ));
    }

    let client = state
        .client_for(&route.provider)
        .await?
        .ok_or_else(|| DispatchError::provider_not_configured("Provider not configured"))?;

    let forwarded = forward_headers(headers, flavor, header_name_str, directives.cleaned_header);

    let outcome = client
        .make_request(
            method,
            &route.upstream_path,
            body.into(),
            forwarded,
            directives.rotation_codes,
        )
        .await;

    match outcome {
        RotationOutcome::Success(resp) => Ok(build_response(resp.status, resp.headers, resp.body)),
        RotationOutcome::RateLimitedAllKeys(resp) => {
            // Spec §7: always surfaced as 429, carrying the last upstream
            // body (or the synthetic one) regardless of the rotation code
            // that actually triggered exhaustion.
            Ok(build_response(429, resp.headers, resp.body))
        }
        RotationOutcome::EmptyPool => Err(DispatchError::provider_not_configured(
            "Provider not configured",
        )),
        RotationOutcome::NetworkFailure(err) => {
            Err(DispatchError::transport_failure(err.to_string()))
        }
    }
}

fn flavor_for_route(route: &Route, configured: Option<Flavor>) -> Flavor {
    configured.unwrap_or_else(|| {
        if route.provider.eq_ignore_ascii_case("gemini") {
            Flavor::Gemini
        } else {
            Flavor::OpenAi
        }
    })
}

fn forward_headers(
    headers: &HeaderMap,
    flavor: Flavor,
    credential_header_name: &str,
    cleaned_auth: Option<String>,
) -> Headers {
    let whitelist = match flavor {
        Flavor::OpenAi => OPENAI_FORWARD_WHITELIST,
        Flavor::Gemini => GEMINI_FORWARD_WHITELIST,
    };

    let mut out: Headers = Vec::new();
    for name in whitelist {
        if HOP_BY_HOP.contains(name) {
            continue;
        }
        if let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) {
            out.push((name.to_string(), value.to_string()));
        }
    }

    if let Some(cleaned) = cleaned_auth {
        header_set(&mut out, credential_header_name, cleaned);
    }

    out
}

fn build_response(status: u16, headers: Headers, body: bytes::Bytes) -> Response {
    let mut builder = axum::http::Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY));
    for (name, value) in headers {
        let lower = name.to_ascii_lowercase();
        if HOP_BY_HOP.contains(&lower.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            builder = builder.header(name, value);
        }
    }
    builder
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn error_response(err: &DispatchError) -> Response {
    (
        err.status(),
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        err.body(),
    )
        .into_response()
}
