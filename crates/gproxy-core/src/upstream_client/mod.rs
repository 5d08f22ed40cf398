//! C4: executes one HTTP attempt against an upstream with a chosen key, and
//! iterates attempts under a rotation policy until success, exhaustion, or a
//! terminal network error.
//!
//! Mirrors the teacher's `WreqUpstreamClient` (a cached-per-proxy `wreq`
//! client behind an `Arc`) but drops streaming: responses are proxied as
//! opaque, fully-buffered byte bodies per spec §4.3.1.

mod url;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use gproxy_common::Flavor;
use gproxy_provider_core::{
    Headers, KeyPool, RotationPolicy, header_get, header_remove, header_set,
    synthetic_rate_limit_body,
};
use http::Method;
use wreq::Client;

pub use url::build_attempt_url;

/// One collected upstream response: status, headers, and the full body.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

/// Terminal outcomes of a rotation loop (spec §4.3, §4.7).
#[derive(Debug)]
pub enum RotationOutcome {
    Success(UpstreamResponse),
    RateLimitedAllKeys(UpstreamResponse),
    NetworkFailure(anyhow::Error),
    EmptyPool,
}

/// Owns a provider's key pool and upstream base URL; executes the rotation
/// loop described in spec §4.3.
pub struct UpstreamClient {
    pool: Arc<KeyPool>,
    base_url: String,
    flavor: Flavor,
    http: Client,
}

impl UpstreamClient {
    pub fn new(pool: Arc<KeyPool>, base_url: String, flavor: Flavor) -> Result<Self, wreq::Error> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            pool,
            base_url,
            flavor,
            http,
        })
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// `makeRequest` from spec §4.3.
    pub async fn make_request(
        &self,
        method: Method,
        path: &str,
        body: Bytes,
        mut headers: Headers,
        rotation_codes: Option<RotationPolicy>,
    ) -> RotationOutcome {
        // Client-supplied key bypass: Gemini flavor only. Rotation is
        // disabled and the request is sent exactly once.
        if self.flavor == Flavor::Gemini
            && let Some(key) = header_remove(&mut headers, "x-goog-api-key")
        {
            return match self
                .one_attempt(&method, path, &body, headers, &key, true)
                .await
            {
                Ok(resp) => RotationOutcome::Success(resp),
                Err(err) => RotationOutcome::NetworkFailure(err),
            };
        }

        if self.pool.is_empty() {
            return RotationOutcome::EmptyPool;
        }

        let rotation_codes = rotation_codes.unwrap_or_default();
        let mut ctx = self.pool.new_context().await;
        let mut last_response: Option<UpstreamResponse> = None;
        let mut last_error: Option<anyhow::Error> = None;

        while let Some(key) = ctx.next_key() {
            match self
                .one_attempt(&method, path, &body, headers.clone(), &key, false)
                .await
            {
                Err(err) => {
                    last_error = Some(err);
                }
                Ok(resp) => {
                    if rotation_codes.contains(resp.status) {
                        ctx.mark_rate_limited(&key);
                        last_response = Some(resp);
                    } else {
                        self.pool
                            .update_last_failed_key(ctx.last_failed_in_request())
                            .await;
                        return RotationOutcome::Success(resp);
                    }
                }
            }
        }

        self.pool
            .update_last_failed_key(ctx.last_failed_in_request())
            .await;

        if ctx.all_tried_are_rate_limited() {
            return RotationOutcome::RateLimitedAllKeys(last_response.unwrap_or_else(|| {
                UpstreamResponse {
                    status: 429,
                    headers: vec![("content-type".to_string(), "application/json".to_string())],
                    body: synthetic_rate_limit_body(self.flavor),
                }
            }));
        }
        if let Some(err) = last_error {
            return RotationOutcome::NetworkFailure(err);
        }
        RotationOutcome::NetworkFailure(anyhow::anyhow!(
            "rotation loop exhausted without a clear error"
        ))
    }

    async fn one_attempt(
        &self,
        method: &Method,
        path: &str,
        body: &Bytes,
        mut headers: Headers,
        key: &str,
        bypass: bool,
    ) -> anyhow::Result<UpstreamResponse> {
        let url = build_attempt_url(&self.base_url, path, self.flavor, key, bypass);

        match self.flavor {
            Flavor::OpenAi => {
                if header_get(&headers, "authorization").is_none() {
                    header_set(&mut headers, "Authorization", format!("Bearer {key}"));
                }
            }
            Flavor::Gemini if bypass => {
                header_set(&mut headers, "x-goog-api-key", key);
            }
            Flavor::Gemini => {
                // Rotation path: the key already travels in the URL query
                // string (see `build_attempt_url`).
            }
        }

        if header_get(&headers, "content-type").is_none() {
            header_set(&mut headers, "Content-Type", "application/json");
        }
        if !body.is_empty() && *method != Method::GET {
            header_set(&mut headers, "Content-Length", body.len().to_string());
        }

        let wreq_method = wreq::Method::from_bytes(method.as_str().as_bytes())?;
        let mut builder = self.http.request(wreq_method, url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !body.is_empty() {
            builder = builder.body(body.clone());
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let out_headers = headers_from_wreq(resp.headers());
        let out_body = resp.bytes().await?;
        Ok(UpstreamResponse {
            status,
            headers: out_headers,
            body: out_body,
        })
    }
}

fn headers_from_wreq(map: &wreq::header::HeaderMap) -> Headers {
    let mut out = Vec::with_capacity(map.len());
    for (name, value) in map {
        if let Ok(value) = value.to_str() {
            out.push((name.as_str().to_string(), value.to_string()));
        }
    }
    out
}
