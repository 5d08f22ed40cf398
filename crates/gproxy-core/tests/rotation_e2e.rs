//! Literal end-to-end scenarios against a real loopback HTTP server, rather
//! than a mock: the rotation loop (C4) is exercised exactly as it will run
//! in production, over an actual TCP/TLS-free connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use bytes::Bytes as CoreBytes;
use gproxy_common::Flavor;
use gproxy_core::upstream_client::{RotationOutcome, UpstreamClient};
use gproxy_provider_core::{KeyPool, RotationPolicy};
use http::Method;

/// Spawns a throwaway axum server on an OS-assigned loopback port and
/// returns its base URL. The handler is whatever the caller supplies.
async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn scenario_1_first_attempt_succeeds_no_rotation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app_calls = calls.clone();
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |_headers: HeaderMap, _body: Bytes| {
            let calls = app_calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                (StatusCode::OK, "{\"ok\":true}")
            }
        }),
    );
    let base = spawn(app).await;

    let pool = Arc::new(KeyPool::new(vec!["k1".into(), "k2".into(), "k3".into()]));
    pool.update_last_failed_key(Some("k2".to_string())).await;
    let client = UpstreamClient::new(pool.clone(), base, Flavor::OpenAi).unwrap();

    let outcome = client
        .make_request(
            Method::POST,
            "/v1/chat/completions",
            CoreBytes::new(),
            vec![],
            None,
        )
        .await;

    match outcome {
        RotationOutcome::Success(resp) => {
            assert_eq!(resp.status, 200);
            assert_eq!(resp.body.as_ref(), b"{\"ok\":true}");
        }
        other => panic!("expected Success, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(pool.last_failed_key().await, None);
}

#[tokio::test]
async fn scenario_2_all_keys_rate_limited_returns_last_upstream_body() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app_calls = calls.clone();
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |_headers: HeaderMap, _body: Bytes| {
            let calls = app_calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    format!("{{\"attempt\":{n}}}"),
                )
            }
        }),
    );
    let base = spawn(app).await;

    let pool = Arc::new(KeyPool::new(vec!["k1".into(), "k2".into()]));
    let client = UpstreamClient::new(pool.clone(), base, Flavor::OpenAi).unwrap();

    let outcome = client
        .make_request(
            Method::POST,
            "/v1/chat/completions",
            CoreBytes::new(),
            vec![],
            None,
        )
        .await;

    match outcome {
        RotationOutcome::RateLimitedAllKeys(resp) => {
            assert_eq!(resp.status, 429);
            assert_eq!(resp.body.as_ref(), b"{\"attempt\":1}");
        }
        other => panic!("expected RateLimitedAllKeys, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let last_failed = pool.last_failed_key().await;
    assert!(last_failed == Some("k1".to_string()) || last_failed == Some("k2".to_string()));
}

#[tokio::test]
async fn scenario_3_custom_rotation_codes_recover_on_second_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app_calls = calls.clone();
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, _body: Bytes| {
            let calls = app_calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                assert_eq!(
                    headers.get("authorization").and_then(|v| v.to_str().ok()),
                    Some("Bearer sk-abc")
                );
                if n == 0 {
                    (StatusCode::SERVICE_UNAVAILABLE, "{}")
                } else {
                    (StatusCode::OK, "{\"done\":true}")
                }
            }
        }),
    );
    let base = spawn(app).await;

    let pool = Arc::new(KeyPool::new(vec!["k1".into(), "k2".into()]));
    let client = UpstreamClient::new(pool, base, Flavor::OpenAi).unwrap();

    let headers = vec![("authorization".to_string(), "Bearer sk-abc".to_string())];
    let rotation_codes = RotationPolicy::from_codes([500, 502, 503, 504]);
    let outcome = client
        .make_request(
            Method::POST,
            "/v1/chat/completions",
            CoreBytes::new(),
            headers,
            Some(rotation_codes),
        )
        .await;

    match outcome {
        RotationOutcome::Success(resp) => assert_eq!(resp.status, 200),
        other => panic!("expected Success, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn scenario_6_large_body_is_forwarded_byte_identical_with_content_length() {
    let body: Vec<u8> = vec![b'x'; 1024 * 1024];
    let expected_len = body.len();
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, got: Bytes| {
            let expected = body.clone();
            async move {
                assert_eq!(
                    headers
                        .get("content-length")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<usize>().ok()),
                    Some(expected_len)
                );
                assert_eq!(
                    headers.get("content-type").and_then(|v| v.to_str().ok()),
                    Some("application/json")
                );
                assert_eq!(got.as_ref(), expected.as_slice());
                (StatusCode::OK, "{}")
            }
        }),
    );
    let base = spawn(app).await;

    let pool = Arc::new(KeyPool::new(vec!["k1".into()]));
    let client = UpstreamClient::new(pool, base, Flavor::OpenAi).unwrap();

    let outcome = client
        .make_request(
            Method::POST,
            "/v1/chat/completions",
            CoreBytes::from(vec![b'x'; 1024 * 1024]),
            vec![],
            None,
        )
        .await;

    assert!(matches!(outcome, RotationOutcome::Success(_)));
}

#[tokio::test]
async fn empty_pool_is_provider_not_configured_without_any_network_call() {
    let pool = Arc::new(KeyPool::new(vec![]));
    let client =
        UpstreamClient::new(pool, "http://127.0.0.1:1".to_string(), Flavor::OpenAi).unwrap();
    let outcome = client
        .make_request(
            Method::POST,
            "/v1/chat/completions",
            CoreBytes::new(),
            vec![],
            None,
        )
        .await;
    assert!(matches!(outcome, RotationOutcome::EmptyPool));
}
