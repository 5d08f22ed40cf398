use bytes::Bytes;
use gproxy_common::Flavor;

/// Internal errors surfaced by the key pool and rotation loop (C2/C3/C4).
///
/// These never reach a client directly; `gproxy-core`'s dispatcher maps them
/// onto the client-visible envelope described in spec §7.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("provider has no configured keys")]
    EmptyPool,
    #[error("all keys were rate limited for this request")]
    RotationExhausted,
    #[error("upstream transport error: {0}")]
    Transport(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// The synthetic body a rotation loop returns when every key in the pool was
/// rate limited and no upstream response body is available to pass through
/// instead (spec §6, "Synthetic exhaustion responses").
pub fn synthetic_rate_limit_body(flavor: Flavor) -> Bytes {
    match flavor {
        Flavor::OpenAi => Bytes::from_static(
            br#"{"error":{"message":"All OpenAI API keys have been rate limited for this request","type":"rate_limit_exceeded","code":"rate_limit_exceeded"}}"#,
        ),
        Flavor::Gemini => Bytes::from_static(
            br#"{"error":{"code":429,"message":"All API keys have been rate limited for this request","status":"RESOURCE_EXHAUSTED"}}"#,
        ),
    }
}
