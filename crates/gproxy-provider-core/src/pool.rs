//! C2 (key pool) and C3 (request key context): the per-provider key list with
//! its shared "last-failed-key" hint, and the per-request scratch state that
//! walks a shuffled attempt order over it.
//!
//! Mirrors the shape of the teacher's `CredentialPool` (an `ArcSwap`-backed
//! snapshot consumed by a single-threaded retry loop per request) but keeps
//! the spec's simpler single-hint heuristic instead of a weighted/disallow
//! model: one nullable `last_failed_key`, last-writer-wins.

use rand::seq::SliceRandom;
use tokio::sync::RwLock;

/// Owns the ordered key list for one provider and the cross-request
/// "last-failed-key" hint (C2).
#[derive(Debug)]
pub struct KeyPool {
    keys: Vec<String>,
    last_failed_key: RwLock<Option<String>>,
}

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            last_failed_key: RwLock::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Produce a fresh request context: a smart-shuffled copy of the key
    /// list with the pool's current last-failed hint deferred to the tail.
    pub async fn new_context(&self) -> RequestKeyContext {
        let hint = self.last_failed_key.read().await.clone();
        let attempt_order = smart_shuffle(&self.keys, hint.as_deref());
        RequestKeyContext::new(attempt_order)
    }

    /// Atomically set the pool's last-failed-key hint (last-writer-wins).
    pub async fn update_last_failed_key(&self, key: Option<String>) {
        *self.last_failed_key.write().await = key;
    }

    /// Read the pool's current last-failed-key hint. Exposed for admin
    /// introspection and tests; the rotation loop itself only ever reads it
    /// indirectly through `new_context`.
    pub async fn last_failed_key(&self) -> Option<String> {
        self.last_failed_key.read().await.clone()
    }
}

/// Fisher-Yates shuffle of `keys`, then move `hint` (if present in `keys`) to
/// the tail. Rationale: even load distribution per request, while the most
/// recently observed bad key is tried last so fresh failures don't re-penalize
/// it immediately.
fn smart_shuffle(keys: &[String], hint: Option<&str>) -> Vec<String> {
    let mut order = keys.to_vec();
    order.shuffle(&mut rand::rng());
    if let Some(hint) = hint
        && let Some(pos) = order.iter().position(|k| k == hint)
    {
        let demoted = order.remove(pos);
        order.push(demoted);
    }
    order
}

/// C3 state machine: `Open` while keys remain untried, `Exhausted` once every
/// key in `attempt_order` has been handed out. Single-threaded for the
/// lifetime of one client request; never shared between requests.
#[derive(Debug)]
pub struct RequestKeyContext {
    attempt_order: Vec<String>,
    cursor: usize,
    tried: std::collections::HashSet<String>,
    rate_limited: std::collections::HashSet<String>,
    last_failed_in_request: Option<String>,
}

impl RequestKeyContext {
    fn new(attempt_order: Vec<String>) -> Self {
        Self {
            attempt_order,
            cursor: 0,
            tried: std::collections::HashSet::new(),
            rate_limited: std::collections::HashSet::new(),
            last_failed_in_request: None,
        }
    }

    /// Return the next untried key in `attempt_order`, or `None` once every
    /// key has been tried. Never re-hands out a key already in `tried`.
    pub fn next_key(&mut self) -> Option<String> {
        if self.attempt_order.is_empty() {
            return None;
        }
        if self.tried.len() == self.attempt_order.len() {
            return None;
        }
        let len = self.attempt_order.len();
        for _ in 0..len {
            let candidate = self.attempt_order[self.cursor].clone();
            self.cursor = (self.cursor + 1) % len;
            if !self.tried.contains(&candidate) {
                self.tried.insert(candidate.clone());
                return Some(candidate);
            }
        }
        None
    }

    /// Mark `key` (already returned by `next_key`) as having hit a rotation
    /// code. Records it as the request's last-failed key.
    pub fn mark_rate_limited(&mut self, key: &str) {
        debug_assert!(self.tried.contains(key), "marking an untried key");
        self.rate_limited.insert(key.to_string());
        self.last_failed_in_request = Some(key.to_string());
    }

    pub fn all_tried_are_rate_limited(&self) -> bool {
        !self.tried.is_empty() && self.rate_limited.len() == self.tried.len()
    }

    pub fn last_failed_in_request(&self) -> Option<String> {
        self.last_failed_in_request.clone()
    }

    /// The shuffled key order this context will walk. Exposed for tests and
    /// admin introspection; the rotation loop only ever drives it via
    /// `next_key`.
    pub fn attempt_order(&self) -> &[String] {
        &self.attempt_order
    }
}
