//! C6: extracts in-band `[STATUS_CODES:...]` / `[ACCESS_KEY:...]` directives
//! from a client's auth header, and cleans the header for forwarding upstream.
//!
//! One parsing pass returns `(cleaned_header, rotation_codes, access_key)`
//! rather than three separate regex traversals — the grammar is a flat
//! bracketed-term list, so a single scan suffices.

use std::collections::BTreeSet;

const MIN_STATUS: u16 = 100;
const MAX_STATUS: u16 = 599;

/// Rotation policy: a set of HTTP status codes that trigger a key-rotation
/// retry. Defaults to `{429}` when the client didn't specify one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy(BTreeSet<u16>);

impl Default for RotationPolicy {
    fn default() -> Self {
        Self(BTreeSet::from([429]))
    }
}

impl RotationPolicy {
    /// Build a policy directly from a set of status codes, bypassing the
    /// header grammar. Useful for callers that already have a concrete code
    /// set (tests, or a future non-header configuration source).
    pub fn from_codes(codes: impl IntoIterator<Item = u16>) -> Self {
        Self(codes.into_iter().collect())
    }

    pub fn contains(&self, status: u16) -> bool {
        self.0.contains(&status)
    }

    pub fn codes(&self) -> impl Iterator<Item = &u16> {
        self.0.iter()
    }
}

/// The result of extracting directives from one auth header value.
#[derive(Debug, Clone, Default)]
pub struct Directives {
    pub cleaned_header: Option<String>,
    pub rotation_codes: Option<RotationPolicy>,
    pub access_key: Option<String>,
}

/// Extract `[STATUS_CODES:...]` and `[ACCESS_KEY:...]` directives from an
/// auth header value, returning the directives plus the header with those
/// brackets removed. If what remains is exactly `Bearer` or `Bearer ` the
/// cleaned header is dropped entirely so the upstream client can attach its
/// own credential.
pub fn parse_directives(raw: &str) -> Directives {
    let mut rotation_codes: Option<RotationPolicy> = None;
    let mut access_key: Option<String> = None;
    let mut remainder = String::with_capacity(raw.len());

    let mut rest = raw;
    while let Some(open) = rest.find('[') {
        remainder.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find(']') else {
            // Unterminated bracket: not a directive, keep it verbatim.
            remainder.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let inner = &after_open[..close];
        if let Some(spec) = inner.strip_prefix("STATUS_CODES:") {
            rotation_codes = parse_status_code_spec(spec);
        } else if let Some(value) = inner.strip_prefix("ACCESS_KEY:") {
            access_key = Some(value.to_string());
        } else {
            // Unknown directive: keep verbatim so the grammar stays
            // extensible without silently eating unrelated brackets.
            remainder.push('[');
            remainder.push_str(inner);
            remainder.push(']');
        }
        rest = &after_open[close + 1..];
    }
    remainder.push_str(rest);

    let trimmed = remainder.trim();
    let cleaned_header = if trimmed.is_empty() || trimmed == "Bearer" || trimmed == "Bearer " {
        None
    } else {
        Some(trimmed.to_string())
    };

    Directives {
        cleaned_header,
        rotation_codes,
        access_key,
    }
}

/// `spec := term ("," term)*`, `term := INT | INT "-" INT | INT "+" | INT "=+"`.
/// Non-integer terms are silently skipped. Empty/all-invalid -> `None`.
fn parse_status_code_spec(spec: &str) -> Option<RotationPolicy> {
    let mut codes = BTreeSet::new();
    for term in spec.split(',') {
        let term = term.trim();
        if term.is_empty() {
            continue;
        }
        if let Some(prefix) = term.strip_suffix("=+") {
            if let Ok(n) = prefix.trim().parse::<i64>() {
                extend_range(&mut codes, n, MAX_STATUS as i64);
            }
            continue;
        }
        if let Some(prefix) = term.strip_suffix('+') {
            if let Ok(n) = prefix.trim().parse::<i64>() {
                extend_range(&mut codes, n + 1, MAX_STATUS as i64);
            }
            continue;
        }
        if let Some((a, b)) = term.split_once('-') {
            if let (Ok(a), Ok(b)) = (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
                extend_range(&mut codes, a, b);
            }
            continue;
        }
        if let Ok(n) = term.parse::<i64>() {
            extend_range(&mut codes, n, n);
        }
    }
    if codes.is_empty() {
        None
    } else {
        Some(RotationPolicy(codes))
    }
}

fn extend_range(codes: &mut BTreeSet<u16>, from: i64, to: i64) {
    let from = from.max(MIN_STATUS as i64);
    let to = to.min(MAX_STATUS as i64);
    if from > to {
        return;
    }
    for code in from..=to {
        codes.insert(code as u16);
    }
}
