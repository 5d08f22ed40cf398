//! URL construction for one upstream attempt (spec §4.3.1): base/path
//! joining, the Gemini version-segment reconciliation, and the
//! rotation-path `?key=` query parameter.

use gproxy_common::Flavor;

/// Build the URL for one attempt against `base_url` with `path` (which may
/// carry its own `?query`), attaching `key` per flavor/bypass rules.
pub fn build_attempt_url(base_url: &str, path: &str, flavor: Flavor, key: &str, bypass: bool) -> String {
    let (path, query) = match path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path, None),
    };

    let (base, path) = reconcile_gemini_version(base_url, path);

    let mut url = if path.is_empty() || path == "/" {
        base
    } else {
        format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
    };

    let mut query_parts: Vec<String> = Vec::new();
    if let Some(q) = query
        && !q.is_empty()
    {
        query_parts.push(q.to_string());
    }
    if flavor == Flavor::Gemini && !bypass {
        query_parts.push(format!("key={}", urlencoding::encode(key)));
    }
    if !query_parts.is_empty() {
        url.push('?');
        url.push_str(&query_parts.join("&"));
    }
    url
}

/// If `path` begins with `/v<segment>/` and `base_url` ends with a different
/// `/v<segment>`, move the path's version onto the base and strip it from
/// the path. Lets a client pinned to `baseUrl=.../v1` reach `/v1beta/...`.
fn reconcile_gemini_version(base_url: &str, path: &str) -> (String, String) {
    let base = base_url.trim_end_matches('/').to_string();
    let Some(path_version) = leading_version_segment(path) else {
        return (base, path.to_string());
    };
    let Some(base_version) = trailing_version_segment(&base) else {
        return (base, path.to_string());
    };
    if path_version == base_version {
        return (base, path.to_string());
    }

    let base_without_version = base
        .strip_suffix(&format!("/{base_version}"))
        .unwrap_or(&base);
    let new_base = format!("{base_without_version}/{path_version}");
    let new_path = path
        .strip_prefix(&format!("/{path_version}"))
        .unwrap_or(path)
        .to_string();
    (new_base, new_path)
}

fn leading_version_segment(path: &str) -> Option<String> {
    let trimmed = path.strip_prefix('/')?;
    let (segment, _rest) = trimmed.split_once('/')?;
    is_version_segment(segment).then(|| segment.to_string())
}

fn trailing_version_segment(base: &str) -> Option<String> {
    let segment = base.rsplit('/').next()?;
    is_version_segment(segment).then(|| segment.to_string())
}

fn is_version_segment(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().next().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_and_path_with_exactly_one_slash() {
        let url = build_attempt_url(
            "https://api.openai.com/v1",
            "/chat/completions",
            Flavor::OpenAi,
            "sk-abc",
            false,
        );
        assert_eq!(url, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn empty_path_targets_the_base_url_itself() {
        let url = build_attempt_url("https://api.openai.com/v1", "", Flavor::OpenAi, "k", false);
        assert_eq!(url, "https://api.openai.com/v1");
        let url = build_attempt_url("https://api.openai.com/v1", "/", Flavor::OpenAi, "k", false);
        assert_eq!(url, "https://api.openai.com/v1");
    }

    #[test]
    fn reconciles_gemini_version_segment_from_path_onto_base() {
        let url = build_attempt_url(
            "https://gen.googleapis.com/v1",
            "/v1beta/models/x:generateContent",
            Flavor::Gemini,
            "K",
            false,
        );
        assert_eq!(
            url,
            "https://gen.googleapis.com/v1beta/models/x:generateContent?key=K"
        );
    }

    #[test]
    fn gemini_rotation_path_appends_key_query_param() {
        let url = build_attempt_url(
            "https://gen.googleapis.com/v1",
            "/v1/models/x:generateContent",
            Flavor::Gemini,
            "K",
            false,
        );
        assert_eq!(
            url,
            "https://gen.googleapis.com/v1/models/x:generateContent?key=K"
        );
    }

    #[test]
    fn gemini_bypass_path_does_not_append_key_query_param() {
        let url = build_attempt_url(
            "https://gen.googleapis.com/v1",
            "/v1/models/x:generateContent",
            Flavor::Gemini,
            "K",
            true,
        );
        assert_eq!(url, "https://gen.googleapis.com/v1/models/x:generateContent");
    }

    #[test]
    fn preserves_existing_query_string_alongside_gemini_key() {
        let url = build_attempt_url(
            "https://gen.googleapis.com/v1",
            "/v1/models/x:streamGenerateContent?alt=sse",
            Flavor::Gemini,
            "K",
            false,
        );
        assert_eq!(
            url,
            "https://gen.googleapis.com/v1/models/x:streamGenerateContent?alt=sse&key=K"
        );
    }
}
