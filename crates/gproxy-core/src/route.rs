//! C5: parses a request URL into `(provider, upstream path)`, handling the
//! `/gemini/*` and `/openai/*` legacy aliases.

use gproxy_common::ConfigSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub provider: String,
    pub upstream_path: String,
    /// True when the route was resolved via the `/gemini/*` or `/openai/*`
    /// legacy alias rather than a configured provider name.
    pub legacy: bool,
}

/// Built-in provider names recognized by the legacy alias fallback.
pub const LEGACY_PROVIDERS: [&str; 2] = ["gemini", "openai"];

/// Paths the dispatcher recognizes but the core does not route: handled
/// entirely by the router layer (static assets, admin, health checks).
pub fn is_non_route(path: &str) -> bool {
    matches!(
        path,
        "/" | "/favicon.ico" | "/robots.txt" | "/healthz" | "/assets" | "/assets/"
    ) || path.starts_with("/admin")
        || path.starts_with("/assets/")
}

pub fn resolve_route(path: &str, query: Option<&str>, config: &ConfigSnapshot) -> Option<Route> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let (first, rest) = segments.split_first()?;

    let upstream_path = |rest: &[&str]| -> String {
        let joined = rest.join("/");
        let mut s = format!("/{joined}");
        if let Some(q) = query {
            if !q.is_empty() {
                s.push('?');
                s.push_str(q);
            }
        }
        s
    };

    if let Some(provider) = config.provider(first) {
        return Some(Route {
            provider: provider.name.clone(),
            upstream_path: upstream_path(rest),
            legacy: false,
        });
    }

    let lower = first.to_ascii_lowercase();
    if LEGACY_PROVIDERS.contains(&lower.as_str()) {
        return Some(Route {
            provider: lower,
            upstream_path: upstream_path(rest),
            legacy: true,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use gproxy_common::{ConfigFile, Flavor, ProviderDef};

    fn config_with(providers: Vec<ProviderDef>) -> ConfigSnapshot {
        ConfigSnapshot::from_file(
            ConfigFile {
                providers,
                ..Default::default()
            },
            "pw".into(),
        )
        .unwrap()
    }

    fn provider(name: &str) -> ProviderDef {
        ProviderDef {
            name: name.to_string(),
            flavor: Flavor::OpenAi,
            keys: vec!["k".into()],
            base_url: "https://example.com".into(),
            access_key: None,
            default_model: None,
        }
    }

    #[test]
    fn routes_to_a_configured_provider_case_insensitively() {
        let config = config_with(vec![provider("MyProvider")]);
        let route = resolve_route("/myprovider/v1/chat/completions", None, &config).unwrap();
        assert_eq!(route.provider, "MyProvider");
        assert_eq!(route.upstream_path, "/v1/chat/completions");
        assert!(!route.legacy);
    }

    #[test]
    fn falls_back_to_legacy_alias_when_unconfigured() {
        let config = config_with(vec![]);
        let route = resolve_route(
            "/gemini/v1beta/models/x:generateContent",
            Some("alt=sse"),
            &config,
        )
        .unwrap();
        assert_eq!(route.provider, "gemini");
        assert_eq!(
            route.upstream_path,
            "/v1beta/models/x:generateContent?alt=sse"
        );
        assert!(route.legacy);
    }

    #[test]
    fn configured_provider_named_gemini_wins_over_legacy_alias() {
        let config = config_with(vec![provider("gemini")]);
        let route = resolve_route("/gemini/v1/models", None, &config).unwrap();
        assert!(!route.legacy);
    }

    #[test]
    fn unknown_path_has_no_route() {
        let config = config_with(vec![]);
        assert!(resolve_route("/unknown/path", None, &config).is_none());
        assert!(resolve_route("/", None, &config).is_none());
    }
}
