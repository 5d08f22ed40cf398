//! Shared config value types (C1): a read-only snapshot of providers, access
//! keys, admin password and bind port, as produced by an external loader.
//!
//! This crate intentionally knows nothing about HTTP, key rotation, or the
//! directive grammar — it is the narrow interface the core consumes from
//! whatever reads `config.json` / env / CLI flags.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("provider at index {0} has an empty name")]
    EmptyProviderName(usize),
    #[error("duplicate provider name: {0}")]
    DuplicateProvider(String),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The credential-passing convention for a provider's upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    OpenAi,
    Gemini,
}

impl Flavor {
    pub fn as_str(self) -> &'static str {
        match self {
            Flavor::OpenAi => "openai",
            Flavor::Gemini => "gemini",
        }
    }
}

/// Immutable per-provider configuration, as loaded from `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDef {
    pub name: String,
    pub flavor: Flavor,
    pub keys: Vec<String>,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// Raw config shape as read from the file on disk.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub providers: Vec<ProviderDef>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub admin_password: Option<String>,
}

impl ConfigFile {
    /// Read and parse a config file from disk. No format beyond "JSON
    /// matching this shape" is prescribed by the core (spec §6) — this is
    /// one reasonable external loader, not the only valid one.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// A validated, immutable snapshot of the whole configuration. Produced once
/// per load/reload and shared behind an `ArcSwap` by `gproxy-core`'s bootstrap.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub providers: Arc<Vec<ProviderDef>>,
    pub host: String,
    pub port: u16,
    pub admin_password: String,
}

impl ConfigSnapshot {
    pub fn from_file(file: ConfigFile, admin_password: String) -> Result<Self, ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for (index, provider) in file.providers.iter().enumerate() {
            if provider.name.trim().is_empty() {
                return Err(ConfigError::EmptyProviderName(index));
            }
            let lower = provider.name.to_ascii_lowercase();
            if !seen.insert(lower) {
                return Err(ConfigError::DuplicateProvider(provider.name.clone()));
            }
        }

        Ok(Self {
            providers: Arc::new(file.providers),
            host: file.host.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: file.port.unwrap_or(8787),
            admin_password,
        })
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderDef> {
        self.providers
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(name: &str) -> ProviderDef {
        ProviderDef {
            name: name.to_string(),
            flavor: Flavor::OpenAi,
            keys: vec!["k1".to_string()],
            base_url: "https://api.example.com".to_string(),
            access_key: None,
            default_model: None,
        }
    }

    #[test]
    fn rejects_duplicate_provider_names_case_insensitively() {
        let file = ConfigFile {
            providers: vec![provider("Foo"), provider("foo")],
            ..Default::default()
        };
        let err = ConfigSnapshot::from_file(file, "pw".to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateProvider(_)));
    }

    #[test]
    fn provider_lookup_is_case_insensitive() {
        let file = ConfigFile {
            providers: vec![provider("OpenAI")],
            ..Default::default()
        };
        let snapshot = ConfigSnapshot::from_file(file, "pw".to_string()).unwrap();
        assert!(snapshot.provider("openai").is_some());
        assert!(snapshot.provider("OPENAI").is_some());
        assert!(snapshot.provider("other").is_none());
    }
}
