use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::headers::{AuthConfig, DEFAULT_AUTH_HEADER};
use crate::normalize::{lookup_path, select_first_bool, select_first_string};

pub const DEFAULT_API_BASE_URL: &str = "/api";
pub const DEFAULT_CONFIG_URL: &str = "/api/config";

/// Top-level remote config keys consumed by [`map_backend_config`]. Anything
/// else is kept under `extras`.
const KNOWN_CONFIG_KEYS: &[&str] = &[
    "apiBaseUrl",
    "api_base_url",
    "api_baseUrl",
    "baseUrl",
    "base_url",
    "FEATURE_USE_BACKEND",
    "featureUseBackend",
    "features",
    "featureFlags",
    "flags",
    "auth",
    "authentication",
    "headers",
    "defaultHeaders",
    "staticHeaders",
];

/// Where the adapter runs. A `LocalFile` context has no origin to fetch the
/// remote config from, so `load_config` leaves state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeContext {
    #[default]
    Network,
    LocalFile,
}

/// Construction-time settings for a [`crate::BackendAdapter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterOptions {
    /// Initial value of the backend feature flag.
    pub enabled: bool,
    pub api_base_url: String,
    pub config_url: String,
    pub runtime: RuntimeContext,
    /// Takes precedence over any configured token. Meant for tests and demos.
    pub test_bearer_token: Option<String>,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            config_url: DEFAULT_CONFIG_URL.to_string(),
            runtime: RuntimeContext::Network,
            test_bearer_token: None,
        }
    }
}

impl AdapterOptions {
    /// Reads `FEATURE_USE_BACKEND`, `TEST_BEARER_TOKEN`, `BACKEND_CONFIG_URL`
    /// and `API_BASE_URL` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(enabled) = lookup("FEATURE_USE_BACKEND").and_then(|v| parse_flag(&v)) {
            options.enabled = enabled;
        }
        if let Some(token) = lookup("TEST_BEARER_TOKEN").filter(|v| !v.trim().is_empty()) {
            options.test_bearer_token = Some(token.trim().to_string());
        }
        if let Some(url) = lookup("BACKEND_CONFIG_URL").filter(|v| !v.trim().is_empty()) {
            options.config_url = url.trim().to_string();
        }
        if let Some(url) = lookup("API_BASE_URL").filter(|v| !v.trim().is_empty()) {
            options.api_base_url = url.trim().to_string();
        }
        options
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Mutable adapter state. Written at construction and by `load_config`,
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub api_base_url: String,
    pub auth: AuthConfig,
    pub static_headers: BTreeMap<String, String>,
    pub extras: Map<String, Value>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth: AuthConfig::default(),
            static_headers: BTreeMap::new(),
            extras: Map::new(),
        }
    }
}

impl AdapterConfig {
    /// Partial merge: only fields present in `mapped` change. Auth is merged
    /// key by key; static headers and extras are replaced wholesale.
    pub fn apply(&mut self, mapped: MappedConfig) {
        if let Some(url) = mapped.api_base_url {
            self.api_base_url = url;
        }
        if let Some(auth) = mapped.auth {
            self.auth.merge(auth);
        }
        if let Some(headers) = mapped.static_headers {
            self.static_headers = headers;
        }
        if let Some(extras) = mapped.extras {
            self.extras = extras;
        }
    }
}

/// What the adapter reports after a config load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub enabled: bool,
    pub api_base_url: String,
}

/// The recognized parts of a remote config document. `None` means "not
/// present, keep what you have".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedConfig {
    pub api_base_url: Option<String>,
    pub feature_use_backend: Option<bool>,
    pub auth: Option<AuthConfig>,
    pub static_headers: Option<BTreeMap<String, String>>,
    pub extras: Option<Map<String, Value>>,
}

/// Normalizes a remote config document, tolerating the naming variants
/// different backends use.
pub fn map_backend_config(raw: &Value) -> MappedConfig {
    if !raw.is_object() {
        debug!("Remote config is not a JSON object; ignoring");
        return MappedConfig::default();
    }

    let api_base_url = select_first_string([
        raw.get("apiBaseUrl"),
        raw.get("api_base_url"),
        raw.get("api_baseUrl"),
        lookup_path(raw, &["api", "baseUrl"]),
        lookup_path(raw, &["api", "base_url"]),
        lookup_path(raw, &["api", "url"]),
        raw.get("baseUrl"),
        raw.get("base_url"),
    ]);

    let feature_use_backend = select_first_bool([
        raw.get("FEATURE_USE_BACKEND"),
        raw.get("featureUseBackend"),
        lookup_path(raw, &["features", "useBackend"]),
        lookup_path(raw, &["featureFlags", "useBackend"]),
        lookup_path(raw, &["flags", "useBackend"]),
    ]);

    let auth = Some(map_auth(raw)).filter(|auth| !auth.is_empty());
    let static_headers = map_static_headers(raw).filter(|headers| !headers.is_empty());
    let extras = Some(extract_extras(raw)).filter(|extras| !extras.is_empty());

    MappedConfig {
        api_base_url,
        feature_use_backend,
        auth,
        static_headers,
        extras,
    }
}

fn map_auth(raw: &Value) -> AuthConfig {
    let empty = Value::Object(Map::new());
    let block = ["auth", "authentication"]
        .iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| value.is_object())
        .unwrap_or(&empty);

    let token = select_first_string([
        block.get("token"),
        block.get("accessToken"),
        block.get("bearerToken"),
        raw.get("bearerToken"),
        raw.get("token"),
        raw.get("apiKey"),
        raw.get("api_key"),
        raw.get("key"),
    ]);
    let header = select_first_string([
        block.get("header"),
        block.get("headerName"),
        block.get("header_name"),
        block.get("name"),
        block.get("key"),
    ])
    .unwrap_or_else(|| DEFAULT_AUTH_HEADER.to_string());
    let scheme = select_first_string([
        block.get("scheme"),
        block.get("type"),
        block.get("strategy"),
    ]);
    // Kept untrimmed: a trailing space is how a prefix separates itself from the token.
    let prefix = [
        block.get("prefix"),
        block.get("tokenPrefix"),
        block.get("token_prefix"),
    ]
    .into_iter()
    .flatten()
    .filter_map(Value::as_str)
    .find(|s| !s.trim().is_empty())
    .map(str::to_string);
    let value = select_first_string([
        block.get("value"),
        block.get("headerValue"),
        block.get("header_value"),
    ]);

    AuthConfig {
        header: Some(header),
        scheme,
        prefix,
        token,
        value,
    }
}

fn map_static_headers(raw: &Value) -> Option<BTreeMap<String, String>> {
    let block = ["headers", "defaultHeaders", "staticHeaders"]
        .iter()
        .filter_map(|key| raw.get(*key))
        .find_map(Value::as_object)?;

    Some(
        block
            .iter()
            .filter_map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some((name.clone(), value))
            })
            .collect(),
    )
}

fn extract_extras(raw: &Value) -> Map<String, Value> {
    raw.as_object()
        .map(|object| {
            object
                .iter()
                .filter(|(key, _)| !KNOWN_CONFIG_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}
