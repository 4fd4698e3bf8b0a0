use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_AUTH_HEADER: &str = "Authorization";

pub type HeaderSet = BTreeMap<String, String>;

/// How the single auth header is formed. `value` is a pre-formatted header
/// value and wins over everything else.
///
/// `prefix` is used verbatim, surrounding whitespace included, so `"Key "`
/// with token `secret` yields `Key secret` rather than `Keysecret`. Without a
/// prefix, `scheme` is joined to the token with a single space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub header: Option<String>,
    pub scheme: Option<String>,
    pub prefix: Option<String>,
    pub token: Option<String>,
    pub value: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header: Some(DEFAULT_AUTH_HEADER.to_string()),
            scheme: Some("Bearer".to_string()),
            prefix: None,
            token: None,
            value: None,
        }
    }
}

impl AuthConfig {
    /// Shallow merge: every field set on `other` replaces ours.
    pub fn merge(&mut self, other: AuthConfig) {
        if other.header.is_some() {
            self.header = other.header;
        }
        if other.scheme.is_some() {
            self.scheme = other.scheme;
        }
        if other.prefix.is_some() {
            self.prefix = other.prefix;
        }
        if other.token.is_some() {
            self.token = other.token;
        }
        if other.value.is_some() {
            self.value = other.value;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_none()
            && self.scheme.is_none()
            && self.prefix.is_none()
            && self.token.is_none()
            && self.value.is_none()
    }

    pub fn header_name(&self) -> &str {
        non_blank(self.header.as_deref()).unwrap_or(DEFAULT_AUTH_HEADER)
    }

    /// The auth header value, if any resolves. `override_token` beats the
    /// configured token but not an explicit `value`.
    pub fn header_value(&self, override_token: Option<&str>) -> Option<String> {
        if let Some(value) = non_blank(self.value.as_deref()) {
            return Some(value.to_string());
        }
        let token = non_blank(override_token).or_else(|| non_blank(self.token.as_deref()))?;
        let prefix = match (&self.prefix, non_blank(self.scheme.as_deref())) {
            (Some(prefix), _) => prefix.clone(),
            (None, Some(scheme)) => format!("{} ", scheme),
            (None, None) => String::new(),
        };
        let value = format!("{}{}", prefix, token).trim().to_string();
        (!value.is_empty()).then_some(value)
    }
}

/// Headers for an outgoing request: `Accept`, the static headers, then the
/// auth header when one resolves.
pub fn build_headers(
    static_headers: &BTreeMap<String, String>,
    auth: &AuthConfig,
    override_token: Option<&str>,
) -> HeaderSet {
    let mut headers = HeaderSet::new();
    headers.insert("Accept".to_string(), "application/json".to_string());
    for (name, value) in static_headers {
        headers.insert(name.clone(), value.clone());
    }
    if let Some(value) = auth.header_value(override_token) {
        headers.insert(auth.header_name().to_string(), value);
    }
    headers
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
