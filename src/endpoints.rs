use serde_json::Value;
use std::collections::BTreeMap;

use crate::operation::Operation;

/// URL template per logical operation, resolved once from the defaults plus an
/// optional override source.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointTemplates {
    templates: BTreeMap<Operation, String>,
}

impl EndpointTemplates {
    /// For each operation the first alias present in `source` as a non-blank
    /// string wins; otherwise the built-in default is used.
    pub fn resolve(source: Option<&Value>) -> Self {
        let templates = Operation::ALL
            .into_iter()
            .map(|operation| {
                let template = source
                    .and_then(|src| {
                        operation.aliases().iter().find_map(|alias| {
                            src.get(*alias)
                                .and_then(Value::as_str)
                                .map(str::trim)
                                .filter(|s| !s.is_empty())
                        })
                    })
                    .unwrap_or(operation.default_template());
                (operation, template.to_string())
            })
            .collect();
        Self { templates }
    }

    pub fn template(&self, operation: Operation) -> &str {
        self.templates
            .get(&operation)
            .map(String::as_str)
            .unwrap_or(operation.default_template())
    }
}

impl Default for EndpointTemplates {
    fn default() -> Self {
        Self::resolve(None)
    }
}

/// Expands `{token}` placeholders from `path_params`, appends `query_params`
/// not already present in the template, and joins the result to `base_url`
/// unless it is already absolute.
///
/// Missing or `None` path params expand to the empty string. Query params with
/// a `None` or empty value are skipped.
pub fn build_url(
    base_url: &str,
    template: &str,
    path_params: &[(&str, Option<&str>)],
    query_params: &[(&str, Option<&str>)],
) -> String {
    let mut url = expand_template(template, path_params);

    let query: Vec<String> = query_params
        .iter()
        .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (*key, v)))
        .filter(|(key, _)| !has_query_key(&url, key))
        .map(|(key, value)| {
            format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
        })
        .collect();
    if !query.is_empty() {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&query.join("&"));
    }

    if is_absolute(&url) {
        return url;
    }

    let base = base_url.trim_end_matches('/');
    let path = url.trim_start_matches('/');
    match (base.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", path),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base, path),
    }
}

fn expand_template(template: &str, params: &[(&str, Option<&str>)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let token_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());

        if token_len > 0 && after[token_len..].starts_with('}') {
            let token = &after[..token_len];
            let value = params
                .iter()
                .find(|(name, _)| *name == token)
                .and_then(|(_, value)| *value);
            if let Some(value) = value {
                out.push_str(&urlencoding::encode(value));
            }
            rest = &after[token_len + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

fn has_query_key(url: &str, key: &str) -> bool {
    let encoded = urlencoding::encode(key);
    ["?", "&"]
        .iter()
        .any(|sep| url.contains(&format!("{}{}=", sep, encoded)))
}

fn is_absolute(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
