//! Value coercion shared by every translator.
//!
//! Upstream payloads are duck-typed: the same field may arrive under several
//! names, as a string or a number, or not at all. Each helper here accepts an
//! optional JSON value and produces a canonical scalar, never failing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Number, Value};

pub const DEFAULT_CURRENCY: &str = "USD";

/// Returns the first candidate key present on `object` with a non-null value.
pub fn first_present<'a>(object: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

/// Walks nested object keys, e.g. `["api", "baseUrl"]`.
pub fn lookup_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// First candidate that is a string with non-whitespace content, trimmed.
pub fn select_first_string<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// First candidate that is a JSON boolean. Truthy strings do not count.
pub fn select_first_bool<'a, I>(candidates: I) -> Option<bool>
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    candidates.into_iter().flatten().find_map(Value::as_bool)
}

pub fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => number_to_string(n),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

pub fn coerce_id(value: Option<&Value>) -> Option<String> {
    non_empty(coerce_string(value))
}

/// Keeps digits only and trims to the final four.
pub fn coerce_last_four(value: Option<&Value>) -> Option<String> {
    let digits: String = coerce_string(value)
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    if digits.len() > 4 {
        return Some(digits[digits.len() - 4..].to_string());
    }
    non_empty(digits)
}

pub fn coerce_currency(value: Option<&Value>) -> String {
    let code = coerce_string(value).to_uppercase();
    if code.is_empty() {
        DEFAULT_CURRENCY.to_string()
    } else {
        code
    }
}

/// Finite numbers and numeric strings; everything else is `None`.
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Normalizes to `YYYY-MM-DDTHH:MM:SS.mmmZ`. Unparseable input is `None`,
/// never a malformed date string.
pub fn coerce_timestamp(value: Option<&Value>) -> Option<String> {
    let parsed = match value? {
        Value::String(s) => parse_timestamp(s.trim())?,
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?;
            if millis == 0 {
                return None;
            }
            DateTime::<Utc>::from_timestamp_millis(millis)?
        }
        _ => return None,
    };
    Some(format_timestamp(&parsed))
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// 1234.0 should read as "1234", not "1234.0", when it ends up in an id or mask.
fn number_to_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
