//! Shape-tolerant response decoding.
//!
//! Several endpoints answer with more than one JSON shape depending on
//! server state. Each helper tries the accepted shapes in order and only
//! fails, with the raw body attached, once none of them match.

use crate::error::{CredentialError, CredentialResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

fn parse_value(endpoint: &str, body: &str) -> CredentialResult<Value> {
    serde_json::from_str(body)
        .map_err(|e| CredentialError::unexpected(endpoint, format!("invalid JSON: {e}"), body))
}

fn from_value<T: DeserializeOwned>(endpoint: &str, value: Value, body: &str) -> CredentialResult<T> {
    T::deserialize(value).map_err(|e| CredentialError::unexpected(endpoint, e.to_string(), body))
}

/// Decode a body that is either a single object or an array of objects.
///
/// Arrays yield their first element; an empty array is an error.
pub(crate) fn object_or_first<T: DeserializeOwned>(endpoint: &str, body: &str) -> CredentialResult<T> {
    first_or_none(endpoint, body)?
        .ok_or_else(|| CredentialError::unexpected(endpoint, "empty result set", body))
}

/// Like [`object_or_first`] but an empty array is `None`.
pub(crate) fn first_or_none<T: DeserializeOwned>(
    endpoint: &str,
    body: &str,
) -> CredentialResult<Option<T>> {
    match parse_value(endpoint, body)? {
        object @ Value::Object(_) => from_value(endpoint, object, body).map(Some),
        Value::Array(items) => match items.into_iter().next() {
            Some(first) => from_value(endpoint, first, body).map(Some),
            None => Ok(None),
        },
        other => Err(CredentialError::unexpected(
            endpoint,
            format!("expected object or array, got {}", kind(&other)),
            body,
        )),
    }
}

/// Decode a JSON array strictly.
pub(crate) fn list<T: DeserializeOwned>(endpoint: &str, body: &str) -> CredentialResult<Vec<T>> {
    match parse_value(endpoint, body)? {
        array @ Value::Array(_) => from_value(endpoint, array, body),
        other => Err(CredentialError::unexpected(
            endpoint,
            format!("expected array, got {}", kind(&other)),
            body,
        )),
    }
}

/// Decode a JSON array, skipping elements that do not fit `T`.
pub(crate) fn lenient_list<T: DeserializeOwned>(endpoint: &str, body: &str) -> CredentialResult<Vec<T>> {
    let Value::Array(items) = parse_value(endpoint, body)? else {
        return Err(CredentialError::unexpected(endpoint, "expected array", body));
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!(endpoint, error = %e, "Skipping undecodable record");
                None
            }
        })
        .collect())
}

/// Body of a credential fetch.
#[derive(Debug)]
pub(crate) enum Shaped<T> {
    /// Structured object
    Object(T),
    /// Bare scalar (quoted string or number)
    Raw(String),
}

/// Decode a body that is an object or a bare, possibly quoted, scalar.
///
/// Anything other than an object or a JSON string is returned as the raw
/// body text, so numeric-looking secrets keep their exact spelling.
pub(crate) fn object_or_raw<T: DeserializeOwned>(endpoint: &str, body: &str) -> CredentialResult<Shaped<T>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::unexpected(endpoint, "empty body", body));
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(object @ Value::Object(_)) => from_value(endpoint, object, body).map(Shaped::Object),
        Ok(Value::String(raw)) => Ok(Shaped::Raw(raw)),
        _ => Ok(Shaped::Raw(strip_quotes(trimmed).to_string())),
    }
}

/// Remove one pair of surrounding double quotes.
pub(crate) fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(text)
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse the timestamp formats the API emits; unknown formats yield `None`.
pub(crate) fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%m/%d/%Y %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Serde helper: any missing, null, or unparseable timestamp becomes `None`.
pub(crate) fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(parse_datetime))
}

/// Serde helper: ids given as numbers, numeric strings, or null (zero).
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("id out of range: {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("id is not numeric: {s}"))),
        Some(other) => Err(D::Error::custom(format!("expected id, got {}", kind(&other)))),
    }
}

/// Serde helper: optional secret string.
pub(crate) fn secret_opt<'de, D>(deserializer: D) -> Result<Option<secrecy::SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(secrecy::SecretString::from))
}
