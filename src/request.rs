//! Invocation payload normalization.
//!
//! Callers deliver the same request in several shapes: a JSON string
//! `body`, an already-parsed `body` object, GraphQL-style `arguments`, or
//! flat top-level fields. Each typed request is pulled from the first
//! shape that carries it.

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::ConditionsError;

/// Longest history a caller may ask for, in days.
pub const MAX_RANGE_DAYS: u32 = 120;

/// A typed request extracted from an invocation payload.
pub trait InvocationRequest: DeserializeOwned {
    /// Field names, for error messages.
    const FIELDS: &'static str;

    /// Check field contents once the shape has been found.
    ///
    /// # Errors
    ///
    /// Returns a description of the first bad field.
    fn validate(&self) -> Result<(), String>;
}

/// `{ zip }` for weather and nearby-station lookups.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZipRequest {
    #[serde(deserialize_with = "string_or_number")]
    pub zip: String,
}

impl InvocationRequest for ZipRequest {
    const FIELDS: &'static str = "zip";

    fn validate(&self) -> Result<(), String> {
        if self.zip.trim().is_empty() {
            return Err("zip is empty".into());
        }
        Ok(())
    }
}

/// `{ id, range }` for one station's history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StationRangeRequest {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "days")]
    pub range: u32,
}

impl InvocationRequest for StationRangeRequest {
    const FIELDS: &'static str = "id, range";

    fn validate(&self) -> Result<(), String> {
        // USGS site numbers are 8 to 15 digits
        let id = self.id.trim();
        if !(8..=15).contains(&id.len()) || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("id '{}' is not a station number", self.id));
        }
        if !(1..=MAX_RANGE_DAYS).contains(&self.range) {
            return Err(format!(
                "range must be between 1 and {MAX_RANGE_DAYS} days, got {}",
                self.range
            ));
        }
        Ok(())
    }
}

/// `{ location }` for free-text geocoding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocationRequest {
    pub location: String,
}

impl InvocationRequest for LocationRequest {
    const FIELDS: &'static str = "location";

    fn validate(&self) -> Result<(), String> {
        if self.location.trim().is_empty() {
            return Err("location is empty".into());
        }
        Ok(())
    }
}

/// Extract a typed request from whatever shape the caller sent.
///
/// # Errors
///
/// `MalformedRequest` when no shape yields the required fields, or the
/// fields fail validation.
pub fn normalize<T: InvocationRequest>(event: &Value) -> Result<T, ConditionsError> {
    let request = candidates(event)
        .into_iter()
        .find_map(|candidate| T::deserialize(candidate).ok())
        .ok_or_else(|| {
            ConditionsError::MalformedRequest(format!("expected field(s): {}", T::FIELDS))
        })?;

    request.validate().map_err(ConditionsError::MalformedRequest)?;
    Ok(request)
}

/// Payload shapes in the order they are tried.
fn candidates(event: &Value) -> Vec<Value> {
    let mut out = Vec::with_capacity(4);
    match event.get("body") {
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(parsed @ Value::Object(_)) => out.push(parsed),
            Ok(_) => debug!("body string is not a JSON object"),
            Err(e) => debug!("body string is not JSON: {}", e),
        },
        Some(body @ Value::Object(_)) => out.push(body.clone()),
        _ => {}
    }
    if let Some(arguments @ Value::Object(_)) = event.get("arguments") {
        out.push(arguments.clone());
    }
    if event.is_object() {
        out.push(event.clone());
    }
    out
}

/// Accept `"78704"` or `78704`.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Accept `7` or `"7"`.
fn days<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| D::Error::custom(format!("range {n} is not a whole number of days"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("range '{s}' is not a number"))),
        other => Err(D::Error::custom(format!("expected a number, got {other}"))),
    }
}
