use serde_json::{Map, Value};

use crate::error::{AppError, ErrorCode};
use crate::types::LeadRequest;

/// Turn a raw request body into a field map. An empty body is an empty map;
/// a JSON string body is decoded once more, since some storefront scripts
/// send the payload double-encoded.
pub fn normalize_body(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    let value: Value = serde_json::from_slice(body).map_err(malformed)?;
    let value = match value {
        Value::String(inner) if inner.trim().is_empty() => return Ok(Map::new()),
        Value::String(inner) => serde_json::from_str(&inner).map_err(malformed)?,
        other => other,
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(AppError::with_details(
            ErrorCode::MalformedBody,
            format!("expected a JSON object, got {}", kind(&other)),
        )),
    }
}

pub fn validate_fields(
    fields: &Map<String, Value>,
    require_message: bool,
) -> Result<LeadRequest, AppError> {
    let name = text(fields, &["name"]);
    let phone = text(fields, &["phone", "fullPhone"]);
    let location = text(fields, &["location"]);
    let message = text(fields, &["message"]);

    let mut missing = Vec::new();
    if name.is_none() {
        missing.push("name");
    }
    if phone.is_none() {
        missing.push("phone");
    }
    if location.is_none() {
        missing.push("location");
    }
    if require_message && message.is_none() {
        missing.push("message");
    }

    match (name, phone, location) {
        (Some(name), Some(phone), Some(location)) if missing.is_empty() => Ok(LeadRequest {
            name,
            phone,
            location,
            message,
            preferred_date: text(fields, &["preferred_date", "preferredDate"]),
            email: text(fields, &["email"]),
        }),
        _ => Err(AppError::with_details(
            ErrorCode::MissingFields,
            missing.join(", "),
        )),
    }
}

pub fn parse_lead(body: &[u8], require_message: bool) -> Result<LeadRequest, AppError> {
    let fields = normalize_body(body)?;
    validate_fields(&fields, require_message)
}

fn text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .filter_map(|value| match value {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .find(|s| !s.is_empty())
}

fn malformed(err: serde_json::Error) -> AppError {
    AppError::with_details(ErrorCode::MalformedBody, err.to_string())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
