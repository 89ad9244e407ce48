//! Field-level validation shared by every collection.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use thiserror::Error;

use crate::database::backend::Record;
use crate::database::binding::{FieldKind, FieldSpec};

/// A payload failed validation. `fields` names every offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub fields: Vec<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), fields: vec![] }
    }

    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { message: message.into(), fields: vec![field.into()] }
    }
}

/// Only absent, `null` and `""` count as missing; `0` and `false` are values.
pub fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Fails listing every required field that is missing from `payload`.
pub fn require_fields<S: AsRef<str>>(payload: &Record, required: &[S]) -> Result<(), ValidationError> {
    let missing: Vec<String> = required
        .iter()
        .map(|f| f.as_ref())
        .filter(|f| is_missing(payload.get(*f)))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            message: format!("Missing required fields: {}", missing.join(", ")),
            fields: missing,
        })
    }
}

/// Length check in characters; absent values are left to `require_fields`.
pub fn validate_string_length(
    value: Option<&Value>,
    min: usize,
    max: usize,
    field: &str,
) -> Result<(), ValidationError> {
    let Some(value) = value else { return Ok(()) };
    let Some(s) = value.as_str() else {
        return Err(ValidationError::for_field(field, format!("{} must be a string", field)));
    };
    let len = s.chars().count();
    if len < min || len > max {
        return Err(ValidationError::for_field(
            field,
            format!("{} must be between {} and {} characters", field, min, max),
        ));
    }
    Ok(())
}

/// Checks every present, non-null value against its declared kind.
pub fn check_kinds(payload: &Record, specs: &[FieldSpec]) -> Result<(), ValidationError> {
    let invalid: Vec<String> = specs
        .iter()
        .filter(|spec| match payload.get(spec.name) {
            None | Some(Value::Null) => false,
            Some(value) => !kind_matches(spec.kind, value),
        })
        .map(|spec| spec.name.to_string())
        .collect();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            message: format!("Invalid field types: {}", invalid.join(", ")),
            fields: invalid,
        })
    }
}

fn kind_matches(kind: FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::Any => true,
        FieldKind::Text => value.is_string(),
        FieldKind::Integer => value.is_i64() || value.is_u64(),
        FieldKind::Timestamp => value.as_str().is_some_and(is_timestamp),
    }
}

fn is_timestamp(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}
