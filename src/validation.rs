//! Static schema for incoming movie payloads.
//!
//! Fields are checked in schema order and the first violation wins, so the
//! client always sees one message describing the earliest problem. Keys the
//! schema does not know (including `id`) are rejected after all known fields
//! pass.

use serde_json::{Map, Value};
use thiserror::Error;
use crate::model::{MovieFields, FIRST_RELEASE_YEAR};

/// Minimum trimmed length for the bulk language update.
pub const MIN_LANGUAGE_LEN: usize = 2;

/// Largest integer an IEEE double holds exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

const KNOWN_FIELDS: [&str; 10] = [
    "title",
    "director",
    "release_year",
    "genre",
    "rating",
    "duration_minutes",
    "language",
    "created_at",
    "updated_at",
    "ip",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("is required")]
    Required,
    #[error("must be of type object")]
    NotObject,
    #[error("must be a string")]
    NotString,
    #[error("must be a number")]
    NotNumber,
    #[error("must be an integer")]
    NotInteger,
    #[error("must be a safe number")]
    Unsafe,
    #[error("is not allowed to be empty")]
    Empty,
    #[error("length must be at least {0} characters long")]
    TooShort(usize),
    #[error("length must be less than or equal to {0} characters long")]
    TooLong(usize),
    #[error("must be greater than or equal to {0}")]
    BelowMin(f64),
    #[error("must be less than or equal to {0}")]
    AboveMax(f64),
    #[error("is not allowed")]
    NotAllowed,
    #[error("is required and must be a string of at least {0} characters")]
    BlankText(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("\"{field}\" {violation}")]
pub struct ValidationError {
    pub field: String,
    pub violation: Violation,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, violation: Violation) -> Self {
        Self { field: field.into(), violation }
    }
}

/// Validates a create or update payload. `current_year` caps `release_year`.
pub fn validate(payload: &Value, current_year: i64) -> Result<MovieFields, ValidationError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ValidationError::new("value", Violation::NotObject))?;

    let fields = MovieFields {
        title: required(obj, "title", |v| text(v, 1, 255))?,
        director: required(obj, "director", |v| text(v, 3, 255))?,
        release_year: required(obj, "release_year", |v| {
            integer(v, FIRST_RELEASE_YEAR, Some(current_year))
        })?,
        genre: required(obj, "genre", |v| text(v, 3, 50))?,
        rating: required(obj, "rating", |v| number(v, 0.0, 10.0))?,
        duration_minutes: required(obj, "duration_minutes", |v| integer(v, 1, None))? as u64,
        language: required(obj, "language", |v| text(v, 2, 50))?,
        created_at: optional(obj, "created_at", |v| text(v, 1, usize::MAX))?,
        updated_at: optional(obj, "updated_at", |v| text(v, 1, usize::MAX))?,
        ip: optional(obj, "ip", |v| text(v, 1, usize::MAX))?,
    };

    if let Some(unknown) = obj.keys().find(|k| !KNOWN_FIELDS.contains(&k.as_str())) {
        return Err(ValidationError::new(unknown.as_str(), Violation::NotAllowed));
    }

    Ok(fields)
}

/// Validates the body of the bulk language update. The length check applies to
/// the trimmed value; the value is returned as sent.
pub fn validate_language(body: &Value) -> Result<String, ValidationError> {
    let invalid = || ValidationError::new("language", Violation::BlankText(MIN_LANGUAGE_LEN));

    let language = body
        .get("language")
        .and_then(Value::as_str)
        .ok_or_else(invalid)?;

    if language.trim().chars().count() < MIN_LANGUAGE_LEN {
        return Err(invalid());
    }
    Ok(language.to_owned())
}

fn required<T>(
    obj: &Map<String, Value>,
    name: &str,
    check: impl Fn(&Value) -> Result<T, Violation>,
) -> Result<T, ValidationError> {
    let value = obj
        .get(name)
        .ok_or_else(|| ValidationError::new(name, Violation::Required))?;
    check(value).map_err(|v| ValidationError::new(name, v))
}

fn optional<T>(
    obj: &Map<String, Value>,
    name: &str,
    check: impl Fn(&Value) -> Result<T, Violation>,
) -> Result<Option<T>, ValidationError> {
    match obj.get(name) {
        Some(value) => check(value).map(Some).map_err(|v| ValidationError::new(name, v)),
        None => Ok(None),
    }
}

fn text(value: &Value, min: usize, max: usize) -> Result<String, Violation> {
    let s = value.as_str().ok_or(Violation::NotString)?;
    let len = s.chars().count();
    if len == 0 {
        return Err(Violation::Empty);
    }
    if len < min {
        return Err(Violation::TooShort(min));
    }
    if len > max {
        return Err(Violation::TooLong(max));
    }
    Ok(s.to_owned())
}

/// Reads a JSON number, or a string holding one the way form posts send them.
/// Magnitudes past `MAX_SAFE_INTEGER` are refused rather than rounded.
fn numeric(value: &Value) -> Result<f64, Violation> {
    let n = match value {
        Value::Number(num) => match (num.as_i64(), num.as_u64()) {
            (Some(i), _) if i.unsigned_abs() > MAX_SAFE_INTEGER as u64 => return Err(Violation::Unsafe),
            (Some(i), _) => i as f64,
            (None, Some(_)) => return Err(Violation::Unsafe),
            (None, None) => num.as_f64().ok_or(Violation::NotNumber)?,
        },
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or(Violation::NotNumber)?,
        _ => return Err(Violation::NotNumber),
    };
    if n.abs() > MAX_SAFE_INTEGER as f64 {
        return Err(Violation::Unsafe);
    }
    Ok(n)
}

// 2000 and 2000.0 are the same integer.
fn integer(value: &Value, min: i64, max: Option<i64>) -> Result<i64, Violation> {
    let n = numeric(value)?;
    if n.fract() != 0.0 {
        return Err(Violation::NotInteger);
    }
    if n < min as f64 {
        return Err(Violation::BelowMin(min as f64));
    }
    if let Some(max) = max {
        if n > max as f64 {
            return Err(Violation::AboveMax(max as f64));
        }
    }
    Ok(n as i64)
}

fn number(value: &Value, min: f64, max: f64) -> Result<f64, Violation> {
    let n = numeric(value)?;
    if n < min {
        return Err(Violation::BelowMin(min));
    }
    if n > max {
        return Err(Violation::AboveMax(max));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const YEAR: i64 = 2024;

    fn valid() -> Value {
        json!({
            "title": "X",
            "director": "Dir",
            "release_year": 2000,
            "genre": "Drama",
            "rating": 7,
            "duration_minutes": 100,
            "language": "en"
        })
    }

    fn message(payload: Value) -> String {
        validate(&payload, YEAR).unwrap_err().to_string()
    }

    #[test]
    fn accepts_minimal_payload() {
        let fields = validate(&valid(), YEAR).unwrap();
        assert_eq!(fields.title, "X");
        assert_eq!(fields.release_year, 2000);
        assert_eq!(fields.rating, 7.0);
        assert_eq!(fields.duration_minutes, 100);
        assert!(fields.created_at.is_none());
    }

    #[test]
    fn accepts_audit_fields() {
        let mut payload = valid();
        payload["created_at"] = json!("2024-01-01T00:00:00.000000Z");
        payload["ip"] = json!("10.1.1.1");
        let fields = validate(&payload, YEAR).unwrap();
        assert_eq!(fields.ip.as_deref(), Some("10.1.1.1"));
    }

    #[test]
    fn rejects_missing_title() {
        let mut payload = valid();
        payload.as_object_mut().unwrap().remove("title");
        let err = validate(&payload, YEAR).unwrap_err();
        assert_eq!(err.field, "title");
        assert_eq!(err.violation, Violation::Required);
        assert_eq!(err.to_string(), "\"title\" is required");
    }

    #[test]
    fn rejects_release_year_before_cinema() {
        let mut payload = valid();
        payload["release_year"] = json!(1887);
        assert_eq!(message(payload), "\"release_year\" must be greater than or equal to 1888");
    }

    #[test]
    fn rejects_release_year_in_the_future() {
        let mut payload = valid();
        payload["release_year"] = json!(YEAR + 1);
        assert_eq!(message(payload), "\"release_year\" must be less than or equal to 2024");
    }

    #[test]
    fn rejects_rating_above_ten() {
        let mut payload = valid();
        payload["rating"] = json!(10.5);
        assert_eq!(message(payload), "\"rating\" must be less than or equal to 10");
    }

    #[test]
    fn rejects_fractional_duration() {
        let mut payload = valid();
        payload["duration_minutes"] = json!(90.5);
        assert_eq!(message(payload), "\"duration_minutes\" must be an integer");
    }

    #[test]
    fn reports_first_violation_in_schema_order() {
        let mut payload = valid();
        payload["director"] = json!("Al");
        payload["genre"] = json!(42);
        assert_eq!(message(payload), "\"director\" length must be at least 3 characters long");
    }

    #[test]
    fn rejects_wrong_types_and_empty_strings() {
        let mut payload = valid();
        payload["title"] = json!("");
        assert_eq!(message(payload), "\"title\" is not allowed to be empty");

        let mut payload = valid();
        payload["rating"] = json!("seven");
        assert_eq!(message(payload), "\"rating\" must be a number");

        let mut payload = valid();
        payload["rating"] = json!(true);
        assert_eq!(message(payload), "\"rating\" must be a number");

        let mut payload = valid();
        payload["language"] = json!(null);
        assert_eq!(message(payload), "\"language\" must be a string");
    }

    #[test]
    fn rejects_overlong_genre() {
        let mut payload = valid();
        payload["genre"] = json!("g".repeat(51));
        assert_eq!(
            message(payload),
            "\"genre\" length must be less than or equal to 50 characters long"
        );
    }

    #[test]
    fn rejects_unknown_keys_including_id() {
        let mut payload = valid();
        payload["id"] = json!(99);
        assert_eq!(message(payload), "\"id\" is not allowed");
    }

    #[test]
    fn rejects_non_object_payload() {
        assert_eq!(message(json!([1, 2])), "\"value\" must be of type object");
    }

    #[test]
    fn numeric_strings_are_converted() {
        let mut payload = valid();
        payload["release_year"] = json!("2000");
        payload["rating"] = json!(" 7.5 ");
        payload["duration_minutes"] = json!("100");
        let fields = validate(&payload, YEAR).unwrap();
        assert_eq!(fields.release_year, 2000);
        assert_eq!(fields.rating, 7.5);
        assert_eq!(fields.duration_minutes, 100);

        let mut payload = valid();
        payload["release_year"] = json!("1800");
        assert_eq!(message(payload), "\"release_year\" must be greater than or equal to 1888");

        for junk in ["", "  ", "12abc", "NaN", "inf"] {
            let mut payload = valid();
            payload["duration_minutes"] = json!(junk);
            assert_eq!(message(payload), "\"duration_minutes\" must be a number", "{junk:?}");
        }
    }

    #[test]
    fn integers_beyond_double_precision_are_refused() {
        let mut payload = valid();
        payload["duration_minutes"] = json!(1e300);
        assert_eq!(message(payload), "\"duration_minutes\" must be a safe number");

        let mut payload = valid();
        payload["duration_minutes"] = json!(9_007_199_254_740_993u64);
        assert_eq!(message(payload), "\"duration_minutes\" must be a safe number");

        let mut payload = valid();
        payload["duration_minutes"] = json!(u64::MAX);
        assert_eq!(message(payload), "\"duration_minutes\" must be a safe number");

        let mut payload = valid();
        payload["duration_minutes"] = json!("9007199254740993");
        assert_eq!(message(payload), "\"duration_minutes\" must be a safe number");

        let mut payload = valid();
        payload["duration_minutes"] = json!(MAX_SAFE_INTEGER);
        let fields = validate(&payload, YEAR).unwrap();
        assert_eq!(fields.duration_minutes, MAX_SAFE_INTEGER as u64);
    }

    #[test]
    fn language_is_checked_trimmed_but_kept_as_sent() {
        assert_eq!(validate_language(&json!({"language": " EN "})).unwrap(), " EN ");
        assert!(validate_language(&json!({"language": " e "})).is_err());
        assert!(validate_language(&json!({"language": 12})).is_err());
        assert!(validate_language(&json!({})).is_err());
    }
}
