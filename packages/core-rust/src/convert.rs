//! Conversion of extracted response values into typed [`Value`]s.
//!
//! Conversion never fails the caller: a value that cannot be parsed as the
//! declared type becomes [`Value::Null`] and the failure is logged at `debug`.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde_json::Value as Json;
use tracing::debug;

use crate::reader::ResponseFormat;
use crate::types::{ScalarType, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
enum ConversionError {
    #[error("cannot parse {text:?} as {ty:?}")]
    Unparsable { text: String, ty: ScalarType },
    #[error("{value} is out of range for {ty:?}")]
    OutOfRange { value: i64, ty: ScalarType },
    #[error("structured value cannot be converted to {ty:?}")]
    Structured { ty: ScalarType },
}

/// Converts a raw extracted value to the declared type.
///
/// - `null` stays null.
/// - Without a declared type the value's textual form is returned.
/// - Empty text for a non-string type is null.
/// - Anything unparsable is null.
#[must_use]
pub fn convert(raw: &Json, ty: Option<ScalarType>) -> Value {
    if raw.is_null() {
        return Value::Null;
    }
    let text = textual(raw);
    let Some(ty) = ty else {
        return Value::String(text);
    };
    if ty == ScalarType::String {
        return Value::String(text);
    }
    if text.is_empty() {
        return Value::Null;
    }
    match try_convert(raw, text.trim(), ty) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "type conversion failed, using null");
            Value::Null
        }
    }
}

/// Converts a value extracted from a row of the given format.
///
/// Only JSON payloads carry typed numbers. Numeric XML leaves are numbers
/// because of leaf coercion, so they are converted from their text and never
/// read as epoch milliseconds.
#[must_use]
pub fn convert_from(format: ResponseFormat, raw: &Json, ty: Option<ScalarType>) -> Value {
    match raw {
        Json::Number(n) if format != ResponseFormat::Json => {
            convert(&Json::String(n.to_string()), ty)
        }
        _ => convert(raw, ty),
    }
}

/// Strings convert to their content; everything else to its JSON text.
fn textual(raw: &Json) -> String {
    match raw {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn try_convert(raw: &Json, text: &str, ty: ScalarType) -> Result<Value, ConversionError> {
    if matches!(raw, Json::Array(_) | Json::Object(_)) {
        return Err(ConversionError::Structured { ty });
    }
    let unparsable = || ConversionError::Unparsable {
        text: text.to_string(),
        ty,
    };

    match ty {
        ScalarType::Boolean => match raw {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            _ => parse_bool(text).map(Value::Bool).ok_or_else(unparsable),
        },
        ScalarType::String => Ok(Value::String(text.to_string())),
        ScalarType::TinyInt | ScalarType::SmallInt | ScalarType::Integer | ScalarType::BigInt => {
            let value = text.parse::<i64>().map_err(|_| unparsable())?;
            match ty.integral_range() {
                Some((min, max)) if value < min || value > max => {
                    Err(ConversionError::OutOfRange { value, ty })
                }
                _ => Ok(Value::Int(value)),
            }
        }
        ScalarType::Float | ScalarType::Double => text
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| unparsable()),
        ScalarType::Decimal => Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .map(Value::Decimal)
            .map_err(|_| unparsable()),
        ScalarType::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .ok()
            .or_else(|| parse_timestamp(raw, text).map(|ts| ts.date()))
            .map(Value::Date)
            .ok_or_else(unparsable),
        ScalarType::Time => TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
            .or_else(|| parse_timestamp(raw, text).map(|ts| ts.time()))
            .map(Value::Time)
            .ok_or_else(unparsable),
        ScalarType::Timestamp => parse_timestamp(raw, text)
            .map(Value::Timestamp)
            .ok_or_else(unparsable),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") || text == "1" {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") || text == "0" {
        Some(false)
    } else {
        None
    }
}

/// RFC 3339 (normalised to UTC), naive date-time text, a bare date at
/// midnight, or an integer of epoch milliseconds.
fn parse_timestamp(raw: &Json, text: &str) -> Option<NaiveDateTime> {
    if let Some(millis) = raw.as_i64() {
        return DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn null_stays_null() {
        assert_eq!(convert(&Json::Null, Some(ScalarType::String)), Value::Null);
        assert_eq!(convert(&Json::Null, None), Value::Null);
    }

    #[test]
    fn untyped_returns_text() {
        assert_eq!(convert(&json!(12), None), Value::String("12".to_string()));
        assert_eq!(convert(&json!("x"), None), Value::String("x".to_string()));
        assert_eq!(
            convert(&json!({"a": 1}), None),
            Value::String(r#"{"a":1}"#.to_string())
        );
    }

    #[test]
    fn empty_text_is_null_for_typed_non_string() {
        assert_eq!(convert(&json!(""), Some(ScalarType::Integer)), Value::Null);
        assert_eq!(convert(&json!(""), Some(ScalarType::Date)), Value::Null);
        assert_eq!(
            convert(&json!(""), Some(ScalarType::String)),
            Value::String(String::new())
        );
    }

    #[test]
    fn integers() {
        assert_eq!(convert(&json!("42"), Some(ScalarType::Integer)), Value::Int(42));
        assert_eq!(convert(&json!(-7), Some(ScalarType::BigInt)), Value::Int(-7));
        assert_eq!(convert(&json!("300"), Some(ScalarType::TinyInt)), Value::Null);
        assert_eq!(convert(&json!("4.5"), Some(ScalarType::Integer)), Value::Null);
        assert_eq!(convert(&json!("abc"), Some(ScalarType::BigInt)), Value::Null);
    }

    #[test]
    fn floats_and_decimals() {
        assert_eq!(convert(&json!("2.5"), Some(ScalarType::Double)), Value::Float(2.5));
        assert_eq!(convert(&json!(1), Some(ScalarType::Float)), Value::Float(1.0));
        assert_eq!(
            convert(&json!("10.25"), Some(ScalarType::Decimal)),
            Value::Decimal("10.25".parse().unwrap())
        );
        assert_eq!(
            convert(&json!("1.5e2"), Some(ScalarType::Decimal)),
            Value::Decimal("150".parse().unwrap())
        );
    }

    #[test]
    fn booleans() {
        assert_eq!(convert(&json!(true), Some(ScalarType::Boolean)), Value::Bool(true));
        assert_eq!(convert(&json!("FALSE"), Some(ScalarType::Boolean)), Value::Bool(false));
        assert_eq!(convert(&json!("1"), Some(ScalarType::Boolean)), Value::Bool(true));
        assert_eq!(convert(&json!("maybe"), Some(ScalarType::Boolean)), Value::Null);
    }

    #[test]
    fn temporal_values() {
        assert_eq!(
            convert(&json!("2024-02-29"), Some(ScalarType::Date)),
            Value::Date(ymd(2024, 2, 29))
        );
        assert_eq!(
            convert(&json!("08:15"), Some(ScalarType::Time)),
            Value::Time(NaiveTime::from_hms_opt(8, 15, 0).unwrap())
        );
        assert_eq!(
            convert(&json!("2024-01-01T10:00:00+02:00"), Some(ScalarType::Timestamp)),
            Value::Timestamp(ymd(2024, 1, 1).and_hms_opt(8, 0, 0).unwrap())
        );
        assert_eq!(
            convert(&json!("2024-01-01 10:00:00.5"), Some(ScalarType::Timestamp)),
            Value::Timestamp(ymd(2024, 1, 1).and_hms_milli_opt(10, 0, 0, 500).unwrap())
        );
        assert_eq!(
            convert(&json!(0), Some(ScalarType::Timestamp)),
            Value::Timestamp(ymd(1970, 1, 1).and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(
            convert(&json!("2024-03-01T12:00:00Z"), Some(ScalarType::Date)),
            Value::Date(ymd(2024, 3, 1))
        );
        assert_eq!(convert(&json!("yesterday"), Some(ScalarType::Timestamp)), Value::Null);
    }

    #[test]
    fn epoch_millis_only_for_json_numbers() {
        let raw = json!(20_240_501);
        assert_eq!(
            convert_from(ResponseFormat::Xml, &raw, Some(ScalarType::Date)),
            Value::Null
        );
        assert_eq!(
            convert_from(ResponseFormat::Xml, &raw, Some(ScalarType::Timestamp)),
            Value::Null
        );
        assert_eq!(
            convert_from(ResponseFormat::Xml, &raw, Some(ScalarType::Integer)),
            Value::Int(20_240_501)
        );
        assert_eq!(
            convert_from(ResponseFormat::Xml, &json!(1), Some(ScalarType::Boolean)),
            Value::Bool(true)
        );
        assert_eq!(
            convert_from(ResponseFormat::Json, &json!(0), Some(ScalarType::Date)),
            Value::Date(ymd(1970, 1, 1))
        );
    }

    #[test]
    fn structured_values() {
        assert_eq!(convert(&json!([1, 2]), Some(ScalarType::Integer)), Value::Null);
        assert_eq!(
            convert(&json!([1, 2]), Some(ScalarType::String)),
            Value::String("[1,2]".to_string())
        );
    }
}
