use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Generic runtime value produced by literal coercion and row materialization.
///
/// Used both as the coerced value of a [`FilterCriterion`](crate::filter::FilterCriterion)
/// and as the cell type of rows emitted by [`RowCursor`](crate::cursor::RowCursor).
///
/// Serializes untagged so that template contexts see plain JSON scalars:
/// temporal values render as ISO-8601 strings and decimals as strings
/// (no precision loss through `f64`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent or unparsable value.
    Null,
    Bool(bool),
    /// Every integral type widens to a signed 64-bit integer.
    Int(i64),
    Float(f64),
    /// Exact decimal (SQL `DECIMAL`/`NUMERIC`).
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Date and time without zone. Zoned inputs are normalised to UTC.
    Timestamp(NaiveDateTime),
    Array(Vec<Value>),
    /// Ordered map of string keys to values, in source order.
    Map(#[serde(serialize_with = "serialize_entries")] Vec<(String, Value)>),
}

#[allow(clippy::ptr_arg)]
fn serialize_entries<S>(entries: &Vec<(String, Value)>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_map(entries.iter().map(|(k, v)| (k, v)))
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts into the JSON model the response readers operate on.
    ///
    /// Used to feed bound request values through the same type conversion as
    /// values extracted from a response row.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or_else(|| serde_json::Value::String(f.to_string()), serde_json::Value::Number),
            Self::Decimal(d) => serde_json::Value::String(d.to_string()),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            Self::Time(t) => serde_json::Value::String(t.format("%H:%M:%S%.f").to_string()),
            Self::Timestamp(ts) => {
                serde_json::Value::String(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            }
            Self::Array(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Declared scalar type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "varchar", alias = "char", alias = "text")]
    String,
    TinyInt,
    SmallInt,
    #[serde(alias = "int")]
    Integer,
    #[serde(alias = "long")]
    BigInt,
    #[serde(alias = "real")]
    Float,
    Double,
    #[serde(alias = "numeric")]
    Decimal,
    Date,
    Time,
    #[serde(alias = "datetime")]
    Timestamp,
}

impl ScalarType {
    /// Whether the type belongs to the integral family.
    #[must_use]
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::Integer | Self::BigInt
        )
    }

    /// Inclusive value range of an integral type, `None` for other types.
    #[must_use]
    pub fn integral_range(self) -> Option<(i64, i64)> {
        match self {
            Self::TinyInt => Some((i64::from(i8::MIN), i64::from(i8::MAX))),
            Self::SmallInt => Some((i64::from(i16::MIN), i64::from(i16::MAX))),
            Self::Integer => Some((i64::from(i32::MIN), i64::from(i32::MAX))),
            Self::BigInt => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Maps the scalar type onto the Arrow type a host engine would expose.
    #[cfg(feature = "arrow")]
    #[must_use]
    pub fn to_arrow(self) -> arrow_schema::DataType {
        use arrow_schema::{DataType, TimeUnit};
        match self {
            Self::Boolean => DataType::Boolean,
            Self::String => DataType::Utf8,
            Self::TinyInt => DataType::Int8,
            Self::SmallInt => DataType::Int16,
            Self::Integer => DataType::Int32,
            Self::BigInt => DataType::Int64,
            Self::Float => DataType::Float32,
            Self::Double => DataType::Float64,
            Self::Decimal => DataType::Decimal128(38, 10),
            Self::Date => DataType::Date32,
            Self::Time => DataType::Time64(TimeUnit::Microsecond),
            Self::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        }
    }
}

/// Whether a field's value travels in the request, the response, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Only ever sent to the remote API; never present in a response row.
    Request,
    /// Only read from response rows.
    #[default]
    Response,
    Both,
}

impl Direction {
    /// Whether an equality filter on this field binds a request value.
    #[must_use]
    pub fn has_request_value(self) -> bool {
        matches!(self, Self::Request | Self::Both)
    }

    /// Whether the field can be read from a response row.
    #[must_use]
    pub fn has_response_value(self) -> bool {
        matches!(self, Self::Response | Self::Both)
    }
}
