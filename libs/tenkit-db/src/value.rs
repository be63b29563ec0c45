//! Dynamic scalar values and zero-value classification.

use sea_orm::prelude::DateTimeUtc;
use sea_orm::sea_query::ColumnType;
use sea_orm::{QueryResult, TryGetable, Value};
use tenkit_errors::Error;

use crate::Result;

/// A dynamically typed aggregate result.
///
/// `max`/`min` return whatever the underlying column holds; the declared
/// column type drives decoding, and `Null` stands for "no rows matched".
/// Exotic driver types degrade to the closest variant (uuids and json
/// decode as text, booleans as 0/1 integers).
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    DateTime(DateTimeUtc),
}

impl ScalarValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScalarValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ScalarValue::Float(v) => Some(*v),
            #[allow(clippy::cast_precision_loss)]
            ScalarValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTimeUtc> {
        match self {
            ScalarValue::DateTime(v) => Some(*v),
            _ => None,
        }
    }
}

/// Decode the aliased result column into a [`ScalarValue`], guided by the
/// declared column type.
pub(crate) fn decode_scalar(
    row: &QueryResult,
    alias: &str,
    column_type: &ColumnType,
) -> Result<ScalarValue> {
    match column_type {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger
        | ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned => {
            decode::<i64>(row, alias).map(|v| v.map_or(ScalarValue::Null, ScalarValue::Int))
        }

        ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) | ColumnType::Money(_) => {
            decode::<f64>(row, alias).map(|v| v.map_or(ScalarValue::Null, ScalarValue::Float))
        }

        ColumnType::Boolean => decode::<bool>(row, alias)
            .map(|v| v.map_or(ScalarValue::Null, |b| ScalarValue::Int(i64::from(b)))),

        ColumnType::Char(_) | ColumnType::String(_) | ColumnType::Text => {
            decode::<String>(row, alias).map(|v| v.map_or(ScalarValue::Null, ScalarValue::Text))
        }

        ColumnType::Uuid => decode::<uuid::Uuid>(row, alias)
            .map(|v| v.map_or(ScalarValue::Null, |u| ScalarValue::Text(u.to_string()))),

        ColumnType::Binary(_) | ColumnType::VarBinary(_) | ColumnType::Blob => {
            decode::<Vec<u8>>(row, alias).map(|v| v.map_or(ScalarValue::Null, ScalarValue::Bytes))
        }

        ColumnType::DateTime
        | ColumnType::Timestamp
        | ColumnType::TimestampWithTimeZone
        | ColumnType::Date
        | ColumnType::Time => match decode::<DateTimeUtc>(row, alias) {
            Ok(v) => Ok(v.map_or(ScalarValue::Null, ScalarValue::DateTime)),
            // Some drivers hand temporal values back as text.
            Err(_) => {
                decode::<String>(row, alias).map(|v| v.map_or(ScalarValue::Null, ScalarValue::Text))
            }
        },

        // Custom and driver-specific types: best effort.
        _ => {
            if let Ok(Some(v)) = decode::<i64>(row, alias) {
                return Ok(ScalarValue::Int(v));
            }
            if let Ok(Some(v)) = decode::<f64>(row, alias) {
                return Ok(ScalarValue::Float(v));
            }
            if let Ok(Some(v)) = decode::<String>(row, alias) {
                return Ok(ScalarValue::Text(v));
            }
            if let Ok(Some(v)) = decode::<Vec<u8>>(row, alias) {
                return Ok(ScalarValue::Bytes(v));
            }
            Ok(ScalarValue::Null)
        }
    }
}

fn decode<T: TryGetable>(row: &QueryResult, alias: &str) -> Result<Option<T>> {
    row.try_get::<Option<T>>("", alias)
        .map_err(|e| Error::wrap(tenkit_errors::ErrorCode::Internal, "failed to decode aggregate", e))
}

/// Whether a bound value counts as "zero" for the non-destructive update
/// path: nulls, empty strings/bytes, numeric zero, `false`, and the nil
/// uuid. Temporal values have no zero form beyond null.
pub(crate) fn is_zero_value(value: &Value) -> bool {
    match value {
        Value::Bool(v) => v.is_none_or(|b| !b),
        Value::TinyInt(v) => v.is_none_or(|n| n == 0),
        Value::SmallInt(v) => v.is_none_or(|n| n == 0),
        Value::Int(v) => v.is_none_or(|n| n == 0),
        Value::BigInt(v) => v.is_none_or(|n| n == 0),
        Value::TinyUnsigned(v) => v.is_none_or(|n| n == 0),
        Value::SmallUnsigned(v) => v.is_none_or(|n| n == 0),
        Value::Unsigned(v) => v.is_none_or(|n| n == 0),
        Value::BigUnsigned(v) => v.is_none_or(|n| n == 0),
        Value::Float(v) => v.is_none_or(|f| f == 0.0),
        Value::Double(v) => v.is_none_or(|f| f == 0.0),
        Value::Char(v) => v.is_none(),
        Value::String(v) => v.as_ref().is_none_or(|s| s.is_empty()),
        Value::Bytes(v) => v.as_ref().is_none_or(|b| b.is_empty()),
        Value::Uuid(v) => v.as_ref().is_none_or(|u| u.is_nil()),
        Value::ChronoDate(v) => v.is_none(),
        Value::ChronoTime(v) => v.is_none(),
        Value::ChronoDateTime(v) => v.is_none(),
        Value::ChronoDateTimeUtc(v) => v.is_none(),
        Value::ChronoDateTimeLocal(v) => v.is_none(),
        Value::ChronoDateTimeWithTimeZone(v) => v.is_none(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn zero_values() {
        assert!(is_zero_value(&Value::String(None)));
        assert!(is_zero_value(&Value::String(Some(Box::new(String::new())))));
        assert!(!is_zero_value(&Value::String(Some(Box::new("x".into())))));

        assert!(is_zero_value(&Value::BigInt(Some(0))));
        assert!(!is_zero_value(&Value::BigInt(Some(7))));

        assert!(is_zero_value(&Value::Bool(Some(false))));
        assert!(!is_zero_value(&Value::Bool(Some(true))));

        assert!(is_zero_value(&Value::Uuid(None)));
        assert!(is_zero_value(&Value::Uuid(Some(Box::new(Uuid::nil())))));
        assert!(!is_zero_value(&Value::Uuid(Some(Box::new(Uuid::new_v4())))));

        assert!(is_zero_value(&Value::ChronoDateTimeUtc(None)));
        assert!(is_zero_value(&Value::Double(Some(0.0))));
        assert!(!is_zero_value(&Value::Double(Some(0.5))));
    }

    #[test]
    fn scalar_accessors() {
        assert!(ScalarValue::Null.is_null());
        assert_eq!(ScalarValue::Int(3).as_int(), Some(3));
        assert_eq!(ScalarValue::Int(3).as_float(), Some(3.0));
        assert_eq!(ScalarValue::Float(1.5).as_float(), Some(1.5));
        assert_eq!(ScalarValue::Text("a".into()).as_text(), Some("a"));
        assert_eq!(ScalarValue::Text("a".into()).as_int(), None);
    }
}
