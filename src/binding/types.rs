//! Row decoding.
//!
//! Driver rows are turned into `RowMap`s in two steps:
//! 1. `categorize_type` sorts the column's reported type name into a category
//! 2. a per-driver decoder extracts the value for that category
//!
//! Decimals and temporal values are rendered as strings (exact digits,
//! ISO-8601) and binary values as base64, so every row is plain JSON
//! regardless of the product.

use crate::models::{ColumnMetadata, RowMap};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
}

/// Classify a driver type name.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }
    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }
    if lower.contains("int") || lower.contains("serial") {
        return TypeCategory::Integer;
    }
    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }
    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }
    if lower == "uuid" {
        return TypeCategory::Uuid;
    }
    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }
    match lower.as_str() {
        "date" => TypeCategory::Date,
        "time" | "timetz" => TypeCategory::Time,
        "timestamptz" => TypeCategory::TimestampTz,
        "timestamp" | "datetime" => TypeCategory::Timestamp,
        _ => TypeCategory::Text,
    }
}

pub fn encode_binary(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    JsonValue::String(STANDARD.encode(bytes))
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// Convert a driver row to JSON.
pub trait RowToJson {
    fn to_row_map(&self) -> RowMap;
    fn column_metadata(&self) -> Vec<ColumnMetadata>;
}

macro_rules! impl_row_to_json {
    ($row:ty, $decoder:path) => {
        impl RowToJson for $row {
            fn to_row_map(&self) -> RowMap {
                self.columns()
                    .iter()
                    .enumerate()
                    .map(|(idx, col)| {
                        let type_name = col.type_info().name();
                        let value = $decoder(self, idx, type_name, categorize_type(type_name));
                        (col.name().to_string(), value)
                    })
                    .collect()
            }

            fn column_metadata(&self) -> Vec<ColumnMetadata> {
                self.columns()
                    .iter()
                    .map(|col| {
                        ColumnMetadata::new(
                            col.name(),
                            col.type_info().name(),
                            !col.type_info().is_null(),
                        )
                    })
                    .collect()
            }
        }
    };
}

impl_row_to_json!(MySqlRow, mysql::decode_column);
impl_row_to_json!(PgRow, postgres::decode_column);
impl_row_to_json!(SqliteRow, sqlite::decode_column);

/// Decode `idx` as `Option<T>` and map it, treating decode failures as NULL.
fn get_as<'r, R, T>(row: &'r R, idx: usize, f: impl FnOnce(T) -> JsonValue) -> Option<JsonValue>
where
    R: Row,
    usize: sqlx::ColumnIndex<R>,
    T: Decode<'r, R::Database> + Type<R::Database>,
{
    match row.try_get::<Option<T>, _>(idx) {
        Ok(Some(v)) => Some(f(v)),
        Ok(None) => Some(JsonValue::Null),
        Err(_) => None,
    }
}

mod mysql {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> JsonValue {
        let value = match category {
            TypeCategory::Decimal => {
                get_as::<_, Decimal>(row, idx, |v| JsonValue::String(v.to_string()))
            }
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => get_as::<_, bool>(row, idx, JsonValue::Bool),
            TypeCategory::Float => get_as::<_, f64>(row, idx, float_value)
                .or_else(|| get_as::<_, f32>(row, idx, |v| float_value(v as f64))),
            TypeCategory::Binary => get_as::<_, Vec<u8>>(row, idx, |v| encode_binary(&v)),
            TypeCategory::Json => get_as::<_, JsonValue>(row, idx, |v| v),
            TypeCategory::Date => {
                get_as::<_, NaiveDate>(row, idx, |v| JsonValue::String(v.to_string()))
            }
            TypeCategory::Time => {
                get_as::<_, NaiveTime>(row, idx, |v| JsonValue::String(v.to_string()))
            }
            TypeCategory::Timestamp | TypeCategory::TimestampTz => {
                // MySQL TIMESTAMP is UTC on the wire; DATETIME has no zone
                get_as::<_, DateTime<Utc>>(row, idx, |v| JsonValue::String(v.to_rfc3339()))
                    .or_else(|| {
                        get_as::<_, NaiveDateTime>(row, idx, |v| {
                            JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
                        })
                    })
            }
            TypeCategory::Uuid | TypeCategory::Text => None,
        };
        value.unwrap_or_else(|| decode_text(row, idx, type_name))
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
        get_as::<_, i64>(row, idx, JsonValue::from)
            .or_else(|| get_as::<_, i32>(row, idx, JsonValue::from))
            .or_else(|| get_as::<_, i16>(row, idx, JsonValue::from))
            .or_else(|| get_as::<_, i8>(row, idx, JsonValue::from))
            .or_else(|| get_as::<_, u64>(row, idx, JsonValue::from))
            .or_else(|| get_as::<_, u32>(row, idx, JsonValue::from))
            .or_else(|| get_as::<_, u16>(row, idx, JsonValue::from))
            .or_else(|| get_as::<_, u8>(row, idx, JsonValue::from))
    }

    fn decode_text(row: &MySqlRow, idx: usize, type_name: &str) -> JsonValue {
        match row.try_get::<Option<String>, _>(idx) {
            Ok(Some(v)) if type_name.to_lowercase().contains("json") => {
                serde_json::from_str(&v).unwrap_or(JsonValue::String(v))
            }
            Ok(Some(v)) => JsonValue::String(v),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::warn!(
                    column = idx,
                    type_name = %type_name,
                    error = %e,
                    "Undecodable column"
                );
                JsonValue::Null
            }
        }
    }
}

mod postgres {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> JsonValue {
        let value = match category {
            TypeCategory::Decimal => {
                get_as::<_, Decimal>(row, idx, |v| JsonValue::String(v.to_string()))
            }
            TypeCategory::Integer => get_as::<_, i64>(row, idx, JsonValue::from)
                .or_else(|| get_as::<_, i32>(row, idx, JsonValue::from))
                .or_else(|| get_as::<_, i16>(row, idx, JsonValue::from)),
            TypeCategory::Boolean => get_as::<_, bool>(row, idx, JsonValue::Bool),
            TypeCategory::Float => get_as::<_, f64>(row, idx, float_value)
                .or_else(|| get_as::<_, f32>(row, idx, |v| float_value(v as f64))),
            TypeCategory::Binary => get_as::<_, Vec<u8>>(row, idx, |v| encode_binary(&v)),
            TypeCategory::Json => get_as::<_, JsonValue>(row, idx, |v| v),
            TypeCategory::Uuid => {
                get_as::<_, uuid::Uuid>(row, idx, |v| JsonValue::String(v.to_string()))
            }
            TypeCategory::Date => {
                get_as::<_, NaiveDate>(row, idx, |v| JsonValue::String(v.to_string()))
            }
            TypeCategory::Time => {
                get_as::<_, NaiveTime>(row, idx, |v| JsonValue::String(v.to_string()))
            }
            TypeCategory::Timestamp => get_as::<_, NaiveDateTime>(row, idx, |v| {
                JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }),
            TypeCategory::TimestampTz => {
                get_as::<_, DateTime<Utc>>(row, idx, |v| JsonValue::String(v.to_rfc3339()))
            }
            TypeCategory::Text => None,
        };
        value.unwrap_or_else(|| decode_text(row, idx, type_name))
    }

    fn decode_text(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
        match row.try_get::<Option<String>, _>(idx) {
            Ok(Some(v)) => JsonValue::String(v),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::warn!(
                    column = idx,
                    type_name = %type_name,
                    error = %e,
                    "Undecodable column"
                );
                JsonValue::Null
            }
        }
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(
        row: &SqliteRow,
        idx: usize,
        _type_name: &str,
        category: TypeCategory,
    ) -> JsonValue {
        let value = match category {
            TypeCategory::Integer => get_as::<_, i64>(row, idx, JsonValue::from),
            TypeCategory::Boolean => get_as::<_, bool>(row, idx, JsonValue::Bool),
            TypeCategory::Float | TypeCategory::Decimal => get_as::<_, f64>(row, idx, float_value),
            TypeCategory::Binary => get_as::<_, Vec<u8>>(row, idx, |v| encode_binary(&v)),
            // SQLite has no native JSON, date or uuid storage; these are text
            _ => None,
        };
        value.unwrap_or_else(|| decode_dynamic(row, idx))
    }

    /// Fall back on the value's storage class for untyped columns
    /// (expressions, NULL-typed results, text-affinity dates).
    fn decode_dynamic(row: &SqliteRow, idx: usize) -> JsonValue {
        if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
            return JsonValue::String(v);
        }
        get_as::<_, i64>(row, idx, JsonValue::from)
            .or_else(|| get_as::<_, f64>(row, idx, float_value))
            .or_else(|| get_as::<_, Vec<u8>>(row, idx, |v| encode_binary(&v)))
            .unwrap_or(JsonValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type() {
        assert_eq!(categorize_type("INT"), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT"), TypeCategory::Integer);
        assert_eq!(categorize_type("TINYINT"), TypeCategory::Integer);
        assert_eq!(categorize_type("DECIMAL"), TypeCategory::Decimal);
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Decimal);
        assert_eq!(categorize_type("BOOLEAN"), TypeCategory::Boolean);
        assert_eq!(categorize_type("FLOAT8"), TypeCategory::Float);
        assert_eq!(categorize_type("REAL"), TypeCategory::Float);
        assert_eq!(categorize_type("JSONB"), TypeCategory::Json);
        assert_eq!(categorize_type("UUID"), TypeCategory::Uuid);
        assert_eq!(categorize_type("BYTEA"), TypeCategory::Binary);
        assert_eq!(categorize_type("TIMESTAMPTZ"), TypeCategory::TimestampTz);
        assert_eq!(categorize_type("DATETIME"), TypeCategory::Timestamp);
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("NULL"), TypeCategory::Text);
    }

    #[test]
    fn test_encode_binary() {
        assert_eq!(
            encode_binary(b"hello world"),
            JsonValue::String("aGVsbG8gd29ybGQ=".to_string())
        );
        assert_eq!(encode_binary(&[]), JsonValue::String(String::new()));
    }

    #[test]
    fn test_float_value_non_finite() {
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
        assert_eq!(float_value(f64::NAN), JsonValue::String("NaN".to_string()));
    }
}
