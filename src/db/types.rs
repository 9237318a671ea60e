//! Row-to-JSON conversion.
//!
//! Raw query results are exposed to callers as JSON objects keyed by column
//! name. Conversion is driven by the column's declared type, with a textual
//! fallback for types without a dedicated mapping.

use serde_json::{Map, Number, Value as JsonValue};
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo};

/// A result row rendered as a JSON object.
pub type JsonMap = Map<String, JsonValue>;

fn float_value(v: f64) -> JsonValue {
    Number::from_f64(v).map(JsonValue::Number).unwrap_or(JsonValue::Null)
}

/// Convert a row from any supported database into a JSON object.
pub trait RowToJson {
    fn to_json_map(&self) -> JsonMap;
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> JsonMap {
        let mut map = Map::with_capacity(self.columns().len());
        for (i, column) in self.columns().iter().enumerate() {
            let value = match column.type_info().name() {
                "BOOL" => self
                    .try_get::<Option<bool>, _>(i)
                    .map(|v| v.map(JsonValue::Bool).unwrap_or(JsonValue::Null)),
                "INT2" => self
                    .try_get::<Option<i16>, _>(i)
                    .map(|v| v.map(|n| JsonValue::from(n as i64)).unwrap_or(JsonValue::Null)),
                "INT4" => self
                    .try_get::<Option<i32>, _>(i)
                    .map(|v| v.map(|n| JsonValue::from(n as i64)).unwrap_or(JsonValue::Null)),
                "INT8" => self
                    .try_get::<Option<i64>, _>(i)
                    .map(|v| v.map(JsonValue::from).unwrap_or(JsonValue::Null)),
                "FLOAT4" => self
                    .try_get::<Option<f32>, _>(i)
                    .map(|v| v.map(|n| float_value(n as f64)).unwrap_or(JsonValue::Null)),
                "FLOAT8" => self
                    .try_get::<Option<f64>, _>(i)
                    .map(|v| v.map(float_value).unwrap_or(JsonValue::Null)),
                "JSON" | "JSONB" => self
                    .try_get::<Option<JsonValue>, _>(i)
                    .map(|v| v.unwrap_or(JsonValue::Null)),
                _ => self
                    .try_get::<Option<String>, _>(i)
                    .map(|v| v.map(JsonValue::String).unwrap_or(JsonValue::Null)),
            }
            .unwrap_or(JsonValue::Null);

            map.insert(column.name().to_string(), value);
        }
        map
    }
}

impl RowToJson for SqliteRow {
    fn to_json_map(&self) -> JsonMap {
        let mut map = Map::with_capacity(self.columns().len());
        for (i, column) in self.columns().iter().enumerate() {
            let value = match column.type_info().name() {
                "INTEGER" => self
                    .try_get::<Option<i64>, _>(i)
                    .map(|v| v.map(JsonValue::from).unwrap_or(JsonValue::Null)),
                "REAL" => self
                    .try_get::<Option<f64>, _>(i)
                    .map(|v| v.map(float_value).unwrap_or(JsonValue::Null)),
                "BOOLEAN" => self
                    .try_get::<Option<bool>, _>(i)
                    .map(|v| v.map(JsonValue::Bool).unwrap_or(JsonValue::Null)),
                _ => self
                    .try_get::<Option<String>, _>(i)
                    .map(|v| v.map(JsonValue::String).unwrap_or(JsonValue::Null)),
            }
            // SQLite column types are dynamic; fall back through the numeric
            // decodings before giving up on a value.
            .or_else(|_| {
                self.try_get::<Option<i64>, _>(i)
                    .map(|v| v.map(JsonValue::from).unwrap_or(JsonValue::Null))
            })
            .or_else(|_| {
                self.try_get::<Option<f64>, _>(i)
                    .map(|v| v.map(float_value).unwrap_or(JsonValue::Null))
            })
            .unwrap_or(JsonValue::Null);

            map.insert(column.name().to_string(), value);
        }
        map
    }
}
