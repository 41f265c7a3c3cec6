//! Entity beans and their mapping to rows.
//!
//! An entity bean is any serde-serializable struct that can describe the
//! table it lives in. Mapping goes through `serde_json`: a bean serializes
//! to an object whose keys are column names, and a decoded [`RowMap`]
//! deserializes back after a few per-type coercions that smooth over driver
//! differences (SQLite has no boolean or JSON storage, NUMERIC decodes as
//! text).

use crate::dialect::{Dialect, LogicalType};
use crate::error::{OrmError, OrmResult};
use crate::models::{RowMap, SqlParam};
use serde::de::value::MapDeserializer;
use serde::de::{DeserializeOwned, Deserializer, IntoDeserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Database-side default for a column, rendered per dialect in DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDefault {
    Bool(bool),
    Integer(i64),
    CurrentTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
    /// A null bean value for this column is left to the database default.
    pub default: Option<ColumnDefault>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            nullable: false,
            default: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    /// True when a null value should be omitted from writes.
    pub fn defers_to_default(&self, value: &JsonValue) -> bool {
        value.is_null() && self.default.is_some()
    }
}

/// Table layout of an entity. `columns` includes the id column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub table: String,
    pub id_column: String,
    /// The database (or memory repository) assigns ids to new beans.
    pub id_generated: bool,
    pub columns: Vec<ColumnDescriptor>,
}

impl EntityDescriptor {
    pub fn new(table: impl Into<String>, id_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id_column: id_column.into(),
            id_generated: false,
            columns: Vec::new(),
        }
    }

    pub fn generated_id(mut self) -> Self {
        self.id_generated = true;
        self
    }

    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn id_descriptor(&self) -> Option<&ColumnDescriptor> {
        self.find_column(&self.id_column)
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn validate(&self) -> OrmResult<()> {
        if self.columns.is_empty() {
            return Err(OrmError::schema("Entity declares no columns", &self.table));
        }
        if self.id_descriptor().is_none() {
            return Err(OrmError::schema(
                format!("Id column '{}' is not among the declared columns", self.id_column),
                &self.table,
            ));
        }
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(OrmError::schema(
                    format!("Column '{}' is declared twice", column.name),
                    &self.table,
                ));
            }
        }
        Ok(())
    }
}

/// A domain object persisted through a repository.
pub trait EntityBean: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn descriptor() -> EntityDescriptor;
}

/// Serialize `bean` into a row holding exactly the declared columns.
pub fn to_row<T: EntityBean>(bean: &T) -> OrmResult<RowMap> {
    let descriptor = T::descriptor();
    let mut object = to_object(bean, &descriptor)?;

    let mut row = RowMap::new();
    for column in &descriptor.columns {
        let value = object.remove(&column.name).unwrap_or(JsonValue::Null);
        if value.is_null()
            && !column.nullable
            && column.default.is_none()
            && column.name != descriptor.id_column
        {
            return Err(OrmError::mapping(
                &descriptor.table,
                format!("Column '{}' is not nullable", column.name),
            ));
        }
        row.insert(column.name.clone(), value);
    }
    Ok(row)
}

/// Deserialize a row decoded through `dialect` into a bean.
///
/// Decimal columns stay exact text in the row. A float field parses the text
/// when it is read, while string and decimal fields keep every digit.
pub fn from_row<T: EntityBean>(mut row: RowMap, dialect: &dyn Dialect) -> OrmResult<T> {
    let descriptor = T::descriptor();
    let json_as_text = dialect.json_as_text();
    for column in &descriptor.columns {
        if let Some(value) = row.get_mut(&column.name) {
            coerce(value, column.logical_type, json_as_text);
        }
    }

    let fields = MapDeserializer::new(row.into_iter().map(|(k, v)| (k, ColumnValue(v))));
    T::deserialize(fields).map_err(|e: serde_json::Error| {
        OrmError::mapping(&descriptor.table, e.to_string())
    })
}

/// The bean's id, or `None` when it has not been assigned yet.
pub fn id_of<T: EntityBean>(bean: &T) -> OrmResult<Option<SqlParam>> {
    let descriptor = T::descriptor();
    let mut object = to_object(bean, &descriptor)?;
    match object.remove(&descriptor.id_column) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => Ok(Some(SqlParam::from(value))),
    }
}

/// A copy of `bean` with its id set to `id`.
pub fn with_id<T: EntityBean>(bean: &T, id: impl Into<JsonValue>) -> OrmResult<T> {
    let descriptor = T::descriptor();
    let mut object = to_object(bean, &descriptor)?;
    object.insert(descriptor.id_column.clone(), id.into());
    serde_json::from_value(JsonValue::Object(object))
        .map_err(|e| OrmError::mapping(&descriptor.table, e.to_string()))
}

fn to_object<T: Serialize>(bean: &T, descriptor: &EntityDescriptor) -> OrmResult<RowMap> {
    match serde_json::to_value(bean) {
        Ok(JsonValue::Object(object)) => Ok(object),
        Ok(other) => Err(OrmError::mapping(
            &descriptor.table,
            format!("Bean serialized to {} instead of an object", json_kind(&other)),
        )),
        Err(e) => Err(OrmError::mapping(&descriptor.table, e.to_string())),
    }
}

fn coerce(value: &mut JsonValue, ty: LogicalType, json_as_text: bool) {
    let replacement = match (ty, &*value) {
        (LogicalType::Bool, JsonValue::Number(n)) => n.as_i64().map(|v| JsonValue::Bool(v != 0)),
        (LogicalType::Bool, JsonValue::String(s)) => match s.as_str() {
            "true" | "t" | "1" => Some(JsonValue::Bool(true)),
            "false" | "f" | "0" => Some(JsonValue::Bool(false)),
            _ => None,
        },
        (LogicalType::Json, JsonValue::String(s)) if json_as_text => serde_json::from_str(s).ok(),
        _ => None,
    };
    if let Some(v) = replacement {
        *value = v;
    }
}

/// A decoded column value that also reads numeric text as a float.
struct ColumnValue(JsonValue);

impl<'de> IntoDeserializer<'de, serde_json::Error> for ColumnValue {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! delegate_to_value {
    ($($method:ident),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                self.0.$method(visitor)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for ColumnValue {
    type Error = serde_json::Error;

    delegate_to_value!(
        deserialize_any,
        deserialize_bool,
        deserialize_i8,
        deserialize_i16,
        deserialize_i32,
        deserialize_i64,
        deserialize_u8,
        deserialize_u16,
        deserialize_u32,
        deserialize_u64,
        deserialize_char,
        deserialize_str,
        deserialize_string,
        deserialize_bytes,
        deserialize_byte_buf,
        deserialize_unit,
        deserialize_seq,
        deserialize_map,
        deserialize_identifier,
        deserialize_ignored_any,
    );

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            JsonValue::String(text) => match text.parse::<f64>() {
                Ok(number) => visitor.visit_f64(number),
                Err(_) => visitor.visit_string(text),
            },
            other => other.deserialize_f64(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            JsonValue::Null => visitor.visit_none(),
            other => visitor.visit_some(ColumnValue(other)),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.deserialize_unit_struct(name, visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.deserialize_newtype_struct(name, visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.deserialize_tuple(len, visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.deserialize_tuple_struct(name, len, visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.deserialize_struct(name, fields, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.deserialize_enum(name, variants, visitor)
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SqliteDialect};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Product {
        id: Option<i64>,
        name: String,
        in_stock: bool,
        price: f64,
        tags: JsonValue,
    }

    impl EntityBean for Product {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::new("product", "id")
                .generated_id()
                .column(ColumnDescriptor::new("id", LogicalType::BigInt))
                .column(ColumnDescriptor::new("name", LogicalType::Varchar(100)))
                .column(ColumnDescriptor::new("in_stock", LogicalType::Bool))
                .column(ColumnDescriptor::new(
                    "price",
                    LogicalType::Decimal {
                        precision: 10,
                        scale: 2,
                    },
                ))
                .column(ColumnDescriptor::new("tags", LogicalType::Json).nullable())
        }
    }

    fn widget() -> Product {
        Product {
            id: None,
            name: "widget".to_string(),
            in_stock: true,
            price: 9.5,
            tags: json!(["a", "b"]),
        }
    }

    #[test]
    fn test_descriptor_validates() {
        assert!(Product::descriptor().validate().is_ok());

        let missing_id = EntityDescriptor::new("t", "id")
            .column(ColumnDescriptor::new("name", LogicalType::Text));
        assert!(matches!(missing_id.validate(), Err(OrmError::Schema { .. })));
    }

    #[test]
    fn test_to_row_keeps_declared_columns() {
        let row = to_row(&widget()).unwrap();
        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys.len(), 5);
        assert_eq!(row["id"], JsonValue::Null);
        assert_eq!(row["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_from_row_coerces_driver_values() {
        // As SQLite and a text-decoded NUMERIC would return it
        let mut row = RowMap::new();
        row.insert("id".into(), json!(4));
        row.insert("name".into(), json!("widget"));
        row.insert("in_stock".into(), json!(1));
        row.insert("price".into(), json!("9.50"));
        row.insert("tags".into(), json!("[\"a\",\"b\"]"));

        let product: Product = from_row(row, &SqliteDialect).unwrap();
        assert_eq!(product.id, Some(4));
        assert!(product.in_stock);
        assert_eq!(product.price, 9.5);
        assert_eq!(product.tags, json!(["a", "b"]));
    }

    #[test]
    fn test_from_row_reports_mapping_error() {
        let mut row = RowMap::new();
        row.insert("id".into(), json!(1));
        let result: OrmResult<Product> = from_row(row, &SqliteDialect);
        assert!(matches!(result, Err(OrmError::Mapping { .. })));
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Ledger {
        id: i64,
        amount: String,
        rate: f64,
        meta: JsonValue,
    }

    impl EntityBean for Ledger {
        fn descriptor() -> EntityDescriptor {
            let decimal = LogicalType::Decimal {
                precision: 30,
                scale: 2,
            };
            EntityDescriptor::new("ledger", "id")
                .column(ColumnDescriptor::new("id", LogicalType::BigInt))
                .column(ColumnDescriptor::new("amount", decimal))
                .column(ColumnDescriptor::new("rate", decimal))
                .column(ColumnDescriptor::new("meta", LogicalType::Json))
        }
    }

    fn ledger_row(amount: &str, rate: &str, meta: JsonValue) -> RowMap {
        let mut row = RowMap::new();
        row.insert("id".into(), json!(1));
        row.insert("amount".into(), json!(amount));
        row.insert("rate".into(), json!(rate));
        row.insert("meta".into(), meta);
        row
    }

    #[test]
    fn test_exact_decimal_text_survives() {
        let row = ledger_row("12345678901234567.89", "0.25", json!({}));
        let ledger: Ledger = from_row(row, &PostgresDialect).unwrap();
        assert_eq!(ledger.amount, "12345678901234567.89");
        assert_eq!(ledger.rate, 0.25);

        // Short decimals still fit a string field
        let row = ledger_row("10.50", "1.5", json!({}));
        let ledger: Ledger = from_row(row, &PostgresDialect).unwrap();
        assert_eq!(ledger.amount, "10.50");
    }

    #[test]
    fn test_float_field_reads_decimal_text() {
        let row = ledger_row("1", "12345678901234567.89", json!({}));
        let ledger: Ledger = from_row(row, &PostgresDialect).unwrap();
        assert_eq!(ledger.rate, "12345678901234567.89".parse::<f64>().unwrap());

        let row = ledger_row("1", "n/a", json!({}));
        let result: OrmResult<Ledger> = from_row(row, &PostgresDialect);
        assert!(matches!(result, Err(OrmError::Mapping { .. })));
    }

    #[test]
    fn test_json_string_reparsed_only_for_text_drivers() {
        let native = ledger_row("1", "1", json!("42"));
        let ledger: Ledger = from_row(native, &PostgresDialect).unwrap();
        assert_eq!(ledger.meta, json!("42"));

        let text = ledger_row("1", "1", json!("42"));
        let ledger: Ledger = from_row(text, &SqliteDialect).unwrap();
        assert_eq!(ledger.meta, json!(42));
    }

    #[test]
    fn test_id_helpers() {
        let product = widget();
        assert_eq!(id_of(&product).unwrap(), None);

        let saved = with_id(&product, 12).unwrap();
        assert_eq!(saved.id, Some(12));
        assert_eq!(id_of(&saved).unwrap(), Some(SqlParam::Int(12)));
    }
}
