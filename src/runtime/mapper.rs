//! Statements for entity operations.
//!
//! Turns beans and ids into rendered statements for a dialect. Execution
//! lives in `Database`; everything here is pure so it can be shared by the
//! async and blocking sessions and by callers working inside a transaction.

use crate::dialect::{Dialect, LogicalType};
use crate::entity::{self, EntityBean, EntityDescriptor};
use crate::error::{OrmError, OrmResult};
use crate::models::{RowMap, SqlParam};
use crate::statement::{Delete, Expr, Insert, Query, Select, SqlStatement, Update};
use serde_json::Value as JsonValue;

/// A rendered INSERT plus how the generated key, if any, comes back.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInsert {
    pub statement: SqlStatement,
    pub generated_key: Option<GeneratedKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedKey {
    /// The statement ends in RETURNING; read this column from the row.
    Returning(String),
    /// Read the driver-reported last insert id.
    LastInsertId,
}

pub fn insert<T: EntityBean>(dialect: &dyn Dialect, bean: &T) -> OrmResult<PendingInsert> {
    let descriptor = T::descriptor();
    let row = entity::to_row(bean)?;
    let id_missing = row
        .get(&descriptor.id_column)
        .is_none_or(JsonValue::is_null);

    if id_missing && !descriptor.id_generated {
        return Err(OrmError::mapping(
            &descriptor.table,
            format!("Id column '{}' must be set before insert", descriptor.id_column),
        ));
    }

    let mut insert = Insert::table(&descriptor.table);
    for (column, value) in &row {
        if id_missing && *column == descriptor.id_column {
            continue;
        }
        if defers_to_default(&descriptor, column, value) {
            continue;
        }
        insert = insert.value(column, param_for(&descriptor, column, value));
    }

    let generated_key = if id_missing {
        insert = insert.default_column(&descriptor.id_column);
        if dialect.supports_returning() {
            insert = insert.returning(&descriptor.id_column);
            Some(GeneratedKey::Returning(descriptor.id_column.clone()))
        } else {
            Some(GeneratedKey::LastInsertId)
        }
    } else {
        None
    };

    Ok(PendingInsert {
        statement: insert.render(dialect),
        generated_key,
    })
}

/// UPDATE of every non-id column, keyed by the bean's id.
pub fn update<T: EntityBean>(dialect: &dyn Dialect, bean: &T) -> OrmResult<SqlStatement> {
    let descriptor = T::descriptor();
    let id = require_id(bean, &descriptor)?;
    let row = entity::to_row(bean)?;

    let mut update = Update::table(&descriptor.table);
    for (column, value) in &row {
        if *column != descriptor.id_column && !defers_to_default(&descriptor, column, value) {
            update = update.set(column, param_for(&descriptor, column, value));
        }
    }
    update
        .filter(Expr::eq(&descriptor.id_column, id))
        .render(dialect)
}

pub fn delete_by_id(
    dialect: &dyn Dialect,
    descriptor: &EntityDescriptor,
    id: SqlParam,
) -> SqlStatement {
    Delete::table(&descriptor.table)
        .filter(Expr::eq(&descriptor.id_column, id))
        .render(dialect)
}

pub fn select_by_id(
    dialect: &dyn Dialect,
    descriptor: &EntityDescriptor,
    id: SqlParam,
) -> SqlStatement {
    Select::table(&descriptor.table)
        .columns(descriptor.column_names())
        .filter(Expr::eq(&descriptor.id_column, id))
        .render(dialect)
}

pub fn select_where(
    dialect: &dyn Dialect,
    descriptor: &EntityDescriptor,
    query: &Query,
) -> SqlStatement {
    Select::from_query(&descriptor.table, query)
        .columns(descriptor.column_names())
        .render(dialect)
}

/// `COUNT(*) AS total` over the query's filter; ordering and paging are ignored.
pub fn count_where(
    dialect: &dyn Dialect,
    descriptor: &EntityDescriptor,
    query: &Query,
) -> SqlStatement {
    Select::from_query(&descriptor.table, query)
        .count()
        .render(dialect)
}

/// Read the `total` column of a count row.
pub fn count_of(row: Option<&RowMap>) -> OrmResult<u64> {
    let value = row
        .and_then(|r| r.get("total"))
        .ok_or_else(|| OrmError::internal("COUNT query returned no total"))?;
    match value {
        JsonValue::Number(n) => n
            .as_u64()
            .ok_or_else(|| OrmError::internal(format!("Unexpected count value {}", n))),
        JsonValue::String(s) => s
            .parse()
            .map_err(|_| OrmError::internal(format!("Unexpected count value {}", s))),
        other => Err(OrmError::internal(format!("Unexpected count value {}", other))),
    }
}

/// Pull the generated id out of a RETURNING row.
pub fn returned_id(row: Option<RowMap>, column: &str, table: &str) -> OrmResult<JsonValue> {
    row.and_then(|mut r| r.remove(column))
        .filter(|v| !v.is_null())
        .ok_or_else(|| OrmError::mapping(table, format!("INSERT returned no '{}'", column)))
}

fn require_id<T: EntityBean>(bean: &T, descriptor: &EntityDescriptor) -> OrmResult<SqlParam> {
    entity::id_of(bean)?.ok_or_else(|| {
        OrmError::invalid_input(format!(
            "Cannot update {} without a value for '{}'",
            descriptor.table, descriptor.id_column
        ))
    })
}

fn defers_to_default(descriptor: &EntityDescriptor, column: &str, value: &JsonValue) -> bool {
    descriptor
        .find_column(column)
        .is_some_and(|c| c.defers_to_default(value))
}

/// JSON columns are always bound as JSON, even when the value is a scalar.
fn param_for(descriptor: &EntityDescriptor, column: &str, value: &JsonValue) -> SqlParam {
    let is_json = descriptor
        .find_column(column)
        .is_some_and(|c| c.logical_type == LogicalType::Json);
    if is_json && !value.is_null() {
        SqlParam::Json(value.clone())
    } else {
        SqlParam::from(value)
    }
}
