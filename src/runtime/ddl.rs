//! Table DDL for entity descriptors.

use crate::dialect::Dialect;
use crate::entity::{ColumnDefault, EntityDescriptor};
use crate::error::OrmResult;

/// `CREATE TABLE` for `descriptor` in the syntax of `dialect`.
///
/// A generated id becomes the dialect's identity column. `IF NOT EXISTS` is
/// emitted only where the product accepts it.
pub fn create_table_sql(
    dialect: &dyn Dialect,
    descriptor: &EntityDescriptor,
    if_not_exists: bool,
) -> OrmResult<String> {
    descriptor.validate()?;

    let mut inline_primary_key = false;
    let mut definitions: Vec<String> = descriptor
        .columns
        .iter()
        .map(|column| {
            let name = dialect.quote_identifier(&column.name);
            if column.name == descriptor.id_column {
                if descriptor.id_generated {
                    inline_primary_key = dialect.identity_includes_primary_key();
                    format!("{} {}", name, dialect.identity_column(column.logical_type))
                } else {
                    format!("{} {} NOT NULL", name, dialect.column_type(column.logical_type))
                }
            } else {
                let mut definition =
                    format!("{} {}", name, dialect.column_type(column.logical_type));
                if let Some(default) = column.default {
                    definition.push_str(" DEFAULT ");
                    definition.push_str(&default_sql(dialect, default));
                }
                if !column.nullable {
                    definition.push_str(" NOT NULL");
                }
                definition
            }
        })
        .collect();

    if !inline_primary_key {
        definitions.push(format!(
            "PRIMARY KEY ({})",
            dialect.quote_identifier(&descriptor.id_column)
        ));
    }

    let guard = if if_not_exists && dialect.supports_if_not_exists() {
        "IF NOT EXISTS "
    } else {
        ""
    };

    Ok(format!(
        "CREATE TABLE {}{} ({})",
        guard,
        dialect.quote_identifier(&descriptor.table),
        definitions.join(", ")
    ))
}

fn default_sql(dialect: &dyn Dialect, default: ColumnDefault) -> String {
    match default {
        ColumnDefault::Bool(value) => dialect.bool_literal(value).to_string(),
        ColumnDefault::Integer(value) => value.to_string(),
        ColumnDefault::CurrentTimestamp => dialect.current_timestamp().to_string(),
    }
}

pub fn drop_table_sql(
    dialect: &dyn Dialect,
    descriptor: &EntityDescriptor,
    if_exists: bool,
) -> String {
    let guard = if if_exists && dialect.supports_if_not_exists() {
        "IF EXISTS "
    } else {
        ""
    };
    format!(
        "DROP TABLE {}{}",
        guard,
        dialect.quote_identifier(&descriptor.table)
    )
}
