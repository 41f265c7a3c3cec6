//! PostgreSQL adapter.

use super::{Dialect, LogicalType};
use crate::models::Platform;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn platform(&self) -> Platform {
        Platform::PostgreSQL
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn column_type(&self, ty: LogicalType) -> String {
        match ty {
            LogicalType::Bool => "boolean".to_string(),
            LogicalType::SmallInt => "smallint".to_string(),
            LogicalType::Integer => "integer".to_string(),
            LogicalType::BigInt => "bigint".to_string(),
            LogicalType::Real => "real".to_string(),
            LogicalType::Double => "double precision".to_string(),
            LogicalType::Decimal { precision, scale } => {
                format!("decimal({},{})", precision, scale)
            }
            LogicalType::Varchar(len) => format!("varchar({})", len),
            LogicalType::Text => "text".to_string(),
            LogicalType::Binary => "bytea".to_string(),
            LogicalType::Date => "date".to_string(),
            LogicalType::Time => "time".to_string(),
            LogicalType::Timestamp => "timestamptz".to_string(),
            LogicalType::Uuid => "uuid".to_string(),
            LogicalType::Json => "jsonb".to_string(),
        }
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn json_as_text(&self) -> bool {
        false
    }

    fn parser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        Box::new(sqlparser::dialect::PostgreSqlDialect {})
    }
}
