//! Derby adapter.

use super::{Dialect, LogicalType, PaginationStyle, explicit_default_insert};
use crate::models::Platform;

#[derive(Debug, Clone, Copy, Default)]
pub struct DerbyDialect;

impl Dialect for DerbyDialect {
    fn platform(&self) -> Platform {
        Platform::Derby
    }

    fn pagination(&self) -> PaginationStyle {
        PaginationStyle::OffsetFetch {
            fetch_keyword: "FIRST",
            requires_order_by: false,
        }
    }

    fn column_type(&self, ty: LogicalType) -> String {
        match ty {
            LogicalType::Bool => "boolean".to_string(),
            LogicalType::SmallInt => "smallint".to_string(),
            LogicalType::Integer => "integer".to_string(),
            LogicalType::BigInt => "bigint".to_string(),
            LogicalType::Real => "real".to_string(),
            LogicalType::Double => "double".to_string(),
            LogicalType::Decimal { precision, scale } => {
                format!("decimal({},{})", precision, scale)
            }
            LogicalType::Varchar(len) => format!("varchar({})", len),
            LogicalType::Text | LogicalType::Json => "clob".to_string(),
            LogicalType::Binary => "blob".to_string(),
            LogicalType::Date => "date".to_string(),
            LogicalType::Time => "time".to_string(),
            LogicalType::Timestamp => "timestamp".to_string(),
            LogicalType::Uuid => "varchar(40)".to_string(),
        }
    }

    fn empty_insert(&self, default_column: Option<&str>) -> String {
        explicit_default_insert(default_column)
    }

    fn supports_if_not_exists(&self) -> bool {
        false
    }
}
