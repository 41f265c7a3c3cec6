//! Oracle adapter (12c and later paging syntax).

use super::{Dialect, LogicalType, PaginationStyle, explicit_default_insert};
use crate::models::Platform;

#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl Dialect for OracleDialect {
    fn platform(&self) -> Platform {
        Platform::Oracle
    }

    fn placeholder(&self, index: usize) -> String {
        format!(":{}", index)
    }

    fn pagination(&self) -> PaginationStyle {
        PaginationStyle::OffsetFetch {
            fetch_keyword: "NEXT",
            requires_order_by: false,
        }
    }

    fn column_type(&self, ty: LogicalType) -> String {
        match ty {
            LogicalType::Bool => "number(1)".to_string(),
            LogicalType::SmallInt => "number(5)".to_string(),
            LogicalType::Integer => "number(10)".to_string(),
            LogicalType::BigInt => "number(19)".to_string(),
            LogicalType::Real => "binary_float".to_string(),
            LogicalType::Double => "binary_double".to_string(),
            LogicalType::Decimal { precision, scale } => format!("number({},{})", precision, scale),
            LogicalType::Varchar(len) => format!("varchar2({})", len),
            LogicalType::Text | LogicalType::Json => "clob".to_string(),
            LogicalType::Binary => "blob".to_string(),
            LogicalType::Date => "date".to_string(),
            LogicalType::Time | LogicalType::Timestamp => "timestamp".to_string(),
            LogicalType::Uuid => "varchar2(40)".to_string(),
        }
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn current_timestamp(&self) -> &'static str {
        "systimestamp"
    }

    fn empty_insert(&self, default_column: Option<&str>) -> String {
        explicit_default_insert(default_column)
    }

    // Oracle 23c added IF NOT EXISTS; earlier releases reject it
    fn supports_if_not_exists(&self) -> bool {
        false
    }
}
