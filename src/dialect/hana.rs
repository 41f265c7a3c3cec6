//! SAP HANA adapter.

use super::{Dialect, LogicalType, PaginationStyle, explicit_default_insert};
use crate::models::Platform;

#[derive(Debug, Clone, Copy, Default)]
pub struct HanaDialect;

impl Dialect for HanaDialect {
    fn platform(&self) -> Platform {
        Platform::Hana
    }

    // OFFSET is only accepted after a LIMIT
    fn pagination(&self) -> PaginationStyle {
        PaginationStyle::LimitOffset {
            unbounded: Some("2147483647"),
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
            LogicalType::Varchar(len) => format!("nvarchar({})", len),
            LogicalType::Text | LogicalType::Json => "nclob".to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::append_pagination;

    #[test]
    fn test_offset_requires_limit() {
        let mut sql = "SELECT * FROM t".to_string();
        append_pagination(&HanaDialect, &mut sql, None, Some(10), false);
        assert_eq!(sql, "SELECT * FROM t LIMIT 2147483647 OFFSET 10");
    }

    #[test]
    fn test_hana_types() {
        assert_eq!(HanaDialect.column_type(LogicalType::Varchar(20)), "nvarchar(20)");
    }

    #[test]
    fn test_empty_insert_has_no_default_values_form() {
        assert_eq!(HanaDialect.empty_insert(Some("id")), "(id) VALUES (DEFAULT)");
    }
}
