//! SQLite adapter.

use super::{Dialect, LogicalType, PaginationStyle};
use crate::models::Platform;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn platform(&self) -> Platform {
        Platform::SQLite
    }

    fn pagination(&self) -> PaginationStyle {
        PaginationStyle::LimitOffset {
            unbounded: Some("-1"),
        }
    }

    fn column_type(&self, ty: LogicalType) -> String {
        match ty {
            LogicalType::Bool => "boolean".to_string(),
            LogicalType::SmallInt => "smallint".to_string(),
            LogicalType::Integer | LogicalType::BigInt => "integer".to_string(),
            LogicalType::Real | LogicalType::Double => "real".to_string(),
            LogicalType::Decimal { precision, scale } => {
                format!("decimal({},{})", precision, scale)
            }
            LogicalType::Varchar(len) => format!("varchar({})", len),
            LogicalType::Text => "text".to_string(),
            LogicalType::Binary => "blob".to_string(),
            LogicalType::Date => "date".to_string(),
            LogicalType::Time => "time".to_string(),
            LogicalType::Timestamp => "timestamp".to_string(),
            LogicalType::Uuid => "varchar(40)".to_string(),
            LogicalType::Json => "json".to_string(),
        }
    }

    // Only an INTEGER PRIMARY KEY column aliases the rowid
    fn identity_column(&self, _ty: LogicalType) -> String {
        "integer primary key autoincrement".to_string()
    }

    fn identity_includes_primary_key(&self) -> bool {
        true
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn parser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        Box::new(sqlparser::dialect::SQLiteDialect {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::append_pagination;

    #[test]
    fn test_offset_without_limit() {
        let mut sql = "SELECT * FROM t".to_string();
        append_pagination(&SqliteDialect, &mut sql, None, Some(2), false);
        assert_eq!(sql, "SELECT * FROM t LIMIT -1 OFFSET 2");
    }

    #[test]
    fn test_identity_declares_primary_key() {
        assert!(SqliteDialect.identity_includes_primary_key());
        assert_eq!(
            SqliteDialect.identity_column(LogicalType::BigInt),
            "integer primary key autoincrement"
        );
    }
}
