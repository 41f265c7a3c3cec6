//! SQL Server adapter.

use super::{Dialect, LogicalType, PaginationStyle};
use crate::models::Platform;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn platform(&self) -> Platform {
        Platform::SqlServer
    }

    fn quote_chars(&self) -> (char, char) {
        ('[', ']')
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{}", index)
    }

    fn pagination(&self) -> PaginationStyle {
        PaginationStyle::OffsetFetch {
            fetch_keyword: "NEXT",
            requires_order_by: true,
        }
    }

    fn column_type(&self, ty: LogicalType) -> String {
        match ty {
            LogicalType::Bool => "bit".to_string(),
            LogicalType::SmallInt => "smallint".to_string(),
            LogicalType::Integer => "integer".to_string(),
            LogicalType::BigInt => "bigint".to_string(),
            LogicalType::Real => "real".to_string(),
            LogicalType::Double => "float(32)".to_string(),
            LogicalType::Decimal { precision, scale } => {
                format!("numeric({},{})", precision, scale)
            }
            LogicalType::Varchar(len) => format!("nvarchar({})", len),
            LogicalType::Text | LogicalType::Json => "nvarchar(max)".to_string(),
            LogicalType::Binary => "varbinary(max)".to_string(),
            LogicalType::Date => "date".to_string(),
            LogicalType::Time => "time".to_string(),
            LogicalType::Timestamp => "datetime2".to_string(),
            LogicalType::Uuid => "uniqueidentifier".to_string(),
        }
    }

    fn identity_column(&self, ty: LogicalType) -> String {
        format!("{} identity(1,1)", self.column_type(ty))
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn supports_if_not_exists(&self) -> bool {
        false
    }

    fn parser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        Box::new(sqlparser::dialect::MsSqlDialect {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::append_pagination;

    #[test]
    fn test_bracket_quoting() {
        assert_eq!(SqlServerDialect.quote_identifier("user"), "[user]");
        assert_eq!(SqlServerDialect.placeholder(2), "@p2");
    }

    #[test]
    fn test_paging_adds_order_by_when_missing() {
        let mut sql = "SELECT * FROM t".to_string();
        append_pagination(&SqlServerDialect, &mut sql, Some(5), None, false);
        assert_eq!(
            sql,
            "SELECT * FROM t ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }

    #[test]
    fn test_paging_keeps_existing_order_by() {
        let mut sql = "SELECT * FROM t ORDER BY id".to_string();
        append_pagination(&SqlServerDialect, &mut sql, None, Some(40), true);
        assert_eq!(sql, "SELECT * FROM t ORDER BY id OFFSET 40 ROWS");
    }

    #[test]
    fn test_identity() {
        assert_eq!(
            SqlServerDialect.identity_column(LogicalType::BigInt),
            "bigint identity(1,1)"
        );
    }
}
