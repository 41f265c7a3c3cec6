//! MySQL and MariaDB adapters.
//!
//! MariaDB shares MySQL's syntax for everything the statement builder emits.
//! Its `uuid` type is native, and its `json` columns are longtext aliases
//! that decode as text.

use super::{Dialect, LogicalType, PaginationStyle};
use crate::models::Platform;

/// LIMIT value standing in for "no limit" (the largest unsigned BIGINT).
const UNBOUNDED_LIMIT: &str = "18446744073709551615";

fn mysql_column_type(ty: LogicalType) -> String {
    match ty {
        LogicalType::Bool => "tinyint(1)".to_string(),
        LogicalType::SmallInt => "smallint".to_string(),
        LogicalType::Integer => "integer".to_string(),
        LogicalType::BigInt => "bigint".to_string(),
        LogicalType::Real => "float".to_string(),
        LogicalType::Double => "double".to_string(),
        LogicalType::Decimal { precision, scale } => format!("decimal({},{})", precision, scale),
        LogicalType::Varchar(len) => format!("varchar({})", len),
        LogicalType::Text => "longtext".to_string(),
        LogicalType::Binary => "longblob".to_string(),
        LogicalType::Date => "date".to_string(),
        LogicalType::Time => "time".to_string(),
        LogicalType::Timestamp => "datetime(6)".to_string(),
        LogicalType::Uuid => "varchar(40)".to_string(),
        LogicalType::Json => "json".to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn platform(&self) -> Platform {
        Platform::MySQL
    }

    fn quote_chars(&self) -> (char, char) {
        ('`', '`')
    }

    fn pagination(&self) -> PaginationStyle {
        PaginationStyle::LimitOffset {
            unbounded: Some(UNBOUNDED_LIMIT),
        }
    }

    fn column_type(&self, ty: LogicalType) -> String {
        mysql_column_type(ty)
    }

    fn identity_column(&self, ty: LogicalType) -> String {
        format!("{} auto_increment", self.column_type(ty))
    }

    fn current_timestamp(&self) -> &'static str {
        "now(6)"
    }

    fn json_as_text(&self) -> bool {
        false
    }

    fn empty_insert(&self, _default_column: Option<&str>) -> String {
        "() VALUES ()".to_string()
    }

    fn parser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        Box::new(sqlparser::dialect::MySqlDialect {})
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MariaDbDialect;

impl Dialect for MariaDbDialect {
    fn platform(&self) -> Platform {
        Platform::MariaDB
    }

    fn quote_chars(&self) -> (char, char) {
        MySqlDialect.quote_chars()
    }

    fn pagination(&self) -> PaginationStyle {
        MySqlDialect.pagination()
    }

    fn column_type(&self, ty: LogicalType) -> String {
        match ty {
            LogicalType::Uuid => "uuid".to_string(),
            other => mysql_column_type(other),
        }
    }

    fn identity_column(&self, ty: LogicalType) -> String {
        format!("{} auto_increment", self.column_type(ty))
    }

    fn current_timestamp(&self) -> &'static str {
        MySqlDialect.current_timestamp()
    }

    fn empty_insert(&self, default_column: Option<&str>) -> String {
        MySqlDialect.empty_insert(default_column)
    }

    fn parser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        MySqlDialect.parser_dialect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::append_pagination;

    #[test]
    fn test_json_decoding_differs() {
        assert!(!MySqlDialect.json_as_text());
        assert!(MariaDbDialect.json_as_text());
    }

    #[test]
    fn test_backtick_quoting() {
        assert_eq!(MySqlDialect.quote_identifier("order"), "`order`");
        assert_eq!(MariaDbDialect.quote_identifier("Name"), "`Name`");
        assert_eq!(MySqlDialect.quote_identifier("name"), "name");
    }

    #[test]
    fn test_offset_without_limit() {
        let mut sql = "SELECT * FROM t".to_string();
        append_pagination(&MySqlDialect, &mut sql, None, Some(5), false);
        assert_eq!(sql, "SELECT * FROM t LIMIT 18446744073709551615 OFFSET 5");
    }

    #[test]
    fn test_auto_increment_identity() {
        assert_eq!(
            MySqlDialect.identity_column(LogicalType::BigInt),
            "bigint auto_increment"
        );
    }

    #[test]
    fn test_mariadb_uuid() {
        assert_eq!(MariaDbDialect.column_type(LogicalType::Uuid), "uuid");
        assert_eq!(MySqlDialect.column_type(LogicalType::Uuid), "varchar(40)");
        assert_eq!(MariaDbDialect.platform(), Platform::MariaDB);
    }
}
