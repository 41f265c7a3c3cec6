//! Dialect adapters.
//!
//! One adapter per database product. An adapter turns the database-agnostic
//! pieces produced by the statement builder (identifiers, bind positions,
//! paging, column types) into product-specific SQL text.

mod derby;
mod h2;
mod hana;
mod mysql;
mod oracle;
mod postgres;
mod sqlite;
mod sqlserver;

pub use derby::DerbyDialect;
pub use h2::H2Dialect;
pub use hana::HanaDialect;
pub use mysql::{MariaDbDialect, MySqlDialect};
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

use crate::models::Platform;
use std::sync::Arc;

/// Database-agnostic column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    Bool,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal { precision: u8, scale: u8 },
    Varchar(u32),
    Text,
    Binary,
    Date,
    Time,
    Timestamp,
    Uuid,
    Json,
}

/// How a product expresses row limits and offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    /// `LIMIT n OFFSET m`. `unbounded` is the LIMIT value used when only an
    /// offset is requested; `None` means `OFFSET` may stand alone.
    LimitOffset { unbounded: Option<&'static str> },
    /// `OFFSET m ROWS FETCH <keyword> n ROWS ONLY`.
    OffsetFetch {
        fetch_keyword: &'static str,
        /// Product rejects OFFSET/FETCH without ORDER BY (and without OFFSET).
        requires_order_by: bool,
    },
}

/// Words quoted by every adapter when used as identifiers.
const RESERVED_WORDS: &[&str] = &[
    "all", "and", "as", "asc", "between", "by", "case", "check", "column", "constraint",
    "create", "cross", "current", "date", "default", "delete", "desc", "distinct", "drop",
    "else", "end", "exists", "false", "fetch", "for", "foreign", "from", "full", "grant",
    "group", "having", "in", "index", "inner", "insert", "into", "is", "join", "key", "left",
    "like", "limit", "not", "null", "number", "of", "offset", "on", "or", "order", "outer",
    "primary", "references", "right", "row", "rows", "select", "session", "set", "size",
    "table", "then", "time", "timestamp", "to", "true", "union", "unique", "update", "user",
    "using", "value", "values", "when", "where", "with",
];

/// Product-specific SQL rules.
pub trait Dialect: Send + Sync + std::fmt::Debug {
    fn platform(&self) -> Platform;

    /// Opening and closing identifier quote characters.
    fn quote_chars(&self) -> (char, char) {
        ('"', '"')
    }

    /// Quote an identifier when it is reserved or not a plain lowercase name.
    /// Dotted names are quoted part by part; an embedded closing quote is
    /// doubled.
    fn quote_identifier(&self, ident: &str) -> String {
        let (open, close) = self.quote_chars();
        let doubled = format!("{}{}", close, close);
        ident
            .split('.')
            .map(|part| {
                if needs_quoting(part) {
                    format!("{}{}{}", open, part.replace(close, &doubled), close)
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Bind marker for the 1-based parameter position.
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn pagination(&self) -> PaginationStyle {
        PaginationStyle::LimitOffset { unbounded: None }
    }

    /// DDL type for a column.
    fn column_type(&self, ty: LogicalType) -> String;

    /// DDL for a database-generated key column.
    fn identity_column(&self, ty: LogicalType) -> String {
        format!("{} generated by default as identity", self.column_type(ty))
    }

    /// True when `identity_column` already declares the primary key.
    fn identity_includes_primary_key(&self) -> bool {
        false
    }

    /// Whether INSERT ... RETURNING can report generated keys.
    fn supports_returning(&self) -> bool {
        false
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "true" } else { "false" }
    }

    fn current_timestamp(&self) -> &'static str {
        "current_timestamp"
    }

    /// Tail of an INSERT that supplies no column values. `default_column`
    /// is an already quoted column that may be set to DEFAULT explicitly.
    fn empty_insert(&self, _default_column: Option<&str>) -> String {
        "DEFAULT VALUES".to_string()
    }

    /// Whether the driver hands JSON columns back as text rather than as
    /// decoded JSON.
    fn json_as_text(&self) -> bool {
        true
    }

    /// `CREATE TABLE` guard supported by the product.
    fn supports_if_not_exists(&self) -> bool {
        true
    }

    /// Parser dialect used to classify raw SQL for this product.
    fn parser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        Box::new(sqlparser::dialect::GenericDialect {})
    }
}

/// `VALUES (DEFAULT)` form for products that reject `DEFAULT VALUES`.
fn explicit_default_insert(default_column: Option<&str>) -> String {
    match default_column {
        Some(column) => format!("({}) VALUES (DEFAULT)", column),
        None => "VALUES (DEFAULT)".to_string(),
    }
}

fn needs_quoting(ident: &str) -> bool {
    let mut chars = ident.chars();
    let simple = match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => chars
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
        _ => false,
    };
    !simple || RESERVED_WORDS.binary_search(&ident).is_ok()
}

/// Append the limit/offset clause for `dialect` to `sql`.
///
/// `has_order_by` reports whether `sql` already ends with an ORDER BY clause.
pub fn append_pagination(
    dialect: &dyn Dialect,
    sql: &mut String,
    limit: Option<u64>,
    offset: Option<u64>,
    has_order_by: bool,
) {
    if limit.is_none() && offset.is_none() {
        return;
    }

    match dialect.pagination() {
        PaginationStyle::LimitOffset { unbounded } => {
            match (limit, unbounded) {
                (Some(n), _) => sql.push_str(&format!(" LIMIT {}", n)),
                (None, Some(all)) => sql.push_str(&format!(" LIMIT {}", all)),
                (None, None) => {}
            }
            if let Some(m) = offset.filter(|m| *m > 0) {
                sql.push_str(&format!(" OFFSET {}", m));
            }
        }
        PaginationStyle::OffsetFetch {
            fetch_keyword,
            requires_order_by,
        } => {
            if requires_order_by && !has_order_by {
                sql.push_str(" ORDER BY (SELECT NULL)");
            }
            let m = offset.unwrap_or(0);
            if m > 0 || requires_order_by {
                sql.push_str(&format!(" OFFSET {} ROWS", m));
            }
            if let Some(n) = limit {
                sql.push_str(&format!(" FETCH {} {} ROWS ONLY", fetch_keyword, n));
            }
        }
    }
}

/// Get the adapter for a platform.
pub fn dialect_for(platform: Platform) -> Arc<dyn Dialect> {
    match platform {
        Platform::PostgreSQL => Arc::new(PostgresDialect),
        Platform::MySQL => Arc::new(MySqlDialect),
        Platform::MariaDB => Arc::new(MariaDbDialect),
        Platform::Oracle => Arc::new(OracleDialect),
        Platform::SqlServer => Arc::new(SqlServerDialect),
        Platform::H2 => Arc::new(H2Dialect),
        Platform::Derby => Arc::new(DerbyDialect),
        Platform::Hana => Arc::new(HanaDialect),
        Platform::SQLite => Arc::new(SqliteDialect),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_words_sorted() {
        let mut sorted = RESERVED_WORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RESERVED_WORDS);
    }

    #[test]
    fn test_needs_quoting() {
        assert!(!needs_quoting("customer"));
        assert!(!needs_quoting("order_line2"));
        assert!(needs_quoting("order"));
        assert!(needs_quoting("user"));
        assert!(needs_quoting("CamelCase"));
        assert!(needs_quoting("with space"));
        assert!(needs_quoting("1st"));
        assert!(needs_quoting(""));
    }

    #[test]
    fn test_dialect_for_every_platform() {
        for platform in Platform::ALL {
            assert_eq!(dialect_for(platform).platform(), platform);
        }
    }

    #[test]
    fn test_quote_dotted_identifier() {
        let dialect = dialect_for(Platform::PostgreSQL);
        assert_eq!(dialect.quote_identifier("sales.order"), "sales.\"order\"");
    }

    #[test]
    fn test_embedded_quote_is_doubled() {
        assert_eq!(
            dialect_for(Platform::PostgreSQL).quote_identifier("a\"b"),
            "\"a\"\"b\""
        );
        assert_eq!(dialect_for(Platform::MySQL).quote_identifier("a`b"), "`a``b`");
        assert_eq!(dialect_for(Platform::SqlServer).quote_identifier("a]b"), "[a]]b]");
        assert_eq!(
            dialect_for(Platform::PostgreSQL).quote_identifier("x\" OR 1=1 --"),
            "\"x\"\" OR 1=1 --\""
        );
    }

    #[test]
    fn test_pagination_limit_offset() {
        let dialect = dialect_for(Platform::PostgreSQL);
        let mut sql = "SELECT * FROM t".to_string();
        append_pagination(dialect.as_ref(), &mut sql, Some(10), Some(20), false);
        assert_eq!(sql, "SELECT * FROM t LIMIT 10 OFFSET 20");
    }

    #[test]
    fn test_pagination_none_is_noop() {
        let dialect = dialect_for(Platform::SqlServer);
        let mut sql = "SELECT * FROM t".to_string();
        append_pagination(dialect.as_ref(), &mut sql, None, None, false);
        assert_eq!(sql, "SELECT * FROM t");
    }
}
