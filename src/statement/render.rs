//! Database-agnostic statements and their rendering through a dialect.

use super::expr::Expr;
use super::query::{OrderBy, Query};
use crate::dialect::{Dialect, append_pagination};
use crate::error::{OrmError, OrmResult};
use crate::models::SqlParam;

/// Rendered SQL text and its bind values in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    pub table: String,
    /// Empty selects every column.
    pub columns: Vec<String>,
    pub filter: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Select `COUNT(*) AS total` instead of columns; ordering and paging are ignored.
    pub count: bool,
}

impl Select {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Build a select over `table` from find criteria.
    pub fn from_query(table: impl Into<String>, query: &Query) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filter: query.filter.clone(),
            order_by: query.order_by.clone(),
            limit: query.limit,
            offset: query.offset,
            count: false,
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn render(&self, dialect: &dyn Dialect) -> SqlStatement {
        let mut params = Vec::new();
        let projection = if self.count {
            "COUNT(*) AS total".to_string()
        } else if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| dialect.quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!(
            "SELECT {} FROM {}",
            projection,
            dialect.quote_identifier(&self.table)
        );
        push_where(&mut sql, self.filter.as_ref(), dialect, &mut params);

        if !self.count {
            if !self.order_by.is_empty() {
                let orders: Vec<String> = self
                    .order_by
                    .iter()
                    .map(|o| {
                        let dir = if o.descending { "DESC" } else { "ASC" };
                        format!("{} {}", dialect.quote_identifier(&o.column), dir)
                    })
                    .collect();
                sql.push_str(" ORDER BY ");
                sql.push_str(&orders.join(", "));
            }
            append_pagination(
                dialect,
                &mut sql,
                self.limit,
                self.offset,
                !self.order_by.is_empty(),
            );
        }

        SqlStatement { sql, params }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Insert {
    pub table: String,
    pub values: Vec<(String, SqlParam)>,
    /// Generated key column to return where the dialect supports RETURNING.
    pub returning: Option<String>,
    /// Column named in a value-less INSERT on products without DEFAULT VALUES.
    pub default_column: Option<String>,
}

impl Insert {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn value(mut self, column: impl Into<String>, value: impl Into<SqlParam>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }

    pub fn returning(mut self, column: impl Into<String>) -> Self {
        self.returning = Some(column.into());
        self
    }

    pub fn default_column(mut self, column: impl Into<String>) -> Self {
        self.default_column = Some(column.into());
        self
    }

    pub fn render(&self, dialect: &dyn Dialect) -> SqlStatement {
        let table = dialect.quote_identifier(&self.table);
        let mut sql = if self.values.is_empty() {
            let default_column = self
                .default_column
                .as_deref()
                .map(|c| dialect.quote_identifier(c));
            format!(
                "INSERT INTO {} {}",
                table,
                dialect.empty_insert(default_column.as_deref())
            )
        } else {
            let columns: Vec<String> = self
                .values
                .iter()
                .map(|(c, _)| dialect.quote_identifier(c))
                .collect();
            let markers: Vec<String> = (1..=self.values.len())
                .map(|i| dialect.placeholder(i))
                .collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                markers.join(", ")
            )
        };

        if let Some(column) = &self.returning {
            if dialect.supports_returning() {
                sql.push_str(" RETURNING ");
                sql.push_str(&dialect.quote_identifier(column));
            }
        }

        SqlStatement {
            sql,
            params: self.values.iter().map(|(_, v)| v.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub table: String,
    pub set: Vec<(String, SqlParam)>,
    pub filter: Option<Expr>,
}

impl Update {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<SqlParam>) -> Self {
        self.set.push((column.into(), value.into()));
        self
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn render(&self, dialect: &dyn Dialect) -> OrmResult<SqlStatement> {
        if self.set.is_empty() {
            return Err(OrmError::invalid_input(format!(
                "UPDATE of {} has no assignments",
                self.table
            )));
        }

        let mut params = Vec::with_capacity(self.set.len());
        let assignments: Vec<String> = self
            .set
            .iter()
            .map(|(column, value)| {
                params.push(value.clone());
                format!(
                    "{} = {}",
                    dialect.quote_identifier(column),
                    dialect.placeholder(params.len())
                )
            })
            .collect();

        let mut sql = format!(
            "UPDATE {} SET {}",
            dialect.quote_identifier(&self.table),
            assignments.join(", ")
        );
        push_where(&mut sql, self.filter.as_ref(), dialect, &mut params);
        Ok(SqlStatement { sql, params })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delete {
    pub table: String,
    pub filter: Option<Expr>,
}

impl Delete {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
        }
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn render(&self, dialect: &dyn Dialect) -> SqlStatement {
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", dialect.quote_identifier(&self.table));
        push_where(&mut sql, self.filter.as_ref(), dialect, &mut params);
        SqlStatement { sql, params }
    }
}

fn push_where(
    sql: &mut String,
    filter: Option<&Expr>,
    dialect: &dyn Dialect,
    params: &mut Vec<SqlParam>,
) {
    if let Some(expr) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(&expr.render(dialect, params));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{
        DerbyDialect, MySqlDialect, OracleDialect, PostgresDialect, SqlServerDialect,
        SqliteDialect,
    };

    #[test]
    fn test_select_all() {
        let stmt = Select::table("customer").render(&PostgresDialect);
        assert_eq!(stmt.sql, "SELECT * FROM customer");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_select_with_filter_order_and_paging() {
        let select = Select::table("customer")
            .columns(["id", "name"])
            .filter(Expr::eq("city", "Oslo"))
            .order_by(OrderBy::desc("name"))
            .limit(10)
            .offset(20);

        assert_eq!(
            select.render(&PostgresDialect).sql,
            "SELECT id, name FROM customer WHERE city = $1 ORDER BY name DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            select.render(&MySqlDialect).sql,
            "SELECT id, name FROM customer WHERE city = ? ORDER BY name DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            select.render(&OracleDialect).sql,
            "SELECT id, name FROM customer WHERE city = :1 ORDER BY name DESC \
             OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(
            select.render(&DerbyDialect).sql,
            "SELECT id, name FROM customer WHERE city = ? ORDER BY name DESC \
             OFFSET 20 ROWS FETCH FIRST 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_select_reserved_table_quoted() {
        let stmt = Select::table("order").limit(5).render(&SqlServerDialect);
        assert_eq!(
            stmt.sql,
            "SELECT * FROM [order] ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }

    #[test]
    fn test_count_ignores_paging() {
        let stmt = Select::table("customer")
            .filter(Expr::is_not_null("email"))
            .order_by(OrderBy::asc("id"))
            .limit(3)
            .count()
            .render(&SqliteDialect);
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS total FROM customer WHERE email IS NOT NULL"
        );
    }

    #[test]
    fn test_insert_with_returning() {
        let insert = Insert::table("customer")
            .value("name", "Ada")
            .value("active", true)
            .returning("id");

        let stmt = insert.render(&PostgresDialect);
        assert_eq!(
            stmt.sql,
            "INSERT INTO customer (name, active) VALUES ($1, $2) RETURNING id"
        );
        assert_eq!(stmt.params, vec![SqlParam::from("Ada"), SqlParam::Bool(true)]);

        // No RETURNING support: generated key comes from the driver
        let stmt = insert.render(&MySqlDialect);
        assert_eq!(stmt.sql, "INSERT INTO customer (name, active) VALUES (?, ?)");
    }

    #[test]
    fn test_insert_without_values() {
        assert_eq!(
            Insert::table("tick").render(&PostgresDialect).sql,
            "INSERT INTO tick DEFAULT VALUES"
        );
        assert_eq!(
            Insert::table("tick").render(&MySqlDialect).sql,
            "INSERT INTO tick () VALUES ()"
        );
    }

    #[test]
    fn test_update_numbers_set_before_where() {
        let stmt = Update::table("customer")
            .set("name", "Grace")
            .set("age", 85)
            .filter(Expr::eq("id", 7))
            .render(&SqlServerDialect)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE customer SET name = @p1, age = @p2 WHERE id = @p3"
        );
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn test_update_without_assignments_rejected() {
        let result = Update::table("customer")
            .filter(Expr::eq("id", 1))
            .render(&PostgresDialect);
        assert!(matches!(result, Err(OrmError::InvalidInput { .. })));
    }

    #[test]
    fn test_delete() {
        let stmt = Delete::table("customer")
            .filter(Expr::in_list("id", [1, 2]))
            .render(&OracleDialect);
        assert_eq!(stmt.sql, "DELETE FROM customer WHERE id IN (:1, :2)");
        assert_eq!(stmt.params, vec![SqlParam::Int(1), SqlParam::Int(2)]);
    }
}
