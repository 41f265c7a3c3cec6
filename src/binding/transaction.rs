//! Reactive transactions.
//!
//! A `Transaction` holds one pooled connection until it is committed or
//! rolled back. Dropping it without either rolls back (sqlx semantics).

use super::params::{bind_mysql_param, bind_postgres_param, bind_sqlite_param};
use super::reactive::{check_writable, exec_outcome_mysql, exec_outcome_sqlite, timeout_error};
use super::types::RowToJson;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::models::{ExecOutcome, RowMap, SqlParam};
use sqlx::{MySql, Postgres, Sqlite};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

pub(crate) enum DbTransaction {
    MySql(sqlx::Transaction<'static, MySql>),
    Postgres(sqlx::Transaction<'static, Postgres>),
    SQLite(sqlx::Transaction<'static, Sqlite>),
}

pub struct Transaction {
    id: String,
    inner: DbTransaction,
    dialect: Arc<dyn Dialect>,
    read_only: bool,
    query_timeout: Duration,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("platform", &self.dialect.platform())
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl Transaction {
    pub(crate) fn new(
        inner: DbTransaction,
        dialect: Arc<dyn Dialect>,
        read_only: bool,
        query_timeout: Duration,
    ) -> Self {
        let id = generate_transaction_id();
        info!(transaction_id = %id, platform = %dialect.platform(), "Transaction started");
        Self {
            id,
            inner,
            dialect,
            read_only,
            query_timeout,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    pub async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> OrmResult<ExecOutcome> {
        check_writable(self.read_only, self.dialect.as_ref(), sql)?;
        debug!(
            transaction_id = %self.id,
            sql = %sql,
            params = params.len(),
            "Executing in transaction"
        );

        let query_timeout = self.query_timeout;
        let result = match &mut self.inner {
            DbTransaction::MySql(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_mysql_param(query, param);
                }
                timeout(query_timeout, query.execute(&mut **tx))
                    .await
                    .map(|r| r.map(|r| exec_outcome_mysql(&r)))
            }
            DbTransaction::Postgres(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_postgres_param(query, param);
                }
                timeout(query_timeout, query.execute(&mut **tx))
                    .await
                    .map(|r| {
                        r.map(|r| ExecOutcome {
                            rows_affected: r.rows_affected(),
                            last_insert_id: None,
                        })
                    })
            }
            DbTransaction::SQLite(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_sqlite_param(query, param);
                }
                timeout(query_timeout, query.execute(&mut **tx))
                    .await
                    .map(|r| r.map(|r| exec_outcome_sqlite(&r)))
            }
        };

        match result {
            Ok(outcome) => outcome.map_err(OrmError::from),
            Err(_) => Err(timeout_error("transaction statement", query_timeout)),
        }
    }

    pub async fn fetch_all(&mut self, sql: &str, params: &[SqlParam]) -> OrmResult<Vec<RowMap>> {
        check_writable(self.read_only, self.dialect.as_ref(), sql)?;
        debug!(
            transaction_id = %self.id,
            sql = %sql,
            params = params.len(),
            "Querying in transaction"
        );

        let query_timeout = self.query_timeout;
        let result = match &mut self.inner {
            DbTransaction::MySql(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_mysql_param(query, param);
                }
                timeout(query_timeout, query.fetch_all(&mut **tx))
                    .await
                    .map(|r| r.map(|rows| rows.iter().map(|row| row.to_row_map()).collect()))
            }
            DbTransaction::Postgres(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_postgres_param(query, param);
                }
                timeout(query_timeout, query.fetch_all(&mut **tx))
                    .await
                    .map(|r| r.map(|rows| rows.iter().map(|row| row.to_row_map()).collect()))
            }
            DbTransaction::SQLite(tx) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_sqlite_param(query, param);
                }
                timeout(query_timeout, query.fetch_all(&mut **tx))
                    .await
                    .map(|r| r.map(|rows| rows.iter().map(|row| row.to_row_map()).collect()))
            }
        };

        match result {
            Ok(rows) => rows.map_err(OrmError::from),
            Err(_) => Err(timeout_error("transaction query", query_timeout)),
        }
    }

    pub async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> OrmResult<Option<RowMap>> {
        Ok(self.fetch_all(sql, params).await?.into_iter().next())
    }

    pub async fn commit(self) -> OrmResult<()> {
        let id = self.id;
        let result = match self.inner {
            DbTransaction::MySql(tx) => tx.commit().await,
            DbTransaction::Postgres(tx) => tx.commit().await,
            DbTransaction::SQLite(tx) => tx.commit().await,
        };
        result.map_err(|e| OrmError::transaction(format!("Commit failed: {}", e), &id))?;
        info!(transaction_id = %id, "Transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> OrmResult<()> {
        let id = self.id;
        let result = match self.inner {
            DbTransaction::MySql(tx) => tx.rollback().await,
            DbTransaction::Postgres(tx) => tx.rollback().await,
            DbTransaction::SQLite(tx) => tx.rollback().await,
        };
        result.map_err(|e| OrmError::transaction(format!("Rollback failed: {}", e), &id))?;
        info!(transaction_id = %id, "Transaction rolled back");
        Ok(())
    }
}

fn generate_transaction_id() -> String {
    format!("tx_{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_format() {
        let id = generate_transaction_id();
        assert!(id.starts_with("tx_"));
        assert_eq!(id.len(), 35);
        assert_ne!(id, generate_transaction_id());
    }
}
