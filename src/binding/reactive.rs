//! Reactive (non-blocking) driver binding.
//!
//! `ReactiveBinding` executes statements on a sqlx pool. Single-shot calls
//! return futures; `fetch` returns a [`RowStream`] fed by a spawned task
//! through a bounded channel, so a slow consumer suspends the producer
//! instead of buffering the whole result set.
//!
//! The driver-specific code lives in the `mysql`, `postgres` and `sqlite`
//! submodules, which expose the same three functions.

use super::DbPool;
use super::pool::{create_pool, server_version};
use super::transaction::{DbTransaction, Transaction};
use super::types::RowToJson;
use crate::dialect::{Dialect, dialect_for};
use crate::error::{OrmError, OrmResult};
use crate::models::{
    BindingKind, ConnectionConfig, DEFAULT_QUERY_TIMEOUT_SECS, ExecOutcome, MAX_ROW_LIMIT,
    Platform, QueryResult, RowMap, SqlParam,
};
use crate::statement::validate_readonly;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Rows in flight between the producing task and the consumer.
pub const STREAM_BUFFER: usize = 64;

/// Stream of decoded rows. Ends after the first error.
pub type RowStream = BoxStream<'static, OrmResult<RowMap>>;

#[derive(Clone)]
pub struct ReactiveBinding {
    pool: DbPool,
    dialect: Arc<dyn Dialect>,
    name: String,
    read_only: bool,
    query_timeout: Duration,
    server_version: Option<String>,
}

impl std::fmt::Debug for ReactiveBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveBinding")
            .field("name", &self.name)
            .field("platform", &self.dialect.platform())
            .field("driver", &self.pool.driver())
            .field("read_only", &self.read_only)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

impl ReactiveBinding {
    /// Open a pool for `config` and probe the server version.
    pub async fn connect(config: &ConnectionConfig) -> OrmResult<Self> {
        Self::connect_as(config, BindingKind::Reactive).await
    }

    pub(crate) async fn connect_as(
        config: &ConnectionConfig,
        binding: BindingKind,
    ) -> OrmResult<Self> {
        info!(
            name = %config.name,
            platform = %config.platform,
            binding = %binding,
            url = %config.masked_connection_string(),
            read_only = config.read_only,
            "Connecting"
        );

        let pool = create_pool(config, binding).await?;
        let server_version = server_version(&pool).await;

        info!(
            name = %config.name,
            driver = pool.driver(),
            server_version = ?server_version,
            "Connected"
        );

        Ok(Self {
            pool,
            dialect: dialect_for(config.platform),
            name: config.name.clone(),
            read_only: config.read_only,
            query_timeout: Duration::from_secs(u64::from(DEFAULT_QUERY_TIMEOUT_SECS)),
            server_version,
        })
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn platform(&self) -> Platform {
        self.dialect.platform()
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    pub fn driver(&self) -> &'static str {
        self.pool.driver()
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Run a statement that returns no rows.
    pub async fn execute(&self, sql: &str, params: &[SqlParam]) -> OrmResult<ExecOutcome> {
        check_writable(self.read_only, self.dialect.as_ref(), sql)?;
        debug!(
            name = %self.name,
            sql = %sql,
            params = params.len(),
            timeout_secs = self.query_timeout.as_secs(),
            "Executing statement"
        );

        match &self.pool {
            DbPool::MySql(p) => mysql::execute(p, sql, params, self.query_timeout).await,
            DbPool::Postgres(p) => postgres::execute(p, sql, params, self.query_timeout).await,
            DbPool::SQLite(p) => sqlite::execute(p, sql, params, self.query_timeout).await,
        }
    }

    /// Fetch every row of a query.
    pub async fn fetch_all(&self, sql: &str, params: &[SqlParam]) -> OrmResult<Vec<RowMap>> {
        check_writable(self.read_only, self.dialect.as_ref(), sql)?;
        debug!(name = %self.name, sql = %sql, params = params.len(), "Fetching rows");

        let rows = match &self.pool {
            DbPool::MySql(p) => {
                let rows = mysql::fetch_rows(p, sql, params, None, self.query_timeout).await?;
                rows.iter().map(|r| r.to_row_map()).collect()
            }
            DbPool::Postgres(p) => {
                let rows = postgres::fetch_rows(p, sql, params, None, self.query_timeout).await?;
                rows.iter().map(|r| r.to_row_map()).collect()
            }
            DbPool::SQLite(p) => {
                let rows = sqlite::fetch_rows(p, sql, params, None, self.query_timeout).await?;
                rows.iter().map(|r| r.to_row_map()).collect()
            }
        };
        Ok(rows)
    }

    /// Fetch the first row of a query, if any.
    pub async fn fetch_optional(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> OrmResult<Option<RowMap>> {
        check_writable(self.read_only, self.dialect.as_ref(), sql)?;

        let row = match &self.pool {
            DbPool::MySql(p) => mysql::fetch_rows(p, sql, params, Some(1), self.query_timeout)
                .await?
                .first()
                .map(|r| r.to_row_map()),
            DbPool::Postgres(p) => {
                postgres::fetch_rows(p, sql, params, Some(1), self.query_timeout)
                    .await?
                    .first()
                    .map(|r| r.to_row_map())
            }
            DbPool::SQLite(p) => sqlite::fetch_rows(p, sql, params, Some(1), self.query_timeout)
                .await?
                .first()
                .map(|r| r.to_row_map()),
        };
        Ok(row)
    }

    /// Run a query and return at most `limit` rows with column metadata.
    ///
    /// One extra row is fetched to detect truncation. `limit` is clamped to
    /// `1..=MAX_ROW_LIMIT`.
    pub async fn query(
        &self,
        sql: &str,
        params: &[SqlParam],
        limit: u32,
    ) -> OrmResult<QueryResult> {
        check_writable(self.read_only, self.dialect.as_ref(), sql)?;
        let start = Instant::now();
        let row_limit = limit.clamp(1, MAX_ROW_LIMIT);
        let fetch_limit = Some(row_limit as usize + 1);

        debug!(
            name = %self.name,
            sql = %sql,
            params = params.len(),
            limit = row_limit,
            "Executing query"
        );

        match &self.pool {
            DbPool::MySql(p) => {
                let rows =
                    mysql::fetch_rows(p, sql, params, fetch_limit, self.query_timeout).await?;
                Ok(process_rows(rows, row_limit, start))
            }
            DbPool::Postgres(p) => {
                let rows =
                    postgres::fetch_rows(p, sql, params, fetch_limit, self.query_timeout).await?;
                Ok(process_rows(rows, row_limit, start))
            }
            DbPool::SQLite(p) => {
                let rows =
                    sqlite::fetch_rows(p, sql, params, fetch_limit, self.query_timeout).await?;
                Ok(process_rows(rows, row_limit, start))
            }
        }
    }

    /// Stream the rows of a query.
    ///
    /// Must be called within a tokio runtime. Dropping the stream stops the
    /// producer at its next send.
    pub fn fetch(&self, sql: impl Into<String>, params: Vec<SqlParam>) -> RowStream {
        let sql = sql.into();
        if let Err(e) = check_writable(self.read_only, self.dialect.as_ref(), &sql) {
            return stream::once(async move { Err(e) }).boxed();
        }
        debug!(name = %self.name, sql = %sql, params = params.len(), "Streaming rows");

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let pool = self.pool.clone();
        let query_timeout = self.query_timeout;

        tokio::spawn(async move {
            match pool {
                DbPool::MySql(p) => mysql::stream_rows(&p, &sql, &params, query_timeout, &tx).await,
                DbPool::Postgres(p) => {
                    postgres::stream_rows(&p, &sql, &params, query_timeout, &tx).await
                }
                DbPool::SQLite(p) => {
                    sqlite::stream_rows(&p, &sql, &params, query_timeout, &tx).await
                }
            }
        });

        stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed()
    }

    /// Start a transaction on a dedicated pooled connection.
    pub async fn begin(&self) -> OrmResult<Transaction> {
        let inner = match &self.pool {
            DbPool::MySql(p) => DbTransaction::MySql(p.begin().await?),
            DbPool::Postgres(p) => DbTransaction::Postgres(p.begin().await?),
            DbPool::SQLite(p) => DbTransaction::SQLite(p.begin().await?),
        };
        Ok(Transaction::new(
            inner,
            Arc::clone(&self.dialect),
            self.read_only,
            self.query_timeout,
        ))
    }

    pub async fn close(&self) {
        info!(name = %self.name, "Closing connection pool");
        self.pool.close().await;
    }
}

/// Reject `sql` unless it is a pure read when the connection is read-only.
pub(crate) fn check_writable(read_only: bool, dialect: &dyn Dialect, sql: &str) -> OrmResult<()> {
    if read_only {
        validate_readonly(sql, dialect)?;
    }
    Ok(())
}

pub(crate) fn timeout_error(operation: &str, timeout: Duration) -> OrmError {
    OrmError::timeout(operation, timeout.as_secs() as u32)
}

pub(crate) fn exec_outcome_mysql(result: &sqlx::mysql::MySqlQueryResult) -> ExecOutcome {
    let id = result.last_insert_id();
    ExecOutcome {
        rows_affected: result.rows_affected(),
        last_insert_id: (id != 0).then_some(id as i64),
    }
}

pub(crate) fn exec_outcome_sqlite(result: &sqlx::sqlite::SqliteQueryResult) -> ExecOutcome {
    let id = result.last_insert_rowid();
    ExecOutcome {
        rows_affected: result.rows_affected(),
        last_insert_id: (id != 0).then_some(id),
    }
}

fn process_rows<R: RowToJson>(rows: Vec<R>, row_limit: u32, start: Instant) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;
    let Some(first) = rows.first() else {
        return QueryResult::empty(execution_time_ms);
    };

    let columns = first.column_metadata();
    let total_rows = rows.len();
    let truncated = total_rows > row_limit as usize;
    let json_rows: Vec<RowMap> = rows
        .iter()
        .take(row_limit as usize)
        .map(|r| r.to_row_map())
        .collect();

    if truncated {
        warn!(limit = row_limit, "Query result truncated");
    }

    QueryResult {
        columns,
        rows: json_rows,
        truncated,
        execution_time_ms,
    }
}

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> OrmResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(OrmError::from)?);
    }
    Ok(rows)
}

/// Forward rows into `tx` until the source ends, fails or the consumer leaves.
async fn forward_rows<R: RowToJson>(
    mut rows: BoxStream<'_, Result<R, sqlx::Error>>,
    query_timeout: Duration,
    tx: &mpsc::Sender<OrmResult<RowMap>>,
) {
    loop {
        let item = match tokio::time::timeout(query_timeout, rows.next()).await {
            Ok(Some(Ok(row))) => Ok(row.to_row_map()),
            Ok(Some(Err(e))) => Err(OrmError::from(e)),
            Ok(None) => break,
            Err(_) => Err(timeout_error("row stream", query_timeout)),
        };
        let failed = item.is_err();
        if tx.send(item).await.is_err() {
            debug!("Row stream consumer dropped");
            break;
        }
        if failed {
            break;
        }
    }
}

// Each driver module below exposes the same interface; only the sqlx types
// and the parameter binder differ.

mod mysql {
    use super::*;
    use crate::binding::params::bind_mysql_param;
    use sqlx::MySqlPool;
    use sqlx::mysql::MySqlRow;

    pub async fn execute(
        pool: &MySqlPool,
        sql: &str,
        params: &[SqlParam],
        query_timeout: Duration,
    ) -> OrmResult<ExecOutcome> {
        // Raw path when unbound: some statements cannot be prepared
        let result = if params.is_empty() {
            use sqlx::Executor;
            tokio::time::timeout(query_timeout, pool.execute(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_mysql_param(query, param);
            }
            tokio::time::timeout(query_timeout, query.execute(pool)).await
        };

        match result {
            Ok(Ok(r)) => Ok(exec_outcome_mysql(&r)),
            Ok(Err(e)) => Err(OrmError::from(e)),
            Err(_) => Err(timeout_error("statement execution", query_timeout)),
        }
    }

    pub async fn fetch_rows(
        pool: &MySqlPool,
        sql: &str,
        params: &[SqlParam],
        fetch_limit: Option<usize>,
        query_timeout: Duration,
    ) -> OrmResult<Vec<MySqlRow>> {
        let stream = if params.is_empty() {
            use sqlx::Executor;
            pool.fetch(sql)
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_mysql_param(query, param);
            }
            query.fetch(pool)
        };
        let rows_future = stream.take(fetch_limit.unwrap_or(usize::MAX)).collect::<Vec<_>>();

        match tokio::time::timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn stream_rows(
        pool: &MySqlPool,
        sql: &str,
        params: &[SqlParam],
        query_timeout: Duration,
        tx: &mpsc::Sender<OrmResult<RowMap>>,
    ) {
        let stream = if params.is_empty() {
            use sqlx::Executor;
            pool.fetch(sql)
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_mysql_param(query, param);
            }
            query.fetch(pool)
        };
        forward_rows::<MySqlRow>(stream, query_timeout, tx).await;
    }
}

mod postgres {
    use super::*;
    use crate::binding::params::bind_postgres_param;
    use sqlx::PgPool;
    use sqlx::postgres::PgRow;

    pub async fn execute(
        pool: &PgPool,
        sql: &str,
        params: &[SqlParam],
        query_timeout: Duration,
    ) -> OrmResult<ExecOutcome> {
        let result = if params.is_empty() {
            use sqlx::Executor;
            tokio::time::timeout(query_timeout, pool.execute(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_postgres_param(query, param);
            }
            tokio::time::timeout(query_timeout, query.execute(pool)).await
        };

        // Generated keys come back through RETURNING, not the command tag
        match result {
            Ok(Ok(r)) => Ok(ExecOutcome {
                rows_affected: r.rows_affected(),
                last_insert_id: None,
            }),
            Ok(Err(e)) => Err(OrmError::from(e)),
            Err(_) => Err(timeout_error("statement execution", query_timeout)),
        }
    }

    pub async fn fetch_rows(
        pool: &PgPool,
        sql: &str,
        params: &[SqlParam],
        fetch_limit: Option<usize>,
        query_timeout: Duration,
    ) -> OrmResult<Vec<PgRow>> {
        let stream = if params.is_empty() {
            use sqlx::Executor;
            pool.fetch(sql)
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_postgres_param(query, param);
            }
            query.fetch(pool)
        };
        let rows_future = stream.take(fetch_limit.unwrap_or(usize::MAX)).collect::<Vec<_>>();

        match tokio::time::timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn stream_rows(
        pool: &PgPool,
        sql: &str,
        params: &[SqlParam],
        query_timeout: Duration,
        tx: &mpsc::Sender<OrmResult<RowMap>>,
    ) {
        let stream = if params.is_empty() {
            use sqlx::Executor;
            pool.fetch(sql)
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_postgres_param(query, param);
            }
            query.fetch(pool)
        };
        forward_rows::<PgRow>(stream, query_timeout, tx).await;
    }
}

mod sqlite {
    use super::*;
    use crate::binding::params::bind_sqlite_param;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqliteRow;

    pub async fn execute(
        pool: &SqlitePool,
        sql: &str,
        params: &[SqlParam],
        query_timeout: Duration,
    ) -> OrmResult<ExecOutcome> {
        let result = if params.is_empty() {
            use sqlx::Executor;
            tokio::time::timeout(query_timeout, pool.execute(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_sqlite_param(query, param);
            }
            tokio::time::timeout(query_timeout, query.execute(pool)).await
        };

        match result {
            Ok(Ok(r)) => Ok(exec_outcome_sqlite(&r)),
            Ok(Err(e)) => Err(OrmError::from(e)),
            Err(_) => Err(timeout_error("statement execution", query_timeout)),
        }
    }

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        params: &[SqlParam],
        fetch_limit: Option<usize>,
        query_timeout: Duration,
    ) -> OrmResult<Vec<SqliteRow>> {
        let stream = if params.is_empty() {
            use sqlx::Executor;
            pool.fetch(sql)
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_sqlite_param(query, param);
            }
            query.fetch(pool)
        };
        let rows_future = stream.take(fetch_limit.unwrap_or(usize::MAX)).collect::<Vec<_>>();

        match tokio::time::timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn stream_rows(
        pool: &SqlitePool,
        sql: &str,
        params: &[SqlParam],
        query_timeout: Duration,
        tx: &mpsc::Sender<OrmResult<RowMap>>,
    ) {
        let stream = if params.is_empty() {
            use sqlx::Executor;
            pool.fetch(sql)
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_sqlite_param(query, param);
            }
            query.fetch(pool)
        };
        forward_rows::<SqliteRow>(stream, query_timeout, tx).await;
    }
}
