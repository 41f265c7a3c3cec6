//! Blocking (call-and-return) driver binding.
//!
//! Wraps a [`ReactiveBinding`] and drives every call to completion on a
//! private multi-thread runtime. Calling into it from inside an async
//! context panics, as `Runtime::block_on` does.

use super::reactive::ReactiveBinding;
use super::transaction::Transaction;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::models::{
    BindingKind, ConnectionConfig, ExecOutcome, Platform, QueryResult, RowMap, SqlParam,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

const RUNTIME_WORKER_THREADS: usize = 2;

#[derive(Debug, Clone)]
pub struct BlockingBinding {
    runtime: Arc<Runtime>,
    inner: ReactiveBinding,
}

impl BlockingBinding {
    pub fn connect(config: &ConnectionConfig) -> OrmResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(RUNTIME_WORKER_THREADS)
            .thread_name("orm-blocking")
            .enable_all()
            .build()
            .map_err(|e| OrmError::internal(format!("Failed to start blocking runtime: {}", e)))?;

        let inner = runtime.block_on(ReactiveBinding::connect_as(config, BindingKind::Blocking))?;
        Ok(Self {
            runtime: Arc::new(runtime),
            inner,
        })
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.inner = self.inner.with_query_timeout(query_timeout);
        self
    }

    pub fn platform(&self) -> Platform {
        self.inner.platform()
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        self.inner.dialect()
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.is_read_only()
    }

    pub fn server_version(&self) -> Option<&str> {
        self.inner.server_version()
    }

    pub fn driver(&self) -> &'static str {
        self.inner.driver()
    }

    pub fn execute(&self, sql: &str, params: &[SqlParam]) -> OrmResult<ExecOutcome> {
        self.runtime.block_on(self.inner.execute(sql, params))
    }

    pub fn query(&self, sql: &str, params: &[SqlParam], limit: u32) -> OrmResult<QueryResult> {
        self.runtime.block_on(self.inner.query(sql, params, limit))
    }

    pub fn fetch_all(&self, sql: &str, params: &[SqlParam]) -> OrmResult<Vec<RowMap>> {
        self.runtime.block_on(self.inner.fetch_all(sql, params))
    }

    pub fn fetch_optional(&self, sql: &str, params: &[SqlParam]) -> OrmResult<Option<RowMap>> {
        self.runtime.block_on(self.inner.fetch_optional(sql, params))
    }

    pub fn begin(&self) -> OrmResult<BlockingTransaction> {
        let inner = self.runtime.block_on(self.inner.begin())?;
        Ok(BlockingTransaction {
            runtime: Arc::clone(&self.runtime),
            id: inner.id().to_string(),
            dialect: Arc::clone(inner.dialect()),
            inner: Some(inner),
        })
    }

    /// Run `f` inside a transaction: commit when it returns `Ok`, roll back
    /// when it returns `Err`. The closure's error is returned unchanged.
    pub fn with_transaction<T, F>(&self, f: F) -> OrmResult<T>
    where
        F: FnOnce(&mut BlockingTransaction) -> OrmResult<T>,
    {
        let mut tx = self.begin()?;
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                let id = tx.id().to_string();
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        transaction_id = %id,
                        error = %rollback_err,
                        "Rollback after failure also failed"
                    );
                }
                Err(e)
            }
        }
    }

    pub fn close(&self) {
        self.runtime.block_on(self.inner.close());
    }

    /// The wrapped async binding.
    pub fn reactive(&self) -> &ReactiveBinding {
        &self.inner
    }

    pub(crate) fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// A transaction driven synchronously.
///
/// Dropping it uncommitted rolls back: the connection is released inside
/// the private runtime so the queued rollback can run there.
#[derive(Debug)]
pub struct BlockingTransaction {
    runtime: Arc<Runtime>,
    id: String,
    dialect: Arc<dyn Dialect>,
    inner: Option<Transaction>,
}

impl BlockingTransaction {
    fn active_mut(&mut self) -> OrmResult<&mut Transaction> {
        self.inner
            .as_mut()
            .ok_or_else(|| OrmError::internal("Transaction already finished"))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    pub fn execute(&mut self, sql: &str, params: &[SqlParam]) -> OrmResult<ExecOutcome> {
        let runtime = Arc::clone(&self.runtime);
        let tx = self.active_mut()?;
        runtime.block_on(tx.execute(sql, params))
    }

    pub fn fetch_all(&mut self, sql: &str, params: &[SqlParam]) -> OrmResult<Vec<RowMap>> {
        let runtime = Arc::clone(&self.runtime);
        let tx = self.active_mut()?;
        runtime.block_on(tx.fetch_all(sql, params))
    }

    pub fn fetch_optional(&mut self, sql: &str, params: &[SqlParam]) -> OrmResult<Option<RowMap>> {
        let runtime = Arc::clone(&self.runtime);
        let tx = self.active_mut()?;
        runtime.block_on(tx.fetch_optional(sql, params))
    }

    pub fn commit(mut self) -> OrmResult<()> {
        let tx = self
            .inner
            .take()
            .ok_or_else(|| OrmError::internal("Transaction already finished"))?;
        debug!(transaction_id = %self.id, "Committing blocking transaction");
        self.runtime.block_on(tx.commit())
    }

    pub fn rollback(mut self) -> OrmResult<()> {
        let tx = self
            .inner
            .take()
            .ok_or_else(|| OrmError::internal("Transaction already finished"))?;
        self.runtime.block_on(tx.rollback())
    }
}

impl Drop for BlockingTransaction {
    fn drop(&mut self) {
        if let Some(tx) = self.inner.take() {
            debug!(transaction_id = %self.id, "Rolling back dropped blocking transaction");
            let _guard = self.runtime.enter();
            drop(tx);
        }
    }
}
