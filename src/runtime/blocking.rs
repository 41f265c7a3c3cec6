//! Synchronous ORM session over the blocking binding.

use super::database::{Database, select_adapter};
use crate::binding::BlockingBinding;
use crate::binding::blocking::BlockingTransaction;
use crate::entity::EntityBean;
use crate::error::OrmResult;
use crate::models::{
    BindingKind, ConnectionConfig, ConnectionInfo, ExecOutcome, QueryResult, SqlParam,
};
use crate::modules::ModuleGraph;
use crate::statement::Query;
use std::time::Duration;
use tracing::info;

/// Blocking counterpart of [`Database`]. Every call runs to completion on
/// the binding's private runtime, so it must not be used from async code.
#[derive(Debug, Clone)]
pub struct BlockingDatabase {
    binding: BlockingBinding,
    session: Database,
}

impl BlockingDatabase {
    pub fn connect(config: &ConnectionConfig) -> OrmResult<Self> {
        Self::connect_with(config, &ModuleGraph::builtin())
    }

    pub fn connect_with(config: &ConnectionConfig, graph: &ModuleGraph) -> OrmResult<Self> {
        let adapter_module = select_adapter(graph, config, BindingKind::Blocking)?;
        let binding = BlockingBinding::connect(config)?;
        let session = Database::from_binding(
            binding.reactive().clone(),
            BindingKind::Blocking,
            adapter_module,
        );
        info!(
            name = %config.name,
            adapter = %session.adapter_module(),
            "Blocking database ready"
        );
        Ok(Self { binding, session })
    }

    pub fn with_query_timeout(self, query_timeout: Duration) -> Self {
        Self {
            binding: self.binding.with_query_timeout(query_timeout),
            session: self.session.with_query_timeout(query_timeout),
        }
    }

    pub fn name(&self) -> &str {
        self.session.name()
    }

    pub fn info(&self) -> ConnectionInfo {
        self.session.info()
    }

    pub fn binding(&self) -> &BlockingBinding {
        &self.binding
    }

    pub fn insert<T: EntityBean>(&self, bean: &T) -> OrmResult<T> {
        self.binding.block_on(self.session.insert(bean))
    }

    pub fn update<T: EntityBean>(&self, bean: &T) -> OrmResult<()> {
        self.binding.block_on(self.session.update(bean))
    }

    pub fn delete<T: EntityBean>(&self, id: impl Into<SqlParam>) -> OrmResult<bool> {
        self.binding.block_on(self.session.delete::<T>(id))
    }

    pub fn find_by_id<T: EntityBean>(&self, id: impl Into<SqlParam>) -> OrmResult<Option<T>> {
        self.binding.block_on(self.session.find_by_id(id))
    }

    pub fn find_where<T: EntityBean>(&self, query: &Query) -> OrmResult<Vec<T>> {
        self.binding.block_on(self.session.find_where(query))
    }

    pub fn find_all<T: EntityBean>(&self) -> OrmResult<Vec<T>> {
        self.binding.block_on(self.session.find_all())
    }

    pub fn count<T: EntityBean>(&self, query: &Query) -> OrmResult<u64> {
        self.binding.block_on(self.session.count::<T>(query))
    }

    pub fn create_table<T: EntityBean>(&self) -> OrmResult<()> {
        self.binding.block_on(self.session.create_table::<T>())
    }

    pub fn drop_table<T: EntityBean>(&self) -> OrmResult<()> {
        self.binding.block_on(self.session.drop_table::<T>())
    }

    pub fn query_raw(&self, sql: &str, params: &[SqlParam], limit: u32) -> OrmResult<QueryResult> {
        self.binding.block_on(self.session.query_raw(sql, params, limit))
    }

    pub fn execute_raw(&self, sql: &str, params: &[SqlParam]) -> OrmResult<ExecOutcome> {
        self.binding.block_on(self.session.execute_raw(sql, params))
    }

    /// See [`BlockingBinding::with_transaction`].
    pub fn with_transaction<T, F>(&self, f: F) -> OrmResult<T>
    where
        F: FnOnce(&mut BlockingTransaction) -> OrmResult<T>,
    {
        self.binding.with_transaction(f)
    }

    pub fn close(&self) {
        self.binding.close();
    }
}
