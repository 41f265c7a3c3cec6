//! Repositories over entity beans.
//!
//! [`Repository`] is the CRUD-plus-query port the application codes
//! against. Two implementations ship:
//! - [`MemoryRepository`]: ordered in-process storage (`repository.mem`)
//! - [`SqlRepository`]: a table behind a [`Database`](crate::runtime::Database)

mod mem;
mod sql;

pub use mem::MemoryRepository;
pub use sql::SqlRepository;

use crate::entity::EntityBean;
use crate::error::OrmResult;
use crate::models::SqlParam;
use crate::statement::Query;
use async_trait::async_trait;

#[async_trait]
pub trait Repository<T: EntityBean>: Send + Sync {
    /// Insert `bean`, or replace the stored bean with the same id. Returns
    /// the bean as stored, with a generated id filled in.
    async fn save(&self, bean: T) -> OrmResult<T>;

    async fn find_by_id(&self, id: SqlParam) -> OrmResult<Option<T>>;

    async fn find_all(&self) -> OrmResult<Vec<T>>;

    async fn find_where(&self, query: &Query) -> OrmResult<Vec<T>>;

    /// Returns whether a bean was removed.
    async fn delete_by_id(&self, id: SqlParam) -> OrmResult<bool>;

    async fn count(&self) -> OrmResult<u64>;

    async fn exists_by_id(&self, id: SqlParam) -> OrmResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }
}
