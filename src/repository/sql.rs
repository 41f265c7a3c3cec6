use super::Repository;
use crate::entity::{self, EntityBean};
use crate::error::OrmResult;
use crate::models::SqlParam;
use crate::runtime::Database;
use crate::statement::Query;
use async_trait::async_trait;
use std::marker::PhantomData;

/// Repository backed by one table of a [`Database`].
#[derive(Debug)]
pub struct SqlRepository<T> {
    database: Database,
    _bean: PhantomData<fn() -> T>,
}

impl<T: EntityBean> SqlRepository<T> {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            _bean: PhantomData,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Create the backing table when it does not exist yet.
    pub async fn ensure_table(&self) -> OrmResult<()> {
        self.database.create_table::<T>().await
    }

    pub async fn count_where(&self, query: &Query) -> OrmResult<u64> {
        self.database.count::<T>(query).await
    }
}

impl<T> Clone for SqlRepository<T> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            _bean: PhantomData,
        }
    }
}

#[async_trait]
impl<T: EntityBean> Repository<T> for SqlRepository<T> {
    async fn save(&self, bean: T) -> OrmResult<T> {
        let Some(id) = entity::id_of(&bean)? else {
            return self.database.insert(&bean).await;
        };

        if self.database.exists::<T>(id).await? {
            self.database.update(&bean).await?;
            Ok(bean)
        } else {
            self.database.insert(&bean).await
        }
    }

    async fn find_by_id(&self, id: SqlParam) -> OrmResult<Option<T>> {
        self.database.find_by_id(id).await
    }

    async fn find_all(&self) -> OrmResult<Vec<T>> {
        self.database.find_all().await
    }

    async fn find_where(&self, query: &Query) -> OrmResult<Vec<T>> {
        self.database.find_where(query).await
    }

    async fn delete_by_id(&self, id: SqlParam) -> OrmResult<bool> {
        self.database.delete::<T>(id).await
    }

    async fn count(&self) -> OrmResult<u64> {
        self.database.count::<T>(&Query::new()).await
    }

    async fn exists_by_id(&self, id: SqlParam) -> OrmResult<bool> {
        self.database.exists::<T>(id).await
    }
}
