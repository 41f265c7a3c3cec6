use super::Repository;
use crate::entity::{self, EntityBean};
use crate::error::{OrmError, OrmResult};
use crate::models::{RowMap, SqlParam};
use crate::statement::Query;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Storage key. Integer ids sort before text ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Key {
    Int(i64),
    Text(String),
}

impl Key {
    fn from_param(table: &str, id: SqlParam) -> OrmResult<Self> {
        match id {
            SqlParam::Int(v) => Ok(Key::Int(v)),
            SqlParam::String(v) => Ok(Key::Text(v)),
            other => Err(OrmError::invalid_input(format!(
                "Unsupported id type '{}' for {}",
                other.type_name(),
                table
            ))),
        }
    }
}

#[derive(Debug, Clone)]
struct Stored<T> {
    bean: T,
    row: RowMap,
}

#[derive(Debug)]
struct State<T> {
    rows: BTreeMap<Key, Stored<T>>,
    /// Always above every stored integer key; `None` once `i64::MAX` is taken.
    next_id: Option<i64>,
}

/// In-memory repository. Beans are kept in id order; queries are evaluated
/// against each bean's row image.
#[derive(Debug)]
pub struct MemoryRepository<T> {
    table: String,
    state: RwLock<State<T>>,
}

impl<T: EntityBean> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            table: T::descriptor().table,
            state: RwLock::new(State {
                rows: BTreeMap::new(),
                next_id: Some(1),
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.rows.is_empty()
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.rows.clear();
        state.next_id = Some(1);
    }
}

impl<T: EntityBean> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: EntityBean> Repository<T> for MemoryRepository<T> {
    async fn save(&self, bean: T) -> OrmResult<T> {
        let descriptor = T::descriptor();
        let mut state = self.state.write().await;

        let (key, bean) = match entity::id_of(&bean)? {
            Some(id) => {
                let key = Key::from_param(&self.table, id)?;
                if let Key::Int(v) = key {
                    state.next_id = match (state.next_id, v.checked_add(1)) {
                        (Some(next), Some(after)) => Some(next.max(after)),
                        _ => None,
                    };
                }
                (key, bean)
            }
            None if descriptor.id_generated => {
                let id = state.next_id.ok_or_else(|| {
                    OrmError::invalid_input(format!("Generated ids exhausted for {}", self.table))
                })?;
                state.next_id = id.checked_add(1);
                (Key::Int(id), entity::with_id(&bean, id)?)
            }
            None => {
                return Err(OrmError::mapping(
                    &self.table,
                    format!("Id column '{}' must be set", descriptor.id_column),
                ));
            }
        };

        let row = entity::to_row(&bean)?;
        debug!(table = %self.table, key = ?key, "Saving bean");
        state.rows.insert(
            key,
            Stored {
                bean: bean.clone(),
                row,
            },
        );
        Ok(bean)
    }

    async fn find_by_id(&self, id: SqlParam) -> OrmResult<Option<T>> {
        let key = Key::from_param(&self.table, id)?;
        let state = self.state.read().await;
        Ok(state.rows.get(&key).map(|s| s.bean.clone()))
    }

    async fn find_all(&self) -> OrmResult<Vec<T>> {
        let state = self.state.read().await;
        Ok(state.rows.values().map(|s| s.bean.clone()).collect())
    }

    async fn find_where(&self, query: &Query) -> OrmResult<Vec<T>> {
        let candidates: Vec<Stored<T>> = {
            let state = self.state.read().await;
            state.rows.values().cloned().collect()
        };
        Ok(query
            .apply(candidates, |s| &s.row)
            .into_iter()
            .map(|s| s.bean)
            .collect())
    }

    async fn delete_by_id(&self, id: SqlParam) -> OrmResult<bool> {
        let key = Key::from_param(&self.table, id)?;
        let mut state = self.state.write().await;
        Ok(state.rows.remove(&key).is_some())
    }

    async fn count(&self) -> OrmResult<u64> {
        Ok(self.state.read().await.rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::LogicalType;
    use crate::entity::{ColumnDescriptor, EntityDescriptor};
    use crate::statement::{Expr, OrderBy};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct City {
        id: Option<i64>,
        name: String,
        population: i64,
    }

    impl EntityBean for City {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::new("city", "id")
                .generated_id()
                .column(ColumnDescriptor::new("id", LogicalType::BigInt))
                .column(ColumnDescriptor::new("name", LogicalType::Varchar(80)))
                .column(ColumnDescriptor::new("population", LogicalType::BigInt))
        }
    }

    fn city(name: &str, population: i64) -> City {
        City {
            id: None,
            name: name.to_string(),
            population,
        }
    }

    #[tokio::test]
    async fn test_generated_ids_follow_explicit_ones() {
        let repo = MemoryRepository::<City>::new();
        let first = repo.save(city("Oslo", 700_000)).await.unwrap();
        assert_eq!(first.id, Some(1));

        let mut explicit = city("Bergen", 285_000);
        explicit.id = Some(10);
        repo.save(explicit).await.unwrap();

        let next = repo.save(city("Tromso", 77_000)).await.unwrap();
        assert_eq!(next.id, Some(11));
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_save_replaces_existing() {
        let repo = MemoryRepository::<City>::new();
        let mut saved = repo.save(city("Oslo", 1)).await.unwrap();
        saved.population = 2;
        repo.save(saved.clone()).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let found = repo.find_by_id(SqlParam::Int(1)).await.unwrap().unwrap();
        assert_eq!(found.population, 2);
    }

    #[tokio::test]
    async fn test_find_where_filters_sorts_and_pages() {
        let repo = MemoryRepository::<City>::new();
        for (name, population) in [("A", 10), ("B", 500), ("C", 300), ("D", 900)] {
            repo.save(city(name, population)).await.unwrap();
        }

        let query = Query::new()
            .filter(Expr::gt("population", 100))
            .order_by(OrderBy::desc("population"))
            .offset(1)
            .limit(5);
        let names: Vec<String> = repo
            .find_where(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn test_delete_and_exists() {
        let repo = MemoryRepository::<City>::new();
        repo.save(city("Oslo", 1)).await.unwrap();

        assert!(repo.exists_by_id(SqlParam::Int(1)).await.unwrap());
        assert!(repo.delete_by_id(SqlParam::Int(1)).await.unwrap());
        assert!(!repo.delete_by_id(SqlParam::Int(1)).await.unwrap());
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_unsupported_id_type() {
        let repo = MemoryRepository::<City>::new();
        let result = repo.find_by_id(SqlParam::Bool(true)).await;
        assert!(matches!(result, Err(OrmError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_generated_ids_exhausted_after_max() {
        let repo = MemoryRepository::<City>::new();
        let mut last = city("Edge", 1);
        last.id = Some(i64::MAX);
        repo.save(last.clone()).await.unwrap();

        let result = repo.save(city("Overflow", 2)).await;
        assert!(matches!(result, Err(OrmError::InvalidInput { .. })));
        assert_eq!(repo.count().await.unwrap(), 1);
        let kept = repo.find_by_id(SqlParam::Int(i64::MAX)).await.unwrap();
        assert_eq!(kept, Some(last));

        // Explicit ids still work, and clearing starts over
        let mut explicit = city("Manual", 3);
        explicit.id = Some(5);
        repo.save(explicit).await.unwrap();
        repo.clear().await;
        assert_eq!(repo.save(city("Fresh", 4)).await.unwrap().id, Some(1));
    }
}
