//! Named database registry.
//!
//! Holds every open [`Database`] by name. The first one registered becomes
//! the default until another is chosen. Locks are never held across pool
//! creation or close.

use super::database::Database;
use crate::error::{OrmError, OrmResult};
use crate::models::{ConnectionConfig, ConnectionInfo};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Default)]
struct RegistryState {
    databases: HashMap<String, Database>,
    default: Option<String>,
}

#[derive(Clone, Default)]
pub struct DatabaseRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl std::fmt::Debug for DatabaseRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseRegistry").finish_non_exhaustive()
    }
}

impl DatabaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `config` and register it under its name.
    pub async fn connect(&self, config: &ConnectionConfig) -> OrmResult<ConnectionInfo> {
        {
            let state = self.state.read().await;
            if state.databases.contains_key(&config.name) {
                return Err(duplicate(&config.name));
            }
        }

        let database = Database::connect(config).await?;
        let info = database.info();
        self.register(database).await?;
        Ok(info)
    }

    /// Register an already connected database. A duplicate name is rejected
    /// and the rejected database is closed.
    pub async fn register(&self, database: Database) -> OrmResult<()> {
        let name = database.name().to_string();

        let rejected = {
            let mut state = self.state.write().await;
            if state.databases.contains_key(&name) {
                Some(database)
            } else {
                state.databases.insert(name.clone(), database);
                if state.default.is_none() {
                    state.default = Some(name.clone());
                }
                None
            }
        };

        if let Some(database) = rejected {
            database.close().await;
            return Err(duplicate(&name));
        }

        info!(name = %name, "Database registered");
        Ok(())
    }

    pub async fn get(&self, name: &str) -> OrmResult<Database> {
        let state = self.state.read().await;
        state
            .databases
            .get(name)
            .cloned()
            .ok_or_else(|| OrmError::database_not_found(name))
    }

    /// The default database.
    pub async fn default_database(&self) -> OrmResult<Database> {
        let state = self.state.read().await;
        state
            .default
            .as_ref()
            .and_then(|name| state.databases.get(name))
            .cloned()
            .ok_or_else(|| OrmError::invalid_input("No database is registered"))
    }

    pub async fn set_default(&self, name: &str) -> OrmResult<()> {
        let mut state = self.state.write().await;
        if !state.databases.contains_key(name) {
            return Err(OrmError::database_not_found(name));
        }
        state.default = Some(name.to_string());
        Ok(())
    }

    /// Registered names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state.databases.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn list(&self) -> Vec<ConnectionInfo> {
        let state = self.state.read().await;
        let mut infos: Vec<ConnectionInfo> =
            state.databases.values().map(Database::info).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Remove and close a database. If it was the default, the smallest
    /// remaining name takes over.
    pub async fn disconnect(&self, name: &str) -> OrmResult<()> {
        let removed = {
            let mut state = self.state.write().await;
            let removed = state.databases.remove(name);
            if removed.is_some() && state.default.as_deref() == Some(name) {
                state.default = state.databases.keys().min().cloned();
            }
            removed
        };

        match removed {
            Some(database) => {
                database.close().await;
                info!(name = %name, "Database disconnected");
                Ok(())
            }
            None => Err(OrmError::database_not_found(name)),
        }
    }

    /// Close every registered database.
    pub async fn close_all(&self) {
        let databases: Vec<Database> = {
            let mut state = self.state.write().await;
            state.default = None;
            state.databases.drain().map(|(_, db)| db).collect()
        };

        info!(count = databases.len(), "Closing all databases");
        for database in databases {
            database.close().await;
        }
    }
}

fn duplicate(name: &str) -> OrmError {
    OrmError::invalid_input(format!(
        "Database '{}' is already registered; disconnect it first or use another name",
        name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolOptions;

    fn sqlite(name: &str) -> ConnectionConfig {
        ConnectionConfig::new(name, "sqlite::memory:", false, PoolOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_first_registered_is_default() {
        let registry = DatabaseRegistry::new();
        registry.connect(&sqlite("main")).await.unwrap();
        registry.connect(&sqlite("audit")).await.unwrap();

        assert_eq!(registry.default_database().await.unwrap().name(), "main");
        assert_eq!(registry.names().await, vec!["audit", "main"]);

        registry.set_default("audit").await.unwrap();
        assert_eq!(registry.default_database().await.unwrap().name(), "audit");
        registry.close_all().await;
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let registry = DatabaseRegistry::new();
        registry.connect(&sqlite("main")).await.unwrap();
        let result = registry.connect(&sqlite("main")).await;
        assert!(matches!(result, Err(OrmError::InvalidInput { .. })));
        registry.close_all().await;
    }

    #[tokio::test]
    async fn test_disconnect_moves_default() {
        let registry = DatabaseRegistry::new();
        registry.connect(&sqlite("a")).await.unwrap();
        registry.connect(&sqlite("b")).await.unwrap();

        registry.disconnect("a").await.unwrap();
        assert_eq!(registry.default_database().await.unwrap().name(), "b");
        assert!(matches!(
            registry.get("a").await,
            Err(OrmError::DatabaseNotFound { .. })
        ));
        assert!(registry.disconnect("a").await.is_err());

        registry.close_all().await;
        assert!(registry.default_database().await.is_err());
    }
}
