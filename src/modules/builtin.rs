//! The module set shipped with the runtime.
//!
//! Adapter rows mirror the deployable units: each names its dialect, the
//! binding runtime it builds on and the third-party driver it wraps.

use super::descriptor::{ModuleDescriptor, ModuleKind};
use super::graph::{ENTITY_MODULE, ModuleGraph};
use crate::models::{BindingKind, Platform};

fn adapter(platform: Platform, binding: BindingKind) -> ModuleDescriptor {
    ModuleDescriptor::new(
        format!("{}.{}", platform.module_prefix(), binding.module_suffix()),
        ModuleKind::Adapter { platform, binding },
    )
}

fn dialect(platform: Platform) -> ModuleDescriptor {
    ModuleDescriptor::new(
        format!("{}.dialect", platform.module_prefix()),
        ModuleKind::Dialect { platform },
    )
    .exports(format!("orm::dialect::{}", platform.module_prefix()))
}

fn driver(name: &str, provided_by: Option<&str>) -> ModuleDescriptor {
    ModuleDescriptor::new(
        name,
        ModuleKind::Driver {
            provided_by: provided_by.map(String::from),
        },
    )
}

/// Adapter modules and their requirements.
fn adapters() -> Vec<ModuleDescriptor> {
    use BindingKind::{Blocking, Reactive};

    vec![
        adapter(Platform::Derby, Blocking)
            .requires("derby.dialect")
            .requires("orm.jdbc")
            .requires("derby.engine"),
        adapter(Platform::H2, Reactive)
            .requires_transitive("orm.r2dbc")
            .requires("r2dbc.h2"),
        adapter(Platform::Hana, Blocking)
            .requires("hana.dialect")
            .requires("ngdbc"),
        adapter(Platform::MariaDB, Blocking)
            .requires("mariadb.dialect")
            .requires("orm.jdbc")
            .requires("mariadb.jdbc-driver"),
        adapter(Platform::MariaDB, Reactive)
            .requires_transitive("orm.r2dbc")
            .requires("r2dbc.mariadb"),
        adapter(Platform::MySQL, Blocking)
            .requires("mysql.dialect")
            .requires("orm.jdbc")
            .requires("mysql-connector"),
        adapter(Platform::Oracle, Reactive)
            .requires_transitive("orm.r2dbc")
            .requires("oracle.r2dbc-driver"),
        adapter(Platform::PostgreSQL, Blocking)
            .requires("postgresql.dialect")
            .requires("postgresql-driver"),
        adapter(Platform::PostgreSQL, Reactive)
            .requires_transitive("orm.r2dbc")
            .requires("r2dbc.postgresql"),
        adapter(Platform::SqlServer, Reactive)
            .requires_transitive("orm.r2dbc")
            .requires("r2dbc.mssql"),
        adapter(Platform::SQLite, Blocking)
            .requires("sqlite.dialect")
            .requires("orm.jdbc")
            .requires("sqlite-driver"),
        adapter(Platform::SQLite, Reactive)
            .requires_transitive("orm.r2dbc")
            .requires("sqlite-driver"),
    ]
}

fn drivers() -> Vec<ModuleDescriptor> {
    vec![
        driver("derby.engine", None),
        driver("r2dbc.h2", None),
        driver("ngdbc", None),
        driver("mariadb.jdbc-driver", Some("sqlx::mysql")),
        driver("r2dbc.mariadb", Some("sqlx::mysql")),
        driver("mysql-connector", Some("sqlx::mysql")),
        driver("oracle.r2dbc-driver", None),
        driver("postgresql-driver", Some("sqlx::postgres")),
        driver("r2dbc.postgresql", Some("sqlx::postgres")),
        driver("r2dbc.mssql", None),
        driver("sqlite-driver", Some("sqlx::sqlite")),
    ]
}

impl ModuleGraph {
    /// The graph of every module shipped with the runtime.
    pub fn builtin() -> Self {
        let mut modules = vec![
            ModuleDescriptor::new(ENTITY_MODULE, ModuleKind::Entity).exports("orm::entity"),
            ModuleDescriptor::new("orm.core", ModuleKind::Core)
                .requires_transitive(ENTITY_MODULE)
                .exports("orm::runtime")
                .exports("orm::statement"),
            ModuleDescriptor::new(
                BindingKind::Blocking.runtime_module(),
                ModuleKind::Runtime {
                    binding: BindingKind::Blocking,
                },
            )
            .requires_transitive("orm.core")
            .exports("orm::binding::blocking"),
            ModuleDescriptor::new(
                BindingKind::Reactive.runtime_module(),
                ModuleKind::Runtime {
                    binding: BindingKind::Reactive,
                },
            )
            .requires_transitive("orm.core")
            .exports("orm::binding::reactive"),
            ModuleDescriptor::new("repository.mem", ModuleKind::Repository)
                .requires_transitive(ENTITY_MODULE)
                .exports("orm::repository::mem"),
        ];
        modules.extend(Platform::ALL.into_iter().map(dialect));
        modules.extend(drivers());
        modules.extend(adapters());

        let mut graph = ModuleGraph::new();
        for module in modules {
            // Names above are unique by construction
            if let Err(e) = graph.register(module) {
                tracing::error!(error = %e, "Duplicate builtin module");
            }
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_graph_is_valid() {
        let graph = ModuleGraph::builtin();
        let violations = graph.validate();
        assert!(violations.is_empty(), "violations: {:?}", violations);
    }

    #[test]
    fn test_builtin_adapter_names() {
        let graph = ModuleGraph::builtin();
        let names: Vec<&str> = graph.adapters().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "derby.jdbc",
                "h2.r2dbc",
                "hana.jdbc",
                "mariadb.jdbc",
                "mariadb.r2dbc",
                "mysql.jdbc",
                "oracle.r2dbc",
                "postgresql.jdbc",
                "postgresql.r2dbc",
                "sqlite.jdbc",
                "sqlite.r2dbc",
                "sqlserver.r2dbc",
            ]
        );
    }

    #[test]
    fn test_adapter_lookup() {
        let graph = ModuleGraph::builtin();
        let module = graph
            .adapter_for(Platform::PostgreSQL, BindingKind::Reactive)
            .unwrap();
        assert_eq!(module.name, "postgresql.r2dbc");
        assert!(graph
            .adapter_for(Platform::MySQL, BindingKind::Reactive)
            .is_none());
        assert!(graph.adapter_for(Platform::Oracle, BindingKind::Blocking).is_none());
    }

    #[test]
    fn test_driver_of_adapter() {
        let graph = ModuleGraph::builtin();
        let driver = graph.driver_of("mysql.jdbc").unwrap();
        assert_eq!(driver.name, "mysql-connector");
        assert_eq!(
            driver.kind,
            ModuleKind::Driver {
                provided_by: Some("sqlx::mysql".to_string())
            }
        );

        let driver = graph.driver_of("hana.jdbc").unwrap();
        assert_eq!(driver.kind, ModuleKind::Driver { provided_by: None });
    }
}
