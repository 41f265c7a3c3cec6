//! polyglot-orm
//!
//! A pluggable multi-dialect data-access layer. Modules declare the dialect
//! and driver they depend on; the runtime picks the adapter for the
//! configured database, renders database-agnostic statements through its
//! dialect, and executes them over a blocking or a reactive driver binding.

pub mod binding;
pub mod config;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod models;
pub mod modules;
pub mod repository;
pub mod runtime;
pub mod statement;

pub use config::Config;
pub use entity::{ColumnDefault, ColumnDescriptor, EntityBean, EntityDescriptor};
pub use error::{OrmError, OrmResult};
pub use repository::{MemoryRepository, Repository, SqlRepository};
pub use runtime::{BlockingDatabase, Database, DatabaseRegistry};
