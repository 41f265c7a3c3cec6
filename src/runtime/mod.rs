//! Core ORM runtime.
//!
//! - `database`: async session over the reactive binding
//! - `blocking`: synchronous session over the blocking binding
//! - `mapper`: entity operations rendered to statements
//! - `ddl`: table DDL from entity descriptors
//! - `registry`: named databases with a default

pub mod blocking;
pub mod database;
pub mod ddl;
pub mod mapper;
pub mod registry;

pub use blocking::BlockingDatabase;
pub use database::Database;
pub use ddl::{create_table_sql, drop_table_sql};
pub use registry::DatabaseRegistry;
