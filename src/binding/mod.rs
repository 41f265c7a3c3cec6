//! Driver bindings.
//!
//! Two binding families sit on the same sqlx pools:
//! - `reactive`: async execution with row streams and transactions
//! - `blocking`: a call-and-return facade that drives the reactive binding on
//!   a private runtime
//!
//! `pool`, `params` and `types` hold the per-driver plumbing shared by both.

pub mod blocking;
#[macro_use]
pub mod macros;
mod params;
mod pool;
pub mod reactive;
pub mod transaction;
pub mod types;

pub use blocking::BlockingBinding;
pub use reactive::{ReactiveBinding, RowStream};
pub use transaction::Transaction;

use sqlx::{MySqlPool, PgPool, SqlitePool};

/// Driver-specific pool (avoids AnyPool limitations).
#[derive(Debug, Clone)]
pub enum DbPool {
    MySql(MySqlPool),
    Postgres(PgPool),
    SQLite(SqlitePool),
}

impl DbPool {
    pub async fn close(&self) {
        impl_db_dispatch!(self, {
            MySql(p) => p.close().await,
            Postgres(p) => p.close().await,
            SQLite(p) => p.close().await,
        })
    }

    /// Bundled driver behind this pool, as named in driver modules.
    pub fn driver(&self) -> &'static str {
        match self {
            DbPool::MySql(_) => "sqlx::mysql",
            DbPool::Postgres(_) => "sqlx::postgres",
            DbPool::SQLite(_) => "sqlx::sqlite",
        }
    }

    pub fn is_closed(&self) -> bool {
        impl_db_dispatch!(self, {
            MySql(p) => p.is_closed(),
            Postgres(p) => p.is_closed(),
            SQLite(p) => p.is_closed(),
        })
    }
}
