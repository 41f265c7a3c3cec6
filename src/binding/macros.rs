//! Driver dispatch macro.

/// Expand one match arm per `DbPool` variant.
///
/// ```ignore
/// impl_db_dispatch!(pool, {
///     MySql(p) => mysql::execute(p, sql).await,
///     Postgres(p) => postgres::execute(p, sql).await,
///     SQLite(p) => sqlite::execute(p, sql).await,
/// })
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::binding::DbPool::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
