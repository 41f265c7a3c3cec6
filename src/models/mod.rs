//! Data models shared across the runtime.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;

pub use connection::{
    BindingKind, ConnectionConfig, ConnectionConfigError, ConnectionInfo, Platform,
};
pub use query::{
    ColumnMetadata, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, ExecOutcome,
    MAX_QUERY_TIMEOUT_SECS, MAX_ROW_LIMIT, QueryResult, RowMap, SqlParam,
};
