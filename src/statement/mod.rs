//! Database-agnostic statements.
//!
//! - `expr`: predicate trees, rendered to SQL or evaluated over rows
//! - `query`: find criteria (filter, order, paging)
//! - `render`: SELECT/INSERT/UPDATE/DELETE rendered through a dialect
//! - `validator`: read/write classification of raw SQL text

pub mod expr;
pub mod query;
pub mod render;
pub mod validator;

pub use expr::{CompareOp, Expr};
pub use query::{OrderBy, Query};
pub use render::{Delete, Insert, Select, SqlStatement, Update};
pub use validator::{Classified, StatementKind, classify, validate_readonly};
