//! Raw SQL classification.
//!
//! Statements passed as text (rather than built through `Select`/`Insert`/...)
//! are parsed with the sqlparser dialect of the target product and sorted into
//! read and write categories. Read-only sessions and `query_raw` use this to
//! reject anything that could modify data.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use sqlparser::ast::Statement;
use sqlparser::parser::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// SELECT, SHOW, EXPLAIN of a read
    Read,
    /// INSERT, UPDATE, DELETE, MERGE, COPY
    DmlWrite,
    /// CREATE, ALTER, DROP, TRUNCATE
    Ddl,
    /// BEGIN, COMMIT, ROLLBACK, SAVEPOINT
    Transaction,
    /// CALL, EXECUTE, PREPARE
    ProcedureCall,
    /// GRANT, SET, LOCK, VACUUM and friends
    Administrative,
    Unknown,
}

impl StatementKind {
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read)
    }

    fn rejection(&self) -> &'static str {
        match self {
            Self::Read => "",
            Self::DmlWrite => "Writes are not allowed here. Use execute_raw or a repository.",
            Self::Ddl => "Schema changes are not allowed here. Use execute_raw or create_table.",
            Self::Transaction => "Transaction control is not allowed here. Use begin().",
            Self::ProcedureCall => "Procedure calls may modify data and are not allowed here.",
            Self::Administrative => "Administrative statements are not allowed here.",
            Self::Unknown => "Unrecognized statement. Only queries are allowed here.",
        }
    }
}

/// A parsed statement with its category and a short operation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub kind: StatementKind,
    pub operation: &'static str,
}

/// Parse `sql` with the dialect's parser and classify every statement.
pub fn classify(sql: &str, dialect: &dyn Dialect) -> OrmResult<Vec<Classified>> {
    let parser_dialect = dialect.parser_dialect();
    let statements = Parser::parse_sql(parser_dialect.as_ref(), sql).map_err(|e| {
        OrmError::invalid_input(format!(
            "Failed to parse SQL for {}: {}",
            dialect.platform(),
            e
        ))
    })?;

    if statements.is_empty() {
        return Err(OrmError::invalid_input("Empty SQL statement"));
    }

    Ok(statements
        .iter()
        .map(|stmt| {
            let (kind, operation) = classify_statement(stmt);
            Classified { kind, operation }
        })
        .collect())
}

/// Accept `sql` only when every statement in it is a read.
pub fn validate_readonly(sql: &str, dialect: &dyn Dialect) -> OrmResult<()> {
    for stmt in classify(sql, dialect)? {
        if !stmt.kind.is_read() {
            return Err(OrmError::permission(stmt.operation, stmt.kind.rejection()));
        }
    }
    Ok(())
}

fn classify_statement(stmt: &Statement) -> (StatementKind, &'static str) {
    use StatementKind::*;

    match stmt {
        Statement::Query(_) => (Read, "SELECT"),
        Statement::ShowTables { .. } => (Read, "SHOW TABLES"),
        Statement::ShowColumns { .. } => (Read, "SHOW COLUMNS"),
        Statement::ShowDatabases { .. } => (Read, "SHOW DATABASES"),
        Statement::ShowSchemas { .. } => (Read, "SHOW SCHEMAS"),
        Statement::ShowCreate { .. } => (Read, "SHOW CREATE"),
        Statement::ShowVariable { .. } => (Read, "SHOW VARIABLE"),
        Statement::ShowVariables { .. } => (Read, "SHOW VARIABLES"),
        Statement::ExplainTable { .. } => (Read, "EXPLAIN TABLE"),
        // EXPLAIN ANALYZE runs the inner statement, so it inherits its category
        Statement::Explain { statement, .. } => match classify_statement(statement) {
            (Read, _) => (Read, "EXPLAIN"),
            inner => inner,
        },

        Statement::Insert(_) => (DmlWrite, "INSERT"),
        Statement::Update { .. } => (DmlWrite, "UPDATE"),
        Statement::Delete(_) => (DmlWrite, "DELETE"),
        Statement::Merge { .. } => (DmlWrite, "MERGE"),
        Statement::Copy { .. } => (DmlWrite, "COPY"),

        Statement::CreateTable { .. } => (Ddl, "CREATE TABLE"),
        Statement::CreateView { .. } => (Ddl, "CREATE VIEW"),
        Statement::CreateIndex(_) => (Ddl, "CREATE INDEX"),
        Statement::CreateSchema { .. } => (Ddl, "CREATE SCHEMA"),
        Statement::CreateDatabase { .. } => (Ddl, "CREATE DATABASE"),
        Statement::CreateSequence { .. } => (Ddl, "CREATE SEQUENCE"),
        Statement::CreateType { .. } => (Ddl, "CREATE TYPE"),
        Statement::CreateFunction { .. } => (Ddl, "CREATE FUNCTION"),
        Statement::CreateProcedure { .. } => (Ddl, "CREATE PROCEDURE"),
        Statement::CreateTrigger { .. } => (Ddl, "CREATE TRIGGER"),
        Statement::CreateRole { .. } => (Ddl, "CREATE ROLE"),
        Statement::CreateVirtualTable { .. } => (Ddl, "CREATE VIRTUAL TABLE"),
        Statement::AlterTable { .. } => (Ddl, "ALTER TABLE"),
        Statement::AlterView { .. } => (Ddl, "ALTER VIEW"),
        Statement::AlterIndex { .. } => (Ddl, "ALTER INDEX"),
        Statement::AlterRole { .. } => (Ddl, "ALTER ROLE"),
        Statement::Drop { .. } => (Ddl, "DROP"),
        Statement::DropFunction { .. } => (Ddl, "DROP FUNCTION"),
        Statement::DropProcedure { .. } => (Ddl, "DROP PROCEDURE"),
        Statement::DropTrigger { .. } => (Ddl, "DROP TRIGGER"),
        Statement::Truncate { .. } => (Ddl, "TRUNCATE"),
        Statement::Comment { .. } => (Ddl, "COMMENT"),

        Statement::StartTransaction { .. } => (Transaction, "BEGIN"),
        Statement::Commit { .. } => (Transaction, "COMMIT"),
        Statement::Rollback { .. } => (Transaction, "ROLLBACK"),
        Statement::Savepoint { .. } => (Transaction, "SAVEPOINT"),
        Statement::ReleaseSavepoint { .. } => (Transaction, "RELEASE SAVEPOINT"),

        Statement::Call { .. } => (ProcedureCall, "CALL"),
        Statement::Execute { .. } => (ProcedureCall, "EXECUTE"),
        Statement::Prepare { .. } => (ProcedureCall, "PREPARE"),

        Statement::Grant { .. } => (Administrative, "GRANT"),
        Statement::Revoke { .. } => (Administrative, "REVOKE"),
        Statement::Set(_) => (Administrative, "SET"),
        Statement::Use(_) => (Administrative, "USE"),
        Statement::Kill { .. } => (Administrative, "KILL"),
        Statement::Vacuum { .. } => (Administrative, "VACUUM"),
        Statement::Analyze { .. } => (Administrative, "ANALYZE"),
        Statement::LockTables { .. } => (Administrative, "LOCK"),
        Statement::UnlockTables => (Administrative, "UNLOCK"),
        Statement::Pragma { .. } => (Administrative, "PRAGMA"),
        Statement::AttachDatabase { .. } => (Administrative, "ATTACH"),

        _ => (Unknown, "Unknown"),
    }
}
