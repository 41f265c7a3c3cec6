//! polyglot-orm command line.
//!
//! Inspects the module graph, renders statements for any dialect, and runs
//! read-only queries through either binding family.

use clap::Parser;
use polyglot_orm::config::{BindingArg, Command, Config, DatabaseConfig};
use polyglot_orm::dialect::dialect_for;
use polyglot_orm::models::{DEFAULT_ROW_LIMIT, Platform, QueryResult, SqlParam};
use polyglot_orm::modules::ModuleGraph;
use polyglot_orm::runtime::{BlockingDatabase, Database};
use polyglot_orm::statement::{Expr, OrderBy, Select};
use tokio::runtime::Builder;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output stays machine-readable
    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn main() {
    let config = Config::parse();
    init_tracing(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting polyglot-orm");

    let result = match &config.command {
        Command::Modules { check, readable } => run_modules(*check, readable.as_deref()),
        Command::Render {
            platform,
            table,
            filters,
            order_by,
            limit,
            offset,
        } => run_render(*platform, table, filters, order_by.as_deref(), *limit, *offset),
        Command::Query {
            sql,
            name,
            binding,
            limit,
        } => run_query(&config, sql, name.as_deref(), *binding, *limit),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

/// Print the graph (or one module's readable set). Returns false on violations.
fn run_modules(check: bool, readable: Option<&str>) -> CliResult<bool> {
    let graph = ModuleGraph::builtin();

    if let Some(name) = readable {
        for module in graph.readable_from(name)? {
            println!("{}", module);
        }
        return Ok(true);
    }

    if !check {
        let modules: Vec<_> = graph.iter().collect();
        println!("{}", serde_json::to_string_pretty(&modules)?);
        return Ok(true);
    }

    let violations = graph.validate();
    if violations.is_empty() {
        println!("{} modules, no violations", graph.len());
        return Ok(true);
    }
    for violation in &violations {
        println!("{}", violation);
    }
    Ok(false)
}

fn run_render(
    platform: Platform,
    table: &str,
    filters: &[String],
    order_by: Option<&str>,
    limit: Option<u64>,
    offset: Option<u64>,
) -> CliResult<bool> {
    let mut select = Select::table(table);

    for filter in filters {
        let (column, value) = filter
            .split_once('=')
            .ok_or_else(|| format!("Filter must be COLUMN=VALUE: {}", filter))?;
        select = select.filter(Expr::eq(column.trim(), parse_literal(value.trim())));
    }

    if let Some(order) = order_by {
        let mut parts = order.split_whitespace();
        let column = parts.next().ok_or("Empty --order-by")?;
        select = match parts.next() {
            Some(dir) if dir.eq_ignore_ascii_case("desc") => select.order_by(OrderBy::desc(column)),
            _ => select.order_by(OrderBy::asc(column)),
        };
    }
    if let Some(n) = limit {
        select = select.limit(n);
    }
    if let Some(m) = offset {
        select = select.offset(m);
    }

    let dialect = dialect_for(platform);
    let stmt = select.render(dialect.as_ref());
    println!("{}", stmt.sql);
    if !stmt.params.is_empty() {
        println!("{}", serde_json::to_string(&stmt.params)?);
    }
    Ok(true)
}

fn parse_literal(value: &str) -> SqlParam {
    if let Ok(v) = value.parse::<i64>() {
        SqlParam::Int(v)
    } else if let Ok(v) = value.parse::<f64>() {
        SqlParam::Float(v)
    } else if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        SqlParam::Bool(value.eq_ignore_ascii_case("true"))
    } else if value.eq_ignore_ascii_case("null") {
        SqlParam::Null
    } else {
        SqlParam::String(value.to_string())
    }
}

fn run_query(
    config: &Config,
    sql: &str,
    name: Option<&str>,
    binding: BindingArg,
    limit: Option<u32>,
) -> CliResult<bool> {
    let databases = config.parse_databases()?;
    let db_config = select_database(&databases, name)?;
    let connection = db_config.to_connection_config();
    let limit = limit.unwrap_or(DEFAULT_ROW_LIMIT);
    let timeout = config.query_timeout_duration();

    let result = match binding {
        BindingArg::Blocking => {
            let database = BlockingDatabase::connect(&connection)?.with_query_timeout(timeout);
            let result = database.query_raw(sql, &[], limit);
            database.close();
            result?
        }
        BindingArg::Reactive => {
            Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(async {
                    let database = Database::connect(&connection)
                        .await?
                        .with_query_timeout(timeout);
                    let result = database.query_raw(sql, &[], limit).await;
                    database.close().await;
                    result
                })?
        }
    };

    print_result(&result)?;
    Ok(true)
}

fn select_database<'a>(
    databases: &'a [DatabaseConfig],
    name: Option<&str>,
) -> CliResult<&'a DatabaseConfig> {
    match name {
        Some(name) => databases
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| format!("Database '{}' is not configured", name).into()),
        None => databases.first().ok_or_else(|| {
            "No database configured. Use --database <url> or set ORM_DATABASE".into()
        }),
    }
}

fn print_result(result: &QueryResult) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    if result.truncated {
        eprintln!("(truncated at {} rows)", result.row_count());
    }
    Ok(())
}
