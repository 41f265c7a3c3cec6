//! One portable query rendered for every supported product.

use polyglot_orm::dialect::{Dialect, LogicalType, dialect_for};
use polyglot_orm::entity::{ColumnDescriptor, EntityDescriptor};
use polyglot_orm::models::{Platform, SqlParam};
use polyglot_orm::runtime::{create_table_sql, drop_table_sql};
use polyglot_orm::statement::{Delete, Expr, Insert, OrderBy, Select, Update, classify};

fn orders_page() -> Select {
    Select::table("orders")
        .columns(["id", "status"])
        .filter(Expr::eq("status", "open"))
        .filter(Expr::gt("total", 100))
        .order_by(OrderBy::desc("id"))
        .limit(10)
        .offset(20)
}

#[test]
fn test_select_page_per_platform() {
    let expected = [
        (
            Platform::PostgreSQL,
            "SELECT id, status FROM orders WHERE status = $1 AND total > $2 \
             ORDER BY id DESC LIMIT 10 OFFSET 20",
        ),
        (
            Platform::MySQL,
            "SELECT id, status FROM orders WHERE status = ? AND total > ? \
             ORDER BY id DESC LIMIT 10 OFFSET 20",
        ),
        (
            Platform::MariaDB,
            "SELECT id, status FROM orders WHERE status = ? AND total > ? \
             ORDER BY id DESC LIMIT 10 OFFSET 20",
        ),
        (
            Platform::SQLite,
            "SELECT id, status FROM orders WHERE status = ? AND total > ? \
             ORDER BY id DESC LIMIT 10 OFFSET 20",
        ),
        (
            Platform::Hana,
            "SELECT id, status FROM orders WHERE status = ? AND total > ? \
             ORDER BY id DESC LIMIT 10 OFFSET 20",
        ),
        (
            Platform::Oracle,
            "SELECT id, status FROM orders WHERE status = :1 AND total > :2 \
             ORDER BY id DESC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY",
        ),
        (
            Platform::SqlServer,
            "SELECT id, status FROM orders WHERE status = @p1 AND total > @p2 \
             ORDER BY id DESC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY",
        ),
        (
            Platform::Derby,
            "SELECT id, status FROM orders WHERE status = ? AND total > ? \
             ORDER BY id DESC OFFSET 20 ROWS FETCH FIRST 10 ROWS ONLY",
        ),
    ];

    for (platform, sql) in expected {
        let stmt = orders_page().render(dialect_for(platform).as_ref());
        assert_eq!(stmt.sql, sql, "platform {}", platform);
        assert_eq!(
            stmt.params,
            vec![SqlParam::String("open".to_string()), SqlParam::Int(100)]
        );
    }
}

#[test]
fn test_offset_without_limit() {
    let select = Select::table("orders").offset(5);

    let sql = |platform| select.render(dialect_for(platform).as_ref()).sql;
    assert_eq!(
        sql(Platform::MySQL),
        "SELECT * FROM orders LIMIT 18446744073709551615 OFFSET 5"
    );
    assert_eq!(sql(Platform::SQLite), "SELECT * FROM orders LIMIT -1 OFFSET 5");
    assert_eq!(sql(Platform::PostgreSQL), "SELECT * FROM orders OFFSET 5");
    assert_eq!(
        sql(Platform::SqlServer),
        "SELECT * FROM orders ORDER BY (SELECT NULL) OFFSET 5 ROWS"
    );
}

#[test]
fn test_reserved_identifiers_use_product_quotes() {
    let select = Select::table("user").columns(["order", "name"]);

    let sql = |platform| select.render(dialect_for(platform).as_ref()).sql;
    assert_eq!(sql(Platform::PostgreSQL), r#"SELECT "order", name FROM "user""#);
    assert_eq!(sql(Platform::MySQL), "SELECT `order`, name FROM `user`");
    assert_eq!(sql(Platform::SqlServer), "SELECT [order], name FROM [user]");
}

#[test]
fn test_write_statements_number_placeholders_in_order() {
    let pg = dialect_for(Platform::PostgreSQL);

    let insert = Insert::table("orders")
        .value("status", "open")
        .value("total", 250)
        .returning("id")
        .render(pg.as_ref());
    assert_eq!(
        insert.sql,
        "INSERT INTO orders (status, total) VALUES ($1, $2) RETURNING id"
    );

    // Assignments come before the WHERE clause, so the filter continues the count
    let update = Update::table("orders")
        .set("status", "closed")
        .filter(Expr::eq("id", 7))
        .render(pg.as_ref())
        .unwrap();
    assert_eq!(update.sql, "UPDATE orders SET status = $1 WHERE id = $2");
    assert_eq!(update.params.len(), 2);

    let delete = Delete::table("orders")
        .filter(Expr::in_list("id", [1, 2, 3]))
        .render(pg.as_ref());
    assert_eq!(delete.sql, "DELETE FROM orders WHERE id IN ($1, $2, $3)");
}

#[test]
fn test_returning_only_where_supported() {
    let insert = Insert::table("orders").value("status", "open").returning("id");

    let mysql = insert.render(dialect_for(Platform::MySQL).as_ref());
    assert_eq!(mysql.sql, "INSERT INTO orders (status) VALUES (?)");

    let mysql_empty = Insert::table("orders").render(dialect_for(Platform::MySQL).as_ref());
    assert_eq!(mysql_empty.sql, "INSERT INTO orders () VALUES ()");
    let pg_empty = Insert::table("orders").render(dialect_for(Platform::PostgreSQL).as_ref());
    assert_eq!(pg_empty.sql, "INSERT INTO orders DEFAULT VALUES");
}

#[test]
fn test_empty_insert_per_platform() {
    let insert = Insert::table("tick").default_column("id");
    let expected = [
        (Platform::PostgreSQL, "INSERT INTO tick DEFAULT VALUES"),
        (Platform::MySQL, "INSERT INTO tick () VALUES ()"),
        (Platform::MariaDB, "INSERT INTO tick () VALUES ()"),
        (Platform::SqlServer, "INSERT INTO tick DEFAULT VALUES"),
        (Platform::H2, "INSERT INTO tick DEFAULT VALUES"),
        (Platform::SQLite, "INSERT INTO tick DEFAULT VALUES"),
        (Platform::Oracle, "INSERT INTO tick (id) VALUES (DEFAULT)"),
        (Platform::Derby, "INSERT INTO tick (id) VALUES (DEFAULT)"),
        (Platform::Hana, "INSERT INTO tick (id) VALUES (DEFAULT)"),
    ];
    for (platform, sql) in expected {
        assert_eq!(insert.render(dialect_for(platform).as_ref()).sql, sql, "{}", platform);
    }
}

#[test]
fn test_nested_boolean_filters() {
    let filter = Expr::eq("status", "open")
        .or(Expr::eq("status", "pending"))
        .and(!Expr::is_null("customer_id"));
    let stmt = Select::table("orders")
        .filter(filter)
        .render(dialect_for(Platform::SQLite).as_ref());
    assert_eq!(
        stmt.sql,
        "SELECT * FROM orders WHERE (status = ? OR status = ?) AND NOT (customer_id IS NULL)"
    );
}

#[test]
fn test_ddl_for_every_platform() {
    let descriptor = EntityDescriptor::new("invoice", "id")
        .generated_id()
        .column(ColumnDescriptor::new("id", LogicalType::BigInt))
        .column(ColumnDescriptor::new("paid", LogicalType::Bool))
        .column(ColumnDescriptor::new("note", LogicalType::Text).nullable());

    for platform in Platform::ALL {
        let dialect = dialect_for(platform);
        let create = create_table_sql(dialect.as_ref(), &descriptor, true).unwrap();
        assert!(create.starts_with("CREATE TABLE "), "{}: {}", platform, create);
        assert!(create.contains(&dialect.column_type(LogicalType::Bool)));
        assert_eq!(
            create.contains("IF NOT EXISTS"),
            dialect.supports_if_not_exists(),
            "{}",
            platform
        );

        let drop = drop_table_sql(dialect.as_ref(), &descriptor, true);
        assert!(drop.starts_with("DROP TABLE "), "{}: {}", platform, drop);
    }
}

#[test]
fn test_rendered_selects_classify_as_reads() {
    for platform in [Platform::PostgreSQL, Platform::MySQL, Platform::SQLite] {
        let dialect: std::sync::Arc<dyn Dialect> = dialect_for(platform);
        let stmt = orders_page().render(dialect.as_ref());
        let classified = classify(&stmt.sql, dialect.as_ref()).unwrap();
        assert_eq!(classified.len(), 1);
        assert!(classified[0].kind.is_read(), "{}", platform);
    }
}
