//! The blocking facade, driven from plain synchronous tests.

use polyglot_orm::config::PoolOptions;
use polyglot_orm::dialect::LogicalType;
use polyglot_orm::error::OrmError;
use polyglot_orm::models::{BindingKind, ConnectionConfig, SqlParam};
use polyglot_orm::runtime::mapper;
use polyglot_orm::statement::{Expr, Query};
use polyglot_orm::{BlockingDatabase, ColumnDescriptor, EntityBean, EntityDescriptor};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Account {
    id: Option<i64>,
    owner: String,
    balance: i64,
}

impl EntityBean for Account {
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new("account", "id")
            .generated_id()
            .column(ColumnDescriptor::new("id", LogicalType::BigInt))
            .column(ColumnDescriptor::new("owner", LogicalType::Varchar(64)))
            .column(ColumnDescriptor::new("balance", LogicalType::BigInt))
    }
}

fn account(owner: &str, balance: i64) -> Account {
    Account {
        id: None,
        owner: owner.to_string(),
        balance,
    }
}

fn connect(dir: &TempDir) -> BlockingDatabase {
    let url = format!("sqlite:{}", dir.path().join("bank.db").display());
    let config = ConnectionConfig::new("bank", url, false, PoolOptions::default()).unwrap();
    let db = BlockingDatabase::connect(&config).unwrap();
    db.create_table::<Account>().unwrap();
    db
}

#[test]
fn test_blocking_crud() {
    let dir = tempfile::tempdir().unwrap();
    let db = connect(&dir);

    let info = db.info();
    assert_eq!(info.binding, BindingKind::Blocking);
    assert_eq!(info.adapter_module, "sqlite.jdbc");
    assert!(info.server_version.is_some());

    let alice = db.insert(&account("alice", 100)).unwrap();
    let bob = db.insert(&account("bob", 50)).unwrap();
    assert_eq!(alice.id, Some(1));
    assert_eq!(bob.id, Some(2));

    let mut richer = bob.clone();
    richer.balance = 75;
    db.update(&richer).unwrap();
    assert_eq!(db.find_by_id::<Account>(2).unwrap(), Some(richer));

    let wealthy: Vec<Account> = db
        .find_where(&Query::new().filter(Expr::ge("balance", 75)))
        .unwrap();
    assert_eq!(wealthy.len(), 2);
    assert_eq!(db.count::<Account>(&Query::new()).unwrap(), 2);

    assert!(db.delete::<Account>(1).unwrap());
    assert_eq!(db.find_all::<Account>().unwrap().len(), 1);
    db.close();
}

#[test]
fn test_with_transaction_commits_on_success() {
    let dir = tempfile::tempdir().unwrap();
    let db = connect(&dir);
    let alice = db.insert(&account("alice", 100)).unwrap();
    let bob = db.insert(&account("bob", 0)).unwrap();

    db.with_transaction(|tx| {
        tx.execute(
            "UPDATE account SET balance = balance - ? WHERE id = ?",
            &[SqlParam::Int(40), SqlParam::Int(alice.id.unwrap())],
        )?;
        tx.execute(
            "UPDATE account SET balance = balance + ? WHERE id = ?",
            &[SqlParam::Int(40), SqlParam::Int(bob.id.unwrap())],
        )?;
        Ok(())
    })
    .unwrap();

    let alice: Account = db.find_by_id(1).unwrap().unwrap();
    let bob: Account = db.find_by_id(2).unwrap().unwrap();
    assert_eq!(alice.balance, 60);
    assert_eq!(bob.balance, 40);
    db.close();
}

#[test]
fn test_with_transaction_rolls_back_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = connect(&dir);
    db.insert(&account("alice", 100)).unwrap();

    let result: Result<(), OrmError> = db.with_transaction(|tx| {
        tx.execute("UPDATE account SET balance = 0", &[])?;
        Err(OrmError::invalid_input("insufficient funds"))
    });
    assert!(matches!(result, Err(OrmError::InvalidInput { .. })));

    let alice: Account = db.find_by_id(1).unwrap().unwrap();
    assert_eq!(alice.balance, 100);
    db.close();
}

#[test]
fn test_explicit_transaction_sees_its_own_writes() {
    let dir = tempfile::tempdir().unwrap();
    let db = connect(&dir);

    let mut tx = db.binding().begin().unwrap();
    assert!(tx.id().starts_with("tx_"));
    let pending = mapper::insert(tx.dialect().as_ref(), &account("carol", 5)).unwrap();
    tx.execute(&pending.statement.sql, &pending.statement.params)
        .unwrap();
    let row = tx
        .fetch_optional("SELECT owner FROM account WHERE balance = ?", &[SqlParam::Int(5)])
        .unwrap()
        .unwrap();
    assert_eq!(row["owner"], "carol");
    tx.rollback().unwrap();

    assert_eq!(db.count::<Account>(&Query::new()).unwrap(), 0);
    db.close();
}

#[test]
fn test_raw_query_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let db = connect(&dir);
    for i in 0..5 {
        db.insert(&account(&format!("user{}", i), i)).unwrap();
    }

    let result = db
        .query_raw("SELECT owner FROM account ORDER BY id", &[], 3)
        .unwrap();
    assert_eq!(result.row_count(), 3);
    assert!(result.truncated);

    let result = db.query_raw("DELETE FROM account", &[], 3);
    assert!(matches!(result, Err(OrmError::Permission { .. })));

    let outcome = db.execute_raw("DELETE FROM account WHERE balance < 2", &[]).unwrap();
    assert_eq!(outcome.rows_affected, 2);
    db.close();
}
