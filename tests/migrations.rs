//! Migration semantics: ordering, content-keyed idempotency, and
//! fragment atomicity.

use sqlport::{
    build_context, inprocess, migration, Configuration, HandlerRegistry, NoopGenerator,
    Parameters, RuntimeContext, SqlValue,
};
use std::path::Path;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

async fn build(root: &Path) -> RuntimeContext {
    write(
        root,
        "sqlport.toml",
        "[databases]\ndefault = \"sqlite:default.db\"\n",
    );
    let configuration = Configuration::load(root).unwrap();
    build_context(&configuration, &HandlerRegistry::new(), &NoopGenerator)
        .await
        .unwrap()
}

async fn run(context: &RuntimeContext, name: &str) -> Vec<sqlport::Row> {
    inprocess::execute(context, name, Parameters::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn applying_twice_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "migrations/default/001.sql",
        "CREATE TABLE strings(string text primary key)",
    );
    write(
        dir.path(),
        "migrations/default/002.sql",
        "INSERT INTO strings VALUES('hello world'); INSERT INTO strings VALUES('laser power')",
    );
    write(
        dir.path(),
        "default/all.sql",
        "SELECT string FROM strings ORDER BY string",
    );
    write(
        dir.path(),
        "default/ledger.sql",
        "SELECT COUNT(*) AS n FROM _sys_migrations",
    );

    let bootstrap = build(dir.path()).await;
    migration::migrate(&bootstrap).await.unwrap();
    migration::migrate(&bootstrap).await.unwrap();
    drop(bootstrap);

    let context = build(dir.path()).await;
    migration::migrate(&context).await.unwrap();

    let rows = run(&context, "default_all").await;
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].get("string"),
        Some(&SqlValue::Text("hello world".into()))
    );
    assert_eq!(
        rows[1].get("string"),
        Some(&SqlValue::Text("laser power".into()))
    );

    let ledger = run(&context, "default_ledger").await;
    assert_eq!(ledger[0].get("n"), Some(&SqlValue::Number(2.0)));
}

#[tokio::test]
async fn renamed_identical_content_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "migrations/default/001.sql",
        "CREATE TABLE strings(string text primary key)",
    );
    write(
        dir.path(),
        "migrations/default/002.sql",
        "INSERT INTO strings VALUES('only once')",
    );
    write(dir.path(), "default/all.sql", "SELECT string FROM strings");

    let bootstrap = build(dir.path()).await;
    migration::migrate(&bootstrap).await.unwrap();
    drop(bootstrap);

    // same contents under new names must be skipped by the ledger
    std::fs::rename(
        dir.path().join("migrations/default/002.sql"),
        dir.path().join("migrations/default/202.sql"),
    )
    .unwrap();
    let context = build(dir.path()).await;
    migration::migrate(&context).await.unwrap();

    let rows = run(&context, "default_all").await;
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn failing_file_rolls_back_whole_and_keeps_earlier_files() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "migrations/default/001.sql",
        "CREATE TABLE strings(string text primary key)",
    );
    write(
        dir.path(),
        "migrations/default/002.sql",
        "INSERT INTO strings VALUES('good'); INSERT INTO broken VALUES(1)",
    );
    write(dir.path(), "default/all.sql", "SELECT string FROM strings");

    let bootstrap = build(dir.path()).await;
    assert!(migration::migrate(&bootstrap).await.is_err());
    drop(bootstrap);

    // 001 committed; 002 rolled back entirely, including its first fragment
    let context = build(dir.path()).await;
    let rows = run(&context, "default_all").await;
    assert!(rows.is_empty());
}
