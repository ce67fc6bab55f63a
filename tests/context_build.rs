//! Context building end to end: discovery, analysis, and the promises
//! the published snapshot makes.

use sqlport::{
    build_context, inprocess, migration, Configuration, HandlerRegistry, NoopGenerator,
    Parameters, RuntimeContext, SqlType, SqlValue,
};
use std::path::Path;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn configure(root: &Path) -> Configuration {
    write(
        root,
        "sqlport.toml",
        "[databases]\ndefault = \"sqlite:default.db\"\n",
    );
    Configuration::load(root).unwrap()
}

async fn build(configuration: &Configuration) -> RuntimeContext {
    build_context(configuration, &HandlerRegistry::new(), &NoopGenerator)
        .await
        .unwrap()
}

#[tokio::test]
async fn select_modules_get_result_columns_and_stay_read_only() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "default/hello.sql", "SELECT 'hello, world'");
    let configuration = configure(dir.path());

    let context = build(&configuration).await;
    let module = context
        .database("default")
        .unwrap()
        .module("hello")
        .unwrap();
    assert_eq!(module.context_name, "default_hello");
    assert!(!module.mutates_data());
    assert_eq!(module.result_columns.len(), 1);
    assert_eq!(module.result_columns[0].name, "hello_world");
    assert_eq!(module.result_columns[0].sql_type, SqlType::String);

    let rows = inprocess::execute(&context, "default_hello", Parameters::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("hello_world"),
        Some(&SqlValue::Text("hello, world".into()))
    );
}

#[tokio::test]
async fn non_select_modules_have_no_columns_and_mutate() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "default/add.sql", "INSERT INTO notes VALUES (:body)");
    let configuration = configure(dir.path());

    let context = build(&configuration).await;
    let module = context.database("default").unwrap().module("add").unwrap();
    assert!(module.mutates_data());
    assert!(module.result_columns.is_empty());
    assert_eq!(module.named_parameters.len(), 1);
    assert_eq!(module.named_parameters[0].name, "body");
    assert_eq!(module.named_parameters[0].sql_type, SqlType::String);
}

#[tokio::test]
async fn context_names_are_stable_across_rebuilds() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "default/nested/echo.sql", "SELECT :stuff AS stuff");
    let configuration = configure(dir.path());

    let first = build(&configuration).await;
    let second = build(&configuration).await;
    assert!(first.executor("default_nested_echo").is_some());
    assert!(second.executor("default_nested_echo").is_some());
}

#[tokio::test]
async fn broken_modules_are_excluded_without_failing_the_build() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "default/good.sql", "SELECT 1 AS one");
    write(dir.path(), "default/batch.sql", "SELECT 1; SELECT 2");
    write(dir.path(), "default/typo.sql", "SELEKT everything");
    write(dir.path(), "default/missing.sql", "SELECT x FROM no_such_table");
    let configuration = configure(dir.path());

    let context = build(&configuration).await;
    assert_eq!(context.module_count(), 1);
    assert!(context.executor("default_good").is_some());
}

#[tokio::test]
async fn analysis_never_alters_durable_state() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "migrations/default/001.sql",
        "CREATE TABLE strings(string text primary key);\nINSERT INTO strings VALUES('kept')",
    );
    write(
        dir.path(),
        "default/all.sql",
        "SELECT string FROM strings ORDER BY string",
    );
    write(
        dir.path(),
        "default/tables.sql",
        "SELECT name FROM sqlite_master WHERE name LIKE '_sys_analyze%'",
    );
    let configuration = configure(dir.path());

    let bootstrap = build(&configuration).await;
    migration::migrate(&bootstrap).await.unwrap();
    drop(bootstrap);

    // two analysis sweeps in a row, then look at real state
    let _warmup = build(&configuration).await;
    let context = build(&configuration).await;

    let rows = inprocess::execute(&context, "default_all", Parameters::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("string"), Some(&SqlValue::Text("kept".into())));

    let scratch = inprocess::execute(&context, "default_tables", Parameters::new())
        .await
        .unwrap();
    assert!(scratch.is_empty());
}
