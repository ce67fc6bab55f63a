//! Handler chain semantics: ordering, parameter and result rewriting,
//! and error short-circuiting.

use sqlport::{
    build_context, inprocess, migration, Configuration, Error, FnHandler, HandlerRegistry,
    NoopGenerator, Parameters, RequestContext, RuntimeContext, SqlValue,
};
use std::path::Path;
use std::sync::{Arc, Mutex};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

type Trace = Arc<Mutex<Vec<&'static str>>>;

fn tracing_handler(trace: &Trace, label: &'static str) -> Arc<FnHandler<impl Fn(&mut RequestContext) -> Result<(), Error> + Send + Sync>> {
    let trace = trace.clone();
    Arc::new(FnHandler(move |_context: &mut RequestContext| -> Result<(), Error> {
        trace.lock().unwrap().push(label);
        Ok(())
    }))
}

fn registry(trace: &Trace) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    // folder before: record, and simulate an error for one magic value
    let folder_trace = trace.clone();
    registry.on_before(
        "default",
        Arc::new(FnHandler(move |context: &mut RequestContext| -> Result<(), Error> {
            folder_trace.lock().unwrap().push("folder-before");
            if context.parameters.get("stuff") == Some(&SqlValue::Text("error".into())) {
                return Err(Error::Handler("simulated error".into()));
            }
            context.allow("folder checked");
            Ok(())
        })),
    );

    // module before: decorate the parameter
    let before_trace = trace.clone();
    registry.on_before(
        "default/hello",
        Arc::new(FnHandler(move |context: &mut RequestContext| -> Result<(), Error> {
            before_trace.lock().unwrap().push("module-before");
            if let Some(SqlValue::Text(stuff)) = context.parameters.get_mut("stuff") {
                stuff.push_str("!!!");
            }
            Ok(())
        })),
    );

    // module after: double the result list
    let after_trace = trace.clone();
    registry.on_after(
        "default/hello",
        Arc::new(FnHandler(move |context: &mut RequestContext| -> Result<(), Error> {
            after_trace.lock().unwrap().push("module-after");
            let doubled: Vec<_> = context
                .results
                .iter()
                .chain(context.results.iter())
                .cloned()
                .collect();
            context.results = doubled;
            Ok(())
        })),
    );

    registry.on_after("default", tracing_handler(trace, "folder-after"));
    registry.on_after_error("default/hello", tracing_handler(trace, "after-error"));
    registry
}

async fn build(root: &Path, registry: &HandlerRegistry) -> RuntimeContext {
    write(
        root,
        "sqlport.toml",
        "[databases]\ndefault = \"sqlite:default.db\"\n",
    );
    let configuration = Configuration::load(root).unwrap();
    build_context(&configuration, registry, &NoopGenerator)
        .await
        .unwrap()
}

fn stuff(value: &str) -> Parameters {
    let mut parameters = Parameters::new();
    parameters.insert("stuff".into(), SqlValue::Text(value.into()));
    parameters
}

#[tokio::test]
async fn chain_runs_in_order_and_rewrites_both_directions() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "default/hello.sql", "SELECT :stuff AS stuff");
    let trace: Trace = Arc::new(Mutex::new(Vec::new()));
    let context = build(dir.path(), &registry(&trace)).await;

    let rows = inprocess::execute(&context, "default_hello", stuff("whirled"))
        .await
        .unwrap();

    // before handler appended, after handler doubled
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("stuff"), Some(&SqlValue::Text("whirled!!!".into())));
    assert_eq!(rows[1].get("stuff"), Some(&SqlValue::Text("whirled!!!".into())));
    assert_eq!(
        *trace.lock().unwrap(),
        vec!["folder-before", "module-before", "module-after", "folder-after"]
    );
}

#[tokio::test]
async fn before_error_reaches_the_after_error_handler_only() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "default/hello.sql", "SELECT :stuff AS stuff");
    let trace: Trace = Arc::new(Mutex::new(Vec::new()));
    let context = build(dir.path(), &registry(&trace)).await;

    let outcome = inprocess::execute(&context, "default_hello", stuff("error")).await;
    assert!(matches!(outcome, Err(Error::Handler(_))));
    assert_eq!(*trace.lock().unwrap(), vec!["folder-before", "after-error"]);

    // an unrelated request right after is untouched by the failure
    trace.lock().unwrap().clear();
    let rows = inprocess::execute(&context, "default_hello", stuff("fine"))
        .await
        .unwrap();
    assert_eq!(rows[0].get("stuff"), Some(&SqlValue::Text("fine!!!".into())));
}

#[tokio::test]
async fn before_error_prevents_sql_execution() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "migrations/default/001.sql",
        "CREATE TABLE notes(body text)",
    );
    write(dir.path(), "default/add.sql", "INSERT INTO notes VALUES (:stuff)");
    write(dir.path(), "default/count.sql", "SELECT COUNT(*) AS n FROM notes");
    let trace: Trace = Arc::new(Mutex::new(Vec::new()));
    let registry = registry(&trace);

    let bootstrap = build(dir.path(), &registry).await;
    migration::migrate(&bootstrap).await.unwrap();
    drop(bootstrap);
    let context = build(dir.path(), &registry).await;

    let outcome = inprocess::execute(&context, "default_add", stuff("error")).await;
    assert!(outcome.is_err());
    let rows = inprocess::execute(&context, "default_count", Parameters::new())
        .await
        .unwrap();
    assert_eq!(rows[0].get("n"), Some(&SqlValue::Number(0.0)));

    // the same module still works for ordinary parameters
    inprocess::execute(&context, "default_add", stuff("kept"))
        .await
        .unwrap();
    let rows = inprocess::execute(&context, "default_count", Parameters::new())
        .await
        .unwrap();
    assert_eq!(rows[0].get("n"), Some(&SqlValue::Number(1.0)));
}
