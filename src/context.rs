//! Building the immutable runtime context: the fully-assembled snapshot
//! of databases, modules, and executors serving live traffic.

use crate::config::Configuration;
use crate::db::{Database, SqliteAdapter};
use crate::discovery;
use crate::error::Error;
use crate::executor::ModuleExecutor;
use crate::generator::ModuleGenerator;
use crate::handler::HandlerRegistry;
use crate::module::SqlModule;
use crate::pipeline::{self, ModuleArtifact};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

/// The top-level immutable aggregate. Once built it is never mutated;
/// replacement happens by swapping the whole reference, and the
/// superseded context's connections close when its last reference drops.
pub struct RuntimeContext {
    configuration: Configuration,
    databases: BTreeMap<String, Arc<Database>>,
    /// Flat context-name -> executor registry.
    executors: HashMap<String, Arc<ModuleExecutor>>,
    /// `database/relative/path` -> executor, for the HTTP transport.
    by_path: HashMap<String, Arc<ModuleExecutor>>,
}

impl RuntimeContext {
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn databases(&self) -> &BTreeMap<String, Arc<Database>> {
        &self.databases
    }

    pub fn database(&self, name: &str) -> Option<&Arc<Database>> {
        self.databases.get(name)
    }

    /// Look up an executor by flattened context name.
    pub fn executor(&self, context_name: &str) -> Option<&Arc<ModuleExecutor>> {
        self.executors.get(context_name)
    }

    /// Look up an executor by URL-style path (`database/relative/path`).
    pub fn executor_for_path(&self, path: &str) -> Option<&Arc<ModuleExecutor>> {
        self.by_path.get(path.trim_matches('/'))
    }

    pub fn executors(&self) -> impl Iterator<Item = (&String, &Arc<ModuleExecutor>)> {
        self.executors.iter()
    }

    pub fn module_count(&self) -> usize {
        self.executors.len()
    }
}

async fn build_database(
    configuration: &Configuration,
    name: &str,
    url: &str,
    drafts: Vec<SqlModule>,
) -> Result<(Arc<Database>, Vec<ModuleArtifact>), Error> {
    let adapter = SqliteAdapter::open(name, url, &configuration.root).await?;
    let (modules, artifacts) = pipeline::analyze_database(&adapter, drafts).await?;
    Ok((Arc::new(Database::new(name, adapter, modules)), artifacts))
}

/// Build a complete context from scratch: discovery, per-database
/// analysis (databases run concurrently with each other, modules within
/// one database serialized through its gate), then executor binding.
/// Failure to open any configured database fails the whole build.
pub async fn build_context(
    configuration: &Configuration,
    registry: &HandlerRegistry,
    generator: &dyn ModuleGenerator,
) -> Result<RuntimeContext, Error> {
    let mut discovered = discovery::discover(&configuration.root)?;
    for name in discovered.keys() {
        if !configuration.databases.contains_key(name) {
            warn!(
                database = %name,
                "modules found for an unconfigured database; skipping them"
            );
        }
    }

    let builds = configuration.databases.iter().map(|(name, url)| {
        let drafts = discovered.remove(name).unwrap_or_default();
        build_database(configuration, name, url, drafts)
    });

    let mut databases = BTreeMap::new();
    let mut artifacts = Vec::new();
    for result in futures::future::join_all(builds).await {
        let (database, database_artifacts) = result?;
        databases.insert(database.name().to_string(), database);
        artifacts.extend(database_artifacts);
    }

    let mut executors = HashMap::new();
    let mut by_path = HashMap::new();
    for artifact in &artifacts {
        let module = &artifact.module;
        if executors.contains_key(&module.context_name) {
            warn!(
                path = %module.full_path.display(),
                context_name = %module.context_name,
                "context name collides with an earlier module; excluded"
            );
            continue;
        }
        let database = databases
            .get(&module.database)
            .cloned()
            .ok_or_else(|| Error::ModuleNotFound(module.context_name.clone()))?;
        let executor = Arc::new(ModuleExecutor::bind(database, module.clone(), registry));
        generator.module_analyzed(artifact).await?;
        by_path.insert(module.scope(), executor.clone());
        executors.insert(module.context_name.clone(), executor);
    }

    let context = RuntimeContext {
        configuration: configuration.clone(),
        databases,
        executors,
        by_path,
    };
    generator.context_assembled(&context).await?;
    info!(
        databases = context.databases.len(),
        modules = context.module_count(),
        "context built"
    );
    Ok(context)
}
