//! The per-module analysis pipeline and the per-database sweep.
//!
//! Stages run strictly in order for each module: parse, parameter
//! typing, result typing, artifact materialization. A module that fails
//! any stage is logged and excluded; it never takes the build down.

use crate::db::SqliteAdapter;
use crate::error::Error;
use crate::module::{NamedParameter, SqlModule};
use crate::value::SqlType;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything the code-generation collaborator needs for one module.
#[derive(Debug, Clone)]
pub struct ModuleArtifact {
    pub module: Arc<SqlModule>,
    pub before_scopes: Vec<String>,
    pub after_scopes: Vec<String>,
    /// True only for a single SELECT; drives which HTTP verbs the
    /// transport wires up.
    pub queryable: bool,
}

/// Parameter-type refinement. Intentionally a pass-through: every
/// parameter keeps `SqlType::String`. The stage stays in the pipeline as
/// the extension point where real inference would slot in.
fn refine_parameter_types(_module: &mut SqlModule) {}

async fn analyze_module(adapter: &SqliteAdapter, module: &mut SqlModule) -> Result<(), Error> {
    let path = module.full_path.display().to_string();
    let (statement, names) = adapter.parse(&path, &module.sql)?;
    module.named_parameters = names
        .into_iter()
        .map(|name| NamedParameter {
            name,
            sql_type: SqlType::String,
        })
        .collect();
    module.ast = Some(statement);

    refine_parameter_types(module);

    if module.is_queryable() {
        module.result_columns = adapter.analyze(module).await?;
    }
    debug!(
        module = %module.context_name,
        parameters = module.named_parameters.len(),
        columns = module.result_columns.len(),
        "module analyzed"
    );
    Ok(())
}

/// Analyze every module of one database, serially. The whole sweep runs
/// inside one outer transaction that is always rolled back: analysis
/// executes real statements against the live connection, but must never
/// change durable state. The scratch relations inside `analyze` are
/// cleaned up on their own; the rollback covers everything else.
pub(crate) async fn analyze_database(
    adapter: &SqliteAdapter,
    drafts: Vec<SqlModule>,
) -> Result<(BTreeMap<String, Arc<SqlModule>>, Vec<ModuleArtifact>), Error> {
    let mut modules = BTreeMap::new();
    let mut artifacts = Vec::new();

    adapter.begin().await?;
    for mut draft in drafts {
        match analyze_module(adapter, &mut draft).await {
            Ok(()) => {
                let module = Arc::new(draft);
                artifacts.push(ModuleArtifact {
                    module: module.clone(),
                    before_scopes: module.before_scopes.clone(),
                    after_scopes: module.after_scopes.clone(),
                    queryable: module.is_queryable(),
                });
                modules.insert(module.relative_path.clone(), module);
            }
            Err(error) => {
                warn!(
                    path = %draft.full_path.display(),
                    error = %error,
                    "module excluded from context"
                );
            }
        }
    }
    adapter.rollback().await?;

    Ok((modules, artifacts))
}
