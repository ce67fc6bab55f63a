//! Bind one module to its database and handler chain, and run requests
//! through the full before/SQL/after sequence.

use crate::db::Database;
use crate::error::Error;
use crate::handler::{Handler, HandlerRegistry, RequestContext};
use crate::module::SqlModule;
use crate::value::{Parameters, Row};
use std::sync::Arc;
use tracing::warn;

/// One module wired for execution. The chain is resolved once, at
/// context-construction time; running a request never consults the
/// registry again.
pub struct ModuleExecutor {
    database: Arc<Database>,
    module: Arc<SqlModule>,
    /// Folder handlers root-to-leaf, then the module's own before hook.
    before: Vec<Arc<dyn Handler>>,
    /// The module's own after hook, then folder handlers leaf-to-root.
    after: Vec<Arc<dyn Handler>>,
    after_error: Option<Arc<dyn Handler>>,
}

impl ModuleExecutor {
    pub(crate) fn bind(
        database: Arc<Database>,
        module: Arc<SqlModule>,
        registry: &HandlerRegistry,
    ) -> Self {
        let module_scope = module.scope();

        let mut before = Vec::new();
        for scope in &module.before_scopes {
            if let Some(handler) = registry.before(scope) {
                before.push(handler);
            }
        }
        if let Some(handler) = registry.before(&module_scope) {
            before.push(handler);
        }

        let mut after = Vec::new();
        if let Some(handler) = registry.after(&module_scope) {
            after.push(handler);
        }
        for scope in &module.after_scopes {
            if let Some(handler) = registry.after(scope) {
                after.push(handler);
            }
        }

        let after_error = registry.after_error(&module_scope);

        Self {
            database,
            module,
            before,
            after,
            after_error,
        }
    }

    pub fn module(&self) -> &Arc<SqlModule> {
        &self.module
    }

    /// Run the chain: befores, the SQL itself, afters. Any failure
    /// short-circuits into the module's after-error handler (when
    /// registered) and then surfaces to the caller; nothing retries.
    pub async fn run(&self, parameters: Parameters) -> Result<Vec<Row>, Error> {
        let mut context = RequestContext::with_parameters(parameters);
        match self.run_chain(&mut context).await {
            Ok(()) => Ok(std::mem::take(&mut context.results)),
            Err(error) => {
                context.error = Some(error.to_string());
                if let Some(handler) = &self.after_error {
                    if let Err(secondary) = handler.handle(&mut context).await {
                        warn!(
                            module = %self.module.context_name,
                            error = %secondary,
                            "after-error handler failed"
                        );
                    }
                }
                Err(error)
            }
        }
    }

    async fn run_chain(&self, context: &mut RequestContext) -> Result<(), Error> {
        for handler in &self.before {
            handler.handle(context).await?;
        }
        context.results = self
            .database
            .adapter()
            .execute(&self.module, &context.parameters)
            .await?;
        for handler in &self.after {
            handler.handle(context).await?;
        }
        Ok(())
    }
}
