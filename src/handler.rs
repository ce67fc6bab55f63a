//! The handler chain's building blocks: the one context value every
//! handler receives, security grants, and the scope-keyed lookup table
//! that replaces any kind of dynamic code loading.

use crate::error::Error;
use crate::value::{Parameters, Row};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantKind {
    Allow,
    Deny,
}

/// A single security decision, accumulated per request and never
/// persisted. Advisory: the chain records grants, it does not enforce
/// them.
#[derive(Debug, Clone, Serialize)]
pub struct Grant {
    pub kind: GrantKind,
    pub message: String,
}

/// The one value passed through a module's handler chain. Handlers may
/// rewrite parameters, reshape results, and record grants; the final
/// results go back to the caller.
#[derive(Debug, Default)]
pub struct RequestContext {
    pub grants: Vec<Grant>,
    pub parameters: Parameters,
    pub results: Vec<Row>,
    /// Set before the after-error handler runs.
    pub error: Option<String>,
}

impl RequestContext {
    pub fn with_parameters(parameters: Parameters) -> Self {
        Self {
            parameters,
            ..Default::default()
        }
    }

    /// Record that execution should be allowed, with any helpful message.
    pub fn allow(&mut self, message: impl Into<String>) {
        self.grants.push(Grant {
            kind: GrantKind::Allow,
            message: message.into(),
        });
    }

    /// Record that execution should be denied, with any helpful message.
    pub fn deny(&mut self, message: impl Into<String>) {
        self.grants.push(Grant {
            kind: GrantKind::Deny,
            message: message.into(),
        });
    }
}

/// A before/after hook around module execution. Failing short-circuits
/// the chain into the module's after-error handler.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, context: &mut RequestContext) -> Result<(), Error>;
}

/// Adapt a plain closure into a [`Handler`]; handy for small hooks.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut RequestContext) -> Result<(), Error> + Send + Sync,
{
    async fn handle(&self, context: &mut RequestContext) -> Result<(), Error> {
        (self.0)(context)
    }
}

/// Handler lookup table, fixed once a context is built. Scopes are folder
/// paths (`"default"`, `"default/nested"`) or module paths
/// (`"default/nested/echo"`).
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    before: HashMap<String, Arc<dyn Handler>>,
    after: HashMap<String, Arc<dyn Handler>>,
    after_error: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before(&mut self, scope: impl Into<String>, handler: Arc<dyn Handler>) -> &mut Self {
        self.before.insert(scope.into(), handler);
        self
    }

    pub fn on_after(&mut self, scope: impl Into<String>, handler: Arc<dyn Handler>) -> &mut Self {
        self.after.insert(scope.into(), handler);
        self
    }

    pub fn on_after_error(
        &mut self,
        scope: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        self.after_error.insert(scope.into(), handler);
        self
    }

    pub(crate) fn before(&self, scope: &str) -> Option<Arc<dyn Handler>> {
        self.before.get(scope).cloned()
    }

    pub(crate) fn after(&self, scope: &str) -> Option<Arc<dyn Handler>> {
        self.after.get(scope).cloned()
    }

    pub(crate) fn after_error(&self, scope: &str) -> Option<Arc<dyn Handler>> {
        self.after_error.get(scope).cloned()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .field("after_error", &self.after_error.len())
            .finish()
    }
}
