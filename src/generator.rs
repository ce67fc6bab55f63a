//! Seam for the code-generation collaborator. The core hands over a
//! finished artifact per module and the assembled context once; emitting
//! handler stubs, API documents, or client libraries is entirely the
//! collaborator's business.

use crate::context::RuntimeContext;
use crate::error::Error;
use crate::pipeline::ModuleArtifact;
use async_trait::async_trait;

#[async_trait]
pub trait ModuleGenerator: Send + Sync {
    /// Called once per module after its analysis pipeline finishes.
    async fn module_analyzed(&self, artifact: &ModuleArtifact) -> Result<(), Error>;

    /// Called once per context build, after every module is analyzed and
    /// bound into the executor registry.
    async fn context_assembled(&self, context: &RuntimeContext) -> Result<(), Error>;
}

/// The default collaborator: generates nothing.
pub struct NoopGenerator;

#[async_trait]
impl ModuleGenerator for NoopGenerator {
    async fn module_analyzed(&self, _artifact: &ModuleArtifact) -> Result<(), Error> {
        Ok(())
    }

    async fn context_assembled(&self, _context: &RuntimeContext) -> Result<(), Error> {
        Ok(())
    }
}
