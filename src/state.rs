//! Shared serving state. The context swaps wholesale on reload; requests
//! hold the snapshot they started with.

use crate::config::Configuration;
use crate::context::{build_context, RuntimeContext};
use crate::error::Error;
use crate::generator::ModuleGenerator;
use crate::handler::HandlerRegistry;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

#[derive(Clone)]
pub struct ServerState {
    shared: Arc<Shared>,
}

struct Shared {
    root: PathBuf,
    registry: HandlerRegistry,
    generator: Arc<dyn ModuleGenerator>,
    /// Replaced wholesale on reload; never mutated in place.
    context: RwLock<Arc<RuntimeContext>>,
}

impl ServerState {
    /// Build the first context. Failure here is fatal: with no prior
    /// context there is nothing to keep serving.
    pub async fn initialize(
        configuration: Configuration,
        registry: HandlerRegistry,
        generator: Arc<dyn ModuleGenerator>,
    ) -> Result<Self, Error> {
        let context = build_context(&configuration, &registry, generator.as_ref()).await?;
        Ok(Self {
            shared: Arc::new(Shared {
                root: configuration.root,
                registry,
                generator,
                context: RwLock::new(Arc::new(context)),
            }),
        })
    }

    /// Snapshot for one request. The request finishes against this
    /// snapshot even if a reload publishes a newer one meanwhile.
    pub fn context(&self) -> Arc<RuntimeContext> {
        self.shared
            .context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rebuild a complete context from scratch (configuration re-read
    /// included) and swap it in. On failure the current context keeps
    /// serving and the error is returned. The superseded context's
    /// connections close once its last in-flight request drops its
    /// reference.
    pub async fn reload(&self) -> Result<(), Error> {
        let configuration = Configuration::load(&self.shared.root)?;
        let fresh = build_context(
            &configuration,
            &self.shared.registry,
            self.shared.generator.as_ref(),
        )
        .await?;
        let previous = {
            let mut slot = self
                .shared
                .context
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, Arc::new(fresh))
        };
        info!(modules = previous.module_count(), "context replaced");
        drop(previous);
        Ok(())
    }
}
