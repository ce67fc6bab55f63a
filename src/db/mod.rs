//! Database layer: the single-connection adapter and its serialization
//! gate, plus the per-context Database aggregate.

pub mod adapter;
pub mod bind;
pub mod governor;

pub use adapter::SqliteAdapter;
pub use bind::SqliteBindValue;
pub use governor::Governor;

use crate::module::SqlModule;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One named backing store inside a runtime context: the adapter plus the
/// analyzed modules that belong to it, keyed by relative path. Created
/// once per context build; the connection closes when the owning context
/// is dropped.
pub struct Database {
    name: String,
    adapter: SqliteAdapter,
    modules: BTreeMap<String, Arc<SqlModule>>,
}

impl Database {
    pub(crate) fn new(
        name: &str,
        adapter: SqliteAdapter,
        modules: BTreeMap<String, Arc<SqlModule>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            adapter,
            modules,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adapter(&self) -> &SqliteAdapter {
        &self.adapter
    }

    pub fn modules(&self) -> &BTreeMap<String, Arc<SqlModule>> {
        &self.modules
    }

    /// Look up a module by its relative path within this database.
    pub fn module(&self, relative_path: &str) -> Option<&Arc<SqlModule>> {
        self.modules.get(relative_path)
    }
}
