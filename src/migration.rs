//! Run migration scripts from `migrations/<database>/` for every
//! database in a context.
//!
//! Within one database, files apply in lexicographic name order and each
//! commits on its own. Cross-database order follows configuration
//! iteration order and is not part of the contract.

use crate::context::RuntimeContext;
use crate::discovery::MIGRATIONS_DIR;
use crate::error::Error;
use crate::module::MigrationFile;
use std::path::Path;
use tracing::info;

/// Collect the migration files for one database, ordered by name.
fn collect(root: &Path, database: &str) -> Result<Vec<MigrationFile>, Error> {
    let dir = root.join(MIGRATIONS_DIR).join(database);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in ignore::WalkBuilder::new(&dir).standard_filters(false).build() {
        let entry = entry.map_err(|e| Error::Migration {
            name: dir.display().to_string(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if !path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
        {
            continue;
        }
        files.push(MigrationFile {
            name: path.display().to_string(),
            content: std::fs::read_to_string(path)?.trim().to_string(),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Apply pending migrations for every database in the context. A failing
/// file rolls back and stops that database's run; files already recorded
/// in the ledger stay committed.
pub async fn migrate(context: &RuntimeContext) -> Result<(), Error> {
    for (name, database) in context.databases() {
        let files = collect(&context.configuration().root, name)?;
        if files.is_empty() {
            continue;
        }
        info!(database = %name, files = files.len(), "applying migrations");
        database.adapter().migrate(&files).await?;
    }
    Ok(())
}
