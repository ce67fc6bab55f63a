//! Walk the root directory and turn SQL files into module drafts.
//!
//! Discovery performs only read I/O and never touches a database
//! connection, so it is free to run while anything else does.

use crate::error::Error;
use crate::ident::identifier;
use crate::module::SqlModule;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Files and directories listed here (gitignore syntax) are not served.
pub const IGNORE_FILE: &str = ".sqlportignore";

/// Reserved top-level directory holding migration scripts per database.
pub const MIGRATIONS_DIR: &str = "migrations";

/// Walk `root` and group discovered modules by owning database name (the
/// first directory segment). Unreadable entries and files that cannot
/// become modules are skipped with a warning, never a failure.
pub fn discover(root: &Path) -> Result<BTreeMap<String, Vec<SqlModule>>, Error> {
    let mut walker = ignore::WalkBuilder::new(root);
    walker
        .standard_filters(false)
        .add_custom_ignore_filename(IGNORE_FILE);

    let mut by_database: BTreeMap<String, Vec<SqlModule>> = BTreeMap::new();
    for entry in walker.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(error = %error, "skipping unreadable directory entry");
                continue;
            }
        };
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
        let relative = path.strip_prefix(root).unwrap_or(path);
        if let Some(module) = module_from_file(root, relative) {
            by_database
                .entry(module.database.clone())
                .or_default()
                .push(module);
        }
    }

    // deterministic per-database order; analysis and binding follow it
    for modules in by_database.values_mut() {
        modules.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    }
    Ok(by_database)
}

fn module_from_file(root: &Path, relative: &Path) -> Option<SqlModule> {
    let segments: Vec<String> = relative
        .parent()
        .map(|dir| {
            dir.components()
                .map(|c| identifier(&c.as_os_str().to_string_lossy()))
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if segments.is_empty() {
        warn!(path = %relative.display(), "not under a database directory; skipping");
        return None;
    }
    if segments[0] == MIGRATIONS_DIR {
        debug!(path = %relative.display(), "migration script, not a module");
        return None;
    }

    let raw_stem = relative.file_stem()?.to_string_lossy().into_owned();
    let stem = identifier(&raw_stem);
    let database = segments[0].clone();
    let relative_path = segments[1..]
        .iter()
        .cloned()
        .chain(std::iter::once(stem))
        .collect::<Vec<_>>()
        .join("/");
    // one flat token from the raw directory + basename, so the whole
    // path folds in a single pass
    let raw_dir = relative
        .parent()
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_default();
    let context_name = identifier(&format!("{raw_dir}/{raw_stem}"));

    // handler scopes: every path prefix from the database root down to
    // the module's containing folder
    let before_scopes: Vec<String> = (1..=segments.len())
        .map(|end| segments[..end].join("/"))
        .collect();
    let mut after_scopes = before_scopes.clone();
    after_scopes.reverse();

    let full_path = root.join(relative);
    let sql = match std::fs::read_to_string(&full_path) {
        Ok(sql) => sql,
        Err(error) => {
            warn!(path = %full_path.display(), error = %error, "cannot read module; skipping");
            return None;
        }
    };
    let cache_key = format!("{:x}", Sha256::digest(sql.as_bytes()));

    Some(SqlModule {
        database,
        full_path,
        relative_path,
        context_name,
        sql,
        cache_key,
        ast: None,
        named_parameters: Vec::new(),
        result_columns: Vec::new(),
        before_scopes,
        after_scopes,
    })
}
