//! A SqlModule is one SQL file promoted to an addressable API operation.

use crate::parser;
use crate::value::SqlType;
use serde::Serialize;
use sqlparser::ast::Statement;
use std::path::PathBuf;

/// A named parameter found in a module's SQL. Types default to string;
/// refinement past that is a deliberate, documented limitation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: SqlType,
}

/// One result-set column, discovered by live introspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: SqlType,
}

/// One SQL file, populated progressively by the analysis pipeline and
/// immutable once the runtime context publishes it.
#[derive(Debug, Clone)]
pub struct SqlModule {
    /// Name of the owning database (first path segment under the root).
    pub database: String,
    /// Fully-qualified source path on disk.
    pub full_path: PathBuf,
    /// Slash-separated sanitized path within the database, no extension.
    pub relative_path: String,
    /// Globally-unique flattened identifier derived from the path.
    pub context_name: String,
    /// Raw SQL text as read from disk.
    pub sql: String,
    /// Content hash; changing the file contents is a cache miss.
    pub cache_key: String,
    /// Parsed statement; exactly one per file.
    pub ast: Option<Statement>,
    /// Distinct named parameters in first-occurrence order.
    pub named_parameters: Vec<NamedParameter>,
    /// Result columns; empty for non-SELECT modules.
    pub result_columns: Vec<ColumnMetadata>,
    /// Folder handler scopes, database root down to the containing folder.
    pub before_scopes: Vec<String>,
    /// The same scopes, leaf back up to the root.
    pub after_scopes: Vec<String>,
}

impl SqlModule {
    /// True only for a single SELECT; such modules are safe to expose on
    /// idempotent HTTP verbs.
    pub fn is_queryable(&self) -> bool {
        self.ast.as_ref().is_some_and(parser::is_select)
    }

    /// Any non-SELECT statement is assumed to write.
    pub fn mutates_data(&self) -> bool {
        !self.is_queryable()
    }

    /// Handler-registry key for module-scoped hooks.
    pub fn scope(&self) -> String {
        format!("{}/{}", self.database, self.relative_path)
    }
}

/// One migration script. Identified by its content, never its name: the
/// name only orders and labels it.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationFile {
    pub name: String,
    pub content: String,
}
