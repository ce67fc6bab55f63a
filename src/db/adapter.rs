//! One physical sqlite connection with parse, execute, analyze, migrate,
//! and transaction control. Every connection touch funnels through the
//! [`Governor`] gate; nothing else may reach the handle.

use crate::db::bind::SqliteBindValue;
use crate::db::governor::Governor;
use crate::error::{ConfigError, Error};
use crate::ident::identifier;
use crate::module::{ColumnMetadata, MigrationFile, SqlModule};
use crate::parser;
use crate::value::{Parameters, Row, SqlType, SqlValue};
use sqlparser::ast::Statement;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Row as _, SqliteConnection, TypeInfo, ValueRef};
use std::path::Path;
use tracing::debug;

/// Migration ledger: one row per applied migration content.
const LEDGER_DDL: &str =
    "CREATE TABLE IF NOT EXISTS _sys_migrations (content TEXT PRIMARY KEY, run_at INTEGER NOT NULL)";

struct ConnectionState {
    conn: SqliteConnection,
    tx_depth: u32,
}

/// Adapter over an embedded, file-based database with exactly one usable
/// connection.
pub struct SqliteAdapter {
    name: String,
    gate: Governor<ConnectionState>,
}

impl SqliteAdapter {
    /// Open (creating if missing) the database at `url`. Relative paths
    /// resolve against the root; `sqlite::memory:` is accepted for
    /// throwaway stores.
    pub async fn open(name: &str, url: &str, root: &Path) -> Result<Self, Error> {
        let spec = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .ok_or_else(|| ConfigError::UnsupportedUrl {
                name: name.to_string(),
                url: url.to_string(),
            })?;
        let options = if spec == ":memory:" {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            let path = Path::new(spec);
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                root.join(path)
            };
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        };
        let conn = options.connect().await?;
        debug!(database = %name, "connection open");
        Ok(Self {
            name: name.to_string(),
            gate: Governor::new(ConnectionState { conn, tx_depth: 0 }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parse one module's SQL: exactly one statement plus its named
    /// parameters. Pure; never touches the connection.
    pub fn parse(&self, path: &str, sql: &str) -> Result<(Statement, Vec<String>), Error> {
        let statement = parser::parse_single(path, sql)?;
        let names = parser::named_parameters(path, &statement)?;
        Ok((statement, names))
    }

    /// Execute a module with the given parameters. Each distinct named
    /// parameter binds in first-occurrence order, which is the order
    /// sqlite assigns named-parameter indexes; absent parameters bind
    /// NULL. Non-SELECT statements simply produce no rows.
    pub async fn execute(
        &self,
        module: &SqlModule,
        parameters: &Parameters,
    ) -> Result<Vec<Row>, Error> {
        let mut guard = self.gate.acquire().await;
        let mut query = sqlx::query(&module.sql);
        for parameter in &module.named_parameters {
            let value = parameters
                .get(&parameter.name)
                .cloned()
                .unwrap_or(SqlValue::Null);
            query = query.bind(SqliteBindValue::from_value(&value));
        }
        let rows = query.fetch_all(&mut guard.conn).await?;
        rows.iter().map(decode_row).collect()
    }

    /// Infer a SELECT module's result shape: materialize a uniquely-named
    /// scratch relation from the statement (parameters bound NULL), read
    /// its schema, drop it. The caller's outer rollback makes even a
    /// missed drop invisible.
    pub async fn analyze(&self, module: &SqlModule) -> Result<Vec<ColumnMetadata>, Error> {
        let scratch = format!("_sys_analyze_{}", uuid::Uuid::new_v4().simple());
        let mut guard = self.gate.acquire().await;

        let create = format!("CREATE TABLE {scratch} AS {}", module.sql);
        let mut query = sqlx::query(&create);
        for _ in &module.named_parameters {
            query = query.bind(SqliteBindValue::Null);
        }
        query.execute(&mut guard.conn).await?;

        let pragma = format!("PRAGMA table_info({scratch})");
        let rows = sqlx::query(&pragma).fetch_all(&mut guard.conn).await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("name")?;
            let declared: String = row.try_get::<Option<String>, _>("type")?.unwrap_or_default();
            columns.push(ColumnMetadata {
                name: identifier(&name),
                sql_type: declared_type(&declared),
            });
        }

        sqlx::query(&format!("DROP TABLE {scratch}"))
            .execute(&mut guard.conn)
            .await?;
        Ok(columns)
    }

    /// Apply a batch of migration files in the order given. Each file is
    /// deduplicated by content against the persistent ledger and runs in
    /// its own transaction; the ledger row is written only after every
    /// fragment of the file succeeds.
    pub async fn migrate(&self, files: &[MigrationFile]) -> Result<(), Error> {
        {
            let mut guard = self.gate.acquire().await;
            sqlx::query(LEDGER_DDL).execute(&mut guard.conn).await?;
        }
        for file in files {
            self.migrate_one(file).await?;
        }
        Ok(())
    }

    async fn migrate_one(&self, file: &MigrationFile) -> Result<(), Error> {
        let mut guard = self.gate.acquire().await;
        let applied = sqlx::query("SELECT content FROM _sys_migrations WHERE content = ?")
            .bind(&file.content)
            .fetch_optional(&mut guard.conn)
            .await?;
        if applied.is_some() {
            debug!(name = %file.name, "migration content already applied");
            return Ok(());
        }
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut guard.conn)
            .await?;
        match apply_fragments(&mut guard.conn, file).await {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut guard.conn).await?;
                debug!(name = %file.name, "migration applied");
                Ok(())
            }
            Err(error) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut guard.conn).await;
                Err(error)
            }
        }
    }

    /// Start a transaction; nested calls open savepoints.
    pub async fn begin(&self) -> Result<(), Error> {
        let mut guard = self.gate.acquire().await;
        let sql = if guard.tx_depth == 0 {
            "BEGIN IMMEDIATE".to_string()
        } else {
            format!("SAVEPOINT _sys_sp_{}", guard.tx_depth)
        };
        sqlx::query(&sql).execute(&mut guard.conn).await?;
        guard.tx_depth += 1;
        Ok(())
    }

    /// Commit the innermost transaction level. A no-op outside one.
    pub async fn commit(&self) -> Result<(), Error> {
        let mut guard = self.gate.acquire().await;
        if guard.tx_depth == 0 {
            return Ok(());
        }
        guard.tx_depth -= 1;
        let sql = if guard.tx_depth == 0 {
            "COMMIT".to_string()
        } else {
            format!("RELEASE SAVEPOINT _sys_sp_{}", guard.tx_depth)
        };
        sqlx::query(&sql).execute(&mut guard.conn).await?;
        Ok(())
    }

    /// Roll back the innermost transaction level. A no-op outside one.
    pub async fn rollback(&self) -> Result<(), Error> {
        let mut guard = self.gate.acquire().await;
        if guard.tx_depth == 0 {
            return Ok(());
        }
        guard.tx_depth -= 1;
        if guard.tx_depth == 0 {
            sqlx::query("ROLLBACK").execute(&mut guard.conn).await?;
        } else {
            let depth = guard.tx_depth;
            sqlx::query(&format!("ROLLBACK TO SAVEPOINT _sys_sp_{depth}"))
                .execute(&mut guard.conn)
                .await?;
            sqlx::query(&format!("RELEASE SAVEPOINT _sys_sp_{depth}"))
                .execute(&mut guard.conn)
                .await?;
        }
        Ok(())
    }
}

async fn apply_fragments(conn: &mut SqliteConnection, file: &MigrationFile) -> Result<(), Error> {
    for fragment in split_statements(&file.content) {
        sqlx::query(fragment)
            .execute(&mut *conn)
            .await
            .map_err(|e| Error::Migration {
                name: file.name.clone(),
                message: e.to_string(),
            })?;
    }
    sqlx::query("INSERT INTO _sys_migrations (content, run_at) VALUES (?, ?)")
        .bind(&file.content)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::Migration {
            name: file.name.clone(),
            message: e.to_string(),
        })?;
    Ok(())
}

/// Split a migration body on `;`, dropping empty fragments.
pub(crate) fn split_statements(content: &str) -> impl Iterator<Item = &str> {
    content.split(';').map(str::trim).filter(|s| !s.is_empty())
}

fn decode_row(row: &SqliteRow) -> Result<Row, Error> {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let (is_null, type_name) = {
            let raw = row.try_get_raw(i)?;
            (raw.is_null(), raw.type_info().name().to_string())
        };
        let value = if is_null {
            SqlValue::Null
        } else {
            match type_name.as_str() {
                "INTEGER" => SqlValue::Number(row.try_get::<i64, _>(i)? as f64),
                "REAL" => SqlValue::Number(row.try_get::<f64, _>(i)?),
                "BOOLEAN" => SqlValue::Boolean(row.try_get::<bool, _>(i)?),
                "BLOB" => SqlValue::Text(
                    String::from_utf8_lossy(&row.try_get::<Vec<u8>, _>(i)?).into_owned(),
                ),
                _ => SqlValue::Text(row.try_get::<String, _>(i)?),
            }
        };
        out.push(identifier(column.name()), value);
    }
    Ok(out)
}

/// Fold a declared column type to the closed API type set. Blank declared
/// types (expression columns) default to string.
fn declared_type(declared: &str) -> SqlType {
    let declared = declared.to_ascii_uppercase();
    const NUMERIC: [&str; 7] = ["INT", "REAL", "FLOA", "DOUB", "NUM", "DEC", "BOOL"];
    if NUMERIC.iter().any(|fragment| declared.contains(fragment)) {
        SqlType::Number
    } else if declared.contains("BLOB") {
        SqlType::Blob
    } else {
        SqlType::String
    }
}
