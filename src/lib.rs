//! sqlport: turn a directory tree of SQL files into a runnable API.
//!
//! Every `.sql` file under the root becomes an addressable module with
//! inferred parameter and result-column shapes, wrapped in folder- and
//! module-scoped before/after handlers, and exposed over HTTP and
//! in-process. Contexts are immutable snapshots: file changes rebuild a
//! complete new context and swap it in while in-flight requests finish
//! on the old one.

pub mod config;
pub mod context;
pub mod db;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod generator;
pub mod handler;
pub mod ident;
pub mod inprocess;
pub mod logging;
pub mod migration;
pub mod module;
pub mod parser;
pub mod pipeline;
pub mod server;
pub mod state;
pub mod value;
pub mod watcher;

pub use config::Configuration;
pub use context::{build_context, RuntimeContext};
pub use db::{Database, Governor, SqliteAdapter};
pub use error::{ConfigError, Error};
pub use executor::ModuleExecutor;
pub use generator::{ModuleGenerator, NoopGenerator};
pub use handler::{FnHandler, Grant, GrantKind, Handler, HandlerRegistry, RequestContext};
pub use migration::migrate;
pub use module::{ColumnMetadata, MigrationFile, NamedParameter, SqlModule};
pub use pipeline::ModuleArtifact;
pub use server::{router, serve};
pub use state::ServerState;
pub use value::{Parameters, Row, SqlType, SqlValue};
