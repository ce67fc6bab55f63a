//! sqlport command line: scaffold a root, run migrations, serve.

use clap::{Parser, Subcommand};
use sqlport::{
    build_context, logging, migration, server, watcher, Configuration, Error, HandlerRegistry,
    NoopGenerator, ServerState,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sqlport", version, about = "Turn a directory of SQL files into an API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scaffold a root directory with a default database and hello module.
    Init {
        /// Root directory; defaults to SQLPORT_ROOT or the current directory.
        root: Option<PathBuf>,
    },
    /// Build a context, watch for changes, and serve HTTP.
    Start {
        root: Option<PathBuf>,
        #[arg(long, env = "PORT", default_value_t = 4567)]
        port: u16,
    },
    /// Apply pending migrations for every configured database.
    Migrate {
        root: Option<PathBuf>,
    },
}

fn resolve_root(root: Option<PathBuf>) -> PathBuf {
    root.or_else(|| std::env::var_os("SQLPORT_ROOT").map(PathBuf::from))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn write_if_absent(path: &PathBuf, content: &str) -> Result<(), Error> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    println!("created {}", path.display());
    Ok(())
}

fn init(root: PathBuf) -> Result<(), Error> {
    std::fs::create_dir_all(&root)?;
    write_if_absent(
        &root.join(sqlport::config::CONFIG_FILE),
        "log_levels = [\"info\"]\n\n[databases]\ndefault = \"sqlite:default.db\"\n",
    )?;
    write_if_absent(
        &root.join("default").join("hello.sql"),
        "SELECT 'hello, world'\n",
    )?;
    write_if_absent(
        &root.join(sqlport::discovery::IGNORE_FILE),
        "# paths listed here (gitignore syntax) are not served as modules\n",
    )?;
    std::fs::create_dir_all(root.join(sqlport::discovery::MIGRATIONS_DIR).join("default"))?;
    println!("root ready at {}", root.display());
    Ok(())
}

async fn start(root: PathBuf, port: u16) -> Result<(), Error> {
    let configuration = Configuration::load(&root)?;
    logging::init(&configuration.log_levels);
    let state = ServerState::initialize(
        configuration,
        HandlerRegistry::new(),
        Arc::new(NoopGenerator),
    )
    .await?;
    // hold the watcher for the life of the server
    let _watcher = watcher::watch(&root, state.clone())?;
    server::serve(state, port).await
}

async fn migrate(root: PathBuf) -> Result<(), Error> {
    let configuration = Configuration::load(&root)?;
    logging::init(&configuration.log_levels);
    let context = build_context(&configuration, &HandlerRegistry::new(), &NoopGenerator).await?;
    migration::migrate(&context).await
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Init { root } => init(resolve_root(root)),
        Command::Start { root, port } => start(resolve_root(root), port).await,
        Command::Migrate { root } => migrate(resolve_root(root)).await,
    };
    if let Err(error) = outcome {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
