//! Watch the root directory and rebuild the whole context on change.
//!
//! Bursts of events collapse into a single rebuild, and only files that
//! feed a build (SQL sources, the configuration, the ignore file) count:
//! the databases themselves usually live inside the root, and their
//! writes must not retrigger reloads forever.

use crate::config::CONFIG_FILE;
use crate::discovery::IGNORE_FILE;
use crate::error::Error;
use crate::state::ServerState;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

const SETTLE: Duration = Duration::from_millis(500);

fn relevant(event: &notify::Event) -> bool {
    event.paths.iter().any(|path| {
        path.file_name()
            .is_some_and(|name| name == CONFIG_FILE || name == IGNORE_FILE)
            || path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
    })
}

/// Start watching `root`. Returns the watcher handle, which must stay
/// alive for as long as reloads should happen. A failed rebuild is
/// logged; the current context keeps serving.
pub fn watch(root: &Path, state: ServerState) -> Result<RecommendedWatcher, Error> {
    let (tx, mut rx) = mpsc::channel::<()>(1);
    let mut watcher = notify::recommended_watcher(
        move |event: Result<notify::Event, notify::Error>| match event {
            Ok(event) if relevant(&event) => {
                // a full channel already means a pending rebuild
                let _ = tx.try_send(());
            }
            Ok(_) => {}
            Err(error) => warn!(error = %error, "watch event error"),
        },
    )
    .map_err(|e| Error::Watch(e.to_string()))?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| Error::Watch(e.to_string()))?;
    info!(root = %root.display(), "watching for changes");

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            // let the burst finish, then fold queued signals into this pass
            tokio::time::sleep(SETTLE).await;
            while rx.try_recv().is_ok() {}
            match state.reload().await {
                Ok(()) => info!("reloaded after file change"),
                Err(error) => {
                    warn!(error = %error, "reload failed; previous context keeps serving");
                }
            }
        }
    });

    Ok(watcher)
}
