//! Filesystem-watch-driven reindexing: debounce bursts of edits under
//! `workspace/` into a single [`MemoryStore::reindex`] call.

use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};
use nxa_domain::error::{Error, Result};
use tokio::task::JoinHandle;

use crate::store::MemoryStore;

const DEBOUNCE: Duration = Duration::from_millis(1200);

/// Owns the background debounce task and the `notify` watcher that feeds
/// it. Dropping this stops watching.
pub struct MemoryWatcher {
    _watcher: notify::RecommendedWatcher,
    task: JoinHandle<()>,
}

impl MemoryWatcher {
    /// Start watching `store`'s workspace directory. Reindex calls are
    /// debounced so a burst of saves collapses into one rebuild.
    pub fn spawn(store: std::sync::Arc<MemoryStore>, watch_dir: std::path::PathBuf) -> Result<Self> {
        let (tx, rx) = std_mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        })
        .map_err(|e| Error::Other(format!("failed to create filesystem watcher: {e}")))?;

        watcher
            .watch(&watch_dir, RecursiveMode::Recursive)
            .map_err(|e| Error::Other(format!("failed to watch {}: {e}", watch_dir.display())))?;

        let (debounced_tx, mut debounced_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
        std::thread::spawn(move || {
            for _event in rx {
                let _ = debounced_tx.send(());
            }
        });

        let task = tokio::spawn(async move {
            loop {
                let Some(()) = debounced_rx.recv().await else {
                    break;
                };
                tokio::time::sleep(DEBOUNCE).await;
                while debounced_rx.try_recv().is_ok() {}

                if let Err(err) = store.reindex().await {
                    tracing::warn!(error = %err, "debounced reindex failed");
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for MemoryWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::LocalHashEmbedder;
    use nxa_domain::config::{HomeLayout, MemoryConfig};

    #[tokio::test]
    async fn spawn_watches_directory_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = HomeLayout::new(dir.path());
        std::fs::create_dir_all(layout.workspace_dir()).unwrap();
        let store = std::sync::Arc::new(
            MemoryStore::new(layout.clone(), MemoryConfig::default(), Box::new(LocalHashEmbedder::new(16))).unwrap(),
        );

        let watcher = MemoryWatcher::spawn(store, layout.workspace_dir()).unwrap();
        watcher.stop();
    }
}
